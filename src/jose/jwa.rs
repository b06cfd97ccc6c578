//! JSON Web Algorithms (RFC 7518) names and the provider algorithms they select.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Err;
use crate::providers::AesStrength;
use crate::subtle::{names, Algorithm, Category, HashAlgorithm, Scope};
use crate::{tracerr, Error, Result};

/// JWS `alg` values.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// ECDSA over secp256k1 with SHA-256.
    #[default]
    #[serde(rename = "ES256K")]
    Es256k,

    /// RSASSA-PKCS1-v1_5 with SHA-256.
    #[serde(rename = "RS256")]
    Rs256,

    /// RSASSA-PKCS1-v1_5 with SHA-384.
    #[serde(rename = "RS384")]
    Rs384,

    /// RSASSA-PKCS1-v1_5 with SHA-512.
    #[serde(rename = "RS512")]
    Rs512,

    /// HMAC with SHA-256.
    #[serde(rename = "HS256")]
    Hs256,

    /// HMAC with SHA-384.
    #[serde(rename = "HS384")]
    Hs384,

    /// HMAC with SHA-512.
    #[serde(rename = "HS512")]
    Hs512,
}

impl SigningAlgorithm {
    /// Hash applied by the algorithm.
    #[must_use]
    pub const fn hash(self) -> HashAlgorithm {
        match self {
            Self::Es256k | Self::Rs256 | Self::Hs256 => HashAlgorithm::Sha256,
            Self::Rs384 | Self::Hs384 => HashAlgorithm::Sha384,
            Self::Rs512 | Self::Hs512 => HashAlgorithm::Sha512,
        }
    }

    /// Name of the provider algorithm the registry is asked for.
    #[must_use]
    pub const fn provider_name(self) -> &'static str {
        match self {
            Self::Es256k => names::ECDSA,
            Self::Rs256 | Self::Rs384 | Self::Rs512 => names::RSASSA_PKCS1_V15,
            Self::Hs256 | Self::Hs384 | Self::Hs512 => names::HMAC,
        }
    }

    /// True for MAC algorithms, which use one secret key for both signing and verifying.
    #[must_use]
    pub const fn is_mac(self) -> bool {
        matches!(self, Self::Hs256 | Self::Hs384 | Self::Hs512)
    }

    /// Registry category holding providers for this algorithm.
    #[must_use]
    pub const fn category(self) -> Category {
        if self.is_mac() {
            Category::MacSigner
        } else {
            Category::MessageSigner
        }
    }

    /// Registry scope for signing (`private = true`) or verifying.
    #[must_use]
    pub const fn scope(self, private: bool) -> Scope {
        match (self.is_mac(), private) {
            (true, _) => Scope::All,
            (false, true) => Scope::Private,
            (false, false) => Scope::Public,
        }
    }

    /// Provider algorithm descriptor.
    #[must_use]
    pub fn algorithm(self) -> Algorithm {
        match self {
            Self::Es256k => Algorithm::ecdsa_secp256k1(self.hash()),
            Self::Rs256 | Self::Rs384 | Self::Rs512 => Algorithm::rsassa_pkcs1_v15(self.hash()),
            Self::Hs256 | Self::Hs384 | Self::Hs512 => Algorithm::hmac(self.hash()),
        }
    }
}

impl Display for SigningAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Es256k => "ES256K",
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SigningAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ES256K" => Ok(Self::Es256k),
            "RS256" => Ok(Self::Rs256),
            "RS384" => Ok(Self::Rs384),
            "RS512" => Ok(Self::Rs512),
            "HS256" => Ok(Self::Hs256),
            "HS384" => Ok(Self::Hs384),
            "HS512" => Ok(Self::Hs512),
            _ => tracerr!(Err::AlgorithmError, "unsupported JWS algorithm: {}", s),
        }
    }
}

/// JWE `enc` values.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum EncryptionAlgorithm {
    /// AES-128-CBC with HMAC-SHA-256.
    #[serde(rename = "A128CBC-HS256")]
    A128CbcHs256,

    /// AES-192-CBC with HMAC-SHA-384.
    #[serde(rename = "A192CBC-HS384")]
    A192CbcHs384,

    /// AES-256-CBC with HMAC-SHA-512.
    #[serde(rename = "A256CBC-HS512")]
    A256CbcHs512,
}

impl EncryptionAlgorithm {
    /// Provider strength for this `enc` value. The provider name equals the `enc` name.
    #[must_use]
    pub const fn strength(self) -> AesStrength {
        match self {
            Self::A128CbcHs256 => AesStrength::A128,
            Self::A192CbcHs384 => AesStrength::A192,
            Self::A256CbcHs512 => AesStrength::A256,
        }
    }
}

impl FromStr for EncryptionAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match AesStrength::from_name(s) {
            Some(AesStrength::A128) => Ok(Self::A128CbcHs256),
            Some(AesStrength::A192) => Ok(Self::A192CbcHs384),
            Some(AesStrength::A256) => Ok(Self::A256CbcHs512),
            None => tracerr!(Err::AlgorithmError, "unsupported content encryption: {}", s),
        }
    }
}
