//! Algorithm descriptors. A descriptor names an algorithm and carries the parameters a provider
//! needs to run it. Descriptors are immutable once built and travel independently of keys.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Err;
use crate::{tracerr, Error, Result};

/// Algorithm names understood by the standard providers.
pub mod names {
    /// ECDSA signatures.
    pub const ECDSA: &str = "ECDSA";
    /// RSASSA-PKCS1-v1_5 signatures.
    pub const RSASSA_PKCS1_V15: &str = "RSASSA-PKCS1-v1_5";
    /// HMAC message authentication.
    pub const HMAC: &str = "HMAC";
    /// PBKDF2 key derivation.
    pub const PBKDF2: &str = "PBKDF2";
    /// SHA-256 digest.
    pub const SHA_256: &str = "SHA-256";
    /// SHA-384 digest.
    pub const SHA_384: &str = "SHA-384";
    /// SHA-512 digest.
    pub const SHA_512: &str = "SHA-512";
    /// The secp256k1 named curve.
    pub const SECP256K1: &str = "secp256k1";
}

/// Hash functions available to signature, MAC and derivation algorithms.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// SHA-256
    #[default]
    #[serde(rename = "SHA-256")]
    Sha256,
    /// SHA-384
    #[serde(rename = "SHA-384")]
    Sha384,
    /// SHA-512
    #[serde(rename = "SHA-512")]
    Sha512,
}

impl HashAlgorithm {
    /// Digest output length in bytes.
    #[must_use]
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// The descriptor for running this hash as a digest operation.
    #[must_use]
    pub fn as_algorithm(self) -> Algorithm {
        Algorithm::new(self.to_string(), AlgorithmParams::Digest)
    }
}

impl Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sha256 => write!(f, "{}", names::SHA_256),
            Self::Sha384 => write!(f, "{}", names::SHA_384),
            Self::Sha512 => write!(f, "{}", names::SHA_512),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SHA-256" | "SHA256" => Ok(Self::Sha256),
            "SHA-384" | "SHA384" => Ok(Self::Sha384),
            "SHA-512" | "SHA512" => Ok(Self::Sha512),
            _ => tracerr!(Err::AlgorithmError, "unsupported hash algorithm: {}", s),
        }
    }
}

/// Algorithm-specific parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AlgorithmParams {
    /// No parameters.
    #[default]
    None,

    /// Digest operation. The algorithm name selects the hash.
    Digest,

    /// ECDSA sign/verify or key pair generation.
    Ecdsa {
        /// Hash applied to the message before signing. SHA-256 when unset.
        hash: Option<HashAlgorithm>,
        /// Named curve of the key.
        named_curve: Option<String>,
    },

    /// RSASSA-PKCS1-v1_5 sign/verify or key pair generation.
    Rsa {
        /// Hash applied to the message before signing.
        hash: HashAlgorithm,
        /// Modulus length in bits (generation only).
        modulus_length: Option<usize>,
        /// Public exponent (generation only).
        public_exponent: Option<Vec<u8>>,
    },

    /// HMAC sign/verify or key generation.
    Hmac {
        /// Hash underlying the MAC.
        hash: HashAlgorithm,
        /// Key length in bits (generation only). Defaults to the hash block size.
        length: Option<usize>,
    },

    /// AES-CBC-HMAC-SHA2 authenticated encryption.
    AesCbcHmac {
        /// Initialization vector, 16 bytes.
        iv: Vec<u8>,
        /// Additional authenticated data.
        aad: Vec<u8>,
        /// Authentication tag when supplied separately from the ciphertext.
        tag: Option<Vec<u8>>,
    },

    /// Symmetric key generation.
    AesKeyGen {
        /// Key length in bits.
        length: usize,
    },

    /// PBKDF2 derivation.
    Pbkdf2 {
        /// Salt.
        salt: Vec<u8>,
        /// Iteration count.
        iterations: u32,
        /// HMAC hash.
        hash: HashAlgorithm,
    },
}

/// Algorithm descriptor: a name plus parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Algorithm {
    /// Algorithm name, for example `ECDSA` or `A256CBC-HS512`.
    pub name: String,

    /// Algorithm-specific parameters.
    pub params: AlgorithmParams,

    /// Anything else the caller wants a provider to see.
    pub additional_params: BTreeMap<String, serde_json::Value>,
}

impl Algorithm {
    /// Create a descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>, params: AlgorithmParams) -> Self {
        Self {
            name: name.into(),
            params,
            additional_params: BTreeMap::new(),
        }
    }

    /// ECDSA over secp256k1 with the given hash.
    #[must_use]
    pub fn ecdsa_secp256k1(hash: HashAlgorithm) -> Self {
        Self::new(
            names::ECDSA,
            AlgorithmParams::Ecdsa {
                hash: Some(hash),
                named_curve: Some(names::SECP256K1.to_string()),
            },
        )
    }

    /// RSASSA-PKCS1-v1_5 with the given hash.
    #[must_use]
    pub fn rsassa_pkcs1_v15(hash: HashAlgorithm) -> Self {
        Self::new(
            names::RSASSA_PKCS1_V15,
            AlgorithmParams::Rsa {
                hash,
                modulus_length: None,
                public_exponent: None,
            },
        )
    }

    /// HMAC with the given hash.
    #[must_use]
    pub fn hmac(hash: HashAlgorithm) -> Self {
        Self::new(names::HMAC, AlgorithmParams::Hmac { hash, length: None })
    }

    /// PBKDF2 with the given salt, iteration count and hash.
    #[must_use]
    pub fn pbkdf2(salt: &[u8], iterations: u32, hash: HashAlgorithm) -> Self {
        Self::new(
            names::PBKDF2,
            AlgorithmParams::Pbkdf2 {
                salt: salt.to_vec(),
                iterations,
                hash,
            },
        )
    }

    /// Add an additional parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.additional_params.insert(key.into(), value);
        self
    }

    /// Hash declared by the parameters, if any.
    #[must_use]
    pub fn hash(&self) -> Option<HashAlgorithm> {
        match &self.params {
            AlgorithmParams::Ecdsa { hash, .. } => *hash,
            AlgorithmParams::Rsa { hash, .. }
            | AlgorithmParams::Hmac { hash, .. }
            | AlgorithmParams::Pbkdf2 { hash, .. } => Some(*hash),
            _ => None,
        }
    }

    /// Named curve declared by the parameters, if any.
    #[must_use]
    pub fn named_curve(&self) -> Option<&str> {
        match &self.params {
            AlgorithmParams::Ecdsa { named_curve, .. } => named_curve.as_deref(),
            _ => None,
        }
    }
}
