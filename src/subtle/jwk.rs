//! JSON Web Key (RFC 7517) exchange format.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::codec::{base64url_decode, base64url_encode, canonicalize, sha256};
use crate::error::Err;
use crate::subtle::KeyUsage;
use crate::{tracerr, Result};

/// JSON Web Key. Binary members are unpadded base64url.
///
/// The presence of `d` (or `k` for symmetric keys) marks private or secret material.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Jwk {
    /// Key type: `EC`, `RSA` or `oct`.
    pub kty: String,

    /// Curve name for EC keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// EC x coordinate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// EC y coordinate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    /// RSA modulus.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA public exponent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// Private key (EC scalar or RSA private exponent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,

    /// Symmetric key value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,

    /// Key ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Intended algorithm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Permitted operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_ops: Option<Vec<KeyUsage>>,

    /// Public key use (`sig` or `enc`).
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,

    /// Extractable flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<bool>,
}

impl Jwk {
    /// True if the key carries private or secret material.
    #[must_use]
    pub const fn is_private(&self) -> bool {
        self.d.is_some() || self.k.is_some()
    }

    /// Copy of the key with private members removed.
    #[must_use]
    pub fn to_public(&self) -> Self {
        Self {
            d: None,
            k: None,
            ..self.clone()
        }
    }

    /// Decode a required base64url member.
    ///
    /// # Errors
    ///
    /// * `KeyFormatError` - The member is missing or not valid base64url.
    pub fn decode_member(value: Option<&String>, name: &str) -> Result<Vec<u8>> {
        let Some(value) = value else {
            tracerr!(Err::KeyFormatError, "missing JWK member '{}'", name);
        };
        match base64url_decode(value) {
            Ok(bytes) => Ok(bytes),
            Err(e) => tracerr!(Err::KeyFormatError, "invalid JWK member '{}': {}", name, e),
        }
    }

    /// Encode a binary member.
    #[must_use]
    pub fn encode_member(bytes: &[u8]) -> Option<String> {
        Some(base64url_encode(bytes))
    }

    /// RFC 7638 thumbprint of the public members, base64url-encoded SHA-256.
    ///
    /// # Errors
    ///
    /// * `KeyFormatError` - The key type is unknown or required members are missing.
    pub fn thumbprint(&self) -> Result<String> {
        let members = match self.kty.as_str() {
            "EC" => match (&self.crv, &self.x, &self.y) {
                (Some(crv), Some(x), Some(y)) => json!({"crv": crv, "kty": "EC", "x": x, "y": y}),
                _ => tracerr!(Err::KeyFormatError, "EC key missing crv, x or y"),
            },
            "RSA" => match (&self.e, &self.n) {
                (Some(e), Some(n)) => json!({"e": e, "kty": "RSA", "n": n}),
                _ => tracerr!(Err::KeyFormatError, "RSA key missing e or n"),
            },
            "oct" => match &self.k {
                Some(k) => json!({"k": k, "kty": "oct"}),
                None => tracerr!(Err::KeyFormatError, "symmetric key missing k"),
            },
            other => tracerr!(Err::KeyFormatError, "unknown key type: {}", other),
        };
        Ok(base64url_encode(&sha256(&canonicalize(&members)?)))
    }
}
