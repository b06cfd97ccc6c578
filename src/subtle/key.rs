//! Key objects handed between callers and providers.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Err;
use crate::subtle::{Algorithm, Jwk};
use crate::{tracerr, Error, Result};

/// Whether a key is the public or private half of a pair, or a symmetric secret.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// Public half of an asymmetric pair.
    Public,
    /// Private half of an asymmetric pair.
    Private,
    /// Symmetric secret.
    Secret,
}

/// Operations a key may be used for. Serialized with the JWK `key_ops` names.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum KeyUsage {
    /// Encrypt content.
    Encrypt,
    /// Decrypt content.
    Decrypt,
    /// Compute a signature or MAC.
    Sign,
    /// Verify a signature or MAC.
    Verify,
    /// Derive a key.
    DeriveKey,
    /// Derive bits.
    DeriveBits,
    /// Wrap a key.
    WrapKey,
    /// Unwrap a key.
    UnwrapKey,
}

impl Display for KeyUsage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Encrypt => "encrypt",
            Self::Decrypt => "decrypt",
            Self::Sign => "sign",
            Self::Verify => "verify",
            Self::DeriveKey => "deriveKey",
            Self::DeriveBits => "deriveBits",
            Self::WrapKey => "wrapKey",
            Self::UnwrapKey => "unwrapKey",
        };
        write!(f, "{s}")
    }
}

impl FromStr for KeyUsage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "encrypt" => Ok(Self::Encrypt),
            "decrypt" => Ok(Self::Decrypt),
            "sign" => Ok(Self::Sign),
            "verify" => Ok(Self::Verify),
            "deriveKey" => Ok(Self::DeriveKey),
            "deriveBits" => Ok(Self::DeriveBits),
            "wrapKey" => Ok(Self::WrapKey),
            "unwrapKey" => Ok(Self::UnwrapKey),
            _ => tracerr!(Err::UnsupportedUsage, "unknown key usage: {}", s),
        }
    }
}

/// Provider-specific reference to key material.
///
/// Software keys carry their bytes. Hardware-backed keys carry only the alias under which the
/// platform key store holds them; cloning a handle copies the alias, never the key.
#[derive(Clone, PartialEq, Eq)]
pub enum KeyHandle {
    /// Raw key bytes held in process memory.
    Software(Vec<u8>),
    /// Alias of a key held by the platform key store.
    HardwareRef(String),
}

impl KeyHandle {
    /// Raw bytes of a software handle.
    ///
    /// # Errors
    ///
    /// * `KeyError` - The handle refers to hardware-backed material.
    pub fn software(&self) -> Result<&[u8]> {
        match self {
            Self::Software(bytes) => Ok(bytes),
            Self::HardwareRef(alias) => {
                tracerr!(Err::KeyError, "key '{}' is held by the platform key store", alias)
            }
        }
    }

    /// Alias of a hardware-backed handle.
    ///
    /// # Errors
    ///
    /// * `KeyError` - The handle is a software key.
    pub fn alias(&self) -> Result<&str> {
        match self {
            Self::HardwareRef(alias) => Ok(alias),
            Self::Software(_) => tracerr!(Err::KeyError, "key is not hardware-backed"),
        }
    }
}

// Never print key bytes.
impl std::fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Software(bytes) => write!(f, "Software([{} bytes])", bytes.len()),
            Self::HardwareRef(alias) => write!(f, "HardwareRef({alias})"),
        }
    }
}

/// A key as seen by providers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CryptoKey {
    /// Public, private or secret.
    pub key_type: KeyType,
    /// Whether the key material may leave the provider.
    pub extractable: bool,
    /// Algorithm the key was created for.
    pub algorithm: Algorithm,
    /// Permitted usages.
    pub usages: Vec<KeyUsage>,
    /// Key material or a reference to it.
    pub handle: KeyHandle,
}

impl CryptoKey {
    /// Create a key. Hardware-backed private keys are forced to be non-extractable.
    #[must_use]
    pub fn new(
        key_type: KeyType, extractable: bool, algorithm: Algorithm, usages: Vec<KeyUsage>,
        handle: KeyHandle,
    ) -> Self {
        let extractable = match (&handle, key_type) {
            (KeyHandle::HardwareRef(_), KeyType::Private) => false,
            _ => extractable,
        };
        Self {
            key_type,
            extractable,
            algorithm,
            usages,
            handle,
        }
    }

    /// True when the key permits `usage`.
    #[must_use]
    pub fn allows(&self, usage: KeyUsage) -> bool {
        self.usages.contains(&usage)
    }
}

/// Public and private halves of a generated key pair.
#[derive(Clone, Debug)]
pub struct CryptoKeyPair {
    /// Public key.
    pub public_key: CryptoKey,
    /// Private key.
    pub private_key: CryptoKey,
}

/// Import/export formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyFormat {
    /// Raw bytes: secret bytes, or a SEC1 point for EC public keys.
    Raw,
    /// JSON Web Key.
    Jwk,
}

/// Key material in one of the [`KeyFormat`]s.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyData {
    /// Raw bytes.
    Raw(Vec<u8>),
    /// JSON Web Key.
    Jwk(Jwk),
}

impl KeyData {
    /// The format of this material.
    #[must_use]
    pub const fn format(&self) -> KeyFormat {
        match self {
            Self::Raw(_) => KeyFormat::Raw,
            Self::Jwk(_) => KeyFormat::Jwk,
        }
    }

    /// Unwrap JWK material.
    ///
    /// # Errors
    ///
    /// * `KeyFormatError` - The material is not a JWK.
    pub fn into_jwk(self) -> Result<Jwk> {
        match self {
            Self::Jwk(jwk) => Ok(jwk),
            Self::Raw(_) => tracerr!(Err::KeyFormatError, "expected JWK key data"),
        }
    }

    /// Unwrap raw material.
    ///
    /// # Errors
    ///
    /// * `KeyFormatError` - The material is not raw bytes.
    pub fn into_raw(self) -> Result<Vec<u8>> {
        match self {
            Self::Raw(raw) => Ok(raw),
            Self::Jwk(_) => tracerr!(Err::KeyFormatError, "expected raw key data"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardware_private_keys_never_extractable() {
        let key = CryptoKey::new(
            KeyType::Private,
            true,
            Algorithm::default(),
            vec![KeyUsage::Sign],
            KeyHandle::HardwareRef("master_sign".to_string()),
        );
        assert!(!key.extractable);
        assert!(key.handle.software().is_err_and(|e| e.is(Err::KeyError)));
        assert_eq!(key.handle.alias().expect("should be an alias"), "master_sign");
    }

    #[test]
    fn handle_debug_hides_bytes() {
        let handle = KeyHandle::Software(vec![0xde, 0xad]);
        assert_eq!(format!("{handle:?}"), "Software([2 bytes])");
    }

    #[test]
    fn usage_names() {
        let json = serde_json::to_string(&[KeyUsage::DeriveBits, KeyUsage::Sign])
            .expect("should serialize");
        assert_eq!(json, r#"["deriveBits","sign"]"#);
        assert_eq!("unwrapKey".parse::<KeyUsage>().expect("should parse"), KeyUsage::UnwrapKey);
    }
}
