//! # Platform Vault
//!
//! A software imitation of an OS key store. Private keys stay inside the vault and are only
//! used through [`PlatformKeyStore::sign`].

use dashmap::DashMap;
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey};
use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha2::{Sha256, Sha384, Sha512};
use vercre_wallet_crypto::error::Err;
use vercre_wallet_crypto::providers::{encode_point, point_to_jwk};
use vercre_wallet_crypto::{tracerr, Jwk, PlatformKeyKind, PlatformKeyStore, Result};

enum VaultKey {
    Rsa(Box<RsaPrivateKey>),
    Secp256k1(SigningKey),
}

impl VaultKey {
    fn public_jwk(&self) -> Jwk {
        match self {
            Self::Rsa(key) => Jwk {
                kty: "RSA".to_string(),
                n: Jwk::encode_member(&key.n().to_bytes_be()),
                e: Jwk::encode_member(&key.e().to_bytes_be()),
                ..Jwk::default()
            },
            Self::Secp256k1(key) => point_to_jwk(&encode_point(key.verifying_key())),
        }
    }
}

/// In-memory platform key store.
#[derive(Default)]
pub struct PlatformVault {
    keys: DashMap<String, VaultKey>,
}

impl PlatformVault {
    /// Create an empty vault.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True if a key is held under `alias`.
    #[must_use]
    pub fn contains(&self, alias: &str) -> bool {
        self.keys.contains_key(alias)
    }
}

impl PlatformKeyStore for PlatformVault {
    fn generate_key_pair(&self, alias: &str, kind: PlatformKeyKind) -> Result<Jwk> {
        let key = match kind {
            PlatformKeyKind::Rsa { modulus_length } => {
                match RsaPrivateKey::new(&mut OsRng, modulus_length) {
                    Ok(key) => VaultKey::Rsa(Box::new(key)),
                    Err(e) => tracerr!(Err::KeyError, "RSA generation failed: {}", e),
                }
            }
            PlatformKeyKind::Secp256k1 => VaultKey::Secp256k1(SigningKey::random(&mut OsRng)),
        };
        let jwk = key.public_jwk();
        self.keys.insert(alias.to_string(), key);
        Ok(jwk)
    }

    fn sign(&self, alias: &str, digest: &[u8]) -> Result<Vec<u8>> {
        let Some(key) = self.keys.get(alias) else {
            tracerr!(Err::KeyNotFound, "no platform key '{}'", alias);
        };

        match key.value() {
            VaultKey::Rsa(key) => {
                // the digest length identifies the hash
                let scheme = match digest.len() {
                    32 => Pkcs1v15Sign::new::<Sha256>(),
                    48 => Pkcs1v15Sign::new::<Sha384>(),
                    64 => Pkcs1v15Sign::new::<Sha512>(),
                    n => tracerr!(Err::SignatureError, "unexpected digest length {}", n),
                };
                match key.sign(scheme, digest) {
                    Ok(signature) => Ok(signature),
                    Err(e) => tracerr!(Err::SignatureError, "RSA signing failed: {}", e),
                }
            }
            VaultKey::Secp256k1(key) => {
                let signature = match PrehashSigner::<Signature>::sign_prehash(key, digest) {
                    Ok(signature) => signature,
                    Err(e) => tracerr!(Err::SignatureError, "ECDSA signing failed: {}", e),
                };
                let signature = signature.normalize_s().unwrap_or(signature);
                Ok(signature.to_bytes().to_vec())
            }
        }
    }

    fn get_certificate(&self, alias: &str) -> Result<Jwk> {
        let Some(key) = self.keys.get(alias) else {
            tracerr!(Err::KeyNotFound, "no platform key '{}'", alias);
        };
        Ok(key.public_jwk())
    }
}
