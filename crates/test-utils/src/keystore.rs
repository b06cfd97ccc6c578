//! # Key Store

use dashmap::DashMap;
use vercre_wallet_crypto::error::Err;
use vercre_wallet_crypto::{tracerr, CryptoKey, Jwk, KeyStore, Result};

struct Entry {
    private_key: CryptoKey,
    public_keys: Vec<Jwk>,
}

/// Key store holding keys in process memory. Saving under an existing reference rotates the
/// private key and appends the public key.
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: DashMap<String, Entry>,
}

impl MemoryKeyStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn get_private_key(&self, key_ref: &str) -> Result<CryptoKey> {
        let Some(entry) = self.keys.get(key_ref) else {
            tracerr!(Err::KeyNotFound, "no key under '{}'", key_ref);
        };
        Ok(entry.private_key.clone())
    }

    fn get_public_keys(&self, key_ref: &str) -> Result<Vec<Jwk>> {
        let Some(entry) = self.keys.get(key_ref) else {
            tracerr!(Err::KeyNotFound, "no key under '{}'", key_ref);
        };
        Ok(entry.public_keys.clone())
    }

    fn save(&self, key_ref: &str, private_key: CryptoKey, public_key: Jwk) -> Result<()> {
        let mut entry = self.keys.entry(key_ref.to_string()).or_insert_with(|| Entry {
            private_key: private_key.clone(),
            public_keys: Vec::new(),
        });
        entry.private_key = private_key;
        entry.public_keys.push(public_key);
        Ok(())
    }
}
