//! # Crypto Operations
//!
//! Key-reference based signing on top of the provider registry and a [`KeyStore`]. Callers name
//! keys with [`key_reference`](crate::keys::key_reference) and never handle key material
//! directly.

use std::sync::Arc;

use serde_json::Value;

use crate::error::Err;
use crate::jose::{Format, Header, JwsToken, SigningAlgorithm};
use crate::keys;
use crate::providers::ALIAS_PARAM;
use crate::subtle::{CryptoKey, Jwk, KeyData, KeyFormat, KeyUsage, ProviderRegistry};
use crate::{tracerr, Result};

/// Persistence for generated keys. Implemented outside the crypto core.
///
/// A reference may accumulate several public keys as the key behind it is rotated; the most
/// recently saved is the current one.
pub trait KeyStore: Send + Sync {
    /// The current private key saved under `key_ref`.
    ///
    /// # Errors
    ///
    /// * `KeyNotFound` - Nothing is saved under `key_ref`.
    fn get_private_key(&self, key_ref: &str) -> Result<CryptoKey>;

    /// Every public key saved under `key_ref`, oldest first.
    ///
    /// # Errors
    ///
    /// * `KeyNotFound` - Nothing is saved under `key_ref`.
    fn get_public_keys(&self, key_ref: &str) -> Result<Vec<Jwk>>;

    /// Save a key pair under `key_ref`, making it current.
    ///
    /// # Errors
    ///
    /// Any failure of the underlying store.
    fn save(&self, key_ref: &str, private_key: CryptoKey, public_key: Jwk) -> Result<()>;
}

/// Signing and verification by key reference.
#[derive(Clone)]
pub struct CryptoOperations {
    registry: Arc<ProviderRegistry>,
    key_store: Arc<dyn KeyStore>,
}

impl CryptoOperations {
    /// Create operations over `registry` and `key_store`.
    pub fn new(registry: Arc<ProviderRegistry>, key_store: Arc<dyn KeyStore>) -> Self {
        Self { registry, key_store }
    }

    /// The registry in use.
    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Generate a key pair for `alg`, save it under `key_ref` and return the public JWK with
    /// `kid` set to `key_ref`.
    ///
    /// # Errors
    ///
    /// * `AlgorithmError` - `alg` is a MAC algorithm. MAC keys have no public half to publish.
    /// * Any failure of the resolved provider or the key store.
    pub fn generate_key(&self, key_ref: &str, alg: SigningAlgorithm) -> Result<Jwk> {
        if alg.is_mac() {
            tracerr!(Err::AlgorithmError, "{} keys cannot be generated by reference", alg);
        }

        let provider = self.registry.get_best_match(alg.provider_name(), alg.scope(true));
        // platform providers hold the key under its reference
        let algorithm = alg.algorithm().with_param(ALIAS_PARAM, Value::from(key_ref));
        let usages = [KeyUsage::Sign, KeyUsage::Verify];
        let pair = provider.generate_key_pair(&algorithm, true, &usages)?;
        let KeyData::Jwk(jwk) = provider.export_key(KeyFormat::Jwk, &pair.public_key)? else {
            tracerr!(Err::KeyFormatError, "provider did not export a JWK");
        };

        let public = Jwk {
            kid: Some(key_ref.to_string()),
            alg: Some(alg.to_string()),
            ..jwk.to_public()
        };
        self.key_store.save(key_ref, pair.private_key, public.clone())?;
        tracing::debug!("generated {alg} key '{key_ref}' with '{}'", provider.name());

        Ok(public)
    }

    /// Sign `payload` with the current key under `key_ref`, returning a compact JWS whose `kid`
    /// is `key_ref`.
    ///
    /// # Errors
    ///
    /// * `KeyNotFound` - No key is saved under `key_ref`.
    /// * Any failure of the resolved provider.
    pub fn sign(&self, payload: &[u8], key_ref: &str, alg: SigningAlgorithm) -> Result<String> {
        let key = self.key_store.get_private_key(key_ref)?;
        let mut jws = JwsToken::new(payload);
        jws.sign(&self.registry, &key, Header::new(alg, key_ref))?;
        jws.serialize(Format::Compact)
    }

    /// Verify `token` against every public key saved under `key_ref`.
    ///
    /// # Errors
    ///
    /// * `KeyNotFound` - No key is saved under `key_ref`.
    /// * `InvalidFormat` - `token` is not a JWS.
    pub fn verify(&self, token: &str, key_ref: &str) -> Result<bool> {
        let candidates = self.key_store.get_public_keys(key_ref)?;
        JwsToken::deserialize(token)?.verify(&self.registry, &candidates)
    }

    /// The current public key under `key_ref`.
    ///
    /// # Errors
    ///
    /// * `KeyNotFound` - No key is saved under `key_ref`.
    pub fn public_key(&self, key_ref: &str) -> Result<Jwk> {
        match self.key_store.get_public_keys(key_ref)?.pop() {
            Some(jwk) => Ok(jwk),
            None => tracerr!(Err::KeyNotFound, "no public key under '{}'", key_ref),
        }
    }

    /// Pairwise identifier name for `persona` talking to `peer`.
    #[must_use]
    pub fn pairwise_name(&self, persona: &str, peer: &str) -> String {
        keys::pairwise_name(persona, peer)
    }
}
