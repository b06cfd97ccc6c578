//! The algorithm provider contract.
//!
//! A provider is a cryptographic engine for one algorithm family. Callers use the provided
//! operation methods (`sign`, `encrypt`, `import_key`, ...) which run the guard checks and then
//! dispatch to the `on_*` hooks an implementation overrides. A hook that is not overridden
//! fails with `AlgorithmError`, so a provider only implements what it supports.

use crate::error::Err;
use crate::subtle::{Algorithm, CryptoKey, CryptoKeyPair, KeyData, KeyFormat, KeyType, KeyUsage};
use crate::{tracerr, Result};

/// Cryptographic engine for one algorithm family.
pub trait Provider: Send + Sync {
    /// Algorithm name served by this provider.
    fn name(&self) -> &str;

    /// Usages permitted for private keys. Empty when not applicable.
    fn private_key_usage(&self) -> &[KeyUsage] {
        &[]
    }

    /// Usages permitted for public keys. Empty when not applicable.
    fn public_key_usage(&self) -> &[KeyUsage] {
        &[]
    }

    /// Usages permitted for symmetric keys. Empty when not applicable.
    fn symmetric_key_usage(&self) -> &[KeyUsage] {
        &[]
    }

    /// True when this provider serves the algorithm `name`.
    fn supports(&self, name: &str) -> bool {
        name.eq_ignore_ascii_case(self.name())
    }

    // ------------------------------------------------------------------------
    // Guards
    // ------------------------------------------------------------------------

    /// Check the requested algorithm is served by this provider.
    ///
    /// # Errors
    ///
    /// * `AlgorithmError` - The algorithm name is not served.
    fn check_algorithm_name(&self, alg: &Algorithm) -> Result<()> {
        if !self.supports(&alg.name) {
            tracerr!(
                Err::AlgorithmError,
                "provider '{}' does not serve algorithm '{}'",
                self.name(),
                alg.name
            );
        }
        Ok(())
    }

    /// Validate algorithm-specific generation parameters before generating anything.
    ///
    /// # Errors
    ///
    /// * `AlgorithmError` - The parameters are unsupported.
    fn check_generate_key_params(&self, _alg: &Algorithm) -> Result<()> {
        Ok(())
    }

    /// Check `key` may be used for `usage` by this provider.
    ///
    /// # Errors
    ///
    /// * `UnsupportedUsage` - The key does not permit the usage, or was made for an algorithm
    ///   this provider does not serve.
    fn check_crypto_key(&self, key: &CryptoKey, usage: KeyUsage) -> Result<()> {
        check_usage(self, key, usage)
    }

    /// Check requested usages against the usages this provider declares for `key_type`.
    ///
    /// # Errors
    ///
    /// * `UnsupportedUsage` - A usage is not permitted for the key type.
    fn check_key_usages(&self, key_type: KeyType, usages: &[KeyUsage]) -> Result<()> {
        let allowed = match key_type {
            KeyType::Private => self.private_key_usage(),
            KeyType::Public => self.public_key_usage(),
            KeyType::Secret => self.symmetric_key_usage(),
        };
        if let Some(bad) = usages.iter().find(|u| !allowed.contains(u)) {
            tracerr!(
                Err::UnsupportedUsage,
                "usage '{}' not permitted for {:?} keys of '{}'",
                bad,
                key_type,
                self.name()
            );
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Hooks
    // ------------------------------------------------------------------------

    /// Generate a symmetric key.
    ///
    /// # Errors
    ///
    /// * `AlgorithmError` - Not supported by this provider.
    fn on_generate_key(
        &self, _alg: &Algorithm, _extractable: bool, _usages: &[KeyUsage],
    ) -> Result<CryptoKey> {
        tracerr!(Err::AlgorithmError, "'{}' does not generate keys", self.name())
    }

    /// Generate an asymmetric key pair.
    ///
    /// # Errors
    ///
    /// * `AlgorithmError` - Not supported by this provider.
    fn on_generate_key_pair(
        &self, _alg: &Algorithm, _extractable: bool, _usages: &[KeyUsage],
    ) -> Result<CryptoKeyPair> {
        tracerr!(Err::AlgorithmError, "'{}' does not generate key pairs", self.name())
    }

    /// Sign `data`.
    ///
    /// # Errors
    ///
    /// * `AlgorithmError` - Not supported by this provider.
    fn on_sign(&self, _alg: &Algorithm, _key: &CryptoKey, _data: &[u8]) -> Result<Vec<u8>> {
        tracerr!(Err::AlgorithmError, "'{}' does not sign", self.name())
    }

    /// Verify `signature` over `data`.
    ///
    /// # Errors
    ///
    /// * `AlgorithmError` - Not supported by this provider.
    fn on_verify(
        &self, _alg: &Algorithm, _key: &CryptoKey, _signature: &[u8], _data: &[u8],
    ) -> Result<bool> {
        tracerr!(Err::AlgorithmError, "'{}' does not verify", self.name())
    }

    /// Encrypt `data`.
    ///
    /// # Errors
    ///
    /// * `AlgorithmError` - Not supported by this provider.
    fn on_encrypt(&self, _alg: &Algorithm, _key: &CryptoKey, _data: &[u8]) -> Result<Vec<u8>> {
        tracerr!(Err::AlgorithmError, "'{}' does not encrypt", self.name())
    }

    /// Decrypt `data`.
    ///
    /// # Errors
    ///
    /// * `AlgorithmError` - Not supported by this provider.
    fn on_decrypt(&self, _alg: &Algorithm, _key: &CryptoKey, _data: &[u8]) -> Result<Vec<u8>> {
        tracerr!(Err::AlgorithmError, "'{}' does not decrypt", self.name())
    }

    /// Digest `data`.
    ///
    /// # Errors
    ///
    /// * `AlgorithmError` - Not supported by this provider.
    fn on_digest(&self, _alg: &Algorithm, _data: &[u8]) -> Result<Vec<u8>> {
        tracerr!(Err::AlgorithmError, "'{}' does not digest", self.name())
    }

    /// Derive `length` bits from `base_key`.
    ///
    /// # Errors
    ///
    /// * `AlgorithmError` - Not supported by this provider.
    fn on_derive_bits(
        &self, _alg: &Algorithm, _base_key: &CryptoKey, _length: usize,
    ) -> Result<Vec<u8>> {
        tracerr!(Err::AlgorithmError, "'{}' does not derive bits", self.name())
    }

    /// Import key material.
    ///
    /// # Errors
    ///
    /// * `AlgorithmError` - Not supported by this provider.
    fn on_import_key(
        &self, _data: KeyData, _alg: &Algorithm, _extractable: bool, _usages: &[KeyUsage],
    ) -> Result<CryptoKey> {
        tracerr!(Err::AlgorithmError, "'{}' does not import keys", self.name())
    }

    /// Export key material.
    ///
    /// # Errors
    ///
    /// * `AlgorithmError` - Not supported by this provider.
    fn on_export_key(&self, _format: KeyFormat, _key: &CryptoKey) -> Result<KeyData> {
        tracerr!(Err::AlgorithmError, "'{}' does not export keys", self.name())
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Generate a symmetric key.
    ///
    /// # Errors
    ///
    /// Guard failures, or any failure from the provider.
    fn generate_key(
        &self, alg: &Algorithm, extractable: bool, usages: &[KeyUsage],
    ) -> Result<CryptoKey> {
        self.check_algorithm_name(alg)?;
        self.check_generate_key_params(alg)?;
        self.check_key_usages(KeyType::Secret, usages)?;
        self.on_generate_key(alg, extractable, usages)
    }

    /// Generate an asymmetric key pair. Each half receives the requested usages that apply to
    /// it.
    ///
    /// # Errors
    ///
    /// Guard failures, or any failure from the provider.
    fn generate_key_pair(
        &self, alg: &Algorithm, extractable: bool, usages: &[KeyUsage],
    ) -> Result<CryptoKeyPair> {
        self.check_algorithm_name(alg)?;
        self.check_generate_key_params(alg)?;
        if let Some(bad) = usages
            .iter()
            .find(|u| !self.private_key_usage().contains(u) && !self.public_key_usage().contains(u))
        {
            tracerr!(Err::UnsupportedUsage, "usage '{}' not permitted by '{}'", bad, self.name());
        }
        self.on_generate_key_pair(alg, extractable, usages)
    }

    /// Sign `data` with a private or secret key.
    ///
    /// # Errors
    ///
    /// Guard failures, or any failure from the provider.
    fn sign(&self, alg: &Algorithm, key: &CryptoKey, data: &[u8]) -> Result<Vec<u8>> {
        self.check_algorithm_name(alg)?;
        self.check_crypto_key(key, KeyUsage::Sign)?;
        self.on_sign(alg, key, data)
    }

    /// Verify `signature` over `data`. A signature that does not verify is `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Guard failures, or any failure from the provider.
    fn verify(
        &self, alg: &Algorithm, key: &CryptoKey, signature: &[u8], data: &[u8],
    ) -> Result<bool> {
        self.check_algorithm_name(alg)?;
        self.check_crypto_key(key, KeyUsage::Verify)?;
        self.on_verify(alg, key, signature, data)
    }

    /// Encrypt `data`.
    ///
    /// # Errors
    ///
    /// Guard failures, or any failure from the provider.
    fn encrypt(&self, alg: &Algorithm, key: &CryptoKey, data: &[u8]) -> Result<Vec<u8>> {
        self.check_algorithm_name(alg)?;
        self.check_crypto_key(key, KeyUsage::Encrypt)?;
        self.on_encrypt(alg, key, data)
    }

    /// Decrypt `data`.
    ///
    /// # Errors
    ///
    /// Guard failures, or any failure from the provider.
    fn decrypt(&self, alg: &Algorithm, key: &CryptoKey, data: &[u8]) -> Result<Vec<u8>> {
        self.check_algorithm_name(alg)?;
        self.check_crypto_key(key, KeyUsage::Decrypt)?;
        self.on_decrypt(alg, key, data)
    }

    /// Digest `data`.
    ///
    /// # Errors
    ///
    /// Guard failures, or any failure from the provider.
    fn digest(&self, alg: &Algorithm, data: &[u8]) -> Result<Vec<u8>> {
        self.check_algorithm_name(alg)?;
        self.on_digest(alg, data)
    }

    /// Derive `length` bits from `base_key`.
    ///
    /// # Errors
    ///
    /// Guard failures, or any failure from the provider.
    fn derive_bits(&self, alg: &Algorithm, base_key: &CryptoKey, length: usize) -> Result<Vec<u8>> {
        self.check_algorithm_name(alg)?;
        self.check_crypto_key(base_key, KeyUsage::DeriveBits)?;
        self.on_derive_bits(alg, base_key, length)
    }

    /// Import key material.
    ///
    /// # Errors
    ///
    /// Guard failures, or any failure from the provider.
    fn import_key(
        &self, data: KeyData, alg: &Algorithm, extractable: bool, usages: &[KeyUsage],
    ) -> Result<CryptoKey> {
        self.check_algorithm_name(alg)?;
        let key = self.on_import_key(data, alg, extractable, usages)?;
        self.check_key_usages(key.key_type, &key.usages)?;
        Ok(key)
    }

    /// Export key material. Public keys are always exportable; private and secret keys only when
    /// extractable.
    ///
    /// # Errors
    ///
    /// * `KeyError` - The key is not extractable.
    /// * Any failure from the provider.
    fn export_key(&self, format: KeyFormat, key: &CryptoKey) -> Result<KeyData> {
        if key.key_type != KeyType::Public && !key.extractable {
            tracerr!(Err::KeyError, "{:?} key is not extractable", key.key_type);
        }
        if !self.supports(&key.algorithm.name) {
            tracerr!(
                Err::UnsupportedUsage,
                "key algorithm '{}' is incompatible with provider '{}'",
                key.algorithm.name,
                self.name()
            );
        }
        self.on_export_key(format, key)
    }
}

/// Base key guard: `key` must permit `usage` and have been made for an algorithm `provider`
/// serves. Providers that extend [`Provider::check_crypto_key`] call this first.
///
/// # Errors
///
/// * `UnsupportedUsage` - The key does not permit the usage or belongs to another algorithm.
pub fn check_usage(
    provider: &(impl Provider + ?Sized), key: &CryptoKey, usage: KeyUsage,
) -> Result<()> {
    if !key.allows(usage) {
        tracerr!(Err::UnsupportedUsage, "key does not permit usage '{}'", usage);
    }
    if !provider.supports(&key.algorithm.name) {
        tracerr!(
            Err::UnsupportedUsage,
            "key algorithm '{}' is incompatible with provider '{}'",
            key.algorithm.name,
            provider.name()
        );
    }
    Ok(())
}

/// Split requested usages between the private and public halves of a pair.
#[must_use]
pub fn split_usages(
    provider: &(impl Provider + ?Sized), usages: &[KeyUsage],
) -> (Vec<KeyUsage>, Vec<KeyUsage>) {
    let private = usages.iter().copied().filter(|u| provider.private_key_usage().contains(u));
    let public = usages.iter().copied().filter(|u| provider.public_key_usage().contains(u));
    (private.collect(), public.collect())
}
