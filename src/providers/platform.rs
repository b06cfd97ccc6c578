//! Hardware or OS-backed keys.
//!
//! Private keys live in a [`PlatformKeyStore`] and are addressed by alias. The provider holds
//! only the alias, so private keys are never extractable. Public keys are ordinary software
//! keys: PKCS#1 DER for RSA, an uncompressed SEC1 point for secp256k1.
//!
//! Calls into the key store are plain blocking calls. A store that prompts the user (for
//! example for biometrics) blocks the caller until the prompt resolves.

use std::sync::Arc;

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use rsa::pkcs1::{DecodeRsaPublicKey, EncodeRsaPublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Pkcs1v15Sign, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};

use crate::codec::rand_hex;
use crate::error::Err;
use crate::providers::{is_secp256k1, jwk_to_point, point_to_jwk, public_key};
use crate::subtle::{
    names, split_usages, Algorithm, AlgorithmParams, CryptoKey, CryptoKeyPair, HashAlgorithm, Jwk,
    KeyData, KeyFormat, KeyHandle, KeyType, KeyUsage, Provider,
};
use crate::{tracerr, Result};

/// Additional algorithm parameter naming the alias to generate a key under.
pub const ALIAS_PARAM: &str = "alias";

/// Default RSA modulus length in bits.
pub const DEFAULT_MODULUS_LENGTH: usize = 2048;

/// Kind of key pair a platform key store is asked to create.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformKeyKind {
    /// RSA key pair for RSASSA-PKCS1-v1_5.
    Rsa {
        /// Modulus length in bits.
        modulus_length: usize,
    },

    /// ECDSA key pair on secp256k1.
    Secp256k1,
}

/// The capability an OS key store exposes. Private key bytes never cross this boundary.
pub trait PlatformKeyStore: Send + Sync {
    /// Create a key pair under `alias` and return its public JWK.
    ///
    /// # Errors
    ///
    /// Any failure of the underlying store.
    fn generate_key_pair(&self, alias: &str, kind: PlatformKeyKind) -> Result<Jwk>;

    /// Sign a message digest with the private key held under `alias`. RSA keys return a
    /// PKCS#1 v1.5 signature; secp256k1 keys return raw `r ‖ s`.
    ///
    /// # Errors
    ///
    /// * `KeyNotFound` - No key is held under `alias`.
    /// * Any failure of the underlying store.
    fn sign(&self, alias: &str, digest: &[u8]) -> Result<Vec<u8>>;

    /// Public JWK of the key held under `alias`.
    ///
    /// # Errors
    ///
    /// * `KeyNotFound` - No key is held under `alias`.
    fn get_certificate(&self, alias: &str) -> Result<Jwk>;
}

/// Provider for keys held by a [`PlatformKeyStore`]. Serves `RSASSA-PKCS1-v1_5` and `ECDSA`
/// over secp256k1.
pub struct PlatformKeyStoreProvider {
    store: Arc<dyn PlatformKeyStore>,
    digest: Arc<dyn Provider>,
}

impl PlatformKeyStoreProvider {
    /// Create a provider backed by `store`, hashing messages with `digest`.
    pub fn new(store: Arc<dyn PlatformKeyStore>, digest: Arc<dyn Provider>) -> Self {
        Self { store, digest }
    }

    /// Public key of the platform key held under `alias`.
    ///
    /// # Errors
    ///
    /// * `KeyNotFound` - No key is held under `alias`.
    /// * `KeyFormatError` - The store returned a key this provider cannot read.
    pub fn public_key(&self, alias: &str, alg: &Algorithm) -> Result<CryptoKey> {
        let jwk = self.store.get_certificate(alias)?;
        self.import_key(KeyData::Jwk(jwk), alg, true, &[KeyUsage::Verify])
    }

    fn prehash(
        &self, alg: &Algorithm, key: &CryptoKey, data: &[u8],
    ) -> Result<(HashAlgorithm, Vec<u8>)> {
        let hash = alg.hash().or_else(|| key.algorithm.hash()).unwrap_or_default();
        let digest = self.digest.digest(&hash.as_algorithm(), data)?;
        if !is_rsa(&key.algorithm.name) && digest.len() != 32 {
            tracerr!(
                Err::SignatureError,
                "secp256k1 requires a 32 byte message hash, {} produced {} bytes",
                hash,
                digest.len()
            );
        }
        Ok((hash, digest))
    }
}

fn is_rsa(name: &str) -> bool {
    name.eq_ignore_ascii_case(names::RSASSA_PKCS1_V15)
}

fn rsa_to_der(jwk: &Jwk) -> Result<Vec<u8>> {
    let n = Jwk::decode_member(jwk.n.as_ref(), "n")?;
    let e = Jwk::decode_member(jwk.e.as_ref(), "e")?;
    let public = match RsaPublicKey::new(BigUint::from_bytes_be(&n), BigUint::from_bytes_be(&e)) {
        Ok(public) => public,
        Err(e) => tracerr!(Err::KeyError, "invalid RSA public key: {}", e),
    };
    match public.to_pkcs1_der() {
        Ok(der) => Ok(der.as_bytes().to_vec()),
        Err(e) => tracerr!(Err::KeyFormatError, "failed to encode RSA public key: {}", e),
    }
}

fn rsa_from_der(der: &[u8]) -> Result<RsaPublicKey> {
    match RsaPublicKey::from_pkcs1_der(der) {
        Ok(public) => Ok(public),
        Err(e) => tracerr!(Err::KeyFormatError, "invalid PKCS#1 public key: {}", e),
    }
}

fn rsa_to_jwk(der: &[u8]) -> Result<Jwk> {
    let public = rsa_from_der(der)?;
    Ok(Jwk {
        kty: "RSA".to_string(),
        n: Jwk::encode_member(&public.n().to_bytes_be()),
        e: Jwk::encode_member(&public.e().to_bytes_be()),
        ..Jwk::default()
    })
}

impl Provider for PlatformKeyStoreProvider {
    fn name(&self) -> &str {
        "PLATFORM"
    }

    fn private_key_usage(&self) -> &[KeyUsage] {
        &[KeyUsage::Sign]
    }

    fn public_key_usage(&self) -> &[KeyUsage] {
        &[KeyUsage::Verify]
    }

    fn supports(&self, name: &str) -> bool {
        is_rsa(name) || name.eq_ignore_ascii_case(names::ECDSA)
    }

    fn check_generate_key_params(&self, alg: &Algorithm) -> Result<()> {
        match &alg.params {
            AlgorithmParams::Rsa { modulus_length: Some(bits), .. } if *bits < 1024 => {
                tracerr!(Err::AlgorithmError, "RSA modulus of {} bits is too short", bits)
            }
            AlgorithmParams::Ecdsa { named_curve: Some(crv), .. } if !is_secp256k1(crv) => {
                tracerr!(Err::AlgorithmError, "unsupported named curve: {}", crv)
            }
            _ => Ok(()),
        }
    }

    fn on_generate_key_pair(
        &self, alg: &Algorithm, _extractable: bool, usages: &[KeyUsage],
    ) -> Result<CryptoKeyPair> {
        let alias = match alg.additional_params.get(ALIAS_PARAM).and_then(|v| v.as_str()) {
            Some(alias) => alias.to_string(),
            None => format!("platform_{}", rand_hex(8)),
        };

        let (kind, public_bytes) = if is_rsa(&alg.name) {
            let modulus_length = match alg.params {
                AlgorithmParams::Rsa { modulus_length: Some(bits), .. } => bits,
                _ => DEFAULT_MODULUS_LENGTH,
            };
            let kind = PlatformKeyKind::Rsa { modulus_length };
            let jwk = self.store.generate_key_pair(&alias, kind)?;
            (kind, rsa_to_der(&jwk)?)
        } else {
            let kind = PlatformKeyKind::Secp256k1;
            let jwk = self.store.generate_key_pair(&alias, kind)?;
            (kind, jwk_to_point(&jwk)?)
        };
        tracing::debug!("platform generated {kind:?} key '{alias}'");

        let (private_usages, public_usages) = split_usages(self, usages);
        Ok(CryptoKeyPair {
            public_key: CryptoKey::new(
                KeyType::Public,
                true,
                alg.clone(),
                public_usages,
                KeyHandle::Software(public_bytes),
            ),
            private_key: CryptoKey::new(
                KeyType::Private,
                false,
                alg.clone(),
                private_usages,
                KeyHandle::HardwareRef(alias),
            ),
        })
    }

    fn on_sign(&self, alg: &Algorithm, key: &CryptoKey, data: &[u8]) -> Result<Vec<u8>> {
        let alias = key.handle.alias()?;
        let (_, digest) = self.prehash(alg, key, data)?;
        self.store.sign(alias, &digest)
    }

    fn on_verify(
        &self, alg: &Algorithm, key: &CryptoKey, signature: &[u8], data: &[u8],
    ) -> Result<bool> {
        if key.key_type != KeyType::Public {
            tracerr!(Err::KeyError, "platform verification requires a public key");
        }
        let public = key.handle.software()?;
        let (hash, digest) = self.prehash(alg, key, data)?;

        if is_rsa(&key.algorithm.name) {
            let rsa = rsa_from_der(public)?;
            let scheme = match hash {
                HashAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
                HashAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
                HashAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
            };
            return Ok(rsa.verify(scheme, &digest, signature).is_ok());
        }

        let verifying_key = public_key(public)?;
        let Ok(signature) = k256::ecdsa::Signature::from_slice(signature) else {
            return Ok(false);
        };
        Ok(verifying_key.verify_prehash(&digest, &signature).is_ok())
    }

    fn on_import_key(
        &self, data: KeyData, alg: &Algorithm, _extractable: bool, usages: &[KeyUsage],
    ) -> Result<CryptoKey> {
        let jwk = data.into_jwk()?;
        if jwk.is_private() {
            tracerr!(Err::KeyError, "platform keys are generated in the store, not imported");
        }
        let public = match jwk.kty.as_str() {
            "RSA" if is_rsa(&alg.name) => rsa_to_der(&jwk)?,
            "EC" if !is_rsa(&alg.name) => jwk_to_point(&jwk)?,
            other => tracerr!(Err::KeyFormatError, "'{}' key does not fit '{}'", other, alg.name),
        };
        Ok(CryptoKey::new(
            KeyType::Public,
            true,
            alg.clone(),
            usages.to_vec(),
            KeyHandle::Software(public),
        ))
    }

    fn on_export_key(&self, format: KeyFormat, key: &CryptoKey) -> Result<KeyData> {
        if key.key_type != KeyType::Public {
            tracerr!(Err::KeyError, "platform private keys cannot be exported");
        }
        let public = key.handle.software()?;
        match format {
            KeyFormat::Raw => Ok(KeyData::Raw(public.to_vec())),
            KeyFormat::Jwk if is_rsa(&key.algorithm.name) => Ok(KeyData::Jwk(rsa_to_jwk(public)?)),
            KeyFormat::Jwk => Ok(KeyData::Jwk(point_to_jwk(public))),
        }
    }
}
