//! # Sidetree DID Derivation
//!
//! Builds the create operation for a Sidetree DID (`did:ion` by default) and the long-form DID
//! that carries it, so the identifier can be used before it is anchored.
//!
//! Key pairs are generated through the provider registry, which means a platform provider
//! registered for `ECDSA` private keys generates hardware-backed signing and recovery keys.
//!
//! Hashes are SHA-256 multihashes (`[0x12, 0x20] ‖ digest`) over canonical JSON, base64url
//! encoded.

mod long_form;
mod payload;

use std::sync::Arc;

pub use self::long_form::*;
pub use self::payload::*;
use crate::codec::{
    base64url_decode, base64url_encode, canonicalize, hash_data, multihash, rand_hex, random_bytes,
};
use crate::error::Err;
use crate::subtle::{
    names, Algorithm, CryptoKeyPair, HashAlgorithm, Jwk, KeyData, KeyFormat, KeyUsage,
    ProviderRegistry, Scope,
};
use crate::{tracerr, Result};

/// Default DID method.
pub const DEFAULT_METHOD: &str = "ion";

/// Largest canonical patch data accepted, in bytes.
pub const MAX_PATCH_DATA_SIZE: usize = 1000;

/// Length of generated reveal values, in bytes.
pub const REVEAL_VALUE_LEN: usize = 32;

/// Derive the unique suffix from base64url-encoded suffix data.
///
/// The decoded bytes are hashed as they are. They are already canonical when produced by
/// [`SidetreeProcessor::generate_create_payload`].
///
/// # Errors
///
/// * `InvalidFormat` - `suffix_data_encoded` is not base64url.
pub fn compute_unique_suffix(suffix_data_encoded: &str) -> Result<String> {
    let bytes = base64url_decode(suffix_data_encoded)?;
    Ok(base64url_encode(&multihash(&bytes)?))
}

/// Check canonical patch data does not exceed [`MAX_PATCH_DATA_SIZE`].
///
/// # Errors
///
/// * `InvalidFormat` - The patch data is too large.
pub fn check_patch_data(patch_data: &PatchData) -> Result<()> {
    let size = canonicalize(patch_data)?.len();
    if size > MAX_PATCH_DATA_SIZE {
        tracerr!(
            Err::InvalidFormat,
            "patch data is {} bytes, more than {} allowed",
            size,
            MAX_PATCH_DATA_SIZE
        );
    }
    Ok(())
}

/// Create operation builder.
#[derive(Clone)]
pub struct SidetreeProcessor {
    registry: Arc<ProviderRegistry>,
    method: String,
    network: Option<String>,
}

impl SidetreeProcessor {
    /// Processor for `did:ion` on mainnet.
    #[must_use]
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            method: DEFAULT_METHOD.to_string(),
            network: None,
        }
    }

    /// Set the DID method.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Set the network qualifier, for example `test`.
    #[must_use]
    pub fn network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    /// Generate signing and recovery keys and the create operation publishing them.
    ///
    /// # Errors
    ///
    /// * `InvalidFormat` - The patch data exceeds [`MAX_PATCH_DATA_SIZE`] (too many services).
    /// * `KeyFormatError` - The provider exported a key that is not a secp256k1 JWK.
    /// * Any failure of the registry's `ECDSA` provider.
    pub fn generate_create_payload(&self, services: &[Service]) -> Result<CreatePayload> {
        let signing_key = self.generate_key_pair()?;
        let recovery_key = self.generate_key_pair()?;

        let signing_key_id = format!("sign_{}", rand_hex(8));
        let update_reveal = random_bytes(REVEAL_VALUE_LEN);
        let recovery_reveal = random_bytes(REVEAL_VALUE_LEN);

        let patch_data = PatchData {
            update_commitment_hash: commitment(&update_reveal)?,
            patches: vec![DocumentPatch {
                action: PatchAction::Replace,
                document: PatchDocument {
                    public_keys: vec![PublicKeyEntry {
                        id: signing_key_id.clone(),
                        type_: SECP256K1_VERIFICATION_KEY.to_string(),
                        public_key_jwk: self.sidetree_jwk(&signing_key)?,
                        purposes: vec![KeyPurpose::Authentication, KeyPurpose::AssertionMethod],
                    }],
                    services: (!services.is_empty()).then(|| services.to_vec()),
                },
            }],
        };
        check_patch_data(&patch_data)?;

        let suffix_data = SuffixData {
            patch_data_hash: hash_data(&patch_data)?,
            recovery_key: self.sidetree_jwk(&recovery_key)?,
            recovery_commitment_hash: commitment(&recovery_reveal)?,
        };

        let suffix_data_encoded = base64url_encode(&canonicalize(&suffix_data)?);
        let patch_data_encoded = base64url_encode(&canonicalize(&patch_data)?);
        let long_form = LongFormDid::new(
            &self.method,
            self.network.as_deref(),
            &suffix_data_encoded,
            &patch_data_encoded,
        )?;
        tracing::debug!("created {}", long_form.short_form());

        Ok(CreatePayload {
            did: long_form.to_string(),
            short_did: long_form.short_form(),
            suffix: long_form.suffix,
            suffix_data,
            patch_data,
            signing_key_id,
            signing_key,
            recovery_key,
            update_reveal,
            recovery_reveal,
        })
    }

    fn generate_key_pair(&self) -> Result<CryptoKeyPair> {
        let provider = self.registry.get_best_match(names::ECDSA, Scope::Private);
        provider.generate_key_pair(
            &Algorithm::ecdsa_secp256k1(HashAlgorithm::Sha256),
            true,
            &[KeyUsage::Sign, KeyUsage::Verify],
        )
    }

    // Public JWK reduced to the members Sidetree publishes, with the curve named `secp256k1`.
    fn sidetree_jwk(&self, pair: &CryptoKeyPair) -> Result<Jwk> {
        let provider = self.registry.get_best_match(names::ECDSA, Scope::Public);
        let KeyData::Jwk(jwk) = provider.export_key(KeyFormat::Jwk, &pair.public_key)? else {
            tracerr!(Err::KeyFormatError, "provider did not export a JWK");
        };
        if jwk.kty != "EC" || jwk.x.is_none() || jwk.y.is_none() {
            tracerr!(Err::KeyFormatError, "expected an EC public key, got '{}'", jwk.kty);
        }
        Ok(Jwk {
            kty: jwk.kty,
            crv: Some(names::SECP256K1.to_string()),
            x: jwk.x,
            y: jwk.y,
            ..Jwk::default()
        })
    }
}

// Commitment to a reveal value.
fn commitment(reveal: &[u8]) -> Result<String> {
    Ok(base64url_encode(&multihash(reveal)?))
}
