//! ECDSA over secp256k1.
//!
//! Signatures are the raw 64-byte `r ‖ s` encoding with `s` normalized to the lower half of the
//! curve order. Both sign and verify use this encoding; DER is never produced or accepted.
//!
//! Only uncompressed (`0x04`) and hybrid (`0x06`/`0x07`) SEC1 points are accepted. Compressed
//! points are rejected with `KeyFormatError` because point decompression is not supported.

use std::sync::Arc;

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::{PublicKey, SecretKey};
use rand::rngs::OsRng;

use crate::error::Err;
use crate::subtle::{
    check_usage, names, split_usages, Algorithm, AlgorithmParams, CryptoKey, CryptoKeyPair, Jwk,
    KeyData, KeyFormat, KeyHandle, KeyType, KeyUsage, Provider,
};
use crate::{tracerr, Result};

/// Curve names accepted on import. Export always uses `secp256k1`.
pub const SECP256K1_ALIASES: [&str; 3] = [names::SECP256K1, "K-256", "P-256K"];

/// Length of a secp256k1 scalar or coordinate.
const FIELD_LEN: usize = 32;

/// Length of an uncompressed SEC1 point.
const POINT_LEN: usize = 1 + 2 * FIELD_LEN;

/// ECDSA over secp256k1. Message hashing is delegated to the injected digest provider.
pub struct Secp256k1Provider {
    digest: Arc<dyn Provider>,
}

impl Secp256k1Provider {
    /// Create a provider that hashes messages with `digest`.
    ///
    /// `digest` is the provider the registry resolves for digest operations. A registry with a
    /// custom digest provider passes the result of
    /// [`get_digest`](crate::subtle::ProviderRegistry::get_digest) here.
    pub fn new(digest: Arc<dyn Provider>) -> Self {
        Self { digest }
    }

    // Hash `data` with the hash named by the request (default SHA-256) and check the length.
    fn prehash(&self, alg: &Algorithm, data: &[u8]) -> Result<Vec<u8>> {
        let hash = alg.hash().unwrap_or_default();
        let digest = self.digest.digest(&hash.as_algorithm(), data)?;
        if digest.len() != FIELD_LEN {
            tracerr!(
                Err::SignatureError,
                "secp256k1 requires a 32 byte message hash, {} produced {} bytes",
                hash,
                digest.len()
            );
        }
        Ok(digest)
    }
}

/// True when `crv` names secp256k1.
#[must_use]
pub fn is_secp256k1(crv: &str) -> bool {
    SECP256K1_ALIASES.iter().any(|alias| alias.eq_ignore_ascii_case(crv))
}

/// Parse a 32-byte private scalar, checking `0 < d < n`.
///
/// # Errors
///
/// * `KeyError` - The bytes are not a valid secp256k1 private key.
pub fn secret_key(bytes: &[u8]) -> Result<SecretKey> {
    if bytes.len() != FIELD_LEN {
        tracerr!(Err::KeyError, "private key must be 32 bytes, got {}", bytes.len());
    }
    match SecretKey::from_slice(bytes) {
        Ok(sk) => Ok(sk),
        Err(e) => tracerr!(Err::KeyError, "invalid secp256k1 private key: {}", e),
    }
}

/// Parse a SEC1 point into a verifying key, enforcing the uncompressed-point tag discipline.
///
/// # Errors
///
/// * `KeyFormatError` - Compressed, unknown or mis-sized encoding, or a hybrid tag whose parity
///   does not match `y`.
/// * `KeyError` - The point is not on the curve.
pub fn public_key(point: &[u8]) -> Result<VerifyingKey> {
    let Some(tag) = point.first() else {
        tracerr!(Err::KeyFormatError, "empty public key");
    };
    match tag {
        0x02 | 0x03 => {
            tracerr!(Err::KeyFormatError, "compressed secp256k1 points are not supported")
        }
        0x04 | 0x06 | 0x07 => {}
        _ => tracerr!(Err::KeyFormatError, "unknown point tag: {:#04x}", tag),
    }
    if point.len() != POINT_LEN {
        tracerr!(Err::KeyFormatError, "uncompressed point must be 65 bytes, got {}", point.len());
    }

    // hybrid: tag parity must match y
    let mut uncompressed = point.to_vec();
    if *tag != 0x04 {
        let y_odd = point[POINT_LEN - 1] & 1 == 1;
        if y_odd != (*tag == 0x07) {
            tracerr!(Err::KeyFormatError, "hybrid point tag does not match y parity");
        }
        uncompressed[0] = 0x04;
    }

    match VerifyingKey::from_sec1_bytes(&uncompressed) {
        Ok(vk) => Ok(vk),
        Err(e) => tracerr!(Err::KeyError, "point is not on secp256k1: {}", e),
    }
}

/// Uncompressed SEC1 encoding of a verifying key.
#[must_use]
pub fn encode_point(vk: &VerifyingKey) -> Vec<u8> {
    vk.to_encoded_point(false).as_bytes().to_vec()
}

/// Public JWK members for an uncompressed point.
#[must_use]
pub fn point_to_jwk(point: &[u8]) -> Jwk {
    Jwk {
        kty: "EC".to_string(),
        crv: Some(names::SECP256K1.to_string()),
        x: Jwk::encode_member(&point[1..=FIELD_LEN]),
        y: Jwk::encode_member(&point[FIELD_LEN + 1..]),
        ..Jwk::default()
    }
}

/// Uncompressed point from the `x`/`y` members of a secp256k1 JWK.
///
/// # Errors
///
/// * `KeyFormatError` - Wrong key type or curve, or malformed coordinates.
pub fn jwk_to_point(jwk: &Jwk) -> Result<Vec<u8>> {
    if jwk.kty != "EC" {
        tracerr!(Err::KeyFormatError, "expected an EC key, got '{}'", jwk.kty);
    }
    match jwk.crv.as_deref() {
        Some(crv) if is_secp256k1(crv) => {}
        other => tracerr!(Err::KeyFormatError, "unsupported curve: {:?}", other),
    }
    let x = Jwk::decode_member(jwk.x.as_ref(), "x")?;
    let y = Jwk::decode_member(jwk.y.as_ref(), "y")?;
    if x.len() != FIELD_LEN || y.len() != FIELD_LEN {
        tracerr!(Err::KeyFormatError, "coordinates must be 32 bytes");
    }
    Ok([&[0x04], x.as_slice(), y.as_slice()].concat())
}

fn key_algorithm(alg: &Algorithm) -> Algorithm {
    Algorithm::new(
        names::ECDSA,
        AlgorithmParams::Ecdsa {
            hash: Some(alg.hash().unwrap_or_default()),
            named_curve: Some(names::SECP256K1.to_string()),
        },
    )
}

impl Provider for Secp256k1Provider {
    fn name(&self) -> &str {
        names::ECDSA
    }

    fn private_key_usage(&self) -> &[KeyUsage] {
        &[KeyUsage::Sign]
    }

    fn public_key_usage(&self) -> &[KeyUsage] {
        &[KeyUsage::Verify]
    }

    fn check_generate_key_params(&self, alg: &Algorithm) -> Result<()> {
        match alg.named_curve() {
            None => Ok(()),
            Some(crv) if is_secp256k1(crv) => Ok(()),
            Some(crv) => tracerr!(Err::AlgorithmError, "unsupported named curve: {}", crv),
        }
    }

    fn check_crypto_key(&self, key: &CryptoKey, usage: KeyUsage) -> Result<()> {
        check_usage(self, key, usage)?;
        if key.key_type == KeyType::Private {
            if let KeyHandle::Software(bytes) = &key.handle {
                secret_key(bytes)?;
            }
        }
        Ok(())
    }

    fn on_generate_key_pair(
        &self, alg: &Algorithm, extractable: bool, usages: &[KeyUsage],
    ) -> Result<CryptoKeyPair> {
        let signing_key = SigningKey::random(&mut OsRng);
        let point = encode_point(signing_key.verifying_key());
        let (private_usages, public_usages) = split_usages(self, usages);
        let algorithm = key_algorithm(alg);

        Ok(CryptoKeyPair {
            public_key: CryptoKey::new(
                KeyType::Public,
                true,
                algorithm.clone(),
                public_usages,
                KeyHandle::Software(point),
            ),
            private_key: CryptoKey::new(
                KeyType::Private,
                extractable,
                algorithm,
                private_usages,
                KeyHandle::Software(signing_key.to_bytes().to_vec()),
            ),
        })
    }

    fn on_sign(&self, alg: &Algorithm, key: &CryptoKey, data: &[u8]) -> Result<Vec<u8>> {
        let digest = self.prehash(alg, data)?;
        let signing_key = SigningKey::from(secret_key(key.handle.software()?)?);

        let signature = match PrehashSigner::<Signature>::sign_prehash(&signing_key, &digest) {
            Ok(sig) => sig,
            Err(e) => tracerr!(Err::SignatureError, "signing failed: {}", e),
        };
        let signature = signature.normalize_s().unwrap_or(signature);
        Ok(signature.to_bytes().to_vec())
    }

    fn on_verify(
        &self, alg: &Algorithm, key: &CryptoKey, signature: &[u8], data: &[u8],
    ) -> Result<bool> {
        let digest = self.prehash(alg, data)?;
        let verifying_key = match key.key_type {
            KeyType::Public => public_key(key.handle.software()?)?,
            KeyType::Private => {
                *SigningKey::from(secret_key(key.handle.software()?)?).verifying_key()
            }
            KeyType::Secret => tracerr!(Err::KeyError, "ECDSA cannot verify with a secret key"),
        };

        let Ok(signature) = Signature::from_slice(signature) else {
            tracing::debug!("malformed secp256k1 signature");
            return Ok(false);
        };
        Ok(verifying_key.verify_prehash(&digest, &signature).is_ok())
    }

    fn on_import_key(
        &self, data: KeyData, alg: &Algorithm, extractable: bool, usages: &[KeyUsage],
    ) -> Result<CryptoKey> {
        if let Some(crv) = alg.named_curve() {
            if !is_secp256k1(crv) {
                tracerr!(Err::AlgorithmError, "unsupported named curve: {}", crv);
            }
        }
        let algorithm = key_algorithm(alg);

        let (key_type, bytes) = match data {
            KeyData::Raw(raw) if raw.len() == FIELD_LEN => {
                secret_key(&raw)?;
                (KeyType::Private, raw)
            }
            KeyData::Raw(raw) => (KeyType::Public, encode_point(&public_key(&raw)?)),
            KeyData::Jwk(jwk) => {
                let point = jwk_to_point(&jwk)?;
                let verifying_key = public_key(&point)?;

                if jwk.d.is_some() {
                    let d = Jwk::decode_member(jwk.d.as_ref(), "d")?;
                    let sk = secret_key(&d)?;
                    if sk.public_key() != PublicKey::from(verifying_key) {
                        tracerr!(Err::KeyError, "private key does not match x and y");
                    }
                    (KeyType::Private, d)
                } else {
                    (KeyType::Public, point)
                }
            }
        };

        let extractable = key_type == KeyType::Public || extractable;
        Ok(CryptoKey::new(
            key_type,
            extractable,
            algorithm,
            usages.to_vec(),
            KeyHandle::Software(bytes),
        ))
    }

    fn on_export_key(&self, format: KeyFormat, key: &CryptoKey) -> Result<KeyData> {
        let bytes = key.handle.software()?;
        match (format, key.key_type) {
            (KeyFormat::Raw, KeyType::Public | KeyType::Private) => {
                Ok(KeyData::Raw(bytes.to_vec()))
            }
            (KeyFormat::Jwk, KeyType::Public) => Ok(KeyData::Jwk(Jwk {
                key_ops: Some(key.usages.clone()),
                ext: Some(key.extractable),
                ..point_to_jwk(bytes)
            })),
            (KeyFormat::Jwk, KeyType::Private) => {
                let signing_key = SigningKey::from(secret_key(bytes)?);
                let point = encode_point(signing_key.verifying_key());
                Ok(KeyData::Jwk(Jwk {
                    d: Jwk::encode_member(bytes),
                    key_ops: Some(key.usages.clone()),
                    ext: Some(key.extractable),
                    ..point_to_jwk(&point)
                }))
            }
            (_, KeyType::Secret) => tracerr!(Err::KeyError, "ECDSA keys are never secret keys"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::SoftwareProvider;
    use crate::subtle::HashAlgorithm;

    fn provider() -> Secp256k1Provider {
        Secp256k1Provider::new(Arc::new(SoftwareProvider))
    }

    fn key_pair() -> CryptoKeyPair {
        provider()
            .generate_key_pair(
                &Algorithm::ecdsa_secp256k1(HashAlgorithm::Sha256),
                true,
                &[KeyUsage::Sign, KeyUsage::Verify],
            )
            .expect("should generate")
    }

    struct CountingDigest(std::sync::atomic::AtomicUsize);

    impl Provider for CountingDigest {
        fn name(&self) -> &str {
            names::SHA_256
        }

        fn on_digest(&self, alg: &Algorithm, data: &[u8]) -> Result<Vec<u8>> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            SoftwareProvider.digest(alg, data)
        }
    }

    #[test]
    fn prehash_uses_registered_digest() {
        let counter = Arc::new(CountingDigest(std::sync::atomic::AtomicUsize::new(0)));
        let mut registry = crate::subtle::ProviderRegistry::new(Arc::new(SoftwareProvider));
        registry.add_digest(names::SHA_256, crate::subtle::Registration::all(counter.clone()));

        let digest = registry
            .get_digest(names::SHA_256, crate::subtle::Scope::All)
            .expect("should resolve");
        let provider = Secp256k1Provider::new(digest);
        let alg = Algorithm::ecdsa_secp256k1(HashAlgorithm::Sha256);
        let pair = provider
            .generate_key_pair(&alg, true, &[KeyUsage::Sign, KeyUsage::Verify])
            .expect("should generate");

        let sig = provider.sign(&alg, &pair.private_key, b"counted").expect("should sign");
        assert!(provider.verify(&alg, &pair.public_key, &sig, b"counted").expect("should verify"));
        assert_eq!(counter.0.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn sign_verify() {
        let provider = provider();
        let alg = Algorithm::ecdsa_secp256k1(HashAlgorithm::Sha256);
        let pair = key_pair();
        assert_eq!(pair.private_key.usages, vec![KeyUsage::Sign]);
        assert_eq!(pair.public_key.usages, vec![KeyUsage::Verify]);

        let msg = b"hello secp256k1";
        let sig = provider.sign(&alg, &pair.private_key, msg).expect("should sign");
        assert_eq!(sig.len(), 64);
        assert!(provider.verify(&alg, &pair.public_key, &sig, msg).expect("should verify"));

        // single bit flips never throw
        let mut bad_sig = sig.clone();
        bad_sig[10] ^= 0x01;
        assert!(!provider.verify(&alg, &pair.public_key, &bad_sig, msg).expect("no error"));
        let other = b"hello secp256k0";
        assert!(!provider.verify(&alg, &pair.public_key, &sig, other).expect("no error"));
        assert!(!provider.verify(&alg, &pair.public_key, &sig[..63], msg).expect("no error"));
    }

    #[test]
    fn deterministic_low_s() {
        let provider = provider();
        let alg = Algorithm::ecdsa_secp256k1(HashAlgorithm::Sha256);
        let pair = key_pair();
        let first = provider.sign(&alg, &pair.private_key, b"msg").expect("should sign");
        let second = provider.sign(&alg, &pair.private_key, b"msg").expect("should sign");
        assert_eq!(first, second);

        let sig = Signature::from_slice(&first).expect("valid signature");
        assert!(sig.normalize_s().is_none());
    }

    #[test]
    fn digest_must_be_32_bytes() {
        let provider = provider();
        let alg = Algorithm::ecdsa_secp256k1(HashAlgorithm::Sha512);
        let err = provider.sign(&alg, &key_pair().private_key, b"msg").expect_err("wrong hash");
        assert!(err.is(Err::SignatureError));
    }

    #[test]
    fn jwk_round_trip() {
        let provider = provider();
        let alg = Algorithm::ecdsa_secp256k1(HashAlgorithm::Sha256);
        let pair = key_pair();

        let exported = provider.export_key(KeyFormat::Jwk, &pair.private_key).expect("export");
        let jwk = exported.clone().into_jwk().expect("JWK");
        assert_eq!(jwk.crv.as_deref(), Some("secp256k1"));
        assert!(jwk.d.is_some());

        let imported =
            provider.import_key(exported.clone(), &alg, true, &[KeyUsage::Sign]).expect("import");
        assert_eq!(imported.key_type, KeyType::Private);
        assert_eq!(provider.export_key(KeyFormat::Jwk, &imported).expect("export"), exported);

        let public = provider.export_key(KeyFormat::Jwk, &pair.public_key).expect("export");
        let public_jwk = public.clone().into_jwk().expect("JWK");
        assert_eq!((public_jwk.x, public_jwk.y), (jwk.x, jwk.y));
        assert!(public_jwk.d.is_none());
    }

    #[test]
    fn curve_aliases() {
        let provider = provider();
        let alg = Algorithm::ecdsa_secp256k1(HashAlgorithm::Sha256);
        let point = pair_point(&key_pair());
        let jwk = Jwk {
            crv: Some("K-256".to_string()),
            ..point_to_jwk(&point)
        };
        let key = provider
            .import_key(KeyData::Jwk(jwk), &alg, true, &[KeyUsage::Verify])
            .expect("alias accepted");
        assert_eq!(key.handle.software().expect("software"), point.as_slice());

        let jwk = Jwk {
            crv: Some("P-256".to_string()),
            ..point_to_jwk(&point)
        };
        let err = provider
            .import_key(KeyData::Jwk(jwk), &alg, true, &[KeyUsage::Verify])
            .expect_err("wrong curve");
        assert!(err.is(Err::KeyFormatError));
    }

    fn pair_point(pair: &CryptoKeyPair) -> Vec<u8> {
        pair.public_key.handle.software().expect("software").to_vec()
    }

    #[test]
    fn point_tags() {
        let provider = provider();
        let alg = Algorithm::ecdsa_secp256k1(HashAlgorithm::Sha256);
        let point = pair_point(&key_pair());
        let usages = [KeyUsage::Verify];

        for tag in [0x02, 0x03] {
            let compressed = [&[tag], &point[1..=32]].concat();
            let err = provider
                .import_key(KeyData::Raw(compressed), &alg, true, &usages)
                .expect_err("compressed rejected");
            assert!(err.is(Err::KeyFormatError));
        }

        let odd = point[64] & 1 == 1;
        let mut hybrid = point.clone();
        hybrid[0] = if odd { 0x07 } else { 0x06 };
        let key =
            provider.import_key(KeyData::Raw(hybrid.clone()), &alg, true, &usages).expect("hybrid");
        assert_eq!(key.handle.software().expect("software"), point.as_slice());

        hybrid[0] = if odd { 0x06 } else { 0x07 };
        let err = provider
            .import_key(KeyData::Raw(hybrid), &alg, true, &usages)
            .expect_err("parity mismatch");
        assert!(err.is(Err::KeyFormatError));
    }

    #[test]
    fn invalid_scalar() {
        let provider = provider();
        let alg = Algorithm::ecdsa_secp256k1(HashAlgorithm::Sha256);

        let err = provider
            .import_key(KeyData::Raw(vec![0u8; 32]), &alg, true, &[KeyUsage::Sign])
            .expect_err("zero scalar");
        assert!(err.is(Err::KeyError));

        // curve order n is not a valid scalar
        let order = "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141";
        let order = hex::decode(order).unwrap();
        let key = CryptoKey::new(
            KeyType::Private,
            false,
            alg.clone(),
            vec![KeyUsage::Sign],
            KeyHandle::Software(order),
        );
        let err = provider.sign(&alg, &key, b"msg").expect_err("invalid scalar");
        assert!(err.is(Err::KeyError));
    }

    #[test]
    fn unsupported_curve() {
        let provider = provider();
        let alg = Algorithm::new(
            names::ECDSA,
            AlgorithmParams::Ecdsa {
                hash: None,
                named_curve: Some("P-384".to_string()),
            },
        );
        let err = provider.generate_key_pair(&alg, true, &[KeyUsage::Sign]).expect_err("curve");
        assert!(err.is(Err::AlgorithmError));
    }
}
