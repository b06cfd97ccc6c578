//! Software SHA-2 digests and HMAC. This is the registry's default provider.

use std::str::FromStr;

use crate::codec::random_bytes;
use crate::error::Err;
use crate::providers::{digest, hmac, hmac_verify};
use crate::subtle::{
    names, Algorithm, AlgorithmParams, CryptoKey, HashAlgorithm, Jwk, KeyData, KeyFormat,
    KeyHandle, KeyType, KeyUsage, Provider,
};
use crate::{tracerr, Result};

const SECRET_USAGE: &[KeyUsage] = &[KeyUsage::Sign, KeyUsage::Verify];

/// SHA-256/384/512 digests and HMAC over them.
#[derive(Clone, Copy, Debug, Default)]
pub struct SoftwareProvider;

impl SoftwareProvider {
    // Hash from the request, then the key, then SHA-256.
    fn mac_hash(alg: &Algorithm, key: &CryptoKey) -> HashAlgorithm {
        alg.hash().or_else(|| key.algorithm.hash()).unwrap_or_default()
    }
}

fn hash_from_name(name: &str) -> Option<HashAlgorithm> {
    match name.to_ascii_uppercase().as_str() {
        "SHA-256" => Some(HashAlgorithm::Sha256),
        "SHA-384" => Some(HashAlgorithm::Sha384),
        "SHA-512" => Some(HashAlgorithm::Sha512),
        _ => None,
    }
}

// HS256 -> SHA-256 and so on.
fn jwa_name(hash: HashAlgorithm) -> String {
    format!("HS{}", hash.output_len() * 8)
}

impl Provider for SoftwareProvider {
    fn name(&self) -> &str {
        "SHA"
    }

    fn symmetric_key_usage(&self) -> &[KeyUsage] {
        SECRET_USAGE
    }

    fn supports(&self, name: &str) -> bool {
        name.eq_ignore_ascii_case(names::HMAC) || hash_from_name(name).is_some()
    }

    fn on_digest(&self, alg: &Algorithm, data: &[u8]) -> Result<Vec<u8>> {
        let Some(hash) = hash_from_name(&alg.name) else {
            tracerr!(Err::AlgorithmError, "'{}' is not a digest algorithm", alg.name);
        };
        Ok(digest(hash, data))
    }

    fn check_generate_key_params(&self, alg: &Algorithm) -> Result<()> {
        if !alg.name.eq_ignore_ascii_case(names::HMAC) {
            tracerr!(Err::AlgorithmError, "only HMAC keys can be generated, not '{}'", alg.name);
        }
        if let AlgorithmParams::Hmac { length: Some(length), .. } = alg.params {
            if length == 0 || length % 8 != 0 {
                tracerr!(Err::AlgorithmError, "invalid HMAC key length: {}", length);
            }
        }
        Ok(())
    }

    fn on_generate_key(
        &self, alg: &Algorithm, extractable: bool, usages: &[KeyUsage],
    ) -> Result<CryptoKey> {
        let hash = alg.hash().unwrap_or_default();
        let length = match alg.params {
            AlgorithmParams::Hmac { length: Some(length), .. } => length / 8,
            // block size
            _ => match hash {
                HashAlgorithm::Sha256 => 64,
                HashAlgorithm::Sha384 | HashAlgorithm::Sha512 => 128,
            },
        };
        Ok(CryptoKey::new(
            KeyType::Secret,
            extractable,
            Algorithm::hmac(hash),
            usages.to_vec(),
            KeyHandle::Software(random_bytes(length)),
        ))
    }

    fn on_sign(&self, alg: &Algorithm, key: &CryptoKey, data: &[u8]) -> Result<Vec<u8>> {
        hmac(Self::mac_hash(alg, key), key.handle.software()?, data)
    }

    fn on_verify(
        &self, alg: &Algorithm, key: &CryptoKey, signature: &[u8], data: &[u8],
    ) -> Result<bool> {
        let hash = Self::mac_hash(alg, key);
        if signature.len() != hash.output_len() {
            return Ok(false);
        }
        hmac_verify(hash, key.handle.software()?, data, signature)
    }

    fn on_import_key(
        &self, data: KeyData, alg: &Algorithm, extractable: bool, usages: &[KeyUsage],
    ) -> Result<CryptoKey> {
        let mut hash = alg.hash().unwrap_or_default();
        let secret = match data {
            KeyData::Raw(secret) => secret,
            KeyData::Jwk(jwk) => {
                if jwk.kty != "oct" {
                    tracerr!(Err::KeyFormatError, "HMAC keys are 'oct', not '{}'", jwk.kty);
                }
                if let Some(jwa) = &jwk.alg {
                    let Some(bits) = jwa.strip_prefix("HS") else {
                        tracerr!(Err::AlgorithmError, "'{}' is not an HMAC algorithm", jwa);
                    };
                    hash = HashAlgorithm::from_str(&format!("SHA-{bits}"))?;
                }
                Jwk::decode_member(jwk.k.as_ref(), "k")?
            }
        };
        if secret.is_empty() {
            tracerr!(Err::KeyError, "HMAC key is empty");
        }
        Ok(CryptoKey::new(
            KeyType::Secret,
            extractable,
            Algorithm::hmac(hash),
            usages.to_vec(),
            KeyHandle::Software(secret),
        ))
    }

    fn on_export_key(&self, format: KeyFormat, key: &CryptoKey) -> Result<KeyData> {
        let secret = key.handle.software()?;
        match format {
            KeyFormat::Raw => Ok(KeyData::Raw(secret.to_vec())),
            KeyFormat::Jwk => Ok(KeyData::Jwk(Jwk {
                kty: "oct".to_string(),
                k: Jwk::encode_member(secret),
                alg: Some(jwa_name(key.algorithm.hash().unwrap_or_default())),
                key_ops: Some(key.usages.clone()),
                ext: Some(key.extractable),
                ..Jwk::default()
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_names() {
        let provider = SoftwareProvider;
        let out = provider
            .digest(&HashAlgorithm::Sha256.as_algorithm(), b"abc")
            .expect("should digest");
        assert_eq!(
            hex::encode(out),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );

        let alg = Algorithm::new("MD5", AlgorithmParams::Digest);
        let err = provider.digest(&alg, b"abc").expect_err("should reject");
        assert!(err.is(Err::AlgorithmError));
    }

    #[test]
    fn hmac_sign_verify() {
        let provider = SoftwareProvider;
        let alg = Algorithm::hmac(HashAlgorithm::Sha384);
        let key = provider
            .generate_key(&alg, true, &[KeyUsage::Sign, KeyUsage::Verify])
            .expect("should generate");
        assert_eq!(key.handle.software().expect("software").len(), 128);

        let tag = provider.sign(&alg, &key, b"message").expect("should sign");
        assert_eq!(tag.len(), 48);
        assert!(provider.verify(&alg, &key, &tag, b"message").expect("should verify"));
        assert!(!provider.verify(&alg, &key, &tag, b"massage").expect("should verify"));
        assert!(!provider.verify(&alg, &key, &tag[..16], b"message").expect("should verify"));
    }

    #[test]
    fn jwk_round_trip() {
        let provider = SoftwareProvider;
        let alg = Algorithm::hmac(HashAlgorithm::Sha512);
        let usages = [KeyUsage::Sign];
        let key = provider.generate_key(&alg, true, &usages).expect("should generate");

        let exported = provider.export_key(KeyFormat::Jwk, &key).expect("should export");
        let KeyData::Jwk(jwk) = &exported else {
            panic!("expected JWK");
        };
        assert_eq!(jwk.alg.as_deref(), Some("HS512"));

        let imported = provider
            .import_key(exported.clone(), &Algorithm::hmac(HashAlgorithm::Sha256), true, &usages)
            .expect("should import");
        assert_eq!(imported.algorithm.hash(), Some(HashAlgorithm::Sha512));
        assert_eq!(provider.export_key(KeyFormat::Jwk, &imported).expect("export"), exported);
    }

    #[test]
    fn non_extractable_secret() {
        let provider = SoftwareProvider;
        let alg = Algorithm::hmac(HashAlgorithm::Sha256);
        let key = provider.generate_key(&alg, false, &[KeyUsage::Sign]).expect("should generate");
        let err = provider.export_key(KeyFormat::Raw, &key).expect_err("should refuse");
        assert!(err.is(Err::KeyError));
    }
}
