//! PBKDF2 password-based key derivation with HMAC-SHA2.
//!
//! Base keys hold a transient password. They are imported from raw bytes only, are never
//! extractable and can only derive.

use hmac::Hmac;
use pbkdf2::pbkdf2;
use sha2::{Sha256, Sha384, Sha512};

use crate::error::Err;
use crate::subtle::{
    names, Algorithm, AlgorithmParams, CryptoKey, HashAlgorithm, KeyData, KeyFormat, KeyHandle,
    KeyType, KeyUsage, Provider,
};
use crate::{tracerr, Result};

/// PBKDF2 provider.
#[derive(Clone, Copy, Debug, Default)]
pub struct Pbkdf2Provider;

impl Provider for Pbkdf2Provider {
    fn name(&self) -> &str {
        names::PBKDF2
    }

    fn symmetric_key_usage(&self) -> &[KeyUsage] {
        &[KeyUsage::DeriveBits, KeyUsage::DeriveKey]
    }

    fn on_derive_bits(
        &self, alg: &Algorithm, base_key: &CryptoKey, length: usize,
    ) -> Result<Vec<u8>> {
        let AlgorithmParams::Pbkdf2 { salt, iterations, hash } = &alg.params else {
            tracerr!(Err::AlgorithmError, "PBKDF2 requires salt, iterations and hash");
        };
        if *iterations == 0 {
            tracerr!(Err::AlgorithmError, "PBKDF2 iterations must be positive");
        }
        if length == 0 || length % 8 != 0 {
            tracerr!(
                Err::AlgorithmError,
                "derived length must be a positive multiple of 8, got {}",
                length
            );
        }

        let password = base_key.handle.software()?;
        let mut out = vec![0u8; length / 8];
        let derived = match hash {
            HashAlgorithm::Sha256 => pbkdf2::<Hmac<Sha256>>(password, salt, *iterations, &mut out),
            HashAlgorithm::Sha384 => pbkdf2::<Hmac<Sha384>>(password, salt, *iterations, &mut out),
            HashAlgorithm::Sha512 => pbkdf2::<Hmac<Sha512>>(password, salt, *iterations, &mut out),
        };
        if let Err(e) = derived {
            tracerr!(Err::KeyError, "PBKDF2 rejected the password: {}", e);
        }
        Ok(out)
    }

    fn on_import_key(
        &self, data: KeyData, alg: &Algorithm, extractable: bool, usages: &[KeyUsage],
    ) -> Result<CryptoKey> {
        if extractable {
            tracerr!(Err::AlgorithmError, "PBKDF2 keys cannot be extractable");
        }
        let KeyData::Raw(password) = data else {
            tracerr!(Err::KeyFormatError, "PBKDF2 keys are imported from raw bytes only");
        };
        Ok(CryptoKey::new(
            KeyType::Secret,
            false,
            Algorithm::new(names::PBKDF2, alg.params.clone()),
            usages.to_vec(),
            KeyHandle::Software(password),
        ))
    }

    fn on_export_key(&self, _format: KeyFormat, _key: &CryptoKey) -> Result<KeyData> {
        tracerr!(Err::KeyError, "PBKDF2 keys cannot be exported")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_key(password: &[u8]) -> CryptoKey {
        Pbkdf2Provider
            .import_key(
                KeyData::Raw(password.to_vec()),
                &Algorithm::new(names::PBKDF2, AlgorithmParams::None),
                false,
                &[KeyUsage::DeriveBits],
            )
            .expect("should import")
    }

    fn derive(
        password: &[u8], salt: &[u8], iterations: u32, hash: HashAlgorithm, bits: usize,
    ) -> String {
        let alg = Algorithm::pbkdf2(salt, iterations, hash);
        let out =
            Pbkdf2Provider.derive_bits(&alg, &base_key(password), bits).expect("should derive");
        hex::encode(out)
    }

    #[test]
    fn known_answers() {
        assert_eq!(
            derive(b"password", b"salt", 1, HashAlgorithm::Sha256, 256),
            "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b"
        );
        assert_eq!(
            derive(b"password", b"salt", 4096, HashAlgorithm::Sha256, 256),
            "c5e478d59288c841aa530db6845c4c8d962893a001ce4e11a4963873aa98134a"
        );
        assert_eq!(
            derive(
                b"passwordPASSWORDpassword",
                b"saltSALTsaltSALTsaltSALTsaltSALTsalt",
                4096,
                HashAlgorithm::Sha256,
                320
            ),
            "348c89dbcbd32b2f32d814b8116e84cf2b17347ebc1800181c4e2a1fb8dd53e1c635518c7dac47e9"
        );
        assert_eq!(
            derive(b"password", b"salt", 2, HashAlgorithm::Sha512, 512),
            "e1d9c16aa681708a45f5c7c4e215ceb66e011a2e9f0040713f18aefdb866d53cf76cab2868a39b9f7840edce4fef5a82be67335c77a6068e04112754f27ccf4e"
        );
    }

    #[test]
    fn length_must_be_whole_bytes() {
        let alg = Algorithm::pbkdf2(b"salt", 1, HashAlgorithm::Sha256);
        for bits in [0, 7, 250] {
            let err = Pbkdf2Provider.derive_bits(&alg, &base_key(b"pw"), bits).expect_err("length");
            assert!(err.is(Err::AlgorithmError));
        }
    }

    #[test]
    fn import_rules() {
        let alg = Algorithm::new(names::PBKDF2, AlgorithmParams::None);

        let err = Pbkdf2Provider
            .import_key(KeyData::Raw(b"pw".to_vec()), &alg, true, &[KeyUsage::DeriveBits])
            .expect_err("extractable");
        assert!(err.is(Err::AlgorithmError));

        let err = Pbkdf2Provider
            .import_key(KeyData::Raw(b"pw".to_vec()), &alg, false, &[KeyUsage::Sign])
            .expect_err("usage");
        assert!(err.is(Err::UnsupportedUsage));

        let err = Pbkdf2Provider.export_key(KeyFormat::Raw, &base_key(b"pw")).expect_err("export");
        assert!(err.is(Err::KeyError));
    }
}
