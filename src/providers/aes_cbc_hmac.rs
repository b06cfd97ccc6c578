//! AES-CBC with HMAC-SHA2 authenticated encryption, as composed by
//! [RFC 7518 §5.2](https://www.rfc-editor.org/rfc/rfc7518#section-5.2).
//!
//! The composite key is `MAC_KEY ‖ ENC_KEY`, each half the secondary key length of the
//! strength. The tag is the leftmost secondary-length bytes of
//! `HMAC(MAC_KEY, AAD ‖ IV ‖ C ‖ AL)` where `AL` is the AAD bit length as a big-endian `u64`.
//! Encryption returns `C ‖ tag`.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::codec::random_bytes;
use crate::error::Err;
use crate::providers::{hmac, hmac_verify};
use crate::subtle::{
    Algorithm, AlgorithmParams, CryptoKey, HashAlgorithm, Jwk, KeyData, KeyFormat, KeyHandle,
    KeyType, KeyUsage, Provider,
};
use crate::{tracerr, Result};

/// AES block size and required IV length.
const IV_LEN: usize = 16;

/// The three AES-CBC-HMAC-SHA2 strengths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AesStrength {
    /// `A128CBC-HS256`: AES-128 with HMAC-SHA-256.
    A128,
    /// `A192CBC-HS384`: AES-192 with HMAC-SHA-384.
    A192,
    /// `A256CBC-HS512`: AES-256 with HMAC-SHA-512.
    A256,
}

impl AesStrength {
    /// JOSE `enc` name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::A128 => "A128CBC-HS256",
            Self::A192 => "A192CBC-HS384",
            Self::A256 => "A256CBC-HS512",
        }
    }

    /// Length of each of the MAC and ENC halves, and of the tag.
    #[must_use]
    pub const fn secondary_len(self) -> usize {
        match self {
            Self::A128 => 16,
            Self::A192 => 24,
            Self::A256 => 32,
        }
    }

    /// Length of the composite key.
    #[must_use]
    pub const fn key_len(self) -> usize {
        2 * self.secondary_len()
    }

    /// Hash underlying the MAC.
    #[must_use]
    pub const fn hash(self) -> HashAlgorithm {
        match self {
            Self::A128 => HashAlgorithm::Sha256,
            Self::A192 => HashAlgorithm::Sha384,
            Self::A256 => HashAlgorithm::Sha512,
        }
    }

    /// Strength for a JOSE `enc` name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        [Self::A128, Self::A192, Self::A256]
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }
}

/// AEAD provider for one [`AesStrength`].
#[derive(Clone, Copy, Debug)]
pub struct AesCbcHmacProvider {
    strength: AesStrength,
}

impl AesCbcHmacProvider {
    /// Create a provider for `strength`.
    #[must_use]
    pub const fn new(strength: AesStrength) -> Self {
        Self { strength }
    }

    // (MAC_KEY, ENC_KEY)
    fn split_key<'a>(&self, key: &'a CryptoKey) -> Result<(&'a [u8], &'a [u8])> {
        let bytes = key.handle.software()?;
        if bytes.len() != self.strength.key_len() {
            tracerr!(
                Err::KeyError,
                "{} requires a {} byte key, got {}",
                self.strength.name(),
                self.strength.key_len(),
                bytes.len()
            );
        }
        Ok(bytes.split_at(self.strength.secondary_len()))
    }

    fn params<'a>(&self, alg: &'a Algorithm) -> Result<(&'a [u8], &'a [u8], Option<&'a [u8]>)> {
        let AlgorithmParams::AesCbcHmac { iv, aad, tag } = &alg.params else {
            let name = self.strength.name();
            tracerr!(Err::AlgorithmError, "{} requires IV and AAD parameters", name);
        };
        if iv.len() != IV_LEN {
            tracerr!(Err::AlgorithmError, "IV must be 16 bytes, got {}", iv.len());
        }
        Ok((iv, aad, tag.as_deref()))
    }

    fn encrypt_cbc(&self, enc_key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        let ciphertext = match self.strength {
            AesStrength::A128 => cbc::Encryptor::<aes::Aes128>::new_from_slices(enc_key, iv)
                .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
            AesStrength::A192 => cbc::Encryptor::<aes::Aes192>::new_from_slices(enc_key, iv)
                .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
            AesStrength::A256 => cbc::Encryptor::<aes::Aes256>::new_from_slices(enc_key, iv)
                .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
        };
        match ciphertext {
            Ok(ciphertext) => Ok(ciphertext),
            Err(e) => tracerr!(Err::KeyError, "invalid AES key or IV: {}", e),
        }
    }

    // Padding failures surface as `None`.
    fn decrypt_cbc(&self, enc_key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Option<Vec<u8>>> {
        let plaintext = match self.strength {
            AesStrength::A128 => cbc::Decryptor::<aes::Aes128>::new_from_slices(enc_key, iv)
                .map(|c| c.decrypt_padded_vec_mut::<Pkcs7>(ciphertext).ok()),
            AesStrength::A192 => cbc::Decryptor::<aes::Aes192>::new_from_slices(enc_key, iv)
                .map(|c| c.decrypt_padded_vec_mut::<Pkcs7>(ciphertext).ok()),
            AesStrength::A256 => cbc::Decryptor::<aes::Aes256>::new_from_slices(enc_key, iv)
                .map(|c| c.decrypt_padded_vec_mut::<Pkcs7>(ciphertext).ok()),
        };
        match plaintext {
            Ok(plaintext) => Ok(plaintext),
            Err(e) => tracerr!(Err::KeyError, "invalid AES key or IV: {}", e),
        }
    }
}

// AAD ‖ IV ‖ C ‖ AL
fn mac_input(aad: &[u8], iv: &[u8], ciphertext: &[u8]) -> Vec<u8> {
    let al = (aad.len() as u64 * 8).to_be_bytes();
    [aad, iv, ciphertext, &al].concat()
}

impl Provider for AesCbcHmacProvider {
    fn name(&self) -> &str {
        self.strength.name()
    }

    fn symmetric_key_usage(&self) -> &[KeyUsage] {
        &[KeyUsage::Encrypt, KeyUsage::Decrypt]
    }

    fn check_generate_key_params(&self, alg: &Algorithm) -> Result<()> {
        if let AlgorithmParams::AesKeyGen { length } = alg.params {
            if length != self.strength.key_len() * 8 {
                tracerr!(
                    Err::AlgorithmError,
                    "{} keys are {} bits, not {}",
                    self.strength.name(),
                    self.strength.key_len() * 8,
                    length
                );
            }
        }
        Ok(())
    }

    fn on_generate_key(
        &self, _alg: &Algorithm, extractable: bool, usages: &[KeyUsage],
    ) -> Result<CryptoKey> {
        Ok(CryptoKey::new(
            KeyType::Secret,
            extractable,
            Algorithm::new(self.strength.name(), AlgorithmParams::None),
            usages.to_vec(),
            KeyHandle::Software(random_bytes(self.strength.key_len())),
        ))
    }

    fn on_encrypt(&self, alg: &Algorithm, key: &CryptoKey, data: &[u8]) -> Result<Vec<u8>> {
        let (iv, aad, _) = self.params(alg)?;
        let (mac_key, enc_key) = self.split_key(key)?;

        let mut ciphertext = self.encrypt_cbc(enc_key, iv, data)?;
        let full_tag = hmac(self.strength.hash(), mac_key, &mac_input(aad, iv, &ciphertext))?;
        ciphertext.extend_from_slice(&full_tag[..self.strength.secondary_len()]);
        Ok(ciphertext)
    }

    fn on_decrypt(&self, alg: &Algorithm, key: &CryptoKey, data: &[u8]) -> Result<Vec<u8>> {
        let (iv, aad, detached) = self.params(alg)?;
        let (mac_key, enc_key) = self.split_key(key)?;
        let tag_len = self.strength.secondary_len();

        let (ciphertext, tag) = match detached {
            Some(tag) => (data, tag),
            None if data.len() >= tag_len => data.split_at(data.len() - tag_len),
            None => tracerr!(Err::AuthenticationError, "ciphertext shorter than the tag"),
        };
        if tag.len() != tag_len {
            tracerr!(Err::AuthenticationError);
        }

        // authenticate before touching the cipher
        let input = mac_input(aad, iv, ciphertext);
        if !hmac_verify(self.strength.hash(), mac_key, &input, tag)? {
            tracerr!(Err::AuthenticationError);
        }
        let Some(plaintext) = self.decrypt_cbc(enc_key, iv, ciphertext)? else {
            tracerr!(Err::AuthenticationError);
        };
        Ok(plaintext)
    }

    fn on_import_key(
        &self, data: KeyData, _alg: &Algorithm, extractable: bool, usages: &[KeyUsage],
    ) -> Result<CryptoKey> {
        let secret = match data {
            KeyData::Raw(secret) => secret,
            KeyData::Jwk(jwk) => {
                if jwk.kty != "oct" {
                    tracerr!(Err::KeyFormatError, "AES keys are 'oct', not '{}'", jwk.kty);
                }
                if let Some(alg) = &jwk.alg {
                    if !alg.eq_ignore_ascii_case(self.strength.name()) {
                        tracerr!(Err::AlgorithmError, "JWK is for '{}'", alg);
                    }
                }
                Jwk::decode_member(jwk.k.as_ref(), "k")?
            }
        };
        if secret.len() != self.strength.key_len() {
            tracerr!(
                Err::KeyError,
                "{} requires a {} byte key, got {}",
                self.strength.name(),
                self.strength.key_len(),
                secret.len()
            );
        }
        Ok(CryptoKey::new(
            KeyType::Secret,
            extractable,
            Algorithm::new(self.strength.name(), AlgorithmParams::None),
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
                alg: Some(self.strength.name().to_string()),
                key_ops: Some(key.usages.clone()),
                ext: Some(key.extractable),
                ..Jwk::default()
            })),
        }
    }
}
