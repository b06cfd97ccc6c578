//! # Providers
//!
//! Concrete [`Provider`](crate::subtle::Provider) implementations. Software providers hold key
//! bytes in process memory; the platform provider delegates private key operations to an
//! OS-backed [`PlatformKeyStore`].

mod aes_cbc_hmac;
mod pbkdf2;
mod platform;
mod secp256k1;
mod sha;

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha384, Sha512};

pub use self::aes_cbc_hmac::*;
pub use self::pbkdf2::*;
pub use self::platform::*;
pub use self::secp256k1::*;
pub use self::sha::*;
use crate::error::Err;
use crate::subtle::HashAlgorithm;
use crate::{tracerr, Result};

/// Hash `data` with `hash`.
#[must_use]
pub fn digest(hash: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    match hash {
        HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
        HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
    }
}

/// Full-length HMAC of `data` under `key`.
///
/// # Errors
///
/// * `KeyError` - The key was rejected by the MAC.
pub fn hmac(hash: HashAlgorithm, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    match hash {
        HashAlgorithm::Sha256 => mac::<Hmac<Sha256>>(key, data),
        HashAlgorithm::Sha384 => mac::<Hmac<Sha384>>(key, data),
        HashAlgorithm::Sha512 => mac::<Hmac<Sha512>>(key, data),
    }
}

/// Compare `tag` against the leftmost bytes of the HMAC of `data` in constant time.
///
/// An empty tag never verifies.
///
/// # Errors
///
/// * `KeyError` - The key was rejected by the MAC.
pub fn hmac_verify(hash: HashAlgorithm, key: &[u8], data: &[u8], tag: &[u8]) -> Result<bool> {
    if tag.is_empty() {
        return Ok(false);
    }
    match hash {
        HashAlgorithm::Sha256 => mac_verify::<Hmac<Sha256>>(key, data, tag),
        HashAlgorithm::Sha384 => mac_verify::<Hmac<Sha384>>(key, data, tag),
        HashAlgorithm::Sha512 => mac_verify::<Hmac<Sha512>>(key, data, tag),
    }
}

fn mac<M: Mac + KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = match <M as KeyInit>::new_from_slice(key) {
        Ok(mac) => mac,
        Err(e) => tracerr!(Err::KeyError, "invalid MAC key: {}", e),
    };
    Mac::update(&mut mac, data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn mac_verify<M: Mac + KeyInit>(key: &[u8], data: &[u8], tag: &[u8]) -> Result<bool> {
    let mut mac = match <M as KeyInit>::new_from_slice(key) {
        Ok(mac) => mac,
        Err(e) => tracerr!(Err::KeyError, "invalid MAC key: {}", e),
    };
    Mac::update(&mut mac, data);
    Ok(mac.verify_truncated_left(tag).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 4231 test case 2
    #[test]
    fn hmac_known_answer() {
        let tag = hmac(HashAlgorithm::Sha256, b"Jefe", b"what do ya want for nothing?")
            .expect("should mac");
        assert_eq!(
            hex::encode(&tag),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );

        let key = b"Jefe";
        let data = b"what do ya want for nothing?";
        assert!(hmac_verify(HashAlgorithm::Sha256, key, data, &tag[..16]).expect("should verify"));
        assert!(!hmac_verify(HashAlgorithm::Sha256, key, b"other", &tag).expect("should verify"));
        assert!(!hmac_verify(HashAlgorithm::Sha256, key, data, &[]).expect("should verify"));
    }

    #[test]
    fn digest_lengths() {
        assert_eq!(digest(HashAlgorithm::Sha256, b"abc").len(), 32);
        assert_eq!(digest(HashAlgorithm::Sha384, b"abc").len(), 48);
        assert_eq!(digest(HashAlgorithm::Sha512, b"abc").len(), 64);
    }
}
