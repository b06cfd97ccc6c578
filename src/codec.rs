//! Byte and JSON encoding helpers: base64url, canonical JSON and SHA-256 multihashes.
//!
//! Everything in here is a pure function. Canonical JSON follows the
//! [JSON Canonicalization Scheme (JCS)](https://identity.foundation/JCS/) so that identical
//! logical input always hashes to identical bytes.

use base64ct::{Base64, Base64UrlUnpadded, Encoding};
use multihash::Multihash;
use olpc_cjson::CanonicalFormatter;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Err;
use crate::{tracerr, Result};

/// Multihash function code for SHA2-256.
pub const SHA2_256: u64 = 0x12;

/// Length in bytes of a SHA2-256 digest.
pub const SHA2_256_LEN: usize = 32;

/// Encode bytes as unpadded base64url.
#[must_use]
pub fn base64url_encode(data: &[u8]) -> String {
    Base64UrlUnpadded::encode_string(data)
}

/// Decode unpadded base64url.
///
/// # Errors
///
/// * `InvalidFormat` - The input is not valid unpadded base64url.
pub fn base64url_decode(data: &str) -> Result<Vec<u8>> {
    Ok(Base64UrlUnpadded::decode_vec(data)?)
}

/// Encode bytes as padded standard base64.
#[must_use]
pub fn base64_encode(data: &[u8]) -> String {
    Base64::encode_string(data)
}

/// Decode padded standard base64.
///
/// # Errors
///
/// * `InvalidFormat` - The input is not valid base64.
pub fn base64_decode(data: &str) -> Result<Vec<u8>> {
    Ok(Base64::decode_vec(data)?)
}

/// Serialize `data` to canonical JSON bytes.
///
/// # Errors
///
/// * `SerializationError` - The data cannot be serialized.
pub fn canonicalize(data: &impl Serialize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, CanonicalFormatter::new());
    if let Err(e) = data.serialize(&mut ser) {
        tracerr!(Err::SerializationError, "failed to canonicalize: {}", e);
    }
    Ok(buf)
}

/// SHA-256 of `data`.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Wrap a raw SHA-256 digest in a multihash envelope: `[0x12, 0x20] ‖ digest`.
///
/// # Errors
///
/// * `InvalidHash` - The digest is not 32 bytes long.
pub fn multihash_wrap(digest: &[u8]) -> Result<Vec<u8>> {
    if digest.len() != SHA2_256_LEN {
        tracerr!(Err::InvalidHash, "expected a 32 byte digest, got {}", digest.len());
    }
    let mhash = Multihash::<64>::wrap(SHA2_256, digest)?;
    Ok(mhash.to_bytes())
}

/// Hash `data` with SHA-256 and wrap the digest as a multihash.
///
/// # Errors
///
/// * `InvalidHash` - The multihash could not be built.
pub fn multihash(data: &[u8]) -> Result<Vec<u8>> {
    multihash_wrap(&sha256(data))
}

/// Canonicalize `data`, multihash it and base64url-encode the result.
///
/// # Errors
///
/// * `SerializationError` - The data cannot be serialized.
/// * `InvalidHash` - The multihash could not be built.
pub fn hash_data(data: &impl Serialize) -> Result<String> {
    let canonical = canonicalize(data)?;
    Ok(base64url_encode(&multihash(&canonical)?))
}

/// Check the provided base64url string is a SHA2-256 multihash and return the raw digest.
///
/// # Errors
///
/// * `InvalidFormat` - The string is not base64url.
/// * `InvalidHash` - The bytes are not a 34-byte SHA2-256 multihash.
pub fn check_multihash(hash: &str) -> Result<Vec<u8>> {
    let decoded = base64url_decode(hash)?;
    let wrapped = Multihash::<64>::from_bytes(&decoded)?;
    if wrapped.code() != SHA2_256 {
        tracerr!(Err::InvalidHash, "invalid hash code: {}", wrapped.code());
    }
    if usize::from(wrapped.size()) != SHA2_256_LEN || decoded.len() != SHA2_256_LEN + 2 {
        tracerr!(Err::InvalidHash, "invalid hash length: {}", wrapped.size());
    }
    Ok(wrapped.digest().to_vec())
}

/// Fill a new buffer of `n` bytes from the operating system's random source.
#[must_use]
pub fn random_bytes(n: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; n];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Random hex string generator
#[must_use]
pub fn rand_hex(n: usize) -> String {
    hex::encode(random_bytes(n))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn multihash_layout() {
        let data = b"Hello, world!";

        let mhash = multihash(data).expect("failed to create multi-hash");
        assert_eq!(mhash.len(), 34);
        assert_eq!(&mhash[..2], &[0x12, 0x20]);
        assert_eq!(&mhash[2..], &sha256(data)[..]);
    }

    #[test]
    fn wrap_rejects_short_digest() {
        let err = multihash_wrap(&[0u8; 20]).expect_err("should reject");
        assert!(err.is(Err::InvalidHash));
    }

    #[test]
    fn canonical_ordering() {
        let value = json!({"b": 1, "a": {"d": [3, 2], "c": "x"}});
        let canonical = canonicalize(&value).expect("should canonicalize");
        let canonical = String::from_utf8(canonical).unwrap();
        insta::assert_snapshot!(canonical, @r#"{"a":{"c":"x","d":[3,2]},"b":1}"#);
    }

    #[test]
    fn hash_data_is_stable() {
        let first = hash_data(&json!({"msg": "Hello, world!", "n": 1})).expect("should hash");
        let second = hash_data(&json!({"n": 1, "msg": "Hello, world!"})).expect("should hash");
        assert_eq!(first, second);

        let digest = check_multihash(&first).expect("should be a multihash");
        assert_eq!(digest, sha256(br#"{"msg":"Hello, world!","n":1}"#));
    }

    #[test]
    fn check_rejects_other_codes() {
        // identity multihash (code 0x00) of four bytes
        let identity = base64url_encode(&[0x00, 0x04, 1, 2, 3, 4]);
        let err = check_multihash(&identity).expect_err("should reject");
        assert!(err.is(Err::InvalidHash));
    }

    #[test]
    fn base64_variants() {
        let data = [0xfb, 0xff, 0x00];
        assert_eq!(base64url_encode(&data), "-_8A");
        assert_eq!(base64_encode(&data), "+/8A");
        assert_eq!(base64url_decode("-_8A").expect("should decode"), data);
        assert_eq!(base64_decode("+/8A").expect("should decode"), data);
        assert!(base64url_decode("+/8A").is_err());
    }

    #[test]
    fn random_values() {
        assert_eq!(random_bytes(32).len(), 32);
        assert_eq!(rand_hex(8).len(), 16);
    }
}
