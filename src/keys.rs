//! # Key References
//!
//! Deterministic names under which generated keys are stored. A key reference is
//! `<identifier name>_<operation>`, where the identifier name is either [`MASTER`] for the
//! wallet's own identifier or a pairwise name derived from a persona and a peer.

use std::fmt::Display;
use std::str::FromStr;

use crate::codec::{base64url_encode, sha256};
use crate::error::Err;
use crate::{tracerr, Error, Result};

/// Identifier name of the wallet's master identifier.
pub const MASTER: &str = "master";

/// Length of pairwise identifier names, in characters.
pub const PAIRWISE_NAME_LEN: usize = 16;

/// The intent of a key: signing messages, updating or recovering the identifier, or encryption.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum KeyOperation {
    /// Sign a DID document or other message.
    Sign,
    /// Update a DID document.
    Update,
    /// Recover a DID document.
    Recover,
    /// Encrypt content.
    Encrypt,
}

impl Display for KeyOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sign => write!(f, "sign"),
            Self::Update => write!(f, "update"),
            Self::Recover => write!(f, "recover"),
            Self::Encrypt => write!(f, "encrypt"),
        }
    }
}

impl FromStr for KeyOperation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sign" => Ok(Self::Sign),
            "update" => Ok(Self::Update),
            "recover" => Ok(Self::Recover),
            "encrypt" => Ok(Self::Encrypt),
            _ => tracerr!(Err::InvalidFormat, "unknown key operation: {}", s),
        }
    }
}

/// Pairwise identifier name for `persona` talking to `peer`: the first
/// [`PAIRWISE_NAME_LEN`] characters of base64url(SHA-256(persona ‖ peer)).
#[must_use]
pub fn pairwise_name(persona: &str, peer: &str) -> String {
    let digest = sha256([persona.as_bytes(), peer.as_bytes()].concat().as_slice());
    let mut name = base64url_encode(&digest);
    name.truncate(PAIRWISE_NAME_LEN);
    name
}

/// Key reference for `op` on the identifier named `identifier`.
#[must_use]
pub fn key_reference(identifier: &str, op: KeyOperation) -> String {
    format!("{identifier}_{op}")
}

/// Split a key reference into identifier name and operation.
///
/// # Errors
///
/// * `InvalidFormat` - The reference does not end in `_<operation>`.
pub fn parse_key_reference(reference: &str) -> Result<(&str, KeyOperation)> {
    let Some((identifier, op)) = reference.rsplit_once('_') else {
        tracerr!(Err::InvalidFormat, "key reference has no operation: {}", reference);
    };
    if identifier.is_empty() {
        tracerr!(Err::InvalidFormat, "key reference has no identifier: {}", reference);
    }
    Ok((identifier, op.parse()?))
}
