//! Long-form DIDs, which embed the create operation so the DID resolves before anchoring.
//!
//! `did:<method>[:<network>]:<suffix>?-<method>-initial-state=<suffix data>.<patch data>`

use std::fmt::Display;
use std::str::FromStr;

use serde_json::Value;

use crate::codec::{base64url_decode, check_multihash, hash_data};
use crate::error::Err;
use crate::sidetree::{check_patch_data, compute_unique_suffix, PatchData, SuffixData};
use crate::{tracerr, Error, Result};

/// A parsed and validated long-form DID.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LongFormDid {
    /// DID method, for example `ion`.
    pub method: String,

    /// Network qualifier, if any.
    pub network: Option<String>,

    /// Unique suffix.
    pub suffix: String,

    /// Decoded suffix data.
    pub suffix_data: SuffixData,

    /// Decoded patch data.
    pub patch_data: PatchData,

    suffix_data_encoded: String,
    patch_data_encoded: String,
}

/// `did:<method>[:<network>]:`. `mainnet` is the unqualified network.
pub(crate) fn did_prefix(method: &str, network: Option<&str>) -> String {
    match network {
        Some(network) if network != "mainnet" => format!("did:{method}:{network}:"),
        _ => format!("did:{method}:"),
    }
}

impl LongFormDid {
    /// Assemble a long-form DID from its encoded initial state. The suffix is derived from
    /// `suffix_data_encoded`.
    ///
    /// # Errors
    ///
    /// See [`LongFormDid::parse`].
    pub fn new(
        method: &str, network: Option<&str>, suffix_data_encoded: &str, patch_data_encoded: &str,
    ) -> Result<Self> {
        let did = format!(
            "{}{}?-{method}-initial-state={suffix_data_encoded}.{patch_data_encoded}",
            did_prefix(method, network),
            compute_unique_suffix(suffix_data_encoded)?,
        );
        Self::parse(&did)
    }

    /// Parse a long-form DID, checking that the suffix is the hash of the embedded suffix data
    /// and that `patchDataHash` is the hash of the embedded patch data.
    ///
    /// # Errors
    ///
    /// * `InvalidFormat` - The string is not a long-form DID or the initial state is malformed
    ///   or oversized.
    /// * `InvalidHash` - A hash or commitment is not a SHA-256 multihash, or does not match.
    pub fn parse(did: &str) -> Result<Self> {
        let Some(rest) = did.strip_prefix("did:") else {
            tracerr!(Err::InvalidFormat, "not a DID: {}", did);
        };
        let Some((id, state)) = rest.split_once('?') else {
            tracerr!(Err::InvalidFormat, "DID has no initial state: {}", did);
        };

        let segments: Vec<&str> = id.split(':').collect();
        let (method, network, suffix) = match segments.as_slice() {
            [method, suffix] => (*method, None, *suffix),
            [method, network, suffix] => (*method, Some((*network).to_string()), *suffix),
            _ => tracerr!(Err::InvalidFormat, "unexpected DID segments: {}", id),
        };
        if method.is_empty() || suffix.is_empty() {
            tracerr!(Err::InvalidFormat, "empty method or suffix: {}", id);
        }

        let param = format!("-{method}-initial-state=");
        let Some(encoded) = state.strip_prefix(&param) else {
            tracerr!(Err::InvalidFormat, "expected '{}' parameter", param);
        };
        let Some((suffix_data_encoded, patch_data_encoded)) = encoded.split_once('.') else {
            tracerr!(Err::InvalidFormat, "initial state must be '<suffix data>.<patch data>'");
        };

        if compute_unique_suffix(suffix_data_encoded)? != suffix {
            tracerr!(Err::InvalidHash, "suffix does not match suffix data");
        }
        let suffix_data: SuffixData = decode(suffix_data_encoded, "suffix data")?;
        check_multihash(&suffix_data.patch_data_hash)?;
        check_multihash(&suffix_data.recovery_commitment_hash)?;

        // hash the JSON as received rather than the typed re-serialization
        let patch_value: Value = decode(patch_data_encoded, "patch data")?;
        if hash_data(&patch_value)? != suffix_data.patch_data_hash {
            tracerr!(Err::InvalidHash, "patchDataHash does not match patch data");
        }
        let patch_data: PatchData = match serde_json::from_value(patch_value) {
            Ok(patch_data) => patch_data,
            Err(e) => tracerr!(Err::InvalidFormat, "invalid patch data: {}", e),
        };
        check_patch_data(&patch_data)?;
        check_multihash(&patch_data.update_commitment_hash)?;

        Ok(Self {
            method: method.to_string(),
            network,
            suffix: suffix.to_string(),
            suffix_data,
            patch_data,
            suffix_data_encoded: suffix_data_encoded.to_string(),
            patch_data_encoded: patch_data_encoded.to_string(),
        })
    }

    /// The DID without its initial state.
    #[must_use]
    pub fn short_form(&self) -> String {
        format!("{}{}", did_prefix(&self.method, self.network.as_deref()), self.suffix)
    }
}

fn decode<T: serde::de::DeserializeOwned>(encoded: &str, what: &str) -> Result<T> {
    let bytes = base64url_decode(encoded)?;
    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(value),
        Err(e) => tracerr!(Err::InvalidFormat, "invalid {}: {}", what, e),
    }
}

impl Display for LongFormDid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}?-{}-initial-state={}.{}",
            self.short_form(),
            self.method,
            self.suffix_data_encoded,
            self.patch_data_encoded
        )
    }
}

impl FromStr for LongFormDid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
