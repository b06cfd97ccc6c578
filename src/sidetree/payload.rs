//! Sidetree create operation structures. Field names follow the Sidetree JSON wire format.

use serde::{Deserialize, Serialize};

use crate::subtle::{CryptoKeyPair, Jwk};

/// Verification method type of keys published in the initial document.
pub const SECP256K1_VERIFICATION_KEY: &str = "EcdsaSecp256k1VerificationKey2019";

/// Relationships a published key may be used for.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum KeyPurpose {
    /// Authenticate as the DID subject.
    Authentication,
    /// Issue assertions such as credentials.
    AssertionMethod,
    /// Key agreement for encryption.
    KeyAgreement,
    /// Invoke capabilities.
    CapabilityInvocation,
    /// Delegate capabilities.
    CapabilityDelegation,
}

/// A public key entry in the document patch.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyEntry {
    /// Fragment identifier of the key within the DID document.
    pub id: String,

    /// Verification method type.
    #[serde(rename = "type")]
    pub type_: String,

    /// Public key, `kty`/`crv`/`x`/`y` members only.
    pub public_key_jwk: Jwk,

    /// Verification relationships.
    pub purposes: Vec<KeyPurpose>,
}

/// A service endpoint in the document patch.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// Fragment identifier of the service.
    pub id: String,

    /// Service type.
    #[serde(rename = "type")]
    pub type_: String,

    /// Endpoint URL.
    pub service_endpoint: String,
}

/// Document content set by a `replace` patch.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PatchDocument {
    /// Published keys.
    pub public_keys: Vec<PublicKeyEntry>,

    /// Service endpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<Service>>,
}

/// Patch action.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PatchAction {
    /// Replace the whole document.
    #[default]
    Replace,
}

/// A document patch.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DocumentPatch {
    /// Patch action.
    pub action: PatchAction,

    /// Document content.
    pub document: PatchDocument,
}

/// The create operation's delta: the initial document and the next update commitment.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PatchData {
    /// Multihash commitment to the update reveal value.
    pub update_commitment_hash: String,

    /// Patches applied to the empty document.
    pub patches: Vec<DocumentPatch>,
}

/// The create operation's suffix data. Its hash is the DID's unique suffix.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SuffixData {
    /// Multihash of the canonical patch data.
    pub patch_data_hash: String,

    /// Recovery public key.
    pub recovery_key: Jwk,

    /// Multihash commitment to the recovery reveal value.
    pub recovery_commitment_hash: String,
}

/// Everything produced by a create operation.
///
/// The reveal values and private keys are returned to the caller and are not kept here. Losing
/// the reveal values makes the identifier permanently non-updatable.
#[derive(Clone, Debug)]
pub struct CreatePayload {
    /// Long-form DID embedding the initial state.
    pub did: String,

    /// Short-form DID, usable once the create operation is anchored.
    pub short_did: String,

    /// Unique suffix.
    pub suffix: String,

    /// Suffix data as embedded in the DID.
    pub suffix_data: SuffixData,

    /// Patch data as embedded in the DID.
    pub patch_data: PatchData,

    /// Fragment id of the published signing key.
    pub signing_key_id: String,

    /// Signing key pair. The public half is published in the document.
    pub signing_key: CryptoKeyPair,

    /// Recovery key pair. The public half is the suffix data's `recoveryKey`.
    pub recovery_key: CryptoKeyPair,

    /// Value revealed to authorize the first update.
    pub update_reveal: Vec<u8>,

    /// Value revealed to authorize recovery.
    pub recovery_reveal: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn wire_names() {
        let patch = PatchData {
            update_commitment_hash: "EiA".to_string(),
            patches: vec![DocumentPatch {
                action: PatchAction::Replace,
                document: PatchDocument {
                    public_keys: vec![PublicKeyEntry {
                        id: "sign_01".to_string(),
                        type_: SECP256K1_VERIFICATION_KEY.to_string(),
                        public_key_jwk: Jwk {
                            kty: "EC".to_string(),
                            ..Jwk::default()
                        },
                        purposes: vec![KeyPurpose::Authentication, KeyPurpose::AssertionMethod],
                    }],
                    services: Some(vec![Service {
                        id: "hub".to_string(),
                        type_: "IdentityHub".to_string(),
                        service_endpoint: "https://hub.example.com".to_string(),
                    }]),
                },
            }],
        };

        let value = serde_json::to_value(&patch).expect("should serialize");
        assert_eq!(
            value,
            json!({
                "updateCommitmentHash": "EiA",
                "patches": [{
                    "action": "replace",
                    "document": {
                        "publicKeys": [{
                            "id": "sign_01",
                            "type": "EcdsaSecp256k1VerificationKey2019",
                            "publicKeyJwk": {"kty": "EC"},
                            "purposes": ["authentication", "assertionMethod"]
                        }],
                        "services": [{
                            "id": "hub",
                            "type": "IdentityHub",
                            "serviceEndpoint": "https://hub.example.com"
                        }]
                    }
                }]
            })
        );
        let back: PatchData = serde_json::from_value(value).expect("should deserialize");
        assert_eq!(back, patch);
    }
}
