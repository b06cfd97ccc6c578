//! Tests for long-form Sidetree DIDs.

use std::sync::Arc;

use insta::assert_json_snapshot as assert_snapshot;
use test_utils::PlatformVault;
use vercre_wallet_crypto::codec::{base64url_encode, canonicalize, hash_data};
use vercre_wallet_crypto::error::Err;
use vercre_wallet_crypto::jose::{Header, JwsToken, SigningAlgorithm};
use vercre_wallet_crypto::providers::SoftwareProvider;
use vercre_wallet_crypto::sidetree::{compute_unique_suffix, Service};
use vercre_wallet_crypto::subtle::{names, KeyHandle};
use vercre_wallet_crypto::{
    Jwk, LongFormDid, PlatformKeyStoreProvider, ProviderRegistry, Registration, Scope,
    SidetreeProcessor,
};

#[test]
fn long_form_resolves_locally() {
    let registry = Arc::new(ProviderRegistry::with_defaults());
    let service = Service {
        id: "domain-1".to_string(),
        type_: "LinkedDomains".to_string(),
        service_endpoint: "https://wallet.example".to_string(),
    };
    let payload =
        SidetreeProcessor::new(registry).generate_create_payload(&[service]).expect("create");

    assert!(payload.did.starts_with(&format!("{}?-ion-initial-state=", payload.short_did)));
    assert_eq!(payload.short_did, format!("did:ion:{}", payload.suffix));

    let did: LongFormDid = payload.did.parse().expect("should parse");
    assert_eq!(did.suffix, payload.suffix);
    assert_eq!(did.patch_data, payload.patch_data);
    assert_eq!(did.to_string(), payload.did);

    let encoded = base64url_encode(&canonicalize(&payload.suffix_data).expect("canonical"));
    assert_eq!(compute_unique_suffix(&encoded).expect("suffix"), payload.suffix);
    let patch_hash = hash_data(&payload.patch_data).expect("hash");
    assert_eq!(payload.suffix_data.patch_data_hash, patch_hash);

    let document = &payload.patch_data.patches[0].document;
    let entry = &document.public_keys[0];
    assert_eq!(entry.id, payload.signing_key_id);
    assert_eq!(entry.public_key_jwk.crv.as_deref(), Some("secp256k1"));
    assert!(entry.public_key_jwk.d.is_none());
    assert_eq!(document.services.as_ref().map(Vec::len), Some(1));
}

// The published key verifies tokens signed with the generated signing key.
#[test]
fn signing_key_matches_document() {
    let registry = Arc::new(ProviderRegistry::with_defaults());
    let payload =
        SidetreeProcessor::new(Arc::clone(&registry)).generate_create_payload(&[]).expect("create");

    let kid = format!("{}#{}", payload.did, payload.signing_key_id);
    let mut jws = JwsToken::new(b"credential".to_vec());
    let header = Header::new(SigningAlgorithm::Es256k, &kid);
    jws.sign(&registry, &payload.signing_key.private_key, header).expect("should sign");

    let entry = &payload.patch_data.patches[0].document.public_keys[0];
    let published = Jwk { kid: Some(kid), ..entry.public_key_jwk.clone() };
    assert!(jws.verify(&registry, &[published]).expect("should verify"));
}

// A platform provider registered for private ECDSA keys holds both Sidetree keys.
#[test]
fn platform_backed_create() {
    let vault = Arc::new(PlatformVault::new());
    let platform = PlatformKeyStoreProvider::new(vault.clone(), Arc::new(SoftwareProvider));
    let mut registry = ProviderRegistry::with_defaults();
    let registration = Registration::new(Arc::new(platform), Scope::Private);
    registry.add_message_signer(names::ECDSA, registration);

    let payload = SidetreeProcessor::new(Arc::new(registry))
        .network("test")
        .generate_create_payload(&[])
        .expect("create");
    assert!(payload.did.starts_with("did:ion:test:"));

    for pair in [&payload.signing_key, &payload.recovery_key] {
        let KeyHandle::HardwareRef(alias) = &pair.private_key.handle else {
            panic!("expected a platform key");
        };
        assert!(vault.contains(alias));
    }
    let did: LongFormDid = payload.did.parse().expect("should parse");
    assert_eq!(did.network.as_deref(), Some("test"));
}

#[test]
fn rejects_other_dids() {
    let registry = Arc::new(ProviderRegistry::with_defaults());
    let payload = SidetreeProcessor::new(registry).generate_create_payload(&[]).expect("create");

    let err = payload.short_did.parse::<LongFormDid>().expect_err("short form");
    assert!(err.is(Err::InvalidFormat));

    // the initial-state parameter names the method
    let other = payload.did.replacen("did:ion:", "did:web:", 1);
    let err = other.parse::<LongFormDid>().expect_err("wrong method");
    assert!(err.is(Err::InvalidFormat));
}

// Generated values are redacted; the layout is what anchoring services expect.
#[test]
fn patch_data_layout() {
    let registry = Arc::new(ProviderRegistry::with_defaults());
    let payload = SidetreeProcessor::new(registry).generate_create_payload(&[]).expect("create");

    assert_snapshot!(payload.patch_data, {
        ".updateCommitmentHash" => "[commitment]",
        ".patches[].document.publicKeys[].id" => "[id]",
        ".patches[].document.publicKeys[].publicKeyJwk.x" => "[x]",
        ".patches[].document.publicKeys[].publicKeyJwk.y" => "[y]",
    }, @r###"
    {
      "updateCommitmentHash": "[commitment]",
      "patches": [
        {
          "action": "replace",
          "document": {
            "publicKeys": [
              {
                "id": "[id]",
                "type": "EcdsaSecp256k1VerificationKey2019",
                "publicKeyJwk": {
                  "kty": "EC",
                  "crv": "secp256k1",
                  "x": "[x]",
                  "y": "[y]"
                },
                "purposes": [
                  "authentication",
                  "assertionMethod"
                ]
              }
            ]
          }
        }
      ]
    }
    "###);
}
