//! # JSON Web Signature
//!
//! JWS ([RFC7515]) tokens signed and verified through the provider registry. A token holds one
//! payload and any number of signatures. The compact and flattened serializations carry exactly
//! one signature; the general JSON serialization carries all of them.
//!
//! The signing input of each signature is `ASCII(BASE64URL(protected) || '.' ||
//! BASE64URL(payload))`, where `protected` is kept exactly as encoded so a parsed token verifies
//! against the bytes that were signed.
//!
//! [RFC7515]: https://www.rfc-editor.org/rfc/rfc7515

use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::codec::{base64url_decode, base64url_encode};
use crate::error::Err;
use crate::jose::SigningAlgorithm;
use crate::subtle::{CryptoKey, Jwk, KeyData, KeyUsage, ProviderRegistry};
use crate::{tracerr, Error, Result};

/// JWS serialization formats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    /// `header.payload.signature`
    #[default]
    Compact,

    /// JSON object with a single signature at the top level.
    Flattened,

    /// JSON object with a `signatures` array.
    General,
}

/// Protected header.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Header {
    /// Signing algorithm.
    pub alg: SigningAlgorithm,

    /// Identifies the key used to sign.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Media type of the complete token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,

    /// Content type of the payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cty: Option<String>,

    /// Any other header members.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Header {
    /// Header for `alg` naming the signing key `kid`.
    #[must_use]
    pub fn new(alg: SigningAlgorithm, kid: impl Into<String>) -> Self {
        Self {
            alg,
            kid: Some(kid.into()),
            ..Self::default()
        }
    }
}

/// One signature over the token payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// Protected header, decoded.
    pub header: Header,

    /// Unprotected header members, if any.
    pub unprotected: Option<Map<String, Value>>,

    protected: String,
    signature: Vec<u8>,
}

impl Signature {
    /// The base64url-encoded protected header as signed.
    #[must_use]
    pub fn protected(&self) -> &str {
        &self.protected
    }

    /// Raw signature bytes.
    #[must_use]
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    // `kid` from the protected header, falling back to the unprotected header.
    fn kid(&self) -> Option<&str> {
        self.header.kid.as_deref().or_else(|| {
            self.unprotected.as_ref().and_then(|h| h.get("kid")).and_then(Value::as_str)
        })
    }

    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("protected".to_string(), Value::String(self.protected.clone()));
        if let Some(unprotected) = &self.unprotected {
            obj.insert("header".to_string(), Value::Object(unprotected.clone()));
        }
        obj.insert("signature".to_string(), Value::String(base64url_encode(&self.signature)));
        Value::Object(obj)
    }

    fn from_parts(
        protected: &str, unprotected: Option<Map<String, Value>>, signature: &str,
    ) -> Result<Self> {
        let header_bytes = base64url_decode(protected)?;
        let header: Header = match serde_json::from_slice(&header_bytes) {
            Ok(header) => header,
            Err(e) => tracerr!(Err::InvalidFormat, "invalid JWS header: {}", e),
        };
        Ok(Self {
            header,
            unprotected,
            protected: protected.to_string(),
            signature: base64url_decode(signature)?,
        })
    }
}

/// A JWS: payload plus signatures.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JwsToken {
    payload: Vec<u8>,
    signatures: Vec<Signature>,
}

// JSON serialization shapes.
#[derive(Deserialize, Serialize)]
struct JsonSignature {
    protected: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    header: Option<Map<String, Value>>,
    signature: String,
}

#[derive(Deserialize)]
struct GeneralJson {
    payload: String,
    signatures: Vec<JsonSignature>,
}

#[derive(Deserialize)]
struct FlattenedJson {
    payload: String,
    #[serde(flatten)]
    signature: JsonSignature,
}

impl JwsToken {
    /// Unsigned token over `payload`.
    #[must_use]
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            signatures: Vec::new(),
        }
    }

    /// Payload bytes.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.payload
    }

    /// Deserialize the payload as JSON.
    ///
    /// # Errors
    ///
    /// * `DeserializationError` - The payload is not the expected JSON.
    pub fn claims<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.payload)?)
    }

    /// Signatures in the order they were added.
    #[must_use]
    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// Sign the payload with `key` and append the signature.
    ///
    /// The provider is resolved from `registry` by `header.alg`: the message signer registered
    /// for private keys, or the MAC signer for `HS*`.
    ///
    /// # Errors
    ///
    /// * `UnsupportedUsage` - The key does not permit signing or belongs to another algorithm.
    /// * `SerializationError` - The header cannot be serialized.
    /// * Any failure of the provider.
    pub fn sign(
        &mut self, registry: &ProviderRegistry, key: &CryptoKey, header: Header,
    ) -> Result<()> {
        let jwa = header.alg;
        let provider = registry.get(jwa.category(), jwa.provider_name(), jwa.scope(true))?;

        let protected = base64url_encode(&serde_json::to_vec(&header)?);
        let input = self.signing_input(&protected);
        let signature = provider.sign(&jwa.algorithm(), key, input.as_bytes())?;
        tracing::debug!("JWS signed with {jwa} by '{}'", provider.name());

        self.signatures.push(Signature {
            header,
            unprotected: None,
            protected,
            signature,
        });
        Ok(())
    }

    /// Verify the token against `candidates`.
    ///
    /// Returns `true` as soon as any signature verifies under any candidate key. A signature
    /// naming a `kid` is only tried against candidates with the same `kid`; a signature without
    /// one is tried against every candidate. Candidates that cannot be imported for a
    /// signature's algorithm are skipped.
    ///
    /// # Errors
    ///
    /// * `SignatureError` - The token carries no signatures.
    pub fn verify(&self, registry: &ProviderRegistry, candidates: &[Jwk]) -> Result<bool> {
        if self.signatures.is_empty() {
            tracerr!(Err::SignatureError, "token has no signatures");
        }

        for sig in &self.signatures {
            let jwa = sig.header.alg;
            let alg = jwa.algorithm();
            let provider = registry.get(jwa.category(), jwa.provider_name(), jwa.scope(false))?;
            let input = self.signing_input(&sig.protected);

            for jwk in candidates {
                if let Some(want) = sig.kid() {
                    if jwk.kid.as_deref() != Some(want) {
                        continue;
                    }
                }

                let public = if jwa.is_mac() {
                    jwk.clone()
                } else {
                    jwk.to_public()
                };
                let imported =
                    provider.import_key(KeyData::Jwk(public), &alg, true, &[KeyUsage::Verify]);
                let key = match imported {
                    Ok(key) => key,
                    Err(e) => {
                        tracing::debug!("skipping candidate for {jwa}: {e}");
                        continue;
                    }
                };
                if provider.verify(&alg, &key, &sig.signature, input.as_bytes())? {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    /// Serialize the token.
    ///
    /// # Errors
    ///
    /// * `InvalidFormat` - Compact and flattened output need exactly one signature; general
    ///   output needs at least one.
    pub fn serialize(&self, format: Format) -> Result<String> {
        let payload = base64url_encode(&self.payload);

        match format {
            Format::Compact | Format::Flattened => {
                let [sig] = self.signatures.as_slice() else {
                    tracerr!(
                        Err::InvalidFormat,
                        "{:?} serialization needs exactly one signature, token has {}",
                        format,
                        self.signatures.len()
                    );
                };
                if format == Format::Compact {
                    let signature = base64url_encode(&sig.signature);
                    return Ok(format!("{}.{payload}.{signature}", sig.protected));
                }
                let Value::Object(mut obj) = sig.to_json() else {
                    tracerr!(Err::SerializationError, "signature did not serialize to an object");
                };
                obj.insert("payload".to_string(), Value::String(payload));
                Ok(serde_json::to_string(&obj)?)
            }
            Format::General => {
                if self.signatures.is_empty() {
                    tracerr!(Err::InvalidFormat, "general serialization needs a signature");
                }
                let signatures: Vec<Value> =
                    self.signatures.iter().map(Signature::to_json).collect();
                Ok(serde_json::to_string(&serde_json::json!({
                    "payload": payload,
                    "signatures": signatures,
                }))?)
            }
        }
    }

    /// Parse a token in any of the three serializations. JSON input with a `signatures` member
    /// is read as general, other JSON as flattened, and anything else as compact.
    ///
    /// # Errors
    ///
    /// * `InvalidFormat` - The input is not a well-formed JWS.
    pub fn deserialize(token: &str) -> Result<Self> {
        let token = token.trim();

        if !token.starts_with('{') {
            let parts: Vec<&str> = token.split('.').collect();
            let [protected, payload, signature] = parts.as_slice() else {
                tracerr!(Err::InvalidFormat, "compact JWS must have 3 parts, got {}", parts.len());
            };
            return Ok(Self {
                payload: base64url_decode(payload)?,
                signatures: vec![Signature::from_parts(protected, None, signature)?],
            });
        }

        let value: Value = match serde_json::from_str(token) {
            Ok(value) => value,
            Err(e) => tracerr!(Err::InvalidFormat, "invalid JWS JSON: {}", e),
        };
        let (payload, signatures) = if value.get("signatures").is_some() {
            let general: GeneralJson = match serde_json::from_value(value) {
                Ok(general) => general,
                Err(e) => tracerr!(Err::InvalidFormat, "invalid general JWS: {}", e),
            };
            (general.payload, general.signatures)
        } else {
            let flattened: FlattenedJson = match serde_json::from_value(value) {
                Ok(flattened) => flattened,
                Err(e) => tracerr!(Err::InvalidFormat, "invalid flattened JWS: {}", e),
            };
            (flattened.payload, vec![flattened.signature])
        };

        if signatures.is_empty() {
            tracerr!(Err::InvalidFormat, "JWS has no signatures");
        }
        let signatures = signatures
            .into_iter()
            .map(|s| Signature::from_parts(&s.protected, s.header, &s.signature))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            payload: base64url_decode(&payload)?,
            signatures,
        })
    }

    fn signing_input(&self, protected: &str) -> String {
        format!("{protected}.{}", base64url_encode(&self.payload))
    }
}

impl FromStr for JwsToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::deserialize(s)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::subtle::{Algorithm, HashAlgorithm, KeyFormat, Provider, Scope};

    fn es256k_key(registry: &ProviderRegistry) -> (CryptoKey, Jwk) {
        let provider =
            registry.get_message_signer("ECDSA", Scope::Private).expect("should resolve");
        let pair = provider
            .generate_key_pair(
                &Algorithm::ecdsa_secp256k1(HashAlgorithm::Sha256),
                true,
                &[KeyUsage::Sign, KeyUsage::Verify],
            )
            .expect("should generate");
        let KeyData::Jwk(jwk) =
            provider.export_key(KeyFormat::Jwk, &pair.public_key).expect("should export")
        else {
            panic!("expected JWK");
        };
        (pair.private_key, jwk)
    }

    #[test]
    fn compact_sign_verify() {
        let registry = ProviderRegistry::with_defaults();
        let (key, jwk) = es256k_key(&registry);
        let jwk = Jwk { kid: Some("#sign".to_string()), ..jwk };

        let mut jws = JwsToken::new(br#"{"iss":"did:ion:test"}"#.to_vec());
        jws.sign(&registry, &key, Header::new(SigningAlgorithm::Es256k, "#sign"))
            .expect("should sign");
        let compact = jws.serialize(Format::Compact).expect("should serialize");
        assert_eq!(compact.split('.').count(), 3);

        let parsed = JwsToken::deserialize(&compact).expect("should parse");
        assert_eq!(parsed.signatures()[0].signature().len(), 64);
        assert_eq!(parsed.claims::<Value>().expect("claims"), json!({"iss": "did:ion:test"}));
        assert!(parsed.verify(&registry, &[jwk.clone()]).expect("should verify"));

        // tampered payload
        let other = base64url_encode(b"{}");
        let mut parts: Vec<&str> = compact.split('.').collect();
        parts[1] = &other;
        let tampered = JwsToken::deserialize(&parts.join(".")).expect("should parse");
        assert!(!tampered.verify(&registry, &[jwk]).expect("should verify"));
    }

    #[test]
    fn kid_filters_candidates() {
        let registry = ProviderRegistry::with_defaults();
        let (key, jwk) = es256k_key(&registry);
        let (_, other) = es256k_key(&registry);

        let mut jws = JwsToken::new(b"payload".to_vec());
        jws.sign(&registry, &key, Header::new(SigningAlgorithm::Es256k, "k1")).expect("sign");

        let right = Jwk { kid: Some("k1".to_string()), ..jwk.clone() };
        let wrong_kid = Jwk { kid: Some("k2".to_string()), ..jwk };
        let wrong_key = Jwk { kid: Some("k1".to_string()), ..other };
        let no_kid = Jwk { kid: None, ..right.clone() };

        assert!(!jws.verify(&registry, &[no_kid]).expect("verify"));
        assert!(!jws.verify(&registry, &[wrong_kid.clone()]).expect("verify"));
        assert!(!jws.verify(&registry, &[wrong_key.clone()]).expect("verify"));
        assert!(jws.verify(&registry, &[wrong_kid, wrong_key, right]).expect("verify"));
    }

    #[test]
    fn general_multi_signature() {
        let registry = ProviderRegistry::with_defaults();
        let (key1, jwk1) = es256k_key(&registry);
        let (key2, jwk2) = es256k_key(&registry);
        let jwk1 = Jwk { kid: Some("a".to_string()), ..jwk1 };
        let jwk2 = Jwk { kid: Some("b".to_string()), ..jwk2 };

        let mut jws = JwsToken::new(b"two signers".to_vec());
        jws.sign(&registry, &key1, Header::new(SigningAlgorithm::Es256k, "a")).expect("sign");
        jws.sign(&registry, &key2, Header::new(SigningAlgorithm::Es256k, "b")).expect("sign");

        let err = jws.serialize(Format::Compact).expect_err("two signatures");
        assert!(err.is(Err::InvalidFormat));

        let general = jws.serialize(Format::General).expect("should serialize");
        let value: Value = serde_json::from_str(&general).expect("json");
        assert_eq!(value["signatures"].as_array().map(Vec::len), Some(2));

        let parsed: JwsToken = general.parse().expect("should parse");
        assert_eq!(parsed, jws);
        assert!(parsed.verify(&registry, &[jwk2]).expect("verify"));
        assert!(parsed.verify(&registry, &[jwk1]).expect("verify"));
    }

    #[test]
    fn flattened_with_unprotected_header() {
        let registry = ProviderRegistry::with_defaults();
        let (key, jwk) = es256k_key(&registry);

        let header = Header {
            alg: SigningAlgorithm::Es256k,
            typ: Some("JWT".to_string()),
            extra: Map::from_iter([("crit-free".to_string(), json!(true))]),
            ..Header::default()
        };
        let mut jws = JwsToken::new(b"flat".to_vec());
        jws.sign(&registry, &key, header).expect("sign");

        let flattened = jws.serialize(Format::Flattened).expect("should serialize");
        let mut value: Value = serde_json::from_str(&flattened).expect("json");
        assert!(value.get("signatures").is_none());
        value["header"] = json!({"kid": "unprotected"});

        let parsed = JwsToken::deserialize(&value.to_string()).expect("should parse");
        let sig = &parsed.signatures()[0];
        assert_eq!(sig.header.typ.as_deref(), Some("JWT"));
        assert_eq!(sig.header.extra["crit-free"], json!(true));
        assert_eq!(sig.kid(), Some("unprotected"));

        let jwk = Jwk { kid: Some("unprotected".to_string()), ..jwk };
        assert!(parsed.verify(&registry, &[jwk]).expect("verify"));
    }

    #[test]
    fn hmac_token() {
        let registry = ProviderRegistry::with_defaults();
        let provider = registry.get_mac_signer("HMAC", Scope::All).expect("mac");
        let usages = [KeyUsage::Sign, KeyUsage::Verify];
        let key = provider
            .generate_key(&Algorithm::hmac(HashAlgorithm::Sha384), true, &usages)
            .expect("should generate");
        let KeyData::Jwk(jwk) = provider.export_key(KeyFormat::Jwk, &key).expect("export") else {
            panic!("expected JWK");
        };

        let mut jws = JwsToken::new(b"mac".to_vec());
        jws.sign(&registry, &key, Header { alg: SigningAlgorithm::Hs384, ..Header::default() })
            .expect("sign");
        assert_eq!(jws.signatures()[0].signature().len(), 48);
        assert!(jws.verify(&registry, &[jwk]).expect("verify"));
    }

    #[test]
    fn malformed_input() {
        for token in ["a.b", "a.b.c.d", "{\"payload\":\"\"}", "{not json", "!!.e30.AA"] {
            let err = JwsToken::deserialize(token).expect_err(token);
            assert!(err.is(Err::InvalidFormat), "{token}: {err}");
        }
        let err = JwsToken::new(b"x".to_vec()).verify(&ProviderRegistry::with_defaults(), &[]);
        assert!(err.is_err_and(|e| e.is(Err::SignatureError)));
    }
}
