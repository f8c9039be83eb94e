//! # DID Documents & Resolution
//!
//! The wallet consumes W3C DID documents (DID Core v1.0) but never writes
//! them — resolution is delegated to a [`DidResolver`] injected at
//! construction, and the wallet reads only the verification relationships it
//! needs (`authentication` for presentation proofs, `assertionMethod` for
//! issuance).
//!
//! Relationship entries in the wild come in two shapes: a string reference
//! to a verification method declared under `verificationMethod`, or a fully
//! embedded method object. [`VerificationRef`] models both and
//! [`DidDocument::methods_for`] flattens them into one list so the proof
//! engine doesn't care which shape the document used.
//!
//! [`key_did_document`] builds a single-key document in the style of
//! fingerprint-based DID methods (same key referenced from both
//! `authentication` and `assertionMethod` as `<did>#key-1`) — handy for
//! embedders that mint DIDs straight from key material, and for tests.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{BLS12381_G2_KEY_2020, ED25519_VERIFICATION_KEY_2018};
use crate::error::{Result, WalletError};

/// Context URI for the W3C DID Core specification.
pub const DID_V1_CONTEXT: &str = "https://www.w3.org/ns/did/v1";

/// The verification relationships the wallet understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationRelationship {
    /// Keys the controller authenticates with (presentation proofs).
    Authentication,
    /// Keys the controller asserts claims with (credential issuance).
    AssertionMethod,
}

impl VerificationRelationship {
    /// The proof-purpose string carried in a linked-data proof.
    pub fn purpose(self) -> &'static str {
        match self {
            Self::Authentication => crate::config::PURPOSE_AUTHENTICATION,
            Self::AssertionMethod => crate::config::PURPOSE_ASSERTION_METHOD,
        }
    }
}

/// A verification method entry: one public key owned by a DID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationMethod {
    /// DID URL of this method, e.g. `did:example:alice#key-1`.
    pub id: String,

    /// Key type, e.g. `Ed25519VerificationKey2018` or `Bls12381G2Key2020`.
    #[serde(rename = "type")]
    pub method_type: String,

    /// The DID that controls this key.
    pub controller: String,

    /// Raw public key in base58btc.
    #[serde(
        rename = "publicKeyBase58",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub public_key_base58: Option<String>,

    /// Public key in multibase encoding (`z` prefix = base58btc over a
    /// multicodec-tagged key).
    #[serde(
        rename = "publicKeyMultibase",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub public_key_multibase: Option<String>,
}

impl VerificationMethod {
    /// Decode the raw public key bytes from whichever encoding the method
    /// carries. Multibase values have their two-byte multicodec prefix
    /// stripped.
    pub fn public_key_bytes(&self) -> Result<Vec<u8>> {
        if let Some(b58) = &self.public_key_base58 {
            return bs58::decode(b58)
                .into_vec()
                .map_err(|e| WalletError::KeyNotFound(format!("bad publicKeyBase58: {e}")));
        }

        if let Some(multibase) = &self.public_key_multibase {
            let encoded = multibase.strip_prefix('z').ok_or_else(|| {
                WalletError::KeyNotFound(format!(
                    "unsupported multibase prefix in '{multibase}'"
                ))
            })?;
            let decoded = bs58::decode(encoded)
                .into_vec()
                .map_err(|e| WalletError::KeyNotFound(format!("bad publicKeyMultibase: {e}")))?;
            if decoded.len() <= 2 {
                return Err(WalletError::KeyNotFound(
                    "multibase key too short".to_string(),
                ));
            }
            return Ok(decoded[2..].to_vec());
        }

        Err(WalletError::KeyNotFound(format!(
            "verification method '{}' carries no key material",
            self.id
        )))
    }
}

/// A relationship entry: either a reference to a declared method or an
/// embedded method object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VerificationRef {
    /// String reference to a method id under `verificationMethod`.
    Reference(String),
    /// Fully embedded verification method.
    Embedded(VerificationMethod),
}

/// A W3C DID document, reduced to the members the wallet reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DidDocument {
    /// JSON-LD context URIs.
    #[serde(rename = "@context", default)]
    pub context: Vec<String>,

    /// The DID this document describes.
    pub id: String,

    /// Declared verification methods.
    #[serde(rename = "verificationMethod", default)]
    pub verification_method: Vec<VerificationMethod>,

    /// Methods usable for authentication.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authentication: Vec<VerificationRef>,

    /// Methods usable for issuing assertions.
    #[serde(rename = "assertionMethod", default, skip_serializing_if = "Vec::is_empty")]
    pub assertion_method: Vec<VerificationRef>,

    /// Members the wallet doesn't interpret (services, keyAgreement, ...)
    /// but must not drop on round-trip.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl DidDocument {
    /// All verification methods registered under the given relationship,
    /// with string references resolved against `verificationMethod`.
    /// References that point nowhere are skipped rather than treated as
    /// errors — a document is allowed to dangle keys the wallet never uses.
    pub fn methods_for(&self, relationship: VerificationRelationship) -> Vec<&VerificationMethod> {
        let refs = match relationship {
            VerificationRelationship::Authentication => &self.authentication,
            VerificationRelationship::AssertionMethod => &self.assertion_method,
        };

        refs.iter()
            .filter_map(|r| match r {
                VerificationRef::Reference(id) => {
                    self.verification_method.iter().find(|vm| &vm.id == id)
                }
                VerificationRef::Embedded(vm) => Some(vm),
            })
            .collect()
    }

    /// Find a declared or embedded verification method by its full DID URL.
    pub fn find_method(&self, id: &str) -> Option<&VerificationMethod> {
        self.verification_method
            .iter()
            .find(|vm| vm.id == id)
            .or_else(|| {
                self.authentication
                    .iter()
                    .chain(self.assertion_method.iter())
                    .find_map(|r| match r {
                        VerificationRef::Embedded(vm) if vm.id == id => Some(vm),
                        _ => None,
                    })
            })
    }
}

/// The result of resolving a DID. Mirrors the `didDocument` envelope used
/// by stored resolution responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DidResolution {
    /// The resolved document.
    #[serde(rename = "didDocument")]
    pub did_document: DidDocument,
}

/// Maps a DID to its document. The wallet treats this as an opaque function;
/// network behavior, caching policy, and method support all live behind it.
pub trait DidResolver: Send + Sync {
    /// Resolve a DID to its document.
    fn resolve(&self, did: &str) -> Result<DidResolution>;
}

/// In-memory resolver over a fixed set of documents. The building block for
/// tests and for embedders that mint DIDs locally from key material.
#[derive(Default)]
pub struct StaticDidResolver {
    documents: parking_lot::RwLock<std::collections::HashMap<String, DidDocument>>,
}

impl StaticDidResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a document under its own id.
    pub fn register(&self, document: DidDocument) {
        self.documents
            .write()
            .insert(document.id.clone(), document);
    }
}

impl DidResolver for StaticDidResolver {
    fn resolve(&self, did: &str) -> Result<DidResolution> {
        self.documents
            .read()
            .get(did)
            .cloned()
            .map(|did_document| DidResolution { did_document })
            .ok_or_else(|| WalletError::DidNotResolvable(did.to_string()))
    }
}

/// Supported key types for [`key_did_document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DidKeyType {
    /// Ed25519 verification key.
    Ed25519,
    /// BLS12-381 G2 key for BBS+ suites.
    Bls12381G2,
}

/// Build a single-key DID document: the key becomes `<did>#key-1` and is
/// referenced from both `authentication` and `assertionMethod`.
pub fn key_did_document(did: &str, key_type: DidKeyType, public_key: &[u8]) -> DidDocument {
    let key_id = format!("{did}#key-1");
    let method_type = match key_type {
        DidKeyType::Ed25519 => ED25519_VERIFICATION_KEY_2018,
        DidKeyType::Bls12381G2 => BLS12381_G2_KEY_2020,
    };

    DidDocument {
        context: vec![DID_V1_CONTEXT.to_string()],
        id: did.to_string(),
        verification_method: vec![VerificationMethod {
            id: key_id.clone(),
            method_type: method_type.to_string(),
            controller: did.to_string(),
            public_key_base58: Some(bs58::encode(public_key).into_string()),
            public_key_multibase: None,
        }],
        authentication: vec![VerificationRef::Reference(key_id.clone())],
        assertion_method: vec![VerificationRef::Reference(key_id)],
        extra: serde_json::Map::new(),
    }
}

/// Split a verification-method DID URL into `(did, fragment)`.
pub fn split_did_url(vm_id: &str) -> (&str, Option<&str>) {
    match vm_id.split_once('#') {
        Some((did, fragment)) => (did, Some(fragment)),
        None => (vm_id, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> DidDocument {
        key_did_document("did:example:alice", DidKeyType::Ed25519, &[7u8; 32])
    }

    #[test]
    fn key_document_references_same_key_from_both_relationships() {
        let doc = sample_doc();
        assert_eq!(doc.verification_method.len(), 1);

        let auth = doc.methods_for(VerificationRelationship::Authentication);
        let assertion = doc.methods_for(VerificationRelationship::AssertionMethod);
        assert_eq!(auth.len(), 1);
        assert_eq!(assertion.len(), 1);
        assert_eq!(auth[0].id, "did:example:alice#key-1");
        assert_eq!(auth[0].id, assertion[0].id);
    }

    #[test]
    fn public_key_roundtrips_through_base58() {
        let doc = sample_doc();
        let bytes = doc.verification_method[0].public_key_bytes().unwrap();
        assert_eq!(bytes, vec![7u8; 32]);
    }

    #[test]
    fn multibase_key_strips_multicodec_prefix() {
        let mut raw = vec![0xed, 0x01];
        raw.extend_from_slice(&[9u8; 32]);
        let vm = VerificationMethod {
            id: "did:example:bob#key-1".into(),
            method_type: ED25519_VERIFICATION_KEY_2018.into(),
            controller: "did:example:bob".into(),
            public_key_base58: None,
            public_key_multibase: Some(format!("z{}", bs58::encode(&raw).into_string())),
        };
        assert_eq!(vm.public_key_bytes().unwrap(), vec![9u8; 32]);
    }

    #[test]
    fn method_without_key_material_errors() {
        let vm = VerificationMethod {
            id: "did:example:bob#key-1".into(),
            method_type: ED25519_VERIFICATION_KEY_2018.into(),
            controller: "did:example:bob".into(),
            public_key_base58: None,
            public_key_multibase: None,
        };
        assert!(matches!(
            vm.public_key_bytes(),
            Err(WalletError::KeyNotFound(_))
        ));
    }

    #[test]
    fn embedded_relationship_methods_are_found() {
        let embedded = VerificationMethod {
            id: "did:example:carol#auth-1".into(),
            method_type: ED25519_VERIFICATION_KEY_2018.into(),
            controller: "did:example:carol".into(),
            public_key_base58: Some(bs58::encode([1u8; 32]).into_string()),
            public_key_multibase: None,
        };
        let doc = DidDocument {
            context: vec![DID_V1_CONTEXT.to_string()],
            id: "did:example:carol".into(),
            verification_method: vec![],
            authentication: vec![VerificationRef::Embedded(embedded.clone())],
            assertion_method: vec![],
            extra: serde_json::Map::new(),
        };

        let methods = doc.methods_for(VerificationRelationship::Authentication);
        assert_eq!(methods, vec![&embedded]);
        assert!(doc.find_method("did:example:carol#auth-1").is_some());
    }

    #[test]
    fn dangling_references_are_skipped() {
        let mut doc = sample_doc();
        doc.authentication
            .push(VerificationRef::Reference("did:example:alice#gone".into()));
        assert_eq!(doc.methods_for(VerificationRelationship::Authentication).len(), 1);
    }

    #[test]
    fn static_resolver_hits_and_misses() {
        let resolver = StaticDidResolver::new();
        resolver.register(sample_doc());

        let resolution = resolver.resolve("did:example:alice").unwrap();
        assert_eq!(resolution.did_document.id, "did:example:alice");

        assert!(matches!(
            resolver.resolve("did:example:unknown"),
            Err(WalletError::DidNotResolvable(_))
        ));
    }

    #[test]
    fn did_document_serde_uses_w3c_member_names() {
        let doc = sample_doc();
        let value = serde_json::to_value(&doc).unwrap();
        assert!(value.get("@context").is_some());
        assert!(value.get("verificationMethod").is_some());
        assert!(value.get("assertionMethod").is_some());
        assert!(value.get("assertion_method").is_none());

        let back: DidDocument = serde_json::from_value(value).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn split_did_url_separates_fragment() {
        assert_eq!(
            split_did_url("did:example:alice#key-1"),
            ("did:example:alice", Some("key-1"))
        );
        assert_eq!(split_did_url("did:example:alice"), ("did:example:alice", None));
    }

    #[test]
    fn purpose_strings_match_wire_vocabulary() {
        assert_eq!(VerificationRelationship::Authentication.purpose(), "authentication");
        assert_eq!(VerificationRelationship::AssertionMethod.purpose(), "assertionMethod");
    }
}
