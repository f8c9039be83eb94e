//! # Credential & Presentation Data Model
//!
//! W3C Verifiable Credentials and Presentations as the wallet sees them:
//! a rigid envelope (context, type, issuer, proof) around an intentionally
//! extensible body. Members the wallet doesn't interpret are captured by a
//! flattened `extra` map so that parse → serialize round-trips don't drop
//! application data — the content store promises verbatim blobs, and the
//! proof engine promises to sign what the caller handed in.
//!
//! Anything that can carry a linked-data proof implements [`Provable`]:
//! it can produce its canonical payload, its claim-statement list (for
//! set-signature suites), and accept a new proof block. Credentials and
//! presentations are the two implementations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::{self, CanonicalBytes};
use crate::config::CREDENTIALS_V1_CONTEXT;
use crate::error::Result;

// ---------------------------------------------------------------------------
// Envelope polymorphism
// ---------------------------------------------------------------------------

/// JSON-LD `@context`: a single URI or an array of URIs/objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    /// Single context URI.
    Single(String),
    /// Array of context URIs or inline context objects.
    Array(Vec<Value>),
}

impl Default for ContextValue {
    fn default() -> Self {
        Self::Array(vec![Value::String(CREDENTIALS_V1_CONTEXT.to_string())])
    }
}

impl ContextValue {
    /// Whether the given context URI is already present.
    pub fn contains(&self, uri: &str) -> bool {
        match self {
            Self::Single(s) => s == uri,
            Self::Array(items) => items.iter().any(|v| v.as_str() == Some(uri)),
        }
    }

    /// Append a context URI unless it is already present. Promotes a single
    /// context to an array when needed.
    pub fn ensure(&mut self, uri: &str) {
        if self.contains(uri) {
            return;
        }
        match self {
            Self::Single(existing) => {
                *self = Self::Array(vec![
                    Value::String(existing.clone()),
                    Value::String(uri.to_string()),
                ]);
            }
            Self::Array(items) => items.push(Value::String(uri.to_string())),
        }
    }
}

/// `type` member: a single type string or an array of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeValue {
    /// Single type string.
    Single(String),
    /// Array of type strings.
    Array(Vec<String>),
}

impl TypeValue {
    /// Whether the given type name is present.
    pub fn contains(&self, name: &str) -> bool {
        match self {
            Self::Single(s) => s == name,
            Self::Array(items) => items.iter().any(|s| s == name),
        }
    }
}

// ---------------------------------------------------------------------------
// Proof block
// ---------------------------------------------------------------------------

/// A linked-data proof attached to a credential or presentation.
///
/// The suite type is kept as a string so documents carrying proof types the
/// wallet doesn't support still parse; rejection happens at verification
/// time, keyed off [`Proof::proof_type`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proof {
    /// Suite identifier, e.g. `Ed25519Signature2018`.
    #[serde(rename = "type")]
    pub proof_type: String,

    /// When the proof was created (UTC).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    /// DID URL of the signing key.
    #[serde(rename = "verificationMethod")]
    pub verification_method: String,

    /// Why the proof exists: `assertionMethod` or `authentication`.
    #[serde(rename = "proofPurpose")]
    pub proof_purpose: String,

    /// Hex-encoded signature (proof-value representation).
    #[serde(rename = "proofValue", default, skip_serializing_if = "Option::is_none")]
    pub proof_value: Option<String>,

    /// Detached compact JWS (JWS representation).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jws: Option<String>,

    /// Domain restriction requested by the verifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Challenge supplied by the verifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,

    /// Nonce for selective-disclosure proofs, base64.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

/// `proof` member: absent, a single object, or an array. Normalized to a
/// list internally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProofValue {
    /// A single proof object.
    Single(Box<Proof>),
    /// An array of proof objects.
    Array(Vec<Proof>),
}

impl Default for ProofValue {
    fn default() -> Self {
        Self::Array(Vec::new())
    }
}

impl ProofValue {
    /// Whether there are no proofs.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(_) => false,
            Self::Array(items) => items.is_empty(),
        }
    }

    /// Normalize to a list of proof references.
    pub fn as_list(&self) -> Vec<&Proof> {
        match self {
            Self::Single(p) => vec![p.as_ref()],
            Self::Array(items) => items.iter().collect(),
        }
    }

    /// Append a proof, promoting a single proof to an array when needed.
    pub fn push(&mut self, proof: Proof) {
        match self {
            Self::Single(existing) => {
                let first = (**existing).clone();
                *self = Self::Array(vec![first, proof]);
            }
            Self::Array(items) => items.push(proof),
        }
    }
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// A W3C Verifiable Credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    /// JSON-LD contexts.
    #[serde(rename = "@context", default)]
    pub context: ContextValue,

    /// Credential identifier (URN or URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Credential types; includes `VerifiableCredential`.
    #[serde(rename = "type")]
    pub credential_type: TypeValue,

    /// Issuer: a DID string or an object with an `id` member.
    pub issuer: Value,

    /// When the credential was issued.
    #[serde(rename = "issuanceDate", default, skip_serializing_if = "Option::is_none")]
    pub issuance_date: Option<DateTime<Utc>>,

    /// When the credential expires, if ever.
    #[serde(
        rename = "expirationDate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expiration_date: Option<DateTime<Utc>>,

    /// The claims — extensible by design.
    #[serde(rename = "credentialSubject")]
    pub credential_subject: Value,

    /// Attached proofs.
    #[serde(default, skip_serializing_if = "ProofValue::is_empty")]
    pub proof: ProofValue,

    /// Envelope members the wallet doesn't interpret (credentialStatus,
    /// evidence, refreshService, ...). Preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Credential {
    /// Parse a credential from raw JSON bytes. No proof checking happens
    /// here — verification is always an explicit, separate step.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serialize back to JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// The issuer DID, whether `issuer` is a string or an object.
    pub fn issuer_id(&self) -> Option<&str> {
        match &self.issuer {
            Value::String(s) => Some(s),
            Value::Object(map) => map.get("id").and_then(Value::as_str),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Presentation
// ---------------------------------------------------------------------------

/// A W3C Verifiable Presentation: a signed container of credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    /// JSON-LD contexts.
    #[serde(rename = "@context", default)]
    pub context: ContextValue,

    /// Presentation identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Presentation types; includes `VerifiablePresentation`.
    #[serde(rename = "type")]
    pub presentation_type: TypeValue,

    /// DID of the holder presenting the credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,

    /// The bundled credentials.
    #[serde(
        rename = "verifiableCredential",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub verifiable_credential: Vec<Credential>,

    /// Attached proofs.
    #[serde(default, skip_serializing_if = "ProofValue::is_empty")]
    pub proof: ProofValue,

    /// Uninterpreted envelope members, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Presentation {
    /// A fresh unsigned presentation over the given credentials.
    pub fn new(credentials: Vec<Credential>) -> Self {
        Self {
            context: ContextValue::default(),
            id: None,
            presentation_type: TypeValue::Array(vec!["VerifiablePresentation".to_string()]),
            holder: None,
            verifiable_credential: credentials,
            proof: ProofValue::default(),
            extra: serde_json::Map::new(),
        }
    }

    /// Parse a presentation from raw JSON bytes (no proof checking).
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serialize back to JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Append credentials to the presentation.
    pub fn add_credentials(&mut self, credentials: impl IntoIterator<Item = Credential>) {
        self.verifiable_credential.extend(credentials);
    }
}

// ---------------------------------------------------------------------------
// Provable
// ---------------------------------------------------------------------------

/// Anything a linked-data proof can be attached to.
pub trait Provable: Serialize {
    /// Attach a proof block.
    fn attach_proof(&mut self, proof: Proof);

    /// The already-attached proofs.
    fn proofs(&self) -> Vec<&Proof>;

    /// Ensure a context URI is present exactly once.
    fn ensure_context(&mut self, uri: &str);

    /// Canonical bytes of the document with its `proof` member excluded.
    fn canonical_payload(&self) -> Result<CanonicalBytes>
    where
        Self: Sized,
    {
        Ok(CanonicalBytes::of_provable(self)?)
    }

    /// Sorted claim statements of the document (proof excluded), for suites
    /// that sign message sets instead of one blob.
    fn claim_statements(&self) -> Result<Vec<String>>
    where
        Self: Sized,
    {
        Ok(canonical::claim_statements(self)?)
    }
}

impl Provable for Credential {
    fn attach_proof(&mut self, proof: Proof) {
        self.proof.push(proof);
    }

    fn proofs(&self) -> Vec<&Proof> {
        self.proof.as_list()
    }

    fn ensure_context(&mut self, uri: &str) {
        self.context.ensure(uri);
    }
}

impl Provable for Presentation {
    fn attach_proof(&mut self, proof: Proof) {
        self.proof.push(proof);
    }

    fn proofs(&self) -> Vec<&Proof> {
        self.proof.as_list()
    }

    fn ensure_context(&mut self, uri: &str) {
        self.context.ensure(uri);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn degree_credential_json() -> Value {
        json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "id": "urn:credential:degree-1",
            "type": ["VerifiableCredential", "UniversityDegreeCredential"],
            "issuer": "did:example:issuer",
            "issuanceDate": "2025-06-01T00:00:00Z",
            "credentialSubject": {
                "id": "did:example:student",
                "degree": {"type": "BachelorDegree", "name": "BSc"}
            }
        })
    }

    #[test]
    fn credential_parse_roundtrip_preserves_unknown_members() {
        let mut doc = degree_credential_json();
        doc["credentialStatus"] = json!({"id": "https://example.edu/status/24"});

        let bytes = serde_json::to_vec(&doc).unwrap();
        let credential = Credential::parse(&bytes).unwrap();
        assert!(credential.extra.contains_key("credentialStatus"));

        let back: Value = serde_json::from_slice(&credential.to_bytes().unwrap()).unwrap();
        assert_eq!(back["credentialStatus"], doc["credentialStatus"]);
        assert_eq!(back["id"], "urn:credential:degree-1");
    }

    #[test]
    fn issuer_id_handles_both_shapes() {
        let mut credential =
            Credential::parse(&serde_json::to_vec(&degree_credential_json()).unwrap()).unwrap();
        assert_eq!(credential.issuer_id(), Some("did:example:issuer"));

        credential.issuer = json!({"id": "did:example:university", "name": "Example U"});
        assert_eq!(credential.issuer_id(), Some("did:example:university"));
    }

    #[test]
    fn ensure_context_is_idempotent() {
        let mut ctx = ContextValue::Single("https://www.w3.org/2018/credentials/v1".into());
        ctx.ensure("https://w3id.org/security/bbs/v1");
        ctx.ensure("https://w3id.org/security/bbs/v1");

        match ctx {
            ContextValue::Array(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[1], json!("https://w3id.org/security/bbs/v1"));
            }
            ContextValue::Single(_) => panic!("context should have been promoted to array"),
        }
    }

    #[test]
    fn proof_value_push_promotes_single_to_array() {
        let first = Proof {
            proof_type: "Ed25519Signature2018".into(),
            created: None,
            verification_method: "did:example:a#key-1".into(),
            proof_purpose: "assertionMethod".into(),
            proof_value: Some("00".into()),
            jws: None,
            domain: None,
            challenge: None,
            nonce: None,
        };
        let mut proofs = ProofValue::Single(Box::new(first));
        let mut second_proof = proofs.as_list()[0].clone();
        second_proof.proof_purpose = "authentication".into();
        proofs.push(second_proof);

        assert_eq!(proofs.as_list().len(), 2);
    }

    #[test]
    fn presentation_new_has_w3c_envelope() {
        let presentation = Presentation::new(vec![]);
        let value = serde_json::to_value(&presentation).unwrap();
        assert_eq!(value["type"], json!(["VerifiablePresentation"]));
        assert_eq!(
            value["@context"],
            json!(["https://www.w3.org/2018/credentials/v1"])
        );
        // Empty members stay off the wire.
        assert!(value.get("verifiableCredential").is_none());
        assert!(value.get("proof").is_none());
    }

    #[test]
    fn canonical_payload_ignores_attached_proofs() {
        let bytes = serde_json::to_vec(&degree_credential_json()).unwrap();
        let mut credential = Credential::parse(&bytes).unwrap();
        let before = credential.canonical_payload().unwrap();

        credential.attach_proof(Proof {
            proof_type: "Ed25519Signature2018".into(),
            created: Some(Utc::now()),
            verification_method: "did:example:issuer#key-1".into(),
            proof_purpose: "assertionMethod".into(),
            proof_value: Some("ff".into()),
            jws: None,
            domain: None,
            challenge: None,
            nonce: None,
        });
        let after = credential.canonical_payload().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn type_value_contains() {
        let t = TypeValue::Array(vec![
            "VerifiableCredential".into(),
            "UniversityDegreeCredential".into(),
        ]);
        assert!(t.contains("UniversityDegreeCredential"));
        assert!(!t.contains("AgeCredential"));
    }
}
