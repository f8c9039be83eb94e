//! # Canonical Byte Production
//!
//! Every signature in satchel is computed over bytes produced by this module
//! and nothing else. [`CanonicalBytes`] is a newtype with a private inner
//! field: the only way to obtain one is through its constructors, which
//! serialize JSON with sorted keys and compact separators (JCS-style) after
//! stripping the `proof` member. Signing over `serde_json::to_vec()` output
//! directly is therefore impossible to do by accident.
//!
//! ## Rules
//!
//! - Object keys are emitted in sorted order (we rely on `serde_json`'s
//!   `BTreeMap`-backed object representation — the `preserve_order` feature
//!   must stay off).
//! - No insignificant whitespace.
//! - Floats are rejected outright. Credential values that need fractional
//!   precision belong in strings; a float that round-trips differently
//!   across JSON implementations would silently break every signature over
//!   the document.
//!
//! ## Claim Statements
//!
//! BBS+ suites sign a *set* of messages rather than one blob. For that we
//! flatten the document into sorted `path=value` leaf statements, one per
//! scalar. The statement list is deterministic for a given document, which
//! is what lets a verifier recompute the revealed subset from a derived
//! credential without ever seeing the hidden statements.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors raised while producing canonical bytes.
#[derive(Debug, Error)]
pub enum CanonicalError {
    /// The document contains a float, which has no canonical JSON encoding.
    #[error("float values cannot be canonicalized: {0}")]
    FloatRejected(f64),

    /// The value could not be serialized to JSON at all.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Bytes produced exclusively by sorted-key, compact, proof-free
/// serialization. The inner field is private on purpose — see module docs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable document, excluding its top-level
    /// `proof` member (the proof cannot sign itself).
    pub fn of_provable(doc: &impl Serialize) -> Result<Self, CanonicalError> {
        let mut value = serde_json::to_value(doc)?;
        if let Some(obj) = value.as_object_mut() {
            obj.remove("proof");
        }
        Self::from_value(&value)
    }

    /// Canonicalize a JSON value verbatim (no proof stripping).
    pub fn from_value(value: &Value) -> Result<Self, CanonicalError> {
        reject_floats(value)?;
        let text = serde_json::to_string(value)?;
        Ok(Self(text.into_bytes()))
    }

    /// The canonical bytes, ready for hashing or signing.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn reject_floats(value: &Value) -> Result<(), CanonicalError> {
    match value {
        Value::Number(n) => {
            if n.is_f64() && !n.is_i64() && !n.is_u64() {
                return Err(CanonicalError::FloatRejected(n.as_f64().unwrap_or(f64::NAN)));
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(reject_floats),
        Value::Object(map) => map.values().try_for_each(reject_floats),
        _ => Ok(()),
    }
}

/// Flatten a document (minus its `proof`) into sorted `path=value` claim
/// statements, one per scalar leaf.
///
/// Paths are dotted with bracketed array indices, e.g.
/// `credentialSubject.degree.type` or `type[1]`. Leaf values are rendered as
/// canonical JSON, so `"Bachelor"` and `42` stay distinguishable from the
/// strings `Bachelor` and `42`.
pub fn claim_statements(doc: &impl Serialize) -> Result<Vec<String>, CanonicalError> {
    Ok(claim_statements_with_paths(doc)?
        .into_iter()
        .map(|(_, statement)| statement)
        .collect())
}

/// Like [`claim_statements`], but keeps each statement paired with its leaf
/// path. The statement order is identical, so indices line up between the
/// two forms.
pub fn claim_statements_with_paths(
    doc: &impl Serialize,
) -> Result<Vec<(String, String)>, CanonicalError> {
    let mut value = serde_json::to_value(doc)?;
    if let Some(obj) = value.as_object_mut() {
        obj.remove("proof");
    }
    reject_floats(&value)?;

    let mut statements = Vec::new();
    flatten("", &value, &mut statements);
    statements.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(statements)
}

fn flatten(path: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            if map.is_empty() {
                out.push((path.to_string(), format!("{path}={{}}")));
            }
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                flatten(&child_path, child, out);
            }
        }
        Value::Array(items) => {
            if items.is_empty() {
                out.push((path.to_string(), format!("{path}=[]")));
            }
            for (idx, child) in items.iter().enumerate() {
                flatten(&format!("{path}[{idx}]"), child, out);
            }
        }
        leaf => {
            // Leaves serialize infallibly; floats were rejected above.
            let rendered = serde_json::to_string(leaf).unwrap_or_default();
            out.push((path.to_string(), format!("{path}={rendered}")));
        }
    }
}
