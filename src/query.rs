//! # Credential Query Engine
//!
//! Answers presentation requests against the wallet's stored credentials in
//! three dialects:
//!
//! - **Query by frame** — a JSON-LD frame; credentials whose structure
//!   satisfies the frame (type constraints plus structural containment)
//!   match. Empty objects in the frame act as wildcards, as they do in
//!   JSON-LD framing.
//! - **Presentation exchange** — a DIF `presentation_definition`; field
//!   constraints are dotted JSON paths with optional `const` / `enum` /
//!   `pattern` / `type` filters, and the result carries a
//!   `presentation_submission` descriptor map.
//! - **Query by example** — a VP-request example; partial structural match.
//!
//! Each query produces exactly one presentation, in input order, and an
//! empty match set produces an empty presentation rather than an error.
//! Dialects never merge results. Nothing here verifies proofs — queries
//! answer "what do you hold", not "is it valid"; callers verify explicitly.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::credential::{Credential, Presentation, TypeValue};
use crate::error::{Result, WalletError};

/// JSON-LD context for DIF presentation submissions.
const PRESENTATION_SUBMISSION_CONTEXT: &str =
    "https://identity.foundation/presentation-exchange/submission/v1";

/// The supported query dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryDialect {
    /// JSON-LD frame reduction.
    #[serde(rename = "QueryByFrame")]
    JsonLdFrame,
    /// DIF presentation exchange.
    PresentationExchange,
    /// DIF VP-request query by example.
    QueryByExample,
}

/// One query: a dialect plus its payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryParams {
    /// Which dialect interprets the payload.
    #[serde(rename = "type")]
    pub dialect: QueryDialect,
    /// The dialect-specific query document.
    pub payload: Value,
}

impl QueryParams {
    /// Build query params.
    pub fn new(dialect: QueryDialect, payload: Value) -> Self {
        Self { dialect, payload }
    }
}

/// Run each query against the credential set, returning one presentation
/// per query in input order.
pub fn perform_query(
    credentials: &[Credential],
    params: &[QueryParams],
) -> Result<Vec<Presentation>> {
    params
        .iter()
        .map(|query| match query.dialect {
            QueryDialect::JsonLdFrame => query_by_frame(credentials, &query.payload),
            QueryDialect::PresentationExchange => {
                presentation_exchange(credentials, &query.payload)
            }
            QueryDialect::QueryByExample => query_by_example(credentials, &query.payload),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Query by frame
// ---------------------------------------------------------------------------

fn query_by_frame(credentials: &[Credential], payload: &Value) -> Result<Presentation> {
    let frame = payload
        .get("frame")
        .unwrap_or(payload)
        .as_object()
        .ok_or_else(|| WalletError::Query("frame payload must be a JSON object".to_string()))?;

    let mut matched = Vec::new();
    for credential in credentials {
        let value = serde_json::to_value(credential)?;
        if structural_match(&value, frame) {
            matched.push(credential.clone());
        }
    }
    Ok(Presentation::new(matched))
}

// ---------------------------------------------------------------------------
// Query by example
// ---------------------------------------------------------------------------

fn query_by_example(credentials: &[Credential], payload: &Value) -> Result<Presentation> {
    let example = payload
        .get("example")
        .unwrap_or(payload)
        .as_object()
        .ok_or_else(|| WalletError::Query("example payload must be a JSON object".to_string()))?;

    let mut matched = Vec::new();
    for credential in credentials {
        let value = serde_json::to_value(credential)?;
        if structural_match(&value, example) {
            matched.push(credential.clone());
        }
    }
    Ok(Presentation::new(matched))
}

/// Frame/example matching: type constraints are subset checks against the
/// credential's type list; every other member must be structurally
/// contained in the credential. `@context` in the pattern is ignored.
fn structural_match(credential: &Value, pattern: &serde_json::Map<String, Value>) -> bool {
    for (key, expected) in pattern {
        match key.as_str() {
            "@context" => continue,
            "type" => {
                let credential_types = match credential.get("type") {
                    Some(t) => t,
                    None => return false,
                };
                if !types_satisfied(credential_types, expected) {
                    return false;
                }
            }
            _ => {
                let actual = match credential.get(key) {
                    Some(v) => v,
                    None => return false,
                };
                if !json_contains(actual, expected) {
                    return false;
                }
            }
        }
    }
    true
}

/// Every type named by the pattern must appear among the credential's types.
fn types_satisfied(credential_types: &Value, pattern: &Value) -> bool {
    let wanted: Vec<&str> = match pattern {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => return false,
    };
    let held: TypeValue = match serde_json::from_value(credential_types.clone()) {
        Ok(t) => t,
        Err(_) => return false,
    };
    wanted.iter().all(|t| held.contains(t))
}

/// Structural containment with JSON-LD-frame wildcard semantics: an empty
/// object or array in the pattern matches any present value; objects
/// require each member to be contained; arrays require each pattern element
/// to be matched by some document element; scalars require equality.
fn json_contains(doc: &Value, pattern: &Value) -> bool {
    match pattern {
        Value::Object(members) => {
            if members.is_empty() {
                return true;
            }
            match doc {
                Value::Object(doc_members) => members.iter().all(|(k, v)| {
                    doc_members
                        .get(k)
                        .map(|doc_value| json_contains(doc_value, v))
                        .unwrap_or(false)
                }),
                _ => false,
            }
        }
        Value::Array(items) => {
            if items.is_empty() {
                return true;
            }
            match doc {
                Value::Array(doc_items) => items
                    .iter()
                    .all(|p| doc_items.iter().any(|d| json_contains(d, p))),
                other => items.iter().all(|p| json_contains(other, p)),
            }
        }
        scalar => doc == scalar,
    }
}

// ---------------------------------------------------------------------------
// Presentation exchange
// ---------------------------------------------------------------------------

fn presentation_exchange(credentials: &[Credential], payload: &Value) -> Result<Presentation> {
    let definition = payload.get("presentation_definition").unwrap_or(payload);
    let definition_id = definition
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let descriptors = definition
        .get("input_descriptors")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            WalletError::Query("presentation definition has no 'input_descriptors'".to_string())
        })?;

    // Stable credential order; each credential appears once even when it
    // satisfies several descriptors.
    let mut selected: Vec<Credential> = Vec::new();
    let mut selected_positions: Vec<Option<usize>> = vec![None; credentials.len()];
    let mut descriptor_map = Vec::new();

    for descriptor in descriptors {
        let descriptor_id = descriptor
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                WalletError::Query("input descriptor has no 'id'".to_string())
            })?;

        for (position, credential) in credentials.iter().enumerate() {
            let value = serde_json::to_value(credential)?;
            if !descriptor_satisfied(&value, descriptor)? {
                continue;
            }

            let index = match selected_positions[position] {
                Some(index) => index,
                None => {
                    selected.push(credential.clone());
                    let index = selected.len() - 1;
                    selected_positions[position] = Some(index);
                    index
                }
            };
            descriptor_map.push(json!({
                "id": descriptor_id,
                "format": "ldp_vc",
                "path": format!("$.verifiableCredential[{index}]"),
            }));
        }
    }

    let mut presentation = Presentation::new(selected);
    presentation.context.ensure(PRESENTATION_SUBMISSION_CONTEXT);
    if let TypeValue::Array(types) = &mut presentation.presentation_type {
        types.push("PresentationSubmission".to_string());
    }
    presentation.extra.insert(
        "presentation_submission".to_string(),
        json!({
            "id": Uuid::new_v4().to_string(),
            "definition_id": definition_id,
            "descriptor_map": descriptor_map,
        }),
    );
    Ok(presentation)
}

fn descriptor_satisfied(credential: &Value, descriptor: &Value) -> Result<bool> {
    let fields = match descriptor.pointer("/constraints/fields").and_then(Value::as_array) {
        Some(fields) => fields,
        // A descriptor without constraints matches everything.
        None => return Ok(true),
    };

    for field in fields {
        if field.get("optional").and_then(Value::as_bool) == Some(true) {
            continue;
        }
        let paths = field.get("path").and_then(Value::as_array).ok_or_else(|| {
            WalletError::Query("field constraint has no 'path' array".to_string())
        })?;

        let filter = field.get("filter");
        let satisfied = paths
            .iter()
            .filter_map(Value::as_str)
            .any(|path| match resolve_path(credential, path) {
                Some(value) => filter.map(|f| filter_matches(value, f)).unwrap_or(true),
                None => false,
            });
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Resolve a dotted JSONPath subset: `$.a.b[0].c`. Quantified selectors
/// and filters are out of scope for wallet-side matching.
fn resolve_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let trimmed = path.strip_prefix("$.").or_else(|| path.strip_prefix('$'))?;
    let mut current = doc;
    for segment in trimmed.split('.') {
        if segment.is_empty() {
            continue;
        }
        let (name, indices) = match segment.find('[') {
            Some(bracket) => (&segment[..bracket], &segment[bracket..]),
            None => (segment, ""),
        };
        if !name.is_empty() {
            current = current.get(name)?;
        }
        for index_part in indices.split('[').filter(|s| !s.is_empty()) {
            let index: usize = index_part.strip_suffix(']')?.parse().ok()?;
            current = current.get(index)?;
        }
    }
    Some(current)
}

/// A pragmatic JSON-schema-filter subset: `const`, `enum`, `pattern`
/// (substring containment), and `type`.
fn filter_matches(value: &Value, filter: &Value) -> bool {
    if let Some(expected) = filter.get("const") {
        if value != expected {
            return false;
        }
    }
    if let Some(allowed) = filter.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            return false;
        }
    }
    if let Some(pattern) = filter.get("pattern").and_then(Value::as_str) {
        match value.as_str() {
            Some(s) if s.contains(pattern.trim_start_matches('^').trim_end_matches('$')) => {}
            _ => return false,
        }
    }
    if let Some(type_name) = filter.get("type").and_then(Value::as_str) {
        let ok = match type_name {
            "string" => value.is_string(),
            "number" => value.is_number(),
            "boolean" => value.is_boolean(),
            "array" => value.is_array(),
            "object" => value.is_object(),
            _ => true,
        };
        if !ok {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(id: &str, extra_type: &str, subject: Value) -> Credential {
        Credential::parse(
            &serde_json::to_vec(&json!({
                "@context": ["https://www.w3.org/2018/credentials/v1"],
                "id": id,
                "type": ["VerifiableCredential", extra_type],
                "issuer": "did:example:issuer",
                "credentialSubject": subject
            }))
            .unwrap(),
        )
        .unwrap()
    }

    fn credential_set() -> Vec<Credential> {
        vec![
            credential(
                "urn:cred:degree-1",
                "UniversityDegreeCredential",
                json!({"id": "did:example:alice", "degree": {"type": "BachelorDegree"}}),
            ),
            credential(
                "urn:cred:degree-2",
                "UniversityDegreeCredential",
                json!({"id": "did:example:bob", "degree": {"type": "MasterDegree"}}),
            ),
            credential(
                "urn:cred:age-1",
                "AgeCredential",
                json!({"id": "did:example:alice", "ageOver": 21}),
            ),
        ]
    }

    #[test]
    fn frame_selects_by_type() {
        let credentials = credential_set();
        let params = [QueryParams::new(
            QueryDialect::JsonLdFrame,
            json!({"type": ["UniversityDegreeCredential"]}),
        )];

        let presentations = perform_query(&credentials, &params).unwrap();
        assert_eq!(presentations.len(), 1);
        let ids: Vec<_> = presentations[0]
            .verifiable_credential
            .iter()
            .map(|c| c.id.as_deref().unwrap())
            .collect();
        assert_eq!(ids, vec!["urn:cred:degree-1", "urn:cred:degree-2"]);
    }

    #[test]
    fn frame_wildcards_require_presence() {
        let credentials = credential_set();
        let params = [QueryParams::new(
            QueryDialect::JsonLdFrame,
            json!({"credentialSubject": {"degree": {}}}),
        )];

        let presentations = perform_query(&credentials, &params).unwrap();
        assert_eq!(presentations[0].verifiable_credential.len(), 2);
    }

    #[test]
    fn empty_match_yields_empty_presentation() {
        let credentials = credential_set();
        let params = [QueryParams::new(
            QueryDialect::JsonLdFrame,
            json!({"type": ["PassportCredential"]}),
        )];

        let presentations = perform_query(&credentials, &params).unwrap();
        assert_eq!(presentations.len(), 1);
        assert!(presentations[0].verifiable_credential.is_empty());
    }

    #[test]
    fn queries_do_not_merge_results() {
        let credentials = credential_set();
        let params = [
            QueryParams::new(
                QueryDialect::JsonLdFrame,
                json!({"type": ["AgeCredential"]}),
            ),
            QueryParams::new(
                QueryDialect::QueryByExample,
                json!({"example": {"type": ["UniversityDegreeCredential"]}}),
            ),
        ];

        let presentations = perform_query(&credentials, &params).unwrap();
        assert_eq!(presentations.len(), 2);
        assert_eq!(presentations[0].verifiable_credential.len(), 1);
        assert_eq!(presentations[1].verifiable_credential.len(), 2);
    }

    #[test]
    fn example_matches_structurally() {
        let credentials = credential_set();
        let params = [QueryParams::new(
            QueryDialect::QueryByExample,
            json!({
                "example": {
                    "credentialSubject": {"degree": {"type": "MasterDegree"}}
                }
            }),
        )];

        let presentations = perform_query(&credentials, &params).unwrap();
        let matched = &presentations[0].verifiable_credential;
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id.as_deref(), Some("urn:cred:degree-2"));
    }

    #[test]
    fn presentation_exchange_produces_submission() {
        let credentials = credential_set();
        let params = [QueryParams::new(
            QueryDialect::PresentationExchange,
            json!({
                "id": "degree-check",
                "input_descriptors": [{
                    "id": "degree",
                    "constraints": {
                        "fields": [{
                            "path": ["$.credentialSubject.degree.type"],
                            "filter": {"type": "string", "const": "BachelorDegree"}
                        }]
                    }
                }]
            }),
        )];

        let presentations = perform_query(&credentials, &params).unwrap();
        let presentation = &presentations[0];
        assert_eq!(presentation.verifiable_credential.len(), 1);
        assert_eq!(
            presentation.verifiable_credential[0].id.as_deref(),
            Some("urn:cred:degree-1")
        );
        assert!(presentation.presentation_type.contains("PresentationSubmission"));

        let submission = &presentation.extra["presentation_submission"];
        assert_eq!(submission["definition_id"], "degree-check");
        assert_eq!(
            submission["descriptor_map"][0]["path"],
            "$.verifiableCredential[0]"
        );
        assert_eq!(submission["descriptor_map"][0]["id"], "degree");
    }

    #[test]
    fn presentation_exchange_deduplicates_credentials() {
        let credentials = credential_set();
        let params = [QueryParams::new(
            QueryDialect::PresentationExchange,
            json!({
                "id": "multi",
                "input_descriptors": [
                    {"id": "a", "constraints": {"fields": [{"path": ["$.credentialSubject.id"],
                        "filter": {"const": "did:example:alice"}}]}},
                    {"id": "b", "constraints": {"fields": [{"path": ["$.credentialSubject.ageOver"]}]}}
                ]
            }),
        )];

        let presentations = perform_query(&credentials, &params).unwrap();
        let presentation = &presentations[0];
        // The age credential satisfies both descriptors but appears once.
        assert_eq!(presentation.verifiable_credential.len(), 2);
        let map = presentation.extra["presentation_submission"]["descriptor_map"]
            .as_array()
            .unwrap();
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn malformed_definition_is_a_query_error() {
        let credentials = credential_set();
        let params = [QueryParams::new(
            QueryDialect::PresentationExchange,
            json!({"id": "broken"}),
        )];
        assert!(matches!(
            perform_query(&credentials, &params),
            Err(WalletError::Query(_))
        ));
    }

    #[test]
    fn resolve_path_handles_indices() {
        let doc = json!({"a": {"b": [{"c": 1}, {"c": 2}]}});
        assert_eq!(resolve_path(&doc, "$.a.b[1].c"), Some(&json!(2)));
        assert_eq!(resolve_path(&doc, "$.a.b[5].c"), None);
        assert_eq!(resolve_path(&doc, "$.missing"), None);
    }

    #[test]
    fn filter_subset_semantics() {
        assert!(filter_matches(&json!("x"), &json!({"type": "string"})));
        assert!(!filter_matches(&json!(1), &json!({"type": "string"})));
        assert!(filter_matches(&json!("abc"), &json!({"pattern": "^abc$"})));
        assert!(!filter_matches(&json!("xyz"), &json!({"pattern": "abc"})));
        assert!(filter_matches(&json!(5), &json!({"enum": [1, 5]})));
        assert!(!filter_matches(&json!(7), &json!({"enum": [1, 5]})));
    }
}
