//! # Selective Disclosure
//!
//! Deriving a credential means producing a new credential that carries only
//! the claims a disclosure frame selects, together with a
//! `BbsBlsSignatureProof2020` proving the retained claims were part of the
//! issuer's original BBS+ signature. The issuer never participates; the
//! caller supplies a nonce that binds the proof to one presentation
//! exchange.
//!
//! Frames select inside `credentialSubject`: an empty object keeps the
//! whole subject, a nested member keeps that subtree. Envelope fields
//! (context, id, type, issuer, dates) are always revealed — the verifier
//! needs them to identify and resolve the issuer.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{Map, Value};

use crate::config::{BBS_BLS_SIGNATURE_2020, BBS_BLS_SIGNATURE_PROOF_2020};
use crate::credential::{Credential, Proof, ProofValue, Provable};
use crate::error::{Result, WalletError};
use crate::suites::bbs;
use crate::vdr::KeyFetcher;

/// Options for a derive operation.
#[derive(Debug, Clone)]
pub struct DeriveOptions {
    /// Disclosure frame; selects which subject members survive.
    pub frame: Value,
    /// Caller nonce binding the proof to one exchange.
    pub nonce: String,
}

/// Derive a selectively-disclosed credential.
pub fn derive_credential(
    credential: &Credential,
    options: &DeriveOptions,
    fetcher: &KeyFetcher,
) -> Result<Credential> {
    crate::context::seed_bbs_context();

    let base_proof = credential
        .proofs()
        .into_iter()
        .find(|p| p.proof_type == BBS_BLS_SIGNATURE_2020)
        .cloned()
        .ok_or(WalletError::NotSelectiveDisclosureCapable)?;
    let signature_hex = base_proof.proof_value.as_deref().ok_or_else(|| {
        WalletError::ProofFailed("BBS+ proof carries no 'proofValue'".to_string())
    })?;

    // Confirm the signer binding before deriving anything: the signature
    // must check out against the issuer's published key.
    let key = fetcher.fetch_for_method(&base_proof.verification_method)?;
    let paired = crate::canonical::claim_statements_with_paths(credential)
        .map_err(WalletError::from)?;
    let statements: Vec<String> = paired.iter().map(|(_, s)| s.clone()).collect();
    bbs::verify_signature(&statements, signature_hex, &key.bytes)?;

    // Work out which statements the frame keeps.
    let selectors = subject_selectors(&options.frame)?;
    let mut revealed_indices = Vec::new();
    for (index, (path, _)) in paired.iter().enumerate() {
        if !path_in_subject(path) || selected(path, &selectors) {
            revealed_indices.push(index);
        }
    }
    for selector in &selectors {
        let hit = paired
            .iter()
            .any(|(path, _)| selected(path, std::slice::from_ref(selector)));
        if !hit {
            return Err(WalletError::FrameMismatch(format!(
                "frame selects '{selector}', which the credential does not carry"
            )));
        }
    }

    let envelope = bbs::create_disclosure_proof(
        &statements,
        &revealed_indices,
        signature_hex,
        &key.bytes,
        options.nonce.as_bytes(),
    )?;

    // Assemble the disclosed credential: pruned subject, single derived
    // proof. Everything else stays verbatim so the revealed statements
    // recompute identically on the verifier side.
    let mut derived = credential.clone();
    derived.credential_subject = project_subject(&credential.credential_subject, &options.frame);
    derived.proof = ProofValue::Array(vec![Proof {
        proof_type: BBS_BLS_SIGNATURE_PROOF_2020.to_string(),
        created: base_proof.created,
        verification_method: base_proof.verification_method.clone(),
        proof_purpose: base_proof.proof_purpose.clone(),
        proof_value: Some(hex::encode(envelope)),
        jws: None,
        domain: base_proof.domain.clone(),
        challenge: base_proof.challenge.clone(),
        nonce: Some(BASE64.encode(options.nonce.as_bytes())),
    }]);

    Ok(derived)
}

/// Statement paths live in the subject when they start with
/// `credentialSubject` followed by a member or index separator.
fn path_in_subject(path: &str) -> bool {
    path == "credentialSubject"
        || path.starts_with("credentialSubject.")
        || path.starts_with("credentialSubject[")
}

/// Selector prefixes inside the subject, derived from the frame. An empty
/// (or absent) `credentialSubject` frame selects the whole subject.
fn subject_selectors(frame: &Value) -> Result<Vec<String>> {
    let frame = frame.as_object().ok_or_else(|| {
        WalletError::FrameMismatch("disclosure frame must be a JSON object".to_string())
    })?;

    let subject_frame = match frame.get("credentialSubject") {
        Some(Value::Object(members)) if !members.is_empty() => members,
        // No subject constraint: reveal the full subject.
        _ => return Ok(vec!["credentialSubject".to_string()]),
    };

    let mut selectors = Vec::new();
    collect_selectors("credentialSubject", subject_frame, &mut selectors);
    Ok(selectors)
}

fn collect_selectors(prefix: &str, members: &Map<String, Value>, out: &mut Vec<String>) {
    for (key, value) in members {
        let path = format!("{prefix}.{key}");
        match value {
            Value::Object(children) if !children.is_empty() => {
                collect_selectors(&path, children, out)
            }
            _ => out.push(path),
        }
    }
}

/// Whether a statement path falls under one of the selector prefixes.
fn selected(path: &str, selectors: &[String]) -> bool {
    selectors.iter().any(|selector| {
        path == selector
            || path.starts_with(&format!("{selector}."))
            || path.starts_with(&format!("{selector}["))
    })
}

/// Project the subject down to the frame's selection.
fn project_subject(subject: &Value, frame: &Value) -> Value {
    let subject_frame = match frame.get("credentialSubject") {
        Some(Value::Object(members)) if !members.is_empty() => members,
        _ => return subject.clone(),
    };
    match subject {
        Value::Object(subject_members) => {
            Value::Object(project_members(subject_members, subject_frame))
        }
        other => other.clone(),
    }
}

fn project_members(
    subject: &Map<String, Value>,
    frame: &Map<String, Value>,
) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, frame_value) in frame {
        let Some(subject_value) = subject.get(key) else {
            continue;
        };
        match (subject_value, frame_value) {
            (Value::Object(subject_children), Value::Object(frame_children))
                if !frame_children.is_empty() =>
            {
                out.insert(
                    key.clone(),
                    Value::Object(project_members(subject_children, frame_children)),
                );
            }
            _ => {
                out.insert(key.clone(), subject_value.clone());
            }
        }
    }
    out
}
