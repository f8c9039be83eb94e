//! # Signature Suites & Proof Engine
//!
//! Turning an unsigned credential or presentation into a signed one takes
//! three steps, and this module owns all of them:
//!
//! 1. **Validate proof options** — resolve the controller DID, pick or
//!    check the verification method for the required relationship, fill in
//!    defaults (`Ed25519Signature2018`, JWS representation).
//! 2. **Select the suite** — a closed enum over the supported proof types.
//!    Anything else is `UnsupportedSignatureType`, full stop.
//! 3. **Sign and attach** — each suite canonicalizes its own way (one blob
//!    for Ed25519/JWS, a claim-statement set for BBS+), calls the session
//!    signer, and appends the proof block.
//!
//! The BBS+ suite has two extra obligations before signing: append the BBS
//! security context to the document (exactly once) and make sure the
//! bundled context document is seeded in the process cache.

use chrono::{DateTime, Utc};

use crate::config::{
    BBS_BLS_SIGNATURE_2020, BBS_V1_CONTEXT, ED25519_SIGNATURE_2018, JSON_WEB_SIGNATURE_2020,
};
use crate::credential::{Proof, Provable};
use crate::did::{DidResolver, VerificationRelationship};
use crate::error::{Result, WalletError};
use crate::session::SessionSigner;
use crate::vdr::ContentVdr;

pub mod bbs;
pub mod ed25519;
pub mod jws;

/// How the signature is carried in the proof block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProofRepresentation {
    /// Detached compact JWS in the `jws` member (the default).
    #[default]
    Jws,
    /// Hex signature in the `proofValue` member.
    ProofValue,
}

/// Caller-supplied options for issue and prove operations. Only the
/// controller is mandatory; everything else has a documented default.
#[derive(Debug, Clone, Default)]
pub struct ProofOptions {
    /// DID of the party signing (issuer for issue, holder for prove).
    pub controller: String,

    /// Verification method to sign with. When absent, the first method
    /// registered under the required relationship is used.
    pub verification_method: Option<String>,

    /// Proof type. Defaults to `Ed25519Signature2018`.
    pub proof_type: Option<String>,

    /// Signature representation. Defaults to JWS.
    pub proof_representation: Option<ProofRepresentation>,

    /// Proof creation time. Defaults to now.
    pub created: Option<DateTime<Utc>>,

    /// Domain restriction to record in the proof.
    pub domain: Option<String>,

    /// Challenge to record in the proof.
    pub challenge: Option<String>,
}

impl ProofOptions {
    /// Options with the given controller and all defaults.
    pub fn new(controller: &str) -> Self {
        Self {
            controller: controller.to_string(),
            ..Self::default()
        }
    }

    /// Pin the verification method.
    pub fn with_verification_method(mut self, vm: &str) -> Self {
        self.verification_method = Some(vm.to_string());
        self
    }

    /// Request a specific proof type.
    pub fn with_proof_type(mut self, proof_type: &str) -> Self {
        self.proof_type = Some(proof_type.to_string());
        self
    }

    /// Request a specific signature representation.
    pub fn with_representation(mut self, representation: ProofRepresentation) -> Self {
        self.proof_representation = Some(representation);
        self
    }

    /// Record a domain in the proof.
    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = Some(domain.to_string());
        self
    }

    /// Record a challenge in the proof.
    pub fn with_challenge(mut self, challenge: &str) -> Self {
        self.challenge = Some(challenge.to_string());
        self
    }
}

/// Proof options after validation: every field settled, the verification
/// method confirmed against the controller's DID document.
#[derive(Debug, Clone)]
pub struct ResolvedProofOptions {
    /// The verification method that will sign.
    pub verification_method: String,
    /// The settled proof type.
    pub proof_type: String,
    /// The settled representation.
    pub representation: ProofRepresentation,
    /// Proof creation time.
    pub created: DateTime<Utc>,
    /// Domain, verbatim from the caller.
    pub domain: Option<String>,
    /// Challenge, verbatim from the caller.
    pub challenge: Option<String>,
    /// The proof purpose string for the relationship being proven.
    pub purpose: String,
}

/// Validate proof options against the controller's DID document for the
/// given verification relationship.
///
/// The controller must resolve. A pinned verification method must appear
/// under the relationship; an unpinned one defaults to the relationship's
/// first method.
pub fn validate_proof_options(
    vdr: &ContentVdr,
    options: &ProofOptions,
    relationship: VerificationRelationship,
) -> Result<ResolvedProofOptions> {
    if options.controller.is_empty() {
        return Err(WalletError::ProofFailed(
            "proof options require a 'controller' DID".to_string(),
        ));
    }

    let resolution = vdr.resolve(&options.controller)?;
    let methods = resolution.did_document.methods_for(relationship);

    let verification_method = match &options.verification_method {
        Some(requested) => {
            if !methods.iter().any(|vm| &vm.id == requested) {
                return Err(WalletError::VerificationMethodMismatch(format!(
                    "unable to find '{}' among the {} methods of '{}'",
                    requested,
                    relationship.purpose(),
                    options.controller
                )));
            }
            requested.clone()
        }
        None => methods
            .first()
            .map(|vm| vm.id.clone())
            .ok_or_else(|| {
                WalletError::VerificationMethodMismatch(format!(
                    "'{}' declares no {} methods",
                    options.controller,
                    relationship.purpose()
                ))
            })?,
    };

    Ok(ResolvedProofOptions {
        verification_method,
        proof_type: options
            .proof_type
            .clone()
            .unwrap_or_else(|| ED25519_SIGNATURE_2018.to_string()),
        representation: options.proof_representation.unwrap_or_default(),
        created: options.created.unwrap_or_else(Utc::now),
        domain: options.domain.clone(),
        challenge: options.challenge.clone(),
        purpose: relationship.purpose().to_string(),
    })
}

/// The supported suites as a closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureSuite {
    /// Ed25519 over the canonical document.
    Ed25519Signature2018,
    /// Detached JWS (EdDSA) over the canonical document.
    JsonWebSignature2020,
    /// BBS+ over the document's claim statements.
    BbsBlsSignature2020,
}

impl SignatureSuite {
    /// Map a proof type string to its suite.
    pub fn from_type(proof_type: &str) -> Result<Self> {
        match proof_type {
            ED25519_SIGNATURE_2018 => Ok(Self::Ed25519Signature2018),
            JSON_WEB_SIGNATURE_2020 => Ok(Self::JsonWebSignature2020),
            BBS_BLS_SIGNATURE_2020 => Ok(Self::BbsBlsSignature2020),
            other => Err(WalletError::UnsupportedSignatureType(other.to_string())),
        }
    }
}

/// Construct the linked-data proof for a provable document and attach it.
pub fn add_linked_data_proof<P: Provable>(
    provable: &mut P,
    signer: &SessionSigner,
    resolved: &ResolvedProofOptions,
) -> Result<()> {
    let suite = SignatureSuite::from_type(&resolved.proof_type)?;

    let mut proof = Proof {
        proof_type: resolved.proof_type.clone(),
        created: Some(resolved.created),
        verification_method: resolved.verification_method.clone(),
        proof_purpose: resolved.purpose.clone(),
        proof_value: None,
        jws: None,
        domain: resolved.domain.clone(),
        challenge: resolved.challenge.clone(),
        nonce: None,
    };

    match suite {
        SignatureSuite::Ed25519Signature2018 => {
            let payload = provable.canonical_payload()?;
            match resolved.representation {
                ProofRepresentation::Jws => {
                    let input = jws::signing_input(jws::DETACHED_HEADER_B64, payload.as_bytes());
                    let signature = signer.sign(&input)?;
                    proof.jws = Some(jws::encode_detached(&signature));
                }
                ProofRepresentation::ProofValue => {
                    let signature = signer.sign(payload.as_bytes())?;
                    proof.proof_value = Some(hex::encode(signature));
                }
            }
        }
        SignatureSuite::JsonWebSignature2020 => {
            // This suite is JWS by definition; the representation option
            // doesn't apply.
            let payload = provable.canonical_payload()?;
            let input = jws::signing_input(jws::DETACHED_HEADER_B64, payload.as_bytes());
            let signature = signer.sign(&input)?;
            proof.jws = Some(jws::encode_detached(&signature));
        }
        SignatureSuite::BbsBlsSignature2020 => {
            crate::context::seed_bbs_context();
            provable.ensure_context(BBS_V1_CONTEXT);
            let statements = provable.claim_statements()?;
            let signature = bbs::sign_statements(signer, &statements)?;
            proof.proof_value = Some(hex::encode(signature));
        }
    }

    provable.attach_proof(proof);
    Ok(())
}
