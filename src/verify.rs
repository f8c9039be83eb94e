//! # Proof Verification
//!
//! Resolver-backed checking of credentials and presentations. Verification
//! is read-only: no session, no signer, nothing but public keys fetched
//! through the content-backed VDR. Presentations verify their own proof
//! first, then every embedded credential, short-circuiting on the first
//! failure.
//!
//! Each proof type verifies against the material its suite signed:
//! canonical document bytes for the Ed25519 suites, the claim-statement
//! set for BBS+, and the revealed-statement set plus disclosure envelope
//! for derived BBS+ proofs.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;

use crate::config::{
    BBS_BLS_SIGNATURE_2020, BBS_BLS_SIGNATURE_PROOF_2020, ED25519_SIGNATURE_2018,
    JSON_WEB_SIGNATURE_2020,
};
use crate::credential::{Credential, Presentation, Proof, Provable};
use crate::error::{Result, WalletError};
use crate::suites::{bbs, ed25519};
use crate::vdr::KeyFetcher;

/// Credential and presentation verifier over a key fetcher.
pub struct ProofVerifier {
    fetcher: KeyFetcher,
}

impl ProofVerifier {
    /// Build a verifier.
    pub fn new(fetcher: KeyFetcher) -> Self {
        Self { fetcher }
    }

    /// Verify raw credential bytes.
    pub fn verify_credential_bytes(&self, bytes: &[u8]) -> Result<()> {
        let credential = Credential::parse(bytes)
            .map_err(|e| WalletError::ProofFailed(format!("credential does not parse: {e}")))?;
        self.verify_credential(&credential)
    }

    /// Verify a parsed credential: expiry first, then every attached proof.
    pub fn verify_credential(&self, credential: &Credential) -> Result<()> {
        if let Some(expiration) = credential.expiration_date {
            if expiration < Utc::now() {
                return Err(WalletError::ProofFailed(format!(
                    "credential expired at {expiration}"
                )));
            }
        }

        let proofs = credential.proofs();
        if proofs.is_empty() {
            return Err(WalletError::ProofFailed(
                "credential carries no proof".to_string(),
            ));
        }
        for proof in proofs {
            self.verify_proof(credential, proof)?;
        }
        Ok(())
    }

    /// Verify raw presentation bytes: the presentation's own proof, then
    /// each embedded credential.
    pub fn verify_presentation_bytes(&self, bytes: &[u8]) -> Result<()> {
        let presentation = Presentation::parse(bytes)
            .map_err(|e| WalletError::ProofFailed(format!("presentation does not parse: {e}")))?;

        let proofs = presentation.proofs();
        if proofs.is_empty() {
            return Err(WalletError::ProofFailed(
                "presentation carries no proof".to_string(),
            ));
        }
        for proof in proofs {
            self.verify_proof(&presentation, proof)?;
        }

        for credential in &presentation.verifiable_credential {
            self.verify_credential(credential)?;
        }
        Ok(())
    }

    /// Dispatch one proof to its suite's verification.
    fn verify_proof<P: Provable>(&self, document: &P, proof: &Proof) -> Result<()> {
        let key = self.fetcher.fetch_for_method(&proof.verification_method)?;

        match proof.proof_type.as_str() {
            ED25519_SIGNATURE_2018 => {
                let payload = document.canonical_payload()?;
                ed25519::verify_proof(&payload, proof, &key.bytes)
            }
            JSON_WEB_SIGNATURE_2020 => {
                let payload = document.canonical_payload()?;
                ed25519::verify_jws_proof(&payload, proof, &key.bytes)
            }
            BBS_BLS_SIGNATURE_2020 => {
                crate::context::seed_bbs_context();
                let statements = document.claim_statements()?;
                let signature = proof.proof_value.as_deref().ok_or_else(|| {
                    WalletError::ProofFailed("BBS+ proof carries no 'proofValue'".to_string())
                })?;
                bbs::verify_signature(&statements, signature, &key.bytes)
            }
            BBS_BLS_SIGNATURE_PROOF_2020 => {
                crate::context::seed_bbs_context();
                let statements = document.claim_statements()?;
                let envelope = proof.proof_value.as_deref().ok_or_else(|| {
                    WalletError::ProofFailed(
                        "disclosure proof carries no 'proofValue'".to_string(),
                    )
                })?;
                let nonce = match &proof.nonce {
                    Some(encoded) => BASE64.decode(encoded).map_err(|e| {
                        WalletError::ProofFailed(format!("proof nonce is not base64: {e}"))
                    })?,
                    None => Vec::new(),
                };
                bbs::verify_disclosure_proof(&statements, envelope, &key.bytes, &nonce)
            }
            other => Err(WalletError::UnsupportedSignatureType(other.to_string())),
        }
    }
}
