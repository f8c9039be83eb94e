//! # BBS+ Suite
//!
//! `BbsBlsSignature2020` signs the document's sorted claim statements as a
//! BBS+ message set under a BLS12-381 G2 key. Because each statement is its
//! own message, a holder can later prove knowledge of the full signature
//! while revealing only a subset — that derived proof is
//! `BbsBlsSignatureProof2020`, produced by the wallet's derive path.
//!
//! ## Disclosure proof envelope
//!
//! A verifier of a derived credential can recompute the *revealed*
//! statements from the credential body, but not the positions they held in
//! the original statement list or how long that list was. Both are needed
//! to check the proof, so `proofValue` carries a small envelope in front of
//! the proof bytes, all integers big-endian:
//!
//! ```text
//! u16 total_count | u16 revealed_count | u16 * revealed_count indices | proof
//! ```
//!
//! The caller's nonce rides separately in the proof block's `nonce` member
//! (base64), mirroring how BBS+ linked-data proofs carry it on the wire.

use bbs::prelude::{
    HiddenMessage, ProofChallenge, ProofMessage, ProofNonce, Prover, Signature, SignatureMessage,
    SignatureProof, Verifier as BbsVerifier,
};
use bbs::{HashElem, ToVariableLengthBytes};

use crate::error::{Result, WalletError};
use crate::kms::expand_bls_public_key;
use crate::session::SessionSigner;

/// Sign a statement set through the session signer (BLS key).
pub fn sign_statements(signer: &SessionSigner, statements: &[String]) -> Result<Vec<u8>> {
    let messages: Vec<Vec<u8>> = statements.iter().map(|s| s.clone().into_bytes()).collect();
    signer.sign_multi(&messages)
}

/// Verify a `BbsBlsSignature2020` signature over a statement set.
pub fn verify_signature(
    statements: &[String],
    signature_hex: &str,
    public_key: &[u8],
) -> Result<()> {
    let signature_bytes = hex::decode(signature_hex)
        .map_err(|e| WalletError::ProofFailed(format!("proofValue is not hex: {e}")))?;
    let signature = Signature::try_from(signature_bytes.as_slice())
        .map_err(|e| WalletError::ProofFailed(format!("malformed BBS+ signature: {e}")))?;

    let messages = hash_statements(statements);
    let public_key = expand_bls_public_key(public_key, messages.len())
        .map_err(|e| WalletError::ProofFailed(e.to_string()))?;

    match signature.verify(&messages, &public_key) {
        Ok(true) => Ok(()),
        Ok(false) => Err(WalletError::ProofFailed(
            "BBS+ signature verification failed".to_string(),
        )),
        Err(e) => Err(WalletError::ProofFailed(format!(
            "BBS+ signature verification failed: {e}"
        ))),
    }
}

/// Create a selective-disclosure proof revealing `revealed_indices` out of
/// the original statement list. Returns the envelope bytes for
/// `proofValue`.
pub fn create_disclosure_proof(
    statements: &[String],
    revealed_indices: &[usize],
    signature_hex: &str,
    public_key: &[u8],
    nonce: &[u8],
) -> Result<Vec<u8>> {
    let signature_bytes = hex::decode(signature_hex)
        .map_err(|e| WalletError::ProofFailed(format!("proofValue is not hex: {e}")))?;
    let signature = Signature::try_from(signature_bytes.as_slice())
        .map_err(|e| WalletError::ProofFailed(format!("malformed BBS+ signature: {e}")))?;

    let messages = hash_statements(statements);
    let public_key = expand_bls_public_key(public_key, messages.len())
        .map_err(|e| WalletError::ProofFailed(e.to_string()))?;

    let proof_request = BbsVerifier::new_proof_request(revealed_indices, &public_key)
        .map_err(|e| WalletError::ProofFailed(format!("proof request: {e}")))?;

    let proof_messages: Vec<ProofMessage> = messages
        .iter()
        .enumerate()
        .map(|(idx, message)| {
            if revealed_indices.contains(&idx) {
                ProofMessage::Revealed(message.clone())
            } else {
                ProofMessage::Hidden(HiddenMessage::ProofSpecificBlinding(message.clone()))
            }
        })
        .collect();

    let pok = Prover::commit_signature_pok(&proof_request, &proof_messages, &signature)
        .map_err(|e| WalletError::ProofFailed(format!("commitment: {e}")))?;

    let proof_nonce = ProofNonce::hash(nonce);
    let mut challenge_bytes = pok.to_bytes();
    challenge_bytes.extend_from_slice(&proof_nonce.to_bytes_uncompressed_form());
    let challenge = ProofChallenge::hash(&challenge_bytes);

    let proof = Prover::generate_signature_pok(pok, &challenge)
        .map_err(|e| WalletError::ProofFailed(format!("proof generation: {e}")))?;

    Ok(encode_envelope(
        statements.len(),
        revealed_indices,
        &proof.to_bytes_compressed_form(),
    ))
}

/// Verify a `BbsBlsSignatureProof2020` envelope against the statements
/// recomputed from a derived credential.
pub fn verify_disclosure_proof(
    revealed_statements: &[String],
    envelope_hex: &str,
    public_key: &[u8],
    nonce: &[u8],
) -> Result<()> {
    let envelope = hex::decode(envelope_hex)
        .map_err(|e| WalletError::ProofFailed(format!("proofValue is not hex: {e}")))?;
    let (total_count, revealed_indices, proof_bytes) = decode_envelope(&envelope)?;

    if revealed_indices.len() != revealed_statements.len() {
        return Err(WalletError::ProofFailed(format!(
            "derived credential carries {} statements but the proof reveals {}",
            revealed_statements.len(),
            revealed_indices.len()
        )));
    }

    let public_key = expand_bls_public_key(public_key, total_count)
        .map_err(|e| WalletError::ProofFailed(e.to_string()))?;
    let proof_request = BbsVerifier::new_proof_request(&revealed_indices, &public_key)
        .map_err(|e| WalletError::ProofFailed(format!("proof request: {e}")))?;

    let proof = SignatureProof::try_from(proof_bytes)
        .map_err(|e| WalletError::ProofFailed(format!("malformed disclosure proof: {e}")))?;

    let proof_nonce = ProofNonce::hash(nonce);
    let revealed_messages = BbsVerifier::verify_signature_pok(&proof_request, &proof, &proof_nonce)
        .map_err(|_| {
            WalletError::ProofFailed("BBS+ disclosure proof verification failed".to_string())
        })?;

    // The proof is sound; now pin it to this exact credential body. The
    // messages returned for the revealed indices must hash-match the
    // statements the derived credential actually carries.
    let expected = hash_statements(revealed_statements);
    if revealed_messages.len() != expected.len() {
        return Err(WalletError::ProofFailed(
            "revealed message count does not match derived credential".to_string(),
        ));
    }
    for (revealed, expected) in revealed_messages.iter().zip(expected.iter()) {
        if revealed.to_bytes_compressed_form() != expected.to_bytes_compressed_form() {
            return Err(WalletError::ProofFailed(
                "revealed statement does not match derived credential".to_string(),
            ));
        }
    }

    Ok(())
}

fn hash_statements(statements: &[String]) -> Vec<SignatureMessage> {
    statements
        .iter()
        .map(|s| SignatureMessage::hash(s.as_bytes()))
        .collect()
}

fn encode_envelope(total: usize, revealed: &[usize], proof: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + revealed.len() * 2 + proof.len());
    out.extend_from_slice(&(total as u16).to_be_bytes());
    out.extend_from_slice(&(revealed.len() as u16).to_be_bytes());
    for index in revealed {
        out.extend_from_slice(&(*index as u16).to_be_bytes());
    }
    out.extend_from_slice(proof);
    out
}

fn decode_envelope(envelope: &[u8]) -> Result<(usize, Vec<usize>, &[u8])> {
    if envelope.len() < 4 {
        return Err(WalletError::ProofFailed(
            "disclosure proof envelope truncated".to_string(),
        ));
    }
    let total = u16::from_be_bytes([envelope[0], envelope[1]]) as usize;
    let revealed_count = u16::from_be_bytes([envelope[2], envelope[3]]) as usize;

    let indices_end = 4 + revealed_count * 2;
    if envelope.len() < indices_end {
        return Err(WalletError::ProofFailed(
            "disclosure proof envelope truncated".to_string(),
        ));
    }

    let mut indices = Vec::with_capacity(revealed_count);
    for chunk in envelope[4..indices_end].chunks_exact(2) {
        let index = u16::from_be_bytes([chunk[0], chunk[1]]) as usize;
        if index >= total {
            return Err(WalletError::ProofFailed(format!(
                "revealed index {index} out of range for {total} statements"
            )));
        }
        indices.push(index);
    }

    Ok((total, indices, &envelope[indices_end..]))
}
