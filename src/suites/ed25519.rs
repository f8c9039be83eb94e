//! # Ed25519 Suite Verification
//!
//! Signature checking for `Ed25519Signature2018` and the EdDSA flavor of
//! `JsonWebSignature2020`. Signing lives in the proof engine (it needs the
//! session signer); verification only needs public bytes, so it lives here
//! and is shared by the wallet verifier.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::canonical::CanonicalBytes;
use crate::credential::Proof;
use crate::error::{Result, WalletError};

use super::jws;

/// Verify an `Ed25519Signature2018` proof over a canonical payload. The
/// proof may carry either representation (JWS or hex proof value).
pub fn verify_proof(payload: &CanonicalBytes, proof: &Proof, public_key: &[u8]) -> Result<()> {
    if let Some(encoded) = &proof.jws {
        let (header, signature) = jws::decode_detached(encoded)?;
        let input = jws::signing_input(&header, payload.as_bytes());
        return verify_raw(public_key, &input, &signature);
    }

    if let Some(hex_value) = &proof.proof_value {
        let signature = hex::decode(hex_value)
            .map_err(|e| WalletError::ProofFailed(format!("proofValue is not hex: {e}")))?;
        return verify_raw(public_key, payload.as_bytes(), &signature);
    }

    Err(WalletError::ProofFailed(
        "proof carries neither 'jws' nor 'proofValue'".to_string(),
    ))
}

/// Verify a `JsonWebSignature2020` proof. JWS representation only.
pub fn verify_jws_proof(payload: &CanonicalBytes, proof: &Proof, public_key: &[u8]) -> Result<()> {
    let encoded = proof.jws.as_ref().ok_or_else(|| {
        WalletError::ProofFailed("JsonWebSignature2020 proof carries no 'jws'".to_string())
    })?;
    let (header, signature) = jws::decode_detached(encoded)?;
    // This suite signs the JWS input itself, header included.
    let input = jws::signing_input(&header, payload.as_bytes());
    verify_raw(public_key, &input, &signature)
}

fn verify_raw(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<()> {
    let key_bytes: [u8; 32] = public_key
        .try_into()
        .map_err(|_| WalletError::ProofFailed("Ed25519 public key must be 32 bytes".to_string()))?;
    let verifying_key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|_| WalletError::ProofFailed("invalid Ed25519 public key".to_string()))?;

    let signature_bytes: [u8; 64] = signature
        .try_into()
        .map_err(|_| WalletError::ProofFailed("Ed25519 signature must be 64 bytes".to_string()))?;
    let signature = Signature::from_bytes(&signature_bytes);

    verifying_key
        .verify(message, &signature)
        .map_err(|_| WalletError::ProofFailed("Ed25519 signature verification failed".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use serde_json::json;

    fn signed_fixture(
        representation_jws: bool,
    ) -> (CanonicalBytes, Proof, Vec<u8>) {
        let payload =
            CanonicalBytes::from_value(&json!({"id": "urn:1", "claim": "value"})).unwrap();
        let signing_key = SigningKey::from_bytes(&[11u8; 32]);
        let public_key = signing_key.verifying_key().to_bytes().to_vec();

        let (jws_value, proof_value) = if representation_jws {
            let input = jws::signing_input(jws::DETACHED_HEADER_B64, payload.as_bytes());
            let signature = signing_key.sign(&input);
            (Some(jws::encode_detached(&signature.to_bytes())), None)
        } else {
            let signature = signing_key.sign(payload.as_bytes());
            (None, Some(hex::encode(signature.to_bytes())))
        };

        let proof = Proof {
            proof_type: "Ed25519Signature2018".into(),
            created: None,
            verification_method: "did:example:a#key-1".into(),
            proof_purpose: "assertionMethod".into(),
            proof_value,
            jws: jws_value,
            domain: None,
            challenge: None,
            nonce: None,
        };
        (payload, proof, public_key)
    }

    #[test]
    fn proof_value_representation_verifies() {
        let (payload, proof, public_key) = signed_fixture(false);
        assert!(verify_proof(&payload, &proof, &public_key).is_ok());
    }

    #[test]
    fn jws_representation_verifies() {
        let (payload, proof, public_key) = signed_fixture(true);
        assert!(verify_proof(&payload, &proof, &public_key).is_ok());
        assert!(verify_jws_proof(&payload, &proof, &public_key).is_ok());
    }

    #[test]
    fn tampered_payload_fails() {
        let (_, proof, public_key) = signed_fixture(true);
        let other =
            CanonicalBytes::from_value(&json!({"id": "urn:1", "claim": "tampered"})).unwrap();
        assert!(matches!(
            verify_proof(&other, &proof, &public_key),
            Err(WalletError::ProofFailed(_))
        ));
    }

    #[test]
    fn wrong_key_fails() {
        let (payload, proof, _) = signed_fixture(false);
        let other_key = SigningKey::from_bytes(&[12u8; 32])
            .verifying_key()
            .to_bytes()
            .to_vec();
        assert!(verify_proof(&payload, &proof, &other_key).is_err());
    }

    #[test]
    fn proof_without_signature_material_fails() {
        let (payload, mut proof, public_key) = signed_fixture(false);
        proof.proof_value = None;
        assert!(verify_proof(&payload, &proof, &public_key).is_err());
    }
}
