//! # Detached JWS Encoding
//!
//! Linked-data proofs in JWS representation carry a *detached* compact JWS:
//! `<b64url(header)>..<b64url(signature)>` with an empty payload segment.
//! The payload is the canonical document, transported out of band. The
//! protected header is fixed — EdDSA, unencoded payload per RFC 7797:
//!
//! ```json
//! {"alg":"EdDSA","b64":false,"crit":["b64"]}
//! ```
//!
//! The serialization follows RFC 7515 (compact JWS) with the RFC 7797
//! `b64=false` option, which is what linked-data proofs put in their `jws`
//! member. Verification reconstructs the signing input from the JWS's own
//! header segment, so a proof produced by another implementation with
//! equivalent but differently-ordered header members still verifies.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use crate::error::{Result, WalletError};

/// Base64url of the fixed protected header.
/// `{"alg":"EdDSA","b64":false,"crit":["b64"]}`
pub const DETACHED_HEADER_B64: &str = "eyJhbGciOiJFZERTQSIsImI2NCI6ZmFsc2UsImNyaXQiOlsiYjY0Il19";

/// JWS signing input: `ASCII(header) || '.' || payload`.
pub fn signing_input(header_b64: &str, payload: &[u8]) -> Vec<u8> {
    let mut input = Vec::with_capacity(header_b64.len() + 1 + payload.len());
    input.extend_from_slice(header_b64.as_bytes());
    input.push(b'.');
    input.extend_from_slice(payload);
    input
}

/// Assemble the detached compact serialization for a signature.
pub fn encode_detached(signature: &[u8]) -> String {
    format!(
        "{DETACHED_HEADER_B64}..{}",
        URL_SAFE_NO_PAD.encode(signature)
    )
}

/// Split a detached compact JWS into `(header_b64, signature_bytes)`.
pub fn decode_detached(jws: &str) -> Result<(String, Vec<u8>)> {
    let mut parts = jws.split('.');
    let (header, payload, signature) = match (parts.next(), parts.next(), parts.next(), parts.next())
    {
        (Some(h), Some(p), Some(s), None) => (h, p, s),
        _ => {
            return Err(WalletError::ProofFailed(
                "jws is not a three-segment compact serialization".to_string(),
            ))
        }
    };

    if !payload.is_empty() {
        return Err(WalletError::ProofFailed(
            "jws payload segment must be detached (empty)".to_string(),
        ));
    }

    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|e| WalletError::ProofFailed(format!("jws signature is not base64url: {e}")))?;

    Ok((header.to_string(), signature))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_header_decodes_to_the_expected_json() {
        let decoded = URL_SAFE_NO_PAD.decode(DETACHED_HEADER_B64).unwrap();
        assert_eq!(
            std::str::from_utf8(&decoded).unwrap(),
            r#"{"alg":"EdDSA","b64":false,"crit":["b64"]}"#
        );
    }

    #[test]
    fn encode_decode_roundtrip() {
        let signature = [0xAB; 64];
        let jws = encode_detached(&signature);
        let (header, recovered) = decode_detached(&jws).unwrap();
        assert_eq!(header, DETACHED_HEADER_B64);
        assert_eq!(recovered, signature);
    }

    #[test]
    fn attached_payload_is_rejected() {
        let jws = format!("{DETACHED_HEADER_B64}.cGF5bG9hZA.c2ln");
        assert!(decode_detached(&jws).is_err());
    }

    #[test]
    fn wrong_segment_count_is_rejected() {
        assert!(decode_detached("onlyonesegment").is_err());
        assert!(decode_detached("a..b..c").is_err());
    }

    #[test]
    fn signing_input_joins_header_and_payload() {
        let input = signing_input("aGVhZGVy", b"payload");
        assert_eq!(input, b"aGVhZGVy.payload");
    }
}
