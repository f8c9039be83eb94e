//! # Bundled JSON-LD Contexts
//!
//! BBS+ operations reference the `https://w3id.org/security/bbs/v1`
//! vocabulary. Fetching that document over the network at signing time
//! would make issuance depend on remote availability, so the document ships
//! embedded in the crate and is loaded into the process-wide context cache
//! before any BBS+ operation runs. The cache is append-only and keyed by
//! context URI.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::Value;

use crate::config::BBS_V1_CONTEXT;

static CONTEXT_CACHE: Lazy<RwLock<HashMap<String, Value>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Ensure the bundled BBS v1 context document is present in the cache.
/// Idempotent; called by the BBS suite ahead of every sign/derive/verify.
pub fn seed_bbs_context() {
    if CONTEXT_CACHE.read().contains_key(BBS_V1_CONTEXT) {
        return;
    }
    let document: Value =
        serde_json::from_str(BBS_V1_CONTEXT_DOCUMENT).expect("bundled context is valid JSON");
    CONTEXT_CACHE
        .write()
        .insert(BBS_V1_CONTEXT.to_string(), document);
}

/// Look up a cached context document.
pub fn cached_context(uri: &str) -> Option<Value> {
    CONTEXT_CACHE.read().get(uri).cloned()
}

/// Add (or replace) a context document in the cache. Embedders can pre-seed
/// additional vocabularies for offline operation.
pub fn cache_context(uri: &str, document: Value) {
    CONTEXT_CACHE.write().insert(uri.to_string(), document);
}

/// The BBS+ signature vocabulary, bundled for offline loading.
const BBS_V1_CONTEXT_DOCUMENT: &str = r#"{
  "@context": {
    "@version": 1.1,
    "id": "@id",
    "type": "@type",
    "BbsBlsSignature2020": {
      "@id": "https://w3id.org/security#BbsBlsSignature2020",
      "@context": {
        "@version": 1.1,
        "@protected": true,
        "id": "@id",
        "type": "@type",
        "challenge": "https://w3id.org/security#challenge",
        "created": {
          "@id": "http://purl.org/dc/terms/created",
          "@type": "http://www.w3.org/2001/XMLSchema#dateTime"
        },
        "domain": "https://w3id.org/security#domain",
        "proofValue": "https://w3id.org/security#proofValue",
        "nonce": "https://w3id.org/security#nonce",
        "proofPurpose": {
          "@id": "https://w3id.org/security#proofPurpose",
          "@type": "@vocab",
          "@context": {
            "@version": 1.1,
            "@protected": true,
            "id": "@id",
            "type": "@type",
            "assertionMethod": {
              "@id": "https://w3id.org/security#assertionMethod",
              "@type": "@id",
              "@container": "@set"
            },
            "authentication": {
              "@id": "https://w3id.org/security#authenticationMethod",
              "@type": "@id",
              "@container": "@set"
            }
          }
        },
        "verificationMethod": {
          "@id": "https://w3id.org/security#verificationMethod",
          "@type": "@id"
        }
      }
    },
    "BbsBlsSignatureProof2020": {
      "@id": "https://w3id.org/security#BbsBlsSignatureProof2020",
      "@context": {
        "@version": 1.1,
        "@protected": true,
        "id": "@id",
        "type": "@type",
        "challenge": "https://w3id.org/security#challenge",
        "created": {
          "@id": "http://purl.org/dc/terms/created",
          "@type": "http://www.w3.org/2001/XMLSchema#dateTime"
        },
        "domain": "https://w3id.org/security#domain",
        "nonce": "https://w3id.org/security#nonce",
        "proofPurpose": {
          "@id": "https://w3id.org/security#proofPurpose",
          "@type": "@vocab",
          "@context": {
            "@version": 1.1,
            "@protected": true,
            "id": "@id",
            "type": "@type",
            "sec": "https://w3id.org/security#",
            "assertionMethod": {
              "@id": "https://w3id.org/security#assertionMethod",
              "@type": "@id",
              "@container": "@set"
            },
            "authentication": {
              "@id": "https://w3id.org/security#authenticationMethod",
              "@type": "@id",
              "@container": "@set"
            }
          }
        },
        "proofValue": "https://w3id.org/security#proofValue",
        "verificationMethod": {
          "@id": "https://w3id.org/security#verificationMethod",
          "@type": "@id"
        }
      }
    },
    "Bls12381G2Key2020": "https://w3id.org/security#Bls12381G2Key2020"
  }
}"#;
