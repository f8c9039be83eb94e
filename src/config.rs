//! # Wallet Constants
//!
//! Every magic string and fixed parameter in satchel lives here: proof type
//! identifiers, JSON-LD context URIs, storage key prefixes, and session
//! defaults. If you find a constant hardcoded anywhere else in the crate,
//! that's a bug report waiting to happen.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Proof Types
// ---------------------------------------------------------------------------

/// Ed25519 linked-data signature suite identifier.
pub const ED25519_SIGNATURE_2018: &str = "Ed25519Signature2018";

/// Detached-JWS linked-data signature suite identifier.
pub const JSON_WEB_SIGNATURE_2020: &str = "JsonWebSignature2020";

/// BBS+ linked-data signature suite identifier.
pub const BBS_BLS_SIGNATURE_2020: &str = "BbsBlsSignature2020";

/// Proof type carried by credentials derived through selective disclosure.
/// Never requested directly — only produced by the derive path.
pub const BBS_BLS_SIGNATURE_PROOF_2020: &str = "BbsBlsSignatureProof2020";

// ---------------------------------------------------------------------------
// Proof Purposes
// ---------------------------------------------------------------------------

/// Proof purpose attached when issuing a credential.
pub const PURPOSE_ASSERTION_METHOD: &str = "assertionMethod";

/// Proof purpose attached when proving (presenting) credentials.
pub const PURPOSE_AUTHENTICATION: &str = "authentication";

// ---------------------------------------------------------------------------
// JSON-LD Contexts
// ---------------------------------------------------------------------------

/// Base context of the W3C Verifiable Credentials data model.
pub const CREDENTIALS_V1_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";

/// BBS+ security vocabulary context. Appended to a credential's `@context`
/// (exactly once) whenever a BBS+ proof is attached, and pre-seeded into the
/// context cache from the bundled document so BBS+ operations never need a
/// network fetch.
pub const BBS_V1_CONTEXT: &str = "https://w3id.org/security/bbs/v1";

// ---------------------------------------------------------------------------
// Verification Method Types
// ---------------------------------------------------------------------------

/// DID document key type for Ed25519 verification keys.
pub const ED25519_VERIFICATION_KEY_2018: &str = "Ed25519VerificationKey2018";

/// DID document key type for BLS12-381 G2 keys (BBS+ suite).
pub const BLS12381_G2_KEY_2020: &str = "Bls12381G2Key2020";

// ---------------------------------------------------------------------------
// Storage Key Layout
// ---------------------------------------------------------------------------

/// Name of the logical store holding profiles and wallet contents.
pub const WALLET_STORE: &str = "wallet";

/// Name of the logical store holding sealed key material.
pub const KMS_STORE: &str = "kms";

/// Key prefix for profile records: `profile:<userID>`.
pub const PROFILE_KEY_PREFIX: &str = "profile:";

/// Key prefix for content records: `content:<userID>:<contentType>:<contentID>`.
pub const CONTENT_KEY_PREFIX: &str = "content:";

/// Key prefix for sealed KMS key records: `key:<userID>:<keyID>`.
pub const KMS_KEY_PREFIX: &str = "key:";

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// How long an unlock token stays valid when the caller doesn't say
/// otherwise. Ten minutes is long enough for an interactive flow and short
/// enough that a leaked token has a bounded blast radius.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(10 * 60);

/// Number of random bytes in a session token. 32 bytes = 256 bits, double
/// the unforgeability floor we hold ourselves to.
pub const SESSION_TOKEN_BYTES: usize = 32;

// ---------------------------------------------------------------------------
// KMS
// ---------------------------------------------------------------------------

/// AES-256 key length used to seal key material at rest.
pub const MASTER_KEY_LENGTH: usize = 32;

/// HKDF salt length generated per passphrase-bound profile.
pub const PASSPHRASE_SALT_LENGTH: usize = 16;

/// Domain-separation info string for passphrase master-key derivation.
pub const MASTER_KEY_INFO: &[u8] = b"satchel/master-key/v1";
