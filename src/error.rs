//! # Error Taxonomy
//!
//! One tagged error type for the whole wallet surface. Collaborator failures
//! (storage, KMS, canonicalization) nest inside it via `#[from]`, so callers
//! always match on a single enum regardless of which layer tripped.
//!
//! Nothing is swallowed and nothing is retried at this layer: storage, DID
//! resolution, and KMS failures propagate straight up with their kind intact.
//! The only softening happens in verification, which reports a proof failure
//! as `(verified = false, detail)` instead of an `Err` — see
//! [`crate::wallet::Wallet::verify`].

use thiserror::Error;

use crate::canonical::CanonicalError;
use crate::kms::KmsError;
use crate::storage::StorageError;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, WalletError>;

/// Every failure the wallet can surface.
#[derive(Debug, Error)]
pub enum WalletError {
    /// The requested record (profile, content entry, stored credential)
    /// does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A record with the same identity already exists and implicit
    /// overwrite is not allowed.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The supplied blob is missing a required field or is not the JSON
    /// shape its content type demands.
    #[error("invalid content: {0}")]
    InvalidContent(String),

    /// The auth token is unknown, expired, or bound to a different user.
    #[error("invalid auth token")]
    InvalidAuthToken,

    /// The controller DID could not be resolved to a DID document.
    #[error("DID not resolvable: {0}")]
    DidNotResolvable(String),

    /// No verification method with the requested key id exists in the
    /// resolved DID document.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The requested proof type is not one of the supported suites.
    #[error("unsupported signature type '{0}'")]
    UnsupportedSignatureType(String),

    /// The requested verification method is not listed under the required
    /// verification relationship of the controller's DID document.
    #[error("verification method mismatch: {0}")]
    VerificationMethodMismatch(String),

    /// Proof construction or proof checking failed.
    #[error("proof failed: {0}")]
    ProofFailed(String),

    /// A query payload was malformed or a dialect rejected its input.
    #[error("query error: {0}")]
    Query(String),

    /// The credential cannot participate in selective disclosure (no BBS+
    /// proof present).
    #[error("credential is not selective-disclosure capable")]
    NotSelectiveDisclosureCapable,

    /// The disclosure frame selects fields the credential does not carry.
    #[error("frame mismatch: {0}")]
    FrameMismatch(String),

    /// Underlying storage provider failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Key management failure (sealing, unsealing, signing).
    #[error(transparent)]
    Kms(#[from] KmsError),

    /// Canonical byte production failed.
    #[error(transparent)]
    Canonical(#[from] CanonicalError),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Declared but intentionally unimplemented operation.
    #[error("to be implemented: {0}")]
    NotImplemented(&'static str),
}
