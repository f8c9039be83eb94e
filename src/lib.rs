// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # satchel — Verifiable Credential Wallet Core
//!
//! A lockable, per-user vault for W3C Verifiable Credentials and the
//! cryptographic operations that make them useful: issue, prove, verify,
//! derive, and query. satchel is the core, not the app — it owns the
//! credential logic and delegates everything environmental to three
//! injected collaborators:
//!
//! - a **storage provider** (key-value, prefix-scannable; sled-backed and
//!   in-memory implementations ship in-crate),
//! - a **DID resolver** (`did → DID document`; wallet-stored resolution
//!   responses take precedence over it),
//! - a **KMS** (a signing oracle; the in-process one seals keys under a
//!   passphrase- or lock-service-derived master key).
//!
//! ## Shape of the crate
//!
//! - **profile / content / session** — who the user is, what they hold,
//!   and the short-lived token that proves their wallet is unlocked.
//! - **did / vdr** — DID document reading and two-level resolution.
//! - **canonical / suites** — deterministic byte production and the three
//!   supported proof suites (`Ed25519Signature2018`,
//!   `JsonWebSignature2020`, `BbsBlsSignature2020`).
//! - **query** — presentation requests in three dialects (JSON-LD frame,
//!   DIF presentation exchange, query-by-example).
//! - **derive** — BBS+ selective disclosure.
//! - **verify** — resolver-backed proof checking.
//! - **wallet** — the façade that ties it together.
//!
//! ## A quick tour
//!
//! ```no_run
//! use std::sync::Arc;
//! use satchel::{
//!     ContentType, KmsConfig, ProofOptions, StaticDidResolver, MemoryStorage,
//!     UnlockOptions, Wallet,
//! };
//!
//! # fn main() -> satchel::Result<()> {
//! let storage = Arc::new(MemoryStorage::new());
//! let resolver = Arc::new(StaticDidResolver::new());
//!
//! Wallet::create_profile("alice", storage.as_ref(), &KmsConfig::Passphrase("correct horse"))?;
//! let wallet = Wallet::new("alice", storage.clone(), resolver)?;
//!
//! let token = wallet.open(&UnlockOptions::new().with_passphrase("correct horse"))?;
//! wallet.add(&token, ContentType::Credential, br#"{"id":"urn:cred:1", "...": "..."}"#)?;
//! let signed = wallet.issue(&token, b"...credential json...",
//!     &ProofOptions::new("did:example:alice"))?;
//! wallet.close();
//! # Ok(())
//! # }
//! ```
//!
//! ## Guarantees worth knowing
//!
//! - One profile per user; one live session per user; tokens are 256
//!   random bits with lazy expiry.
//! - Content blobs round-trip byte-for-byte; saves never overwrite
//!   implicitly.
//! - `issue` has no side effect on the content store.
//! - `prove` never verifies the credentials it bundles; `verify` is the
//!   explicit, separate judgment call.

pub mod canonical;
pub mod config;
pub mod content;
pub mod context;
pub mod credential;
pub mod derive;
pub mod did;
pub mod error;
pub mod kms;
pub mod profile;
pub mod query;
pub mod session;
pub mod storage;
pub mod suites;
pub mod vdr;
pub mod verify;
pub mod wallet;

pub use canonical::{CanonicalBytes, CanonicalError};
pub use content::ContentType;
pub use credential::{Credential, Presentation, Proof, Provable};
pub use derive::DeriveOptions;
pub use did::{
    key_did_document, DidDocument, DidKeyType, DidResolution, DidResolver, StaticDidResolver,
    VerificationMethod, VerificationRelationship,
};
pub use error::{Result, WalletError};
pub use kms::{generate_key, KeyType, Kms, KmsError, LocalKms, PassphraseLock, SecretLock};
pub use profile::{KmsBinding, KmsConfig, Profile};
pub use query::{QueryDialect, QueryParams};
pub use session::{SessionSigner, UnlockOptions};
pub use storage::{MemoryStorage, SledStorage, StorageError, StorageProvider, Store};
pub use suites::{ProofOptions, ProofRepresentation, SignatureSuite};
pub use vdr::{ContentVdr, KeyFetcher, PublicKeyMaterial};
pub use verify::ProofVerifier;
pub use wallet::{
    DeriveSource, ProveRequest, VerificationOutcome, VerificationRequest, Wallet,
};
