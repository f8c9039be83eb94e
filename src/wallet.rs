//! # Wallet Façade
//!
//! [`Wallet`] is the single entry point applications hold: one value per
//! user, owning handles to the profile store, content store, and
//! content-backed resolver, with the process-wide session registry behind
//! it. The lifecycle reads like a state machine:
//!
//! ```text
//! (no profile) --create_profile--> locked --open--> unlocked
//!       unlocked --close / token expiry--> locked
//! ```
//!
//! Reads, queries, and verification work while locked. Anything that needs
//! a signer — issuing, proving, adding key material — demands a live token
//! from `open`.
//!
//! A deliberate contract, inherited from how wallet UIs actually behave:
//! **`prove` does not verify** the credentials it bundles. Resolving
//! stored or raw credentials for presentation skips proof checking so that
//! unverified credentials can still be displayed and presented; a caller
//! that wants assurance runs [`Wallet::verify`] per credential, explicitly.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::WALLET_STORE;
use crate::content::{ContentStore, ContentType};
use crate::credential::{Credential, Presentation};
use crate::derive::{derive_credential, DeriveOptions};
use crate::did::{DidResolver, VerificationRelationship};
use crate::error::{Result, WalletError};
use crate::profile::{KmsConfig, Profile, ProfileStore};
use crate::query::{perform_query, QueryParams};
use crate::session::{self, UnlockOptions};
use crate::storage::StorageProvider;
use crate::suites::{add_linked_data_proof, validate_proof_options, ProofOptions};
use crate::vdr::ContentVdr;
use crate::verify::ProofVerifier;

/// What to verify: a stored credential by id, raw credential bytes, or raw
/// presentation bytes.
#[derive(Debug, Clone)]
pub enum VerificationRequest {
    /// Verify a credential already stored in the wallet.
    StoredCredential(String),
    /// Verify raw credential bytes.
    RawCredential(Vec<u8>),
    /// Verify raw presentation bytes (and every credential inside).
    RawPresentation(Vec<u8>),
}

/// The outcome of a verification: a verdict plus failure detail. Proof
/// failures land here as `verified = false` rather than as errors.
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    /// Whether every checked proof held up.
    pub verified: bool,
    /// What went wrong, when it didn't.
    pub detail: Option<String>,
}

/// Credential inputs for [`Wallet::prove`]. Any combination of stored ids,
/// raw bytes, and parsed credentials; optionally appended to an existing
/// presentation instead of a fresh one.
#[derive(Debug, Clone, Default)]
pub struct ProveRequest {
    /// Ids of credentials stored in the wallet.
    pub stored_credentials: Vec<String>,
    /// Raw credential bytes.
    pub raw_credentials: Vec<Vec<u8>>,
    /// Already-parsed credentials.
    pub credentials: Vec<Credential>,
    /// Presentation to append to, instead of building a fresh one.
    pub presentation: Option<Presentation>,
}

impl ProveRequest {
    /// Empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stored credential by id.
    pub fn with_stored_credential(mut self, id: &str) -> Self {
        self.stored_credentials.push(id.to_string());
        self
    }

    /// Add raw credential bytes.
    pub fn with_raw_credential(mut self, bytes: Vec<u8>) -> Self {
        self.raw_credentials.push(bytes);
        self
    }

    /// Add a parsed credential.
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credentials.push(credential);
        self
    }

    /// Append to an existing presentation.
    pub fn with_presentation(mut self, presentation: Presentation) -> Self {
        self.presentation = Some(presentation);
        self
    }
}

/// The credential to derive: stored id, raw bytes, or parsed.
#[derive(Debug, Clone)]
pub enum DeriveSource {
    /// A credential stored in the wallet.
    Stored(String),
    /// Raw credential bytes.
    Raw(Vec<u8>),
    /// An already-parsed credential.
    Parsed(Box<Credential>),
}

/// A per-user verifiable-credential wallet.
pub struct Wallet {
    user_id: String,
    profile: Profile,
    storage: Arc<dyn StorageProvider>,
    contents: ContentStore,
    vdr: ContentVdr,
}

impl Wallet {
    /// Open the wallet of an existing user. Fails with `NotFound` when no
    /// profile exists — create one with [`Wallet::create_profile`] first.
    pub fn new(
        user_id: &str,
        storage: Arc<dyn StorageProvider>,
        resolver: Arc<dyn DidResolver>,
    ) -> Result<Self> {
        let store = storage.open_store(WALLET_STORE)?;
        let profile = ProfileStore::new(store.clone()).get(user_id)?;
        let contents = ContentStore::new(store, user_id);
        let vdr = ContentVdr::new(resolver, contents.clone());

        Ok(Self {
            user_id: user_id.to_string(),
            profile,
            storage,
            contents,
            vdr,
        })
    }

    /// Create a profile for a new user. Fails with `AlreadyExists` for a
    /// known user — use [`Wallet::update_profile`] to change a binding.
    pub fn create_profile(
        user_id: &str,
        storage: &dyn StorageProvider,
        config: &KmsConfig<'_>,
    ) -> Result<()> {
        let store = storage.open_store(WALLET_STORE)?;
        ProfileStore::new(store).create(user_id, config)?;
        Ok(())
    }

    /// Replace an existing user's KMS binding. Keys sealed under the old
    /// binding become unreadable — this is a re-key, not a migration.
    pub fn update_profile(
        user_id: &str,
        storage: &dyn StorageProvider,
        config: &KmsConfig<'_>,
    ) -> Result<()> {
        let store = storage.open_store(WALLET_STORE)?;
        ProfileStore::new(store).update(user_id, config)?;
        Ok(())
    }

    /// Whether a profile exists for the user.
    pub fn profile_exists(user_id: &str, storage: &dyn StorageProvider) -> Result<bool> {
        let store = storage.open_store(WALLET_STORE)?;
        match ProfileStore::new(store).get(user_id) {
            Ok(_) => Ok(true),
            Err(WalletError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// The user this wallet belongs to.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    /// Unlock the wallet's key manager. Returns a token for signer-requiring
    /// operations; the token expires after the configured TTL or on
    /// [`Wallet::close`]. Re-opening replaces any previous session.
    pub fn open(&self, options: &UnlockOptions) -> Result<String> {
        session::registry().create_key_manager(&self.profile, self.storage.clone(), options)
    }

    /// Lock the wallet. Returns `false` when there was no live session.
    pub fn close(&self) -> bool {
        session::registry().remove_key_manager(&self.user_id)
    }

    // -----------------------------------------------------------------------
    // Contents
    // -----------------------------------------------------------------------

    /// Add content to the wallet. Returns the content id. `Key` content is
    /// imported into the session key manager instead of being stored.
    pub fn add(
        &self,
        auth_token: &str,
        content_type: ContentType,
        content: &[u8],
    ) -> Result<String> {
        self.contents.save(auth_token, content_type, content)
    }

    /// Fetch one content blob.
    pub fn get(&self, content_type: ContentType, content_id: &str) -> Result<Vec<u8>> {
        self.contents.get(content_type, content_id)
    }

    /// Fetch all content of a type, keyed by content id.
    pub fn get_all(&self, content_type: ContentType) -> Result<HashMap<String, Vec<u8>>> {
        self.contents.get_all(content_type)
    }

    /// Remove one content blob. Removing absent content is a no-op.
    pub fn remove(&self, content_type: ContentType, content_id: &str) -> Result<()> {
        self.contents.remove(content_type, content_id)
    }

    // -----------------------------------------------------------------------
    // Query
    // -----------------------------------------------------------------------

    /// Run presentation queries over the stored credentials. One
    /// presentation per query, in input order.
    pub fn query(&self, params: &[QueryParams]) -> Result<Vec<Presentation>> {
        let blobs = self.contents.get_all(ContentType::Credential)?;

        let mut ids: Vec<&String> = blobs.keys().collect();
        ids.sort();
        let mut credentials = Vec::with_capacity(ids.len());
        for id in ids {
            let credential = Credential::parse(&blobs[id]).map_err(|e| {
                WalletError::Query(format!("stored credential '{id}' does not parse: {e}"))
            })?;
            credentials.push(credential);
        }

        perform_query(&credentials, params)
    }

    // -----------------------------------------------------------------------
    // Proof operations
    // -----------------------------------------------------------------------

    /// Issue: attach an assertion proof to a credential. The result is
    /// returned, not stored — persisting it is the caller's decision.
    pub fn issue(
        &self,
        auth_token: &str,
        credential: &[u8],
        options: &ProofOptions,
    ) -> Result<Credential> {
        let mut credential = Credential::parse(credential)?;

        let resolved = validate_proof_options(
            &self.vdr,
            options,
            VerificationRelationship::AssertionMethod,
        )?;
        let signer = session::registry().resolve_signer(
            auth_token,
            &self.user_id,
            &resolved.verification_method,
        )?;

        add_linked_data_proof(&mut credential, &signer, &resolved)?;
        Ok(credential)
    }

    /// Prove: bundle credentials into a presentation and sign it for
    /// authentication. Constituent credentials are *not* verified here —
    /// see the module docs.
    pub fn prove(
        &self,
        auth_token: &str,
        options: &ProofOptions,
        request: ProveRequest,
    ) -> Result<Presentation> {
        let mut presentation = self.resolve_presentation(request)?;

        let resolved = validate_proof_options(
            &self.vdr,
            options,
            VerificationRelationship::Authentication,
        )?;
        let signer = session::registry().resolve_signer(
            auth_token,
            &self.user_id,
            &resolved.verification_method,
        )?;

        presentation.holder = Some(options.controller.clone());
        add_linked_data_proof(&mut presentation, &signer, &resolved)?;
        Ok(presentation)
    }

    /// Verify a credential or presentation. Proof failures come back as
    /// `verified = false` with detail; only failures *reaching* the
    /// material (e.g. an unknown stored id) surface as errors.
    pub fn verify(&self, request: &VerificationRequest) -> Result<VerificationOutcome> {
        let verifier = ProofVerifier::new(self.vdr.key_fetcher());

        let checked = match request {
            VerificationRequest::StoredCredential(id) => {
                let blob = self.contents.get(ContentType::Credential, id)?;
                verifier.verify_credential_bytes(&blob)
            }
            VerificationRequest::RawCredential(bytes) => verifier.verify_credential_bytes(bytes),
            VerificationRequest::RawPresentation(bytes) => {
                verifier.verify_presentation_bytes(bytes)
            }
        };

        Ok(match checked {
            Ok(()) => VerificationOutcome {
                verified: true,
                detail: None,
            },
            Err(failure) => VerificationOutcome {
                verified: false,
                detail: Some(failure.to_string()),
            },
        })
    }

    /// Derive a selectively-disclosed credential from a BBS+-signed source.
    /// Works on a locked wallet: deriving needs only public key material.
    pub fn derive(&self, source: DeriveSource, options: &DeriveOptions) -> Result<Credential> {
        let credential = match source {
            DeriveSource::Stored(id) => {
                let blob = self.contents.get(ContentType::Credential, &id)?;
                Credential::parse(&blob)?
            }
            DeriveSource::Raw(bytes) => Credential::parse(&bytes)?,
            DeriveSource::Parsed(credential) => *credential,
        };

        derive_credential(&credential, options, &self.vdr.key_fetcher())
    }

    // -----------------------------------------------------------------------
    // Interop placeholders
    // -----------------------------------------------------------------------

    /// Export the wallet's contents in the universal-wallet wire format.
    pub fn export(&self, _auth_token: &str) -> Result<Vec<u8>> {
        Err(WalletError::NotImplemented("export"))
    }

    /// Import contents previously produced by [`Wallet::export`].
    pub fn import(&self, _auth_token: &str, _contents: &[u8]) -> Result<()> {
        Err(WalletError::NotImplemented("import"))
    }

    fn resolve_presentation(&self, request: ProveRequest) -> Result<Presentation> {
        let mut credentials = Vec::new();

        for id in &request.stored_credentials {
            let blob = self.contents.get(ContentType::Credential, id)?;
            // Proof checking stays off while resolving: presentations may
            // intentionally carry credentials the holder hasn't verified.
            credentials.push(Credential::parse(&blob)?);
        }
        for bytes in &request.raw_credentials {
            credentials.push(Credential::parse(bytes)?);
        }
        credentials.extend(request.credentials);

        Ok(match request.presentation {
            Some(mut presentation) => {
                presentation.add_credentials(credentials);
                presentation
            }
            None => Presentation::new(credentials),
        })
    }
}
