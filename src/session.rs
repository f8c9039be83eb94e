//! # Session Registry
//!
//! The only process-wide mutable state in the crate: a registry mapping
//! users to their unlocked key managers, guarded by one mutex. Opening a
//! wallet derives the master key from the profile's binding, wraps it in a
//! KMS handle, and files the handle under a fresh random token. Everything
//! that needs a signer afterwards presents the token.
//!
//! Design choices that matter:
//!
//! - **One session per user.** Re-opening replaces the previous session and
//!   invalidates its token.
//! - **Lazy expiry.** Tokens carry an absolute expiry checked on next use;
//!   nothing runs in the background. An expired session is purged the
//!   moment anyone presents its token.
//! - **One coarse lock.** Contention on this map is negligible and the
//!   invariants are easier to hold with a single mutual-exclusion region
//!   than with per-user locking. No lock is ever held across a storage,
//!   resolver, or KMS call.
//! - **Tokens are 256 random bits**, hex-encoded. Unknown and expired
//!   tokens are indistinguishable to callers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rand::RngCore;

use crate::config::{DEFAULT_SESSION_TTL, KMS_STORE, SESSION_TOKEN_BYTES};
use crate::did::split_did_url;
use crate::error::{Result, WalletError};
use crate::kms::{master_key_check, Kms, KmsError, LocalKms, PassphraseLock, SecretLock};
use crate::profile::{KmsBinding, Profile};
use crate::storage::StorageProvider;

static REGISTRY: Lazy<SessionRegistry> = Lazy::new(SessionRegistry::default);

/// The process-wide session registry.
pub fn registry() -> &'static SessionRegistry {
    &REGISTRY
}

/// Options controlling how a wallet unlocks.
#[derive(Default, Clone)]
pub struct UnlockOptions {
    passphrase: Option<String>,
    secret_lock: Option<Arc<dyn SecretLock>>,
    remote_kms: Option<Arc<dyn Kms>>,
    expiry: Option<Duration>,
}

impl UnlockOptions {
    /// Empty options; fill in whatever the profile's binding needs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Unlock a passphrase-bound profile.
    pub fn with_passphrase(mut self, passphrase: &str) -> Self {
        self.passphrase = Some(passphrase.to_string());
        self
    }

    /// Unlock a secret-lock-bound profile with the given lock service.
    pub fn with_secret_lock(mut self, lock: Arc<dyn SecretLock>) -> Self {
        self.secret_lock = Some(lock);
        self
    }

    /// Unlock a remote-key-server-bound profile with an already
    /// authenticated client for that server.
    pub fn with_remote_kms(mut self, kms: Arc<dyn Kms>) -> Self {
        self.remote_kms = Some(kms);
        self
    }

    /// Override the default session lifetime.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = Some(expiry);
        self
    }
}

struct Session {
    token: String,
    expires_at: DateTime<Utc>,
    kms: Arc<dyn Kms>,
}

#[derive(Default)]
struct Inner {
    by_user: HashMap<String, Session>,
    user_by_token: HashMap<String, String>,
}

/// Registry of unlocked key managers, keyed by user and by token.
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<Inner>,
}

impl SessionRegistry {
    /// Unlock the profile's key manager and register a fresh session,
    /// replacing any existing session for the same user. Returns the new
    /// token.
    pub fn create_key_manager(
        &self,
        profile: &Profile,
        storage: Arc<dyn StorageProvider>,
        options: &UnlockOptions,
    ) -> Result<String> {
        let kms = unlock_kms(profile, storage, options)?;

        let mut token_bytes = [0u8; SESSION_TOKEN_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut token_bytes);
        let token = hex::encode(token_bytes);

        let ttl = options.expiry.unwrap_or(DEFAULT_SESSION_TTL);
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl)
                .unwrap_or_else(|_| chrono::Duration::seconds(600));

        let mut inner = self.inner.lock();
        if let Some(previous) = inner.by_user.remove(&profile.user_id) {
            inner.user_by_token.remove(&previous.token);
        }
        inner
            .user_by_token
            .insert(token.clone(), profile.user_id.clone());
        inner.by_user.insert(
            profile.user_id.clone(),
            Session {
                token: token.clone(),
                expires_at,
                kms,
            },
        );

        tracing::info!(user = %profile.user_id, ttl_secs = ttl.as_secs(), "wallet unlocked");
        Ok(token)
    }

    /// Drop the user's session. Returns `true` iff a session existed.
    pub fn remove_key_manager(&self, user_id: &str) -> bool {
        let mut inner = self.inner.lock();
        match inner.by_user.remove(user_id) {
            Some(session) => {
                inner.user_by_token.remove(&session.token);
                tracing::info!(user = %user_id, "wallet locked");
                true
            }
            None => false,
        }
    }

    /// The KMS handle behind a token, provided the token is live and bound
    /// to the expected user.
    pub fn kms_for_token(&self, token: &str, user_id: &str) -> Result<Arc<dyn Kms>> {
        let mut inner = self.inner.lock();

        let owner = inner
            .user_by_token
            .get(token)
            .cloned()
            .ok_or(WalletError::InvalidAuthToken)?;
        if owner != user_id {
            return Err(WalletError::InvalidAuthToken);
        }

        let expired = inner
            .by_user
            .get(&owner)
            .map(|s| s.expires_at <= Utc::now())
            .unwrap_or(true);
        if expired {
            if let Some(session) = inner.by_user.remove(&owner) {
                inner.user_by_token.remove(&session.token);
            }
            return Err(WalletError::InvalidAuthToken);
        }

        Ok(inner.by_user[&owner].kms.clone())
    }

    /// Produce a signer bound to the key behind a verification method.
    /// The KMS key id is the DID URL's fragment (or the whole id when
    /// there is no fragment).
    pub fn resolve_signer(
        &self,
        token: &str,
        user_id: &str,
        verification_method: &str,
    ) -> Result<SessionSigner> {
        let kms = self.kms_for_token(token, user_id)?;
        let (_, fragment) = split_did_url(verification_method);
        Ok(SessionSigner {
            kms,
            key_id: fragment.unwrap_or(verification_method).to_string(),
        })
    }
}

/// A signing closure bound to one session key. Holds the KMS handle, so it
/// stays valid for the operation even if the session is replaced mid-flight.
pub struct SessionSigner {
    kms: Arc<dyn Kms>,
    key_id: String,
}

impl SessionSigner {
    /// Sign a single message.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        Ok(self.kms.sign(&self.key_id, message)?)
    }

    /// Sign an ordered message set (BBS+).
    pub fn sign_multi(&self, messages: &[Vec<u8>]) -> Result<Vec<u8>> {
        Ok(self.kms.sign_multi(&self.key_id, messages)?)
    }

    /// The KMS key id this signer is bound to.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

/// Derive the KMS handle a profile's binding calls for.
fn unlock_kms(
    profile: &Profile,
    storage: Arc<dyn StorageProvider>,
    options: &UnlockOptions,
) -> Result<Arc<dyn Kms>> {
    match &profile.kms_binding {
        KmsBinding::Passphrase { salt, check } => {
            let passphrase = options
                .passphrase
                .as_deref()
                .ok_or(KmsError::InvalidUnlockCredentials)?;
            let salt = hex::decode(salt).map_err(|_| KmsError::InvalidUnlockCredentials)?;
            let master_key = PassphraseLock::new(passphrase, &salt).master_key()?;
            if master_key_check(&master_key) != *check {
                return Err(KmsError::InvalidUnlockCredentials.into());
            }
            let store = storage.open_store(KMS_STORE)?;
            Ok(Arc::new(LocalKms::new(store, &profile.user_id, master_key)))
        }
        KmsBinding::SecretLockService { check } => {
            let lock = options
                .secret_lock
                .as_ref()
                .ok_or(KmsError::InvalidUnlockCredentials)?;
            let master_key = lock.master_key()?;
            if master_key_check(&master_key) != *check {
                return Err(KmsError::InvalidUnlockCredentials.into());
            }
            let store = storage.open_store(KMS_STORE)?;
            Ok(Arc::new(LocalKms::new(store, &profile.user_id, master_key)))
        }
        KmsBinding::RemoteKeyServer { url } => {
            let kms = options
                .remote_kms
                .as_ref()
                .ok_or(KmsError::InvalidUnlockCredentials)?;
            tracing::debug!(user = %profile.user_id, server = %url, "using remote key server");
            Ok(kms.clone())
        }
    }
}
