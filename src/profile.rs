//! # Wallet Profiles
//!
//! A profile is the durable record that a user exists and how their key
//! manager unlocks: by passphrase, by an injected secret-lock service, or
//! through a remote key server. Exactly one profile per user — creation
//! fails on an existing record, update fails on a missing one, and nothing
//! in this crate ever deletes a profile (that's an administrative act
//! against the storage provider).
//!
//! Passphrase bindings never store the passphrase. They store a random HKDF
//! salt plus a fingerprint of the derived master key, so a wrong passphrase
//! is rejected at unlock time without a single decrypt attempt.

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{PASSPHRASE_SALT_LENGTH, PROFILE_KEY_PREFIX};
use crate::error::{Result, WalletError};
use crate::kms::{master_key_check, PassphraseLock, SecretLock};
use crate::storage::Store;

/// How a profile's key manager unlocks. The enum carries exactly one
/// binding by construction — there is no way to persist an ambiguous or
/// empty binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum KmsBinding {
    /// Master key derived from a passphrase over a per-profile salt.
    Passphrase {
        /// HKDF salt, hex.
        salt: String,
        /// Fingerprint of the derived master key.
        check: String,
    },
    /// Master key produced by an embedder-injected secret-lock service.
    SecretLockService {
        /// Fingerprint of the master key recorded at profile creation.
        check: String,
    },
    /// Keys held by a remote key server; signing is delegated outward.
    RemoteKeyServer {
        /// Base URL of the key server this profile is pinned to.
        url: String,
    },
}

/// Unlock configuration supplied when creating or updating a profile.
pub enum KmsConfig<'a> {
    /// Bind to a passphrase.
    Passphrase(&'a str),
    /// Bind to a secret-lock service.
    SecretLock(&'a dyn SecretLock),
    /// Bind to a remote key server at the given URL.
    RemoteKeyServer(&'a str),
}

impl KmsBinding {
    fn from_config(config: &KmsConfig<'_>) -> Result<Self> {
        match config {
            KmsConfig::Passphrase(passphrase) => {
                let mut salt = [0u8; PASSPHRASE_SALT_LENGTH];
                rand::rngs::OsRng.fill_bytes(&mut salt);
                let master_key = PassphraseLock::new(passphrase, &salt).master_key()?;
                Ok(Self::Passphrase {
                    salt: hex::encode(salt),
                    check: master_key_check(&master_key),
                })
            }
            KmsConfig::SecretLock(lock) => {
                let master_key = lock.master_key()?;
                Ok(Self::SecretLockService {
                    check: master_key_check(&master_key),
                })
            }
            KmsConfig::RemoteKeyServer(url) => Ok(Self::RemoteKeyServer {
                url: (*url).to_string(),
            }),
        }
    }
}

/// Per-user wallet profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Owner of this wallet's contents.
    pub user_id: String,

    /// How the key manager unlocks.
    pub kms_binding: KmsBinding,

    /// When the profile was created.
    pub created_at: DateTime<Utc>,

    /// When the binding was last changed.
    pub updated_at: DateTime<Utc>,
}

/// Typed access to profile records in the wallet store.
pub struct ProfileStore {
    store: Arc<dyn Store>,
}

impl ProfileStore {
    /// Open the profile store over a storage handle.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    fn record_key(user_id: &str) -> String {
        format!("{PROFILE_KEY_PREFIX}{user_id}")
    }

    /// Create a profile. Fails with `AlreadyExists` if the user has one.
    pub fn create(&self, user_id: &str, config: &KmsConfig<'_>) -> Result<Profile> {
        let key = Self::record_key(user_id);
        if self.store.get(&key)?.is_some() {
            return Err(WalletError::AlreadyExists(format!(
                "profile for user '{user_id}'"
            )));
        }

        let now = Utc::now();
        let profile = Profile {
            user_id: user_id.to_string(),
            kms_binding: KmsBinding::from_config(config)?,
            created_at: now,
            updated_at: now,
        };
        self.store.put(&key, &serde_json::to_vec(&profile)?)?;

        tracing::info!(user = %user_id, "created wallet profile");
        Ok(profile)
    }

    /// Replace the binding of an existing profile. Fails with `NotFound`
    /// if the user has no profile. Changing the binding re-keys the lock:
    /// keys sealed under the old master key become unreadable.
    pub fn update(&self, user_id: &str, config: &KmsConfig<'_>) -> Result<Profile> {
        let key = Self::record_key(user_id);
        let existing = self
            .store
            .get(&key)?
            .ok_or_else(|| WalletError::NotFound(format!("profile for user '{user_id}'")))?;
        let mut profile: Profile = serde_json::from_slice(&existing)?;

        profile.kms_binding = KmsBinding::from_config(config)?;
        profile.updated_at = Utc::now();
        self.store.put(&key, &serde_json::to_vec(&profile)?)?;

        tracing::info!(user = %user_id, "updated wallet profile binding");
        Ok(profile)
    }

    /// Fetch a profile. Fails with `NotFound` if absent.
    pub fn get(&self, user_id: &str) -> Result<Profile> {
        let bytes = self
            .store
            .get(&Self::record_key(user_id))?
            .ok_or_else(|| WalletError::NotFound(format!("profile for user '{user_id}'")))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
