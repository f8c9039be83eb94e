//! # Wallet Content Store
//!
//! Typed CRUD over the opaque blobs a wallet holds: credentials, stored DID
//! resolution responses, connections, metadata, collections, and key
//! material. Blobs are stored verbatim — no canonicalization, no rewriting —
//! under `content:<userID>:<contentType>:<contentID>`, where the content id
//! is extracted from the blob itself (a credential's `id`, a resolution
//! response's `didDocument.id`) or synthesized as a UUID when the blob
//! doesn't carry one.
//!
//! Writes require a live session token. Reads and removals don't: a locked
//! wallet can still be inspected, it just can't change or sign anything.
//!
//! `Key`-type content is special: it is routed into the session's key
//! manager instead of the content store, because private key material must
//! live sealed behind the master key, never as a plaintext blob.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::config::{BLS12381_G2_KEY_2020, CONTENT_KEY_PREFIX, ED25519_VERIFICATION_KEY_2018};
use crate::error::{Result, WalletError};
use crate::kms::KeyType;
use crate::session;
use crate::storage::Store;

/// The kinds of content a wallet stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// A verifiable credential.
    Credential,
    /// A cached DID resolution response (`{"didDocument": {...}}`).
    DidResolutionResponse,
    /// A connection record to another agent.
    Connection,
    /// Arbitrary wallet metadata.
    Metadata,
    /// A grouping of other contents.
    Collection,
    /// Private key material — imported into the KMS, never stored as a blob.
    Key,
}

impl ContentType {
    /// Wire/storage name of this content type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credential => "credential",
            Self::DidResolutionResponse => "didResolutionResponse",
            Self::Connection => "connection",
            Self::Metadata => "metadata",
            Self::Collection => "collection",
            Self::Key => "key",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of a `Key` content blob: a key id, a verification-method key type,
/// and the private key in base58.
#[derive(Deserialize)]
struct KeyContent {
    id: String,
    #[serde(rename = "type")]
    key_type: String,
    #[serde(rename = "privateKeyBase58")]
    private_key_base58: String,
}

/// Typed, user-namespaced content access.
#[derive(Clone)]
pub struct ContentStore {
    user_id: String,
    store: Arc<dyn Store>,
}

impl ContentStore {
    /// Open a content view for one user.
    pub fn new(store: Arc<dyn Store>, user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            store,
        }
    }

    fn record_key(&self, content_type: ContentType, content_id: &str) -> String {
        format!(
            "{CONTENT_KEY_PREFIX}{}:{}:{content_id}",
            self.user_id, content_type
        )
    }

    fn type_prefix(&self, content_type: ContentType) -> String {
        format!("{CONTENT_KEY_PREFIX}{}:{}:", self.user_id, content_type)
    }

    /// Save a blob under its extracted content id.
    ///
    /// Requires a live session token for this user. Fails with
    /// `InvalidContent` when the blob is not JSON or lacks a required id
    /// field, and with `AlreadyExists` when the `(type, id)` slot is taken —
    /// overwrite is never implicit; remove first if you mean it.
    pub fn save(&self, auth_token: &str, content_type: ContentType, blob: &[u8]) -> Result<String> {
        let kms = session::registry().kms_for_token(auth_token, &self.user_id)?;

        let value: Value = serde_json::from_slice(blob)
            .map_err(|e| WalletError::InvalidContent(format!("content is not JSON: {e}")))?;

        if content_type == ContentType::Key {
            return import_key_content(kms.as_ref(), &value);
        }

        let content_id = extract_content_id(content_type, &value)?;
        let key = self.record_key(content_type, &content_id);
        if self.store.get(&key)?.is_some() {
            return Err(WalletError::AlreadyExists(format!(
                "{content_type} content '{content_id}'"
            )));
        }

        self.store.put(&key, blob)?;
        tracing::debug!(user = %self.user_id, %content_type, id = %content_id, "saved content");
        Ok(content_id)
    }

    /// Fetch a blob by content id. Fails with `NotFound` if absent.
    pub fn get(&self, content_type: ContentType, content_id: &str) -> Result<Vec<u8>> {
        self.store
            .get(&self.record_key(content_type, content_id))?
            .ok_or_else(|| {
                WalletError::NotFound(format!("{content_type} content '{content_id}'"))
            })
    }

    /// Remove a blob by content id. Removing an absent entry is a no-op.
    pub fn remove(&self, content_type: ContentType, content_id: &str) -> Result<()> {
        self.store
            .delete(&self.record_key(content_type, content_id))?;
        Ok(())
    }

    /// All blobs of one type, keyed by content id.
    pub fn get_all(&self, content_type: ContentType) -> Result<HashMap<String, Vec<u8>>> {
        let prefix = self.type_prefix(content_type);
        let entries = self.store.iterate_prefix(&prefix)?;
        Ok(entries
            .into_iter()
            .map(|(key, value)| (key[prefix.len()..].to_string(), value))
            .collect())
    }
}

/// Pull the content id out of a blob according to its type's rules.
fn extract_content_id(content_type: ContentType, value: &Value) -> Result<String> {
    match content_type {
        ContentType::Credential => value
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| WalletError::InvalidContent("credential has no 'id'".to_string())),
        ContentType::DidResolutionResponse => value
            .pointer("/didDocument/id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                WalletError::InvalidContent(
                    "resolution response has no 'didDocument.id'".to_string(),
                )
            }),
        ContentType::Connection | ContentType::Metadata | ContentType::Collection => Ok(value
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string())),
        ContentType::Key => unreachable!("key content is imported, not stored"),
    }
}

/// Route a `Key` blob into the session KMS. The key id is the fragment of
/// the blob's `id` (or the whole id when there is no fragment), so that a
/// DID document's verification method id resolves straight to the key.
fn import_key_content(kms: &dyn crate::kms::Kms, value: &Value) -> Result<String> {
    let content: KeyContent = serde_json::from_value(value.clone())
        .map_err(|e| WalletError::InvalidContent(format!("malformed key content: {e}")))?;

    let key_type = match content.key_type.as_str() {
        ED25519_VERIFICATION_KEY_2018 => KeyType::Ed25519,
        BLS12381_G2_KEY_2020 => KeyType::Bls12381G2,
        other => {
            return Err(WalletError::InvalidContent(format!(
                "unsupported key content type '{other}'"
            )))
        }
    };

    let secret = bs58::decode(&content.private_key_base58)
        .into_vec()
        .map_err(|e| WalletError::InvalidContent(format!("bad privateKeyBase58: {e}")))?;

    let key_id = crate::did::split_did_url(&content.id)
        .1
        .unwrap_or(&content.id)
        .to_string();
    kms.import_key(&key_id, key_type, &secret)?;
    Ok(key_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::KmsConfig;
    use crate::session::{self, UnlockOptions};
    use crate::storage::{MemoryStorage, StorageProvider};
    use serde_json::json;

    /// Opens a profile + session so saves are authorized.
    fn unlocked_store(user: &str) -> (ContentStore, String) {
        let provider = Arc::new(MemoryStorage::new());
        let store = provider.open_store("wallet").unwrap();

        let profiles = crate::profile::ProfileStore::new(store.clone());
        let profile = profiles.create(user, &KmsConfig::Passphrase("pw")).unwrap();

        let token = session::registry()
            .create_key_manager(
                &profile,
                provider.clone(),
                &UnlockOptions::new().with_passphrase("pw"),
            )
            .unwrap();

        (ContentStore::new(store, user), token)
    }

    fn credential_blob(id: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "id": id,
            "type": ["VerifiableCredential"],
            "issuer": "did:example:issuer",
            "credentialSubject": {"id": "did:example:subject"}
        }))
        .unwrap()
    }

    #[test]
    fn save_get_roundtrip_is_verbatim() {
        let (store, token) = unlocked_store("content-user-1");
        let blob = credential_blob("urn:cred:1");

        let id = store
            .save(&token, ContentType::Credential, &blob)
            .unwrap();
        assert_eq!(id, "urn:cred:1");

        // Byte-for-byte what was written.
        assert_eq!(store.get(ContentType::Credential, "urn:cred:1").unwrap(), blob);
    }

    #[test]
    fn duplicate_save_rejected() {
        let (store, token) = unlocked_store("content-user-2");
        let blob = credential_blob("urn:cred:1");
        store.save(&token, ContentType::Credential, &blob).unwrap();

        assert!(matches!(
            store.save(&token, ContentType::Credential, &blob),
            Err(WalletError::AlreadyExists(_))
        ));
    }

    #[test]
    fn save_with_bad_token_rejected() {
        let (store, _token) = unlocked_store("content-user-3");
        assert!(matches!(
            store.save("bogus", ContentType::Credential, &credential_blob("urn:c")),
            Err(WalletError::InvalidAuthToken)
        ));
    }

    #[test]
    fn credential_without_id_is_invalid() {
        let (store, token) = unlocked_store("content-user-4");
        let blob = serde_json::to_vec(&json!({"type": ["VerifiableCredential"]})).unwrap();
        assert!(matches!(
            store.save(&token, ContentType::Credential, &blob),
            Err(WalletError::InvalidContent(_))
        ));
    }

    #[test]
    fn resolution_response_id_comes_from_did_document() {
        let (store, token) = unlocked_store("content-user-5");
        let blob = serde_json::to_vec(&json!({
            "didDocument": {"id": "did:example:alice", "verificationMethod": []}
        }))
        .unwrap();

        let id = store
            .save(&token, ContentType::DidResolutionResponse, &blob)
            .unwrap();
        assert_eq!(id, "did:example:alice");
    }

    #[test]
    fn metadata_without_id_gets_generated_one() {
        let (store, token) = unlocked_store("content-user-6");
        let blob = serde_json::to_vec(&json!({"note": "remember the milk"})).unwrap();
        let id = store.save(&token, ContentType::Metadata, &blob).unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(store.get(ContentType::Metadata, &id).unwrap(), blob);
    }

    #[test]
    fn remove_is_idempotent_and_get_after_remove_is_not_found() {
        let (store, token) = unlocked_store("content-user-7");
        store
            .save(&token, ContentType::Credential, &credential_blob("urn:c1"))
            .unwrap();

        store.remove(ContentType::Credential, "urn:c1").unwrap();
        assert!(matches!(
            store.get(ContentType::Credential, "urn:c1"),
            Err(WalletError::NotFound(_))
        ));

        // Second remove is a no-op, not an error.
        store.remove(ContentType::Credential, "urn:c1").unwrap();
    }

    #[test]
    fn get_all_scans_only_the_requested_type() {
        let (store, token) = unlocked_store("content-user-8");
        store
            .save(&token, ContentType::Credential, &credential_blob("urn:c1"))
            .unwrap();
        store
            .save(&token, ContentType::Credential, &credential_blob("urn:c2"))
            .unwrap();
        store
            .save(
                &token,
                ContentType::Metadata,
                &serde_json::to_vec(&json!({"id": "m1"})).unwrap(),
            )
            .unwrap();

        let credentials = store.get_all(ContentType::Credential).unwrap();
        assert_eq!(credentials.len(), 2);
        assert!(credentials.contains_key("urn:c1"));
        assert!(credentials.contains_key("urn:c2"));
    }

    #[test]
    fn key_content_lands_in_the_kms_not_the_store() {
        let (store, token) = unlocked_store("content-user-9");
        let (secret, _) = crate::kms::generate_key(KeyType::Ed25519);
        let blob = serde_json::to_vec(&json!({
            "id": "did:example:me#signing-key",
            "type": "Ed25519VerificationKey2018",
            "privateKeyBase58": bs58::encode(secret.as_slice()).into_string()
        }))
        .unwrap();

        let key_id = store.save(&token, ContentType::Key, &blob).unwrap();
        assert_eq!(key_id, "signing-key");

        // No content blob was written.
        assert!(store.get_all(ContentType::Key).unwrap().is_empty());

        // But the key is usable through the session.
        let kms = session::registry()
            .kms_for_token(&token, "content-user-9")
            .unwrap();
        assert!(kms.sign("signing-key", b"hello").is_ok());
    }
}
