//! # Key Management
//!
//! The wallet treats its KMS as a signing oracle: hand it a key id and a
//! message (or message set), get a signature back, never see the private
//! key. [`Kms`] is that contract. [`LocalKms`] is the in-process
//! implementation: key material lives in the storage provider sealed with
//! AES-256-GCM under a master key, and the master key itself comes from a
//! [`SecretLock`] — a passphrase-derived lock, or whatever lock service the
//! embedder injects.
//!
//! ## Sealing format
//!
//! Sealed secrets are `nonce || ciphertext` with a random 96-bit nonce, the
//! standard AES-GCM wire shape. Unseal failures are deliberately vague: the
//! difference between "wrong master key" and "corrupted record" is nobody's
//! business.
//!
//! ## Key types
//!
//! - `Ed25519` — single-message signatures ([`Kms::sign`]).
//! - `Bls12381G2` — BBS+ set signatures over message lists
//!   ([`Kms::sign_multi`]), required for selective disclosure.

use std::sync::Arc;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use bbs::prelude::{
    DeterministicPublicKey, Issuer, KeyGenOption, SecretKey, Signature, SignatureMessage,
};
use bbs::HashElem;
use ed25519_dalek::{Signer, SigningKey};
use hkdf::Hkdf;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::config::{KMS_KEY_PREFIX, MASTER_KEY_INFO, MASTER_KEY_LENGTH};
use crate::storage::{StorageError, Store};

const AES_NONCE_LENGTH: usize = 12;

/// Errors raised by key management.
#[derive(Debug, Error)]
pub enum KmsError {
    /// No key with this id exists for the user.
    #[error("unknown key '{0}'")]
    UnknownKey(String),

    /// The key exists but its type doesn't support the requested operation.
    #[error("key type mismatch: {0}")]
    KeyTypeMismatch(String),

    /// Imported key bytes are the wrong length or not a valid key.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// Sealing key material at rest failed.
    #[error("sealing key material failed")]
    SealFailed,

    /// Unsealing failed — wrong master key or corrupted record.
    #[error("unsealing key material failed")]
    UnsealFailed,

    /// The signature computation itself failed.
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// Unlock credentials are missing or wrong for the profile's binding.
    #[error("invalid unlock credentials")]
    InvalidUnlockCredentials,

    /// Storage failure while reading or writing key records.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Key algorithms the wallet can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    /// Ed25519 signing key (32-byte seed).
    Ed25519,
    /// BLS12-381 G2 key for BBS+ set signatures (32-byte secret scalar).
    Bls12381G2,
}

/// The signing-oracle contract the wallet consumes.
pub trait Kms: Send + Sync {
    /// Import a private key under the given id, returning the public key
    /// bytes. Replaces any existing key with the same id.
    fn import_key(&self, key_id: &str, key_type: KeyType, secret: &[u8])
        -> Result<Vec<u8>, KmsError>;

    /// The type and public bytes of a stored key.
    fn public_key(&self, key_id: &str) -> Result<(KeyType, Vec<u8>), KmsError>;

    /// Sign a single message. Ed25519 keys only.
    fn sign(&self, key_id: &str, message: &[u8]) -> Result<Vec<u8>, KmsError>;

    /// Sign an ordered message set. BLS12-381 G2 keys only.
    fn sign_multi(&self, key_id: &str, messages: &[Vec<u8>]) -> Result<Vec<u8>, KmsError>;
}

// ---------------------------------------------------------------------------
// Secret locks
// ---------------------------------------------------------------------------

/// Source of the 32-byte master key that seals key material at rest.
pub trait SecretLock: Send + Sync {
    /// Produce the master key.
    fn master_key(&self) -> Result<Zeroizing<[u8; MASTER_KEY_LENGTH]>, KmsError>;
}

/// Secret lock that derives the master key from a passphrase with
/// HKDF-SHA256 over a per-profile salt.
pub struct PassphraseLock {
    passphrase: Zeroizing<String>,
    salt: Vec<u8>,
}

impl PassphraseLock {
    /// Build a lock from a passphrase and the profile's salt.
    pub fn new(passphrase: &str, salt: &[u8]) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase.to_string()),
            salt: salt.to_vec(),
        }
    }
}

impl SecretLock for PassphraseLock {
    fn master_key(&self) -> Result<Zeroizing<[u8; MASTER_KEY_LENGTH]>, KmsError> {
        let hkdf = Hkdf::<Sha256>::new(Some(&self.salt), self.passphrase.as_bytes());
        let mut okm = Zeroizing::new([0u8; MASTER_KEY_LENGTH]);
        hkdf.expand(MASTER_KEY_INFO, &mut okm[..])
            .map_err(|_| KmsError::InvalidUnlockCredentials)?;
        Ok(okm)
    }
}

/// Fingerprint of a master key, stored in the profile so a wrong passphrase
/// fails at unlock time instead of producing garbage decrypts later. The
/// fingerprint reveals nothing useful about the key itself.
pub fn master_key_check(master_key: &[u8; MASTER_KEY_LENGTH]) -> String {
    hex::encode(Sha256::digest(master_key))
}

// ---------------------------------------------------------------------------
// LocalKms
// ---------------------------------------------------------------------------

/// Persisted record for one sealed key.
#[derive(Serialize, Deserialize)]
struct KeyRecord {
    key_type: KeyType,
    public_key: String,
    sealed_secret: String,
}

/// In-process KMS over the wallet's storage provider. Keys live under
/// `key:<userID>:<keyID>`, sealed with the session master key.
pub struct LocalKms {
    store: Arc<dyn Store>,
    user_id: String,
    master_key: Zeroizing<[u8; MASTER_KEY_LENGTH]>,
}

impl LocalKms {
    /// Open a KMS view for one user with an unlocked master key.
    pub fn new(
        store: Arc<dyn Store>,
        user_id: &str,
        master_key: Zeroizing<[u8; MASTER_KEY_LENGTH]>,
    ) -> Self {
        Self {
            store,
            user_id: user_id.to_string(),
            master_key,
        }
    }

    fn record_key(&self, key_id: &str) -> String {
        format!("{KMS_KEY_PREFIX}{}:{key_id}", self.user_id)
    }

    fn load_record(&self, key_id: &str) -> Result<KeyRecord, KmsError> {
        let bytes = self
            .store
            .get(&self.record_key(key_id))?
            .ok_or_else(|| KmsError::UnknownKey(key_id.to_string()))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| KmsError::InvalidKeyMaterial(format!("corrupt key record: {e}")))
    }

    fn unseal_secret(&self, record: &KeyRecord) -> Result<Zeroizing<Vec<u8>>, KmsError> {
        let sealed = hex::decode(&record.sealed_secret).map_err(|_| KmsError::UnsealFailed)?;
        Ok(Zeroizing::new(unseal(&self.master_key, &sealed)?))
    }
}

impl Kms for LocalKms {
    fn import_key(
        &self,
        key_id: &str,
        key_type: KeyType,
        secret: &[u8],
    ) -> Result<Vec<u8>, KmsError> {
        let public_key = derive_public_key(key_type, secret)?;
        let sealed = seal(&self.master_key, secret)?;

        let record = KeyRecord {
            key_type,
            public_key: hex::encode(&public_key),
            sealed_secret: hex::encode(sealed),
        };
        let bytes = serde_json::to_vec(&record)
            .map_err(|e| KmsError::InvalidKeyMaterial(e.to_string()))?;
        self.store.put(&self.record_key(key_id), &bytes)?;

        tracing::debug!(user = %self.user_id, key = %key_id, ?key_type, "imported key");
        Ok(public_key)
    }

    fn public_key(&self, key_id: &str) -> Result<(KeyType, Vec<u8>), KmsError> {
        let record = self.load_record(key_id)?;
        let bytes = hex::decode(&record.public_key)
            .map_err(|e| KmsError::InvalidKeyMaterial(format!("corrupt public key: {e}")))?;
        Ok((record.key_type, bytes))
    }

    fn sign(&self, key_id: &str, message: &[u8]) -> Result<Vec<u8>, KmsError> {
        let record = self.load_record(key_id)?;
        if record.key_type != KeyType::Ed25519 {
            return Err(KmsError::KeyTypeMismatch(format!(
                "key '{key_id}' is {:?}, single-message signing needs Ed25519",
                record.key_type
            )));
        }

        let secret = self.unseal_secret(&record)?;
        let seed: [u8; 32] = secret
            .as_slice()
            .try_into()
            .map_err(|_| KmsError::InvalidKeyMaterial("Ed25519 seed must be 32 bytes".into()))?;
        let signing_key = SigningKey::from_bytes(&seed);
        Ok(signing_key.sign(message).to_bytes().to_vec())
    }

    fn sign_multi(&self, key_id: &str, messages: &[Vec<u8>]) -> Result<Vec<u8>, KmsError> {
        let record = self.load_record(key_id)?;
        if record.key_type != KeyType::Bls12381G2 {
            return Err(KmsError::KeyTypeMismatch(format!(
                "key '{key_id}' is {:?}, set signing needs Bls12381G2",
                record.key_type
            )));
        }

        let secret = self.unseal_secret(&record)?;
        let sk = SecretKey::try_from(secret.as_slice())
            .map_err(|e| KmsError::InvalidKeyMaterial(format!("bad BLS secret: {e}")))?;
        let (dpk, sk) = Issuer::new_short_keys(Some(KeyGenOption::FromSecretKey(sk)));

        let hashed: Vec<SignatureMessage> = messages
            .iter()
            .map(|m| SignatureMessage::hash(m))
            .collect();
        let pk = dpk
            .to_public_key(hashed.len())
            .map_err(|e| KmsError::SigningFailed(format!("public key expansion: {e}")))?;
        let signature = Signature::new(&hashed, &sk, &pk)
            .map_err(|e| KmsError::SigningFailed(e.to_string()))?;
        Ok(signature.to_bytes_compressed_form().to_vec())
    }
}

// ---------------------------------------------------------------------------
// Key material helpers
// ---------------------------------------------------------------------------

/// Compute the public key for imported secret bytes.
pub fn derive_public_key(key_type: KeyType, secret: &[u8]) -> Result<Vec<u8>, KmsError> {
    match key_type {
        KeyType::Ed25519 => {
            let seed: [u8; 32] = secret.try_into().map_err(|_| {
                KmsError::InvalidKeyMaterial("Ed25519 seed must be 32 bytes".into())
            })?;
            let signing_key = SigningKey::from_bytes(&seed);
            Ok(signing_key.verifying_key().to_bytes().to_vec())
        }
        KeyType::Bls12381G2 => {
            let sk = SecretKey::try_from(secret)
                .map_err(|e| KmsError::InvalidKeyMaterial(format!("bad BLS secret: {e}")))?;
            let (dpk, _) = Issuer::new_short_keys(Some(KeyGenOption::FromSecretKey(sk)));
            Ok(dpk.to_bytes_compressed_form().to_vec())
        }
    }
}

/// Generate a fresh keypair of the given type, returning `(secret, public)`.
/// Used by embedders provisioning wallets; the wallet itself only imports.
pub fn generate_key(key_type: KeyType) -> (Zeroizing<Vec<u8>>, Vec<u8>) {
    match key_type {
        KeyType::Ed25519 => {
            let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
            (
                Zeroizing::new(signing_key.to_bytes().to_vec()),
                signing_key.verifying_key().to_bytes().to_vec(),
            )
        }
        KeyType::Bls12381G2 => {
            let (dpk, sk) = Issuer::new_short_keys(None);
            (
                Zeroizing::new(sk.to_bytes_compressed_form().to_vec()),
                dpk.to_bytes_compressed_form().to_vec(),
            )
        }
    }
}

/// Expand a compressed BLS public key for a given message count.
pub(crate) fn expand_bls_public_key(
    public_key: &[u8],
    message_count: usize,
) -> Result<bbs::prelude::PublicKey, KmsError> {
    let dpk = DeterministicPublicKey::try_from(public_key)
        .map_err(|e| KmsError::InvalidKeyMaterial(format!("bad BLS public key: {e}")))?;
    dpk.to_public_key(message_count)
        .map_err(|e| KmsError::InvalidKeyMaterial(format!("public key expansion: {e}")))
}

// ---------------------------------------------------------------------------
// Sealing
// ---------------------------------------------------------------------------

fn seal(key: &[u8; MASTER_KEY_LENGTH], plaintext: &[u8]) -> Result<Vec<u8>, KmsError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| KmsError::SealFailed)?;

    let mut nonce_bytes = [0u8; AES_NONCE_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| KmsError::SealFailed)?;

    let mut out = Vec::with_capacity(AES_NONCE_LENGTH + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

fn unseal(key: &[u8; MASTER_KEY_LENGTH], sealed: &[u8]) -> Result<Vec<u8>, KmsError> {
    if sealed.len() < AES_NONCE_LENGTH {
        return Err(KmsError::UnsealFailed);
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(AES_NONCE_LENGTH);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| KmsError::UnsealFailed)?;
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| KmsError::UnsealFailed)
}
