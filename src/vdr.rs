//! # Content-backed VDR
//!
//! DID resolution with wallet-local precedence: a DID that the user has
//! explicitly stored (as a `DidResolutionResponse` content entry) resolves
//! from the wallet without touching the network; everything else delegates
//! to the injected resolver. This is a two-level lookup, not a cache —
//! entries appear and disappear only through explicit `add`/`remove` of
//! wallet content, never through eviction.
//!
//! The [`KeyFetcher`] rides on top: given a DID and a key id it resolves
//! the document and walks its verification methods, handing back the raw
//! key bytes plus the declared key type. Suites use it to verify without
//! ever caring where the document came from.

use std::sync::Arc;

use crate::content::{ContentStore, ContentType};
use crate::did::{split_did_url, DidResolution, DidResolver};
use crate::error::{Result, WalletError};

/// Resolver that prefers wallet-stored resolution responses and falls back
/// to the injected VDR.
#[derive(Clone)]
pub struct ContentVdr {
    resolver: Arc<dyn DidResolver>,
    contents: ContentStore,
}

impl ContentVdr {
    /// Wrap an external resolver with wallet-content precedence.
    pub fn new(resolver: Arc<dyn DidResolver>, contents: ContentStore) -> Self {
        Self { resolver, contents }
    }

    /// A fetcher view over this resolver.
    pub fn key_fetcher(&self) -> KeyFetcher {
        KeyFetcher { vdr: self.clone() }
    }
}

impl DidResolver for ContentVdr {
    fn resolve(&self, did: &str) -> Result<DidResolution> {
        match self.contents.get(ContentType::DidResolutionResponse, did) {
            Ok(blob) => {
                tracing::debug!(%did, "resolved DID from wallet contents");
                let resolution: DidResolution = serde_json::from_slice(&blob).map_err(|e| {
                    WalletError::DidNotResolvable(format!(
                        "stored resolution response for '{did}' is malformed: {e}"
                    ))
                })?;
                Ok(resolution)
            }
            Err(WalletError::NotFound(_)) => self.resolver.resolve(did),
            Err(other) => Err(other),
        }
    }
}

/// Public key material pulled from a DID document.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicKeyMaterial {
    /// The verification method's declared type, e.g.
    /// `Ed25519VerificationKey2018`.
    pub key_type: String,
    /// Raw public key bytes.
    pub bytes: Vec<u8>,
}

/// Resolver-backed public key lookup.
#[derive(Clone)]
pub struct KeyFetcher {
    vdr: ContentVdr,
}

impl KeyFetcher {
    /// Fetch the key behind `(did, key_id)`. The key id may be a bare
    /// fragment or the full DID URL.
    pub fn fetch(&self, did: &str, key_id: &str) -> Result<PublicKeyMaterial> {
        let resolution = self.vdr.resolve(did)?;
        let document = &resolution.did_document;

        let wanted_fragment = split_did_url(key_id).1.unwrap_or(key_id);
        let method = document
            .verification_method
            .iter()
            .find(|vm| {
                vm.id == key_id || split_did_url(&vm.id).1 == Some(wanted_fragment)
            })
            .or_else(|| document.find_method(key_id))
            .ok_or_else(|| {
                WalletError::KeyNotFound(format!("'{key_id}' in DID document for '{did}'"))
            })?;

        Ok(PublicKeyMaterial {
            key_type: method.method_type.clone(),
            bytes: method.public_key_bytes()?,
        })
    }

    /// Fetch the key behind a full verification-method URL
    /// (`did:...#fragment`).
    pub fn fetch_for_method(&self, verification_method: &str) -> Result<PublicKeyMaterial> {
        let (did, _) = split_did_url(verification_method);
        self.fetch(did, verification_method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::did::{key_did_document, DidKeyType, StaticDidResolver};
    use crate::profile::{KmsConfig, ProfileStore};
    use crate::session::{self, UnlockOptions};
    use crate::storage::{MemoryStorage, StorageProvider};

    fn vdr_fixture(user: &str) -> (ContentVdr, String) {
        let storage = Arc::new(MemoryStorage::new());
        let store = storage.open_store("wallet").unwrap();

        let profiles = ProfileStore::new(store.clone());
        let profile = profiles.create(user, &KmsConfig::Passphrase("pw")).unwrap();
        let token = session::registry()
            .create_key_manager(
                &profile,
                storage.clone(),
                &UnlockOptions::new().with_passphrase("pw"),
            )
            .unwrap();

        let resolver = Arc::new(StaticDidResolver::new());
        resolver.register(key_did_document(
            "did:example:external",
            DidKeyType::Ed25519,
            &[3u8; 32],
        ));

        let contents = ContentStore::new(store, user);
        (ContentVdr::new(resolver, contents), token)
    }

    #[test]
    fn stored_resolution_response_wins() {
        let (vdr, token) = vdr_fixture("vdr-user-1");

        let doc = key_did_document("did:example:stored", DidKeyType::Ed25519, &[5u8; 32]);
        let blob = serde_json::to_vec(&DidResolution { did_document: doc }).unwrap();
        vdr.contents
            .save(&token, ContentType::DidResolutionResponse, &blob)
            .unwrap();

        let resolution = vdr.resolve("did:example:stored").unwrap();
        assert_eq!(resolution.did_document.id, "did:example:stored");
    }

    #[test]
    fn miss_delegates_to_external_resolver() {
        let (vdr, _token) = vdr_fixture("vdr-user-2");
        let resolution = vdr.resolve("did:example:external").unwrap();
        assert_eq!(resolution.did_document.id, "did:example:external");
    }

    #[test]
    fn unknown_did_is_not_resolvable() {
        let (vdr, _token) = vdr_fixture("vdr-user-3");
        assert!(matches!(
            vdr.resolve("did:example:nowhere"),
            Err(WalletError::DidNotResolvable(_))
        ));
    }

    #[test]
    fn fetcher_returns_key_type_and_bytes() {
        let (vdr, _token) = vdr_fixture("vdr-user-4");
        let material = vdr
            .key_fetcher()
            .fetch("did:example:external", "did:example:external#key-1")
            .unwrap();
        assert_eq!(material.key_type, "Ed25519VerificationKey2018");
        assert_eq!(material.bytes, vec![3u8; 32]);
    }

    #[test]
    fn fetcher_accepts_bare_fragment() {
        let (vdr, _token) = vdr_fixture("vdr-user-5");
        let material = vdr.key_fetcher().fetch("did:example:external", "key-1").unwrap();
        assert_eq!(material.bytes, vec![3u8; 32]);
    }

    #[test]
    fn missing_key_reports_key_not_found() {
        let (vdr, _token) = vdr_fixture("vdr-user-6");
        assert!(matches!(
            vdr.key_fetcher().fetch("did:example:external", "key-99"),
            Err(WalletError::KeyNotFound(_))
        ));
    }
}
