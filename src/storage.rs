//! # Storage Provider Contract
//!
//! The wallet never talks to a database directly — it talks to a
//! [`StorageProvider`] that hands out named [`Store`] handles. A store is a
//! flat byte-keyed namespace with four operations: put, get, delete, and a
//! prefix scan. That is the entire contract; consistency beyond single-key
//! atomicity is the provider's business, and the wallet deliberately takes
//! no locks around storage calls.
//!
//! Two implementations ship in-crate:
//!
//! - [`SledStorage`] — the production default, one sled tree per store.
//!   sled gives lock-free concurrent reads and serialized writes, so a
//!   provider can be shared across threads behind an `Arc` without any
//!   external synchronization.
//! - [`MemoryStorage`] — a `RwLock<HashMap>` per store. No filesystem side
//!   effects; ideal for tests.
//!
//! Key layouts used by the wallet live in [`crate::config`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

/// Errors raised by storage providers.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing engine failed (I/O, corruption, tree unavailable).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Hands out named stores. `open_store` with the same name must return a
/// handle over the same underlying namespace for the provider's lifetime.
pub trait StorageProvider: Send + Sync {
    /// Open (creating if needed) the store with the given name.
    fn open_store(&self, name: &str) -> Result<Arc<dyn Store>, StorageError>;
}

/// A flat key-value namespace.
pub trait Store: Send + Sync {
    /// Write a value under a key, replacing any existing value.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Read the value stored under a key, if any.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Delete a key. Deleting an absent key is a no-op.
    fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// All `(key, value)` pairs whose key starts with `prefix`, in key order.
    fn iterate_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError>;
}

// ---------------------------------------------------------------------------
// Sled-backed provider
// ---------------------------------------------------------------------------

/// Persistent storage provider over a sled database. Each named store maps
/// to a sled tree, so stores are isolated keyspaces inside one file.
#[derive(Debug, Clone)]
pub struct SledStorage {
    db: sled::Db,
}

impl SledStorage {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        Ok(Self {
            db: sled::open(path)?,
        })
    }

    /// A temporary database that lives in memory and disappears on drop.
    /// Useful for tests that want the sled code path without a tempdir.
    pub fn open_temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }
}

impl StorageProvider for SledStorage {
    fn open_store(&self, name: &str) -> Result<Arc<dyn Store>, StorageError> {
        let tree = self.db.open_tree(name)?;
        Ok(Arc::new(SledStore { tree }))
    }
}

struct SledStore {
    tree: sled::Tree,
}

impl Store for SledStore {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.tree.insert(key.as_bytes(), value)?;
        self.tree.flush()?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.tree.get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.tree.remove(key.as_bytes())?;
        self.tree.flush()?;
        Ok(())
    }

    fn iterate_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
        let mut entries = Vec::new();
        for item in self.tree.scan_prefix(prefix.as_bytes()) {
            let (key, value) = item?;
            let key = String::from_utf8_lossy(&key).into_owned();
            entries.push((key, value.to_vec()));
        }
        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// In-memory provider
// ---------------------------------------------------------------------------

/// Volatile storage provider backed by hash maps. Thread-safe, zero setup.
#[derive(Default)]
pub struct MemoryStorage {
    stores: RwLock<HashMap<String, Arc<MemoryStore>>>,
}

impl MemoryStorage {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageProvider for MemoryStorage {
    fn open_store(&self, name: &str) -> Result<Arc<dyn Store>, StorageError> {
        let mut stores = self.stores.write();
        let store = stores
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryStore::default()))
            .clone();
        Ok(store)
    }
}

#[derive(Default)]
struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl Store for MemoryStore {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn iterate_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
        let entries = self.entries.read();
        let mut matched: Vec<(String, Vec<u8>)> = entries
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        matched.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(provider: &dyn StorageProvider) {
        let store = provider.open_store("test").unwrap();

        assert!(store.get("k1").unwrap().is_none());
        store.put("k1", b"v1").unwrap();
        assert_eq!(store.get("k1").unwrap(), Some(b"v1".to_vec()));

        // Overwrite is last-writer-wins.
        store.put("k1", b"v2").unwrap();
        assert_eq!(store.get("k1").unwrap(), Some(b"v2".to_vec()));

        store.delete("k1").unwrap();
        assert!(store.get("k1").unwrap().is_none());

        // Deleting again is a no-op.
        store.delete("k1").unwrap();
    }

    fn prefix_scan(provider: &dyn StorageProvider) {
        let store = provider.open_store("scan").unwrap();
        store.put("content:alice:credential:c1", b"1").unwrap();
        store.put("content:alice:credential:c2", b"2").unwrap();
        store.put("content:alice:metadata:m1", b"3").unwrap();
        store.put("content:bob:credential:c9", b"4").unwrap();

        let hits = store.iterate_prefix("content:alice:credential:").unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, "content:alice:credential:c1");
        assert_eq!(hits[1].0, "content:alice:credential:c2");
    }

    #[test]
    fn memory_store_roundtrip() {
        roundtrip(&MemoryStorage::new());
    }

    #[test]
    fn memory_store_prefix_scan() {
        prefix_scan(&MemoryStorage::new());
    }

    #[test]
    fn sled_store_roundtrip() {
        roundtrip(&SledStorage::open_temporary().unwrap());
    }

    #[test]
    fn sled_store_prefix_scan() {
        prefix_scan(&SledStorage::open_temporary().unwrap());
    }

    #[test]
    fn sled_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let provider = SledStorage::open(dir.path()).unwrap();
            let store = provider.open_store("wallet").unwrap();
            store.put("profile:alice", b"{}").unwrap();
        }
        let provider = SledStorage::open(dir.path()).unwrap();
        let store = provider.open_store("wallet").unwrap();
        assert_eq!(store.get("profile:alice").unwrap(), Some(b"{}".to_vec()));
    }

    #[test]
    fn stores_are_isolated_namespaces() {
        let provider = MemoryStorage::new();
        let a = provider.open_store("a").unwrap();
        let b = provider.open_store("b").unwrap();
        a.put("k", b"from-a").unwrap();
        assert!(b.get("k").unwrap().is_none());
    }

    #[test]
    fn same_name_returns_same_namespace() {
        let provider = MemoryStorage::new();
        let first = provider.open_store("shared").unwrap();
        first.put("k", b"v").unwrap();
        let second = provider.open_store("shared").unwrap();
        assert_eq!(second.get("k").unwrap(), Some(b"v".to_vec()));
    }
}
