//! Namespaced key-value trait and the in-memory backend.
//!
//! Every key lives in a namespace. Keys are plain UTF-8 strings; callers that
//! need ordering (revision numbers, for instance) zero-pad them so that byte
//! order and numeric order agree. Backends must return
//! [`list_keys`](KvStore::list_keys) results in ascending byte order and must
//! apply a [`write_batch`](KvStore::write_batch) atomically.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Namespaces must be non-empty and free of the null byte, which separates
/// namespace from key in backends that flatten them.
pub(crate) fn validate_namespace(namespace: &str) -> StorageResult<()> {
    if namespace.is_empty() {
        return Err(StorageError::InvalidKey(
            "namespace must not be empty".into(),
        ));
    }
    if namespace.contains('\0') {
        return Err(StorageError::InvalidKey(
            "namespace must not contain null bytes".into(),
        ));
    }
    Ok(())
}

/// Keys follow the same rules as namespaces.
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key must not be empty".into()));
    }
    if key.contains('\0') {
        return Err(StorageError::InvalidKey(
            "key must not contain null bytes".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A single write inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvWrite {
    /// Key within the batch's namespace.
    pub key: String,
    /// Value to store, replacing any existing one.
    pub value: Vec<u8>,
}

impl KvWrite {
    /// Create a write.
    #[must_use]
    pub fn new(key: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Namespaced byte-level storage.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get a value. Returns `None` if the key does not exist.
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Apply every write in `writes`, or none of them.
    async fn write_batch(&self, namespace: &str, writes: Vec<KvWrite>) -> StorageResult<()>;

    /// List keys in `namespace` starting with `prefix`, in ascending order.
    ///
    /// An empty prefix lists the whole namespace.
    async fn list_keys(&self, namespace: &str, prefix: &str) -> StorageResult<Vec<String>>;

    /// Store a single value, overwriting any existing one.
    async fn put(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        self.write_batch(namespace, vec![KvWrite::new(key, value)])
            .await
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// In-memory store for tests and ephemeral sessions.
///
/// Entries are kept in a `BTreeMap` ordered by `(namespace, key)`, which
/// gives prefix listing in key order for free.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    data: RwLock<BTreeMap<(String, String), Vec<u8>>>,
}

impl MemoryKvStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(data
            .get(&(namespace.to_string(), key.to_string()))
            .cloned())
    }

    async fn write_batch(&self, namespace: &str, writes: Vec<KvWrite>) -> StorageResult<()> {
        validate_namespace(namespace)?;
        // Validate everything before touching the map so a bad key leaves
        // no partial batch behind.
        for write in &writes {
            validate_key(&write.key)?;
        }
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        for write in writes {
            data.insert((namespace.to_string(), write.key), write.value);
        }
        Ok(())
    }

    async fn list_keys(&self, namespace: &str, prefix: &str) -> StorageResult<Vec<String>> {
        validate_namespace(namespace)?;
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        let start = (namespace.to_string(), prefix.to_string());
        Ok(data
            .range(start..)
            .map(|((ns, key), _)| (ns, key))
            .take_while(|(ns, key)| ns.as_str() == namespace && key.starts_with(prefix))
            .map(|(_, key)| key.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_put_get() {
        let store = MemoryKvStore::new();
        store.put("drafts", "a", b"1".to_vec()).await.unwrap();
        assert_eq!(store.get("drafts", "a").await.unwrap(), Some(b"1".to_vec()));
        assert!(store.get("drafts", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_overwrite() {
        let store = MemoryKvStore::new();
        store.put("drafts", "k", b"v1".to_vec()).await.unwrap();
        store.put("drafts", "k", b"v2".to_vec()).await.unwrap();
        assert_eq!(store.get("drafts", "k").await.unwrap(), Some(b"v2".to_vec()));
    }

    #[tokio::test]
    async fn test_memory_namespace_isolation() {
        let store = MemoryKvStore::new();
        store.put("a", "k", b"from-a".to_vec()).await.unwrap();
        store.put("b", "k", b"from-b".to_vec()).await.unwrap();
        assert_eq!(store.get("a", "k").await.unwrap(), Some(b"from-a".to_vec()));
        assert_eq!(store.list_keys("b", "").await.unwrap(), vec!["k"]);
    }

    #[tokio::test]
    async fn test_memory_list_keys_prefix_is_ordered() {
        let store = MemoryKvStore::new();
        for key in ["d1/rev/000003", "d1/rev/000001", "d2/rev/000001", "d1/rev/000002", "d1"] {
            store.put("drafts", key, Vec::new()).await.unwrap();
        }
        store.put("other", "d1/rev/000009", Vec::new()).await.unwrap();

        let keys = store.list_keys("drafts", "d1/rev/").await.unwrap();
        assert_eq!(keys, vec!["d1/rev/000001", "d1/rev/000002", "d1/rev/000003"]);
        assert_eq!(store.list_keys("drafts", "").await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_memory_batch_rejects_invalid_key_atomically() {
        let store = MemoryKvStore::new();
        let err = store
            .write_batch(
                "drafts",
                vec![KvWrite::new("good", b"1".to_vec()), KvWrite::new("", b"2".to_vec())],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
        assert!(store.get("drafts", "good").await.unwrap().is_none());
    }

    #[test]
    fn test_validation() {
        assert!(validate_namespace("").is_err());
        assert!(validate_namespace("ns\0bad").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("k\0bad").is_err());
        assert!(validate_key("d1/rev/000001").is_ok());
    }
}
