//! Namespace-bound view with typed JSON access.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StorageResult;
use crate::kv::{KvStore, KvWrite, validate_key, validate_namespace};

/// A [`KvStore`] with its namespace pre-bound.
///
/// Components receive one of these and never handle namespaces themselves:
///
/// ```rust,ignore
/// let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
/// let drafts = ScopedKvStore::new(store, "drafts")?;
/// drafts.put_json("index", &vec!["a", "b"]).await?;
/// ```
#[derive(Clone)]
pub struct ScopedKvStore {
    inner: Arc<dyn KvStore>,
    namespace: String,
}

impl std::fmt::Debug for ScopedKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedKvStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl ScopedKvStore {
    /// Bind `store` to `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`](crate::StorageError::InvalidKey)
    /// if the namespace is empty or contains null bytes.
    pub fn new(store: Arc<dyn KvStore>, namespace: impl Into<String>) -> StorageResult<Self> {
        let namespace = namespace.into();
        validate_namespace(&namespace)?;
        Ok(Self {
            inner: store,
            namespace,
        })
    }

    /// The bound namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// List keys starting with `prefix`, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.inner.list_keys(&self.namespace, prefix).await
    }

    /// Read and decode a JSON value. Returns `None` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`](crate::StorageError::Serialization)
    /// if the stored bytes are not valid JSON for `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        validate_key(key)?;
        let bytes = self.inner.get(&self.namespace, key).await?;
        Ok(bytes
            .map(|b| serde_json::from_slice(&b))
            .transpose()?)
    }

    /// Encode a value as JSON and store it.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the backend write fails.
    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        validate_key(key)?;
        let bytes = serde_json::to_vec(value)?;
        self.inner.put(&self.namespace, key, bytes).await
    }

    /// Start an atomic batch of JSON writes in this namespace.
    #[must_use]
    pub fn batch(&self) -> JsonBatch<'_> {
        JsonBatch {
            store: self,
            writes: Vec::new(),
        }
    }
}

/// Pending JSON writes, applied together by [`commit`](Self::commit).
#[derive(Debug)]
pub struct JsonBatch<'a> {
    store: &'a ScopedKvStore,
    writes: Vec<KvWrite>,
}

impl JsonBatch<'_> {
    /// Queue a JSON-encoded write.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the value cannot be encoded.
    pub fn put_json<T: Serialize>(mut self, key: &str, value: &T) -> StorageResult<Self> {
        validate_key(key)?;
        self.writes
            .push(KvWrite::new(key, serde_json::to_vec(value)?));
        Ok(self)
    }

    /// Number of queued writes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Apply all queued writes atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the batch; nothing is written
    /// in that case.
    pub async fn commit(self) -> StorageResult<()> {
        tracing::trace!(
            namespace = %self.store.namespace,
            writes = self.writes.len(),
            "Committing batch"
        );
        self.store
            .inner
            .write_batch(&self.store.namespace, self.writes)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryKvStore, StorageError};

    #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
    struct Record {
        name: String,
        revision: u32,
    }

    fn scoped(ns: &str) -> ScopedKvStore {
        ScopedKvStore::new(Arc::new(MemoryKvStore::new()), ns).unwrap()
    }

    #[tokio::test]
    async fn test_json_put_get() {
        let store = scoped("drafts");
        let record = Record {
            name: "meeting".into(),
            revision: 2,
        };
        store.put_json("r", &record).await.unwrap();
        let loaded: Record = store.get_json("r").await.unwrap().unwrap();
        assert_eq!(loaded, record);

        let missing: Option<Record> = store.get_json("nope").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_scopes_share_backend_but_not_keys() {
        let backend: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let a = ScopedKvStore::new(Arc::clone(&backend), "a").unwrap();
        let b = ScopedKvStore::new(Arc::clone(&backend), "b").unwrap();
        a.put_json("k", &1u32).await.unwrap();
        assert!(b.get_json::<u32>("k").await.unwrap().is_none());
        assert_eq!(a.list_keys("").await.unwrap(), vec!["k"]);
    }

    #[tokio::test]
    async fn test_batch_commits_all_writes() {
        let store = scoped("drafts");
        let batch = store
            .batch()
            .put_json("d/rev/000001", &"first")
            .unwrap()
            .put_json("d", &"pointer")
            .unwrap();
        assert_eq!(batch.len(), 2);
        batch.commit().await.unwrap();

        assert_eq!(store.list_keys("d").await.unwrap(), vec!["d", "d/rev/000001"]);
    }

    #[tokio::test]
    async fn test_corrupt_value_is_serialization_error() {
        let backend: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        backend.put("drafts", "bad", b"not json".to_vec()).await.unwrap();
        let store = ScopedKvStore::new(backend, "drafts").unwrap();
        let err = store.get_json::<Record>("bad").await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn test_rejects_empty_namespace() {
        assert!(ScopedKvStore::new(Arc::new(MemoryKvStore::new()), "").is_err());
    }
}
