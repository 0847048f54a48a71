//! Durable backend on top of `SurrealKV`.
//!
//! Namespaces and keys are flattened into a single byte key
//! `"{namespace}\0{key}"`. Since `\x01` is the byte right after the
//! separator, `["{namespace}\0{prefix}", "{namespace}\x01")` covers every key
//! of a namespace that can start with `prefix`.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::kv::{KvStore, KvWrite, validate_key, validate_namespace};

fn composite_key(namespace: &str, key: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(namespace.len().saturating_add(key.len()).saturating_add(1));
    buf.extend_from_slice(namespace.as_bytes());
    buf.push(0);
    buf.extend_from_slice(key.as_bytes());
    buf
}

fn namespace_end(namespace: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(namespace.len().saturating_add(1));
    buf.extend_from_slice(namespace.as_bytes());
    buf.push(1);
    buf
}

fn map_kv_err(e: &surrealkv::Error) -> StorageError {
    StorageError::Internal(e.to_string())
}

/// Persistent, transactional key-value store.
///
/// ```rust,ignore
/// use despacho_storage::{KvStore, SurrealKvStore};
///
/// let store = SurrealKvStore::open("./data/drafts")?;
/// store.put("drafts", "index", b"{}".to_vec()).await?;
/// ```
pub struct SurrealKvStore {
    tree: surrealkv::Tree,
}

impl std::fmt::Debug for SurrealKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurrealKvStore").finish_non_exhaustive()
    }
}

impl SurrealKvStore {
    /// Open (or create) a store in the given directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the store cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let tree = surrealkv::TreeBuilder::new()
            .with_path(path.to_path_buf())
            .build()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        debug!(path = %path.display(), "Opened SurrealKV store");
        Ok(Self { tree })
    }

    /// Flush pending writes and close the store.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Internal`] if the flush fails.
    pub async fn close(&self) -> StorageResult<()> {
        self.tree
            .close()
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))
    }
}

#[async_trait]
impl KvStore for SurrealKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let tx = self
            .tree
            .begin_with_mode(surrealkv::Mode::ReadOnly)
            .map_err(|ref e| map_kv_err(e))?;
        tx.get(&composite_key(namespace, key))
            .map_err(|ref e| map_kv_err(e))
    }

    async fn write_batch(&self, namespace: &str, writes: Vec<KvWrite>) -> StorageResult<()> {
        validate_namespace(namespace)?;
        for write in &writes {
            validate_key(&write.key)?;
        }
        if writes.is_empty() {
            return Ok(());
        }
        let mut tx = self.tree.begin().map_err(|ref e| map_kv_err(e))?;
        for write in &writes {
            tx.set(&composite_key(namespace, &write.key), &write.value)
                .map_err(|ref e| map_kv_err(e))?;
        }
        tx.commit().await.map_err(|ref e| map_kv_err(e))
    }

    async fn list_keys(&self, namespace: &str, prefix: &str) -> StorageResult<Vec<String>> {
        validate_namespace(namespace)?;
        let start = composite_key(namespace, prefix);
        let end = namespace_end(namespace);
        let skip = namespace.len().saturating_add(1);

        let tx = self
            .tree
            .begin_with_mode(surrealkv::Mode::ReadOnly)
            .map_err(|ref e| map_kv_err(e))?;
        let mut iter = tx.range(&start, &end).map_err(|ref e| map_kv_err(e))?;
        iter.seek_first().map_err(|ref e| map_kv_err(e))?;

        let mut keys = Vec::new();
        while iter.valid() {
            let raw = iter.key();
            let Some(tail) = raw.get(skip..) else {
                break;
            };
            // Range is ordered, so the first key past the prefix ends the scan.
            if !tail.starts_with(prefix.as_bytes()) {
                break;
            }
            if let Ok(key) = std::str::from_utf8(tail) {
                keys.push(key.to_string());
            }
            iter.next().map_err(|ref e| map_kv_err(e))?;
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> (SurrealKvStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SurrealKvStore::open(dir.path()).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_surreal_put_get() {
        let (store, _dir) = make_store();
        store.put("drafts", "a", b"1".to_vec()).await.unwrap();
        assert_eq!(store.get("drafts", "a").await.unwrap(), Some(b"1".to_vec()));
        assert!(store.get("drafts", "b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_surreal_batch_and_prefix_listing() {
        let (store, _dir) = make_store();
        store
            .write_batch(
                "drafts",
                vec![
                    KvWrite::new("d1", b"record".to_vec()),
                    KvWrite::new("d1/rev/000002", b"r2".to_vec()),
                    KvWrite::new("d1/rev/000001", b"r1".to_vec()),
                    KvWrite::new("d2/rev/000001", b"x".to_vec()),
                ],
            )
            .await
            .unwrap();
        store.put("sessions", "d1/rev/000003", Vec::new()).await.unwrap();

        let keys = store.list_keys("drafts", "d1/rev/").await.unwrap();
        assert_eq!(keys, vec!["d1/rev/000001", "d1/rev/000002"]);
        assert_eq!(store.list_keys("drafts", "").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_surreal_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SurrealKvStore::open(dir.path()).unwrap();
            store.put("drafts", "k", b"kept".to_vec()).await.unwrap();
            store.close().await.unwrap();
        }
        let store = SurrealKvStore::open(dir.path()).unwrap();
        assert_eq!(store.get("drafts", "k").await.unwrap(), Some(b"kept".to_vec()));
    }
}
