//! Prelude module - commonly used types for convenient import.
//!
//! Use `use despacho_storage::prelude::*;` to import all essential types.

pub use crate::{KvStore, KvWrite, MemoryKvStore, ScopedKvStore};
pub use crate::{StorageError, StorageResult};

#[cfg(feature = "kv")]
pub use crate::SurrealKvStore;
