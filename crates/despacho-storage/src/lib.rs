//! Despacho Storage - namespaced key-value persistence.
//!
//! The draft store persists records and revisions through the [`KvStore`]
//! trait. Two backends ship:
//!
//! - [`MemoryKvStore`] (always available) for tests and ephemeral sessions
//! - `SurrealKvStore` (feature `kv`) for drafts that must survive restarts
//!
//! Consumers normally hold a [`ScopedKvStore`], which pins a namespace and
//! speaks JSON.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod error;
pub mod kv;
pub mod scoped;
#[cfg(feature = "kv")]
pub mod surreal;

pub use error::{StorageError, StorageResult};
pub use kv::{KvStore, KvWrite, MemoryKvStore};
pub use scoped::{JsonBatch, ScopedKvStore};
#[cfg(feature = "kv")]
pub use surreal::SurrealKvStore;
