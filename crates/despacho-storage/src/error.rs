//! Storage error types.

/// Errors raised by a key-value backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend could not be opened.
    #[error("storage connection error: {0}")]
    Connection(String),

    /// A read, write, or commit failed inside the backend.
    #[error("storage internal error: {0}")]
    Internal(String),

    /// A stored value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A namespace, key, or prefix is not acceptable.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
