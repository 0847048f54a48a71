//! Decision layer error types.

use thiserror::Error;

/// Errors raised by a decision layer.
#[derive(Debug, Error)]
pub enum LlmError {
    /// API key not configured for a remote endpoint.
    #[error("API key not configured for {provider}")]
    ApiKeyNotConfigured {
        /// Provider name.
        provider: String,
    },

    /// The request could not be sent.
    #[error("API request failed: {0}")]
    ApiRequestFailed(String),

    /// The model answered with something unusable.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// A tool call carried arguments that do not form a payload.
    #[error("Invalid arguments for tool {tool}: {message}")]
    InvalidToolArguments {
        /// Tool name.
        tool: String,
        /// What was wrong.
        message: String,
    },

    /// HTTP error.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Result type for decision layer operations.
pub type LlmResult<T> = Result<T, LlmError>;
