//! Configuration types for the Despacho runtime.
//!
//! This crate does not depend on the other despacho crates. Sections carry
//! plain strings and numbers; the CLI converts them into domain types at
//! startup. Every struct implements [`Default`] so that a bare `[section]`
//! header in TOML produces a working configuration.

use std::path::PathBuf;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration for Despacho.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Decision-layer model endpoint and sampling.
    pub model: ModelSection,
    /// Draft persistence backend.
    pub storage: StorageSection,
    /// Action delivery backends.
    pub executor: ExecutorSection,
    /// Extra vocabulary for the confirmation detector.
    pub confirmation: ConfirmationSection,
    /// Per-session conversation limits.
    pub sessions: SessionsSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// ModelSection
// ---------------------------------------------------------------------------

/// Chat-completions endpoint used by the tool-calling decision layer.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    /// Provider identifier. Only `"openai-compat"` is supported.
    pub provider: String,
    /// Full chat-completions URL.
    pub api_url: String,
    /// API key. Prefer `OPENAI_API_KEY` over storing this in a file.
    pub api_key: Option<String>,
    /// Model name sent to the provider.
    pub model: String,
    /// Maximum tokens to request per completion.
    pub max_tokens: usize,
    /// Sampling temperature.
    pub temperature: f64,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            provider: "openai-compat".to_owned(),
            api_url: "https://api.openai.com/v1/chat/completions".to_owned(),
            api_key: None,
            model: "gpt-4o-mini".to_owned(),
            max_tokens: 2048,
            temperature: 0.2,
            timeout_secs: 60,
        }
    }
}

impl std::fmt::Debug for ModelSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSection")
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("has_api_key", &self.api_key.is_some())
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Serialize for ModelSection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ModelSection", 6)?;
        state.serialize_field("provider", &self.provider)?;
        state.serialize_field("api_url", &self.api_url)?;
        // api_key is never written out.
        state.serialize_field("model", &self.model)?;
        state.serialize_field("max_tokens", &self.max_tokens)?;
        state.serialize_field("temperature", &self.temperature)?;
        state.serialize_field("timeout_secs", &self.timeout_secs)?;
        state.end()
    }
}

// ---------------------------------------------------------------------------
// StorageSection
// ---------------------------------------------------------------------------

/// Draft persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// `"memory"` (lost on exit) or `"surrealkv"` (durable).
    pub backend: String,
    /// Directory for the durable backend. Defaults to `~/.despacho/drafts`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: "memory".to_owned(),
            path: None,
        }
    }
}

impl StorageSection {
    /// Whether drafts survive a restart.
    #[must_use]
    pub fn is_durable(&self) -> bool {
        self.backend == "surrealkv"
    }

    /// Resolve the on-disk location, falling back to `{home}/.despacho/drafts`.
    #[must_use]
    pub fn resolved_path(&self, home: &std::path::Path) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| home.join(".despacho").join("drafts"))
    }
}

// ---------------------------------------------------------------------------
// ExecutorSection
// ---------------------------------------------------------------------------

/// Delivery backend settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ExecutorSection {
    /// When set, confirmed actions go to an in-process outbox instead of the
    /// network.
    pub dry_run: bool,
    /// Email relay endpoint.
    pub email_relay_url: Option<String>,
    /// Bearer token for the email relay.
    pub email_api_key: Option<String>,
    /// Declaration API endpoint.
    pub declaration_api_url: Option<String>,
    /// Bearer token for the declaration API.
    pub declaration_api_key: Option<String>,
    /// Per-delivery timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            dry_run: true,
            email_relay_url: None,
            email_api_key: None,
            declaration_api_url: None,
            declaration_api_key: None,
            timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for ExecutorSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorSection")
            .field("dry_run", &self.dry_run)
            .field("email_relay_url", &self.email_relay_url)
            .field("has_email_api_key", &self.email_api_key.is_some())
            .field("declaration_api_url", &self.declaration_api_url)
            .field("has_declaration_api_key", &self.declaration_api_key.is_some())
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Serialize for ExecutorSection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ExecutorSection", 4)?;
        state.serialize_field("dry_run", &self.dry_run)?;
        if let Some(url) = &self.email_relay_url {
            state.serialize_field("email_relay_url", url)?;
        } else {
            state.skip_field("email_relay_url")?;
        }
        if let Some(url) = &self.declaration_api_url {
            state.serialize_field("declaration_api_url", url)?;
        } else {
            state.skip_field("declaration_api_url")?;
        }
        state.serialize_field("timeout_secs", &self.timeout_secs)?;
        state.end()
    }
}

// ---------------------------------------------------------------------------
// ConfirmationSection
// ---------------------------------------------------------------------------

/// Phrases added to the built-in confirmation vocabulary.
///
/// The built-in English and Portuguese lists always apply; these extend them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationSection {
    /// Affirmative phrases (`"manda bala"`).
    pub confirm: Vec<String>,
    /// Cancellation phrases.
    pub cancel: Vec<String>,
    /// Phrases asking to regenerate the draft.
    pub revise: Vec<String>,
    /// Politeness words ignored by near-exact confirmation.
    pub filler: Vec<String>,
}

impl ConfirmationSection {
    /// Whether any extra vocabulary is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.confirm.is_empty()
            && self.cancel.is_empty()
            && self.revise.is_empty()
            && self.filler.is_empty()
    }
}

// ---------------------------------------------------------------------------
// SessionsSection
// ---------------------------------------------------------------------------

/// Per-session conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsSection {
    /// Messages kept per session and passed to the decision layer.
    pub history_limit: usize,
}

impl Default for SessionsSection {
    fn default() -> Self {
        Self { history_limit: 40 }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["despacho_runtime=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_sections_use_defaults() {
        let config: Config = toml::from_str("[model]\n[sessions]\n").unwrap();
        assert_eq!(config.model.provider, "openai-compat");
        assert_eq!(config.sessions.history_limit, 40);
        assert!(config.executor.dry_run);
    }

    #[test]
    fn test_secrets_never_serialized() {
        let mut config = Config::default();
        config.model.api_key = Some("sk-secret".to_owned());
        config.executor.email_api_key = Some("relay-secret".to_owned());
        config.executor.email_relay_url = Some("https://relay.example.com/send".to_owned());

        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(!rendered.contains("sk-secret"));
        assert!(!rendered.contains("relay-secret"));
        assert!(rendered.contains("https://relay.example.com/send"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("api_key"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut model = ModelSection::default();
        model.api_key = Some("sk-secret".to_owned());
        let debug = format!("{model:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("has_api_key: true"));
    }

    #[test]
    fn test_storage_path_fallback() {
        let storage = StorageSection::default();
        assert!(!storage.is_durable());
        let path = storage.resolved_path(std::path::Path::new("/home/ana"));
        assert_eq!(path, PathBuf::from("/home/ana/.despacho/drafts"));
    }
}
