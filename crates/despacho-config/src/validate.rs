//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Upper bound for `model.max_tokens`.
const MAX_TOKENS_UPPER_BOUND: usize = 1_000_000;

/// Upper bound for `sessions.history_limit`.
const MAX_HISTORY_LIMIT: usize = 10_000;

/// Validate a fully merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_model(config)?;
    validate_storage(config)?;
    validate_executor(config)?;
    validate_sessions(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_model(config: &Config) -> ConfigResult<()> {
    let m = &config.model;

    if m.provider != "openai-compat" {
        return Err(invalid(
            "model.provider",
            format!("unsupported provider '{}'; expected openai-compat", m.provider),
        ));
    }

    if !is_http_url(&m.api_url) {
        return Err(invalid(
            "model.api_url",
            format!("'{}' is not an http(s) URL", m.api_url),
        ));
    }

    if m.model.trim().is_empty() {
        return Err(invalid("model.model", "model name must not be empty"));
    }

    if !(0.0..=2.0).contains(&m.temperature) {
        return Err(invalid(
            "model.temperature",
            format!("temperature {} is out of range 0.0..=2.0", m.temperature),
        ));
    }

    if m.max_tokens == 0 || m.max_tokens > MAX_TOKENS_UPPER_BOUND {
        return Err(invalid(
            "model.max_tokens",
            format!("max_tokens must be between 1 and {MAX_TOKENS_UPPER_BOUND}"),
        ));
    }

    if m.timeout_secs == 0 {
        return Err(invalid("model.timeout_secs", "timeout must be positive"));
    }

    Ok(())
}

fn validate_storage(config: &Config) -> ConfigResult<()> {
    match config.storage.backend.as_str() {
        "memory" | "surrealkv" => Ok(()),
        other => Err(invalid(
            "storage.backend",
            format!("unknown backend '{other}'; expected memory or surrealkv"),
        )),
    }
}

fn validate_executor(config: &Config) -> ConfigResult<()> {
    let e = &config.executor;

    if e.timeout_secs == 0 {
        return Err(invalid("executor.timeout_secs", "timeout must be positive"));
    }

    for (field, url) in [
        ("executor.email_relay_url", &e.email_relay_url),
        ("executor.declaration_api_url", &e.declaration_api_url),
    ] {
        if let Some(url) = url
            && !is_http_url(url)
        {
            return Err(invalid(field, format!("'{url}' is not an http(s) URL")));
        }
    }

    // Live delivery needs at least the email relay.
    if !e.dry_run && e.email_relay_url.is_none() {
        return Err(invalid(
            "executor.email_relay_url",
            "required when executor.dry_run is false",
        ));
    }

    Ok(())
}

fn validate_sessions(config: &Config) -> ConfigResult<()> {
    let limit = config.sessions.history_limit;
    if limit == 0 || limit > MAX_HISTORY_LIMIT {
        return Err(invalid(
            "sessions.history_limit",
            format!("history_limit must be between 1 and {MAX_HISTORY_LIMIT}"),
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !matches!(
        l.level.to_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(invalid(
            "logging.level",
            format!("unknown level '{}'", l.level),
        ));
    }

    if !matches!(l.format.as_str(), "pretty" | "compact" | "json" | "full") {
        return Err(invalid(
            "logging.format",
            format!(
                "unknown format '{}'; expected pretty, compact, json, or full",
                l.format
            ),
        ));
    }

    Ok(())
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
