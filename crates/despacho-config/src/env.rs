//! Environment variable fallback and `${VAR}` reference resolution.
//!
//! Environment variables are a fallback, not an override: they only fill
//! fields that no config file set.

use std::collections::HashMap;
use std::fmt::Write as _;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

/// All supported `DESPACHO_*` mappings plus the standard OpenAI key.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "DESPACHO_MODEL_API_KEY",
        field_path: "model.api_key",
    },
    EnvMapping {
        var_name: "DESPACHO_MODEL_API_URL",
        field_path: "model.api_url",
    },
    EnvMapping {
        var_name: "DESPACHO_MODEL",
        field_path: "model.model",
    },
    EnvMapping {
        var_name: "DESPACHO_STORAGE_BACKEND",
        field_path: "storage.backend",
    },
    EnvMapping {
        var_name: "DESPACHO_STORAGE_PATH",
        field_path: "storage.path",
    },
    EnvMapping {
        var_name: "DESPACHO_DRY_RUN",
        field_path: "executor.dry_run",
    },
    EnvMapping {
        var_name: "DESPACHO_EMAIL_RELAY_URL",
        field_path: "executor.email_relay_url",
    },
    EnvMapping {
        var_name: "DESPACHO_EMAIL_API_KEY",
        field_path: "executor.email_api_key",
    },
    EnvMapping {
        var_name: "DESPACHO_DECLARATION_API_URL",
        field_path: "executor.declaration_api_url",
    },
    EnvMapping {
        var_name: "DESPACHO_DECLARATION_API_KEY",
        field_path: "executor.declaration_api_key",
    },
    EnvMapping {
        var_name: "DESPACHO_HISTORY_LIMIT",
        field_path: "sessions.history_limit",
    },
    EnvMapping {
        var_name: "DESPACHO_LOG_LEVEL",
        field_path: "logging.level",
    },
    // Standard OpenAI SDK env var.
    EnvMapping {
        var_name: "OPENAI_API_KEY",
        field_path: "model.api_key",
    },
];

/// Apply environment variable fallbacks to fields that no config file set.
///
/// A field only carrying its embedded default counts as unset. Returns the
/// number of env vars applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let set_by_file = sources
            .get(mapping.field_path)
            .is_some_and(|layer| *layer != ConfigLayer::Defaults);
        if set_by_file {
            continue;
        }

        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var fallback"
            );
            set_field_from_string(merged, mapping.field_path, val);
            sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    count
}

/// Resolve `${VAR}` references within string values in the config tree.
///
/// References that don't resolve are left as-is.
pub fn resolve_env_references<S: ::std::hash::BuildHasher>(
    val: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) {
    match val {
        toml::Value::String(s) => {
            *s = resolve_string_refs(s, env_vars);
        },
        toml::Value::Table(table) => {
            let keys: Vec<String> = table.keys().cloned().collect();
            for key in keys {
                if let Some(child) = table.get_mut(&key) {
                    resolve_env_references(child, env_vars);
                }
            }
        },
        toml::Value::Array(arr) => {
            for child in arr.iter_mut() {
                resolve_env_references(child, env_vars);
            }
        },
        _ => {},
    }
}

/// Replace `${VAR}` references in a string with their env var values.
fn resolve_string_refs<S: ::std::hash::BuildHasher>(
    input: &str,
    env_vars: &HashMap<String, String, S>,
) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next();

        let mut var_name = String::new();
        let mut closed = false;
        for ch in chars.by_ref() {
            if ch == '}' {
                closed = true;
                break;
            }
            var_name.push(ch);
        }

        if closed && !var_name.is_empty() {
            if let Some(val) = env_vars.get(&var_name) {
                result.push_str(val);
            } else {
                debug!(var = var_name, "unresolved env var reference in config");
                let _ = write!(result, "${{{var_name}}}");
            }
        } else {
            // Malformed reference, leave as-is.
            result.push_str("${");
            result.push_str(&var_name);
        }
    }

    result
}

/// Set a field in the TOML tree from a string value, coercing known
/// numeric and boolean fields.
fn set_field_from_string(root: &mut toml::Value, path: &str, val: &str) {
    let toml_val = coerce_to_toml_value(path, val);

    let mut current = root;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        if segments.peek().is_none() {
            table.insert(segment.to_owned(), toml_val);
            return;
        }
        current = table
            .entry(segment.to_owned())
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }
}

/// Coerce a string env var value to the TOML type of its field.
fn coerce_to_toml_value(path: &str, val: &str) -> toml::Value {
    if matches!(path, "sessions.history_limit") && let Ok(i) = val.parse::<i64>() {
        return toml::Value::Integer(i);
    }

    if matches!(path, "executor.dry_run") && let Ok(b) = val.parse::<bool>() {
        return toml::Value::Boolean(b);
    }

    toml::Value::String(val.to_owned())
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}
