//! Source-annotated display for `config show`.

use std::fmt::{self, Write as _};

use crate::merge::FieldSources;
use crate::types::Config;

/// A resolved configuration together with source annotations.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final merged configuration.
    pub config: Config,
    /// Dotted field path to the layer that set it.
    pub field_sources: FieldSources,
    /// Config files that were loaded, in precedence order.
    pub loaded_files: Vec<String>,
}

/// Output format for `config show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowFormat {
    /// TOML with inline comments showing source.
    Toml,
    /// JSON (for programmatic consumption).
    Json,
}

impl ResolvedConfig {
    /// Render the configuration. Secrets are never included.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn show(&self, format: ShowFormat) -> Result<String, fmt::Error> {
        match format {
            ShowFormat::Toml => self.show_toml(),
            ShowFormat::Json => serde_json::to_string_pretty(&self.config).map_err(|_| fmt::Error),
        }
    }

    fn show_toml(&self) -> Result<String, fmt::Error> {
        let toml_str = toml::to_string_pretty(&self.config).map_err(|_| fmt::Error)?;

        let mut output = String::new();
        output.push_str("# Resolved Despacho configuration\n");
        output.push_str("# Source annotations: [defaults] [user] [workspace] [env]\n");

        if !self.loaded_files.is_empty() {
            output.push_str("#\n# Loaded files (in precedence order):\n");
            for (i, path) in self.loaded_files.iter().enumerate() {
                writeln!(output, "#   {}. {path}", i.saturating_add(1))?;
            }
        }
        output.push('\n');

        let mut section = String::new();
        for line in toml_str.lines() {
            let trimmed = line.trim();
            if let Some(name) = trimmed
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
            {
                name.clone_into(&mut section);
                writeln!(output, "{line}")?;
                continue;
            }

            let annotation = trimmed
                .split_once('=')
                .map(|(key, _)| field_path(&section, key.trim()))
                .and_then(|path| self.field_sources.get(&path));

            match annotation {
                Some(layer) => writeln!(output, "{line}  # [{layer}]")?,
                None => writeln!(output, "{line}")?,
            }
        }

        Ok(output)
    }
}

fn field_path(section: &str, key: &str) -> String {
    if section.is_empty() {
        key.to_owned()
    } else {
        format!("{section}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::ConfigLayer;

    fn resolved() -> ResolvedConfig {
        let mut config = Config::default();
        config.model.api_key = Some("sk-hidden".to_owned());
        let mut field_sources = FieldSources::new();
        field_sources.insert("model.model".to_owned(), ConfigLayer::User);
        field_sources.insert("sessions.history_limit".to_owned(), ConfigLayer::Defaults);
        ResolvedConfig {
            config,
            field_sources,
            loaded_files: vec!["/home/ana/.despacho/config.toml".to_owned()],
        }
    }

    #[test]
    fn test_toml_annotates_sources() {
        let out = resolved().show(ShowFormat::Toml).unwrap();
        assert!(out.contains("/home/ana/.despacho/config.toml"));
        assert!(out.contains("model = \"gpt-4o-mini\"  # [user]"));
        assert!(out.contains("history_limit = 40  # [defaults]"));
        assert!(!out.contains("sk-hidden"));
    }

    #[test]
    fn test_json_omits_secrets() {
        let out = resolved().show(ShowFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["model"]["provider"], "openai-compat");
        assert!(value["model"].get("api_key").is_none());
    }
}
