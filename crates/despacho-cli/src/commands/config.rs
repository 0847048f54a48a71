//! CLI handlers for the `despacho config` subcommand.

use anyhow::Result;
use despacho_config::{ResolvedConfig, ShowFormat};

/// Show the resolved configuration with source annotations. Secrets are
/// never printed.
pub(crate) fn show_config(resolved: &ResolvedConfig, json: bool) -> Result<()> {
    let format = if json {
        ShowFormat::Json
    } else {
        ShowFormat::Toml
    };

    let output = resolved
        .show(format)
        .map_err(|e| anyhow::anyhow!("failed to format config: {e}"))?;

    println!("{output}");

    if !json && !resolved.loaded_files.is_empty() {
        println!("# Loaded files:");
        for path in &resolved.loaded_files {
            println!("#   {path}");
        }
    }
    Ok(())
}
