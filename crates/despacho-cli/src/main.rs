//! Despacho CLI - chat with the dispatch assistant and inspect its drafts.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use despacho_config::{Config, ResolvedConfig};
use despacho_core::SessionId;
use despacho_runtime::config_bridge;

mod commands;
mod repl;
mod theme;

use commands::{chat, config, drafts};

/// Despacho - confirm-before-send assistant for customs dispatch
#[derive(Parser)]
#[command(name = "despacho")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Session identifier (random when omitted)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Inspect drafts
    Drafts {
        #[command(subcommand)]
        command: DraftCommands,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum DraftCommands {
    /// List a session's drafts, newest first
    List {
        /// Session identifier
        #[arg(short, long)]
        session: String,
    },
    /// Show a draft and its revision history
    Show {
        /// Draft id (full, optionally prefixed with `draft:`)
        id: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the resolved configuration with the layer each value came from
    Show {
        /// Print JSON instead of annotated TOML
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let home = despacho_config::loader::home_directory()?;
    let workspace_root = std::env::current_dir().ok();
    let resolved = Config::load_with_home(workspace_root.as_deref(), &home);

    // Set up logging from config, with --verbose override.
    let log_config = match &resolved {
        Ok(r) => {
            let mut lc = config_bridge::to_log_config(&r.config);
            if cli.verbose {
                "debug".clone_into(&mut lc.level);
            }
            lc
        },
        Err(_) => {
            let level = if cli.verbose { "debug" } else { "warn" };
            despacho_telemetry::LogConfig::new(level)
        },
    };
    if let Err(e) = despacho_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let resolved: ResolvedConfig = resolved?;

    match cli.command {
        Some(Commands::Chat { session }) => {
            chat::run_chat(&resolved.config, &home, session).await?;
        },
        Some(Commands::Drafts { command }) => {
            handle_drafts(command, &resolved.config, home).await?;
        },
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show { json } => config::show_config(&resolved, json)?,
        },
        None => {
            chat::run_chat(&resolved.config, &home, None).await?;
        },
    }

    Ok(())
}

async fn handle_drafts(command: DraftCommands, cfg: &Config, home: PathBuf) -> Result<()> {
    let store = drafts::open_store(cfg, &home)?;
    match command {
        DraftCommands::List { session } => {
            drafts::list_drafts(&store, &SessionId::new(session)).await
        },
        DraftCommands::Show { id } => {
            let id = drafts::resolve_draft(&store, None, &id).await?;
            drafts::show_draft(&store, id).await
        },
    }
}
