//! Chat command - interactive session against the turn controller.

use std::path::Path;

use colored::Colorize;
use despacho_config::Config;
use despacho_core::SessionId;
use despacho_runtime::{TurnController, TurnOutcome, config_bridge};
use tracing::debug;

use crate::commands::drafts;
use crate::repl::{ChatEditor, Input, SLASH_COMMANDS};
use crate::theme::Theme;

/// Run interactive chat mode.
pub(crate) async fn run_chat(cfg: &Config, home: &Path, session: Option<String>) -> anyhow::Result<()> {
    let controller = config_bridge::build_controller(cfg, home)?;
    let session_id = session.map_or_else(SessionId::random, SessionId::new);

    println!(
        "Session: {} | Type {} to quit, {} for help\n",
        session_id.as_str().cyan(),
        "/quit".cyan(),
        "/help".cyan()
    );
    if cfg.executor.dry_run {
        println!(
            "{}",
            Theme::warning("Dry run: confirmed actions go to the local outbox, nothing leaves this machine")
        );
    }

    let mut editor = ChatEditor::new(home)?;
    follow(&mut editor, &controller, &session_id).await;

    loop {
        let input = match editor.read() {
            Input::Line(line) => line,
            Input::Interrupted => continue,
            Input::Eof => {
                println!("{}", Theme::dimmed("Goodbye!"));
                break;
            },
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if input.starts_with('/') {
            if handle_slash(&controller, &session_id, input).await {
                break;
            }
        } else {
            let outcome = controller.handle_turn(&session_id, input).await;
            print_outcome(&outcome);
        }
        follow(&mut editor, &controller, &session_id).await;
    }

    Ok(())
}

/// Point the editor at the session's current drafts.
async fn follow(editor: &mut ChatEditor, controller: &TurnController, session_id: &SessionId) {
    let awaiting = controller.pending(session_id).map(|p| p.draft_id.short());
    let drafts = match controller.drafts().list_for_session(session_id).await {
        Ok(drafts) => drafts.iter().map(|d| d.id.short()).collect(),
        Err(e) => {
            debug!(error = %e, "Draft ids unavailable for completion");
            Vec::new()
        },
    };
    editor.follow(awaiting, drafts);
}

/// Run a slash command. Returns `true` when the loop should end.
async fn handle_slash(controller: &TurnController, session_id: &SessionId, input: &str) -> bool {
    let mut parts = input.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let arg = parts.next();

    let result = match (command, arg) {
        ("/quit" | "/exit", _) => {
            println!("{}", Theme::dimmed("Goodbye!"));
            return true;
        },
        ("/help", _) => {
            print_help();
            Ok(())
        },
        ("/drafts", _) => drafts::list_drafts(controller.drafts(), session_id).await,
        ("/show", Some(raw)) => show(controller, session_id, raw).await,
        ("/retry", Some(raw)) => retry(controller, session_id, raw).await,
        ("/show" | "/retry", None) => Err(anyhow::anyhow!("usage: {command} <draft id>")),
        _ => Err(anyhow::anyhow!("unknown command {command}; try /help")),
    };

    if let Err(e) = result {
        println!("{}", Theme::error(&e.to_string()));
    }
    false
}

async fn show(controller: &TurnController, session_id: &SessionId, raw: &str) -> anyhow::Result<()> {
    let id = drafts::resolve_draft(controller.drafts(), Some(session_id), raw).await?;
    drafts::show_draft(controller.drafts(), id).await
}

async fn retry(controller: &TurnController, session_id: &SessionId, raw: &str) -> anyhow::Result<()> {
    let id = drafts::resolve_draft(controller.drafts(), Some(session_id), raw).await?;
    let outcome = controller.retry_delivery(session_id, id).await?;
    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &TurnOutcome) {
    println!("{}", Theme::response(outcome.status, &outcome.response_text));
    if outcome.awaiting_confirmation {
        println!("{}", Theme::dimmed("(awaiting confirmation)"));
    }
    println!();
}

fn print_help() {
    println!("\n{}", Theme::header("Commands"));
    for command in SLASH_COMMANDS {
        println!("  {:<12} {}", command.usage().cyan(), command.about);
    }
    println!(
        "\n{}",
        Theme::dimmed("While a draft is shown: \"yes\" sends it, \"no\" cancels, anything else revises or moves on.")
    );
    println!();
}
