//! Drafts command - inspect drafts and their revision history.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use despacho_config::Config;
use despacho_core::{DraftId, SessionId};
use despacho_drafts::{DeliveryState, Draft, DraftStore};
use despacho_runtime::config_bridge;

use crate::theme::Theme;

/// Open the configured draft store.
pub(crate) fn open_store(cfg: &Config, home: &Path) -> Result<Arc<DraftStore>> {
    if !cfg.storage.is_durable() {
        eprintln!(
            "{}",
            Theme::warning("storage.backend is 'memory'; drafts from earlier runs are not kept")
        );
    }
    let kv = config_bridge::to_kv_store(cfg, home)?;
    Ok(Arc::new(DraftStore::new(kv)?))
}

/// Whether `input` names `id`: the full id, with or without the `draft:`
/// prefix, or a leading part of its hex form.
pub(crate) fn matches_prefix(id: DraftId, input: &str) -> bool {
    let input = input.trim();
    let input = input.strip_prefix("draft:").unwrap_or(input);
    if input.is_empty() {
        return false;
    }
    let full = id.0.to_string();
    full.starts_with(input) || full.replace('-', "").starts_with(input)
}

/// Turn user input into a draft id.
///
/// Full ids are accepted anywhere. Short prefixes are looked up among the
/// session's drafts and must match exactly one.
pub(crate) async fn resolve_draft(
    store: &DraftStore,
    session: Option<&SessionId>,
    input: &str,
) -> Result<DraftId> {
    if let Ok(id) = input.parse::<DraftId>() {
        return Ok(id);
    }
    let Some(session) = session else {
        anyhow::bail!("'{input}' is not a full draft id");
    };

    let matches: Vec<DraftId> = store
        .list_for_session(session)
        .await?
        .into_iter()
        .map(|d| d.id)
        .filter(|id| matches_prefix(*id, input))
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        [] => anyhow::bail!("no draft in this session matches '{input}'"),
        _ => anyhow::bail!("'{input}' matches {} drafts; use more characters", matches.len()),
    }
}

/// List a session's drafts, newest first.
pub(crate) async fn list_drafts(store: &DraftStore, session: &SessionId) -> Result<()> {
    let drafts = store.list_for_session(session).await?;

    if drafts.is_empty() {
        println!("{}", Theme::info(&format!("No drafts for {session}")));
        return Ok(());
    }

    println!("\n{}", Theme::header(&format!("Drafts of {session}")));
    println!(
        "{:<10} {:<7} {:>4} {:<10} {:<22} {}",
        "ID".dimmed(),
        "KIND".dimmed(),
        "REV".dimmed(),
        "STATUS".dimmed(),
        "UPDATED".dimmed(),
        "DELIVERY".dimmed()
    );
    println!("{}", Theme::separator());

    for draft in &drafts {
        println!(
            "{:<10} {:<7} {:>4} {:<10} {:<22} {}",
            Theme::draft_id(&draft.id.short()),
            draft.kind.to_string(),
            draft.revision,
            Theme::draft_status(draft.status),
            draft.updated_at.to_string(),
            delivery_label(draft)
        );
    }

    println!();
    Ok(())
}

/// Show one draft with its full revision history.
pub(crate) async fn show_draft(store: &DraftStore, id: DraftId) -> Result<()> {
    let draft = store
        .get_latest(id)
        .await
        .with_context(|| format!("cannot load {id}"))?;

    println!("\n{}", Theme::header("Draft Details"));
    println!("  ID: {}", draft.id);
    println!("  Session: {}", draft.session_id);
    println!("  Kind: {}", draft.kind);
    println!("  Status: {}", Theme::draft_status(draft.status));
    println!("  Created: {}", draft.created_at);
    if let Some(at) = draft.finalized_at {
        println!("  Finalized: {at}");
    }
    if let Some(at) = draft.cancelled_at {
        println!("  Cancelled: {at}");
    }
    println!("  Delivery: {} (attempts: {})", delivery_label(&draft), draft.attempts);

    println!("\n{}", Theme::header("Latest Revision"));
    println!("{}", draft.preview());

    let history = store.history(id).await?;
    println!("{}", Theme::header("Revisions"));
    for revision in &history {
        println!(
            "  {:>3}  {}  {}",
            revision.revision,
            revision.created_at.to_string().dimmed(),
            revision.reason
        );
    }
    println!();
    Ok(())
}

fn delivery_label(draft: &Draft) -> String {
    match &draft.delivery {
        DeliveryState::NotAttempted => "-".dimmed().to_string(),
        DeliveryState::Delivered { receipt, .. } => format!("delivered {receipt}").green().to_string(),
        DeliveryState::Failed { error, .. } => format!("failed: {error}").red().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use despacho_core::{ActionPayload, EmailDraft};

    #[test]
    fn test_matches_prefix() {
        let id = DraftId::new();
        let short = id.short();
        assert!(matches_prefix(id, &short));
        assert!(matches_prefix(id, &format!("draft:{short}")));
        assert!(matches_prefix(id, &id.0.to_string()));
        assert!(!matches_prefix(id, ""));
        assert!(!matches_prefix(id, "zzzz"));
    }

    #[tokio::test]
    async fn test_resolve_short_id_within_session() {
        let store = DraftStore::in_memory().unwrap();
        let session = SessionId::new("cli");
        let payload = ActionPayload::Email(EmailDraft::new(["a@x.com"], "Hi"));
        let draft = store.create(&session, payload).await.unwrap();

        let resolved = resolve_draft(&store, Some(&session), &draft.id.short())
            .await
            .unwrap();
        assert_eq!(resolved, draft.id);

        // Short ids need a session to search in.
        assert!(resolve_draft(&store, None, &draft.id.short()).await.is_err());
        // Full ids resolve anywhere.
        assert_eq!(
            resolve_draft(&store, None, &draft.id.to_string()).await.unwrap(),
            draft.id
        );
        // Another session's drafts are not searched.
        assert!(
            resolve_draft(&store, Some(&SessionId::new("other")), &draft.id.short())
                .await
                .is_err()
        );
    }
}
