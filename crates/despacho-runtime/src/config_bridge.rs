//! Bridge from `despacho_config::Config` to runtime components.
//!
//! The config crate has no dependencies on other internal crates. These
//! functions turn its sections into the logger settings, detector, decision
//! layer, executor and storage backend the controller is built from, so the
//! conversion happens in one place.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use despacho_config::Config;
use despacho_confirm::{ConfirmationDetector, Lexicon};
use despacho_drafts::DraftStore;
use despacho_executor::{
    ActionExecutor, DeclarationBackend, EmailBackend, HttpDeclarationApi, HttpEmailRelay,
    OutboxBackend,
};
use despacho_llm::OpenAiCompatDecisionLayer;
use despacho_storage::{KvStore, MemoryKvStore};
use despacho_telemetry::{LogConfig, LogFormat};
use tracing::info;

use crate::controller::TurnController;
use crate::error::{RuntimeError, RuntimeResult};

/// Convert config to [`LogConfig`].
#[must_use]
pub fn to_log_config(cfg: &Config) -> LogConfig {
    let format = cfg.logging.format.parse().unwrap_or(LogFormat::Compact);
    LogConfig::new(&cfg.logging.level)
        .with_format(format)
        .with_directives(cfg.logging.directives.iter())
}

/// Build the confirmation detector: built-in vocabulary plus configured
/// extras.
#[must_use]
pub fn to_detector(cfg: &Config) -> ConfirmationDetector {
    let extra = &cfg.confirmation;
    if extra.is_empty() {
        return ConfirmationDetector::builtin();
    }
    ConfirmationDetector::new(
        Lexicon::builtin()
            .with_confirm(extra.confirm.iter())
            .with_cancel(extra.cancel.iter())
            .with_revise(extra.revise.iter())
            .with_filler(extra.filler.iter()),
    )
}

/// Build the decision layer.
///
/// A missing API key is not an error here: remote endpoints reject the
/// first call with `ApiKeyNotConfigured`, which the turn reports.
///
/// # Errors
///
/// Returns [`RuntimeError::Config`] if the HTTP client cannot be built.
pub fn to_decision_layer(cfg: &Config) -> RuntimeResult<OpenAiCompatDecisionLayer> {
    let model = &cfg.model;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(model.timeout_secs))
        .build()
        .map_err(|e| RuntimeError::Config(format!("model HTTP client: {e}")))?;

    Ok(
        OpenAiCompatDecisionLayer::custom(&model.api_url, model.api_key.as_deref(), &model.model)
            .with_max_tokens(model.max_tokens)
            .with_temperature(model.temperature)
            .with_client(client),
    )
}

/// Build the action executor.
///
/// With `dry_run` set both kinds go to an [`OutboxBackend`]. Otherwise the
/// HTTP backends are wired for whichever URLs are configured; proposals of a
/// kind without one are refused before a draft is created.
#[must_use]
pub fn to_executor(cfg: &Config) -> ActionExecutor {
    let section = &cfg.executor;
    let executor = ActionExecutor::new().with_timeout(Duration::from_secs(section.timeout_secs));

    if section.dry_run {
        let outbox = Arc::new(OutboxBackend::new());
        return executor
            .with_email_backend(outbox.clone())
            .with_declaration_backend(outbox);
    }

    let mut executor = executor;
    if let Some(url) = &section.email_relay_url {
        let relay: Arc<dyn EmailBackend> =
            Arc::new(HttpEmailRelay::new(url, section.email_api_key.as_deref()));
        executor = executor.with_email_backend(relay);
    }
    if let Some(url) = &section.declaration_api_url {
        let api: Arc<dyn DeclarationBackend> = Arc::new(HttpDeclarationApi::new(
            url,
            section.declaration_api_key.as_deref(),
        ));
        executor = executor.with_declaration_backend(api);
    }
    executor
}

/// Open the configured storage backend.
///
/// `home` anchors the default on-disk location.
///
/// # Errors
///
/// - [`RuntimeError::Storage`] if the durable store cannot be opened
/// - [`RuntimeError::Config`] for a backend this build does not include
pub fn to_kv_store(cfg: &Config, home: &Path) -> RuntimeResult<Arc<dyn KvStore>> {
    match cfg.storage.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryKvStore::new())),
        "surrealkv" => open_durable(&cfg.storage.resolved_path(home)),
        other => Err(RuntimeError::Config(format!(
            "unknown storage backend '{other}'"
        ))),
    }
}

#[cfg(feature = "kv")]
fn open_durable(path: &Path) -> RuntimeResult<Arc<dyn KvStore>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| RuntimeError::Config(format!("{}: {e}", parent.display())))?;
    }
    let store = despacho_storage::SurrealKvStore::open(path)?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "kv"))]
fn open_durable(_path: &Path) -> RuntimeResult<Arc<dyn KvStore>> {
    Err(RuntimeError::Config(
        "storage backend 'surrealkv' needs the `kv` feature".to_string(),
    ))
}

/// Build a [`TurnController`] from a resolved config.
///
/// # Errors
///
/// Returns an error if storage or the decision layer cannot be set up.
pub fn build_controller(cfg: &Config, home: &Path) -> RuntimeResult<TurnController> {
    let store = to_kv_store(cfg, home)?;
    let drafts = Arc::new(DraftStore::new(store)?);
    let decisions = Arc::new(to_decision_layer(cfg)?);
    let executor = Arc::new(to_executor(cfg));

    info!(
        storage = %cfg.storage.backend,
        dry_run = cfg.executor.dry_run,
        model = %cfg.model.model,
        history_limit = cfg.sessions.history_limit,
        "Turn controller configured"
    );

    Ok(TurnController::new(drafts, decisions, executor)
        .with_detector(to_detector(cfg))
        .with_history_limit(cfg.sessions.history_limit))
}

#[cfg(test)]
mod tests {
    use despacho_confirm::Intent;
    use despacho_core::ActionKind;

    use super::*;

    #[test]
    fn test_log_config_maps_format() {
        let mut cfg = Config::default();
        cfg.logging.format = "json".into();
        cfg.logging.directives = vec!["despacho_runtime=debug".into()];
        let log = to_log_config(&cfg);
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.directives, vec!["despacho_runtime=debug".to_string()]);

        cfg.logging.format = "unknown".into();
        assert_eq!(to_log_config(&cfg).format, LogFormat::Compact);
    }

    #[test]
    fn test_detector_includes_configured_phrases() {
        let mut cfg = Config::default();
        cfg.confirmation.confirm = vec!["manda bala".into()];
        let detector = to_detector(&cfg);
        assert_eq!(detector.classify("manda bala", true), Intent::Confirm);
        assert_eq!(detector.classify("sim", true), Intent::Confirm);
    }

    #[test]
    fn test_dry_run_executor_supports_both_kinds() {
        let cfg = Config::default();
        assert!(cfg.executor.dry_run);
        let executor = to_executor(&cfg);
        assert!(executor.supports(ActionKind::Email));
        assert!(executor.supports(ActionKind::Duimp));
        assert_eq!(executor.timeout(), Duration::from_secs(cfg.executor.timeout_secs));
    }

    #[test]
    fn test_live_executor_only_wires_configured_backends() {
        let mut cfg = Config::default();
        cfg.executor.dry_run = false;
        cfg.executor.email_relay_url = Some("http://127.0.0.1:9/send".into());
        let executor = to_executor(&cfg);
        assert!(executor.supports(ActionKind::Email));
        assert!(!executor.supports(ActionKind::Duimp));
    }

    #[test]
    fn test_unknown_storage_backend() {
        let mut cfg = Config::default();
        cfg.storage.backend = "sqlite".into();
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            to_kv_store(&cfg, dir.path()),
            Err(RuntimeError::Config(_))
        ));
    }

    #[cfg(not(feature = "kv"))]
    #[test]
    fn test_durable_backend_needs_feature() {
        let mut cfg = Config::default();
        cfg.storage.backend = "surrealkv".into();
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            to_kv_store(&cfg, dir.path()),
            Err(RuntimeError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_build_controller_from_defaults() {
        let cfg = Config::default();
        let dir = tempfile::tempdir().unwrap();
        let controller = build_controller(&cfg, dir.path()).unwrap();
        assert_eq!(controller.history_limit(), cfg.sessions.history_limit);
        assert!(controller.register().is_empty());
    }
}
