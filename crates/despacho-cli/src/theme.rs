//! CLI theme and styling.

use colored::Colorize;
use despacho_drafts::DraftStatus;
use despacho_runtime::TurnStatus;

/// CLI theme configuration.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format a warning message.
    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Format an info message.
    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    /// Format a dimmed message.
    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// Format a separator line.
    pub(crate) fn separator() -> String {
        "━".repeat(50).dimmed().to_string()
    }

    /// Format a short draft id.
    pub(crate) fn draft_id(short: &str) -> String {
        format!("{}", short.cyan())
    }

    /// Format a draft status.
    pub(crate) fn draft_status(status: DraftStatus) -> String {
        let text = status.to_string();
        match status {
            DraftStatus::Pending => text.yellow().to_string(),
            DraftStatus::Sent => text.green().to_string(),
            DraftStatus::Cancelled => text.dimmed().to_string(),
        }
    }

    /// Format an assistant response according to how the turn ended.
    pub(crate) fn response(status: TurnStatus, text: &str) -> String {
        match status {
            TurnStatus::Sent => Self::success(text),
            TurnStatus::DeliveryFailed | TurnStatus::InternalError => Self::error(text),
            TurnStatus::DecisionFailed | TurnStatus::NeedsClarification | TurnStatus::Unsupported => {
                Self::warning(text)
            },
            _ => text.to_string(),
        }
    }
}
