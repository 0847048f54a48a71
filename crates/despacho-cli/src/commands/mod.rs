//! CLI commands.

pub(crate) mod chat;
pub(crate) mod config;
pub(crate) mod drafts;
