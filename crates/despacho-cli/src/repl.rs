//! Line editor for the chat loop.
//!
//! The editor tracks the session between turns: the prompt changes while a
//! draft waits for confirmation, and `/show` and `/retry` complete the
//! session's draft ids.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::{Hint, Hinter};
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, Context, EditMode, Editor, Helper, Validator};
use tracing::debug;

/// A chat slash command.
pub(crate) struct SlashCommand {
    pub(crate) name: &'static str,
    /// Argument placeholder; commands with one take a draft id.
    pub(crate) arg: Option<&'static str>,
    pub(crate) about: &'static str,
}

impl SlashCommand {
    pub(crate) fn usage(&self) -> String {
        match self.arg {
            Some(arg) => format!("{} {arg}", self.name),
            None => self.name.to_string(),
        }
    }

    fn find(name: &str) -> Option<&'static Self> {
        SLASH_COMMANDS.iter().find(|c| c.name == name)
    }
}

pub(crate) const SLASH_COMMANDS: &[SlashCommand] = &[
    SlashCommand {
        name: "/drafts",
        arg: None,
        about: "list this session's drafts",
    },
    SlashCommand {
        name: "/show",
        arg: Some("<id>"),
        about: "show a draft and its revisions",
    },
    SlashCommand {
        name: "/retry",
        arg: Some("<id>"),
        about: "retry a failed delivery",
    },
    SlashCommand {
        name: "/help",
        arg: None,
        about: "this help",
    },
    SlashCommand {
        name: "/quit",
        arg: None,
        about: "leave",
    },
];

/// What a read produced.
pub(crate) enum Input {
    Line(String),
    /// Ctrl+C.
    Interrupted,
    /// Ctrl+D, or the terminal went away.
    Eof,
}

struct ChatHint {
    display: String,
    completion: Option<String>,
}

impl Hint for ChatHint {
    fn display(&self) -> &str {
        &self.display
    }

    fn completion(&self) -> Option<&str> {
        self.completion.as_deref()
    }
}

#[derive(Default, Helper, Validator)]
struct ChatHelper {
    /// Short id of the draft awaiting confirmation.
    awaiting: Option<String>,
    /// Short ids of the session's drafts, newest first.
    drafts: Vec<String>,
}

impl Completer for ChatHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = line.get(..pos).unwrap_or(line);
        let candidates = |start: usize, items: Vec<&str>| -> rustyline::Result<(usize, Vec<Pair>)> {
            let pairs: Vec<Pair> = items
                .into_iter()
                .map(|s| Pair {
                    display: s.to_string(),
                    replacement: s.to_string(),
                })
                .collect();
            Ok((start, pairs))
        };

        match prefix.split_once(' ') {
            None if prefix.starts_with('/') => candidates(
                0,
                SLASH_COMMANDS
                    .iter()
                    .map(|c| c.name)
                    .filter(|name| name.starts_with(prefix))
                    .collect(),
            ),
            Some((name, arg))
                if !arg.contains(' ')
                    && SlashCommand::find(name).is_some_and(|c| c.arg.is_some()) =>
            {
                candidates(
                    name.len().saturating_add(1),
                    self.drafts
                        .iter()
                        .map(String::as_str)
                        .filter(|id| id.starts_with(arg))
                        .collect(),
                )
            },
            _ => Ok((pos, Vec::new())),
        }
    }
}

impl Hinter for ChatHelper {
    type Hint = ChatHint;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<ChatHint> {
        if pos < line.len() {
            return None;
        }
        if line.is_empty() {
            return self.awaiting.as_ref().map(|_| ChatHint {
                display: "yes sends it, no cancels, or say what to change".to_string(),
                completion: None,
            });
        }
        if !line.starts_with('/') || line.contains(' ') {
            return None;
        }

        let command = SLASH_COMMANDS.iter().find(|c| c.name.starts_with(line))?;
        let rest = command.name.get(line.len()..)?;
        let display = match command.arg {
            Some(arg) => format!("{rest} {arg}"),
            None => rest.to_string(),
        };
        Some(ChatHint {
            display,
            completion: Some(rest.to_string()),
        })
    }
}

impl Highlighter for ChatHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(hint.dimmed().to_string())
    }
}

/// Rustyline editor that follows the chat session.
pub(crate) struct ChatEditor {
    editor: Editor<ChatHelper, DefaultHistory>,
    history_path: PathBuf,
}

impl ChatEditor {
    /// Create an editor keeping its history in `{home}/.despacho/chat_history`.
    pub(crate) fn new(home: &Path) -> anyhow::Result<Self> {
        let dir = home.join(".despacho");
        std::fs::create_dir_all(&dir)?;
        let history_path = dir.join("chat_history");

        let config = Config::builder()
            .history_ignore_dups(true)?
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .edit_mode(EditMode::Emacs)
            .build();

        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(ChatHelper::default()));
        if let Err(e) = editor.load_history(&history_path) {
            debug!(path = %history_path.display(), error = %e, "No chat history loaded");
        }

        Ok(Self {
            editor,
            history_path,
        })
    }

    /// Tell the editor which draft is awaiting confirmation and which drafts
    /// the session has.
    pub(crate) fn follow(&mut self, awaiting: Option<String>, drafts: Vec<String>) {
        if let Some(helper) = self.editor.helper_mut() {
            helper.awaiting = awaiting;
            helper.drafts = drafts;
        }
    }

    /// Read one line.
    pub(crate) fn read(&mut self) -> Input {
        let awaiting = self.editor.helper().and_then(|h| h.awaiting.clone());
        let prompt = match &awaiting {
            Some(short) => format!("{} ", format!("[{short}] >").yellow().bold()),
            None => format!("{} ", ">".green().bold()),
        };

        match self.editor.readline(&prompt) {
            Ok(line) => {
                // Answers to a draft stay out of history; recalling one could
                // confirm a later draft.
                if awaiting.is_none() && !line.trim().is_empty() {
                    self.remember(&line);
                }
                Input::Line(line)
            },
            Err(ReadlineError::Interrupted) => Input::Interrupted,
            Err(ReadlineError::Eof) => Input::Eof,
            Err(e) => {
                debug!(error = %e, "Line editor stopped");
                Input::Eof
            },
        }
    }

    fn remember(&mut self, line: &str) {
        let saved = self
            .editor
            .add_history_entry(line)
            .and_then(|_| self.editor.save_history(&self.history_path));
        if let Err(e) = saved {
            debug!(path = %self.history_path.display(), error = %e, "Chat history not saved");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn helper(awaiting: Option<&str>) -> ChatHelper {
        ChatHelper {
            awaiting: awaiting.map(str::to_string),
            drafts: vec!["1a2b3c4d".into(), "1a99ffee".into(), "77aa0011".into()],
        }
    }

    fn complete(helper: &ChatHelper, line: &str) -> (usize, Vec<String>) {
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);
        let (start, pairs) = helper.complete(line, line.len(), &ctx).unwrap();
        (start, pairs.into_iter().map(|p| p.replacement).collect())
    }

    fn hint(helper: &ChatHelper, line: &str) -> Option<(String, Option<String>)> {
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);
        helper
            .hint(line, line.len(), &ctx)
            .map(|h| (h.display, h.completion))
    }

    #[test]
    fn test_completes_command_names() {
        let (start, names) = complete(&helper(None), "/d");
        assert_eq!(start, 0);
        assert_eq!(names, vec!["/drafts"]);
    }

    #[test]
    fn test_completes_draft_ids_for_draft_commands() {
        let (start, ids) = complete(&helper(None), "/retry 1a");
        assert_eq!(start, 7);
        assert_eq!(ids, vec!["1a2b3c4d", "1a99ffee"]);

        let (_, ids) = complete(&helper(None), "/quit 1a");
        assert!(ids.is_empty());
    }

    #[test]
    fn test_plain_text_gets_no_completion() {
        let (_, items) = complete(&helper(None), "email the broker");
        assert!(items.is_empty());
    }

    #[test]
    fn test_empty_line_hint_only_while_awaiting() {
        assert!(hint(&helper(None), "").is_none());
        let (display, completion) = hint(&helper(Some("1a2b3c4d")), "").unwrap();
        assert!(display.starts_with("yes sends it"));
        assert!(completion.is_none());
    }

    #[test]
    fn test_command_hint_shows_argument_but_completes_name() {
        let (display, completion) = hint(&helper(None), "/sh").unwrap();
        assert_eq!(display, "ow <id>");
        assert_eq!(completion.as_deref(), Some("ow"));
        assert!(hint(&helper(None), "/show 1a").is_none());
    }
}
