use crate::host::HostUi;
use crate::runtime::languages::{ExecutionStrategy, LanguageTable};
use crate::settings::Settings;
use crate::terminal::{TerminalHost, TerminalSink};
use crate::{DispatchRequest, RunAction};

use anyhow::Result;
use std::sync::Arc;

/// Joins shell lines so they run in order and stop at the first failure.
pub const SEQUENCE_OPERATOR: &str = " && ";

/// What a dispatch did. Only used for logging and tests; the caller that
/// triggered the dispatch never sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Text went to the terminal.
    Sent { text: String, execute: bool },
    /// Nothing survived normalization.
    Empty,
    /// File-based language; the user was told how to run it instead.
    NeedsFile { language: String },
    /// Database query; copied to the clipboard.
    CopiedToClipboard,
}

/// Lines that are neither blank nor `#` comments.
pub fn normalize_lines(raw: &str) -> Vec<&str> {
    raw.lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .collect()
}

pub fn join_shell(lines: &[&str]) -> String {
    lines.join(SEQUENCE_OPERATOR)
}

/// Escape for embedding inside a double-quoted shell word.
///
/// Backslash goes first so the escapes added afterwards are not doubled.
pub fn escape_double_quoted(code: &str) -> String {
    code.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('`', "\\`")
        .replace('$', "\\$")
}

/// `python3 -c "<escaped body>"`. Newlines are kept as real newlines.
pub fn interpreter_command(invocation: &str, raw: &str) -> String {
    format!("{} \"{}\"", invocation, escape_double_quoted(raw.trim()))
}

fn needs_file_message(language: &str, extension: &str, runner: &str) -> String {
    format!(
        "{} code has to be saved to a file before it can run (e.g. main{} with `{}`). \
         Put an explicit run command in the code block instead, such as: go run main.go",
        language.to_uppercase(),
        extension,
        runner
    )
}

const QUERY_MESSAGE: &str =
    "SQL statements need to run in a database client. The statement was copied to the clipboard.";

/// The command dispatcher.
///
/// Owns the retained terminal (when reuse is on) and the language table
/// built from the current settings. With reuse off, terminals replaced by a
/// newer one are kept alive in `released` until they exit or the runner is
/// shut down.
pub struct Runner {
    settings: Settings,
    languages: LanguageTable,
    terminals: Box<dyn TerminalHost>,
    current: Option<Box<dyn TerminalSink>>,
    released: Vec<Box<dyn TerminalSink>>,
    host: Arc<dyn HostUi>,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("settings", &self.settings)
            .field("languages", &self.languages.len())
            .field("current", &self.current.as_ref().map(|t| t.name().to_string()))
            .field("released", &self.released.len())
            .finish()
    }
}

impl Runner {
    pub fn new(settings: Settings, terminals: Box<dyn TerminalHost>, host: Arc<dyn HostUi>) -> Self {
        let languages = settings.language_table();
        Self {
            settings,
            languages,
            terminals,
            current: None,
            released: Vec::new(),
            host,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn languages(&self) -> &LanguageTable {
        &self.languages
    }

    /// Configuration changed: swap settings and rebuild the table.
    pub fn apply_settings(&mut self, settings: Settings) {
        self.languages = settings.language_table();
        self.settings = settings;
    }

    /// True while a retained terminal is held.
    pub fn has_terminal(&self) -> bool {
        self.current.is_some()
    }

    /// Route one block to the terminal.
    pub fn dispatch(&mut self, request: &DispatchRequest) -> Result<DispatchOutcome> {
        let execute = request.action == RunAction::Run;

        // The terminal is surfaced even when nothing ends up being sent.
        self.acquire_terminal()?.show();

        let lines = normalize_lines(&request.raw_content);
        if lines.is_empty() {
            tracing::debug!("nothing left after normalization");
            return Ok(DispatchOutcome::Empty);
        }

        let classification = self
            .languages
            .classify(&request.language, &self.settings.supported_languages);

        let text = match classification.strategy {
            ExecutionStrategy::Shell | ExecutionStrategy::Unsupported => join_shell(&lines),
            ExecutionStrategy::Interpreter { command } => {
                interpreter_command(&command, &request.raw_content)
            }
            ExecutionStrategy::FileBased { extension, runner } => {
                let language = crate::runtime::normalize_tag(&request.language);
                self.host
                    .show_info(&needs_file_message(&language, &extension, &runner));
                return Ok(DispatchOutcome::NeedsFile { language });
            }
            ExecutionStrategy::Query => {
                match self.host.write_clipboard(&request.raw_content) {
                    Ok(()) => self.host.show_info(QUERY_MESSAGE),
                    Err(e) => {
                        tracing::warn!("clipboard write failed: {:#}", e);
                        self.host
                            .show_warning(&format!("Could not copy the statement: {}", e));
                    }
                }
                return Ok(DispatchOutcome::CopiedToClipboard);
            }
        };

        tracing::info!(execute, language = %request.language, "sending to terminal");
        match self.current.as_mut() {
            Some(terminal) => terminal.send_text(&text, execute)?,
            None => anyhow::bail!("terminal went away before sending"),
        }
        Ok(DispatchOutcome::Sent { text, execute })
    }

    /// Reuse the retained terminal if it is still alive, else the focused
    /// one, else a new one. With reuse off, always a new one.
    fn acquire_terminal(&mut self) -> Result<&mut dyn TerminalSink> {
        let reusable = self.settings.reuse_terminal
            && match self.current.as_mut() {
                Some(terminal) => !terminal.has_exited(),
                None => false,
            };

        if !reusable {
            let next = if self.settings.reuse_terminal {
                match self.terminals.active_terminal() {
                    Some(active) => active,
                    None => self.terminals.create_terminal(&self.settings.terminal_name)?,
                }
            } else {
                self.terminals.create_terminal(&self.settings.terminal_name)?
            };
            self.release_current();
            self.current = Some(next);
        }

        match self.current.as_mut() {
            Some(terminal) => Ok(terminal.as_mut()),
            None => anyhow::bail!("no terminal available"),
        }
    }

    /// Park the outgoing terminal. A live one stays open for the user; an
    /// exited one is dropped. Parked terminals that have exited since are
    /// dropped too.
    fn release_current(&mut self) {
        self.released.retain_mut(|terminal| !terminal.has_exited());
        if let Some(mut previous) = self.current.take() {
            if !previous.has_exited() {
                tracing::debug!(name = previous.name(), "keeping replaced terminal open");
                self.released.push(previous);
            }
        }
    }

    /// Terminals replaced by a newer one and still held open.
    pub fn released_count(&self) -> usize {
        self.released.len()
    }

    /// Dispose the retained terminal and every parked one. Safe to call more
    /// than once.
    pub fn dispose_terminal(&mut self) {
        for mut terminal in self.current.take().into_iter().chain(self.released.drain(..)) {
            tracing::debug!(name = terminal.name(), "disposing terminal");
            terminal.dispose();
        }
    }
}
