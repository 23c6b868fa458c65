//! The Airlock decides whether a request coming from the rendered preview
//! may run straight away or has to be confirmed by the user first.
//!
//! The preview is a web-like surface that can also show third-party content,
//! so a request only counts as ours when it carries this activation's
//! capability token *and* the workspace is trusted. Everything else gets a
//! modal prompt.

use uuid::Uuid;

use crate::host::HostUi;
use crate::RunAction;

/// Marker appended to a truncated preview line.
pub const ELLIPSIS: char = '…';

/// Random token minted once per activation. Never rotated, never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCapability(String);

impl SessionCapability {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wrap an existing token.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact match; an empty token never matches.
    pub fn matches(&self, token: &str) -> bool {
        !token.is_empty() && self.0 == token
    }
}

// Keep the token out of logs.
impl std::fmt::Debug for SessionCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionCapability(..)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Allow,
    RequireConfirmation { summary: String },
}

/// Pure decision: token match in a trusted workspace, or a prompt.
pub fn authorize(
    request_token: &str,
    is_workspace_trusted: bool,
    session_token: &str,
    command: &str,
    max_chars: usize,
) -> Authorization {
    if !request_token.is_empty() && request_token == session_token && is_workspace_trusted {
        Authorization::Allow
    } else {
        Authorization::RequireConfirmation {
            summary: summarize_command(command, max_chars),
        }
    }
}

/// First line, cut to `max_chars` characters (ellipsis included).
pub fn preview_line(command: &str, max_chars: usize) -> String {
    let first = command.trim().lines().next().unwrap_or_default();
    if first.chars().count() <= max_chars {
        return first.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut out: String = first.chars().take(max_chars - 1).collect();
    out.push(ELLIPSIS);
    out
}

/// Preview line plus "(+N more lines)" when the command spans several.
pub fn summarize_command(command: &str, max_chars: usize) -> String {
    let preview = preview_line(command, max_chars);
    let extra = command.trim().lines().count().saturating_sub(1);
    match extra {
        0 => preview,
        1 => format!("{}\n(+1 more line)", preview),
        n => format!("{}\n(+{} more lines)", preview, n),
    }
}

/// Label of the single affirmative choice in the prompt.
pub fn confirm_label(action: RunAction) -> &'static str {
    match action {
        RunAction::Run => "Run",
        RunAction::Type => "Type",
    }
}

#[derive(Debug)]
pub struct Airlock {
    capability: SessionCapability,
}

impl Airlock {
    pub fn new() -> Self {
        Self::with_capability(SessionCapability::generate())
    }

    pub fn with_capability(capability: SessionCapability) -> Self {
        Self { capability }
    }

    pub fn capability(&self) -> &SessionCapability {
        &self.capability
    }

    pub fn authorize(
        &self,
        request_token: &str,
        is_workspace_trusted: bool,
        command: &str,
        max_chars: usize,
    ) -> Authorization {
        authorize(
            request_token,
            is_workspace_trusted,
            self.capability.as_str(),
            command,
            max_chars,
        )
    }

    /// Ask the user. Anything but the exact affirmative label is a cancel.
    pub async fn confirm(&self, host: &dyn HostUi, action: RunAction, summary: &str) -> bool {
        let label = confirm_label(action);
        let message = match action {
            RunAction::Run => "Run this command from the Markdown preview in the terminal?",
            RunAction::Type => "Type this command from the Markdown preview into the terminal?",
        };
        let answer = host.confirm(message, summary, label).await;
        answer.as_deref() == Some(label)
    }
}

impl Default for Airlock {
    fn default() -> Self {
        Self::new()
    }
}
