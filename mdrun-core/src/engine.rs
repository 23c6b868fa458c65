use crate::airlock::{Airlock, Authorization};
use crate::channel::decode_uri;
use crate::host::HostUi;
use crate::lens::{code_lenses, BlockLens};
use crate::render::render_document;
use crate::runner::{DispatchOutcome, Runner};
use crate::settings::Settings;
use crate::terminal::TerminalHost;
use crate::{DispatchRequest, RunAction};

use std::sync::Arc;
use tokio::sync::Mutex;

/// Warning shown when the editor action fires without a command.
pub const NO_COMMAND_WARNING: &str = "No command to run";

/// One activation of the extension. The host holds one instance of this
/// for its whole lifetime and routes every event through it.
#[derive(Debug)]
pub struct MdRunEngine {
    pub runner: Arc<Mutex<Runner>>,
    pub airlock: Arc<Airlock>,
    host: Arc<dyn HostUi>,
}

impl MdRunEngine {
    /// Activate: mint the session capability and build the dispatcher.
    pub fn start(settings: Settings, terminals: Box<dyn TerminalHost>, host: Arc<dyn HostUi>) -> Self {
        Self::with_airlock(settings, terminals, host, Airlock::new())
    }

    pub fn with_airlock(
        settings: Settings,
        terminals: Box<dyn TerminalHost>,
        host: Arc<dyn HostUi>,
        airlock: Airlock,
    ) -> Self {
        tracing::info!("md-run engine active");
        let runner = Runner::new(settings, terminals, host.clone());
        Self {
            runner: Arc::new(Mutex::new(runner)),
            airlock: Arc::new(airlock),
            host,
        }
    }

    /// The token the preview renderer must embed.
    pub fn session_token(&self) -> &str {
        self.airlock.capability().as_str()
    }

    pub async fn settings(&self) -> Settings {
        self.runner.lock().await.settings().clone()
    }

    /// Configuration changed in the host.
    pub async fn apply_settings(&self, settings: Settings) {
        tracing::debug!("settings changed");
        self.runner.lock().await.apply_settings(settings);
    }

    /// Runnable blocks of an open document, for the editor gutter.
    pub async fn code_lenses(&self, text: &str) -> Vec<BlockLens> {
        let runner = self.runner.lock().await;
        code_lenses(text, &runner.settings().supported_languages)
    }

    /// Preview HTML for a document, annotated with this session's token.
    pub async fn render_preview(&self, text: &str) -> String {
        let runner = self.runner.lock().await;
        render_document(text, self.session_token(), &runner.settings().supported_languages)
    }

    /// Dispatch without going through the Airlock. Errors are logged, never
    /// returned.
    pub async fn dispatch(&self, request: DispatchRequest) -> Option<DispatchOutcome> {
        let mut runner = self.runner.lock().await;
        match runner.dispatch(&request) {
            Ok(outcome) => {
                tracing::debug!(?outcome, "dispatched");
                Some(outcome)
            }
            Err(e) => {
                tracing::error!("dispatch failed: {:#}", e);
                None
            }
        }
    }

    /// Editor action: run `command` directly. This path is already trusted.
    pub async fn run_command(&self, command: Option<&str>, language: &str) -> Option<DispatchOutcome> {
        match command {
            Some(command) if !command.trim().is_empty() => {
                self.dispatch(DispatchRequest::new(command, language, RunAction::Run))
                    .await
            }
            _ => {
                self.host.show_warning(NO_COMMAND_WARNING);
                None
            }
        }
    }

    /// Inbound request from the preview surface.
    ///
    /// Decode, gate, then dispatch. Every failure ends in "nothing happened";
    /// the runner lock is not held while the user is being asked.
    pub async fn handle_uri(&self, uri: &str) -> Option<DispatchOutcome> {
        let request = match decode_uri(uri) {
            Ok(Some(request)) => request,
            Ok(None) => {
                tracing::debug!("ignoring request for an unknown path");
                return None;
            }
            Err(e) if e.is_silent() => {
                tracing::debug!("dropping request: {}", e);
                return None;
            }
            Err(e) => {
                tracing::error!("failed to decode request: {}", e);
                return None;
            }
        };

        tracing::debug!(
            action = ?request.action,
            lang = %request.language,
            has_nonce = !request.nonce.is_empty(),
            "request received"
        );

        let max_chars = self.runner.lock().await.settings().summary_max_chars;
        let trusted = self.host.is_workspace_trusted();

        match self
            .airlock
            .authorize(&request.nonce, trusted, &request.command, max_chars)
        {
            Authorization::Allow => {}
            Authorization::RequireConfirmation { summary } => {
                if !self
                    .airlock
                    .confirm(self.host.as_ref(), request.action, &summary)
                    .await
                {
                    tracing::info!("request declined at confirmation");
                    return None;
                }
            }
        }

        self.dispatch(DispatchRequest::new(
            request.command,
            request.language,
            request.action,
        ))
        .await
    }

    /// Deactivate: dispose the retained terminal.
    pub async fn shutdown(&self) {
        self.runner.lock().await.dispose_terminal();
    }
}
