//! Console host: messages on stderr, confirmations read from the same
//! line stream the `serve` loop reads requests from.

use anyhow::Result;
use async_trait::async_trait;
use mdrun_core::channel::request_action;
use mdrun_core::host::HostUi;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::Mutex;

pub type LineSource = Lines<Box<dyn AsyncBufRead + Send + Unpin>>;

/// Lines from the console plus the requests that arrived while a prompt
/// was waiting for its answer.
pub struct ConsoleInput {
    lines: Mutex<LineSource>,
    queued: std::sync::Mutex<VecDeque<String>>,
}

impl std::fmt::Debug for ConsoleInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleInput")
            .field("queued", &self.queued_len())
            .finish()
    }
}

impl ConsoleInput {
    /// Next raw line, or `None` at end of input. Read errors count as end
    /// of input.
    pub async fn next_line(&self) -> Option<String> {
        match self.lines.lock().await.next_line().await {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("failed to read input: {}", e);
                None
            }
        }
    }

    /// Next request to handle: queued ones first, in arrival order.
    pub async fn next_request(&self) -> Option<String> {
        if let Some(queued) = self.pop_queued() {
            return Some(queued);
        }
        self.next_line().await
    }

    pub fn queue_request(&self, uri: String) {
        if let Ok(mut queued) = self.queued.lock() {
            queued.push_back(uri);
        }
    }

    pub fn queued_len(&self) -> usize {
        self.queued.lock().map(|q| q.len()).unwrap_or_default()
    }

    fn pop_queued(&self) -> Option<String> {
        self.queued.lock().ok().and_then(|mut q| q.pop_front())
    }
}

/// One input shared between the request loop and the prompt.
pub type SharedInput = Arc<ConsoleInput>;

pub fn stdin_lines() -> SharedInput {
    shared_lines(BufReader::new(tokio::io::stdin()))
}

pub fn shared_lines<R>(reader: R) -> SharedInput
where
    R: AsyncBufRead + Send + Unpin + 'static,
{
    let boxed: Box<dyn AsyncBufRead + Send + Unpin> = Box::new(reader);
    Arc::new(ConsoleInput {
        lines: Mutex::new(boxed.lines()),
        queued: std::sync::Mutex::new(VecDeque::new()),
    })
}

pub async fn next_line(input: &SharedInput) -> Option<String> {
    input.next_line().await
}

pub struct ConsoleHost {
    trusted: bool,
    input: SharedInput,
}

impl std::fmt::Debug for ConsoleHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleHost")
            .field("trusted", &self.trusted)
            .field("input", &"SharedInput")
            .finish()
    }
}

impl ConsoleHost {
    pub fn new(trusted: bool, input: SharedInput) -> Self {
        Self { trusted, input }
    }
}

#[async_trait]
impl HostUi for ConsoleHost {
    fn show_info(&self, message: &str) {
        tracing::info!("{}", message);
        eprintln!("ℹ {}", message);
    }

    fn show_warning(&self, message: &str) {
        tracing::warn!("{}", message);
        eprintln!("⚠ {}", message);
    }

    fn write_clipboard(&self, text: &str) -> Result<()> {
        crate::clipboard::copy_text(text)
    }

    fn is_workspace_trusted(&self) -> bool {
        self.trusted
    }

    async fn confirm(&self, message: &str, detail: &str, choice: &str) -> Option<String> {
        eprintln!("{}", message);
        for line in detail.lines() {
            eprintln!("    {}", line);
        }
        eprintln!("Enter '{}' to continue, anything else cancels:", choice);

        loop {
            let line = self.input.next_line().await?;
            let answer = line.trim();
            if request_action(answer).is_some() {
                tracing::warn!("request arrived while a prompt was open; it will be asked next");
                self.input.queue_request(answer.to_string());
                eprintln!("(queued) Enter '{}' to continue, anything else cancels:", choice);
                continue;
            }
            return if answer.is_empty() {
                None
            } else {
                Some(answer.to_string())
            };
        }
    }
}
