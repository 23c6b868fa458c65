pub mod airlock;
pub mod blocks;
pub mod channel;
pub mod engine;
pub mod error;
pub mod host;
pub mod lens;
pub mod render;
pub mod runner;
pub mod runtime;
pub mod settings;
pub mod terminal;

// Re-export the main struct so hosts can just use `mdrun_core::MdRunEngine`
pub use engine::MdRunEngine;

pub use blocks::{parse_code_blocks, CodeBlock};
pub use runtime::{classify, Classification, ExecutionStrategy};
pub use settings::Settings;

use serde::{Deserialize, Serialize};

/// Whether the Enter key follows the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunAction {
    /// Send and execute.
    Run,
    /// Place the text at the prompt, user presses Enter.
    Type,
}

/// One block handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub raw_content: String,
    pub language: String,
    pub action: RunAction,
}

impl DispatchRequest {
    pub fn new(raw_content: impl Into<String>, language: impl Into<String>, action: RunAction) -> Self {
        Self {
            raw_content: raw_content.into(),
            language: language.into(),
            action,
        }
    }
}
