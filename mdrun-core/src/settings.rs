//! Extension settings.
//!
//! Read-only to the pipeline: the host loads them (or hands over a changed
//! copy) and the engine rebuilds whatever depends on them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::SettingsError;
use crate::runtime::languages::{ExecutionStrategy, LanguageTable};

pub const DEFAULT_TERMINAL_NAME: &str = "MD Run";
pub const DEFAULT_SUMMARY_MAX_CHARS: usize = 60;

pub fn default_supported_languages() -> Vec<String> {
    ["bash", "sh", "shell", "zsh", "console", "terminal", ""]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Keep sending to the same terminal while it is alive.
    pub reuse_terminal: bool,
    pub debug_logging: bool,
    /// Tags that get Run/Type buttons. `""` means fences without a tag.
    pub supported_languages: Vec<String>,
    /// Per-tag strategy overrides layered over the built-in table.
    pub languages: BTreeMap<String, ExecutionStrategy>,
    pub terminal_name: String,
    /// Bound on the first-line preview shown in confirmation prompts.
    pub summary_max_chars: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reuse_terminal: true,
            debug_logging: false,
            supported_languages: default_supported_languages(),
            languages: BTreeMap::new(),
            terminal_name: DEFAULT_TERMINAL_NAME.to_string(),
            summary_max_chars: DEFAULT_SUMMARY_MAX_CHARS,
        }
    }
}

impl Settings {
    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load from `path`. A missing file means defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_json(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(SettingsError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    pub fn language_table(&self) -> LanguageTable {
        LanguageTable::with_overrides(&self.languages)
    }
}
