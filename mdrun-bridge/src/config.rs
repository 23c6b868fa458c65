use anyhow::{Context, Result};
use directories::ProjectDirs;
use mdrun_core::Settings;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "mdrun.json";

/// `mdrun.json` in the platform config directory.
pub fn default_settings_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "DrTomLLC", "mdrun").map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
}

/// An explicit path wins over the platform default.
pub fn settings_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(default_settings_path)
}

/// Load settings. A missing file yields defaults; a malformed one is an error.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    let Some(path) = settings_path(explicit) else {
        tracing::debug!("no config directory on this platform, using defaults");
        return Ok(Settings::default());
    };

    Settings::load(&path).with_context(|| format!("Failed to load settings from {}", path.display()))
}
