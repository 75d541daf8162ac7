//! Locating and loading the configuration file.

use std::path::{Path, PathBuf};

use codex::CodexConfig;

use crate::error::Result;
use crate::files::read_json;

/// `<config dir>/codex/config.json`, where the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("codex").join("config.json"))
}

/// Load `explicit` if given, else the default file if it exists, else the
/// built-in defaults.
pub fn load(explicit: Option<&Path>) -> Result<CodexConfig> {
    if let Some(path) = explicit {
        return read_json(path);
    }
    match default_config_path() {
        Some(path) if path.is_file() => {
            tracing::debug!(path = %path.display(), "loading default config");
            read_json(&path)
        }
        _ => Ok(CodexConfig::default()),
    }
}
