//! CLI errors.

use std::path::PathBuf;

use codex::RitualExecutionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: invalid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid --parameters: {0}")]
    Parameters(String),

    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),

    #[error(transparent)]
    Execution(#[from] RitualExecutionError),
}

pub type Result<T> = std::result::Result<T, CliError>;
