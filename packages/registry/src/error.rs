//! Error types for the registry.

use codex_sandbox::SandboxError;
use codex_state::StateError;
use thiserror::Error;

/// Errors raised while resolving or verifying a ritual.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    /// No definition or native handler exists for the id.
    #[error("ritual not found: {ritual_id}")]
    ModuleNotFound { ritual_id: String },

    /// Hash mismatch, invalid module, or ABI shape failure.
    #[error("integrity check failed for {ritual_id}: {reason}")]
    IntegrityMismatch { ritual_id: String, reason: String },

    /// The catalog returned a malformed definition.
    #[error("invalid definition: {0}")]
    InvalidDefinition(#[from] StateError),
}

impl RegistryError {
    pub(crate) fn integrity(ritual_id: &str, error: SandboxError) -> Self {
        RegistryError::IntegrityMismatch {
            ritual_id: ritual_id.to_string(),
            reason: error.to_string(),
        }
    }
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
