//! Errors surfaced by the engine.

use codex_registry::RegistryError;
use codex_sandbox::{LimitKind, SandboxError};
use codex_state::{PractitionerId, StateError};
use thiserror::Error;

/// Why a ritual execution did not commit.
///
/// Every variant names the ritual and the practitioner whose state was left
/// untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RitualExecutionError {
    /// The input state is out of range or its hash does not match its
    /// content.
    #[error("state for {practitioner_id} rejected before running {ritual_id}: {source}")]
    InvalidState {
        ritual_id: String,
        practitioner_id: PractitionerId,
        source: StateError,
    },

    #[error("ritual {ritual_id} not found")]
    ModuleNotFound {
        ritual_id: String,
        practitioner_id: PractitionerId,
    },

    /// Hash mismatch, ABI shape failure, or a malformed definition.
    #[error("ritual {ritual_id} failed verification: {reason}")]
    IntegrityMismatch {
        ritual_id: String,
        practitioner_id: PractitionerId,
        reason: String,
    },

    /// Nonzero status or trap.
    #[error("ritual {ritual_id} faulted for {practitioner_id}: {message}")]
    ModuleFault {
        ritual_id: String,
        practitioner_id: PractitionerId,
        status: Option<i32>,
        message: String,
    },

    #[error("ritual {ritual_id} timed out for {practitioner_id}")]
    Timeout {
        ritual_id: String,
        practitioner_id: PractitionerId,
    },

    #[error("ritual {ritual_id} exceeded its {limit} for {practitioner_id}")]
    ResourceLimitExceeded {
        ritual_id: String,
        practitioner_id: PractitionerId,
        limit: LimitKind,
    },

    #[error("ritual {ritual_id} conflicts with another execution for {practitioner_id}: {reason}")]
    ConcurrentExecutionConflict {
        ritual_id: String,
        practitioner_id: PractitionerId,
        reason: String,
    },

    /// Loading or saving through the state repository failed.
    #[error("persistence failed for {practitioner_id} running {ritual_id}: {message}")]
    Persistence {
        ritual_id: String,
        practitioner_id: PractitionerId,
        message: String,
    },

    #[error("ritual {ritual_id} was cancelled for {practitioner_id}")]
    Cancelled {
        ritual_id: String,
        practitioner_id: PractitionerId,
    },
}

impl RitualExecutionError {
    pub fn ritual_id(&self) -> &str {
        match self {
            RitualExecutionError::InvalidState { ritual_id, .. }
            | RitualExecutionError::ModuleNotFound { ritual_id, .. }
            | RitualExecutionError::IntegrityMismatch { ritual_id, .. }
            | RitualExecutionError::ModuleFault { ritual_id, .. }
            | RitualExecutionError::Timeout { ritual_id, .. }
            | RitualExecutionError::ResourceLimitExceeded { ritual_id, .. }
            | RitualExecutionError::ConcurrentExecutionConflict { ritual_id, .. }
            | RitualExecutionError::Persistence { ritual_id, .. }
            | RitualExecutionError::Cancelled { ritual_id, .. } => ritual_id,
        }
    }

    pub fn practitioner_id(&self) -> PractitionerId {
        match self {
            RitualExecutionError::InvalidState { practitioner_id, .. }
            | RitualExecutionError::ModuleNotFound { practitioner_id, .. }
            | RitualExecutionError::IntegrityMismatch { practitioner_id, .. }
            | RitualExecutionError::ModuleFault { practitioner_id, .. }
            | RitualExecutionError::Timeout { practitioner_id, .. }
            | RitualExecutionError::ResourceLimitExceeded { practitioner_id, .. }
            | RitualExecutionError::ConcurrentExecutionConflict { practitioner_id, .. }
            | RitualExecutionError::Persistence { practitioner_id, .. }
            | RitualExecutionError::Cancelled { practitioner_id, .. } => *practitioner_id,
        }
    }

    /// Timeouts and budget overruns, the failures worth counting per ritual
    /// for abuse detection.
    pub fn is_limit_violation(&self) -> bool {
        matches!(
            self,
            RitualExecutionError::Timeout { .. }
                | RitualExecutionError::ResourceLimitExceeded { .. }
        )
    }

    pub(crate) fn from_registry(
        error: RegistryError,
        ritual_id: &str,
        practitioner_id: PractitionerId,
    ) -> Self {
        let ritual_id = ritual_id.to_string();
        match error {
            RegistryError::ModuleNotFound { .. } => RitualExecutionError::ModuleNotFound {
                ritual_id,
                practitioner_id,
            },
            RegistryError::IntegrityMismatch { reason, .. } => {
                RitualExecutionError::IntegrityMismatch {
                    ritual_id,
                    practitioner_id,
                    reason,
                }
            }
            RegistryError::InvalidDefinition(inner) => RitualExecutionError::IntegrityMismatch {
                ritual_id,
                practitioner_id,
                reason: inner.to_string(),
            },
        }
    }

    pub(crate) fn from_sandbox(
        error: SandboxError,
        ritual_id: &str,
        practitioner_id: PractitionerId,
    ) -> Self {
        let ritual_id = ritual_id.to_string();
        match error {
            SandboxError::Compile(reason) | SandboxError::AbiMismatch(reason) => {
                RitualExecutionError::IntegrityMismatch {
                    ritual_id,
                    practitioner_id,
                    reason,
                }
            }
            SandboxError::ModuleFault { status, message } => RitualExecutionError::ModuleFault {
                ritual_id,
                practitioner_id,
                status,
                message: match status {
                    Some(code) if message.is_empty() => format!("module returned status {}", code),
                    _ => message,
                },
            },
            SandboxError::Timeout => RitualExecutionError::Timeout {
                ritual_id,
                practitioner_id,
            },
            SandboxError::ResourceLimitExceeded(limit) => {
                RitualExecutionError::ResourceLimitExceeded {
                    ritual_id,
                    practitioner_id,
                    limit,
                }
            }
            SandboxError::Cancelled => RitualExecutionError::Cancelled {
                ritual_id,
                practitioner_id,
            },
            SandboxError::Engine(message) => RitualExecutionError::ModuleFault {
                ritual_id,
                practitioner_id,
                status: None,
                message,
            },
        }
    }
}

/// Failures reported by a [`crate::StateRepository`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("no state stored for {0}")]
    NotFound(PractitionerId),

    /// The stored version moved on since the state was loaded.
    #[error("version conflict for {practitioner_id}: stored {stored}, saving {saving}")]
    Conflict {
        practitioner_id: PractitionerId,
        stored: u64,
        saving: u64,
    },

    #[error("repository backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, RitualExecutionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sandbox_errors_keep_ids() {
        let id = PractitionerId::new();
        let err = RitualExecutionError::from_sandbox(
            SandboxError::ResourceLimitExceeded(LimitKind::RandomCalls),
            "greedy",
            id,
        );
        assert_eq!(err.ritual_id(), "greedy");
        assert_eq!(err.practitioner_id(), id);
        assert!(err.is_limit_violation());
        assert!(err.to_string().contains("random call budget"));
    }

    #[test]
    fn status_fault_gets_a_message() {
        let err = RitualExecutionError::from_sandbox(
            SandboxError::ModuleFault {
                status: Some(7),
                message: String::new(),
            },
            "failing",
            PractitionerId::new(),
        );
        match err {
            RitualExecutionError::ModuleFault {
                status, message, ..
            } => {
                assert_eq!(status, Some(7));
                assert_eq!(message, "module returned status 7");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn registry_errors_map_through() {
        let id = PractitionerId::new();
        let err = RitualExecutionError::from_registry(
            RegistryError::ModuleNotFound {
                ritual_id: "moon".into(),
            },
            "moon",
            id,
        );
        assert!(matches!(err, RitualExecutionError::ModuleNotFound { .. }));
        assert!(!err.is_limit_violation());

        let err = RitualExecutionError::from_registry(
            RegistryError::InvalidDefinition(codex_state::StateError::InvalidDefinition {
                name: "moon".into(),
                reason: "empty module bytes".into(),
            }),
            "moon",
            id,
        );
        assert!(matches!(
            err,
            RitualExecutionError::IntegrityMismatch { ref reason, .. } if reason.contains("empty module bytes")
        ));
    }
}
