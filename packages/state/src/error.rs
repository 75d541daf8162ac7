//! Error types for the state model.

use thiserror::Error;

/// Errors raised when a state or definition fails validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StateError {
    /// An archetype activation lies outside [0, 1] or is not finite.
    #[error("archetype {name} activation {value} out of range [0, 1]")]
    ArchetypeOutOfRange { name: String, value: f64 },

    /// An energy amplitude lies outside [0, max_energy] or is not finite.
    #[error("energy {name} amplitude {value} out of range [0, {max}]")]
    EnergyOutOfRange { name: String, value: f64, max: f64 },

    /// The stored hash does not match the content.
    #[error("state hash mismatch: stored {stored}, computed {computed}")]
    HashMismatch { stored: String, computed: String },

    /// A ritual definition is malformed.
    #[error("invalid ritual definition {name}: {reason}")]
    InvalidDefinition { name: String, reason: String },

    /// Canonical serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StateError {
    fn from(error: serde_json::Error) -> Self {
        StateError::Serialization(error.to_string())
    }
}

/// Result type alias for state operations.
pub type Result<T> = std::result::Result<T, StateError>;
