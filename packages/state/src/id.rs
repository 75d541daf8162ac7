//! Practitioner identifiers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a practitioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PractitionerId(Uuid);

impl PractitionerId {
    /// Create a new random PractitionerId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a PractitionerId from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PractitionerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PractitionerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PractitionerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}
