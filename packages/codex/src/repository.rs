//! Where practitioner states live between executions.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use codex_state::{ArchetypalState, PractitionerId};

use crate::error::RepositoryError;

/// Persistence collaborator used by [`crate::RitualEngine::perform`].
///
/// `save` must refuse a state whose version does not advance past the
/// stored one, so a lost update surfaces as [`RepositoryError::Conflict`].
#[async_trait]
pub trait StateRepository: Send + Sync {
    async fn load(&self, id: PractitionerId) -> Result<ArchetypalState, RepositoryError>;

    async fn save(&self, state: &ArchetypalState) -> Result<(), RepositoryError>;
}

/// A map-backed repository with version-checked saves.
#[derive(Debug, Default)]
pub struct InMemoryStateRepository {
    states: RwLock<HashMap<PractitionerId, ArchetypalState>>,
}

impl InMemoryStateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `state` unconditionally.
    pub fn insert(&self, state: ArchetypalState) {
        let mut states = self.states.write().unwrap_or_else(|e| e.into_inner());
        states.insert(state.practitioner_id, state);
    }

    pub fn get(&self, id: PractitionerId) -> Option<ArchetypalState> {
        let states = self.states.read().unwrap_or_else(|e| e.into_inner());
        states.get(&id).cloned()
    }
}

#[async_trait]
impl StateRepository for InMemoryStateRepository {
    async fn load(&self, id: PractitionerId) -> Result<ArchetypalState, RepositoryError> {
        self.get(id).ok_or(RepositoryError::NotFound(id))
    }

    async fn save(&self, state: &ArchetypalState) -> Result<(), RepositoryError> {
        let mut states = self.states.write().unwrap_or_else(|e| e.into_inner());
        if let Some(stored) = states.get(&state.practitioner_id) {
            if state.version <= stored.version {
                return Err(RepositoryError::Conflict {
                    practitioner_id: state.practitioner_id,
                    stored: stored.version,
                    saving: state.version,
                });
            }
        }
        states.insert(state.practitioner_id, state.clone());
        Ok(())
    }
}
