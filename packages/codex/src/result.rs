//! What a successful execution returns.

use codex_analyzer::{PrerequisiteReport, TransformationAnalysis};
use codex_state::{ArchetypalState, PractitionerId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The committed state plus everything learned while producing it.
///
/// Built fresh per execution and never persisted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationResult {
    pub execution_id: Uuid,
    pub ritual_id: String,
    pub practitioner_id: PractitionerId,
    pub intention: String,
    pub new_state: ArchetypalState,

    /// Intensity, emergent symbols, and follow-up suggestions.
    #[serde(flatten)]
    pub analysis: TransformationAnalysis,

    /// Advisory: prerequisites the pre-state did not meet.
    pub unmet_prerequisites: PrerequisiteReport,

    /// The module's self-reported resonance, when it gave one.
    pub resonance: Option<f64>,

    pub module_logs: Vec<String>,
    pub host_calls: u64,
    pub random_calls: u64,
    pub symbols_dropped: usize,
    pub duration_ms: u64,
}

impl TransformationResult {
    pub fn intensity(&self) -> f64 {
        self.analysis.intensity
    }

    pub fn emergent_symbols(&self) -> &[String] {
        &self.analysis.emergent_symbols
    }
}
