//! # Codex Analyzer
//!
//! Pure functions over a `(pre, post)` pair of archetypal states.
//!
//! ```text
//! intensity = mean |Δ| over archetype and energy keys
//!           + integration_weight * |Δ integrations|
//!           + symbol_weight      * |Δ symbols|
//! ```
//!
//! Emergent symbols, integration requirements, and follow-up suggestions are
//! derived from the post state; every threshold lives in [`AnalyzerConfig`].

pub mod analysis;
pub mod config;

pub use analysis::{
    emergent_symbols, Analyzer, EnergyShortfall, PrerequisiteReport, TransformationAnalysis,
};
pub use config::AnalyzerConfig;

use codex_state::ArchetypalState;

/// Analyze with the default configuration.
pub fn analyze(pre: &ArchetypalState, post: &ArchetypalState) -> TransformationAnalysis {
    Analyzer::default().analyze(pre, post)
}
