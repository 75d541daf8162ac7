//! Analyzer thresholds and weights.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Tunable constants for [`crate::Analyzer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Weight of the change in integration count.
    pub integration_weight: f64,

    /// Weight of the change in symbol count.
    pub symbol_weight: f64,

    /// Total post-state energy above which `energy_integration` is required.
    pub high_energy_threshold: f64,

    /// Activation gap within a complementary pair above which
    /// `shadow_integration` is required.
    pub balance_threshold: f64,

    /// Open transformations above which `transformation_completion` is
    /// required.
    pub open_transformation_cap: usize,

    /// Intensity above which an oracle reading is recommended.
    pub oracle_intensity_threshold: f64,

    pub complementary_pairs: Vec<(String, String)>,

    /// Emergent symbol to follow-up ritual.
    pub symbol_followups: BTreeMap<String, String>,

    /// Mean archetype activation below which `low_activation_ritual` is
    /// suggested.
    pub low_activation_threshold: f64,

    pub low_activation_ritual: String,

    pub max_next_rituals: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        let symbol_followups = [
            ("🌑", "light_work"),
            ("⚡", "energy_channeling"),
            ("∞", "void_contemplation"),
            ("🔮", "archetype_invocation"),
        ]
        .into_iter()
        .map(|(symbol, ritual)| (symbol.to_string(), ritual.to_string()))
        .collect();

        Self {
            integration_weight: 0.2,
            symbol_weight: 0.3,
            high_energy_threshold: 2.0,
            balance_threshold: 0.5,
            open_transformation_cap: 3,
            oracle_intensity_threshold: 0.7,
            complementary_pairs: vec![("Shadow".to_string(), "Light".to_string())],
            symbol_followups,
            low_activation_threshold: 0.3,
            low_activation_ritual: "archetype_invocation".to_string(),
            max_next_rituals: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: AnalyzerConfig =
            serde_json::from_str(r#"{"symbol_weight": 0.5, "max_next_rituals": 1}"#).unwrap();
        assert_eq!(config.symbol_weight, 0.5);
        assert_eq!(config.max_next_rituals, 1);
        assert_eq!(config.integration_weight, 0.2);
        assert_eq!(config.symbol_followups.get("🌑").unwrap(), "light_work");
    }
}
