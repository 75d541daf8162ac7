//! Transformation metrics between two states.

use std::collections::{BTreeMap, BTreeSet};

use codex_state::{ArchetypalState, RitualDefinition};
use serde::{Deserialize, Serialize};

use crate::config::AnalyzerConfig;

pub const ENERGY_INTEGRATION: &str = "energy_integration";
pub const SHADOW_INTEGRATION: &str = "shadow_integration";
pub const TRANSFORMATION_COMPLETION: &str = "transformation_completion";

/// What changed between a pre and a post state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationAnalysis {
    pub intensity: f64,
    pub emergent_symbols: Vec<String>,
    pub integration_required: Vec<String>,
    pub next_rituals: Vec<String>,
    pub oracle_recommended: bool,
}

/// An energy below a ritual's stated threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyShortfall {
    pub energy: String,
    pub required: f64,
    pub actual: f64,
}

/// Advisory prerequisite check for a ritual against a state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrerequisiteReport {
    pub missing_archetypes: Vec<String>,
    pub unmet_energies: Vec<EnergyShortfall>,
}

impl PrerequisiteReport {
    pub fn is_satisfied(&self) -> bool {
        self.missing_archetypes.is_empty() && self.unmet_energies.is_empty()
    }
}

/// Computes [`TransformationAnalysis`] under an [`AnalyzerConfig`].
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Compare `pre` and `post`. Depends on nothing but the inputs and the
    /// configuration.
    pub fn analyze(&self, pre: &ArchetypalState, post: &ArchetypalState) -> TransformationAnalysis {
        let intensity = self.intensity(pre, post);
        let emergent_symbols = emergent_symbols(pre, post);
        let integration_required = self.integration_required(post);
        let next_rituals = self.next_rituals(post, &emergent_symbols, &integration_required);
        let oracle_recommended =
            intensity > self.config.oracle_intensity_threshold || !emergent_symbols.is_empty();

        TransformationAnalysis {
            intensity,
            emergent_symbols,
            integration_required,
            next_rituals,
            oracle_recommended,
        }
    }

    /// Mean absolute delta over archetype and energy keys, plus weighted
    /// changes in integration and symbol counts.
    pub fn intensity(&self, pre: &ArchetypalState, post: &ArchetypalState) -> f64 {
        let (archetype_sum, archetype_keys) = delta_sum(&pre.archetypes, &post.archetypes);
        let (energy_sum, energy_keys) = delta_sum(&pre.energies, &post.energies);
        let keys = archetype_keys + energy_keys;
        let mean = if keys == 0 {
            0.0
        } else {
            (archetype_sum + energy_sum) / keys as f64
        };

        let integration_delta = count_delta(pre.integrations.len(), post.integrations.len());
        let symbol_delta = count_delta(pre.symbols.len(), post.symbols.len());

        mean + self.config.integration_weight * integration_delta
            + self.config.symbol_weight * symbol_delta
    }

    fn integration_required(&self, post: &ArchetypalState) -> Vec<String> {
        let mut required = Vec::new();
        if post.total_energy() > self.config.high_energy_threshold {
            required.push(ENERGY_INTEGRATION.to_string());
        }
        let unbalanced = self.config.complementary_pairs.iter().any(|(a, b)| {
            (post.activation(a) - post.activation(b)).abs() > self.config.balance_threshold
        });
        if unbalanced {
            required.push(SHADOW_INTEGRATION.to_string());
        }
        if post.transformations.len() > self.config.open_transformation_cap {
            required.push(TRANSFORMATION_COMPLETION.to_string());
        }
        required
    }

    fn next_rituals(
        &self,
        post: &ArchetypalState,
        emergent: &[String],
        integration_required: &[String],
    ) -> Vec<String> {
        let mut candidates: Vec<&str> = emergent
            .iter()
            .filter_map(|symbol| self.config.symbol_followups.get(symbol))
            .map(String::as_str)
            .collect();

        let mean_activation = if post.archetypes.is_empty() {
            0.0
        } else {
            post.archetypes.values().sum::<f64>() / post.archetypes.len() as f64
        };
        if mean_activation < self.config.low_activation_threshold {
            candidates.push(&self.config.low_activation_ritual);
        }

        let mut seen = BTreeSet::new();
        candidates
            .into_iter()
            .filter(|ritual| !integration_required.iter().any(|r| r == *ritual))
            .filter(|ritual| seen.insert(*ritual))
            .take(self.config.max_next_rituals)
            .map(str::to_string)
            .collect()
    }

    /// Report prerequisites `definition` declares that `state` does not meet.
    /// Never blocks execution.
    pub fn prerequisites(
        &self,
        definition: &RitualDefinition,
        state: &ArchetypalState,
    ) -> PrerequisiteReport {
        let missing_archetypes = definition
            .required_archetypes
            .iter()
            .filter(|name| state.activation(name) <= 0.0)
            .cloned()
            .collect();
        let unmet_energies = definition
            .energy_requirements
            .iter()
            .filter(|(name, required)| state.amplitude(name) < **required)
            .map(|(name, required)| EnergyShortfall {
                energy: name.clone(),
                required: *required,
                actual: state.amplitude(name),
            })
            .collect();
        PrerequisiteReport {
            missing_archetypes,
            unmet_energies,
        }
    }
}

/// Symbols in `post` that `pre` lacks, in `post` order.
pub fn emergent_symbols(pre: &ArchetypalState, post: &ArchetypalState) -> Vec<String> {
    let before: BTreeSet<&str> = pre.symbols.iter().map(String::as_str).collect();
    let mut seen = BTreeSet::new();
    post.symbols
        .iter()
        .filter(|s| !before.contains(s.as_str()) && seen.insert(s.as_str()))
        .cloned()
        .collect()
}

/// Sum of absolute deltas over the key union, and the union size.
fn delta_sum(pre: &BTreeMap<String, f64>, post: &BTreeMap<String, f64>) -> (f64, usize) {
    let keys: BTreeSet<&String> = pre.keys().chain(post.keys()).collect();
    let sum: f64 = keys
        .iter()
        .map(|key| {
            let before = pre.get(*key).copied().unwrap_or(0.0);
            let after = post.get(*key).copied().unwrap_or(0.0);
            (after - before).abs()
        })
        .sum();
    (sum, keys.len())
}

fn count_delta(before: usize, after: usize) -> f64 {
    before.abs_diff(after) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use codex_state::{IntegrationRecord, PractitionerId};

    fn analyzer() -> Analyzer {
        Analyzer::default()
    }

    fn base() -> ArchetypalState {
        ArchetypalState::new(PractitionerId::new())
            .with_archetype("Shadow", 0.2)
            .with_archetype("Light", 0.5)
            .with_energy("Fire", 0.3)
    }

    #[test]
    fn identical_states_have_no_intensity() {
        let state = ArchetypalState::seeded(PractitionerId::new()).with_symbol("∞");
        let analysis = analyzer().analyze(&state, &state);
        assert_eq!(analysis.intensity, 0.0);
        assert!(analysis.emergent_symbols.is_empty());
        assert!(!analysis.oracle_recommended);
    }

    #[test]
    fn empty_states_have_zero_mean_term() {
        let state = ArchetypalState::new(PractitionerId::new());
        assert_eq!(analyzer().intensity(&state, &state), 0.0);
    }

    #[test]
    fn intensity_combines_three_terms() {
        let pre = base();
        let post = pre
            .clone()
            .with_archetype("Shadow", 0.6)
            .with_energy("Air", 0.2)
            .with_symbol("🌑")
            .with_integration(IntegrationRecord::new("Balance", ""));

        // keys: Shadow, Light, Fire, Air -> (0.4 + 0 + 0 + 0.2) / 4
        let expected = 0.6 / 4.0 + 0.2 * 1.0 + 0.3 * 1.0;
        let intensity = analyzer().intensity(&pre, &post);
        assert!((intensity - expected).abs() < 1e-12);
    }

    #[test]
    fn missing_keys_count_as_zero() {
        let pre = ArchetypalState::new(PractitionerId::new()).with_archetype("Sage", 0.4);
        let post = ArchetypalState::new(PractitionerId::new()).with_archetype("Mystic", 0.2);
        let intensity = analyzer().intensity(&pre, &post);
        assert!((intensity - 0.3).abs() < 1e-12);
    }

    #[test]
    fn emergent_symbols_keep_post_order() {
        let pre = base().with_symbol("○");
        let post = pre.clone().with_symbol("⚡").with_symbol("🌑");
        assert_eq!(emergent_symbols(&pre, &post), vec!["⚡", "🌑"]);
    }

    #[test]
    fn integration_requirements_fire_on_thresholds() {
        let post = ArchetypalState::new(PractitionerId::new())
            .with_archetype("Shadow", 0.9)
            .with_archetype("Light", 0.1)
            .with_energy("Fire", 0.9)
            .with_energy("Water", 0.9)
            .with_energy("Earth", 0.9)
            .with_transformation("a")
            .with_transformation("b")
            .with_transformation("c")
            .with_transformation("d");
        let analysis = analyzer().analyze(&post, &post);
        assert_eq!(
            analysis.integration_required,
            vec![ENERGY_INTEGRATION, SHADOW_INTEGRATION, TRANSFORMATION_COMPLETION]
        );
    }

    #[test]
    fn thresholds_are_exclusive() {
        let post = ArchetypalState::new(PractitionerId::new())
            .with_archetype("Shadow", 0.75)
            .with_archetype("Light", 0.25)
            .with_energy("Fire", 1.0)
            .with_energy("Water", 1.0)
            .with_transformation("a")
            .with_transformation("b")
            .with_transformation("c");
        let analysis = analyzer().analyze(&post, &post);
        assert!(analysis.integration_required.is_empty());
    }

    #[test]
    fn oracle_recommended_on_emergence_or_intensity() {
        let pre = base();
        let post = pre.clone().with_symbol("⚡");
        assert!(analyzer().analyze(&pre, &post).oracle_recommended);

        let jolted = pre
            .clone()
            .with_archetype("Shadow", 1.0)
            .with_archetype("Light", 0.0)
            .with_energy("Fire", 1.0);
        // (0.8 + 0.5 + 0.7) / 3 = 0.667, not above 0.7
        assert!(!analyzer().analyze(&pre, &jolted).oracle_recommended);

        let config = AnalyzerConfig {
            oracle_intensity_threshold: 0.5,
            ..AnalyzerConfig::default()
        };
        assert!(Analyzer::new(config).analyze(&pre, &jolted).oracle_recommended);
    }

    #[test]
    fn next_rituals_follow_symbols_and_skip_required() {
        let pre = ArchetypalState::new(PractitionerId::new())
            .with_archetype("Sage", 0.8)
            .with_archetype("Shadow", 0.9)
            .with_archetype("Light", 0.8);
        let post = pre
            .clone()
            .with_symbol("🌑")
            .with_symbol("⚡")
            .with_symbol("∞")
            .with_symbol("🔮");
        let analysis = analyzer().analyze(&pre, &post);
        assert_eq!(
            analysis.next_rituals,
            vec!["light_work", "energy_channeling", "void_contemplation"]
        );
    }

    #[test]
    fn low_activation_suggests_invocation() {
        let pre = ArchetypalState::new(PractitionerId::new()).with_archetype("Sage", 0.1);
        let analysis = analyzer().analyze(&pre, &pre);
        assert_eq!(analysis.next_rituals, vec!["archetype_invocation"]);
    }

    #[test]
    fn prerequisites_report_gaps() {
        let definition = RitualDefinition::native("shadow_integration", "")
            .requiring_archetype("Shadow")
            .requiring_archetype("Sage")
            .requiring_energy("Fire", 0.6)
            .requiring_energy("Void", 0.3);
        let state = ArchetypalState::new(PractitionerId::new())
            .with_archetype("Shadow", 0.4)
            .with_energy("Fire", 0.2)
            .with_energy("Void", 0.5);

        let report = analyzer().prerequisites(&definition, &state);
        assert_eq!(report.missing_archetypes, vec!["Sage"]);
        assert_eq!(
            report.unmet_energies,
            vec![EnergyShortfall {
                energy: "Fire".to_string(),
                required: 0.6,
                actual: 0.2,
            }]
        );
        assert!(!report.is_satisfied());
    }
}
