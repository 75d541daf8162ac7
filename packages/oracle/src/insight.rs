//! What the oracle is asked about and what it answers.

use serde::{Deserialize, Serialize};

/// Model identifier reported by the fallback insight.
pub const FALLBACK_MODEL: &str = "fallback";

const FALLBACK_INTERPRETATION: &str = "The oracle is silent for now. The working stands on \
its own: sit with the symbols that emerged, note what shifted, and return to this reading \
when the oracle can be reached.";

/// The ritual a reading is requested for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RitualContext {
    pub ritual_name: String,
    pub intention: String,
    pub intensity: f64,
}

impl RitualContext {
    pub fn new(ritual_name: impl Into<String>, intention: impl Into<String>, intensity: f64) -> Self {
        Self {
            ritual_name: ritual_name.into(),
            intention: intention.into(),
            intensity,
        }
    }
}

/// Named parts of a reading, when the model produced them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightSections {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbolic_analysis: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_guidance: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergent_symbols: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cautions: Option<String>,
}

impl InsightSections {
    pub fn is_empty(&self) -> bool {
        self.symbolic_analysis.is_none()
            && self.integration_guidance.is_none()
            && self.emergent_symbols.is_none()
            && self.cautions.is_none()
    }
}

/// A narrative reading of a transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleInsight {
    pub interpretation: String,

    #[serde(default)]
    pub sections: InsightSections,

    pub model: String,

    pub confidence_score: f64,

    /// Set when the oracle could not be reached and this is the canned reading.
    #[serde(default)]
    pub fallback: bool,
}

impl OracleInsight {
    /// The deterministic reading returned whenever the oracle call fails.
    pub fn fallback() -> Self {
        Self {
            interpretation: FALLBACK_INTERPRETATION.to_string(),
            sections: InsightSections::default(),
            model: FALLBACK_MODEL.to_string(),
            confidence_score: 0.0,
            fallback: true,
        }
    }
}
