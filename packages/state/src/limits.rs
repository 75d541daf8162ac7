//! Range limits and clamping rules.

use serde::{Deserialize, Serialize};

/// Upper bound for archetype activations.
pub const MAX_ACTIVATION: f64 = 1.0;

/// Configured bounds applied whenever values enter a state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateLimits {
    /// Per-dimension ceiling for energy amplitudes.
    pub max_energy: f64,

    /// Maximum number of symbols a single execution may add.
    pub max_symbols_per_execution: usize,

    /// Maximum byte length of a single symbol.
    pub max_symbol_bytes: usize,
}

impl Default for StateLimits {
    fn default() -> Self {
        Self {
            max_energy: 1.0,
            max_symbols_per_execution: 16,
            max_symbol_bytes: 64,
        }
    }
}

/// Clamp an activation into [0, 1].
pub fn clamp_unit(value: f64) -> f64 {
    clamp_with_max(value, MAX_ACTIVATION)
}

/// Clamp into [0, max], mapping NaN to 0 and infinities to the nearest bound.
///
/// `f64::clamp` propagates NaN, which would let a module smuggle a NaN into
/// committed state.
pub fn clamp_with_max(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.max(0.0).min(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_unit_bounds() {
        assert_eq!(clamp_unit(-0.5), 0.0);
        assert_eq!(clamp_unit(0.25), 0.25);
        assert_eq!(clamp_unit(7.0), 1.0);
    }

    #[test]
    fn clamp_handles_non_finite() {
        assert_eq!(clamp_with_max(f64::NAN, 2.0), 0.0);
        assert_eq!(clamp_with_max(f64::INFINITY, 2.0), 2.0);
        assert_eq!(clamp_with_max(f64::NEG_INFINITY, 2.0), 0.0);
    }

    #[test]
    fn default_limits() {
        let limits = StateLimits::default();
        assert_eq!(limits.max_energy, 1.0);
        assert_eq!(limits.max_symbols_per_execution, 16);
    }
}
