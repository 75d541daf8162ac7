//! Per-execution mutation buffer.

use std::collections::BTreeMap;

use crate::limits::{clamp_unit, clamp_with_max, StateLimits};

/// What happened to a symbol offered to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolOutcome {
    Added,
    /// Already buffered by this execution.
    Duplicate,
    /// Over the per-execution cap or the byte limit.
    Dropped,
}

/// Writes staged by a single ritual execution.
///
/// Values are clamped on the way in, so reading back a write returns the
/// value that would be committed. The buffer never touches live state; it is
/// either merged whole by [`crate::ArchetypalState::commit`] or discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationBuffer {
    archetypes: BTreeMap<String, f64>,
    energies: BTreeMap<String, f64>,
    symbols: Vec<String>,
    symbols_dropped: usize,
    max_energy: f64,
    max_symbols: usize,
    max_symbol_bytes: usize,
}

impl MutationBuffer {
    pub fn new(limits: &StateLimits) -> Self {
        Self {
            archetypes: BTreeMap::new(),
            energies: BTreeMap::new(),
            symbols: Vec::new(),
            symbols_dropped: 0,
            max_energy: limits.max_energy,
            max_symbols: limits.max_symbols_per_execution,
            max_symbol_bytes: limits.max_symbol_bytes,
        }
    }

    /// Stage an archetype activation. Returns the clamped value.
    pub fn set_archetype(&mut self, name: impl Into<String>, value: f64) -> f64 {
        let value = clamp_unit(value);
        self.archetypes.insert(name.into(), value);
        value
    }

    /// Stage an energy amplitude. Returns the clamped value.
    pub fn set_energy(&mut self, name: impl Into<String>, value: f64) -> f64 {
        let value = clamp_with_max(value, self.max_energy);
        self.energies.insert(name.into(), value);
        value
    }

    /// Stage a symbol, deduplicated and bounded.
    pub fn add_symbol(&mut self, symbol: impl Into<String>) -> SymbolOutcome {
        let symbol = symbol.into();
        if self.symbols.iter().any(|s| *s == symbol) {
            return SymbolOutcome::Duplicate;
        }
        if symbol.is_empty()
            || symbol.len() > self.max_symbol_bytes
            || self.symbols.len() >= self.max_symbols
        {
            self.symbols_dropped += 1;
            return SymbolOutcome::Dropped;
        }
        self.symbols.push(symbol);
        SymbolOutcome::Added
    }

    /// The staged activation for `name`, if this execution wrote one.
    pub fn archetype(&self, name: &str) -> Option<f64> {
        self.archetypes.get(name).copied()
    }

    /// The staged amplitude for `name`, if this execution wrote one.
    pub fn energy(&self, name: &str) -> Option<f64> {
        self.energies.get(name).copied()
    }

    pub fn archetypes(&self) -> &BTreeMap<String, f64> {
        &self.archetypes
    }

    pub fn energies(&self) -> &BTreeMap<String, f64> {
        &self.energies
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn symbols_dropped(&self) -> usize {
        self.symbols_dropped
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty() && self.energies.is_empty() && self.symbols.is_empty()
    }
}

impl Default for MutationBuffer {
    fn default() -> Self {
        Self::new(&StateLimits::default())
    }
}
