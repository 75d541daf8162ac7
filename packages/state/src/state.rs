//! The practitioner's symbolic state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, StateError};
use crate::id::PractitionerId;
use crate::limits::{clamp_unit, clamp_with_max, StateLimits};
use crate::mutation::MutationBuffer;

/// A piece of integrated wisdom recorded against the state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationRecord {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl IntegrationRecord {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A practitioner's archetypal state.
///
/// The state is a value: every mutating operation returns a new state and
/// leaves `self` untouched. Ritual executions reach it only through
/// [`ArchetypalState::commit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypalState {
    pub practitioner_id: PractitionerId,
    #[serde(default)]
    pub archetypes: BTreeMap<String, f64>,
    #[serde(default)]
    pub energies: BTreeMap<String, f64>,
    #[serde(default)]
    pub integrations: Vec<IntegrationRecord>,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub transformations: Vec<String>,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub state_hash: String,
}

impl ArchetypalState {
    /// Create an empty, sealed state.
    pub fn new(practitioner_id: PractitionerId) -> Self {
        let mut state = Self {
            practitioner_id,
            archetypes: BTreeMap::new(),
            energies: BTreeMap::new(),
            integrations: Vec::new(),
            symbols: Vec::new(),
            transformations: Vec::new(),
            version: 0,
            state_hash: String::new(),
        };
        state.reseal();
        state
    }

    /// Create the starting state handed to new practitioners.
    pub fn seeded(practitioner_id: PractitionerId) -> Self {
        Self::new(practitioner_id)
            .with_archetype("Sage", 0.1)
            .with_archetype("Shadow", 0.1)
            .with_archetype("Anima", 0.1)
            .with_archetype("Creator", 0.1)
            .with_energy("Fire", 0.3)
            .with_energy("Water", 0.3)
            .with_energy("Earth", 0.3)
            .with_energy("Air", 0.3)
            .with_energy("Void", 0.2)
    }

    /// Set an archetype activation, clamped to [0, 1].
    pub fn with_archetype(mut self, name: impl Into<String>, activation: f64) -> Self {
        self.archetypes.insert(name.into(), clamp_unit(activation));
        self.resealed()
    }

    /// Set an energy amplitude, clamped to [0, default max_energy].
    pub fn with_energy(self, name: impl Into<String>, amplitude: f64) -> Self {
        self.with_energy_limited(name, amplitude, &StateLimits::default())
    }

    /// Set an energy amplitude, clamped to [0, limits.max_energy].
    pub fn with_energy_limited(
        mut self,
        name: impl Into<String>,
        amplitude: f64,
        limits: &StateLimits,
    ) -> Self {
        self.energies
            .insert(name.into(), clamp_with_max(amplitude, limits.max_energy));
        self.resealed()
    }

    /// Append a symbol if it is not already present.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        if !self.has_symbol(&symbol) {
            self.symbols.push(symbol);
        }
        self.resealed()
    }

    pub fn with_integration(mut self, record: IntegrationRecord) -> Self {
        self.integrations.push(record);
        self.resealed()
    }

    pub fn with_transformation(mut self, marker: impl Into<String>) -> Self {
        self.transformations.push(marker.into());
        self.resealed()
    }

    /// Activation of an archetype, or 0.0 when absent.
    pub fn activation(&self, name: &str) -> f64 {
        self.archetypes.get(name).copied().unwrap_or(0.0)
    }

    /// Amplitude of an energy, or 0.0 when absent.
    pub fn amplitude(&self, name: &str) -> f64 {
        self.energies.get(name).copied().unwrap_or(0.0)
    }

    /// Sum of all energy amplitudes.
    pub fn total_energy(&self) -> f64 {
        self.energies.values().sum()
    }

    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }

    /// Merge a mutation buffer into a new state.
    ///
    /// Clamps every buffered value, appends buffered symbols not already
    /// present, bumps the version, and recomputes the hash. This is the only
    /// path by which a ritual execution changes state.
    pub fn commit(&self, buffer: &MutationBuffer, limits: &StateLimits) -> ArchetypalState {
        let mut next = self.clone();
        for (name, value) in buffer.archetypes() {
            next.archetypes.insert(name.clone(), clamp_unit(*value));
        }
        for (name, value) in buffer.energies() {
            next.energies
                .insert(name.clone(), clamp_with_max(*value, limits.max_energy));
        }
        for symbol in buffer.symbols() {
            if !next.has_symbol(symbol) {
                next.symbols.push(symbol.clone());
            }
        }
        next.version = self.version.saturating_add(1);
        next.reseal();
        next
    }

    /// Check ranges and the content hash.
    pub fn validate(&self, limits: &StateLimits) -> Result<()> {
        for (name, &value) in &self.archetypes {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(StateError::ArchetypeOutOfRange {
                    name: name.clone(),
                    value,
                });
            }
        }
        for (name, &value) in &self.energies {
            if !value.is_finite() || !(0.0..=limits.max_energy).contains(&value) {
                return Err(StateError::EnergyOutOfRange {
                    name: name.clone(),
                    value,
                    max: limits.max_energy,
                });
            }
        }
        let computed = self.compute_hash();
        if computed != self.state_hash {
            return Err(StateError::HashMismatch {
                stored: self.state_hash.clone(),
                computed,
            });
        }
        Ok(())
    }

    /// Whether the stored hash still matches the content.
    pub fn verify_hash(&self) -> bool {
        self.compute_hash() == self.state_hash
    }

    /// SHA-256 over a canonical, length-prefixed encoding of every field but
    /// the hash itself. Maps are visited in key order.
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.practitioner_id.as_uuid().as_bytes());
        hasher.update(self.version.to_le_bytes());

        hasher.update((self.archetypes.len() as u64).to_le_bytes());
        for (name, value) in &self.archetypes {
            update_str(&mut hasher, name);
            hasher.update(value.to_bits().to_le_bytes());
        }

        hasher.update((self.energies.len() as u64).to_le_bytes());
        for (name, value) in &self.energies {
            update_str(&mut hasher, name);
            hasher.update(value.to_bits().to_le_bytes());
        }

        hasher.update((self.integrations.len() as u64).to_le_bytes());
        for record in &self.integrations {
            update_str(&mut hasher, &record.name);
            update_str(&mut hasher, &record.description);
        }

        hasher.update((self.symbols.len() as u64).to_le_bytes());
        for symbol in &self.symbols {
            update_str(&mut hasher, symbol);
        }

        hasher.update((self.transformations.len() as u64).to_le_bytes());
        for marker in &self.transformations {
            update_str(&mut hasher, marker);
        }

        format!("{:x}", hasher.finalize())
    }

    /// Recompute the hash in place after a trusted edit.
    pub fn reseal(&mut self) {
        self.state_hash = self.compute_hash();
    }

    fn resealed(mut self) -> Self {
        self.reseal();
        self
    }

    /// One-line summary for logs and the CLI.
    pub fn summary(&self) -> String {
        let active = self.archetypes.values().filter(|&&a| a > 0.1).count();
        format!(
            "Archetypes: {}/{} active | Energy: {:.2} | Integrations: {} | Transformations: {}",
            active,
            self.archetypes.len(),
            self.total_energy(),
            self.integrations.len(),
            self.transformations.len()
        )
    }
}

fn update_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}
