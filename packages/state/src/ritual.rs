//! Ritual definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StateError};

/// How a ritual runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RitualBody {
    /// A trusted handler compiled into the host, looked up by id.
    Native { handler: String },
    /// A sandboxed wasm module and the hex SHA-256 it must verify against.
    Module { bytes: Vec<u8>, hash: String },
}

/// Ritual metadata plus its executable body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RitualDefinition {
    pub name: String,
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tradition: String,
    #[serde(default)]
    pub difficulty: u8,
    #[serde(default)]
    pub required_archetypes: Vec<String>,
    #[serde(default)]
    pub energy_requirements: BTreeMap<String, f64>,
    pub body: RitualBody,
}

impl RitualDefinition {
    /// A ritual backed by the native handler of the same name.
    pub fn native(name: impl Into<String>, intent: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            body: RitualBody::Native {
                handler: name.clone(),
            },
            ..Self::bare(name, intent.into())
        }
    }

    /// A ritual backed by sandbox module bytes.
    pub fn module(
        name: impl Into<String>,
        intent: impl Into<String>,
        bytes: Vec<u8>,
        hash: impl Into<String>,
    ) -> Self {
        Self {
            body: RitualBody::Module {
                bytes,
                hash: hash.into(),
            },
            ..Self::bare(name.into(), intent.into())
        }
    }

    fn bare(name: String, intent: String) -> Self {
        Self {
            name,
            intent,
            description: String::new(),
            tradition: String::new(),
            difficulty: 1,
            required_archetypes: Vec::new(),
            energy_requirements: BTreeMap::new(),
            body: RitualBody::Native {
                handler: String::new(),
            },
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tradition(mut self, tradition: impl Into<String>) -> Self {
        self.tradition = tradition.into();
        self
    }

    pub fn with_difficulty(mut self, difficulty: u8) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn requiring_archetype(mut self, name: impl Into<String>) -> Self {
        self.required_archetypes.push(name.into());
        self
    }

    pub fn requiring_energy(mut self, name: impl Into<String>, threshold: f64) -> Self {
        self.energy_requirements.insert(name.into(), threshold);
        self
    }

    pub fn is_native(&self) -> bool {
        matches!(self.body, RitualBody::Native { .. })
    }

    /// Check the definition is well formed.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| StateError::InvalidDefinition {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        match &self.body {
            RitualBody::Native { handler } if handler.trim().is_empty() => {
                return Err(invalid("native handler id is empty"));
            }
            RitualBody::Module { bytes, .. } if bytes.is_empty() => {
                return Err(invalid("module bytes are empty"));
            }
            RitualBody::Module { hash, .. } if hash.trim().is_empty() => {
                return Err(invalid("module hash is empty"));
            }
            _ => {}
        }
        if let Some((energy, _)) = self
            .energy_requirements
            .iter()
            .find(|(_, t)| !t.is_finite() || **t < 0.0)
        {
            return Err(invalid(&format!("energy threshold for {} is invalid", energy)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_definition_uses_name_as_handler() {
        let def = RitualDefinition::native("void_contemplation", "Embrace the void");
        assert_eq!(
            def.body,
            RitualBody::Native {
                handler: "void_contemplation".to_string()
            }
        );
        assert!(def.is_native());
        assert!(def.validate().is_ok());
    }

    #[test]
    fn builders_fill_metadata() {
        let def = RitualDefinition::native("shadow_integration", "Integrate the shadow")
            .with_tradition("Jungian")
            .with_difficulty(3)
            .requiring_archetype("Shadow")
            .requiring_energy("Void", 0.3);

        assert_eq!(def.tradition, "Jungian");
        assert_eq!(def.difficulty, 3);
        assert_eq!(def.required_archetypes, vec!["Shadow".to_string()]);
        assert_eq!(def.energy_requirements.get("Void"), Some(&0.3));
    }

    #[test]
    fn validate_rejects_malformed_definitions() {
        assert!(RitualDefinition::native(" ", "x").validate().is_err());
        assert!(RitualDefinition::module("m", "x", vec![], "abc")
            .validate()
            .is_err());
        assert!(RitualDefinition::module("m", "x", vec![0, 1], "")
            .validate()
            .is_err());
        assert!(RitualDefinition::native("n", "x")
            .requiring_energy("Fire", f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn body_serializes_with_kind_tag() {
        let def = RitualDefinition::native("energy_attunement", "Balance");
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["body"]["kind"], "native");
        assert_eq!(json["body"]["handler"], "energy_attunement");
    }
}
