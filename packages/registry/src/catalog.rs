//! Where ritual definitions come from.

use std::collections::HashMap;
use std::sync::RwLock;

use codex_state::RitualDefinition;

use crate::builtin;

/// Source of ritual definitions.
pub trait RitualCatalog: Send + Sync {
    /// Look up a definition by ritual id.
    fn find(&self, ritual_id: &str) -> Option<RitualDefinition>;

    /// All known ritual ids, sorted.
    fn ids(&self) -> Vec<String>;
}

/// A catalog held in memory.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    definitions: RwLock<HashMap<String, RitualDefinition>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog pre-loaded with the built-in rituals.
    pub fn with_builtins() -> Self {
        let catalog = Self::new();
        for definition in builtin::definitions() {
            catalog.register(definition);
        }
        catalog
    }

    /// Add or replace a definition, keyed by its name.
    pub fn register(&self, definition: RitualDefinition) {
        let mut definitions = self.definitions.write().unwrap_or_else(|e| e.into_inner());
        definitions.insert(definition.name.clone(), definition);
    }
}

impl RitualCatalog for InMemoryCatalog {
    fn find(&self, ritual_id: &str) -> Option<RitualDefinition> {
        let definitions = self.definitions.read().unwrap_or_else(|e| e.into_inner());
        definitions.get(ritual_id).cloned()
    }

    fn ids(&self) -> Vec<String> {
        let definitions = self.definitions.read().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<String> = definitions.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let catalog = InMemoryCatalog::with_builtins();
        assert_eq!(
            catalog.ids(),
            vec![
                "archetype_invocation",
                "energy_attunement",
                "shadow_integration",
                "void_contemplation",
            ]
        );
        assert!(catalog.find("shadow_integration").is_some());
        assert!(catalog.find("moon_bathing").is_none());
    }

    #[test]
    fn register_replaces_by_name() {
        let catalog = InMemoryCatalog::new();
        catalog.register(RitualDefinition::native("light_work", "first"));
        catalog.register(RitualDefinition::native("light_work", "second"));
        assert_eq!(catalog.find("light_work").unwrap().intent, "second");
        assert_eq!(catalog.ids().len(), 1);
    }
}
