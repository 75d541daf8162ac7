//! Lookup table for native ritual handlers.

use std::collections::HashMap;
use std::sync::Arc;

use codex_sandbox::NativeRitual;

use crate::builtin::{
    ArchetypeInvocation, EnergyAttunement, ShadowIntegration, VoidContemplation,
    ARCHETYPE_INVOCATION, ENERGY_ATTUNEMENT, SHADOW_INTEGRATION, VOID_CONTEMPLATION,
};

/// Native handlers keyed by handler id.
#[derive(Clone, Default)]
pub struct NativeHandlers {
    handlers: HashMap<String, Arc<dyn NativeRitual>>,
}

impl NativeHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding the built-in rituals.
    pub fn with_builtins() -> Self {
        let mut handlers = Self::new();
        handlers.register(SHADOW_INTEGRATION, Arc::new(ShadowIntegration));
        handlers.register(ENERGY_ATTUNEMENT, Arc::new(EnergyAttunement));
        handlers.register(VOID_CONTEMPLATION, Arc::new(VoidContemplation));
        handlers.register(ARCHETYPE_INVOCATION, Arc::new(ArchetypeInvocation));
        handlers
    }

    pub fn register(&mut self, id: impl Into<String>, handler: Arc<dyn NativeRitual>) {
        self.handlers.insert(id.into(), handler);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn NativeRitual>> {
        self.handlers.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.handlers.contains_key(id)
    }
}

impl std::fmt::Debug for NativeHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&String> = self.handlers.keys().collect();
        ids.sort();
        f.debug_struct("NativeHandlers").field("ids", &ids).finish()
    }
}
