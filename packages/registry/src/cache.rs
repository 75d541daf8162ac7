//! Content-addressed cache of compiled modules.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use codex_sandbox::CompiledModule;
use lazy_static::lazy_static;
use sha2::{Digest, Sha256};

lazy_static! {
    static ref GLOBAL: Arc<ModuleCache> = Arc::new(ModuleCache::new());
}

/// Hex SHA-256 of `bytes`, the key every module is cached under.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Lowercase, trimmed form of a caller-supplied hash.
pub fn normalize_hash(hash: &str) -> String {
    hash.trim().to_ascii_lowercase()
}

/// Compiled modules keyed by content hash.
///
/// Values are interchangeable for a given key, so racing inserts are
/// harmless: the last one wins. Entries are never evicted.
#[derive(Debug, Default)]
pub struct ModuleCache {
    modules: RwLock<HashMap<String, Arc<CompiledModule>>>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache.
    pub fn global() -> Arc<ModuleCache> {
        Arc::clone(&GLOBAL)
    }

    pub fn get(&self, hash: &str) -> Option<Arc<CompiledModule>> {
        let modules = self.modules.read().unwrap_or_else(|e| e.into_inner());
        modules.get(&normalize_hash(hash)).cloned()
    }

    pub fn insert(&self, module: Arc<CompiledModule>) {
        let mut modules = self.modules.write().unwrap_or_else(|e| e.into_inner());
        modules.insert(normalize_hash(module.hash()), module);
    }

    pub fn len(&self) -> usize {
        self.modules.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
