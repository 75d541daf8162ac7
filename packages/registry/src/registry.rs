//! Resolving ritual ids to executables.

use std::sync::Arc;

use codex_sandbox::{CompiledModule, NativeRitual};
use codex_state::{RitualBody, RitualDefinition};

use crate::cache::{content_hash, normalize_hash, ModuleCache};
use crate::catalog::{InMemoryCatalog, RitualCatalog};
use crate::error::{RegistryError, Result};
use crate::handlers::NativeHandlers;

/// The runnable form of a ritual.
#[derive(Clone)]
pub enum Executable {
    Native(Arc<dyn NativeRitual>),
    Module(Arc<CompiledModule>),
}

impl std::fmt::Debug for Executable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Executable::Native(_) => f.write_str("Native"),
            Executable::Module(module) => f.debug_tuple("Module").field(&module.hash()).finish(),
        }
    }
}

/// A definition together with its verified executable.
#[derive(Debug, Clone)]
pub struct ResolvedRitual {
    pub definition: RitualDefinition,
    pub executable: Executable,
}

/// Resolves ritual ids through a catalog, a native handler table, and the
/// module cache.
#[derive(Clone)]
pub struct ModuleRegistry {
    catalog: Arc<dyn RitualCatalog>,
    handlers: NativeHandlers,
    cache: Arc<ModuleCache>,
}

impl ModuleRegistry {
    /// A registry backed by the process-wide module cache.
    pub fn new(catalog: Arc<dyn RitualCatalog>, handlers: NativeHandlers) -> Self {
        Self {
            catalog,
            handlers,
            cache: ModuleCache::global(),
        }
    }

    /// The built-in rituals and nothing else.
    pub fn with_builtins() -> Self {
        Self::new(
            Arc::new(InMemoryCatalog::with_builtins()),
            NativeHandlers::with_builtins(),
        )
    }

    /// Use a private cache instead of the global one.
    pub fn with_cache(mut self, cache: Arc<ModuleCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn catalog(&self) -> &Arc<dyn RitualCatalog> {
        &self.catalog
    }

    pub fn cache(&self) -> &Arc<ModuleCache> {
        &self.cache
    }

    /// Look up `ritual_id` and produce its executable.
    ///
    /// Module bodies are verified against their declared hash and the
    /// capability ABI before anything runs.
    pub fn resolve(&self, ritual_id: &str) -> Result<ResolvedRitual> {
        let definition =
            self.catalog
                .find(ritual_id)
                .ok_or_else(|| RegistryError::ModuleNotFound {
                    ritual_id: ritual_id.to_string(),
                })?;
        definition.validate()?;

        let executable = match &definition.body {
            RitualBody::Native { handler } => {
                let native =
                    self.handlers
                        .get(handler)
                        .ok_or_else(|| RegistryError::ModuleNotFound {
                            ritual_id: ritual_id.to_string(),
                        })?;
                Executable::Native(native)
            }
            RitualBody::Module { bytes, hash } => {
                Executable::Module(self.verify_for(ritual_id, bytes, hash)?)
            }
        };

        Ok(ResolvedRitual {
            definition,
            executable,
        })
    }

    /// Check `bytes` against `expected_hash` and the capability ABI, caching
    /// the compiled module on success.
    pub fn verify(&self, bytes: &[u8], expected_hash: &str) -> Result<Arc<CompiledModule>> {
        let label = format!("module:{}", normalize_hash(expected_hash));
        self.verify_for(&label, bytes, expected_hash)
    }

    fn verify_for(
        &self,
        ritual_id: &str,
        bytes: &[u8],
        expected_hash: &str,
    ) -> Result<Arc<CompiledModule>> {
        let expected = normalize_hash(expected_hash);
        let actual = content_hash(bytes);
        if actual != expected {
            return Err(RegistryError::IntegrityMismatch {
                ritual_id: ritual_id.to_string(),
                reason: format!("expected hash {}, computed {}", expected, actual),
            });
        }

        if let Some(module) = self.cache.get(&actual) {
            return Ok(module);
        }

        let module = CompiledModule::compile(bytes, actual)
            .map_err(|e| RegistryError::integrity(ritual_id, e))?;
        let module = Arc::new(module);
        self.cache.insert(Arc::clone(&module));
        tracing::debug!(ritual_id, module_hash = module.hash(), "module verified and cached");
        Ok(module)
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("rituals", &self.catalog.ids())
            .field("handlers", &self.handlers)
            .field("cached_modules", &self.cache.len())
            .finish()
    }
}
