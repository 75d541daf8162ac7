//! # Codex
//!
//! The ritual execution engine. A ritual is a small program, either a wasm
//! module or trusted native code, that reads and proposes changes to a
//! practitioner's [`ArchetypalState`] through a fixed capability table.
//!
//! ```text
//! execute(ritual_id, state, parameters, intention)
//!     │
//!     ├─ ModuleRegistry::resolve        ModuleNotFound / IntegrityMismatch
//!     ├─ per-practitioner slot          ConcurrentExecutionConflict
//!     ├─ Sandbox (blocking worker)      ModuleFault / Timeout / ResourceLimitExceeded
//!     ├─ ArchetypalState::commit        the only point state changes
//!     └─ Analyzer::analyze
//!     ▼
//! TransformationResult
//! ```
//!
//! The oracle is separate: call [`RitualEngine::interpret`] after a commit
//! for a narrative reading. It never fails.
//!
//! ## Example
//!
//! ```rust,ignore
//! use codex::{ArchetypalState, PractitionerId, RitualEngine, RitualParameters};
//!
//! let engine = RitualEngine::default();
//! let state = ArchetypalState::seeded(PractitionerId::new());
//! let result = engine
//!     .execute("shadow_integration", &state, RitualParameters::new(), "meet the dark")
//!     .await?;
//! println!("intensity {:.3}", result.analysis.intensity);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod locks;
pub mod repository;
pub mod result;

pub use config::{CodexConfig, ConflictPolicy, EngineConfig};
pub use engine::RitualEngine;
pub use error::{RepositoryError, Result, RitualExecutionError};
pub use locks::{PractitionerLocks, SlotGuard};
pub use repository::{InMemoryStateRepository, StateRepository};
pub use result::TransformationResult;

pub use codex_analyzer::{Analyzer, AnalyzerConfig, PrerequisiteReport, TransformationAnalysis};
pub use codex_oracle::{OracleClient, OracleConfig, OracleInsight, RitualContext};
pub use codex_registry::{
    content_hash, InMemoryCatalog, ModuleCache, ModuleRegistry, NativeHandlers, RitualCatalog,
};
pub use codex_sandbox::{
    HostCapabilities, HostTrap, LimitKind, NativeRitual, RitualParameters, Sandbox, SandboxConfig,
};
pub use codex_state::{
    ArchetypalState, IntegrationRecord, PractitionerId, RitualDefinition, StateError,
    StateLimits,
};
