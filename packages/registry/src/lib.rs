//! # Codex Registry
//!
//! Turns a ritual id into something the sandbox can run.
//!
//! ```text
//! RitualCatalog::find(id) ──► RitualDefinition
//!                               │
//!              ┌────────────────┴─────────────────┐
//!        Native { handler }               Module { bytes, hash }
//!              │                                  │
//!      NativeHandlers::get            sha256(bytes) == hash?
//!              │                       ABI shape check
//!              │                       ModuleCache (by hash)
//!              ▼                                  ▼
//!     Executable::Native              Executable::Module
//! ```
//!
//! The cache is process-wide and content-addressed; entries are never
//! invalidated. The registry never alters a ritual's stored bytes.

pub mod builtin;
pub mod cache;
pub mod catalog;
pub mod error;
pub mod handlers;
pub mod registry;

pub use cache::{content_hash, ModuleCache};
pub use catalog::{InMemoryCatalog, RitualCatalog};
pub use error::{RegistryError, Result};
pub use handlers::NativeHandlers;
pub use registry::{Executable, ModuleRegistry, ResolvedRitual};
