//! # Codex Sandbox
//!
//! Executes one ritual against one state snapshot under strict isolation.
//!
//! Wasm modules run in a wasmtime store with no ambient authority: the only
//! imports they can satisfy are the capabilities in the `codex` namespace
//! (see [`HostCapabilities`]). Every capability writes into a per-execution
//! [`codex_state::MutationBuffer`], never into live state. The caller decides
//! whether to commit the buffer.
//!
//! Budgets:
//!
//! - wall-clock timeout, enforced by epoch interruption and by a deadline
//!   check in every capability call
//! - instruction fuel, reported as a timeout when exhausted
//! - linear memory, enforced by a resource limiter
//! - host calls and `get_random` calls, counted per execution
//!
//! Native rituals ([`NativeRitual`]) share the same capability table and
//! budgets but run as trusted host code.

pub mod cancel;
pub mod capabilities;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod module;
pub mod native;

pub use cancel::{CancelFlag, CancelOnDrop};
pub use capabilities::{CapabilityTable, HostCapabilities};
pub use config::SandboxConfig;
pub use error::{HostTrap, LimitKind, Result, SandboxError};
pub use executor::{Sandbox, SandboxOutcome};
pub use module::{CompiledModule, HOST_NAMESPACE};
pub use native::{NativeRitual, RitualParameters};
