//! # Codex State
//!
//! The value types every other Codex crate agrees on:
//!
//! - [`ArchetypalState`] - a practitioner's symbolic state: archetype
//!   activations, energy amplitudes, integrations, symbols, and open
//!   transformations, sealed with a content hash.
//! - [`MutationBuffer`] - the per-execution scratch space a ritual writes into.
//!   Live state only changes when a buffer is committed with
//!   [`ArchetypalState::commit`], which is all-or-nothing.
//! - [`RitualDefinition`] - ritual metadata plus its executable body (a native
//!   handler id or sandbox module bytes with their verification hash).
//!
//! ## Invariants
//!
//! ```text
//! archetype activation  ∈ [0, 1]
//! energy amplitude      ∈ [0, max_energy]
//! state_hash            = sha256(canonical content)   (after every commit)
//! version               += 1                          (after every commit)
//! ```
//!
//! Values are clamped rather than rejected, so a module can never push a state
//! out of range no matter what it asks for.

pub mod error;
pub mod id;
pub mod limits;
pub mod mutation;
pub mod ritual;
pub mod state;

pub use error::{Result, StateError};
pub use id::PractitionerId;
pub use limits::{clamp_unit, clamp_with_max, StateLimits};
pub use mutation::{MutationBuffer, SymbolOutcome};
pub use ritual::{RitualBody, RitualDefinition};
pub use state::{ArchetypalState, IntegrationRecord};
