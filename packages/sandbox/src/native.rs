//! Native (trusted, in-process) rituals.

use std::collections::HashMap;

use crate::capabilities::HostCapabilities;
use crate::error::HostTrap;

/// Caller-supplied ritual parameters.
pub type RitualParameters = HashMap<String, serde_json::Value>;

/// A ritual implemented as host code.
///
/// Native rituals run through the same capability table, budgets, and
/// deadline as wasm modules, but without memory isolation.
pub trait NativeRitual: Send + Sync {
    /// Run the ritual. Zero means success; anything else is a failure
    /// reason of the ritual's choosing.
    fn execute(
        &self,
        host: &mut dyn HostCapabilities,
        parameters: &RitualParameters,
    ) -> Result<i32, HostTrap>;

    /// Self-reported resonance, read after `execute` succeeds. Writes are
    /// ignored at this point.
    fn resonance(&self, _host: &mut dyn HostCapabilities) -> Result<Option<f64>, HostTrap> {
        Ok(None)
    }
}
