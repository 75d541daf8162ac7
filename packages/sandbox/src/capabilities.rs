//! The host capability table.
//!
//! Everything a ritual can observe or change about a practitioner goes through
//! [`HostCapabilities`]. Wasm modules reach it through the `codex` import
//! namespace; native rituals receive it directly.

use std::time::Instant;

use codex_state::{ArchetypalState, MutationBuffer, SymbolOutcome};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cancel::CancelFlag;
use crate::config::SandboxConfig;
use crate::error::HostTrap;

/// The fixed capability surface offered to a ritual.
pub trait HostCapabilities {
    fn log(&mut self, message: &str) -> Result<(), HostTrap>;

    fn get_archetype_activation(&mut self, name: &str) -> Result<f64, HostTrap>;

    fn set_archetype_activation(&mut self, name: &str, value: f64) -> Result<(), HostTrap>;

    fn get_energy_amplitude(&mut self, name: &str) -> Result<f64, HostTrap>;

    fn set_energy_amplitude(&mut self, name: &str, value: f64) -> Result<(), HostTrap>;

    fn add_symbol(&mut self, symbol: &str) -> Result<(), HostTrap>;

    /// A uniform draw from [0, 1).
    fn get_random(&mut self) -> Result<f64, HostTrap>;
}

/// Per-execution capability state: the snapshot, the mutation buffer, and
/// the budgets.
#[derive(Debug)]
pub struct CapabilityTable {
    snapshot: ArchetypalState,
    buffer: MutationBuffer,
    rng: StdRng,
    logs: Vec<String>,
    host_calls: u64,
    random_calls: u64,
    max_host_calls: u64,
    max_random_calls: u64,
    max_log_bytes: usize,
    max_log_lines: usize,
    deadline: Instant,
    cancel: CancelFlag,
    sealed: bool,
}

/// What a finished table hands back.
#[derive(Debug)]
pub struct TableParts {
    pub buffer: MutationBuffer,
    pub logs: Vec<String>,
    pub host_calls: u64,
    pub random_calls: u64,
}

impl CapabilityTable {
    pub fn new(
        snapshot: ArchetypalState,
        config: &SandboxConfig,
        deadline: Instant,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            snapshot,
            buffer: MutationBuffer::new(&config.limits),
            rng: StdRng::from_entropy(),
            logs: Vec::new(),
            host_calls: 0,
            random_calls: 0,
            max_host_calls: config.max_host_calls,
            max_random_calls: config.max_random_calls,
            max_log_bytes: config.max_log_bytes,
            max_log_lines: config.max_log_lines,
            deadline,
            cancel,
            sealed: false,
        }
    }

    /// Fail if the execution was cancelled or is past its deadline.
    pub fn check_interrupt(&self) -> Result<(), HostTrap> {
        if self.cancel.is_cancelled() {
            return Err(HostTrap::Cancelled);
        }
        if Instant::now() >= self.deadline {
            return Err(HostTrap::DeadlineExceeded);
        }
        Ok(())
    }

    /// Stop accepting writes. Called once the entry point returns.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn buffer(&self) -> &MutationBuffer {
        &self.buffer
    }

    /// Longest log line kept, in bytes.
    pub fn max_log_bytes(&self) -> usize {
        self.max_log_bytes
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    pub fn host_calls(&self) -> u64 {
        self.host_calls
    }

    pub fn random_calls(&self) -> u64 {
        self.random_calls
    }

    pub fn into_parts(self) -> TableParts {
        TableParts {
            buffer: self.buffer,
            logs: self.logs,
            host_calls: self.host_calls,
            random_calls: self.random_calls,
        }
    }

    fn charge(&mut self) -> Result<(), HostTrap> {
        self.check_interrupt()?;
        if self.host_calls >= self.max_host_calls {
            return Err(HostTrap::CallBudgetExhausted);
        }
        self.host_calls += 1;
        Ok(())
    }
}

impl HostCapabilities for CapabilityTable {
    fn log(&mut self, message: &str) -> Result<(), HostTrap> {
        self.charge()?;
        if self.logs.len() < self.max_log_lines {
            self.logs
                .push(truncate_on_char_boundary(message, self.max_log_bytes).to_string());
        }
        Ok(())
    }

    fn get_archetype_activation(&mut self, name: &str) -> Result<f64, HostTrap> {
        self.charge()?;
        Ok(self
            .buffer
            .archetype(name)
            .unwrap_or_else(|| self.snapshot.activation(name)))
    }

    fn set_archetype_activation(&mut self, name: &str, value: f64) -> Result<(), HostTrap> {
        self.charge()?;
        if !self.sealed {
            self.buffer.set_archetype(name, value);
        }
        Ok(())
    }

    fn get_energy_amplitude(&mut self, name: &str) -> Result<f64, HostTrap> {
        self.charge()?;
        Ok(self
            .buffer
            .energy(name)
            .unwrap_or_else(|| self.snapshot.amplitude(name)))
    }

    fn set_energy_amplitude(&mut self, name: &str, value: f64) -> Result<(), HostTrap> {
        self.charge()?;
        if !self.sealed {
            self.buffer.set_energy(name, value);
        }
        Ok(())
    }

    fn add_symbol(&mut self, symbol: &str) -> Result<(), HostTrap> {
        self.charge()?;
        if self.sealed || self.snapshot.has_symbol(symbol) {
            return Ok(());
        }
        if self.buffer.add_symbol(symbol) == SymbolOutcome::Dropped {
            tracing::trace!(symbol, "symbol dropped from mutation buffer");
        }
        Ok(())
    }

    fn get_random(&mut self) -> Result<f64, HostTrap> {
        self.charge()?;
        if self.random_calls >= self.max_random_calls {
            return Err(HostTrap::RandomBudgetExhausted);
        }
        self.random_calls += 1;
        Ok(self.rng.gen::<f64>())
    }
}

/// The longest prefix of `text` that fits in `max` bytes without splitting a
/// character.
pub fn truncate_on_char_boundary(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
