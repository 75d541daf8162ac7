//! Sandbox configuration.

use std::time::Duration;

use codex_state::StateLimits;

/// Budgets applied to every execution.
#[derive(Debug, Clone, PartialEq)]
pub struct SandboxConfig {
    /// Wall-clock limit for the whole execution.
    pub timeout: Duration,

    /// Instruction fuel handed to each store. Exhaustion is a timeout.
    pub fuel: u64,

    /// Upper bound on linear memory, in bytes.
    pub max_memory_bytes: usize,

    /// Upper bound on table elements.
    pub max_table_elements: usize,

    /// Capability invocations allowed per execution, across all capabilities.
    pub max_host_calls: u64,

    /// `get_random` invocations allowed per execution.
    pub max_random_calls: u64,

    /// Bytes kept from each `log` call.
    pub max_log_bytes: usize,

    /// Log lines kept per execution. Further lines are discarded.
    pub max_log_lines: usize,

    /// Clamping and symbol bounds for the mutation buffer.
    pub limits: StateLimits,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            fuel: 500_000_000,
            max_memory_bytes: 16 * 1024 * 1024,
            max_table_elements: 10_000,
            max_host_calls: 100_000,
            max_random_calls: 10_000,
            max_log_bytes: 512,
            max_log_lines: 1_000,
            limits: StateLimits::default(),
        }
    }
}
