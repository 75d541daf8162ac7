//! Engine configuration.
//!
//! [`CodexConfig`] is the file format: every section is optional and
//! durations are whole milliseconds.
//!
//! ```json
//! {
//!   "state":    { "max_energy": 1.0 },
//!   "sandbox":  { "timeout_ms": 5000, "max_random_calls": 10000 },
//!   "analyzer": { "symbol_weight": 0.3 },
//!   "oracle":   { "model": "anthropic/claude-3.5-sonnet", "timeout_ms": 30000 },
//!   "engine":   { "conflict_wait_ms": 250 }
//! }
//! ```

use std::time::Duration;

use codex_analyzer::AnalyzerConfig;
use codex_oracle::OracleConfig;
use codex_sandbox::SandboxConfig;
use codex_state::StateLimits;
use serde::{Deserialize, Serialize};

/// What happens when an execution finds another one in flight for the same
/// practitioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Fail with `ConcurrentExecutionConflict` at once.
    #[default]
    FailFast,
    /// Wait up to the given duration for the slot, then fail.
    Wait(Duration),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    pub conflict_policy: ConflictPolicy,
}

/// Serialized configuration for every component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodexConfig {
    pub state: StateLimits,
    pub sandbox: SandboxSection,
    pub analyzer: AnalyzerConfig,
    pub oracle: OracleSection,
    pub engine: EngineSection,
}

impl CodexConfig {
    pub fn sandbox_config(&self) -> SandboxConfig {
        let s = &self.sandbox;
        SandboxConfig {
            timeout: Duration::from_millis(s.timeout_ms),
            fuel: s.fuel,
            max_memory_bytes: s.max_memory_bytes,
            max_table_elements: s.max_table_elements,
            max_host_calls: s.max_host_calls,
            max_random_calls: s.max_random_calls,
            max_log_bytes: s.max_log_bytes,
            max_log_lines: s.max_log_lines,
            limits: self.state.clone(),
        }
    }

    /// Oracle settings from the file only. Callers usually overlay the
    /// environment with [`OracleConfig::overlay`].
    pub fn oracle_config(&self) -> OracleConfig {
        let o = &self.oracle;
        OracleConfig {
            base_url: o.base_url.clone(),
            api_key: o.api_key.clone().unwrap_or_default(),
            model: o.model.clone(),
            timeout: Duration::from_millis(o.timeout_ms),
            max_retries: o.max_retries,
            retry_delay: Duration::from_millis(o.retry_delay_ms),
            temperature: o.temperature,
            max_tokens: o.max_tokens,
            noise_threshold: o.noise_threshold,
            confidence_score: o.confidence_score,
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            conflict_policy: match self.engine.conflict_wait_ms {
                Some(ms) => ConflictPolicy::Wait(Duration::from_millis(ms)),
                None => ConflictPolicy::FailFast,
            },
        }
    }
}

/// File form of [`SandboxConfig`], without the state limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSection {
    pub timeout_ms: u64,
    pub fuel: u64,
    pub max_memory_bytes: usize,
    pub max_table_elements: usize,
    pub max_host_calls: u64,
    pub max_random_calls: u64,
    pub max_log_bytes: usize,
    pub max_log_lines: usize,
}

impl Default for SandboxSection {
    fn default() -> Self {
        let d = SandboxConfig::default();
        Self {
            timeout_ms: d.timeout.as_millis() as u64,
            fuel: d.fuel,
            max_memory_bytes: d.max_memory_bytes,
            max_table_elements: d.max_table_elements,
            max_host_calls: d.max_host_calls,
            max_random_calls: d.max_random_calls,
            max_log_bytes: d.max_log_bytes,
            max_log_lines: d.max_log_lines,
        }
    }
}

/// File form of [`OracleConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSection {
    pub base_url: String,
    /// Usually left out of files and supplied through the environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub temperature: f64,
    pub max_tokens: u32,
    pub noise_threshold: f64,
    pub confidence_score: f64,
}

impl Default for OracleSection {
    fn default() -> Self {
        let d = OracleConfig::default();
        Self {
            base_url: d.base_url,
            api_key: None,
            model: d.model,
            timeout_ms: d.timeout.as_millis() as u64,
            max_retries: d.max_retries,
            retry_delay_ms: d.retry_delay.as_millis() as u64,
            temperature: d.temperature,
            max_tokens: d.max_tokens,
            noise_threshold: d.noise_threshold,
            confidence_score: d.confidence_score,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Absent means fail fast on a busy practitioner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict_wait_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config: CodexConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CodexConfig::default());
        assert_eq!(config.sandbox_config(), SandboxConfig::default());
        assert_eq!(config.oracle_config(), OracleConfig::default());
        assert_eq!(config.engine_config().conflict_policy, ConflictPolicy::FailFast);
    }

    #[test]
    fn sections_override_selectively() {
        let config: CodexConfig = serde_json::from_str(
            r#"{
                "state": { "max_energy": 2.0 },
                "sandbox": { "timeout_ms": 250, "max_random_calls": 5 },
                "oracle": { "model": "local/tiny", "api_key": "k" },
                "engine": { "conflict_wait_ms": 100 }
            }"#,
        )
        .unwrap();

        let sandbox = config.sandbox_config();
        assert_eq!(sandbox.timeout, Duration::from_millis(250));
        assert_eq!(sandbox.max_random_calls, 5);
        assert_eq!(sandbox.max_host_calls, 100_000);
        assert_eq!(sandbox.limits.max_energy, 2.0);

        let oracle = config.oracle_config();
        assert_eq!(oracle.model, "local/tiny");
        assert_eq!(oracle.api_key, "k");
        assert_eq!(oracle.max_tokens, 2000);

        assert_eq!(
            config.engine_config().conflict_policy,
            ConflictPolicy::Wait(Duration::from_millis(100))
        );
    }
}
