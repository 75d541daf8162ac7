//! Oracle client configuration.

use std::time::Duration;

/// OpenAI-compatible endpoint used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

pub const DEFAULT_MODEL: &str = "anthropic/claude-3.5-sonnet";

/// Environment variables read by [`OracleConfig::from_env`].
pub const API_KEY_VAR: &str = "CODEX_ORACLE_API_KEY";
pub const FALLBACK_API_KEY_VAR: &str = "OPENROUTER_API_KEY";
pub const MODEL_VAR: &str = "CODEX_ORACLE_MODEL";
pub const BASE_URL_VAR: &str = "CODEX_ORACLE_BASE_URL";

#[derive(Clone, PartialEq)]
pub struct OracleConfig {
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,

    /// Bearer credential. Empty means the oracle is never contacted.
    pub api_key: String,

    pub model: String,

    /// Per-attempt request timeout.
    pub timeout: Duration,

    /// Retries after a transient failure.
    pub max_retries: u32,

    /// Pause before a retry.
    pub retry_delay: Duration,

    pub temperature: f64,

    pub max_tokens: u32,

    /// Archetype and energy deltas at or below this are left out of the
    /// prompt.
    pub noise_threshold: f64,

    /// Confidence reported for every successful reading.
    pub confidence_score: f64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 1,
            retry_delay: Duration::from_millis(250),
            temperature: 0.7,
            max_tokens: 2000,
            noise_threshold: 0.01,
            confidence_score: 0.85,
        }
    }
}

impl OracleConfig {
    /// Defaults overlaid with the `CODEX_ORACLE_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().overlay(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, ignoring blank values.
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(key) = lookup(API_KEY_VAR).or_else(|| lookup(FALLBACK_API_KEY_VAR)) {
            self.api_key = key;
        }
        if let Some(model) = lookup(MODEL_VAR) {
            self.model = model;
        }
        if let Some(base_url) = lookup(BASE_URL_VAR) {
            self.base_url = base_url;
        }
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// The chat completions URL.
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl std::fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &if self.has_credential() { "<set>" } else { "<empty>" })
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("noise_threshold", &self.noise_threshold)
            .field("confidence_score", &self.confidence_score)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn primary_key_wins() {
        let config = OracleConfig::default().overlay(env(&[
            (API_KEY_VAR, "primary"),
            (FALLBACK_API_KEY_VAR, "secondary"),
        ]));
        assert_eq!(config.api_key, "primary");
    }

    #[test]
    fn falls_back_to_openrouter_key() {
        let config = OracleConfig::default().overlay(env(&[
            (API_KEY_VAR, "  "),
            (FALLBACK_API_KEY_VAR, "secondary"),
        ]));
        assert_eq!(config.api_key, "secondary");
    }

    #[test]
    fn model_and_base_url_overrides() {
        let config = OracleConfig::default().overlay(env(&[
            (MODEL_VAR, "local/tiny"),
            (BASE_URL_VAR, "http://localhost:8080/v1/"),
        ]));
        assert_eq!(config.model, "local/tiny");
        assert_eq!(config.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert!(!config.has_credential());
    }

    #[test]
    fn debug_hides_key() {
        let config = OracleConfig::default().with_api_key("sk-secret");
        let shown = format!("{:?}", config);
        assert!(!shown.contains("sk-secret"));
        assert!(shown.contains("<set>"));
    }
}
