//! Failures of the oracle call.
//!
//! None of these reach a caller of [`crate::OracleClient::interpret`]; they
//! are logged and replaced by the fallback insight.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OracleUnavailable {
    #[error("no API key configured")]
    MissingCredential,

    #[error("invalid endpoint {url}: {message}")]
    InvalidEndpoint { url: String, message: String },

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {message}")]
    Transport { connect: bool, message: String },

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    MalformedPayload(String),
}

impl OracleUnavailable {
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            OracleUnavailable::Timeout
        } else {
            OracleUnavailable::Transport {
                connect: err.is_connect(),
                message: err.to_string(),
            }
        }
    }

    /// Whether a single retry is worth attempting.
    pub fn is_transient(&self) -> bool {
        match self {
            OracleUnavailable::Timeout => true,
            OracleUnavailable::Transport { connect, .. } => *connect,
            OracleUnavailable::Status(status) => should_retry(*status),
            _ => false,
        }
    }
}

/// Request timeout, rate limiting, and server errors.
pub(crate) fn should_retry(status: u16) -> bool {
    matches!(status, 408 | 429 | 500..=599)
}

pub type Result<T> = std::result::Result<T, OracleUnavailable>;
