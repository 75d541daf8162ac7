//! # Codex Oracle
//!
//! Asks an OpenAI-compatible chat service for a narrative reading of a
//! transformation.
//!
//! ```text
//! (pre, post) ──► context block ──► POST {base_url}/chat/completions
//!                                        │  one retry on connect error,
//!                                        │  timeout, 408, 429, 5xx
//!                                        ▼
//!                      choices[0].message.content ──► section parser
//!                                        │
//!                   any failure ─────────┴──► OracleInsight::fallback()
//! ```
//!
//! The oracle is advisory. Nothing here returns an error to the caller, and
//! an empty API key skips the network entirely.

pub mod client;
pub mod config;
pub mod error;
pub mod insight;
pub mod parse;
pub mod prompt;

pub use client::OracleClient;
pub use config::OracleConfig;
pub use error::OracleUnavailable;
pub use insight::{InsightSections, OracleInsight, RitualContext, FALLBACK_MODEL};
pub use parse::{parse_narrative, Narrative};
pub use prompt::{build_request, context_block, ChatMessage, ChatRequest};
