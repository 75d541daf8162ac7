//! # codex-cli
//!
//! Operator tool over the ritual engine.
//!
//! ```bash
//! codex init --out state.json
//! codex run shadow_integration --state state.json --intention "meet the dark" --oracle
//! codex hash ritual.wasm
//! codex run my_ritual --module ritual.wasm --state state.json --out next.json
//! codex analyze state.json next.json
//! ```
//!
//! Configuration comes from `--config` or `<config dir>/codex/config.json`;
//! the oracle key from `CODEX_ORACLE_API_KEY` or `OPENROUTER_API_KEY`.

pub mod args;
pub mod commands;
pub mod error;
pub mod files;
pub mod logging;
pub mod settings;

pub use args::Cli;
pub use commands::dispatch;
pub use error::{CliError, Result};
