//! Command line arguments.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use codex::PractitionerId;

/// Codex - run rituals against archetypal state files
#[derive(Parser, Debug)]
#[command(name = "codex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file [default: <config dir>/codex/config.json]
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log more; repeat for more detail (RUST_LOG overrides)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a freshly seeded state
    Init(InitArgs),
    /// Print the content hash of a ritual module
    Hash(HashArgs),
    /// Execute a ritual against a state file
    Run(RunArgs),
    /// Compare two state files
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Where to write the state
    #[arg(long)]
    pub out: PathBuf,

    /// Practitioner id [default: a new random id]
    #[arg(long)]
    pub practitioner: Option<PractitionerId>,
}

#[derive(Args, Debug)]
pub struct HashArgs {
    /// Compiled wasm module
    pub module: PathBuf,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Ritual id: a built-in, or the name to give --module
    pub ritual: String,

    /// Current state file
    #[arg(long)]
    pub state: PathBuf,

    /// Run this wasm module under the ritual id
    #[arg(long, requires = "hash")]
    pub module: Option<PathBuf>,

    /// Expected SHA-256 of --module, as printed by `codex hash`
    #[arg(long, requires = "module", value_name = "SHA256")]
    pub hash: Option<String>,

    #[arg(long, default_value = "")]
    pub intention: String,

    /// JSON object passed to native rituals
    #[arg(long, value_name = "JSON")]
    pub parameters: Option<String>,

    /// Where to write the new state [default: overwrite --state]
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Also ask the oracle for a reading
    #[arg(long)]
    pub oracle: bool,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    pub pre: PathBuf,
    pub post: PathBuf,
}
