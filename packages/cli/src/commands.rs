//! Subcommand implementations. Each writes its report to `out`.

use std::io::Write;
use std::sync::Arc;

use codex::{
    content_hash, Analyzer, ArchetypalState, CodexConfig, InMemoryCatalog, ModuleRegistry,
    NativeHandlers, PractitionerId, RitualDefinition, RitualEngine, RitualParameters,
};
use serde_json::json;

use crate::args::{AnalyzeArgs, Cli, Command, HashArgs, InitArgs, RunArgs};
use crate::error::{CliError, Result};
use crate::files::{print_json, read_bytes, read_json, write_json};
use crate::settings;

/// Load configuration and run the chosen subcommand.
pub async fn dispatch(cli: Cli, out: &mut dyn Write) -> Result<()> {
    let config = settings::load(cli.config.as_deref())?;
    match cli.command {
        Command::Init(args) => init(&args, out),
        Command::Hash(args) => hash(&args, out),
        Command::Run(args) => run(&args, &config, out).await,
        Command::Analyze(args) => analyze(&args, &config, out),
    }
}

pub fn init(args: &InitArgs, out: &mut dyn Write) -> Result<()> {
    let id = args.practitioner.unwrap_or_else(PractitionerId::new);
    let state = ArchetypalState::seeded(id);
    write_json(&args.out, &state)?;
    print_json(
        out,
        &json!({
            "practitioner_id": id,
            "state_hash": state.state_hash,
            "path": args.out.display().to_string(),
        }),
    )
}

pub fn hash(args: &HashArgs, out: &mut dyn Write) -> Result<()> {
    let bytes = read_bytes(&args.module)?;
    writeln!(out, "{}", content_hash(&bytes)).map_err(CliError::Output)
}

pub async fn run(args: &RunArgs, config: &CodexConfig, out: &mut dyn Write) -> Result<()> {
    let pre: ArchetypalState = read_json(&args.state)?;
    let parameters = parse_parameters(args.parameters.as_deref())?;

    let catalog = InMemoryCatalog::with_builtins();
    if let (Some(path), Some(hash)) = (&args.module, &args.hash) {
        let bytes = read_bytes(path)?;
        tracing::debug!(ritual_id = %args.ritual, module_hash = %hash, "registering module");
        catalog.register(RitualDefinition::module(
            args.ritual.as_str(),
            args.intention.as_str(),
            bytes,
            hash.as_str(),
        ));
    }
    let registry = ModuleRegistry::new(Arc::new(catalog), NativeHandlers::with_builtins());
    let engine = RitualEngine::from_config(registry, config);

    let result = engine
        .execute(&args.ritual, &pre, parameters, &args.intention)
        .await?;

    let destination = args.out.as_ref().unwrap_or(&args.state);
    write_json(destination, &result.new_state)?;
    print_json(out, &result)?;

    if args.oracle {
        let insight = engine.interpret_result(&pre, &result).await;
        print_json(out, &insight)?;
    }
    Ok(())
}

pub fn analyze(args: &AnalyzeArgs, config: &CodexConfig, out: &mut dyn Write) -> Result<()> {
    let pre: ArchetypalState = read_json(&args.pre)?;
    let post: ArchetypalState = read_json(&args.post)?;
    let analyzer = Analyzer::new(config.analyzer.clone());
    print_json(out, &analyzer.analyze(&pre, &post))
}

fn parse_parameters(raw: Option<&str>) -> Result<RitualParameters> {
    match raw {
        None => Ok(RitualParameters::new()),
        Some(text) => serde_json::from_str(text).map_err(|e| CliError::Parameters(e.to_string())),
    }
}
