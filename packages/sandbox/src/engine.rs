//! The process-wide wasm engine and its epoch ticker.

use std::sync::Once;
use std::time::Duration;

use lazy_static::lazy_static;
use wasmtime::{Config, Engine};

use crate::error::{Result, SandboxError};

/// Interval between epoch increments. Deadline checks run at this
/// granularity inside guest code.
pub const EPOCH_TICK: Duration = Duration::from_millis(10);

lazy_static! {
    static ref ENGINE: std::result::Result<Engine, String> = build_engine();
}

static TICKER: Once = Once::new();

fn build_engine() -> std::result::Result<Engine, String> {
    let mut config = Config::new();
    config.consume_fuel(true);
    config.epoch_interruption(true);
    Engine::new(&config).map_err(|e| e.to_string())
}

/// The shared engine. Starts the epoch ticker on first use.
pub fn shared() -> Result<&'static Engine> {
    let engine = ENGINE
        .as_ref()
        .map_err(|e| SandboxError::Engine(e.clone()))?;
    TICKER.call_once(|| start_ticker(engine));
    Ok(engine)
}

fn start_ticker(engine: &Engine) {
    let weak = engine.weak();
    let spawned = std::thread::Builder::new()
        .name("codex-epoch".to_string())
        .spawn(move || loop {
            std::thread::sleep(EPOCH_TICK);
            match weak.upgrade() {
                Some(engine) => engine.increment_epoch(),
                None => break,
            }
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "failed to start epoch ticker; relying on fuel and host-call deadlines");
    }
}
