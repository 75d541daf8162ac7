//! Running rituals inside the sandbox.

use std::ops::Range;
use std::time::{Duration, Instant};

use codex_state::{clamp_unit, ArchetypalState, MutationBuffer};
use wasmtime::{
    Caller, Extern, Instance, Linker, ResourceLimiter, Store, Trap, UpdateDeadline,
};

use crate::cancel::CancelFlag;
use crate::capabilities::{CapabilityTable, HostCapabilities};
use crate::config::SandboxConfig;
use crate::engine;
use crate::error::{HostTrap, Result, SandboxError};
use crate::module::{
    CompiledModule, CLEANUP_EXPORT, ENTRY_EXPORT, HOST_NAMESPACE, MEMORY_EXPORT,
    RESONANCE_EXPORT,
};
use crate::native::{NativeRitual, RitualParameters};

/// Everything a successful execution produced. The buffer has not been
/// committed.
#[derive(Debug)]
pub struct SandboxOutcome {
    pub buffer: MutationBuffer,
    pub resonance: Option<f64>,
    pub logs: Vec<String>,
    pub host_calls: u64,
    pub random_calls: u64,
    pub symbols_dropped: usize,
    pub elapsed: Duration,
}

impl SandboxOutcome {
    fn from_table(table: CapabilityTable, resonance: Option<f64>, started: Instant) -> Self {
        let parts = table.into_parts();
        Self {
            symbols_dropped: parts.buffer.symbols_dropped(),
            buffer: parts.buffer,
            resonance,
            logs: parts.logs,
            host_calls: parts.host_calls,
            random_calls: parts.random_calls,
            elapsed: started.elapsed(),
        }
    }
}

/// Runs rituals under a [`SandboxConfig`].
#[derive(Debug, Clone, Default)]
pub struct Sandbox {
    config: SandboxConfig,
}

struct HostState {
    table: CapabilityTable,
    memory: MemoryBudget,
}

struct MemoryBudget {
    max_memory_bytes: usize,
    max_table_elements: usize,
}

impl ResourceLimiter for MemoryBudget {
    fn memory_growing(
        &mut self,
        _current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> wasmtime::Result<bool> {
        if desired > self.max_memory_bytes {
            return Err(wasmtime::Error::new(HostTrap::MemoryLimitExceeded));
        }
        Ok(true)
    }

    fn table_growing(
        &mut self,
        _current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> wasmtime::Result<bool> {
        Ok(desired <= self.max_table_elements)
    }
}

impl Sandbox {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Run a compiled module against `snapshot`.
    ///
    /// The snapshot is only read. On success the returned buffer holds the
    /// module's writes; on any failure they are dropped with the store.
    pub fn run_module(
        &self,
        module: &CompiledModule,
        snapshot: ArchetypalState,
        cancel: CancelFlag,
    ) -> Result<SandboxOutcome> {
        let started = Instant::now();
        let engine = engine::shared()?;

        let host = HostState {
            table: CapabilityTable::new(
                snapshot,
                &self.config,
                started + self.config.timeout,
                cancel,
            ),
            memory: MemoryBudget {
                max_memory_bytes: self.config.max_memory_bytes,
                max_table_elements: self.config.max_table_elements,
            },
        };
        let mut store = Store::new(engine, host);
        store.limiter(|host| &mut host.memory);
        store
            .set_fuel(self.config.fuel)
            .map_err(|e| SandboxError::Engine(e.to_string()))?;
        store.set_epoch_deadline(1);
        store.epoch_deadline_callback(|ctx| {
            ctx.data()
                .table
                .check_interrupt()
                .map_err(wasmtime::Error::new)?;
            Ok(UpdateDeadline::Continue(1))
        });

        let mut linker = Linker::new(engine);
        link_capabilities(&mut linker).map_err(|e| SandboxError::Engine(e.to_string()))?;

        let instance = linker
            .instantiate(&mut store, module.module())
            .map_err(classify)?;
        let entry = instance
            .get_typed_func::<(), i32>(&mut store, ENTRY_EXPORT)
            .map_err(|e| SandboxError::AbiMismatch(e.to_string()))?;
        let status = entry.call(&mut store, ()).map_err(classify)?;
        store.data_mut().table.seal();

        let resonance = if status == 0 {
            read_resonance(&mut store, &instance, module)
        } else {
            Err(SandboxError::ModuleFault {
                status: Some(status),
                message: String::new(),
            })
        };
        if module.has_cleanup() {
            run_cleanup(&mut store, &instance, module.hash());
        }
        let resonance = resonance?;

        let outcome = SandboxOutcome::from_table(store.into_data().table, resonance, started);
        tracing::debug!(
            module_hash = module.hash(),
            host_calls = outcome.host_calls,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "module execution finished"
        );
        Ok(outcome)
    }

    /// Run a native ritual against `snapshot` through a fresh capability
    /// table.
    pub fn run_native(
        &self,
        ritual: &dyn NativeRitual,
        snapshot: ArchetypalState,
        parameters: &RitualParameters,
        cancel: CancelFlag,
    ) -> Result<SandboxOutcome> {
        let started = Instant::now();
        let mut table =
            CapabilityTable::new(snapshot, &self.config, started + self.config.timeout, cancel);

        let status = ritual.execute(&mut table, parameters)?;
        table.check_interrupt()?;
        table.seal();
        if status != 0 {
            return Err(SandboxError::ModuleFault {
                status: Some(status),
                message: String::new(),
            });
        }

        let resonance = match ritual.resonance(&mut table) {
            Ok(value) => value.and_then(finite_unit),
            Err(trap) if trap.is_abort() => return Err(trap.into()),
            Err(trap) => {
                tracing::debug!(error = %trap, "native resonance unavailable");
                None
            }
        };
        Ok(SandboxOutcome::from_table(table, resonance, started))
    }
}

fn finite_unit(value: f64) -> Option<f64> {
    value.is_finite().then(|| clamp_unit(value))
}

fn aborts_execution(err: &SandboxError) -> bool {
    matches!(
        err,
        SandboxError::Timeout | SandboxError::ResourceLimitExceeded(_) | SandboxError::Cancelled
    )
}

fn read_resonance(
    store: &mut Store<HostState>,
    instance: &Instance,
    module: &CompiledModule,
) -> Result<Option<f64>> {
    if !module.has_resonance() {
        return Ok(None);
    }
    let Ok(func) = instance.get_typed_func::<(), f64>(&mut *store, RESONANCE_EXPORT) else {
        return Ok(None);
    };
    match func.call(&mut *store, ()) {
        Ok(value) => Ok(finite_unit(value)),
        Err(err) => {
            let err = classify(err);
            if aborts_execution(&err) {
                return Err(err);
            }
            tracing::debug!(module_hash = module.hash(), error = %err, "resonance unavailable");
            Ok(None)
        }
    }
}

fn run_cleanup(store: &mut Store<HostState>, instance: &Instance, hash: &str) {
    let result = instance
        .get_typed_func::<(), ()>(&mut *store, CLEANUP_EXPORT)
        .and_then(|func| func.call(&mut *store, ()));
    if let Err(err) = result {
        tracing::warn!(module_hash = hash, error = %classify(err), "cleanup failed");
    }
}

/// Map a wasmtime error to a sandbox error, recovering host traps.
fn classify(err: wasmtime::Error) -> SandboxError {
    if let Some(trap) = err.downcast_ref::<HostTrap>() {
        return trap.clone().into();
    }
    if let Some(trap) = err.downcast_ref::<Trap>() {
        return match trap {
            Trap::OutOfFuel | Trap::Interrupt => SandboxError::Timeout,
            other => SandboxError::ModuleFault {
                status: None,
                message: other.to_string(),
            },
        };
    }
    SandboxError::ModuleFault {
        status: None,
        message: err.to_string(),
    }
}

/// The in-bounds range `ptr..ptr + len`, shortened to at most `limit` bytes.
fn guest_range(
    memory_len: usize,
    ptr: i32,
    len: i32,
    limit: usize,
) -> std::result::Result<Range<usize>, HostTrap> {
    let (Ok(start), Ok(len)) = (usize::try_from(ptr), usize::try_from(len)) else {
        return Err(HostTrap::GuestFault(format!(
            "negative pointer or length ({}, {})",
            ptr, len
        )));
    };
    let end = start
        .checked_add(len)
        .ok_or_else(|| HostTrap::GuestFault("string range overflows".to_string()))?;
    if end > memory_len {
        return Err(HostTrap::GuestFault(format!(
            "string range {}..{} out of bounds",
            start, end
        )));
    }
    Ok(start..start + len.min(limit))
}

fn guest_bytes(
    caller: &mut Caller<'_, HostState>,
    ptr: i32,
    len: i32,
    limit: usize,
) -> std::result::Result<Vec<u8>, HostTrap> {
    let memory = caller
        .get_export(MEMORY_EXPORT)
        .and_then(Extern::into_memory)
        .ok_or_else(|| HostTrap::GuestFault("module exports no memory".to_string()))?;
    let data = memory.data(&*caller);
    let range = guest_range(data.len(), ptr, len, limit)?;
    Ok(data[range].to_vec())
}

fn guest_str(
    caller: &mut Caller<'_, HostState>,
    ptr: i32,
    len: i32,
) -> std::result::Result<String, HostTrap> {
    let bytes = guest_bytes(caller, ptr, len, usize::MAX)?;
    String::from_utf8(bytes).map_err(|_| HostTrap::GuestFault("string is not UTF-8".to_string()))
}

/// Lossy text of a log prefix, without a replacement char for a code point
/// the cut split.
fn log_text(bytes: &[u8]) -> String {
    let whole = match std::str::from_utf8(bytes) {
        Err(e) if e.error_len().is_none() => &bytes[..e.valid_up_to()],
        _ => bytes,
    };
    String::from_utf8_lossy(whole).into_owned()
}

fn link_capabilities(linker: &mut Linker<HostState>) -> wasmtime::Result<()> {
    linker.func_wrap(
        HOST_NAMESPACE,
        "log",
        |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> wasmtime::Result<()> {
            let limit = caller.data().table.max_log_bytes();
            let bytes =
                guest_bytes(&mut caller, ptr, len, limit).map_err(wasmtime::Error::new)?;
            let message = log_text(&bytes);
            caller
                .data_mut()
                .table
                .log(&message)
                .map_err(wasmtime::Error::new)
        },
    )?;
    linker.func_wrap(
        HOST_NAMESPACE,
        "get_archetype_activation",
        |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> wasmtime::Result<f64> {
            let name = guest_str(&mut caller, ptr, len).map_err(wasmtime::Error::new)?;
            caller
                .data_mut()
                .table
                .get_archetype_activation(&name)
                .map_err(wasmtime::Error::new)
        },
    )?;
    linker.func_wrap(
        HOST_NAMESPACE,
        "set_archetype_activation",
        |mut caller: Caller<'_, HostState>, ptr: i32, len: i32, value: f64| -> wasmtime::Result<()> {
            let name = guest_str(&mut caller, ptr, len).map_err(wasmtime::Error::new)?;
            caller
                .data_mut()
                .table
                .set_archetype_activation(&name, value)
                .map_err(wasmtime::Error::new)
        },
    )?;
    linker.func_wrap(
        HOST_NAMESPACE,
        "get_energy_amplitude",
        |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> wasmtime::Result<f64> {
            let name = guest_str(&mut caller, ptr, len).map_err(wasmtime::Error::new)?;
            caller
                .data_mut()
                .table
                .get_energy_amplitude(&name)
                .map_err(wasmtime::Error::new)
        },
    )?;
    linker.func_wrap(
        HOST_NAMESPACE,
        "set_energy_amplitude",
        |mut caller: Caller<'_, HostState>, ptr: i32, len: i32, value: f64| -> wasmtime::Result<()> {
            let name = guest_str(&mut caller, ptr, len).map_err(wasmtime::Error::new)?;
            caller
                .data_mut()
                .table
                .set_energy_amplitude(&name, value)
                .map_err(wasmtime::Error::new)
        },
    )?;
    linker.func_wrap(
        HOST_NAMESPACE,
        "add_symbol",
        |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> wasmtime::Result<()> {
            let symbol = guest_str(&mut caller, ptr, len).map_err(wasmtime::Error::new)?;
            caller
                .data_mut()
                .table
                .add_symbol(&symbol)
                .map_err(wasmtime::Error::new)
        },
    )?;
    linker.func_wrap(
        HOST_NAMESPACE,
        "get_random",
        |mut caller: Caller<'_, HostState>| -> wasmtime::Result<f64> {
            caller
                .data_mut()
                .table
                .get_random()
                .map_err(wasmtime::Error::new)
        },
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_recovers_host_traps() {
        let err = wasmtime::Error::new(HostTrap::RandomBudgetExhausted);
        assert!(matches!(
            classify(err),
            SandboxError::ResourceLimitExceeded(crate::LimitKind::RandomCalls)
        ));
    }

    #[test]
    fn classify_maps_fuel_to_timeout() {
        let err = wasmtime::Error::new(Trap::OutOfFuel);
        assert_eq!(classify(err), SandboxError::Timeout);
    }

    #[test]
    fn guest_range_clamps_to_the_limit() {
        assert_eq!(guest_range(65536, 1024, 60000, 512), Ok(1024..1536));
        assert_eq!(guest_range(65536, 0, 6, 512), Ok(0..6));
        assert_eq!(guest_range(65536, 10, 6, usize::MAX), Ok(10..16));
    }

    #[test]
    fn guest_range_checks_the_whole_range() {
        assert!(guest_range(65536, 65000, 1000, 512).is_err());
        assert!(guest_range(65536, -1, 4, 512).is_err());
        assert!(guest_range(65536, 4, -1, 512).is_err());
    }

    #[test]
    fn log_text_drops_a_split_code_point() {
        let moon = "🌑".as_bytes();
        assert_eq!(log_text(&moon[..3]), "");
        assert_eq!(log_text(b"ok\xff!"), "ok\u{fffd}!");
        assert_eq!(log_text("a🌑".as_bytes()), "a🌑");
    }

    #[test]
    fn non_finite_resonance_is_unknown() {
        assert_eq!(finite_unit(f64::NAN), None);
        assert_eq!(finite_unit(f64::INFINITY), None);
        assert_eq!(finite_unit(1.4), Some(1.0));
        assert_eq!(finite_unit(0.25), Some(0.25));
    }
}
