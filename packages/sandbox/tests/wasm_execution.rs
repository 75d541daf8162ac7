use std::time::Duration;

use codex_sandbox::{
    CancelFlag, CompiledModule, LimitKind, Sandbox, SandboxConfig, SandboxError, SandboxOutcome,
};
use codex_state::{ArchetypalState, PractitionerId, StateLimits};

const IMPORTS: &str = r#"
    (import "codex" "log" (func $log (param i32 i32)))
    (import "codex" "get_archetype_activation" (func $get_arch (param i32 i32) (result f64)))
    (import "codex" "set_archetype_activation" (func $set_arch (param i32 i32 f64)))
    (import "codex" "get_energy_amplitude" (func $get_energy (param i32 i32) (result f64)))
    (import "codex" "set_energy_amplitude" (func $set_energy (param i32 i32 f64)))
    (import "codex" "add_symbol" (func $add_symbol (param i32 i32)))
    (import "codex" "get_random" (func $rand (result f64)))
"#;

/// Shadow at 0, Light at 16, "◯●◯" at 32, "🌑" at 48, "⚡" at 64, "Fire" at 80.
const DATA: &str = r#"
    (memory (export "memory") 1)
    (data (i32.const 0) "Shadow")
    (data (i32.const 16) "Light")
    (data (i32.const 32) "\e2\97\af\e2\97\8f\e2\97\af")
    (data (i32.const 48) "\f0\9f\8c\91")
    (data (i32.const 64) "\e2\9a\a1")
    (data (i32.const 80) "Fire")
"#;

fn module(body: &str) -> CompiledModule {
    let text = format!("(module {} {} {})", IMPORTS, DATA, body);
    let bytes = wat::parse_str(&text).unwrap();
    CompiledModule::compile(&bytes, "test-module").unwrap()
}

fn shadow_state() -> ArchetypalState {
    ArchetypalState::new(PractitionerId::new())
        .with_archetype("Shadow", 0.2)
        .with_archetype("Light", 0.5)
}

fn run(module: &CompiledModule, config: SandboxConfig) -> Result<SandboxOutcome, SandboxError> {
    Sandbox::new(config).run_module(module, shadow_state(), CancelFlag::new())
}

const SHADOW_RITUAL: &str = r#"
    (func (export "execute_ritual") (result i32)
      (local $s f64) (local $l f64) (local $factor f64)
      (local.set $s (call $get_arch (i32.const 0) (i32.const 6)))
      (local.set $l (call $get_arch (i32.const 16) (i32.const 5)))
      (local.set $factor
        (f64.mul
          (f64.add (f64.const 0.2) (f64.mul (call $rand) (f64.const 0.3)))
          (f64.add (f64.const 1) (f64.abs (f64.sub (local.get $s) (local.get $l))))))
      (call $set_arch (i32.const 0) (i32.const 6) (f64.add (local.get $s) (local.get $factor)))
      (call $set_arch (i32.const 16) (i32.const 5)
        (f64.add (local.get $l) (f64.mul (f64.const 0.3) (local.get $factor))))
      (call $add_symbol (i32.const 32) (i32.const 9))
      (call $add_symbol (i32.const 48) (i32.const 4))
      (if (f64.gt (local.get $factor) (f64.const 0.4))
        (then (call $add_symbol (i32.const 64) (i32.const 3))))
      (call $log (i32.const 0) (i32.const 6))
      (i32.const 0))

    (func (export "get_resonance") (result f64)
      (local $s f64) (local $l f64)
      (local.set $s (call $get_arch (i32.const 0) (i32.const 6)))
      (local.set $l (call $get_arch (i32.const 16) (i32.const 5)))
      ;; writes after the entry point are ignored
      (call $set_arch (i32.const 0) (i32.const 6) (f64.const 0.0))
      (f64.mul (f64.const 0.5)
        (f64.add (local.get $s)
          (f64.sub (f64.const 1) (f64.abs (f64.sub (local.get $s) (local.get $l)))))))
"#;

#[test]
fn shadow_module_writes_into_buffer() {
    let module = module(SHADOW_RITUAL);
    let outcome = run(&module, SandboxConfig::default()).unwrap();

    let shadow = outcome.buffer.archetype("Shadow").unwrap();
    let light = outcome.buffer.archetype("Light").unwrap();
    let factor = shadow - 0.2;
    assert!(shadow > 0.2);
    assert!(light > 0.5);
    assert!((light - (0.5 + 0.3 * factor)).abs() < 1e-9);

    let symbols = outcome.buffer.symbols();
    assert_eq!(symbols[0], "◯●◯");
    assert_eq!(symbols[1], "🌑");
    if (factor - 0.4).abs() > 1e-9 {
        assert_eq!(symbols.contains(&"⚡".to_string()), factor > 0.4);
    }

    let expected = 0.5 * (shadow + (1.0 - (shadow - light).abs()));
    let resonance = outcome.resonance.unwrap();
    assert!((resonance - expected).abs() < 1e-9);

    assert_eq!(outcome.logs, vec!["Shadow".to_string()]);
    assert_eq!(outcome.random_calls, 1);
    assert!(outcome.host_calls >= 8);
}

#[test]
fn snapshot_is_never_touched() {
    let module = module(SHADOW_RITUAL);
    let state = shadow_state();
    let before = state.clone();

    let _ = Sandbox::default()
        .run_module(&module, state.clone(), CancelFlag::new())
        .unwrap();

    assert_eq!(state, before);
}

#[test]
fn nonzero_status_is_a_module_fault() {
    let module = module(
        r#"(func (export "execute_ritual") (result i32)
             (call $set_arch (i32.const 0) (i32.const 6) (f64.const 0.9))
             (i32.const 7))"#,
    );
    let err = run(&module, SandboxConfig::default()).unwrap_err();
    assert_eq!(
        err,
        SandboxError::ModuleFault {
            status: Some(7),
            message: String::new()
        }
    );
}

#[test]
fn trap_is_a_module_fault() {
    let module = module(r#"(func (export "execute_ritual") (result i32) unreachable)"#);
    let err = run(&module, SandboxConfig::default()).unwrap_err();
    assert!(matches!(err, SandboxError::ModuleFault { status: None, .. }));
}

#[test]
fn out_of_bounds_string_is_a_module_fault() {
    let module = module(
        r#"(func (export "execute_ritual") (result i32)
             (call $add_symbol (i32.const 65530) (i32.const 100))
             (i32.const 0))"#,
    );
    let err = run(&module, SandboxConfig::default()).unwrap_err();
    assert!(matches!(err, SandboxError::ModuleFault { status: None, message } if message.contains("out of bounds")));
}

#[test]
fn infinite_loop_times_out() {
    let module = module(
        r#"(func (export "execute_ritual") (result i32)
             (loop $spin (br $spin))
             (i32.const 0))"#,
    );
    let config = SandboxConfig {
        timeout: Duration::from_millis(200),
        fuel: 1_000_000_000_000,
        ..SandboxConfig::default()
    };
    let err = run(&module, config).unwrap_err();
    assert_eq!(err, SandboxError::Timeout);
}

#[test]
fn fuel_exhaustion_is_a_timeout() {
    let module = module(
        r#"(func (export "execute_ritual") (result i32)
             (loop $spin (br $spin))
             (i32.const 0))"#,
    );
    let config = SandboxConfig {
        fuel: 10_000,
        ..SandboxConfig::default()
    };
    let err = run(&module, config).unwrap_err();
    assert_eq!(err, SandboxError::Timeout);
}

const RANDOM_LOOP: &str = r#"
    (func (export "execute_ritual") (result i32)
      (local $i i32)
      (loop $draw
        (drop (call $rand))
        (local.set $i (i32.add (local.get $i) (i32.const 1)))
        (br_if $draw (i32.lt_u (local.get $i) (global.get $draws))))
      (i32.const 0))
"#;

fn random_module(draws: u32) -> CompiledModule {
    module(&format!(
        "(global $draws i32 (i32.const {})) {}",
        draws, RANDOM_LOOP
    ))
}

#[test]
fn random_budget_can_be_used_in_full() {
    let outcome = run(&random_module(10_000), SandboxConfig::default()).unwrap();
    assert_eq!(outcome.random_calls, 10_000);
}

#[test]
fn random_over_budget_is_a_resource_limit() {
    let err = run(&random_module(10_001), SandboxConfig::default()).unwrap_err();
    assert_eq!(err, SandboxError::ResourceLimitExceeded(LimitKind::RandomCalls));
}

#[test]
fn host_call_budget_is_enforced() {
    let config = SandboxConfig {
        max_host_calls: 50,
        ..SandboxConfig::default()
    };
    let err = run(&random_module(100), config).unwrap_err();
    assert_eq!(err, SandboxError::ResourceLimitExceeded(LimitKind::HostCalls));
}

#[test]
fn memory_growth_past_limit_is_a_resource_limit() {
    let module = module(
        r#"(func (export "execute_ritual") (result i32)
             (drop (memory.grow (i32.const 1000)))
             (i32.const 0))"#,
    );
    let err = run(&module, SandboxConfig::default()).unwrap_err();
    assert_eq!(err, SandboxError::ResourceLimitExceeded(LimitKind::Memory));
}

#[test]
fn small_memory_growth_is_allowed() {
    let module = module(
        r#"(func (export "execute_ritual") (result i32)
             (if (i32.lt_s (memory.grow (i32.const 2)) (i32.const 0))
               (then (return (i32.const 1))))
             (i32.const 0))"#,
    );
    assert!(run(&module, SandboxConfig::default()).is_ok());
}

#[test]
fn cancellation_stops_a_running_module() {
    let module = module(
        r#"(func (export "execute_ritual") (result i32)
             (loop $spin (br $spin))
             (i32.const 0))"#,
    );
    let cancel = CancelFlag::new();
    let sandbox = Sandbox::new(SandboxConfig {
        fuel: 1_000_000_000_000,
        timeout: Duration::from_secs(30),
        ..SandboxConfig::default()
    });

    let trigger = cancel.clone();
    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        trigger.cancel();
    });
    let err = sandbox
        .run_module(&module, shadow_state(), cancel)
        .unwrap_err();
    canceller.join().unwrap();

    assert_eq!(err, SandboxError::Cancelled);
}

#[test]
fn failing_resonance_is_unknown() {
    let module = module(
        r#"(func (export "execute_ritual") (result i32) (i32.const 0))
           (func (export "get_resonance") (result f64) unreachable)"#,
    );
    let outcome = run(&module, SandboxConfig::default()).unwrap();
    assert_eq!(outcome.resonance, None);
}

#[test]
fn non_finite_resonance_is_unknown_and_large_is_clamped() {
    let nan = module(
        r#"(func (export "execute_ritual") (result i32) (i32.const 0))
           (func (export "get_resonance") (result f64) (f64.div (f64.const 0) (f64.const 0)))"#,
    );
    assert_eq!(run(&nan, SandboxConfig::default()).unwrap().resonance, None);

    let large = module(
        r#"(func (export "execute_ritual") (result i32) (i32.const 0))
           (func (export "get_resonance") (result f64) (f64.const 3.5))"#,
    );
    assert_eq!(
        run(&large, SandboxConfig::default()).unwrap().resonance,
        Some(1.0)
    );
}

#[test]
fn failing_cleanup_is_swallowed() {
    let module = module(
        r#"(func (export "execute_ritual") (result i32)
             (call $set_energy (i32.const 80) (i32.const 4) (f64.const 0.8))
             (i32.const 0))
           (func (export "cleanup") unreachable)"#,
    );
    let outcome = run(&module, SandboxConfig::default()).unwrap();
    assert_eq!(outcome.buffer.energy("Fire"), Some(0.8));
}

#[test]
fn out_of_range_writes_are_clamped() {
    let module = module(
        r#"(func (export "execute_ritual") (result i32)
             (call $set_arch (i32.const 0) (i32.const 6) (f64.const 42.0))
             (call $set_arch (i32.const 16) (i32.const 5) (f64.const -3.0))
             (call $set_energy (i32.const 80) (i32.const 4) (f64.const 9.0))
             (i32.const 0))"#,
    );
    let config = SandboxConfig {
        limits: StateLimits {
            max_energy: 2.0,
            ..StateLimits::default()
        },
        ..SandboxConfig::default()
    };
    let outcome = run(&module, config).unwrap();
    assert_eq!(outcome.buffer.archetype("Shadow"), Some(1.0));
    assert_eq!(outcome.buffer.archetype("Light"), Some(0.0));
    assert_eq!(outcome.buffer.energy("Fire"), Some(2.0));
}

#[test]
fn long_log_lines_are_truncated() {
    let module = module(
        r#"(func (export "execute_ritual") (result i32)
             (call $log (i32.const 1024) (i32.const 4000))
             (i32.const 0))"#,
    );
    let outcome = run(&module, SandboxConfig::default()).unwrap();
    assert_eq!(outcome.logs.len(), 1);
    assert_eq!(outcome.logs[0].len(), 512);
}

#[test]
fn repeated_symbols_are_deduplicated() {
    let module = module(
        r#"(func (export "execute_ritual") (result i32)
             (call $add_symbol (i32.const 48) (i32.const 4))
             (call $add_symbol (i32.const 48) (i32.const 4))
             (call $add_symbol (i32.const 48) (i32.const 4))
             (i32.const 0))"#,
    );
    let outcome = run(&module, SandboxConfig::default()).unwrap();
    assert_eq!(outcome.buffer.symbols(), &["🌑".to_string()]);
    assert_eq!(outcome.symbols_dropped, 0);
}
