use std::sync::Arc;

use codex_registry::{
    content_hash, Executable, InMemoryCatalog, ModuleCache, ModuleRegistry, NativeHandlers,
    RegistryError,
};
use codex_state::RitualDefinition;

const MINIMAL: &str = r#"(module
    (import "codex" "add_symbol" (func $add_symbol (param i32 i32)))
    (memory (export "memory") 1)
    (data (i32.const 0) "\e2\88\9e")
    (func (export "execute_ritual") (result i32)
      (call $add_symbol (i32.const 0) (i32.const 3))
      (i32.const 0)))"#;

fn registry_with(definitions: Vec<RitualDefinition>) -> (ModuleRegistry, Arc<ModuleCache>) {
    let catalog = InMemoryCatalog::with_builtins();
    for definition in definitions {
        catalog.register(definition);
    }
    let cache = Arc::new(ModuleCache::new());
    let registry = ModuleRegistry::new(Arc::new(catalog), NativeHandlers::with_builtins())
        .with_cache(Arc::clone(&cache));
    (registry, cache)
}

#[test]
fn builtin_resolves_to_native() {
    let (registry, _) = registry_with(vec![]);
    let resolved = registry.resolve("shadow_integration").unwrap();
    assert!(matches!(resolved.executable, Executable::Native(_)));
    assert_eq!(resolved.definition.required_archetypes, vec!["Shadow", "Sage"]);
}

#[test]
fn unknown_ritual_is_not_found() {
    let (registry, _) = registry_with(vec![]);
    assert_eq!(
        registry.resolve("moon_bathing").unwrap_err(),
        RegistryError::ModuleNotFound {
            ritual_id: "moon_bathing".to_string()
        }
    );
}

#[test]
fn missing_native_handler_is_not_found() {
    let (registry, _) = registry_with(vec![RitualDefinition::native("light_work", "shine")]);
    assert!(matches!(
        registry.resolve("light_work"),
        Err(RegistryError::ModuleNotFound { .. })
    ));
}

#[test]
fn module_resolves_and_is_cached_once() {
    let bytes = wat::parse_str(MINIMAL).unwrap();
    let hash = content_hash(&bytes);
    let (registry, cache) = registry_with(vec![RitualDefinition::module(
        "infinity",
        "touch the infinite",
        bytes,
        hash.to_uppercase(),
    )]);

    let first = registry.resolve("infinity").unwrap();
    let second = registry.resolve("infinity").unwrap();

    let (Executable::Module(a), Executable::Module(b)) = (first.executable, second.executable)
    else {
        panic!("expected module executables");
    };
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.hash(), hash);
    assert_eq!(cache.len(), 1);
}

#[test]
fn hash_mismatch_is_an_integrity_error() {
    let bytes = wat::parse_str(MINIMAL).unwrap();
    let (registry, cache) = registry_with(vec![RitualDefinition::module(
        "tampered",
        "",
        bytes,
        "00".repeat(32),
    )]);

    let err = registry.resolve("tampered").unwrap_err();
    assert!(matches!(
        err,
        RegistryError::IntegrityMismatch { ref ritual_id, .. } if ritual_id == "tampered"
    ));
    assert!(cache.is_empty());
}

#[test]
fn abi_violation_is_an_integrity_error() {
    let bytes = wat::parse_str(
        r#"(module
            (import "env" "clock" (func (result i64)))
            (memory (export "memory") 1)
            (func (export "execute_ritual") (result i32) i32.const 0))"#,
    )
    .unwrap();
    let hash = content_hash(&bytes);
    let (registry, cache) = registry_with(vec![]);

    let err = registry.verify(&bytes, &hash).unwrap_err();
    assert!(matches!(err, RegistryError::IntegrityMismatch { .. }));
    assert!(cache.is_empty());
}

#[test]
fn verify_populates_cache() {
    let bytes = wat::parse_str(MINIMAL).unwrap();
    let hash = content_hash(&bytes);
    let (registry, cache) = registry_with(vec![]);

    let module = registry.verify(&bytes, &format!("  {}  ", hash)).unwrap();
    assert_eq!(module.hash(), hash);
    assert!(cache.get(&hash).is_some());
}

#[test]
fn malformed_definition_is_rejected() {
    let (registry, _) = registry_with(vec![RitualDefinition::module("empty", "", vec![], "ab")]);
    assert!(matches!(
        registry.resolve("empty"),
        Err(RegistryError::InvalidDefinition(_))
    ));
}
