//! Compiled ritual modules and the binary contract they must satisfy.
//!
//! A module may import any subset of the capability table from the `codex`
//! namespace, each with its exact signature, and nothing else. It must export
//! `memory` and `execute_ritual`, may export `get_resonance` and `cleanup`,
//! and may not export any other function. Global and table exports are
//! tolerated.

use wasmtime::{ExternType, FuncType, Module, ValType};

use crate::engine;
use crate::error::{Result, SandboxError};

/// Import namespace for host capabilities.
pub const HOST_NAMESPACE: &str = "codex";

pub const MEMORY_EXPORT: &str = "memory";
pub const ENTRY_EXPORT: &str = "execute_ritual";
pub const RESONANCE_EXPORT: &str = "get_resonance";
pub const CLEANUP_EXPORT: &str = "cleanup";

/// Scalar types that appear in the capability ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    I32,
    I64,
    F32,
    F64,
    Other,
}

impl From<&ValType> for Scalar {
    fn from(ty: &ValType) -> Self {
        match ty {
            ValType::I32 => Scalar::I32,
            ValType::I64 => Scalar::I64,
            ValType::F32 => Scalar::F32,
            ValType::F64 => Scalar::F64,
            _ => Scalar::Other,
        }
    }
}

/// Name, params, results.
type Signature = (&'static str, &'static [Scalar], &'static [Scalar]);

/// Every capability a module may import.
pub const CAPABILITY_SIGNATURES: &[Signature] = &[
    ("log", &[Scalar::I32, Scalar::I32], &[]),
    ("get_archetype_activation", &[Scalar::I32, Scalar::I32], &[Scalar::F64]),
    (
        "set_archetype_activation",
        &[Scalar::I32, Scalar::I32, Scalar::F64],
        &[],
    ),
    ("get_energy_amplitude", &[Scalar::I32, Scalar::I32], &[Scalar::F64]),
    (
        "set_energy_amplitude",
        &[Scalar::I32, Scalar::I32, Scalar::F64],
        &[],
    ),
    ("add_symbol", &[Scalar::I32, Scalar::I32], &[]),
    ("get_random", &[], &[Scalar::F64]),
];

const EXPORT_SIGNATURES: &[Signature] = &[
    (ENTRY_EXPORT, &[], &[Scalar::I32]),
    (RESONANCE_EXPORT, &[], &[Scalar::F64]),
    (CLEANUP_EXPORT, &[], &[]),
];

/// A module that compiled and passed the ABI check.
#[derive(Debug, Clone)]
pub struct CompiledModule {
    hash: String,
    module: Module,
    has_resonance: bool,
    has_cleanup: bool,
}

impl CompiledModule {
    /// Compile `bytes` on the shared engine and check the binary contract.
    pub fn compile(bytes: &[u8], hash: impl Into<String>) -> Result<Self> {
        let engine = engine::shared()?;
        let module =
            Module::new(engine, bytes).map_err(|e| SandboxError::Compile(e.to_string()))?;
        check_imports(&module)?;
        let (has_resonance, has_cleanup) = check_exports(&module)?;
        Ok(Self {
            hash: hash.into(),
            module,
            has_resonance,
            has_cleanup,
        })
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn has_resonance(&self) -> bool {
        self.has_resonance
    }

    pub fn has_cleanup(&self) -> bool {
        self.has_cleanup
    }
}

fn shape(ty: &FuncType) -> (Vec<Scalar>, Vec<Scalar>) {
    (
        ty.params().map(|p| Scalar::from(&p)).collect(),
        ty.results().map(|r| Scalar::from(&r)).collect(),
    )
}

fn lookup(table: &[Signature], name: &str) -> Option<Signature> {
    table.iter().copied().find(|(n, _, _)| *n == name)
}

fn check_imports(module: &Module) -> Result<()> {
    for import in module.imports() {
        let label = format!("{}::{}", import.module(), import.name());
        if import.module() != HOST_NAMESPACE {
            return Err(SandboxError::AbiMismatch(format!(
                "import {} is outside the {} namespace",
                label, HOST_NAMESPACE
            )));
        }
        let ExternType::Func(ty) = import.ty() else {
            return Err(SandboxError::AbiMismatch(format!(
                "import {} is not a function",
                label
            )));
        };
        let Some((_, params, results)) = lookup(CAPABILITY_SIGNATURES, import.name()) else {
            return Err(SandboxError::AbiMismatch(format!(
                "import {} is not a host capability",
                label
            )));
        };
        let (got_params, got_results) = shape(&ty);
        if got_params != params || got_results != results {
            return Err(SandboxError::AbiMismatch(format!(
                "import {} has signature {:?} -> {:?}, expected {:?} -> {:?}",
                label, got_params, got_results, params, results
            )));
        }
    }
    Ok(())
}

fn check_exports(module: &Module) -> Result<(bool, bool)> {
    let mut has_memory = false;
    let mut has_entry = false;
    let mut has_resonance = false;
    let mut has_cleanup = false;

    for export in module.exports() {
        let name = export.name();
        match export.ty() {
            ExternType::Memory(_) if name == MEMORY_EXPORT => has_memory = true,
            ExternType::Memory(_) => {
                return Err(SandboxError::AbiMismatch(format!(
                    "unexpected memory export {}",
                    name
                )));
            }
            ExternType::Func(ty) => {
                let Some((_, params, results)) = lookup(EXPORT_SIGNATURES, name) else {
                    return Err(SandboxError::AbiMismatch(format!(
                        "unexpected function export {}",
                        name
                    )));
                };
                let (got_params, got_results) = shape(&ty);
                if got_params != params || got_results != results {
                    return Err(SandboxError::AbiMismatch(format!(
                        "export {} has signature {:?} -> {:?}, expected {:?} -> {:?}",
                        name, got_params, got_results, params, results
                    )));
                }
                match name {
                    ENTRY_EXPORT => has_entry = true,
                    RESONANCE_EXPORT => has_resonance = true,
                    _ => has_cleanup = true,
                }
            }
            _ => {}
        }
    }

    if !has_memory {
        return Err(SandboxError::AbiMismatch(format!(
            "missing {} export",
            MEMORY_EXPORT
        )));
    }
    if !has_entry {
        return Err(SandboxError::AbiMismatch(format!(
            "missing {} export",
            ENTRY_EXPORT
        )));
    }
    Ok((has_resonance, has_cleanup))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(text: &str) -> Result<CompiledModule> {
        let bytes = wat::parse_str(text).unwrap();
        CompiledModule::compile(&bytes, "test")
    }

    #[test]
    fn minimal_module_is_accepted() {
        let module = compile(
            r#"(module
                (memory (export "memory") 1)
                (func (export "execute_ritual") (result i32) i32.const 0))"#,
        )
        .unwrap();
        assert_eq!(module.hash(), "test");
        assert!(!module.has_resonance());
        assert!(!module.has_cleanup());
    }

    #[test]
    fn optional_exports_and_globals_are_recognised() {
        let module = compile(
            r#"(module
                (import "codex" "get_random" (func (result f64)))
                (memory (export "memory") 1)
                (global (export "__heap_base") i32 (i32.const 1024))
                (func (export "execute_ritual") (result i32) i32.const 0)
                (func (export "get_resonance") (result f64) f64.const 0.5)
                (func (export "cleanup")))"#,
        )
        .unwrap();
        assert!(module.has_resonance());
        assert!(module.has_cleanup());
    }

    #[test]
    fn unknown_import_is_rejected() {
        let err = compile(
            r#"(module
                (import "codex" "read_file" (func (param i32 i32)))
                (memory (export "memory") 1)
                (func (export "execute_ritual") (result i32) i32.const 0))"#,
        )
        .unwrap_err();
        assert!(matches!(err, SandboxError::AbiMismatch(m) if m.contains("read_file")));
    }

    #[test]
    fn foreign_namespace_is_rejected() {
        let err = compile(
            r#"(module
                (import "wasi_snapshot_preview1" "fd_write" (func (param i32 i32 i32 i32) (result i32)))
                (memory (export "memory") 1)
                (func (export "execute_ritual") (result i32) i32.const 0))"#,
        )
        .unwrap_err();
        assert!(matches!(err, SandboxError::AbiMismatch(_)));
    }

    #[test]
    fn wrong_import_signature_is_rejected() {
        let err = compile(
            r#"(module
                (import "codex" "get_random" (func (result f32)))
                (memory (export "memory") 1)
                (func (export "execute_ritual") (result i32) i32.const 0))"#,
        )
        .unwrap_err();
        assert!(matches!(err, SandboxError::AbiMismatch(m) if m.contains("get_random")));
    }

    #[test]
    fn missing_memory_or_entry_is_rejected() {
        assert!(matches!(
            compile(r#"(module (func (export "execute_ritual") (result i32) i32.const 0))"#),
            Err(SandboxError::AbiMismatch(_))
        ));
        assert!(matches!(
            compile(r#"(module (memory (export "memory") 1))"#),
            Err(SandboxError::AbiMismatch(_))
        ));
    }

    #[test]
    fn extra_function_export_is_rejected() {
        let err = compile(
            r#"(module
                (memory (export "memory") 1)
                (func (export "execute_ritual") (result i32) i32.const 0)
                (func (export "backdoor")))"#,
        )
        .unwrap_err();
        assert!(matches!(err, SandboxError::AbiMismatch(m) if m.contains("backdoor")));
    }

    #[test]
    fn wrong_entry_signature_is_rejected() {
        let err = compile(
            r#"(module
                (memory (export "memory") 1)
                (func (export "execute_ritual") (param i32) (result i32) local.get 0))"#,
        )
        .unwrap_err();
        assert!(matches!(err, SandboxError::AbiMismatch(_)));
    }

    #[test]
    fn garbage_bytes_fail_to_compile() {
        let err = CompiledModule::compile(b"not wasm", "x").unwrap_err();
        assert!(matches!(err, SandboxError::Compile(_)));
    }
}
