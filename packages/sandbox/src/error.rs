//! Error types for the sandbox.

use thiserror::Error;

/// Which budget a ritual overran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Memory,
    HostCalls,
    RandomCalls,
}

impl std::fmt::Display for LimitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LimitKind::Memory => "memory",
            LimitKind::HostCalls => "host call budget",
            LimitKind::RandomCalls => "random call budget",
        };
        f.write_str(name)
    }
}

/// Conditions raised from inside a host capability call.
///
/// These travel through wasmtime as the payload of a trap and are recovered
/// with `downcast_ref` once the guest call unwinds.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HostTrap {
    #[error("host call budget exhausted")]
    CallBudgetExhausted,

    #[error("random call budget exhausted")]
    RandomBudgetExhausted,

    #[error("memory limit exceeded")]
    MemoryLimitExceeded,

    #[error("execution deadline exceeded")]
    DeadlineExceeded,

    #[error("execution cancelled")]
    Cancelled,

    /// The guest passed an argument the host could not use.
    #[error("guest fault: {0}")]
    GuestFault(String),
}

impl HostTrap {
    /// Whether this trap must abort the whole execution, even from an
    /// optional export.
    pub fn is_abort(&self) -> bool {
        !matches!(self, HostTrap::GuestFault(_))
    }
}

/// Errors that can occur while loading or running a ritual.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SandboxError {
    /// The bytes are not a valid wasm module.
    #[error("module failed to compile: {0}")]
    Compile(String),

    /// Imports or exports do not match the host capability shape.
    #[error("module ABI mismatch: {0}")]
    AbiMismatch(String),

    /// Nonzero status, trap, or guest fault.
    #[error("{}", fault_message(.status, .message))]
    ModuleFault {
        status: Option<i32>,
        message: String,
    },

    /// Wall-clock deadline or fuel exhausted.
    #[error("ritual timed out")]
    Timeout,

    #[error("resource limit exceeded: {0}")]
    ResourceLimitExceeded(LimitKind),

    #[error("execution cancelled")]
    Cancelled,

    /// The shared wasm engine could not be created.
    #[error("sandbox engine unavailable: {0}")]
    Engine(String),
}

fn fault_message(status: &Option<i32>, message: &str) -> String {
    match status {
        Some(code) => format!("module returned status {}", code),
        None => format!("module trapped: {}", message),
    }
}

impl From<HostTrap> for SandboxError {
    fn from(trap: HostTrap) -> Self {
        match trap {
            HostTrap::CallBudgetExhausted => {
                SandboxError::ResourceLimitExceeded(LimitKind::HostCalls)
            }
            HostTrap::RandomBudgetExhausted => {
                SandboxError::ResourceLimitExceeded(LimitKind::RandomCalls)
            }
            HostTrap::MemoryLimitExceeded => SandboxError::ResourceLimitExceeded(LimitKind::Memory),
            HostTrap::DeadlineExceeded => SandboxError::Timeout,
            HostTrap::Cancelled => SandboxError::Cancelled,
            HostTrap::GuestFault(message) => SandboxError::ModuleFault {
                status: None,
                message,
            },
        }
    }
}

/// Result type alias for sandbox operations.
pub type Result<T> = std::result::Result<T, SandboxError>;
