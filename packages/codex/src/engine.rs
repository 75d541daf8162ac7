//! The engine facade.

use std::sync::Arc;

use codex_analyzer::{Analyzer, TransformationAnalysis};
use codex_oracle::{OracleClient, OracleInsight, RitualContext};
use codex_registry::{Executable, ModuleRegistry};
use codex_sandbox::{CancelFlag, RitualParameters, Sandbox, SandboxError, SandboxOutcome};
use codex_state::{ArchetypalState, PractitionerId};
use uuid::Uuid;

use crate::config::{CodexConfig, ConflictPolicy, EngineConfig};
use crate::error::{RepositoryError, Result, RitualExecutionError};
use crate::locks::PractitionerLocks;
use crate::repository::StateRepository;
use crate::result::TransformationResult;

/// Resolves, runs, commits, and analyzes rituals.
///
/// Cloning is cheap and clones share the per-practitioner slots, so every
/// clone serializes against the others.
#[derive(Clone)]
pub struct RitualEngine {
    registry: ModuleRegistry,
    sandbox: Sandbox,
    analyzer: Analyzer,
    oracle: OracleClient,
    locks: PractitionerLocks,
    config: EngineConfig,
    repository: Option<Arc<dyn StateRepository>>,
}

impl Default for RitualEngine {
    fn default() -> Self {
        Self::new(ModuleRegistry::with_builtins())
    }
}

impl RitualEngine {
    /// Default components around `registry`. The oracle reads its
    /// credential from the environment.
    pub fn new(registry: ModuleRegistry) -> Self {
        Self {
            registry,
            sandbox: Sandbox::default(),
            analyzer: Analyzer::default(),
            oracle: OracleClient::from_env(),
            locks: PractitionerLocks::new(),
            config: EngineConfig::default(),
            repository: None,
        }
    }

    /// Components configured from `config`, with the oracle's file settings
    /// overlaid by the environment.
    pub fn from_config(registry: ModuleRegistry, config: &CodexConfig) -> Self {
        let oracle = config
            .oracle_config()
            .overlay(|name| std::env::var(name).ok());
        Self {
            registry,
            sandbox: Sandbox::new(config.sandbox_config()),
            analyzer: Analyzer::new(config.analyzer.clone()),
            oracle: OracleClient::new(oracle),
            locks: PractitionerLocks::new(),
            config: config.engine_config(),
            repository: None,
        }
    }

    pub fn with_sandbox(mut self, sandbox: Sandbox) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn with_analyzer(mut self, analyzer: Analyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_oracle(mut self, oracle: OracleClient) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn with_repository(mut self, repository: Arc<dyn StateRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.config.conflict_policy = policy;
        self
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Run `ritual_id` against `state` and commit the result.
    ///
    /// `state` must pass [`ArchetypalState::validate`] first. It is never
    /// modified itself. On success the returned result
    /// carries the committed successor; on any error no state changed.
    /// Dropping the returned future cancels the sandbox.
    pub async fn execute(
        &self,
        ritual_id: &str,
        state: &ArchetypalState,
        parameters: RitualParameters,
        intention: &str,
    ) -> Result<TransformationResult> {
        let execution_id = Uuid::new_v4();
        let practitioner_id = state.practitioner_id;

        state
            .validate(&self.sandbox.config().limits)
            .map_err(|source| RitualExecutionError::InvalidState {
                ritual_id: ritual_id.to_string(),
                practitioner_id,
                source,
            })?;

        let resolved = self
            .registry
            .resolve(ritual_id)
            .map_err(|e| RitualExecutionError::from_registry(e, ritual_id, practitioner_id))?;

        let mut slot = self
            .locks
            .acquire(practitioner_id, self.config.conflict_policy)
            .await
            .ok_or_else(|| RitualExecutionError::ConcurrentExecutionConflict {
                ritual_id: ritual_id.to_string(),
                practitioner_id,
                reason: "another execution is in flight".to_string(),
            })?;
        if slot.is_stale(state.version) {
            return Err(RitualExecutionError::ConcurrentExecutionConflict {
                ritual_id: ritual_id.to_string(),
                practitioner_id,
                reason: format!(
                    "snapshot version {} predates committed version {}",
                    state.version,
                    slot.committed_version.unwrap_or_default()
                ),
            });
        }

        let unmet_prerequisites = self.analyzer.prerequisites(&resolved.definition, state);
        if !unmet_prerequisites.is_satisfied() {
            tracing::debug!(
                %execution_id,
                ritual_id,
                %practitioner_id,
                ?unmet_prerequisites,
                "executing with unmet prerequisites"
            );
        }

        let outcome = self
            .run_sandboxed(resolved.executable, state.clone(), parameters)
            .await
            .map_err(|e| {
                let err = RitualExecutionError::from_sandbox(e, ritual_id, practitioner_id);
                tracing::debug!(%execution_id, ritual_id, %practitioner_id, error = %err, "execution discarded");
                err
            })?;

        let new_state = state.commit(&outcome.buffer, &self.sandbox.config().limits);
        slot.committed_version = Some(new_state.version);
        drop(slot);

        let analysis = self.analyzer.analyze(state, &new_state);
        tracing::debug!(
            %execution_id,
            ritual_id,
            %practitioner_id,
            version = new_state.version,
            intensity = analysis.intensity,
            "ritual committed"
        );

        Ok(TransformationResult {
            execution_id,
            ritual_id: ritual_id.to_string(),
            practitioner_id,
            intention: intention.to_string(),
            new_state,
            analysis,
            unmet_prerequisites,
            resonance: outcome.resonance,
            module_logs: outcome.logs,
            host_calls: outcome.host_calls,
            random_calls: outcome.random_calls,
            symbols_dropped: outcome.symbols_dropped,
            duration_ms: outcome.elapsed.as_millis() as u64,
        })
    }

    /// Load the practitioner's state, execute, and save the successor.
    pub async fn perform(
        &self,
        ritual_id: &str,
        practitioner_id: PractitionerId,
        parameters: RitualParameters,
        intention: &str,
    ) -> Result<TransformationResult> {
        let persistence = |message: String| RitualExecutionError::Persistence {
            ritual_id: ritual_id.to_string(),
            practitioner_id,
            message,
        };

        let repository = self
            .repository
            .as_ref()
            .ok_or_else(|| persistence("no state repository configured".to_string()))?;
        let state = repository
            .load(practitioner_id)
            .await
            .map_err(|e| persistence(e.to_string()))?;

        let result = self.execute(ritual_id, &state, parameters, intention).await?;

        repository
            .save(&result.new_state)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict { .. } => {
                    RitualExecutionError::ConcurrentExecutionConflict {
                        ritual_id: ritual_id.to_string(),
                        practitioner_id,
                        reason: e.to_string(),
                    }
                }
                other => persistence(other.to_string()),
            })?;
        Ok(result)
    }

    /// Transformation metrics for any pair of states.
    pub fn analyze(&self, pre: &ArchetypalState, post: &ArchetypalState) -> TransformationAnalysis {
        self.analyzer.analyze(pre, post)
    }

    /// Ask the oracle about `pre` → `post`. Never fails.
    pub async fn interpret(
        &self,
        context: &RitualContext,
        pre: &ArchetypalState,
        post: &ArchetypalState,
    ) -> OracleInsight {
        self.oracle.interpret(context, pre, post).await
    }

    /// [`Self::interpret`] for a finished execution.
    pub async fn interpret_result(
        &self,
        pre: &ArchetypalState,
        result: &TransformationResult,
    ) -> OracleInsight {
        let context = RitualContext::new(
            result.ritual_id.clone(),
            result.intention.clone(),
            result.analysis.intensity,
        );
        self.interpret(&context, pre, &result.new_state).await
    }

    /// Run the executable on a blocking worker. Dropping the future raises
    /// the cancel flag the sandbox polls.
    async fn run_sandboxed(
        &self,
        executable: Executable,
        snapshot: ArchetypalState,
        parameters: RitualParameters,
    ) -> std::result::Result<SandboxOutcome, SandboxError> {
        let cancel = CancelFlag::new();
        let guard = cancel.guard();
        let sandbox = self.sandbox.clone();

        let joined = tokio::task::spawn_blocking(move || match executable {
            Executable::Native(ritual) => {
                sandbox.run_native(ritual.as_ref(), snapshot, &parameters, cancel)
            }
            Executable::Module(module) => sandbox.run_module(&module, snapshot, cancel),
        })
        .await;
        guard.disarm();

        joined.unwrap_or_else(|e| Err(SandboxError::Engine(format!("sandbox worker failed: {}", e))))
    }
}

impl std::fmt::Debug for RitualEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RitualEngine")
            .field("registry", &self.registry)
            .field("sandbox", &self.sandbox)
            .field("analyzer", &self.analyzer)
            .field("oracle", self.oracle.config())
            .field("config", &self.config)
            .field("has_repository", &self.repository.is_some())
            .finish()
    }
}
