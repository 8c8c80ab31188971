//! The runner: executes a compiled phase graph to completion.
//!
//! One phase node executes between consecutive routing decisions; there is
//! no parallelism within a run. Each node sets the current phase, runs the
//! entry prompt into an artifact, dispatches the phase's tool calls in
//! declaration order, resolves the gate into an outcome event, and routes.
//! A configurable step limit bounds runaway cycles.

use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::artifacts::ArtifactStore;
use crate::blueprint::{Blueprint, GateKind, Phase};
use crate::config::Config;
use crate::errors::{ConfigError, RunError};
use crate::executor::{HttpBackend, PromptExecutor};
use crate::graph::{CompiledGraph, Target};
use crate::prompts::PromptLibrary;
use crate::state::{Event, RunState};
use crate::tools::ToolDispatcher;

const DEFAULT_APPROVER: &str = "PM";

pub struct Runner {
    executor: PromptExecutor,
    dispatcher: ToolDispatcher,
    artifacts: ArtifactStore,
    max_steps: u32,
}

impl Runner {
    pub fn new(
        executor: PromptExecutor,
        dispatcher: ToolDispatcher,
        artifacts: ArtifactStore,
        max_steps: u32,
    ) -> Self {
        Self {
            executor,
            dispatcher,
            artifacts,
            max_steps,
        }
    }

    /// Assemble a runner from configuration: offline executors need no API
    /// key, online ones do.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let executor = if config.offline {
            PromptExecutor::offline(config.model.clone())
        } else {
            let backend = HttpBackend::new(config.api_base.clone(), config.api_key.clone())?;
            PromptExecutor::new(Arc::new(backend), config.model.clone(), false)
        };
        let artifacts = ArtifactStore::new(config.artifacts_dir.clone());
        let dispatcher = ToolDispatcher::new(artifacts.clone());
        Ok(Self::new(executor, dispatcher, artifacts, config.max_steps))
    }

    /// Execute a blueprint to its terminal state and return the final run
    /// state. Approvals default to `{PM: true}` when not supplied.
    pub async fn run(
        &self,
        blueprint: &Blueprint,
        prompts: &PromptLibrary,
        approvals: Option<BTreeMap<String, bool>>,
    ) -> Result<RunState, RunError> {
        let graph = CompiledGraph::compile(blueprint)?;

        let mut ctx = blueprint.project.context.clone();
        ctx.insert("project_id".into(), json!(blueprint.project.id));
        let approvals = approvals
            .unwrap_or_else(|| BTreeMap::from([(DEFAULT_APPROVER.to_string(), true)]));
        let mut state = RunState::new(ctx, approvals);

        info!(project = %blueprint.project.id, phases = graph.len(), "starting run");

        let mut node = graph.entry();
        let mut steps = 0u32;
        while let Target::Phase(idx) = node {
            steps += 1;
            let phase = graph.phase(idx);
            if steps > self.max_steps {
                return Err(RunError::StepLimit {
                    limit: self.max_steps,
                    phase: phase.id.clone(),
                });
            }
            let event = self.execute_phase(phase, prompts, &mut state).await?;
            state.last_event = Some(event);
            node = graph.route(idx, event);
        }

        info!(project = %blueprint.project.id, "run complete");
        Ok(state)
    }

    async fn execute_phase(
        &self,
        phase: &Phase,
        prompts: &PromptLibrary,
        state: &mut RunState,
    ) -> Result<Event, RunError> {
        state.phase = phase.id.clone();
        info!(phase = %phase.id, "entering phase");

        // Artifact map entries are written at most once per phase per run;
        // a rework loop revisiting a phase skips the entry prompt.
        let role_prompt = prompts.get(&phase.entry_prompt).unwrap_or("");
        if !role_prompt.is_empty() && !state.artifacts.contains_key(&phase.id) {
            let output = self.executor.run_prompt(role_prompt, state).await?;
            let path = self.artifacts.write(&format!("{}.md", phase.id), &output)?;
            info!(phase = %phase.id, path = %path.display(), "artifact written");
            state.artifacts.insert(phase.id.clone(), path);
        }

        for task in &phase.tasks {
            for spec in &task.tool_calls {
                // Results only matter for their side effects at this layer.
                self.dispatcher.dispatch(spec, state).await?;
            }
        }

        Ok(resolve_gate(phase, state))
    }
}

/// Resolve a phase's gate into its outcome event.
fn resolve_gate(phase: &Phase, state: &RunState) -> Event {
    match phase.gate.as_ref().and_then(|g| g.kind) {
        Some(GateKind::HumanApproval) => {
            let approver = phase
                .gate
                .as_ref()
                .and_then(|g| g.approver.as_deref())
                .unwrap_or(DEFAULT_APPROVER);
            // An approver with no recorded decision counts as approved.
            if state.approvals.get(approver).copied().unwrap_or(true) {
                Event::Approved
            } else {
                Event::Rejected
            }
        }
        Some(GateKind::AutomatedChecks) => Event::Pass,
        None => Event::Complete,
    }
}
