//! The manager turn loop
//!
//! Every `generate_response` call is one turn: the latch is reset, the
//! instruction (wrapped in the capability preamble on the first turn) goes
//! to the engine, and the turn ends on a terminal function or a plain-text
//! answer. A session restricted to the code generator bypasses all of this
//! and forwards the raw instruction to that agent.

use std::sync::Arc;
use tracing::{error, info, warn};

use super::executor::worker_failure;
use super::functions::ManagerFunctions;
use super::state::TurnState;
use super::synthesizer::ResponseSynthesizer;
use super::MANAGER_AGENT_ID;
use crate::agent::registry::{ActiveAgentSet, AgentDescriptor, AgentRegistry, CODE_GENERATOR_AGENT_ID};
use crate::agent::turn::{trim_history, TurnExecutor, TurnStep};
use crate::agent::AgentContext;
use crate::config::OrchestratorConfig;
use crate::error::{Error, Result};
use crate::events::{emit, ProgressSink, TracingSink};
use crate::prompt;
use crate::provider::{EngineMessage, ReasoningEngine};
use crate::store::{ArtifactStore, FileArtifactStore};

/// Prefix of the text returned when the manager's own engine round trip fails
pub const TURN_FAILED_MESSAGE: &str = "Unable to process the request right now.";

pub struct Manager {
    registry: AgentRegistry,
    context: AgentContext,
    active: ActiveAgentSet,
    state: TurnState,
    executor: TurnExecutor,
    synthesizer: ResponseSynthesizer,
    sink: Arc<dyn ProgressSink>,
}

impl Manager {
    /// A manager with no active agents
    pub fn new(registry: AgentRegistry, context: AgentContext) -> Self {
        Self::with_sink(registry, context, Arc::new(TracingSink))
    }

    pub fn with_sink(
        registry: AgentRegistry,
        context: AgentContext,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        let executor =
            TurnExecutor::new(context.engine.clone()).with_max_steps(context.max_turn_steps);
        let synthesizer =
            ResponseSynthesizer::new(context.engine.clone(), context.store.clone(), sink.clone());
        Self {
            registry,
            context,
            active: ActiveAgentSet::empty(),
            state: TurnState::default(),
            executor,
            synthesizer,
            sink,
        }
    }

    /// Bundled agents, file-backed artifacts, and the configured roster activated
    pub fn from_config(
        engine: Arc<dyn ReasoningEngine>,
        config: &OrchestratorConfig,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<Self> {
        let store: Arc<dyn ArtifactStore> = Arc::new(FileArtifactStore::new(&config.output_dir));
        let context = AgentContext::new(engine, store)
            .with_max_turn_steps(config.max_turn_steps)
            .with_max_history_messages(config.max_history_messages);
        let mut manager = Self::with_sink(AgentRegistry::with_default_agents(), context, sink);
        manager.set_active_agents(config.active_agents.as_slice())?;
        Ok(manager)
    }

    /// Replace the active agents and start a fresh session.
    ///
    /// On a factory error the previous agents and session stay in place.
    pub fn set_active_agents<S: AsRef<str>>(&mut self, agent_ids: &[S]) -> Result<()> {
        self.active = self.registry.activate(agent_ids, &self.context)?;
        self.state = TurnState::default();
        Ok(())
    }

    pub fn list_all_agents(&self) -> Vec<String> {
        self.registry.list_all()
    }

    pub fn list_active_agents(&self) -> Vec<String> {
        self.active.list_active()
    }

    pub fn all_agent_descriptors(&self) -> Vec<AgentDescriptor> {
        self.registry.descriptors()
    }

    pub fn active_agent_descriptors(&self) -> Vec<AgentDescriptor> {
        self.active.descriptors()
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    pub fn is_code_generator_mode(&self) -> bool {
        self.active.is_code_generator_only()
    }

    /// Where the manager's merged analysis is stored
    pub fn output_location(&self) -> String {
        self.context.store.location(MANAGER_AGENT_ID)
    }

    /// Run one user turn.
    ///
    /// Always yields text unless a worker fails; worker errors are returned
    /// as `Error::Agent`. Either way a failed turn's history is rolled back.
    pub async fn generate_response(&mut self, instruction: &str) -> Result<String> {
        self.state.begin_turn(instruction);

        if self.active.is_code_generator_only() {
            return self.forward_to_code_generator(instruction).await;
        }

        let prompt = if self.state.is_first_turn {
            prompt::manager_preamble(&self.active.descriptors(), instruction)
        } else {
            instruction.to_string()
        };

        let mut history = std::mem::take(&mut self.state.pending_messages);
        let start = history.len();
        history.push(EngineMessage::user(prompt));

        let outcome = {
            let mut functions = ManagerFunctions {
                agents: &mut self.active,
                record: &mut self.state.delegation,
                registry: &self.registry,
                user_input: &self.state.user_input,
                engine: self.context.engine.as_ref(),
                store: self.context.store.as_ref(),
                synthesizer: &self.synthesizer,
                sink: self.sink.as_ref(),
            };
            self.executor.run(&mut history, &mut functions).await
        };

        match outcome {
            Ok(step) => {
                self.state.is_first_turn = false;
                trim_history(&mut history, self.context.max_history_messages);
                self.state.pending_messages = history;
                match step {
                    TurnStep::Done(text) => {
                        self.state.task_completed = true;
                        Ok(text)
                    }
                    other => {
                        let reason = other.into_text();
                        warn!(reason = %reason, "Manager turn ended without completing");
                        Ok(reason)
                    }
                }
            }
            Err(e) => {
                history.truncate(start);
                self.state.pending_messages = history;
                match e {
                    Error::Agent(_) => Err(e),
                    other => {
                        error!(error = %other, "Manager turn failed");
                        Ok(format!("{} ({})", TURN_FAILED_MESSAGE, other))
                    }
                }
            }
        }
    }

    async fn forward_to_code_generator(&mut self, instruction: &str) -> Result<String> {
        let agent = self
            .active
            .get_mut(CODE_GENERATOR_AGENT_ID)
            .ok_or_else(|| Error::Agent(format!("{} is not active", CODE_GENERATOR_AGENT_ID)))?;

        info!("Forwarding instruction to code generator");
        emit(self.sink.as_ref(), MANAGER_AGENT_ID, "Forwarding to code generator").await;
        let text = agent
            .generate_response(instruction)
            .await
            .map_err(|e| worker_failure(CODE_GENERATOR_AGENT_ID, e))?;

        self.state.is_first_turn = false;
        self.state.task_completed = true;
        Ok(text)
    }
}
