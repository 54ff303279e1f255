//! Worker agents
//!
//! A worker wraps one data source plus its own private reasoning loop. The
//! manager only ever calls [`WorkerAgent::generate_response`] and reads the
//! artifact the worker persisted as a side effect.

pub mod registry;
pub mod turn;
pub mod workers;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::provider::{EngineMessage, ReasoningEngine};
use crate::store::ArtifactStore;
use turn::{trim_history, FunctionSet, TurnExecutor, TurnStep, DEFAULT_MAX_HISTORY, DEFAULT_MAX_STEPS};

/// Contract every worker satisfies
#[async_trait]
pub trait WorkerAgent: Send + Sync {
    /// Stable registry key, also the artifact owner id
    fn id(&self) -> &str;

    /// Capability summary shown verbatim to the planner
    fn description(&self) -> &str;

    /// Run the worker on one instruction and return its final text
    async fn generate_response(&mut self, instruction: &str) -> Result<String>;
}

/// Shared collaborators handed to every worker factory
#[derive(Clone)]
pub struct AgentContext {
    pub engine: Arc<dyn ReasoningEngine>,
    pub store: Arc<dyn ArtifactStore>,
    pub max_turn_steps: usize,
    /// Messages a conversation keeps between turns
    pub max_history_messages: usize,
}

impl AgentContext {
    pub fn new(engine: Arc<dyn ReasoningEngine>, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            engine,
            store,
            max_turn_steps: DEFAULT_MAX_STEPS,
            max_history_messages: DEFAULT_MAX_HISTORY,
        }
    }

    pub fn with_max_turn_steps(mut self, max_turn_steps: usize) -> Self {
        self.max_turn_steps = max_turn_steps;
        self
    }

    pub fn with_max_history_messages(mut self, max_history_messages: usize) -> Self {
        self.max_history_messages = max_history_messages;
        self
    }
}

/// State common to the bundled workers: chat history that survives across
/// calls, the first-call preamble flag, and artifact persistence.
pub struct WorkerSession {
    id: String,
    executor: TurnExecutor,
    store: Arc<dyn ArtifactStore>,
    history: Vec<EngineMessage>,
    max_history: usize,
    first_call: bool,
}

impl WorkerSession {
    pub fn new(id: impl Into<String>, context: &AgentContext) -> Self {
        Self {
            id: id.into(),
            executor: TurnExecutor::new(context.engine.clone())
                .with_max_steps(context.max_turn_steps),
            store: context.store.clone(),
            history: Vec::new(),
            max_history: context.max_history_messages,
            first_call: true,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_first_call(&self) -> bool {
        self.first_call
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Run one instruction through the worker's turn loop.
    ///
    /// `preamble` wraps the instruction on the first call only. Completed
    /// text is persisted as this worker's artifact before it is returned.
    pub async fn run(
        &mut self,
        instruction: &str,
        preamble: impl FnOnce(&str) -> String,
        functions: &mut dyn FunctionSet,
    ) -> Result<String> {
        let prompt = if self.first_call {
            preamble(instruction)
        } else {
            instruction.to_string()
        };

        debug!(agent = %self.id, "Worker turn started");
        let start = self.history.len();
        self.history.push(EngineMessage::user(prompt));

        let step = match self.executor.run(&mut self.history, functions).await {
            Ok(step) => step,
            Err(e) => {
                self.history.truncate(start);
                return Err(e);
            }
        };
        self.first_call = false;
        trim_history(&mut self.history, self.max_history);

        match step {
            TurnStep::Done(text) => {
                self.store.write(&self.id, &text).await?;
                Ok(text)
            }
            other => {
                let reason = other.into_text();
                warn!(agent = %self.id, reason = %reason, "Worker turn did not complete");
                Ok(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::turn::FunctionOutcome;
    use crate::provider::mock::ScriptedEngine;
    use crate::provider::FunctionDefinition;
    use crate::store::MemoryArtifactStore;
    use serde_json::Value;

    struct NoFunctions;

    #[async_trait]
    impl FunctionSet for NoFunctions {
        fn definitions(&self) -> Vec<FunctionDefinition> {
            Vec::new()
        }

        async fn call(&mut self, name: &str, _arguments: &Value) -> Result<FunctionOutcome> {
            Err(crate::error::FunctionError::NotFound(name.to_string()).into())
        }
    }

    #[tokio::test]
    async fn test_worker_history_is_capped() {
        let engine = Arc::new(
            ScriptedEngine::new()
                .then_text("a1")
                .then_text("a2")
                .then_text("a3"),
        );
        let store = Arc::new(MemoryArtifactStore::new());
        let ctx = AgentContext::new(engine.clone(), store.clone()).with_max_history_messages(3);
        let mut session = WorkerSession::new("forum_agent", &ctx);

        for instruction in ["q1", "q2", "q3"] {
            session
                .run(instruction, |i| format!("Preamble. User: {}", i), &mut NoFunctions)
                .await
                .unwrap();
            assert!(session.history_len() <= 3);
        }

        assert_eq!(session.history_len(), 3);
        assert_eq!(store.get("forum_agent").as_deref(), Some("a3"));
    }

    #[tokio::test]
    async fn test_failed_run_keeps_first_call_preamble() {
        let engine = Arc::new(ScriptedEngine::new().then_error("down").then_text("ok"));
        let ctx = AgentContext::new(engine.clone(), Arc::new(MemoryArtifactStore::new()));
        let mut session = WorkerSession::new("forum_agent", &ctx);

        assert!(session.run("q", |i| format!("Preamble. User: {}", i), &mut NoFunctions).await.is_err());
        assert!(session.is_first_call());
        assert_eq!(session.history_len(), 0);

        session.run("q", |i| format!("Preamble. User: {}", i), &mut NoFunctions).await.unwrap();
        assert_eq!(
            engine.requests()[1].messages[0].content_as_text(),
            "Preamble. User: q"
        );
    }
}
