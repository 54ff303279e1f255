//! Functions the manager offers to the engine during a turn
//!
//! `delegate_task` and `respond_to_user` end the turn, as does
//! `summarize_agents_responses` when it finds artifacts to merge. The
//! lookups and `chat_with_data` hand their result back to the engine.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::executor::DelegationExecutor;
use super::planner::{self, DELEGATE_TASK};
use super::state::DelegationRecord;
use super::synthesizer::{ResponseSynthesizer, NOTHING_TO_SUMMARIZE};
use super::MANAGER_AGENT_ID;
use crate::agent::registry::{ActiveAgentSet, AgentRegistry};
use crate::agent::turn::{required_str, FunctionOutcome, FunctionSet};
use crate::error::{Error, FunctionError, Result};
use crate::events::ProgressSink;
use crate::function_params;
use crate::prompt;
use crate::provider::{FunctionDefinition, ModelTier, ReasoningEngine};
use crate::store::ArtifactStore;

pub const SUMMARIZE_AGENTS_RESPONSES: &str = "summarize_agents_responses";
pub const RESPOND_TO_USER: &str = "respond_to_user";
pub const RETRIEVE_DATA_FROM_AGENTS: &str = "retrieve_data_from_agents";
pub const GET_ACTIVE_AGENTS: &str = "get_active_agents";
pub const GET_ALL_AGENTS: &str = "get_all_agents";
pub const CHAT_WITH_DATA: &str = "chat_with_data";

pub const NO_AGENTS_SELECTED: &str =
    "No agents were selected. Answer the user directly with respond_to_user.";
pub const NO_ANALYSIS_AVAILABLE: &str =
    "No analysis is available yet. Delegate a task before chatting with its data.";

#[derive(Serialize)]
struct AgentListing<'a> {
    id: &'a str,
    description: &'a str,
    active: bool,
}

pub(crate) struct ManagerFunctions<'a> {
    pub agents: &'a mut ActiveAgentSet,
    pub record: &'a mut DelegationRecord,
    pub registry: &'a AgentRegistry,
    pub user_input: &'a str,
    pub engine: &'a dyn ReasoningEngine,
    pub store: &'a dyn ArtifactStore,
    pub synthesizer: &'a ResponseSynthesizer,
    pub sink: &'a dyn ProgressSink,
}

impl ManagerFunctions<'_> {
    async fn delegate(&mut self, arguments: &Value) -> Result<FunctionOutcome> {
        let plan = match planner::parse_delegation(arguments) {
            Ok(plan) => plan,
            Err(message) => {
                warn!(error = %message, "Rejected delegation plan");
                return Ok(FunctionOutcome::Continue(message));
            }
        };
        if plan.is_empty() {
            return Ok(FunctionOutcome::Continue(NO_AGENTS_SELECTED.to_string()));
        }

        DelegationExecutor::new(&mut *self.agents, self.sink)
            .execute(&plan, &mut *self.record)
            .await?;

        let summary = self
            .synthesizer
            .synthesize(self.record.agent_ids(), self.user_input)
            .await;
        Ok(FunctionOutcome::Terminal(summary))
    }

    /// Ends the turn only when there was something to summarize
    async fn summarize(&self) -> FunctionOutcome {
        match self
            .synthesizer
            .try_synthesize(self.record.agent_ids(), self.user_input)
            .await
        {
            Some(summary) => FunctionOutcome::Terminal(summary),
            None => FunctionOutcome::Continue(NOTHING_TO_SUMMARIZE.to_string()),
        }
    }

    async fn retrieve(&self, arguments: &Value) -> Result<FunctionOutcome> {
        let agent_ids = match planner::string_list(arguments, "agent_ids") {
            Ok(ids) => ids,
            Err(message) => return Ok(FunctionOutcome::Continue(message)),
        };

        let mut data = Map::new();
        for id in agent_ids {
            let entry = if !self.agents.contains(&id) {
                debug!(agent = %id, "Retrieval requested for inactive agent");
                Value::Null
            } else {
                match self.store.read(&id).await {
                    Ok(Some(content)) => Value::String(content),
                    Ok(None) => Value::Null,
                    Err(e) => {
                        warn!(agent = %id, error = %e, "Failed to read agent artifact");
                        Value::Null
                    }
                }
            };
            data.insert(id, entry);
        }
        Ok(FunctionOutcome::Continue(Value::Object(data).to_string()))
    }

    fn list_agents(&self, only_active: bool) -> FunctionOutcome {
        let all = self.registry.descriptors();
        let listing: Vec<AgentListing> = all
            .iter()
            .map(|d| AgentListing {
                id: &d.id,
                description: &d.description,
                active: self.agents.contains(&d.id),
            })
            .filter(|entry| !only_active || entry.active)
            .collect();
        FunctionOutcome::Continue(json!(listing).to_string())
    }

    async fn chat_with_data(&self, message: &str) -> Result<FunctionOutcome> {
        let analysis = self
            .store
            .read(MANAGER_AGENT_ID)
            .await
            .map_err(|e| FunctionError::ExecutionFailed(format!("Could not read analysis: {}", e)))?;
        let Some(analysis) = analysis else {
            return Ok(FunctionOutcome::Continue(NO_ANALYSIS_AVAILABLE.to_string()));
        };

        let request = prompt::chat_with_data_prompt(&analysis, message);
        match self.engine.generate(&request, ModelTier::Balanced).await {
            Ok(answer) => Ok(FunctionOutcome::Continue(answer)),
            Err(Error::ContentBlocked(_)) => Ok(FunctionOutcome::Continue(
                "Unable to answer due to content restrictions.".to_string(),
            )),
            Err(e) => Err(FunctionError::ExecutionFailed(format!("Could not answer: {}", e)).into()),
        }
    }
}

#[async_trait]
impl<'a> FunctionSet for ManagerFunctions<'a> {
    fn definitions(&self) -> Vec<FunctionDefinition> {
        let no_params = json!({"type": "object", "properties": {}});
        vec![
            planner::delegate_task_definition(),
            FunctionDefinition::new(
                SUMMARIZE_AGENTS_RESPONSES,
                "Combine the responses of the agents delegated to in this turn into one analysis.",
                no_params.clone(),
            ),
            FunctionDefinition::new(
                RESPOND_TO_USER,
                "Respond to the user directly. Use this when no agent is needed, or to share an \
                 analysis with the user.",
                function_params!(message: "string" => "Your response to the user"),
            ),
            FunctionDefinition::new(
                RETRIEVE_DATA_FROM_AGENTS,
                "Read the latest saved result of each listed agent. Missing results are null.",
                json!({
                    "type": "object",
                    "properties": {
                        "agent_ids": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Agent ids to read"
                        }
                    },
                    "required": ["agent_ids"]
                }),
            ),
            FunctionDefinition::new(
                GET_ACTIVE_AGENTS,
                "List the agents active in this session.",
                no_params.clone(),
            ),
            FunctionDefinition::new(
                GET_ALL_AGENTS,
                "List every registered agent and whether it is active.",
                no_params,
            ),
            FunctionDefinition::new(
                CHAT_WITH_DATA,
                "Answer a follow-up question from the last saved analysis. Only useful after a \
                 delegation or summary.",
                function_params!(message: "string" => "The user's question"),
            ),
        ]
    }

    async fn call(&mut self, name: &str, arguments: &Value) -> Result<FunctionOutcome> {
        match name {
            DELEGATE_TASK => self.delegate(arguments).await,
            SUMMARIZE_AGENTS_RESPONSES => Ok(self.summarize().await),
            RESPOND_TO_USER => Ok(FunctionOutcome::Terminal(
                required_str(arguments, "message")?.to_string(),
            )),
            RETRIEVE_DATA_FROM_AGENTS => self.retrieve(arguments).await,
            GET_ACTIVE_AGENTS => Ok(self.list_agents(true)),
            GET_ALL_AGENTS => Ok(self.list_agents(false)),
            CHAT_WITH_DATA => self.chat_with_data(required_str(arguments, "message")?).await,
            other => Err(FunctionError::NotFound(other.to_string()).into()),
        }
    }
}
