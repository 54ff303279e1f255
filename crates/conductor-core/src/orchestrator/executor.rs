//! Delegation executor
//!
//! Runs a plan strictly in order, one worker at a time, then replaces the
//! turn's delegation record with the agents that actually ran.

use tracing::{info, warn};

use super::planner::DelegationRequest;
use super::state::DelegationRecord;
use super::MANAGER_AGENT_ID;
use crate::agent::registry::ActiveAgentSet;
use crate::error::{Error, Result};
use crate::events::{emit, ProgressSink};

/// Result of one delegation slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationOutcome {
    pub agent_id: String,
    pub result: String,
    /// False when the agent was not active
    pub invoked: bool,
}

pub fn agent_not_found(agent_id: &str) -> String {
    format!("Agent '{}' not found among active agents.", agent_id)
}

/// Tag a worker's error so the manager can tell it apart from its own failures
pub(crate) fn worker_failure(agent_id: &str, error: Error) -> Error {
    match error {
        Error::Agent(_) => error,
        other => Error::Agent(format!("{} failed: {}", agent_id, other)),
    }
}

pub struct DelegationExecutor<'a> {
    agents: &'a mut ActiveAgentSet,
    sink: &'a dyn ProgressSink,
}

impl<'a> DelegationExecutor<'a> {
    pub fn new(agents: &'a mut ActiveAgentSet, sink: &'a dyn ProgressSink) -> Self {
        Self { agents, sink }
    }

    /// One outcome per request, in request order.
    ///
    /// Missing agents get a placeholder result; a worker error aborts the
    /// batch and leaves `record` untouched.
    pub async fn execute(
        &mut self,
        requests: &[DelegationRequest],
        record: &mut DelegationRecord,
    ) -> Result<Vec<DelegationOutcome>> {
        let mut outcomes = Vec::with_capacity(requests.len());
        let mut invoked = Vec::new();

        for request in requests {
            let Some(agent) = self.agents.get_mut(&request.agent_id) else {
                warn!(agent = %request.agent_id, "Delegation target not active");
                outcomes.push(DelegationOutcome {
                    agent_id: request.agent_id.clone(),
                    result: agent_not_found(&request.agent_id),
                    invoked: false,
                });
                continue;
            };

            emit(self.sink, MANAGER_AGENT_ID, format!("Delegating to {}", request.agent_id)).await;
            info!(agent = %request.agent_id, "Delegating task");

            let result = agent
                .generate_response(&request.instruction)
                .await
                .map_err(|e| worker_failure(&request.agent_id, e))?;

            emit(self.sink, &request.agent_id, format!("{} completed its task", request.agent_id)).await;
            invoked.push(request.agent_id.clone());
            outcomes.push(DelegationOutcome {
                agent_id: request.agent_id.clone(),
                result,
                invoked: true,
            });
        }

        record.replace(invoked);
        Ok(outcomes)
    }
}
