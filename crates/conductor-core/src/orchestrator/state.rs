//! Per-session and per-turn state owned by the manager

use crate::provider::EngineMessage;

/// Agents invoked by the latest delegation batch of the current turn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelegationRecord {
    agent_ids: Vec<String>,
}

impl DelegationRecord {
    /// Replace the record with a new batch (first occurrence order, no duplicates)
    pub fn replace(&mut self, agent_ids: Vec<String>) {
        self.agent_ids.clear();
        for id in agent_ids {
            if !self.agent_ids.contains(&id) {
                self.agent_ids.push(id);
            }
        }
    }

    pub fn clear(&mut self) {
        self.agent_ids.clear();
    }

    pub fn agent_ids(&self) -> &[String] {
        &self.agent_ids
    }

    pub fn is_empty(&self) -> bool {
        self.agent_ids.is_empty()
    }
}

/// Conversation state across `generate_response` calls
#[derive(Debug, Clone)]
pub struct TurnState {
    /// True until the first engine exchange of the session
    pub is_first_turn: bool,
    /// Latch: set once the current turn reached a terminal result
    pub task_completed: bool,
    /// Exchange history carried into the next turn
    pub pending_messages: Vec<EngineMessage>,
    /// Instruction of the turn in progress
    pub user_input: String,
    pub delegation: DelegationRecord,
}

impl Default for TurnState {
    fn default() -> Self {
        Self {
            is_first_turn: true,
            task_completed: false,
            pending_messages: Vec::new(),
            user_input: String::new(),
            delegation: DelegationRecord::default(),
        }
    }
}

impl TurnState {
    /// Reset the per-turn fields
    pub fn begin_turn(&mut self, instruction: &str) {
        self.task_completed = false;
        self.user_input = instruction.to_string();
        self.delegation.clear();
    }
}
