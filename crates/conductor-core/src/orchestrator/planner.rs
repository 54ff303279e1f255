//! Delegation planning
//!
//! Agent selection is done by the engine itself: the manager offers
//! `delegate_task` with the active capabilities in its preamble, and this
//! module turns the engine's arguments into a validated plan.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::provider::FunctionDefinition;

pub const DELEGATE_TASK: &str = "delegate_task";

/// One agent assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationRequest {
    pub agent_id: String,
    pub instruction: String,
}

impl DelegationRequest {
    pub fn new(agent_id: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            instruction: instruction.into(),
        }
    }
}

pub fn delegate_task_definition() -> FunctionDefinition {
    FunctionDefinition::new(
        DELEGATE_TASK,
        "Delegate sub-tasks to one or more active agents. agent_ids[i] receives instructions[i]; \
         both lists must have the same length. The agents' results are combined into one analysis.",
        json!({
            "type": "object",
            "properties": {
                "agent_ids": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Ids of the agents to delegate to, in order"
                },
                "instructions": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "One instruction per agent id, in the same order"
                }
            },
            "required": ["agent_ids", "instructions"]
        }),
    )
}

/// Build a plan from parallel id/instruction lists.
///
/// The error is a message for the engine so it can retry with corrected
/// arguments; nothing has run when it is returned.
pub fn plan_from_lists(
    agent_ids: &[String],
    instructions: &[String],
) -> std::result::Result<Vec<DelegationRequest>, String> {
    if agent_ids.len() != instructions.len() {
        return Err(format!(
            "Invalid delegation: received {} agent ids but {} instructions. Provide exactly one \
             instruction per agent id and call delegate_task again.",
            agent_ids.len(),
            instructions.len()
        ));
    }

    Ok(agent_ids
        .iter()
        .zip(instructions)
        .map(|(id, instruction)| DelegationRequest::new(id.trim(), instruction.as_str()))
        .collect())
}

/// Parse `delegate_task` arguments
pub fn parse_delegation(arguments: &Value) -> std::result::Result<Vec<DelegationRequest>, String> {
    let agent_ids = string_list(arguments, "agent_ids")?;
    let instructions = string_list(arguments, "instructions")?;
    plan_from_lists(&agent_ids, &instructions)
}

/// Accepts a list of strings, or a single string as a one-element list
pub(crate) fn string_list(arguments: &Value, key: &str) -> std::result::Result<Vec<String>, String> {
    match &arguments[key] {
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| format!("Invalid delegation: every entry of {} must be a string.", key))
            })
            .collect(),
        Value::String(single) => Ok(vec![single.clone()]),
        Value::Null => Err(format!("Invalid delegation: {} is required.", key)),
        _ => Err(format!("Invalid delegation: {} must be a list of strings.", key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_pairs_ids_with_instructions() {
        let plan = parse_delegation(&json!({
            "agent_ids": ["reddit_agent", "steam_agent"],
            "instructions": ["find posts", "find reviews"]
        }))
        .unwrap();
        assert_eq!(
            plan,
            vec![
                DelegationRequest::new("reddit_agent", "find posts"),
                DelegationRequest::new("steam_agent", "find reviews"),
            ]
        );
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let err = parse_delegation(&json!({
            "agent_ids": ["reddit_agent", "steam_agent"],
            "instructions": ["find posts"]
        }))
        .unwrap_err();
        assert!(err.contains("2 agent ids but 1 instructions"));
    }

    #[test]
    fn test_empty_plan_is_valid() {
        let plan = parse_delegation(&json!({"agent_ids": [], "instructions": []})).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_same_agent_may_appear_twice() {
        let plan = parse_delegation(&json!({
            "agent_ids": ["reddit_agent", "reddit_agent"],
            "instructions": ["r/rust", "r/golang"]
        }))
        .unwrap();
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn test_non_string_entries_rejected() {
        assert!(parse_delegation(&json!({"agent_ids": [1], "instructions": ["x"]})).is_err());
        assert!(parse_delegation(&json!({"instructions": ["x"]})).is_err());
    }
}
