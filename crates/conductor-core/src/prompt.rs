//! Prompt builders for the manager, the workers, and synthesis

use crate::agent::registry::AgentDescriptor;

const SYNTHESIS_INSTRUCTION: &str = "You are the manager agent that handles user input and \
delegates tasks to other agents. All agents have completed their tasks. Based on the agent \
responses below, write a detailed analysis, summarize it, and draw a conclusion as the response \
back to the user.";

/// First-turn preamble for the manager: active capabilities plus the user's request
pub fn manager_preamble(agents: &[AgentDescriptor], instruction: &str) -> String {
    let mut prompt = String::from(
        "You are a manager agent that helps users research topics by delegating work to \
         specialized agents.\n\nAvailable agents:\n",
    );

    if agents.is_empty() {
        prompt.push_str("- (none active)\n");
    }
    for agent in agents {
        prompt.push_str(&format!("- {}: {}\n", agent.id, agent.description));
    }

    prompt.push_str(
        "\nRespond with the respond_to_user function unless the request is better served by \
         delegating. To delegate, call delegate_task with one instruction per selected agent. \
         Use retrieve_data_from_agents to read earlier agent results and chat_with_data to answer \
         follow-up questions about the last analysis.\n\n",
    );
    prompt.push_str(&format!("User: {}", instruction));
    prompt
}

/// First-call preamble shared by the research workers
pub fn worker_preamble(instruction: &str) -> String {
    format!(
        "Based on the user input, perform the required tasks using your functions, then answer \
         with your findings.\n\nUser: {}",
        instruction
    )
}

pub fn steam_preamble(instruction: &str) -> String {
    format!(
        "Based on the user input, identify the game name, retrieve its Steam reviews with \
         retrieve_reviews, then analyze them with analyze_reviews.\n\nUser: {}",
        instruction
    )
}

pub fn reddit_preamble(instruction: &str) -> String {
    format!(
        "Based on the user input, pick relevant subreddits, retrieve posts with retrieve_posts \
         (at most 10 per subreddit), then analyze them with analyze_posts.\n\nUser: {}",
        instruction
    )
}

/// Analysis request over data a worker collected
pub fn data_analysis_prompt(instruction: &str, data: &str) -> String {
    format!("{}\n\n{}", instruction, data)
}

pub fn code_generator_preamble(instruction: &str) -> String {
    format!(
        "You generate new worker agents from a template. Based on the user input, choose a \
         snake_case agent name (for example reddit_agent) and call generate_and_save_code to \
         produce the full implementation. Afterwards, explain the generated code to the user.\n\n\
         User: {}",
        instruction
    )
}

pub fn code_generation_prompt(template: &str, user_prompt: &str) -> String {
    format!(
        "Follow the agent template strictly and generate the complete code with a full \
         implementation based on the user input.\n\n# Agent Template\n\n{}\n\n# User Input\n\n{}\n\n\
         # Note\n\nRespond only with the code, without explanations.",
        template, user_prompt
    )
}

/// Prompt merging several agent artifacts; sources are labeled by ordinal
pub fn synthesis_prompt(user_instruction: &str, artifacts: &[String]) -> String {
    let mut prompt = format!(
        "{}\n\nUser Input: {}\n\nAgent Responses:\n",
        SYNTHESIS_INSTRUCTION, user_instruction
    );
    for (i, artifact) in artifacts.iter().enumerate() {
        prompt.push_str(&format!("Agent {}: {}\n", i + 1, artifact));
    }
    prompt
}

pub fn chat_with_data_prompt(analysis: &str, message: &str) -> String {
    format!(
        "Answer the user's question using only the analysis below. If the analysis does not \
         contain the answer, say so.\n\n# Analysis\n\n{}\n\n# Question\n\n{}",
        analysis, message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_preamble_lists_capabilities() {
        let agents = vec![AgentDescriptor {
            id: "forum_agent".to_string(),
            description: "Researches forums".to_string(),
        }];
        let prompt = manager_preamble(&agents, "research T");
        assert!(prompt.contains("- forum_agent: Researches forums"));
        assert!(prompt.contains("respond_to_user"));
        assert!(prompt.ends_with("User: research T"));
    }

    #[test]
    fn test_synthesis_prompt_labels_sources_in_order() {
        let prompt = synthesis_prompt("compare", &["A".to_string(), "B".to_string()]);
        let first = prompt.find("Agent 1: A").unwrap();
        let second = prompt.find("Agent 2: B").unwrap();
        assert!(first < second);
        assert!(prompt.contains("User Input: compare"));
    }
}
