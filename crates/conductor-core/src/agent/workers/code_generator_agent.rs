//! Generates new worker agents from a template
//!
//! When activated this agent runs alone: the manager forwards raw user
//! instructions to it without planning or synthesis.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::agent::registry::CODE_GENERATOR_AGENT_ID;
use crate::agent::turn::{required_str, FunctionOutcome, FunctionSet};
use crate::agent::{AgentContext, WorkerAgent, WorkerSession};
use crate::error::{FunctionError, Result};
use crate::function_params;
use crate::prompt;
use crate::provider::{FunctionDefinition, ModelTier, ReasoningEngine};
use crate::store::ArtifactStore;

pub const DESCRIPTION: &str = "An agent that generates the code for a new worker agent from a \
description of the data source it should wrap.";

const AGENT_TEMPLATE: &str = r#"```rust
pub const DESCRIPTION: &str = "<one sentence capability summary>";

pub struct ExampleAgent {
    session: WorkerSession,
    functions: ExampleFunctions,
}

#[async_trait]
impl WorkerAgent for ExampleAgent {
    fn id(&self) -> &str { self.session.id() }
    fn description(&self) -> &str { DESCRIPTION }
    async fn generate_response(&mut self, instruction: &str) -> Result<String> {
        self.session.run(instruction, prompt::worker_preamble, &mut self.functions).await
    }
}

struct ExampleFunctions { client: reqwest::Client }

#[async_trait]
impl FunctionSet for ExampleFunctions {
    fn definitions(&self) -> Vec<FunctionDefinition> { /* one entry per data-source call */ }
    async fn call(&mut self, name: &str, arguments: &Value) -> Result<FunctionOutcome> { /* dispatch */ }
}
```"#;

pub struct CodeGeneratorAgent {
    session: WorkerSession,
    functions: CodeGenFunctions,
}

impl CodeGeneratorAgent {
    pub fn new(context: &AgentContext) -> Self {
        Self {
            session: WorkerSession::new(CODE_GENERATOR_AGENT_ID, context),
            functions: CodeGenFunctions {
                engine: context.engine.clone(),
                store: context.store.clone(),
                user_prompt: String::new(),
            },
        }
    }

    /// Artifact owner id for generated code
    pub fn generated_owner(agent_name: &str) -> String {
        format!("{}/{}", CODE_GENERATOR_AGENT_ID, agent_name)
    }
}

#[async_trait]
impl WorkerAgent for CodeGeneratorAgent {
    fn id(&self) -> &str {
        self.session.id()
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    async fn generate_response(&mut self, instruction: &str) -> Result<String> {
        self.functions.user_prompt = instruction.to_string();
        self.session
            .run(instruction, prompt::code_generator_preamble, &mut self.functions)
            .await
    }
}

struct CodeGenFunctions {
    engine: Arc<dyn ReasoningEngine>,
    store: Arc<dyn ArtifactStore>,
    /// The instruction that started the current call
    user_prompt: String,
}

impl CodeGenFunctions {
    async fn generate_and_save(&self, agent_name: &str) -> Result<String> {
        let name = normalize_agent_name(agent_name).ok_or_else(|| {
            FunctionError::InvalidArgs(format!("'{}' is not a valid agent name", agent_name))
        })?;

        let request = prompt::code_generation_prompt(AGENT_TEMPLATE, &self.user_prompt);
        let code = self
            .engine
            .generate(&request, ModelTier::Powerful)
            .await
            .map_err(|e| FunctionError::ExecutionFailed(format!("Code generation failed: {}", e)))?;
        let code = strip_code_fence(&code);

        let owner = CodeGeneratorAgent::generated_owner(&name);
        self.store.write(&owner, &code).await?;
        info!(agent_name = %name, location = %self.store.location(&owner), "Generated agent code saved");

        Ok(code)
    }
}

#[async_trait]
impl FunctionSet for CodeGenFunctions {
    fn definitions(&self) -> Vec<FunctionDefinition> {
        vec![FunctionDefinition::new(
            "generate_and_save_code",
            "Generate the full code of a new agent from the user's request and save it.",
            function_params!(agent_name: "string" => "snake_case name of the new agent, e.g. reddit_agent"),
        )]
    }

    async fn call(&mut self, name: &str, arguments: &Value) -> Result<FunctionOutcome> {
        match name {
            "generate_and_save_code" => {
                let code = self.generate_and_save(required_str(arguments, "agent_name")?).await?;
                Ok(FunctionOutcome::Continue(code))
            }
            other => Err(FunctionError::NotFound(other.to_string()).into()),
        }
    }
}

/// Lowercase snake_case, ending in `_agent`
fn normalize_agent_name(raw: &str) -> Option<String> {
    let stem = raw.trim().trim_end_matches(".rs");
    let name: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let name = name.trim_matches('_').to_string();
    if name.is_empty() {
        return None;
    }
    if name.ends_with("_agent") {
        Some(name)
    } else {
        Some(format!("{}_agent", name))
    }
}

/// Drop a surrounding markdown fence, if any
fn strip_code_fence(code: &str) -> String {
    let trimmed = code.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().trim_end_matches("```").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::ScriptedEngine;
    use crate::store::MemoryArtifactStore;
    use serde_json::json;

    #[test]
    fn test_normalize_agent_name() {
        assert_eq!(normalize_agent_name("Reddit Agent").as_deref(), Some("reddit_agent"));
        assert_eq!(normalize_agent_name("steam").as_deref(), Some("steam_agent"));
        assert_eq!(normalize_agent_name("weather_agent.rs").as_deref(), Some("weather_agent"));
        assert_eq!(normalize_agent_name("../"), None);
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```rust\nfn main() {}\n```"), "fn main() {}");
        assert_eq!(strip_code_fence("fn main() {}"), "fn main() {}");
    }

    #[tokio::test]
    async fn test_generates_with_powerful_tier_and_saves() {
        let engine = Arc::new(
            ScriptedEngine::new()
                .then_call("generate_and_save_code", json!({"agent_name": "weather"}))
                .then_text("```rust\npub struct WeatherAgent;\n```")
                .then_text("Created weather_agent."),
        );
        let store = Arc::new(MemoryArtifactStore::new());
        let ctx = AgentContext::new(engine.clone(), store.clone());
        let mut agent = CodeGeneratorAgent::new(&ctx);

        let reply = agent.generate_response("Build an agent for a weather API").await.unwrap();
        assert_eq!(reply, "Created weather_agent.");

        let requests = engine.requests();
        assert_eq!(requests[1].tier, ModelTier::Powerful);
        assert!(requests[1].messages[0]
            .content_as_text()
            .contains("Build an agent for a weather API"));

        assert_eq!(
            store.get("code_generator_agent/weather_agent").as_deref(),
            Some("pub struct WeatherAgent;")
        );
        assert_eq!(store.get(CODE_GENERATOR_AGENT_ID).as_deref(), Some("Created weather_agent."));
    }
}
