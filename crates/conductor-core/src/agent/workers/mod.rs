//! Bundled worker agents

pub mod code_generator_agent;
pub mod joke_agent;
pub mod reddit_agent;
pub mod steam_agent;
pub mod wikipedia_agent;

pub use code_generator_agent::CodeGeneratorAgent;
pub use joke_agent::JokeAgent;
pub use reddit_agent::{RedditAgent, RedditCredentials};
pub use steam_agent::SteamAgent;
pub use wikipedia_agent::WikipediaAgent;

use serde_json::Value;
use std::time::Duration;
use tracing::{error, warn};

use super::registry::{AgentManifest, CODE_GENERATOR_AGENT_ID};
use super::turn::FunctionOutcome;
use crate::error::{Error, FunctionError, Result};
use crate::prompt;
use crate::provider::{ModelTier, ReasoningEngine};

pub const WIKIPEDIA_AGENT_ID: &str = "wikipedia_agent";
pub const JOKE_AGENT_ID: &str = "joke_agent";
pub const STEAM_AGENT_ID: &str = "steam_agent";
pub const REDDIT_AGENT_ID: &str = "reddit_agent";

/// Manifest of every bundled worker
pub fn default_manifest() -> Vec<AgentManifest> {
    vec![
        AgentManifest::new(
            WIKIPEDIA_AGENT_ID,
            wikipedia_agent::DESCRIPTION,
            |ctx| Ok(Box::new(WikipediaAgent::new(ctx)?)),
        ),
        AgentManifest::new(JOKE_AGENT_ID, joke_agent::DESCRIPTION, |ctx| {
            Ok(Box::new(JokeAgent::new(ctx)?))
        }),
        AgentManifest::new(STEAM_AGENT_ID, steam_agent::DESCRIPTION, |ctx| {
            Ok(Box::new(SteamAgent::new(ctx)?))
        }),
        AgentManifest::new(REDDIT_AGENT_ID, reddit_agent::DESCRIPTION, |ctx| {
            Ok(Box::new(RedditAgent::new(ctx)?))
        }),
        AgentManifest::new(
            CODE_GENERATOR_AGENT_ID,
            code_generator_agent::DESCRIPTION,
            |ctx| Ok(Box::new(CodeGeneratorAgent::new(ctx))),
        ),
    ]
}

/// HTTP client used by the data-source workers
pub(crate) fn http_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent("Conductor/1.0")
        .build()?;
    Ok(client)
}

/// GET a JSON document; `None` on 404, descriptive function errors otherwise
pub(crate) async fn get_json(
    request: reqwest::RequestBuilder,
) -> std::result::Result<Option<Value>, FunctionError> {
    let response = request
        .send()
        .await
        .map_err(|e| FunctionError::ExecutionFailed(format!("Request failed: {}", e)))?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(FunctionError::ExecutionFailed(format!(
            "HTTP error: {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        )));
    }

    response
        .json::<Value>()
        .await
        .map(Some)
        .map_err(|e| FunctionError::ExecutionFailed(format!("Invalid response body: {}", e)))
}

/// Run the worker's closing analysis on the powerful tier.
///
/// The analysis ends the worker's turn, so it becomes the worker's artifact.
pub(crate) async fn analyze(
    engine: &dyn ReasoningEngine,
    instruction: &str,
    data: &str,
) -> Result<FunctionOutcome> {
    let request = prompt::data_analysis_prompt(instruction, data);
    match engine.generate(&request, ModelTier::Powerful).await {
        Ok(analysis) => Ok(FunctionOutcome::Terminal(analysis)),
        Err(Error::ContentBlocked(reason)) => {
            warn!(reason = %reason, "Analysis blocked by content policy");
            Ok(FunctionOutcome::Continue(
                "Unable to analyze the data due to content restrictions.".to_string(),
            ))
        }
        Err(e) => {
            error!(error = %e, "Analysis failed");
            Err(FunctionError::ExecutionFailed(format!("Analysis failed: {}", e)).into())
        }
    }
}
