//! Reasoning engine abstraction
//!
//! Every LLM round trip in Conductor goes through [`ReasoningEngine`]: the
//! manager's routing turns, each worker's private turn loop, and multi-source
//! synthesis. A response is either plain text or an ordered list of function
//! call requests.
//!
//! The production engine is [`GenAIProvider`], which talks to any provider
//! supported by the genai framework. [`mock::ScriptedEngine`] replays queued
//! responses for tests and offline runs.

pub mod catalog;
pub mod factory;
mod genai_provider;
mod logging;
pub mod mock;

pub use catalog::ModelTier;
pub use factory::{create_engine_from_config, get_api_key, get_model_tiers};
pub use genai_provider::GenAIProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// A function the engine asked us to run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub call_id: String,
    pub name: String,
    /// Raw arguments; may be `null` or `{}` when the engine misbehaves
    #[serde(default)]
    pub arguments: Value,
}

impl FunctionCall {
    pub fn new(call_id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Whether the call carries a usable argument set
    pub fn has_arguments(&self) -> bool {
        match &self.arguments {
            Value::Null => false,
            Value::Object(map) => !map.is_empty(),
            Value::String(s) => !s.trim().is_empty(),
            Value::Array(items) => !items.is_empty(),
            _ => true,
        }
    }
}

/// Function definition for engine consumption
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

impl FunctionDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// One entry of the exchange history sent to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum EngineMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: String,
    },
    /// Assistant turn that requested one or more function calls
    FunctionCalls {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        calls: Vec<FunctionCall>,
    },
    /// Structured result of a locally executed function
    FunctionResult {
        call_id: String,
        name: String,
        content: String,
    },
}

impl EngineMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
        }
    }

    pub fn function_calls(content: Option<String>, calls: Vec<FunctionCall>) -> Self {
        Self::FunctionCalls { content, calls }
    }

    pub fn function_result(
        call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::FunctionResult {
            call_id: call_id.into(),
            name: name.into(),
            content: content.into(),
        }
    }

    /// Text content as a string (for logging/display)
    pub fn content_as_text(&self) -> String {
        match self {
            Self::System { content } | Self::User { content } | Self::Assistant { content } => {
                content.clone()
            }
            Self::FunctionCalls { content, .. } => content.clone().unwrap_or_default(),
            Self::FunctionResult { content, .. } => content.clone(),
        }
    }
}

/// A single round trip request
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub messages: Vec<EngineMessage>,
    pub functions: Vec<FunctionDefinition>,
    pub tier: ModelTier,
}

impl EngineRequest {
    pub fn new(messages: Vec<EngineMessage>) -> Self {
        Self {
            messages,
            functions: Vec::new(),
            tier: ModelTier::Balanced,
        }
    }

    pub fn with_functions(mut self, functions: Vec<FunctionDefinition>) -> Self {
        self.functions = functions;
        self
    }

    pub fn with_tier(mut self, tier: ModelTier) -> Self {
        self.tier = tier;
        self
    }
}

/// Engine reply: text, function calls, or (rarely) both
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineResponse {
    pub content: Option<String>,
    pub function_calls: Vec<FunctionCall>,
}

impl EngineResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            function_calls: Vec::new(),
        }
    }

    pub fn calls(function_calls: Vec<FunctionCall>) -> Self {
        Self {
            content: None,
            function_calls,
        }
    }

    pub fn has_function_calls(&self) -> bool {
        !self.function_calls.is_empty()
    }

    pub fn has_content(&self) -> bool {
        self.content.as_ref().map(|c| !c.is_empty()).unwrap_or(false)
    }
}

/// The LLM capability consumed by the manager and every worker
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// Engine name (e.g., "anthropic", "scripted")
    fn name(&self) -> &str;

    /// Submit the history and available functions, returning the engine's reply
    async fn submit(&self, request: EngineRequest) -> Result<EngineResponse>;

    /// One-shot text generation without functions
    async fn generate(&self, prompt: &str, tier: ModelTier) -> Result<String> {
        let request = EngineRequest::new(vec![EngineMessage::user(prompt)]).with_tier(tier);
        let response = self.submit(request).await?;
        match response.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(Error::ContentBlocked(
                "engine returned no text for generation request".to_string(),
            )),
        }
    }
}

/// Helper macro for creating function parameter schemas
#[macro_export]
macro_rules! function_params {
    ($($field:ident : $type:expr => $desc:expr),* $(,)?) => {
        serde_json::json!({
            "type": "object",
            "properties": {
                $( stringify!($field): { "type": $type, "description": $desc } ),*
            },
            "required": [ $( stringify!($field) ),* ]
        })
    };
}
