//! GenAI-based reasoning engine
//!
//! Uses the genai framework with manual function control: the engine only
//! reports requested calls, and the turn executor decides what to run.

use async_trait::async_trait;
use futures::StreamExt;
use genai::chat::{
    ChatMessage, ChatRequest, ChatStreamEvent, ContentPart, MessageContent, Tool, ToolCall,
    ToolResponse,
};
use genai::resolver::{AuthData, AuthResolver};
use genai::Client;
use genai::WebConfig;
use std::time::Duration;
use tracing::debug;

use super::logging::{log_llm_interaction, LogConfig};
use super::{
    EngineMessage, EngineRequest, EngineResponse, FunctionCall, ModelTier, ReasoningEngine,
};
use crate::config::ModelTiers;
use crate::error::{Error, Result};

/// A reasoning engine backed by genai
pub struct GenAIProvider {
    client: Client,
    provider_id: String,
    models: ModelTiers,
}

impl GenAIProvider {
    /// Default timeout for LLM API requests (5 minutes)
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

    fn default_web_config() -> WebConfig {
        WebConfig::default()
            .with_timeout(Self::DEFAULT_TIMEOUT)
            .with_connect_timeout(Duration::from_secs(30))
    }

    /// Create a provider that resolves auth from environment variables
    pub fn new(provider_id: impl Into<String>, models: ModelTiers) -> Self {
        let client = Client::builder()
            .with_web_config(Self::default_web_config())
            .build();
        Self {
            client,
            provider_id: provider_id.into(),
            models,
        }
    }

    /// Create a provider with a specific API key
    pub fn with_api_key(provider_id: impl Into<String>, api_key: &str, models: ModelTiers) -> Self {
        let api_key = api_key.to_string();
        let auth_resolver = AuthResolver::from_resolver_fn(
            move |_model_iden| -> std::result::Result<Option<AuthData>, genai::resolver::Error> {
                Ok(Some(AuthData::from_single(api_key.clone())))
            },
        );

        let client = Client::builder()
            .with_web_config(Self::default_web_config())
            .with_auth_resolver(auth_resolver)
            .build();

        Self {
            client,
            provider_id: provider_id.into(),
            models,
        }
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Model id used for a tier
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.models.fast,
            ModelTier::Balanced => &self.models.balanced,
            ModelTier::Powerful => &self.models.powerful,
        }
    }

    fn build_chat_request(request: &EngineRequest) -> ChatRequest {
        let mut chat_req = ChatRequest::default();

        for msg in &request.messages {
            chat_req = match msg {
                EngineMessage::System { content } => {
                    chat_req.append_message(ChatMessage::system(content.as_str()))
                }
                EngineMessage::User { content } => {
                    chat_req.append_message(ChatMessage::user(content.as_str()))
                }
                EngineMessage::Assistant { content } => {
                    chat_req.append_message(ChatMessage::assistant(content.as_str()))
                }
                EngineMessage::FunctionCalls { content, calls } => {
                    // Tool calls must travel as a single assistant message
                    let genai_calls: Vec<ToolCall> = calls
                        .iter()
                        .map(|call| ToolCall {
                            call_id: call.call_id.clone(),
                            fn_name: call.name.clone(),
                            fn_arguments: call.arguments.clone(),
                            thought_signatures: None,
                        })
                        .collect();
                    match content.as_deref().filter(|text| !text.trim().is_empty()) {
                        Some(text) => {
                            let parts = genai_calls.into_iter().fold(
                                MessageContent::from_text(text),
                                |parts, call| parts.append(ContentPart::ToolCall(call)),
                            );
                            chat_req.append_message(ChatMessage::assistant(parts))
                        }
                        None => chat_req.append_message(genai_calls),
                    }
                }
                EngineMessage::FunctionResult {
                    call_id, content, ..
                } => chat_req.append_message(ToolResponse::new(call_id.clone(), content.clone())),
            };
        }

        if !request.functions.is_empty() {
            let tools: Vec<Tool> = request
                .functions
                .iter()
                .map(|f| {
                    Tool::new(&f.name)
                        .with_description(&f.description)
                        .with_schema(f.parameters.clone())
                })
                .collect();
            chat_req = chat_req.with_tools(tools);
        }

        chat_req
    }

    fn log_failure(&self, model: &str, request: &EngineRequest, error_msg: &str) {
        log_llm_interaction(LogConfig {
            model,
            provider: Some(&self.provider_id),
            messages: &request.messages,
            functions: Some(request.functions.as_slice()),
            result: None,
            error: Some(error_msg),
        });
    }
}

#[async_trait]
impl ReasoningEngine for GenAIProvider {
    fn name(&self) -> &str {
        &self.provider_id
    }

    async fn submit(&self, request: EngineRequest) -> Result<EngineResponse> {
        let model = self.model_for(request.tier).to_string();
        let chat_req = Self::build_chat_request(&request);

        debug!(
            model = %model,
            messages = request.messages.len(),
            functions = request.functions.len(),
            "Submitting engine request"
        );

        // Streaming avoids read timeouts on long generations
        let stream_response = match self.client.exec_chat_stream(&model, chat_req, None).await {
            Ok(response) => response,
            Err(e) => {
                let error_msg = format!("GenAI error: {:?}", e);
                self.log_failure(&model, &request, &error_msg);
                tracing::error!(error = ?e, model = %model, "LLM request failed");
                return Err(Error::Provider(error_msg));
            }
        };

        let mut content = String::new();
        let mut function_calls: Vec<FunctionCall> = Vec::new();
        let mut stream = stream_response.stream;

        while let Some(event) = stream.next().await {
            match event {
                Ok(ChatStreamEvent::Chunk(chunk)) => {
                    content.push_str(&chunk.content);
                }
                Ok(ChatStreamEvent::ToolCallChunk(tc)) => {
                    // Each ToolCallChunk contains a complete ToolCall
                    let tool_call = tc.tool_call;
                    function_calls.push(FunctionCall {
                        call_id: tool_call.call_id,
                        name: tool_call.fn_name,
                        arguments: tool_call.fn_arguments,
                    });
                }
                Ok(ChatStreamEvent::End(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    let error_msg = format!("GenAI stream error: {:?}", e);
                    self.log_failure(&model, &request, &error_msg);
                    tracing::error!(error = ?e, model = %model, "LLM stream error");
                    return Err(Error::Provider(error_msg));
                }
            }
        }

        let response = EngineResponse {
            content: if content.is_empty() { None } else { Some(content) },
            function_calls,
        };

        log_llm_interaction(LogConfig {
            model: &model,
            provider: Some(&self.provider_id),
            messages: &request.messages,
            functions: Some(request.functions.as_slice()),
            result: Some(&response),
            error: None,
        });

        // Safety filters surface as a completion with nothing in it
        if !response.has_content() && !response.has_function_calls() {
            return Err(Error::ContentBlocked(format!(
                "{} returned an empty completion",
                model
            )));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{FunctionDefinition, ModelTier};
    use serde_json::json;

    fn tiers() -> ModelTiers {
        ModelTiers {
            fast: "fast-model".to_string(),
            balanced: "balanced-model".to_string(),
            powerful: "powerful-model".to_string(),
        }
    }

    #[test]
    fn test_model_for_tier() {
        let provider = GenAIProvider::new("anthropic", tiers());
        assert_eq!(provider.model_for(ModelTier::Balanced), "balanced-model");
        assert_eq!(provider.model_for(ModelTier::Powerful), "powerful-model");
        assert_eq!(provider.name(), "anthropic");
    }

    #[test]
    fn test_build_chat_request_keeps_every_message() {
        let request = EngineRequest::new(vec![
            EngineMessage::system("sys"),
            EngineMessage::user("hi"),
            EngineMessage::function_calls(
                None,
                vec![FunctionCall::new("c1", "get_summary", json!({"topic": "Rust"}))],
            ),
            EngineMessage::function_result("c1", "get_summary", "Rust is a language"),
        ])
        .with_functions(vec![FunctionDefinition::new(
            "get_summary",
            "Summarize",
            json!({"type": "object"}),
        )]);

        let chat_req = GenAIProvider::build_chat_request(&request);
        assert_eq!(chat_req.messages.len(), 4);
        assert_eq!(chat_req.tools.map(|t| t.len()), Some(1));
    }

    #[test]
    fn test_text_alongside_function_calls_is_kept() {
        let request = EngineRequest::new(vec![
            EngineMessage::user("Who won?"),
            EngineMessage::function_calls(
                Some("Let me check the forums first.".to_string()),
                vec![FunctionCall::new("c1", "retrieve_posts", json!({"subreddits": ["gaming"]}))],
            ),
            EngineMessage::function_result("c1", "retrieve_posts", "Found 3 posts"),
        ]);

        let chat_req = GenAIProvider::build_chat_request(&request);
        assert_eq!(chat_req.messages.len(), 3);
        assert_eq!(
            chat_req.messages[1].content.joined_texts().as_deref(),
            Some("Let me check the forums first.")
        );
    }
}
