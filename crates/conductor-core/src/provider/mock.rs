//! Scripted reasoning engine for tests and offline runs
//!
//! Replies are consumed in FIFO order; every submitted request is recorded
//! so callers can assert on prompts and call counts.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;

use super::{EngineRequest, EngineResponse, FunctionCall, ReasoningEngine};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
enum ScriptedReply {
    Respond(EngineResponse),
    Fail(String),
    Block(String),
}

/// Engine that replays a fixed script
#[derive(Default)]
pub struct ScriptedEngine {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<EngineRequest>>,
    call_counter: Mutex<usize>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a plain-text reply
    pub fn then_text(self, text: impl Into<String>) -> Self {
        self.push(ScriptedReply::Respond(EngineResponse::text(text)))
    }

    /// Queue a single function call reply
    pub fn then_call(self, name: impl Into<String>, arguments: Value) -> Self {
        let call_id = format!("call_{}", uuid::Uuid::new_v4().simple());
        self.then_calls(vec![FunctionCall::new(call_id, name, arguments)])
    }

    /// Queue a reply carrying several function calls
    pub fn then_calls(self, calls: Vec<FunctionCall>) -> Self {
        self.push(ScriptedReply::Respond(EngineResponse::calls(calls)))
    }

    /// Queue a transport/provider failure
    pub fn then_error(self, message: impl Into<String>) -> Self {
        self.push(ScriptedReply::Fail(message.into()))
    }

    /// Queue a content-policy refusal
    pub fn then_blocked(self, reason: impl Into<String>) -> Self {
        self.push(ScriptedReply::Block(reason.into()))
    }

    fn push(self, reply: ScriptedReply) -> Self {
        self.replies.lock().push_back(reply);
        self
    }

    /// Number of `submit` calls so far
    pub fn call_count(&self) -> usize {
        *self.call_counter.lock()
    }

    /// Snapshot of every request received
    pub fn requests(&self) -> Vec<EngineRequest> {
        self.requests.lock().clone()
    }

    /// Replies still queued
    pub fn remaining(&self) -> usize {
        self.replies.lock().len()
    }
}

#[async_trait]
impl ReasoningEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn submit(&self, request: EngineRequest) -> Result<EngineResponse> {
        *self.call_counter.lock() += 1;
        self.requests.lock().push(request);

        match self.replies.lock().pop_front() {
            Some(ScriptedReply::Respond(response)) => Ok(response),
            Some(ScriptedReply::Fail(message)) => Err(Error::Provider(message)),
            Some(ScriptedReply::Block(reason)) => Err(Error::ContentBlocked(reason)),
            None => Err(Error::Provider("scripted engine has no reply queued".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{EngineMessage, ModelTier};
    use serde_json::json;

    #[tokio::test]
    async fn test_replies_in_order_and_records_requests() {
        let engine = ScriptedEngine::new()
            .then_call("get_all_agents", json!({"verbose": true}))
            .then_text("done");

        let first = engine
            .submit(EngineRequest::new(vec![EngineMessage::user("a")]))
            .await
            .unwrap();
        assert_eq!(first.function_calls[0].name, "get_all_agents");

        let second = engine
            .submit(EngineRequest::new(vec![EngineMessage::user("b")]))
            .await
            .unwrap();
        assert_eq!(second.content.as_deref(), Some("done"));

        assert_eq!(engine.call_count(), 2);
        assert_eq!(engine.requests()[1].messages[0].content_as_text(), "b");
    }

    #[tokio::test]
    async fn test_empty_script_errors() {
        let engine = ScriptedEngine::new();
        let result = engine.generate("anything", ModelTier::Balanced).await;
        assert!(matches!(result, Err(Error::Provider(_))));
    }

    #[tokio::test]
    async fn test_blocked_reply() {
        let engine = ScriptedEngine::new().then_blocked("safety");
        let result = engine.generate("anything", ModelTier::Powerful).await;
        assert!(matches!(result, Err(Error::ContentBlocked(_))));
    }
}
