//! Turn executor shared by the manager and every worker
//!
//! One step is a single round trip: submit the history, then either run the
//! requested functions (and keep going) or finish with the engine's text.
//! Calls inside one response run in the order the engine emitted them, and
//! their results are appended in that same order.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Error, FunctionError, Result};
use crate::provider::{
    EngineMessage, EngineRequest, FunctionCall, FunctionDefinition, ModelTier, ReasoningEngine,
};

/// Default bound on round trips per turn
pub const DEFAULT_MAX_STEPS: usize = 25;

/// Default cap on messages kept in a conversation between turns
pub const DEFAULT_MAX_HISTORY: usize = 200;

/// Result of one executor step
#[derive(Debug, Clone, PartialEq)]
pub enum TurnStep {
    /// Functions ran; carries the messages appended to the history
    Continue(Vec<EngineMessage>),
    /// The turn produced its final text
    Done(String),
    /// The turn gave up (step bound reached)
    Failed(String),
}

impl TurnStep {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Continue(_))
    }

    /// Final text for `Done`, the reason for `Failed`
    pub fn into_text(self) -> String {
        match self {
            Self::Done(text) | Self::Failed(text) => text,
            Self::Continue(_) => String::new(),
        }
    }
}

/// What a local function returned
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionOutcome {
    /// Hand the result back to the engine and keep the turn open
    Continue(String),
    /// End the turn with this text
    Terminal(String),
}

/// The named functions a turn may offer to the engine
#[async_trait]
pub trait FunctionSet: Send {
    fn definitions(&self) -> Vec<FunctionDefinition>;

    /// Execute one call. `Error::Function` is reported back to the engine;
    /// any other error aborts the turn.
    async fn call(&mut self, name: &str, arguments: &Value) -> Result<FunctionOutcome>;
}

/// A call with no arguments is malformed only if the function declares some
fn declares_parameters(definition: &FunctionDefinition) -> bool {
    definition
        .parameters
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| !props.is_empty())
        .unwrap_or(false)
}

/// Drives engine round trips for one turn
pub struct TurnExecutor {
    engine: Arc<dyn ReasoningEngine>,
    tier: ModelTier,
    max_steps: usize,
}

impl TurnExecutor {
    pub fn new(engine: Arc<dyn ReasoningEngine>) -> Self {
        Self {
            engine,
            tier: ModelTier::Balanced,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn with_tier(mut self, tier: ModelTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn engine(&self) -> &Arc<dyn ReasoningEngine> {
        &self.engine
    }

    /// Perform exactly one round trip
    pub async fn step(
        &self,
        history: &mut Vec<EngineMessage>,
        functions: &mut dyn FunctionSet,
    ) -> Result<TurnStep> {
        let definitions = functions.definitions();
        let request = EngineRequest::new(history.clone())
            .with_functions(definitions.clone())
            .with_tier(self.tier);
        let response = self.engine.submit(request).await?;

        if !response.has_function_calls() {
            let text = response.content.unwrap_or_default();
            history.push(EngineMessage::assistant(text.clone()));
            return Ok(TurnStep::Done(text));
        }

        let calls = response.function_calls;
        let mut appended = vec![EngineMessage::function_calls(
            response.content,
            calls.clone(),
        )];
        let mut finished: Option<String> = None;

        for call in &calls {
            let result = if finished.is_some() {
                format!("Skipped: {} was requested after the turn completed.", call.name)
            } else if !call.has_arguments() && self.requires_arguments(&definitions, call) {
                debug!(function = %call.name, "Skipping call with empty arguments");
                format!("Skipped: {} was called without arguments.", call.name)
            } else {
                match self.invoke(functions, call).await? {
                    FunctionOutcome::Continue(result) => result,
                    FunctionOutcome::Terminal(text) => {
                        finished = Some(text.clone());
                        text
                    }
                }
            };
            appended.push(EngineMessage::function_result(
                call.call_id.clone(),
                call.name.clone(),
                result,
            ));
        }

        history.extend(appended.iter().cloned());

        match finished {
            Some(text) => {
                history.push(EngineMessage::assistant(text.clone()));
                Ok(TurnStep::Done(text))
            }
            None => Ok(TurnStep::Continue(appended)),
        }
    }

    /// Step until the turn completes or the step bound is reached
    pub async fn run(
        &self,
        history: &mut Vec<EngineMessage>,
        functions: &mut dyn FunctionSet,
    ) -> Result<TurnStep> {
        for step_index in 0..self.max_steps {
            let step = self.step(history, functions).await?;
            if step.is_terminal() {
                debug!(steps = step_index + 1, "Turn complete");
                return Ok(step);
            }
        }

        warn!(max_steps = self.max_steps, "Turn exceeded step bound");
        Ok(TurnStep::Failed(format!(
            "Stopped after {} reasoning steps without reaching an answer.",
            self.max_steps
        )))
    }

    fn requires_arguments(&self, definitions: &[FunctionDefinition], call: &FunctionCall) -> bool {
        definitions
            .iter()
            .find(|d| d.name == call.name)
            .map(declares_parameters)
            .unwrap_or(true)
    }

    async fn invoke(
        &self,
        functions: &mut dyn FunctionSet,
        call: &FunctionCall,
    ) -> Result<FunctionOutcome> {
        debug!(function = %call.name, "Executing function");
        match functions.call(&call.name, &call.arguments).await {
            Ok(outcome) => Ok(outcome),
            Err(Error::Function(e)) => {
                warn!(function = %call.name, error = %e, "Function failed");
                Ok(FunctionOutcome::Continue(format!("Error: {}", e)))
            }
            Err(e) => Err(e),
        }
    }
}

/// Drop the oldest exchanges once `history` holds more than `max` messages.
///
/// The first message carries the preamble and is always kept. The cut lands
/// on a user message so no function result loses its call. Returns how many
/// messages were removed.
pub fn trim_history(history: &mut Vec<EngineMessage>, max: usize) -> usize {
    if history.len() <= max.max(1) {
        return 0;
    }
    let excess = history.len() - max.max(1);
    let cut = (1 + excess..history.len())
        .find(|&i| matches!(history[i], EngineMessage::User { .. }));
    match cut {
        Some(cut) => {
            history.drain(1..cut);
            debug!(removed = cut - 1, kept = history.len(), "Trimmed conversation history");
            cut - 1
        }
        None => 0,
    }
}

/// Pull a required string argument
pub fn required_str<'a>(arguments: &'a Value, key: &str) -> Result<&'a str> {
    arguments[key]
        .as_str()
        .ok_or_else(|| FunctionError::InvalidArgs(format!("{} is required", key)).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function_params;
    use crate::provider::mock::ScriptedEngine;
    use serde_json::json;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(String, Value)>,
    }

    #[async_trait]
    impl FunctionSet for Recorder {
        fn definitions(&self) -> Vec<FunctionDefinition> {
            vec![
                FunctionDefinition::new("lookup", "Look something up", function_params!(query: "string" => "Query")),
                FunctionDefinition::new("list", "List things", json!({"type": "object", "properties": {}})),
                FunctionDefinition::new("finish", "Finish", function_params!(message: "string" => "Answer")),
            ]
        }

        async fn call(&mut self, name: &str, arguments: &Value) -> Result<FunctionOutcome> {
            self.calls.push((name.to_string(), arguments.clone()));
            match name {
                "lookup" => Ok(FunctionOutcome::Continue(format!("found {}", required_str(arguments, "query")?))),
                "list" => Ok(FunctionOutcome::Continue("a, b".to_string())),
                "finish" => Ok(FunctionOutcome::Terminal(required_str(arguments, "message")?.to_string())),
                other => Err(FunctionError::NotFound(other.to_string()).into()),
            }
        }
    }

    fn executor(engine: &Arc<ScriptedEngine>) -> TurnExecutor {
        TurnExecutor::new(engine.clone())
    }

    #[tokio::test]
    async fn test_plain_text_finishes_turn() {
        let engine = Arc::new(ScriptedEngine::new().then_text("hello"));
        let mut history = vec![EngineMessage::user("hi")];
        let mut functions = Recorder::default();

        let step = executor(&engine).run(&mut history, &mut functions).await.unwrap();
        assert_eq!(step, TurnStep::Done("hello".to_string()));
        assert!(functions.calls.is_empty());
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_function_result_fed_back_before_answer() {
        let engine = Arc::new(
            ScriptedEngine::new()
                .then_call("lookup", json!({"query": "rust"}))
                .then_text("Rust is great"),
        );
        let mut history = vec![EngineMessage::user("tell me about rust")];
        let mut functions = Recorder::default();

        let step = executor(&engine).run(&mut history, &mut functions).await.unwrap();
        assert_eq!(step.into_text(), "Rust is great");

        let second = &engine.requests()[1];
        assert!(second.messages.iter().any(|m| m.content_as_text() == "found rust"));
    }

    #[tokio::test]
    async fn test_empty_arguments_are_a_noop() {
        let engine = Arc::new(
            ScriptedEngine::new()
                .then_call("lookup", json!({}))
                .then_text("gave up"),
        );
        let mut history = vec![EngineMessage::user("q")];
        let mut functions = Recorder::default();
        let exec = executor(&engine);

        let first = exec.step(&mut history, &mut functions).await.unwrap();
        assert!(matches!(first, TurnStep::Continue(_)));
        assert!(functions.calls.is_empty());

        let second = exec.step(&mut history, &mut functions).await.unwrap();
        assert_eq!(second, TurnStep::Done("gave up".to_string()));
        assert_eq!(engine.call_count(), 2);
    }

    #[tokio::test]
    async fn test_parameterless_function_runs_without_arguments() {
        let engine = Arc::new(ScriptedEngine::new().then_call("list", Value::Null).then_text("ok"));
        let mut history = vec![EngineMessage::user("q")];
        let mut functions = Recorder::default();

        executor(&engine).run(&mut history, &mut functions).await.unwrap();
        assert_eq!(functions.calls.len(), 1);
        assert_eq!(functions.calls[0].0, "list");
    }

    #[tokio::test]
    async fn test_calls_run_in_emitted_order() {
        let engine = Arc::new(
            ScriptedEngine::new()
                .then_calls(vec![
                    FunctionCall::new("c1", "lookup", json!({"query": "one"})),
                    FunctionCall::new("c2", "list", json!({})),
                    FunctionCall::new("c3", "lookup", json!({"query": "two"})),
                ])
                .then_text("done"),
        );
        let mut history = vec![EngineMessage::user("q")];
        let mut functions = Recorder::default();

        executor(&engine).run(&mut history, &mut functions).await.unwrap();
        let names: Vec<_> = functions.calls.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["lookup", "list", "lookup"]);

        let results: Vec<_> = history
            .iter()
            .filter_map(|m| match m {
                EngineMessage::FunctionResult { call_id, .. } => Some(call_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(results, vec!["c1", "c2", "c3"]);
    }

    #[tokio::test]
    async fn test_terminal_function_ends_turn() {
        let engine = Arc::new(ScriptedEngine::new().then_call("finish", json!({"message": "bye"})));
        let mut history = vec![EngineMessage::user("q")];
        let mut functions = Recorder::default();

        let step = executor(&engine).run(&mut history, &mut functions).await.unwrap();
        assert_eq!(step, TurnStep::Done("bye".to_string()));
        assert_eq!(engine.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_function_error_goes_back_to_engine() {
        let engine = Arc::new(
            ScriptedEngine::new()
                .then_call("missing", json!({"x": 1}))
                .then_text("sorry"),
        );
        let mut history = vec![EngineMessage::user("q")];
        let mut functions = Recorder::default();

        let step = executor(&engine).run(&mut history, &mut functions).await.unwrap();
        assert_eq!(step.into_text(), "sorry");
        assert!(engine.requests()[1]
            .messages
            .iter()
            .any(|m| m.content_as_text().starts_with("Error: Function not found")));
    }

    #[tokio::test]
    async fn test_step_bound_fails_turn() {
        let engine = Arc::new(
            ScriptedEngine::new()
                .then_call("list", json!({}))
                .then_call("list", json!({}))
                .then_call("list", json!({})),
        );
        let mut history = vec![EngineMessage::user("q")];
        let mut functions = Recorder::default();

        let step = executor(&engine)
            .with_max_steps(2)
            .run(&mut history, &mut functions)
            .await
            .unwrap();
        assert!(matches!(step, TurnStep::Failed(_)));
        assert_eq!(engine.call_count(), 2);
    }

    #[tokio::test]
    async fn test_engine_error_propagates() {
        let engine = Arc::new(ScriptedEngine::new().then_error("boom"));
        let mut history = vec![EngineMessage::user("q")];
        let mut functions = Recorder::default();

        let result = executor(&engine).run(&mut history, &mut functions).await;
        assert!(matches!(result, Err(Error::Provider(_))));
    }

    #[test]
    fn test_trim_history_keeps_preamble_and_pairs() {
        let call = FunctionCall::new("c1", "list", json!({}));
        let mut history = vec![
            EngineMessage::user("preamble"),
            EngineMessage::assistant("a1"),
            EngineMessage::user("q2"),
            EngineMessage::function_calls(None, vec![call]),
            EngineMessage::function_result("c1", "list", "[]"),
            EngineMessage::assistant("a2"),
            EngineMessage::user("q3"),
            EngineMessage::assistant("a3"),
        ];

        // Cutting 3 messages would orphan the function result; the cut moves to "q3"
        let removed = trim_history(&mut history, 5);
        assert_eq!(removed, 5);
        let texts: Vec<String> = history.iter().map(EngineMessage::content_as_text).collect();
        assert_eq!(texts, vec!["preamble", "q3", "a3"]);
    }

    #[test]
    fn test_trim_history_under_cap_is_untouched() {
        let mut history = vec![EngineMessage::user("q"), EngineMessage::assistant("a")];
        assert_eq!(trim_history(&mut history, 2), 0);
        assert_eq!(history.len(), 2);

        // No user message to cut at: keep everything rather than split a pair
        let mut history = vec![
            EngineMessage::user("q"),
            EngineMessage::assistant("a"),
            EngineMessage::assistant("b"),
        ];
        assert_eq!(trim_history(&mut history, 2), 0);
    }
}
