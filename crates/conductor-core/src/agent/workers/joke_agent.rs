//! Joke lookups over the Chuck Norris API

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{get_json, http_client, JOKE_AGENT_ID};
use crate::agent::turn::{required_str, FunctionOutcome, FunctionSet};
use crate::agent::{AgentContext, WorkerAgent, WorkerSession};
use crate::error::{FunctionError, Result};
use crate::function_params;
use crate::prompt;
use crate::provider::FunctionDefinition;

pub const DESCRIPTION: &str = "An agent that retrieves and presents Chuck Norris jokes: random, \
by category, or by search term.";

const API_BASE: &str = "https://api.chucknorris.io/jokes";

pub struct JokeAgent {
    session: WorkerSession,
    functions: JokeFunctions,
}

impl JokeAgent {
    pub fn new(context: &AgentContext) -> Result<Self> {
        Ok(Self {
            session: WorkerSession::new(JOKE_AGENT_ID, context),
            functions: JokeFunctions {
                client: http_client()?,
                base: API_BASE.to_string(),
            },
        })
    }
}

#[async_trait]
impl WorkerAgent for JokeAgent {
    fn id(&self) -> &str {
        self.session.id()
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    async fn generate_response(&mut self, instruction: &str) -> Result<String> {
        self.session
            .run(instruction, prompt::worker_preamble, &mut self.functions)
            .await
    }
}

struct JokeFunctions {
    client: reqwest::Client,
    base: String,
}

impl JokeFunctions {
    async fn fetch(&self, path: &str, query: &[(&str, &str)]) -> std::result::Result<Option<Value>, FunctionError> {
        let url = format!("{}/{}", self.base, path);
        get_json(self.client.get(url).query(query)).await
    }

    async fn random(&self, category: Option<&str>) -> std::result::Result<String, FunctionError> {
        let query: Vec<(&str, &str)> = category.map(|c| ("category", c)).into_iter().collect();
        match self.fetch("random", &query).await? {
            Some(joke) => Ok(joke["value"].as_str().unwrap_or_default().to_string()),
            None => Ok(format!(
                "No jokes found in category '{}'.",
                category.unwrap_or_default()
            )),
        }
    }

    async fn categories(&self) -> std::result::Result<String, FunctionError> {
        let categories = self.fetch("categories", &[]).await?.unwrap_or_else(|| json!([]));
        Ok(categories.to_string())
    }

    async fn search(&self, query: &str) -> std::result::Result<String, FunctionError> {
        let jokes = joke_values(self.fetch("search", &[("query", query)]).await?);
        Ok(serde_json::to_string(&jokes).unwrap_or_else(|_| "[]".to_string()))
    }
}

fn joke_values(body: Option<Value>) -> Vec<String> {
    body.and_then(|b| b["result"].as_array().cloned())
        .unwrap_or_default()
        .iter()
        .filter_map(|joke| joke["value"].as_str().map(str::to_string))
        .collect()
}

#[async_trait]
impl FunctionSet for JokeFunctions {
    fn definitions(&self) -> Vec<FunctionDefinition> {
        let no_params = json!({"type": "object", "properties": {}});
        vec![
            FunctionDefinition::new("get_random_joke", "Retrieve a random Chuck Norris joke.", no_params.clone()),
            FunctionDefinition::new(
                "get_joke_by_category",
                "Retrieve a random Chuck Norris joke from a specific category.",
                function_params!(category: "string" => "The joke category, see get_joke_categories"),
            ),
            FunctionDefinition::new(
                "get_joke_categories",
                "List the available Chuck Norris joke categories.",
                no_params,
            ),
            FunctionDefinition::new(
                "search_jokes",
                "Search Chuck Norris jokes by free text.",
                function_params!(query: "string" => "The search query"),
            ),
        ]
    }

    async fn call(&mut self, name: &str, arguments: &Value) -> Result<FunctionOutcome> {
        let result = match name {
            "get_random_joke" => self.random(None).await?,
            "get_joke_by_category" => self.random(Some(required_str(arguments, "category")?)).await?,
            "get_joke_categories" => self.categories().await?,
            "search_jokes" => self.search(required_str(arguments, "query")?).await?,
            other => return Err(FunctionError::NotFound(other.to_string()).into()),
        };
        Ok(FunctionOutcome::Continue(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::ScriptedEngine;
    use crate::store::MemoryArtifactStore;
    use std::sync::Arc;

    #[test]
    fn test_joke_values_extracts_results() {
        let body = json!({"total": 2, "result": [{"value": "one"}, {"value": "two"}, {"id": "x"}]});
        assert_eq!(joke_values(Some(body)), vec!["one", "two"]);
        assert!(joke_values(None).is_empty());
    }

    #[tokio::test]
    async fn test_category_without_argument_is_skipped() {
        let engine = Arc::new(
            ScriptedEngine::new()
                .then_call("get_joke_by_category", json!({}))
                .then_text("Which category would you like?"),
        );
        let store = Arc::new(MemoryArtifactStore::new());
        let ctx = AgentContext::new(engine.clone(), store.clone());
        let mut agent = JokeAgent::new(&ctx).unwrap();

        let reply = agent.generate_response("tell me a joke").await.unwrap();
        assert_eq!(reply, "Which category would you like?");
        assert_eq!(engine.call_count(), 2);
        assert_eq!(store.get(JOKE_AGENT_ID).as_deref(), Some("Which category would you like?"));
    }

    #[tokio::test]
    async fn test_unknown_function() {
        let mut functions = JokeFunctions {
            client: http_client().unwrap(),
            base: API_BASE.to_string(),
        };
        let result = functions.call("tell_knock_knock", &json!({"q": 1})).await;
        assert!(matches!(
            result,
            Err(crate::error::Error::Function(FunctionError::NotFound(_)))
        ));
    }
}
