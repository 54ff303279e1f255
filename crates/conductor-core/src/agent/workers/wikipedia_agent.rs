//! Encyclopedia lookups over the Wikipedia REST and action APIs

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{get_json, http_client, WIKIPEDIA_AGENT_ID};
use crate::agent::turn::{required_str, FunctionOutcome, FunctionSet};
use crate::agent::{AgentContext, WorkerAgent, WorkerSession};
use crate::error::{FunctionError, Result};
use crate::prompt;
use crate::provider::FunctionDefinition;

pub const DESCRIPTION: &str = "A Wikipedia agent that retrieves topic summaries and searches \
for related pages.";

const REST_BASE: &str = "https://en.wikipedia.org/api/rest_v1/page/summary/";
const ACTION_API: &str = "https://en.wikipedia.org/w/api.php";
const DEFAULT_SENTENCES: usize = 2;
const SEARCH_LIMIT: &str = "10";

pub struct WikipediaAgent {
    session: WorkerSession,
    functions: WikipediaFunctions,
}

impl WikipediaAgent {
    pub fn new(context: &AgentContext) -> Result<Self> {
        Ok(Self {
            session: WorkerSession::new(WIKIPEDIA_AGENT_ID, context),
            functions: WikipediaFunctions {
                client: http_client()?,
            },
        })
    }
}

#[async_trait]
impl WorkerAgent for WikipediaAgent {
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

struct WikipediaFunctions {
    client: reqwest::Client,
}

impl WikipediaFunctions {
    async fn get_summary(&self, topic: &str, sentences: usize) -> std::result::Result<String, FunctionError> {
        let mut url = reqwest::Url::parse(REST_BASE)
            .map_err(|e| FunctionError::ExecutionFailed(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| FunctionError::ExecutionFailed("Invalid summary endpoint".to_string()))?
            .pop_if_empty()
            .push(&topic.replace(' ', "_"));

        debug!(topic = %topic, "Fetching Wikipedia summary");
        let Some(page) = get_json(self.client.get(url)).await? else {
            return Ok(format!("No Wikipedia page found for '{}'.", topic));
        };

        if page["type"].as_str() == Some("disambiguation") {
            return Ok(format!(
                "Multiple options found for '{}'. Please be more specific.",
                topic
            ));
        }

        let extract = page["extract"].as_str().unwrap_or_default();
        if extract.is_empty() {
            return Ok(format!("No Wikipedia page found for '{}'.", topic));
        }
        Ok(limit_sentences(extract, sentences))
    }

    async fn search(&self, query: &str) -> std::result::Result<String, FunctionError> {
        debug!(query = %query, "Searching Wikipedia");
        let request = self.client.get(ACTION_API).query(&[
            ("action", "query"),
            ("list", "search"),
            ("srsearch", query),
            ("srlimit", SEARCH_LIMIT),
            ("format", "json"),
        ]);

        let titles: Vec<String> = get_json(request)
            .await?
            .and_then(|body| body["query"]["search"].as_array().cloned())
            .unwrap_or_default()
            .iter()
            .filter_map(|hit| hit["title"].as_str().map(str::to_string))
            .collect();

        Ok(serde_json::to_string(&titles).unwrap_or_else(|_| "[]".to_string()))
    }
}

#[async_trait]
impl FunctionSet for WikipediaFunctions {
    fn definitions(&self) -> Vec<FunctionDefinition> {
        vec![
            FunctionDefinition::new(
                "get_summary",
                "Retrieve a concise summary of a topic from Wikipedia.",
                json!({
                    "type": "object",
                    "properties": {
                        "topic": {
                            "type": "string",
                            "description": "The topic to summarize, e.g. \"Albert Einstein\""
                        },
                        "sentences": {
                            "type": "integer",
                            "description": "Number of sentences in the summary. Default 2."
                        }
                    },
                    "required": ["topic"]
                }),
            ),
            FunctionDefinition::new(
                "search_wikipedia",
                "Search Wikipedia for page titles related to a query.",
                crate::function_params!(query: "string" => "The search query, e.g. \"artificial intelligence\""),
            ),
        ]
    }

    async fn call(&mut self, name: &str, arguments: &Value) -> Result<FunctionOutcome> {
        let result = match name {
            "get_summary" => {
                let topic = required_str(arguments, "topic")?;
                let sentences = arguments["sentences"]
                    .as_u64()
                    .map(|n| n as usize)
                    .unwrap_or(DEFAULT_SENTENCES);
                self.get_summary(topic, sentences).await?
            }
            "search_wikipedia" => self.search(required_str(arguments, "query")?).await?,
            other => return Err(FunctionError::NotFound(other.to_string()).into()),
        };
        Ok(FunctionOutcome::Continue(result))
    }
}

/// Keep the first `count` sentences of an extract
fn limit_sentences(text: &str, count: usize) -> String {
    if count == 0 {
        return text.trim().to_string();
    }

    let mut seen = 0;
    for (idx, ch) in text.char_indices() {
        if matches!(ch, '.' | '!' | '?') {
            let next = text[idx + ch.len_utf8()..].chars().next();
            if next.is_none_or(char::is_whitespace) {
                seen += 1;
                if seen == count {
                    return text[..idx + ch.len_utf8()].trim().to_string();
                }
            }
        }
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::ScriptedEngine;
    use crate::store::MemoryArtifactStore;
    use std::sync::Arc;

    #[test]
    fn test_limit_sentences() {
        let text = "Rust is a language. It is fast. It is safe.";
        assert_eq!(limit_sentences(text, 2), "Rust is a language. It is fast.");
        assert_eq!(limit_sentences(text, 10), text);
        assert_eq!(limit_sentences("Version 1.5 shipped. Done.", 1), "Version 1.5 shipped.");
    }

    #[tokio::test]
    async fn test_first_call_uses_preamble_and_persists() {
        let engine = Arc::new(
            ScriptedEngine::new()
                .then_text("Einstein was a physicist.")
                .then_text("He was born in Ulm."),
        );
        let store = Arc::new(MemoryArtifactStore::new());
        let ctx = AgentContext::new(engine.clone(), store.clone());
        let mut agent = WikipediaAgent::new(&ctx).unwrap();

        let first = agent.generate_response("Who was Einstein?").await.unwrap();
        assert_eq!(first, "Einstein was a physicist.");
        let sent = engine.requests()[0].messages[0].content_as_text();
        assert!(sent.starts_with("Based on the user input"));
        assert!(sent.ends_with("User: Who was Einstein?"));

        agent.generate_response("Where was he born?").await.unwrap();
        let followup = engine.requests()[1].messages.last().unwrap().content_as_text();
        assert_eq!(followup, "Where was he born?");
        assert_eq!(store.get(WIKIPEDIA_AGENT_ID).as_deref(), Some("He was born in Ulm."));
    }

    #[tokio::test]
    async fn test_missing_topic_is_reported_to_engine() {
        let mut functions = WikipediaFunctions {
            client: http_client().unwrap(),
        };
        let result = functions.call("get_summary", &json!({"sentences": 3})).await;
        assert!(matches!(
            result,
            Err(crate::error::Error::Function(FunctionError::InvalidArgs(_)))
        ));
    }
}
