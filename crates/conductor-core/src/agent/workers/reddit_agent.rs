//! Forum research over the Reddit OAuth API
//!
//! Uses application-only OAuth, so only a client id and secret are needed.
//! They come from `REDDIT_CLIENT_ID` and `REDDIT_CLIENT_SECRET`; activating
//! this worker without them fails the activation.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{analyze, get_json, http_client, REDDIT_AGENT_ID};
use crate::agent::turn::{required_str, FunctionOutcome, FunctionSet};
use crate::agent::{AgentContext, WorkerAgent, WorkerSession};
use crate::error::{Error, FunctionError, Result};
use crate::function_params;
use crate::prompt;
use crate::provider::{FunctionDefinition, ReasoningEngine};

pub const DESCRIPTION: &str = "A Reddit agent that searches subreddits for relevant posts and \
comments and analyzes the community discussion.";

pub const CLIENT_ID_ENV: &str = "REDDIT_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "REDDIT_CLIENT_SECRET";

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";
const DEFAULT_POST_LIMIT: u64 = 10;
const MAX_POST_LIMIT: u64 = 25;
const COMMENT_LIMIT: usize = 5;
/// Refresh this long before the token actually expires
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

pub const NO_POSTS_MESSAGE: &str = "No posts data available for analysis.";

/// Reddit application credentials
#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl RedditCredentials {
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve both values through `lookup`; blank values count as missing
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Some(Self {
            client_id: value(CLIENT_ID_ENV)?,
            client_secret: value(CLIENT_SECRET_ENV)?,
        })
    }
}

pub struct RedditAgent {
    session: WorkerSession,
    functions: RedditFunctions,
}

impl RedditAgent {
    /// Build with credentials from the environment
    pub fn new(context: &AgentContext) -> Result<Self> {
        let credentials = RedditCredentials::from_env().ok_or_else(|| {
            Error::Config(format!(
                "{} needs {} and {} to be set",
                REDDIT_AGENT_ID, CLIENT_ID_ENV, CLIENT_SECRET_ENV
            ))
        })?;
        Self::with_credentials(context, credentials)
    }

    pub fn with_credentials(context: &AgentContext, credentials: RedditCredentials) -> Result<Self> {
        Ok(Self {
            session: WorkerSession::new(REDDIT_AGENT_ID, context),
            functions: RedditFunctions {
                client: http_client()?,
                engine: context.engine.clone(),
                credentials,
                token: None,
                posts: Vec::new(),
            },
        })
    }
}

#[async_trait]
impl WorkerAgent for RedditAgent {
    fn id(&self) -> &str {
        self.session.id()
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    async fn generate_response(&mut self, instruction: &str) -> Result<String> {
        self.session
            .run(instruction, prompt::reddit_preamble, &mut self.functions)
            .await
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Post {
    id: String,
    subreddit: String,
    title: String,
    author: Option<String>,
    score: i64,
    url: String,
    num_comments: u64,
    comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Comment {
    body: String,
    score: i64,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// How `retrieve_posts` selects posts
#[derive(Debug, Clone, PartialEq)]
enum Listing {
    Top,
    Search(String),
}

struct RedditFunctions {
    client: reqwest::Client,
    engine: Arc<dyn ReasoningEngine>,
    credentials: RedditCredentials,
    token: Option<AccessToken>,
    posts: Vec<Post>,
}

impl RedditFunctions {
    async fn access_token(&mut self) -> std::result::Result<String, FunctionError> {
        if let Some(token) = self.token.as_ref().filter(|t| Instant::now() < t.expires_at) {
            return Ok(token.value.clone());
        }

        debug!("Requesting Reddit access token");
        let request = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&[("grant_type", "client_credentials")]);
        let body = get_json(request)
            .await?
            .ok_or_else(|| FunctionError::ExecutionFailed("Token endpoint not found".to_string()))?;

        let value = body["access_token"]
            .as_str()
            .ok_or_else(|| {
                FunctionError::ExecutionFailed(format!(
                    "Reddit authentication failed: {}",
                    body["error"].as_str().unwrap_or("no access token returned")
                ))
            })?
            .to_string();
        let lifetime = Duration::from_secs(body["expires_in"].as_u64().unwrap_or(3600));
        self.token = Some(AccessToken {
            value: value.clone(),
            expires_at: Instant::now() + lifetime.saturating_sub(TOKEN_MARGIN),
        });
        Ok(value)
    }

    async fn fetch(
        &mut self,
        path: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<Option<Value>, FunctionError> {
        let token = self.access_token().await?;
        let request = self
            .client
            .get(format!("{}{}", API_BASE, path))
            .bearer_auth(token)
            .query(query);
        get_json(request).await
    }

    async fn comments(&mut self, post_id: &str) -> std::result::Result<Vec<Comment>, FunctionError> {
        let query = [
            ("sort", "best".to_string()),
            ("depth", "1".to_string()),
            ("limit", COMMENT_LIMIT.to_string()),
        ];
        let body = self.fetch(&format!("/comments/{}", post_id), &query).await?;
        Ok(body.map(|b| parse_comments(&b, COMMENT_LIMIT)).unwrap_or_default())
    }

    async fn retrieve_posts(
        &mut self,
        subreddits: &[String],
        listing: &Listing,
        time_filter: &str,
        limit: u64,
    ) -> std::result::Result<String, FunctionError> {
        let mut posts = Vec::new();
        for subreddit in subreddits {
            let (path, mut query) = match listing {
                Listing::Top => (format!("/r/{}/top", subreddit), Vec::new()),
                Listing::Search(q) => (
                    format!("/r/{}/search", subreddit),
                    vec![
                        ("q", q.clone()),
                        ("restrict_sr", "1".to_string()),
                        ("sort", "relevance".to_string()),
                    ],
                ),
            };
            query.push(("t", time_filter.to_string()));
            query.push(("limit", limit.to_string()));

            let found = match self.fetch(&path, &query).await {
                Ok(Some(body)) => parse_listing(&body),
                Ok(None) => {
                    warn!(subreddit = %subreddit, "Subreddit not found");
                    continue;
                }
                Err(e) => {
                    warn!(subreddit = %subreddit, error = %e, "Failed to read subreddit");
                    continue;
                }
            };

            for mut post in found {
                post.comments = match self.comments(&post.id).await {
                    Ok(comments) => comments,
                    Err(e) => {
                        warn!(post = %post.id, error = %e, "Failed to read comments");
                        Vec::new()
                    }
                };
                posts.push(post);
            }
        }

        let total_comments: usize = posts.iter().map(|p| p.comments.len()).sum();
        info!(posts = posts.len(), comments = total_comments, "Retrieved Reddit posts");
        let status = format!(
            "Found {} relevant posts with a total of {} comments retrieved.",
            posts.len(),
            total_comments
        );
        self.posts = posts;
        Ok(status)
    }

    async fn analyze_posts(&self, instruction: &str) -> Result<FunctionOutcome> {
        if self.posts.is_empty() {
            return Ok(FunctionOutcome::Continue(NO_POSTS_MESSAGE.to_string()));
        }
        analyze(self.engine.as_ref(), instruction, &posts_prompt_data(&self.posts)).await
    }
}

#[async_trait]
impl FunctionSet for RedditFunctions {
    fn definitions(&self) -> Vec<FunctionDefinition> {
        vec![
            FunctionDefinition::new(
                "retrieve_posts",
                "Retrieve posts and their top comments from one or more subreddits.",
                json!({
                    "type": "object",
                    "properties": {
                        "subreddits": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Subreddit names without the r/ prefix, e.g. [\"gaming\"]"
                        },
                        "mode": {
                            "type": "string",
                            "enum": ["top", "search"],
                            "description": "top lists the best posts; search requires query. Default top."
                        },
                        "query": {
                            "type": "string",
                            "description": "Search terms, used when mode is search"
                        },
                        "time_filter": {
                            "type": "string",
                            "enum": ["hour", "day", "week", "month", "year", "all"],
                            "description": "Time window. Default all."
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Posts per subreddit, at most 25. Default 10."
                        }
                    },
                    "required": ["subreddits"]
                }),
            ),
            FunctionDefinition::new(
                "analyze_posts",
                "Analyze the retrieved posts and comments. Call after retrieve_posts.",
                function_params!(instruction: "string" => "What to analyze in the discussion"),
            ),
        ]
    }

    async fn call(&mut self, name: &str, arguments: &Value) -> Result<FunctionOutcome> {
        match name {
            "retrieve_posts" => {
                let subreddits = subreddit_names(arguments)?;
                let listing = listing_from_args(arguments)?;
                let time_filter = arguments["time_filter"].as_str().unwrap_or("all");
                let limit = arguments["limit"]
                    .as_u64()
                    .unwrap_or(DEFAULT_POST_LIMIT)
                    .clamp(1, MAX_POST_LIMIT);
                let status = self
                    .retrieve_posts(&subreddits, &listing, time_filter, limit)
                    .await?;
                Ok(FunctionOutcome::Continue(status))
            }
            "analyze_posts" => self.analyze_posts(required_str(arguments, "instruction")?).await,
            other => Err(FunctionError::NotFound(other.to_string()).into()),
        }
    }
}

fn subreddit_names(arguments: &Value) -> std::result::Result<Vec<String>, FunctionError> {
    let names: Vec<String> = arguments["subreddits"]
        .as_array()
        .ok_or_else(|| FunctionError::InvalidArgs("subreddits must be a list of names".to_string()))?
        .iter()
        .filter_map(Value::as_str)
        .map(|name| name.trim().trim_start_matches("r/").to_string())
        .filter(|name| !name.is_empty())
        .collect();

    if names.is_empty() {
        return Err(FunctionError::InvalidArgs("at least one subreddit is required".to_string()));
    }
    Ok(names)
}

fn listing_from_args(arguments: &Value) -> std::result::Result<Listing, FunctionError> {
    match arguments["mode"].as_str().unwrap_or("top") {
        "top" => Ok(Listing::Top),
        "search" => match arguments["query"].as_str().map(str::trim) {
            Some(query) if !query.is_empty() => Ok(Listing::Search(query.to_string())),
            _ => Err(FunctionError::InvalidArgs("query is required when mode is search".to_string())),
        },
        other => Err(FunctionError::InvalidArgs(format!(
            "Invalid mode '{}'. Use 'top' or 'search'.",
            other
        ))),
    }
}

/// Posts of a listing response; comments are filled in separately
fn parse_listing(body: &Value) -> Vec<Post> {
    body["data"]["children"]
        .as_array()
        .map(|children| {
            children
                .iter()
                .map(|child| &child["data"])
                .filter_map(|data| {
                    Some(Post {
                        id: data["id"].as_str()?.to_string(),
                        subreddit: data["subreddit"].as_str().unwrap_or_default().to_string(),
                        title: data["title"].as_str().unwrap_or_default().to_string(),
                        author: data["author"]
                            .as_str()
                            .filter(|a| *a != "[deleted]")
                            .map(str::to_string),
                        score: data["score"].as_i64().unwrap_or_default(),
                        url: data["url"].as_str().unwrap_or_default().to_string(),
                        num_comments: data["num_comments"].as_u64().unwrap_or_default(),
                        comments: Vec::new(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Top-level comments from a `/comments/<id>` response (post listing, then comment listing)
fn parse_comments(body: &Value, limit: usize) -> Vec<Comment> {
    body[1]["data"]["children"]
        .as_array()
        .map(|children| {
            children
                .iter()
                .filter(|child| child["kind"].as_str() == Some("t1"))
                .filter_map(|child| {
                    Some(Comment {
                        body: child["data"]["body"].as_str()?.to_string(),
                        score: child["data"]["score"].as_i64().unwrap_or_default(),
                    })
                })
                .take(limit)
                .collect()
        })
        .unwrap_or_default()
}

fn posts_prompt_data(posts: &[Post]) -> String {
    posts
        .iter()
        .map(|post| {
            format!(
                "Title: {}, Author: {}, Comments: {}, Score: {}",
                post.title,
                post.author.as_deref().unwrap_or("unknown"),
                json!(post.comments),
                post.score
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::ScriptedEngine;
    use crate::provider::ModelTier;
    use crate::store::MemoryArtifactStore;
    use std::collections::HashMap;

    fn credentials() -> RedditCredentials {
        RedditCredentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
        }
    }

    fn post(id: &str, title: &str) -> Post {
        Post {
            id: id.to_string(),
            subreddit: "gaming".to_string(),
            title: title.to_string(),
            author: Some("player1".to_string()),
            score: 42,
            url: format!("https://reddit.com/{}", id),
            num_comments: 1,
            comments: vec![Comment {
                body: "Agreed".to_string(),
                score: 7,
            }],
        }
    }

    #[test]
    fn test_credentials_require_both_values() {
        let env: HashMap<&str, &str> = [(CLIENT_ID_ENV, "id"), (CLIENT_SECRET_ENV, " ")].into();
        assert!(RedditCredentials::from_lookup(|k| env.get(k).map(|v| v.to_string())).is_none());

        let env: HashMap<&str, &str> = [(CLIENT_ID_ENV, "id"), (CLIENT_SECRET_ENV, "s")].into();
        let creds = RedditCredentials::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(creds.client_id, "id");
        assert_eq!(creds.client_secret, "s");
    }

    #[test]
    fn test_parse_listing() {
        let body = json!({"kind": "Listing", "data": {"children": [
            {"kind": "t3", "data": {
                "id": "abc", "subreddit": "gaming", "title": "Hades is great",
                "author": "player1", "score": 120, "url": "https://x", "num_comments": 14
            }},
            {"kind": "t3", "data": {"id": "def", "title": "Gone", "author": "[deleted]"}},
            {"kind": "t3", "data": {"title": "no id"}}
        ]}});

        let posts = parse_listing(&body);
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].title, "Hades is great");
        assert_eq!(posts[0].score, 120);
        assert_eq!(posts[0].num_comments, 14);
        assert_eq!(posts[1].author, None);
    }

    #[test]
    fn test_parse_comments_skips_more_markers() {
        let body = json!([
            {"kind": "Listing", "data": {"children": [{"kind": "t3", "data": {"id": "abc"}}]}},
            {"kind": "Listing", "data": {"children": [
                {"kind": "t1", "data": {"body": "first", "score": 5}},
                {"kind": "more", "data": {"count": 30}},
                {"kind": "t1", "data": {"body": "second", "score": 2}},
                {"kind": "t1", "data": {"body": "third", "score": 1}}
            ]}}
        ]);

        let comments = parse_comments(&body, 2);
        assert_eq!(
            comments,
            vec![
                Comment { body: "first".to_string(), score: 5 },
                Comment { body: "second".to_string(), score: 2 }
            ]
        );
    }

    #[test]
    fn test_retrieve_arguments() {
        assert_eq!(
            subreddit_names(&json!({"subreddits": ["r/gaming", " ", "Games"]})).unwrap(),
            vec!["gaming", "Games"]
        );
        assert!(subreddit_names(&json!({"subreddits": []})).is_err());

        assert_eq!(listing_from_args(&json!({})).unwrap(), Listing::Top);
        assert_eq!(
            listing_from_args(&json!({"mode": "search", "query": "Hades"})).unwrap(),
            Listing::Search("Hades".to_string())
        );
        assert!(listing_from_args(&json!({"mode": "search"})).is_err());
        assert!(listing_from_args(&json!({"mode": "hot"})).is_err());
    }

    #[tokio::test]
    async fn test_analysis_without_posts_keeps_turn_open() {
        let engine = Arc::new(ScriptedEngine::new());
        let ctx = AgentContext::new(engine.clone(), Arc::new(MemoryArtifactStore::new()));
        let agent = RedditAgent::with_credentials(&ctx, credentials()).unwrap();

        let outcome = agent.functions.analyze_posts("summarize").await.unwrap();
        assert!(matches!(outcome, FunctionOutcome::Continue(text) if text == NO_POSTS_MESSAGE));
        assert_eq!(engine.call_count(), 0);
    }

    #[tokio::test]
    async fn test_analysis_becomes_artifact() {
        let engine = Arc::new(
            ScriptedEngine::new()
                .then_call("analyze_posts", json!({"instruction": "How do people feel?"}))
                .then_text("The community is enthusiastic."),
        );
        let store = Arc::new(MemoryArtifactStore::new());
        let ctx = AgentContext::new(engine.clone(), store.clone());
        let mut agent = RedditAgent::with_credentials(&ctx, credentials()).unwrap();
        agent.functions.posts = vec![post("abc", "Hades is great"), post("def", "Celeste vs Hades")];

        let reply = agent.generate_response("What does r/gaming think of Hades?").await.unwrap();

        assert_eq!(reply, "The community is enthusiastic.");
        assert_eq!(store.get(REDDIT_AGENT_ID).as_deref(), Some("The community is enthusiastic."));
        let requests = engine.requests();
        assert_eq!(requests[1].tier, ModelTier::Powerful);
        let prompt = requests[1].messages[0].content_as_text();
        assert!(prompt.starts_with("How do people feel?"));
        assert!(prompt.contains("Title: Hades is great, Author: player1"));
        assert!(prompt.contains("Title: Celeste vs Hades"));
        assert!(prompt.contains("Agreed"));
    }

    #[tokio::test]
    async fn test_missing_subreddits_is_reported_to_engine() {
        let ctx = AgentContext::new(Arc::new(ScriptedEngine::new()), Arc::new(MemoryArtifactStore::new()));
        let mut agent = RedditAgent::with_credentials(&ctx, credentials()).unwrap();

        let result = agent.functions.call("retrieve_posts", &json!({"mode": "top"})).await;
        assert!(matches!(result, Err(Error::Function(FunctionError::InvalidArgs(_)))));
    }
}
