//! Game review research over the public Steam storefront APIs
//!
//! Both endpoints are keyless. Reviews are held in memory between
//! `retrieve_reviews` and `analyze_reviews`; the analysis becomes the
//! worker's artifact.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use super::{analyze, get_json, http_client, STEAM_AGENT_ID};
use crate::agent::turn::{required_str, FunctionOutcome, FunctionSet};
use crate::agent::{AgentContext, WorkerAgent, WorkerSession};
use crate::error::{FunctionError, Result};
use crate::function_params;
use crate::prompt;
use crate::provider::{FunctionDefinition, ReasoningEngine};

pub const DESCRIPTION: &str = "A Steam agent that finds a game on the Steam store, retrieves \
its user reviews, and analyzes what players think of it.";

const STORE_SEARCH: &str = "https://store.steampowered.com/api/storesearch/";
const APP_REVIEWS: &str = "https://store.steampowered.com/appreviews/";
const REVIEWS_PER_PAGE: &str = "100";

pub const NO_REVIEWS_MESSAGE: &str = "No reviews data available for analysis.";

pub struct SteamAgent {
    session: WorkerSession,
    functions: SteamFunctions,
}

impl SteamAgent {
    pub fn new(context: &AgentContext) -> Result<Self> {
        Ok(Self {
            session: WorkerSession::new(STEAM_AGENT_ID, context),
            functions: SteamFunctions {
                client: http_client()?,
                engine: context.engine.clone(),
                reviews: None,
            },
        })
    }
}

#[async_trait]
impl WorkerAgent for SteamAgent {
    fn id(&self) -> &str {
        self.session.id()
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    async fn generate_response(&mut self, instruction: &str) -> Result<String> {
        self.session
            .run(instruction, prompt::steam_preamble, &mut self.functions)
            .await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
struct ReviewSummary {
    review_score_desc: Option<String>,
    total_positive: u64,
    total_negative: u64,
    total_reviews: u64,
}

#[derive(Debug, Clone)]
struct GameReviews {
    app_id: u64,
    name: String,
    summary: ReviewSummary,
    reviews: Vec<String>,
}

impl GameReviews {
    /// Review texts plus the score summary, as handed to the analysis prompt
    fn as_prompt_data(&self) -> String {
        let mut data = format!(
            "Game: {} (app {})\nSummary: {}\n\n",
            self.name,
            self.app_id,
            json!(self.summary)
        );
        for review in &self.reviews {
            data.push_str(&format!("Review: {}\n", review));
        }
        data
    }
}

struct SteamFunctions {
    client: reqwest::Client,
    engine: Arc<dyn ReasoningEngine>,
    reviews: Option<GameReviews>,
}

impl SteamFunctions {
    async fn find_app(&self, game_name: &str) -> std::result::Result<Option<(u64, String)>, FunctionError> {
        let request = self
            .client
            .get(STORE_SEARCH)
            .query(&[("term", game_name), ("l", "english"), ("cc", "US")]);
        Ok(get_json(request)
            .await?
            .and_then(|body| pick_app(&body, game_name)))
    }

    async fn retrieve_reviews(&mut self, game_name: &str) -> std::result::Result<String, FunctionError> {
        let Some((app_id, name)) = self.find_app(game_name).await? else {
            return Ok(format!("No matching Steam game found for '{}'.", game_name));
        };
        debug!(app_id, name = %name, "Resolved Steam app");

        let request = self
            .client
            .get(format!("{}{}", APP_REVIEWS, app_id))
            .query(&[
                ("json", "1"),
                ("filter", "all"),
                ("language", "english"),
                ("purchase_type", "all"),
                ("num_per_page", REVIEWS_PER_PAGE),
            ]);
        let Some(body) = get_json(request).await? else {
            return Ok(format!("No reviews found for '{}'.", name));
        };

        let (summary, reviews) = parse_reviews(&body);
        info!(app_id, count = reviews.len(), "Retrieved Steam reviews");
        let status = format!(
            "Retrieved {} reviews for '{}' (app {}): {}, {} positive and {} negative out of {}.",
            reviews.len(),
            name,
            app_id,
            summary.review_score_desc.as_deref().unwrap_or("no score"),
            summary.total_positive,
            summary.total_negative,
            summary.total_reviews
        );
        self.reviews = Some(GameReviews {
            app_id,
            name,
            summary,
            reviews,
        });
        Ok(status)
    }

    async fn analyze_reviews(&self, instruction: &str) -> Result<FunctionOutcome> {
        match &self.reviews {
            Some(game) if !game.reviews.is_empty() => {
                analyze(self.engine.as_ref(), instruction, &game.as_prompt_data()).await
            }
            _ => Ok(FunctionOutcome::Continue(NO_REVIEWS_MESSAGE.to_string())),
        }
    }
}

#[async_trait]
impl FunctionSet for SteamFunctions {
    fn definitions(&self) -> Vec<FunctionDefinition> {
        vec![
            FunctionDefinition::new(
                "retrieve_reviews",
                "Find a game on the Steam store and download its recent user reviews.",
                function_params!(game_name: "string" => "The game's title, e.g. \"Hades\""),
            ),
            FunctionDefinition::new(
                "analyze_reviews",
                "Analyze the retrieved reviews. Call after retrieve_reviews.",
                function_params!(instruction: "string" => "What to analyze in the reviews"),
            ),
        ]
    }

    async fn call(&mut self, name: &str, arguments: &Value) -> Result<FunctionOutcome> {
        match name {
            "retrieve_reviews" => {
                let status = self
                    .retrieve_reviews(required_str(arguments, "game_name")?)
                    .await?;
                Ok(FunctionOutcome::Continue(status))
            }
            "analyze_reviews" => self.analyze_reviews(required_str(arguments, "instruction")?).await,
            other => Err(FunctionError::NotFound(other.to_string()).into()),
        }
    }
}

/// Exact (case-insensitive) title match first, otherwise the top search hit
fn pick_app(body: &Value, game_name: &str) -> Option<(u64, String)> {
    let items: Vec<(u64, String)> = body["items"]
        .as_array()?
        .iter()
        .filter_map(|item| Some((item["id"].as_u64()?, item["name"].as_str()?.to_string())))
        .collect();

    items
        .iter()
        .find(|(_, name)| name.eq_ignore_ascii_case(game_name.trim()))
        .or_else(|| items.first())
        .cloned()
}

fn parse_reviews(body: &Value) -> (ReviewSummary, Vec<String>) {
    let summary = &body["query_summary"];
    let summary = ReviewSummary {
        review_score_desc: summary["review_score_desc"].as_str().map(str::to_string),
        total_positive: summary["total_positive"].as_u64().unwrap_or_default(),
        total_negative: summary["total_negative"].as_u64().unwrap_or_default(),
        total_reviews: summary["total_reviews"].as_u64().unwrap_or_default(),
    };

    let reviews = body["reviews"]
        .as_array()
        .map(|reviews| {
            reviews
                .iter()
                .filter_map(|r| r["review"].as_str())
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    (summary, reviews)
}
