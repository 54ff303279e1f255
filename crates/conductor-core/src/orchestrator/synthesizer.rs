//! Response synthesizer
//!
//! Reads back the artifacts of the delegated agents. One artifact is copied
//! verbatim to the manager's location; two or more are merged by the engine
//! on the powerful tier. Synthesis never fails outward: every error becomes
//! a user-facing message.

use std::sync::Arc;
use tracing::{error, info, warn};

use super::MANAGER_AGENT_ID;
use crate::error::Error;
use crate::events::{emit, ProgressSink};
use crate::prompt;
use crate::provider::{ModelTier, ReasoningEngine};
use crate::store::ArtifactStore;

pub const NOTHING_TO_SUMMARIZE: &str = "No agent responses found for summarization.";
pub const CONTENT_BLOCKED_MESSAGE: &str = "Unable to generate analysis due to content restrictions.";
pub const SYNTHESIS_FAILED_MESSAGE: &str = "Failed to generate analysis due to an error.";

pub struct ResponseSynthesizer {
    engine: Arc<dyn ReasoningEngine>,
    store: Arc<dyn ArtifactStore>,
    sink: Arc<dyn ProgressSink>,
}

impl ResponseSynthesizer {
    pub fn new(
        engine: Arc<dyn ReasoningEngine>,
        store: Arc<dyn ArtifactStore>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self { engine, store, sink }
    }

    /// Status string pointing at the manager's artifact
    pub fn status(&self) -> String {
        format!(
            "Analysis generated by {} and available at {}",
            MANAGER_AGENT_ID,
            self.store.location(MANAGER_AGENT_ID)
        )
    }

    pub async fn synthesize(&self, agent_ids: &[String], user_instruction: &str) -> String {
        self.try_synthesize(agent_ids, user_instruction)
            .await
            .unwrap_or_else(|| NOTHING_TO_SUMMARIZE.to_string())
    }

    /// Like `synthesize`, but `None` when no delegated agent left an artifact
    pub async fn try_synthesize(&self, agent_ids: &[String], user_instruction: &str) -> Option<String> {
        emit(self.sink.as_ref(), MANAGER_AGENT_ID, "Summarizing agent responses").await;

        let artifacts = self.collect(agent_ids).await;
        if artifacts.is_empty() {
            info!("No agent artifacts to summarize");
            emit(self.sink.as_ref(), MANAGER_AGENT_ID, "Nothing to summarize").await;
            return None;
        }

        let result = match artifacts.len() {
            1 => {
                info!("Single agent response; copying to manager output");
                self.persist(&artifacts[0]).await
            }
            n => {
                info!(sources = n, "Merging agent responses");
                let request = prompt::synthesis_prompt(user_instruction, &artifacts);
                match self.engine.generate(&request, ModelTier::Powerful).await {
                    Ok(analysis) => self.persist(&analysis).await,
                    Err(Error::ContentBlocked(reason)) => {
                        warn!(reason = %reason, "Synthesis blocked by content policy");
                        CONTENT_BLOCKED_MESSAGE.to_string()
                    }
                    Err(e) => {
                        error!(error = %e, "Synthesis failed");
                        SYNTHESIS_FAILED_MESSAGE.to_string()
                    }
                }
            }
        };

        emit(self.sink.as_ref(), MANAGER_AGENT_ID, "Summary complete").await;
        Some(result)
    }

    /// Artifacts of the given agents in order; missing ones are skipped
    async fn collect(&self, agent_ids: &[String]) -> Vec<String> {
        let mut artifacts = Vec::new();
        for id in agent_ids {
            match self.store.read(id).await {
                Ok(Some(content)) => artifacts.push(content),
                Ok(None) => warn!(agent = %id, "Delegated agent left no artifact"),
                Err(e) => warn!(agent = %id, error = %e, "Failed to read agent artifact"),
            }
        }
        artifacts
    }

    async fn persist(&self, content: &str) -> String {
        match self.store.write(MANAGER_AGENT_ID, content).await {
            Ok(()) => self.status(),
            Err(e) => {
                error!(error = %e, "Failed to persist manager analysis");
                SYNTHESIS_FAILED_MESSAGE.to_string()
            }
        }
    }
}
