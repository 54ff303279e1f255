//! Capability registry
//!
//! Agents are listed in a static manifest of `{id, description, factory}`
//! entries. Nothing is constructed until a session activates it.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use super::workers::{self, JOKE_AGENT_ID, STEAM_AGENT_ID, WIKIPEDIA_AGENT_ID};
use super::{AgentContext, WorkerAgent};
use crate::error::{Error, Result};

/// Id of the agent that runs alone when activated
pub const CODE_GENERATOR_AGENT_ID: &str = "code_generator_agent";

/// Agents a session activates when nothing else is configured.
///
/// Only workers that need no credentials, so a fresh install always starts.
pub fn default_research_agents() -> Vec<String> {
    vec![
        WIKIPEDIA_AGENT_ID.to_string(),
        STEAM_AGENT_ID.to_string(),
        JOKE_AGENT_ID.to_string(),
    ]
}

/// Builds a worker from the shared context
pub type AgentFactory = Arc<dyn Fn(&AgentContext) -> Result<Box<dyn WorkerAgent>> + Send + Sync>;

/// Public view of a registered agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub id: String,
    pub description: String,
}

/// One manifest entry
#[derive(Clone)]
pub struct AgentManifest {
    pub descriptor: AgentDescriptor,
    factory: AgentFactory,
}

impl AgentManifest {
    pub fn new<F>(id: impl Into<String>, description: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&AgentContext) -> Result<Box<dyn WorkerAgent>> + Send + Sync + 'static,
    {
        Self {
            descriptor: AgentDescriptor {
                id: id.into(),
                description: description.into(),
            },
            factory: Arc::new(factory),
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }
}

/// Registry of every known agent
pub struct AgentRegistry {
    manifest: Vec<AgentManifest>,
}

impl AgentRegistry {
    /// Build from a manifest; later duplicates of an id are ignored
    pub fn new(manifest: Vec<AgentManifest>) -> Self {
        let mut seen = HashSet::new();
        let manifest = manifest
            .into_iter()
            .filter(|entry| {
                let fresh = seen.insert(entry.id().to_string());
                if !fresh {
                    warn!(agent = %entry.id(), "Duplicate agent id in manifest ignored");
                }
                fresh
            })
            .collect();
        Self { manifest }
    }

    /// Registry of the bundled workers
    pub fn with_default_agents() -> Self {
        Self::new(workers::default_manifest())
    }

    /// Every known agent id, instantiated or not
    pub fn list_all(&self) -> Vec<String> {
        self.manifest.iter().map(|m| m.id().to_string()).collect()
    }

    pub fn descriptors(&self) -> Vec<AgentDescriptor> {
        self.manifest.iter().map(|m| m.descriptor.clone()).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    fn get(&self, id: &str) -> Option<&AgentManifest> {
        self.manifest.iter().find(|m| m.id() == id)
    }

    /// Construct workers for the requested ids.
    ///
    /// Unknown ids are skipped with a warning. If the code generator is
    /// requested it becomes the only active agent. A failing factory aborts
    /// the whole activation.
    pub fn activate<S: AsRef<str>>(
        &self,
        agent_ids: &[S],
        context: &AgentContext,
    ) -> Result<ActiveAgentSet> {
        let mut requested: Vec<&str> = Vec::new();
        for id in agent_ids.iter().map(AsRef::as_ref) {
            if requested.contains(&id) {
                continue;
            }
            if self.contains(id) {
                requested.push(id);
            } else {
                warn!(agent = %id, "Unknown agent id skipped");
            }
        }

        if requested.contains(&CODE_GENERATOR_AGENT_ID) {
            if requested.len() > 1 {
                info!(
                    ignored = ?requested.iter().filter(|id| **id != CODE_GENERATOR_AGENT_ID).collect::<Vec<_>>(),
                    "Code generator activated; other agents excluded from this session"
                );
            }
            requested = vec![CODE_GENERATOR_AGENT_ID];
        }

        let mut agents = Vec::with_capacity(requested.len());
        for id in requested {
            // Checked above
            let Some(entry) = self.get(id) else { continue };
            let agent = (entry.factory)(context)
                .map_err(|e| Error::Registry(format!("Failed to construct {}: {}", id, e)))?;
            agents.push(agent);
        }

        info!(active = agents.len(), "Agents activated");
        Ok(ActiveAgentSet { agents })
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::with_default_agents()
    }
}

/// Workers instantiated for the current session, in activation order
#[derive(Default)]
pub struct ActiveAgentSet {
    agents: Vec<Box<dyn WorkerAgent>>,
}

impl ActiveAgentSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Ids of the instantiated workers
    pub fn list_active(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.id().to_string()).collect()
    }

    pub fn descriptors(&self) -> Vec<AgentDescriptor> {
        self.agents
            .iter()
            .map(|a| AgentDescriptor {
                id: a.id().to_string(),
                description: a.description().to_string(),
            })
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.agents.iter().any(|a| a.id() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Box<dyn WorkerAgent>> {
        self.agents.iter_mut().find(|a| a.id() == id)
    }

    /// The session runs the code generator alone
    pub fn is_code_generator_only(&self) -> bool {
        self.agents.len() == 1 && self.agents[0].id() == CODE_GENERATOR_AGENT_ID
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::ScriptedEngine;
    use crate::agent::workers::REDDIT_AGENT_ID;
    use crate::store::MemoryArtifactStore;
    use async_trait::async_trait;

    struct Stub(&'static str);

    #[async_trait]
    impl WorkerAgent for Stub {
        fn id(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "stub"
        }

        async fn generate_response(&mut self, instruction: &str) -> Result<String> {
            Ok(instruction.to_string())
        }
    }

    fn stub(id: &'static str) -> AgentManifest {
        AgentManifest::new(id, format!("{} agent", id), move |_| Ok(Box::new(Stub(id))))
    }

    fn context() -> AgentContext {
        AgentContext::new(
            Arc::new(ScriptedEngine::new()),
            Arc::new(MemoryArtifactStore::new()),
        )
    }

    #[test]
    fn test_list_all_does_not_construct() {
        let registry = AgentRegistry::new(vec![
            stub("reddit_agent"),
            AgentManifest::new("broken_agent", "never built", |_| {
                Err(Error::Agent("should not run".to_string()))
            }),
        ]);
        assert_eq!(registry.list_all(), vec!["reddit_agent", "broken_agent"]);
    }

    #[test]
    fn test_unknown_ids_are_skipped() {
        let registry = AgentRegistry::new(vec![stub("reddit_agent"), stub("steam_agent")]);
        let active = registry
            .activate(&["reddit_agent", "nonexistent_agent"], &context())
            .unwrap();
        assert_eq!(active.list_active(), vec!["reddit_agent"]);
    }

    #[test]
    fn test_code_generator_is_exclusive() {
        let registry = AgentRegistry::new(vec![stub("reddit_agent"), stub(CODE_GENERATOR_AGENT_ID)]);
        let active = registry
            .activate(&["reddit_agent", CODE_GENERATOR_AGENT_ID], &context())
            .unwrap();
        assert_eq!(active.list_active(), vec![CODE_GENERATOR_AGENT_ID]);
        assert!(active.is_code_generator_only());
    }

    #[test]
    fn test_factory_failure_is_fatal() {
        let registry = AgentRegistry::new(vec![
            stub("reddit_agent"),
            AgentManifest::new("broken_agent", "fails", |_| {
                Err(Error::Agent("no credentials".to_string()))
            }),
        ]);
        let result = registry.activate(&["reddit_agent", "broken_agent"], &context());
        assert!(matches!(result, Err(Error::Registry(msg)) if msg.contains("broken_agent")));
    }

    #[test]
    fn test_duplicate_requests_activate_once() {
        let registry = AgentRegistry::new(vec![stub("reddit_agent")]);
        let active = registry
            .activate(&["reddit_agent", "reddit_agent"], &context())
            .unwrap();
        assert_eq!(active.len(), 1);
    }

    #[test]
    fn test_default_registry_lists_bundled_workers() {
        let registry = AgentRegistry::with_default_agents();
        let all = registry.list_all();
        assert!(all.contains(&WIKIPEDIA_AGENT_ID.to_string()));
        assert!(all.contains(&JOKE_AGENT_ID.to_string()));
        assert!(all.contains(&STEAM_AGENT_ID.to_string()));
        assert!(all.contains(&REDDIT_AGENT_ID.to_string()));
        assert!(all.contains(&CODE_GENERATOR_AGENT_ID.to_string()));
    }

    #[test]
    fn test_steam_agent_activates_without_credentials() {
        let active = AgentRegistry::with_default_agents()
            .activate(&[STEAM_AGENT_ID], &context())
            .unwrap();
        assert_eq!(active.list_active(), vec![STEAM_AGENT_ID.to_string()]);
    }
}
