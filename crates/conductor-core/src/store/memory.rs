//! In-memory artifact store

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::ArtifactStore;
use crate::error::Result;

/// Lock-guarded map of artifacts, used by tests and dry runs
#[derive(Default)]
pub struct MemoryArtifactStore {
    artifacts: RwLock<HashMap<String, String>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an artifact without going through a worker
    pub fn insert(&self, owner_id: impl Into<String>, content: impl Into<String>) {
        self.artifacts.write().insert(owner_id.into(), content.into());
    }

    pub fn get(&self, owner_id: &str) -> Option<String> {
        self.artifacts.read().get(owner_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.artifacts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.read().is_empty()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn write(&self, owner_id: &str, content: &str) -> Result<()> {
        self.insert(owner_id, content);
        Ok(())
    }

    async fn read(&self, owner_id: &str) -> Result<Option<String>> {
        Ok(self.get(owner_id))
    }

    fn location(&self, owner_id: &str) -> String {
        format!("memory://{}", owner_id)
    }
}
