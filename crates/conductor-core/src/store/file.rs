//! Filesystem artifact store: `<root>/<owner_id>/response.md`

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{ArtifactStore, RESPONSE_FILE};
use crate::error::{Error, Result};

pub struct FileArtifactStore {
    root: PathBuf,
}

impl FileArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the artifact file for an owner
    pub fn path_for(&self, owner_id: &str) -> Result<PathBuf> {
        validate_owner(owner_id)?;
        Ok(self.root.join(owner_id).join(RESPONSE_FILE))
    }
}

/// Owner ids become path segments; reject anything that would escape the root
fn validate_owner(owner_id: &str) -> Result<()> {
    let escapes = owner_id.is_empty()
        || owner_id.starts_with('/')
        || owner_id.contains('\\')
        || owner_id.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if escapes {
        return Err(Error::Store(format!("Invalid artifact owner: {:?}", owner_id)));
    }
    Ok(())
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn write(&self, owner_id: &str, content: &str) -> Result<()> {
        let path = self.path_for(owner_id)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        debug!(owner = %owner_id, path = %path.display(), bytes = content.len(), "Artifact written");
        Ok(())
    }

    async fn read(&self, owner_id: &str) -> Result<Option<String>> {
        let path = self.path_for(owner_id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn location(&self, owner_id: &str) -> String {
        self.root
            .join(owner_id)
            .join(RESPONSE_FILE)
            .display()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let store = FileArtifactStore::new(dir.path());

        store.write("wikipedia_agent", "# Rust\nA language").await.unwrap();
        let content = store.read("wikipedia_agent").await.unwrap();
        assert_eq!(content.as_deref(), Some("# Rust\nA language"));
        assert!(dir.path().join("wikipedia_agent/response.md").exists());
    }

    #[tokio::test]
    async fn test_missing_artifact_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileArtifactStore::new(dir.path());
        assert_eq!(store.read("joke_agent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let dir = TempDir::new().unwrap();
        let store = FileArtifactStore::new(dir.path());
        store.write("joke_agent", "first").await.unwrap();
        store.write("joke_agent", "second").await.unwrap();
        assert_eq!(store.read("joke_agent").await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_rejects_escaping_owner() {
        let dir = TempDir::new().unwrap();
        let store = FileArtifactStore::new(dir.path());
        assert!(matches!(store.write("../evil", "x").await, Err(Error::Store(_))));
        assert!(matches!(store.read("").await, Err(Error::Store(_))));
    }

    #[test]
    fn test_location_points_into_root() {
        let store = FileArtifactStore::new("output");
        let location = store.location("manager_agent");
        assert!(location.starts_with("output"));
        assert!(location.ends_with("response.md"));
    }
}
