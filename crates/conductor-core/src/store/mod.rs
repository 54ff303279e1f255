//! Persisted agent outputs
//!
//! Each worker (and the manager) owns one artifact keyed by its id. Writes
//! are last-write-wins; nothing in the core deletes an artifact.

mod file;
mod memory;

pub use file::FileArtifactStore;
pub use memory::MemoryArtifactStore;

use async_trait::async_trait;

use crate::error::Result;

/// File name of an owner's artifact inside its directory
pub const RESPONSE_FILE: &str = "response.md";

/// Storage for agent artifacts
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Replace the artifact owned by `owner_id`
    async fn write(&self, owner_id: &str, content: &str) -> Result<()>;

    /// Read an artifact, `None` when the owner never wrote one
    async fn read(&self, owner_id: &str) -> Result<Option<String>>;

    /// Human-readable location of the artifact (for status strings)
    fn location(&self, owner_id: &str) -> String;
}
