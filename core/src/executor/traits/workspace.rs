use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;

/// An isolated checkout bound to exactly one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceHandle {
    pub item_id: String,
    pub branch: String,
    pub path: PathBuf,
}

#[async_trait]
pub trait WorkspaceProvider: Send + Sync {
    /// Fresh checkout derived from the shared repository's current state.
    async fn create(&self, item_id: &str) -> anyhow::Result<WorkspaceHandle>;

    /// Record everything in the workspace on its branch. Returns `false`
    /// when there was nothing to record.
    async fn commit(&self, handle: &WorkspaceHandle, message: &str) -> anyhow::Result<bool>;

    async fn remove(&self, handle: &WorkspaceHandle) -> anyhow::Result<()>;
}
