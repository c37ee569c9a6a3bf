use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChangeKind {
    Modified,
    Added,
    Deleted,
    Renamed { from: String },
}

/// A tracked file with uncommitted changes, relative to the repository root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirtyFile {
    pub path: String,
    pub change: ChangeKind,
}

impl DirtyFile {
    pub fn new(path: impl Into<String>, change: ChangeKind) -> Self {
        Self {
            path: path.into(),
            change,
        }
    }

    /// Every path a stash of this change has to name.
    pub fn paths(&self) -> Vec<String> {
        match &self.change {
            ChangeKind::Renamed { from } => vec![from.clone(), self.path.clone()],
            _ => vec![self.path.clone()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeAttempt {
    Merged,
    Conflict { files: Vec<String> },
}

/// Operations on the shared repository. Only the merge coordinator calls
/// these, and only while holding its lock.
#[async_trait]
pub trait RepositoryOps: Send + Sync {
    async fn dirty_tracked_files(&self) -> anyhow::Result<Vec<DirtyFile>>;

    /// Stash exactly `paths`; untouched paths stay in the working tree.
    async fn stash_push(&self, paths: &[String], message: &str) -> anyhow::Result<()>;

    async fn stash_pop(&self) -> anyhow::Result<()>;

    async fn head(&self) -> anyhow::Result<String>;

    async fn merge_branch(&self, branch: &str, message: &str) -> anyhow::Result<MergeAttempt>;

    async fn abort_merge(&self) -> anyhow::Result<()>;

    async fn reset_hard(&self, rev: &str) -> anyhow::Result<()>;

    /// Move back to `rev`, dropping unmerged entries while keeping local
    /// changes to files that do not differ between HEAD and `rev`.
    async fn reset_merge(&self, rev: &str) -> anyhow::Result<()>;
}
