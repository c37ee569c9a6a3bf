use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info, warn};

use wavesmith_core::api::{WorkspaceHandle, WorkspaceProvider};

use crate::git::GitRunner;

/// One `git worktree` per item, each on its own branch cut from the shared
/// repository's HEAD at creation time.
pub struct WorktreeProvider {
    git: GitRunner,
    root: PathBuf,
    branch_prefix: String,
}

impl WorktreeProvider {
    /// `root` is resolved against `repo_root` when relative.
    pub fn new(repo_root: &Path, root: &Path, branch_prefix: impl Into<String>) -> Self {
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            repo_root.join(root)
        };
        Self {
            git: GitRunner::new(repo_root),
            root,
            branch_prefix: branch_prefix.into(),
        }
    }

    pub fn branch_for(&self, item_id: &str) -> String {
        format!("{}/{}", self.branch_prefix, sanitize(item_id))
    }

    pub fn path_for(&self, item_id: &str) -> PathBuf {
        self.root.join(sanitize(item_id))
    }

    /// Drop leftovers of an earlier attempt at the same item.
    async fn clear_stale(&self, path: &Path, branch: &str) -> anyhow::Result<()> {
        if path.exists() {
            warn!(path = %path.display(), "Removing stale worktree");
            let path_str = path.to_string_lossy();
            if self
                .git
                .run_checked(&["worktree", "remove", "--force", &path_str])
                .await
                .is_err()
            {
                fs::remove_dir_all(path)
                    .await
                    .with_context(|| format!("cannot remove {}", path.display()))?;
            }
        }
        self.git.run(&["worktree", "prune"]).await?;

        if self.git.branch_exists(branch).await? {
            debug!(branch, "Deleting stale branch");
            self.git.delete_branch(branch).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl WorkspaceProvider for WorktreeProvider {
    async fn create(&self, item_id: &str) -> anyhow::Result<WorkspaceHandle> {
        let path = self.path_for(item_id);
        let branch = self.branch_for(item_id);

        self.clear_stale(&path, &branch).await?;
        fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("cannot create {}", self.root.display()))?;

        let path_str = path.to_string_lossy();
        self.git
            .run_checked(&["worktree", "add", "-b", &branch, &path_str, "HEAD"])
            .await?;

        info!(item_id, branch = %branch, path = %path.display(), "Created worktree");
        Ok(WorkspaceHandle {
            item_id: item_id.to_string(),
            branch,
            path,
        })
    }

    async fn commit(&self, handle: &WorkspaceHandle, message: &str) -> anyhow::Result<bool> {
        let wt = self.git.with_dir(&handle.path);
        wt.run_checked(&["add", "-A"]).await?;

        let staged = wt.run(&["diff", "--cached", "--quiet"]).await?;
        if !staged.status.success() {
            wt.run_checked(&["commit", "-q", "--no-verify", "-m", message])
                .await?;
        }

        // The fixer may have committed on its own; count everything the
        // branch has that the shared HEAD lacks.
        let ahead = self
            .git
            .stdout(&["rev-list", "--count", &format!("HEAD..{}", handle.branch)])
            .await?;
        let ahead: u64 = ahead.parse().unwrap_or(0);
        debug!(item_id = %handle.item_id, ahead, "Workspace committed");
        Ok(ahead > 0)
    }

    async fn remove(&self, handle: &WorkspaceHandle) -> anyhow::Result<()> {
        let path_str = handle.path.to_string_lossy();
        self.git
            .run_checked(&["worktree", "remove", "--force", &path_str])
            .await?;
        if !self.git.delete_branch(&handle.branch).await? {
            warn!(branch = %handle.branch, "Branch not deleted");
        }
        info!(item_id = %handle.item_id, "Removed worktree");
        Ok(())
    }
}

/// Item ids become path components and branch names.
fn sanitize(item_id: &str) -> String {
    item_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect()
}
