use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{watch, Mutex};

use super::exclusions::StashExclusions;
use crate::executor::traits::{MergeAttempt, RepositoryOps, WorkspaceHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged,
    /// The merge was rolled back; the shared repository is as it was. Also
    /// reported when the branch touches files with stashed local edits.
    Conflict { files: Vec<String> },
    /// An interrupt arrived before this merge began; nothing was touched.
    Interrupted,
}

/// Serializes integration of finished workspaces into the shared repository.
///
/// Holds the only lock guarding the shared working tree. Within the lock a
/// merge either fully lands or is rolled back, and stashed local changes
/// are always restored before the lock is released.
pub struct MergeCoordinator {
    lock: Mutex<()>,
    repo: Arc<dyn RepositoryOps>,
    exclusions: StashExclusions,
}

impl MergeCoordinator {
    pub fn new(repo: Arc<dyn RepositoryOps>, exclusions: StashExclusions) -> Self {
        Self {
            lock: Mutex::new(()),
            repo,
            exclusions,
        }
    }

    #[tracing::instrument(skip_all, fields(item_id = %handle.item_id, branch = %handle.branch))]
    pub async fn merge(
        &self,
        handle: &WorkspaceHandle,
        message: &str,
        interrupt: &watch::Receiver<bool>,
    ) -> anyhow::Result<MergeOutcome> {
        let _guard = self.lock.lock().await;

        if *interrupt.borrow() {
            tracing::info!("Interrupt pending, merge not attempted");
            return Ok(MergeOutcome::Interrupted);
        }

        let pre_merge_head = self.repo.head().await.context("failed to read HEAD")?;

        let dirty = self.repo.dirty_tracked_files().await?;
        let (to_stash, excluded) = self.exclusions.partition(&dirty);
        if !excluded.is_empty() {
            tracing::debug!(
                paths = ?excluded.iter().map(|f| f.path.as_str()).collect::<Vec<_>>(),
                "Leaving excluded paths in place"
            );
        }

        let stash_paths: Vec<String> = to_stash.iter().flat_map(|f| f.paths()).collect();
        let stashed = if stash_paths.is_empty() {
            false
        } else {
            self.repo
                .stash_push(
                    &stash_paths,
                    &format!("wavesmith: before merging {}", handle.item_id),
                )
                .await
                .context("failed to stash local changes")?;
            tracing::debug!(count = stash_paths.len(), "Stashed local changes");
            true
        };

        let result = match self.repo.merge_branch(&handle.branch, message).await {
            Ok(MergeAttempt::Merged) => {
                tracing::info!("Merged");
                Ok(MergeOutcome::Merged)
            }
            Ok(MergeAttempt::Conflict { files }) => {
                tracing::warn!(files = ?files, "Merge conflict, rolling back");
                self.rollback(&pre_merge_head, true)
                    .await
                    .map(|_| MergeOutcome::Conflict { files })
            }
            Err(err) => {
                tracing::warn!(error = %err, "Merge failed, rolling back");
                match self.rollback(&pre_merge_head, false).await {
                    Ok(()) => Err(err),
                    Err(rollback_err) => Err(err.context(rollback_err.to_string())),
                }
            }
        };

        if !stashed {
            return result;
        }

        if let Err(err) = self.repo.stash_pop().await {
            tracing::warn!(error = %err, "Stashed changes clash with the merge, undoing it");
            self.restore_after_failed_pop(&pre_merge_head)
                .await
                .map_err(|restore_err| err.context(restore_err.to_string()))?;
            return match result {
                Ok(MergeOutcome::Merged) => Ok(MergeOutcome::Conflict { files: stash_paths }),
                other => other,
            };
        }

        result
    }

    /// Undo whatever the merge did and put the stash back onto the tree it
    /// was taken from. The stash entry survives a failed pop.
    async fn restore_after_failed_pop(&self, head: &str) -> anyhow::Result<()> {
        self.repo
            .reset_merge(head)
            .await
            .context("failed to undo merge after stash clash")?;
        self.repo
            .stash_pop()
            .await
            .context("failed to restore stashed changes")
    }

    /// Return the shared repository to `head`. Falls back to `reset --hard`
    /// only when a conflicted merge cannot be aborted or HEAD has moved.
    async fn rollback(&self, head: &str, conflicted: bool) -> anyhow::Result<()> {
        if let Err(err) = self.repo.abort_merge().await {
            if conflicted {
                tracing::warn!(error = %err, "merge --abort failed, resetting");
                return self.repo.reset_hard(head).await;
            }
            tracing::debug!(error = %err, "No merge to abort");
        }

        if self.repo.head().await? != head {
            self.repo.reset_hard(head).await?;
        }
        Ok(())
    }
}
