use std::path::{Path, PathBuf};

use async_trait::async_trait;

use wavesmith_core::api::{ChangeKind, DirtyFile, MergeAttempt, RepositoryOps, VcsError};

use super::runner::GitRunner;

/// [`RepositoryOps`] over a real git checkout.
pub struct GitRepositoryOps {
    git: GitRunner,
}

impl GitRepositoryOps {
    /// Open the repository containing `dir`, rooted at its top level.
    pub async fn open(dir: &Path) -> Result<Self, VcsError> {
        let probe = GitRunner::new(dir);
        let top = probe
            .stdout(&["rev-parse", "--show-toplevel"])
            .await
            .map_err(|_| VcsError::NotARepository(dir.display().to_string()))?;
        Ok(Self {
            git: GitRunner::new(PathBuf::from(top)),
        })
    }

    pub fn root(&self) -> &Path {
        self.git.working_dir()
    }

    pub fn runner(&self) -> &GitRunner {
        &self.git
    }

    pub async fn current_branch(&self) -> Result<String, VcsError> {
        self.git.current_branch().await
    }

    async fn conflicted_files(&self) -> Result<Vec<String>, VcsError> {
        let out = self
            .git
            .stdout(&["diff", "--name-only", "--diff-filter=U"])
            .await?;
        Ok(out.lines().map(str::to_string).collect())
    }
}

#[async_trait]
impl RepositoryOps for GitRepositoryOps {
    async fn dirty_tracked_files(&self) -> anyhow::Result<Vec<DirtyFile>> {
        let output = self
            .git
            .run_checked(&["status", "--porcelain=v1", "-z", "--untracked-files=no"])
            .await?;
        Ok(parse_porcelain_z(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn stash_push(&self, paths: &[String], message: &str) -> anyhow::Result<()> {
        let mut args = vec!["stash", "push", "-m", message, "--"];
        args.extend(paths.iter().map(String::as_str));
        self.git.run_checked(&args).await?;
        Ok(())
    }

    async fn stash_pop(&self) -> anyhow::Result<()> {
        self.git.run_checked(&["stash", "pop"]).await?;
        Ok(())
    }

    async fn head(&self) -> anyhow::Result<String> {
        Ok(self.git.stdout(&["rev-parse", "HEAD"]).await?)
    }

    async fn merge_branch(&self, branch: &str, message: &str) -> anyhow::Result<MergeAttempt> {
        let output = self
            .git
            .run(&["merge", "--no-ff", "--no-edit", "-m", message, branch])
            .await?;
        if output.status.success() {
            return Ok(MergeAttempt::Merged);
        }

        let files = self.conflicted_files().await?;
        if files.is_empty() {
            return Err(VcsError::CommandFailed {
                args: format!("merge --no-ff {branch}"),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(MergeAttempt::Conflict { files })
    }

    async fn abort_merge(&self) -> anyhow::Result<()> {
        self.git.run_checked(&["merge", "--abort"]).await?;
        Ok(())
    }

    async fn reset_hard(&self, rev: &str) -> anyhow::Result<()> {
        self.git.run_checked(&["reset", "--hard", rev]).await?;
        Ok(())
    }

    async fn reset_merge(&self, rev: &str) -> anyhow::Result<()> {
        self.git.run_checked(&["reset", "--merge", rev]).await?;
        Ok(())
    }
}

/// Parse `git status --porcelain=v1 -z`.
///
/// Records are `XY <path>` separated by NUL; renames and copies are followed
/// by one extra field holding the source path.
pub(crate) fn parse_porcelain_z(out: &str) -> Vec<DirtyFile> {
    let mut files = Vec::new();
    let mut fields = out.split('\0').filter(|f| !f.is_empty());

    while let Some(record) = fields.next() {
        let (Some(code), Some(path)) = (record.get(..2), record.get(3..)) else {
            continue;
        };
        if code == "??" || code == "!!" {
            continue;
        }

        let has = |c: char| code.contains(c);
        let change = if has('R') {
            let from = fields.next().unwrap_or_default().to_string();
            ChangeKind::Renamed { from }
        } else if has('C') {
            fields.next();
            ChangeKind::Added
        } else if has('D') {
            ChangeKind::Deleted
        } else if code.starts_with('A') {
            ChangeKind::Added
        } else {
            ChangeKind::Modified
        };
        files.push(DirtyFile::new(path, change));
    }

    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::test_support::{git, git_available, init_repo};
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::watch;
    use wavesmith_core::api::{MergeCoordinator, MergeOutcome, StashExclusions, WorkspaceHandle};

    #[test]
    fn test_parse_porcelain_z() {
        let out = " M src/lib.rs\0R  archive/BUG-1.md\0issues/BUG-1.md\0D  old.rs\0A  new.rs\0?? junk\0";
        let files = parse_porcelain_z(out);

        assert_eq!(
            files,
            vec![
                DirtyFile::new("src/lib.rs", ChangeKind::Modified),
                DirtyFile::new(
                    "archive/BUG-1.md",
                    ChangeKind::Renamed {
                        from: "issues/BUG-1.md".to_string()
                    }
                ),
                DirtyFile::new("old.rs", ChangeKind::Deleted),
                DirtyFile::new("new.rs", ChangeKind::Added),
            ]
        );
    }

    #[tokio::test]
    async fn test_stash_round_trip_only_touches_named_paths() {
        if !git_available() {
            return;
        }
        let dir = init_repo();
        let root = dir.path();
        let repo = GitRepositoryOps::open(root).await.unwrap();

        let edited = b"one\nwith trailing spaces   \n\tand a tab\n";
        fs::write(root.join("a.txt"), edited).unwrap();
        fs::write(root.join("b.txt"), "two changed\n").unwrap();

        let dirty = repo.dirty_tracked_files().await.unwrap();
        assert_eq!(dirty.len(), 2);

        repo.stash_push(&["a.txt".to_string()], "test").await.unwrap();
        assert_eq!(fs::read(root.join("a.txt")).unwrap(), b"one\n");
        assert_eq!(fs::read_to_string(root.join("b.txt")).unwrap(), "two changed\n");

        repo.stash_pop().await.unwrap();
        assert_eq!(fs::read(root.join("a.txt")).unwrap(), edited);
    }

    #[tokio::test]
    async fn test_conflicting_merge_reports_files_and_aborts_cleanly() {
        if !git_available() {
            return;
        }
        let dir = init_repo();
        let root = dir.path();

        git(root, &["checkout", "-q", "-b", "feature"]);
        fs::write(root.join("a.txt"), "feature\n").unwrap();
        git(root, &["commit", "-q", "-am", "feature"]);
        git(root, &["checkout", "-q", "main"]);
        fs::write(root.join("a.txt"), "main\n").unwrap();
        git(root, &["commit", "-q", "-am", "main"]);

        let repo = GitRepositoryOps::open(root).await.unwrap();
        let head = repo.head().await.unwrap();

        let attempt = repo.merge_branch("feature", "Merge feature").await.unwrap();
        assert_eq!(
            attempt,
            MergeAttempt::Conflict {
                files: vec!["a.txt".to_string()]
            }
        );

        repo.abort_merge().await.unwrap();
        assert_eq!(repo.head().await.unwrap(), head);
        assert!(repo.dirty_tracked_files().await.unwrap().is_empty());
        assert_eq!(fs::read_to_string(root.join("a.txt")).unwrap(), "main\n");
    }

    #[tokio::test]
    async fn test_clean_merge_creates_merge_commit() {
        if !git_available() {
            return;
        }
        let dir = init_repo();
        let root = dir.path();

        git(root, &["checkout", "-q", "-b", "feature"]);
        fs::write(root.join("c.txt"), "three\n").unwrap();
        git(root, &["add", "c.txt"]);
        git(root, &["commit", "-q", "-m", "add c"]);
        git(root, &["checkout", "-q", "main"]);

        let repo = GitRepositoryOps::open(root).await.unwrap();
        assert_eq!(repo.current_branch().await.unwrap(), "main");

        let attempt = repo.merge_branch("feature", "Merge feature").await.unwrap();
        assert_eq!(attempt, MergeAttempt::Merged);
        assert!(root.join("c.txt").exists());
    }

    #[tokio::test]
    async fn test_merge_over_stashed_edit_to_same_file_is_undone() {
        if !git_available() {
            return;
        }
        let dir = init_repo();
        let root = dir.path();

        git(root, &["checkout", "-q", "-b", "wavesmith/A"]);
        fs::write(root.join("a.txt"), "feature\n").unwrap();
        git(root, &["commit", "-q", "-am", "fix A"]);
        git(root, &["checkout", "-q", "-b", "wavesmith/B", "main"]);
        fs::write(root.join("c.txt"), "three\n").unwrap();
        git(root, &["add", "c.txt"]);
        git(root, &["commit", "-q", "-m", "fix B"]);
        git(root, &["checkout", "-q", "main"]);
        fs::write(root.join("a.txt"), "local edit\n").unwrap();

        let repo = Arc::new(GitRepositoryOps::open(root).await.unwrap());
        let head = repo.head().await.unwrap();
        let coordinator = MergeCoordinator::new(repo.clone(), StashExclusions::new(root));
        let (_tx, rx) = watch::channel(false);
        let handle = |id: &str| WorkspaceHandle {
            item_id: id.to_string(),
            branch: format!("wavesmith/{id}"),
            path: root.join(id),
        };

        let outcome = coordinator.merge(&handle("A"), "Merge A", &rx).await.unwrap();
        assert_eq!(
            outcome,
            MergeOutcome::Conflict {
                files: vec!["a.txt".to_string()]
            }
        );
        assert_eq!(repo.head().await.unwrap(), head);
        assert_eq!(fs::read_to_string(root.join("a.txt")).unwrap(), "local edit\n");
        assert_eq!(git(root, &["stash", "list"]), "");

        let outcome = coordinator.merge(&handle("B"), "Merge B", &rx).await.unwrap();
        assert_eq!(outcome, MergeOutcome::Merged);
        assert!(root.join("c.txt").exists());
        assert_eq!(fs::read_to_string(root.join("a.txt")).unwrap(), "local edit\n");
        assert_eq!(
            repo.dirty_tracked_files().await.unwrap(),
            vec![DirtyFile::new("a.txt", ChangeKind::Modified)]
        );
    }

    #[tokio::test]
    async fn test_open_outside_repository_fails() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let err = GitRepositoryOps::open(dir.path()).await.err().unwrap();
        assert!(matches!(err, VcsError::NotARepository(_)));
    }
}
