use std::path::{Path, PathBuf};
use std::process::Output;

use tokio::process::Command;
use tracing::{debug, warn};

use wavesmith_core::api::VcsError;

/// Thin wrapper over the `git` binary bound to one working directory.
#[derive(Debug, Clone)]
pub struct GitRunner {
    working_dir: PathBuf,
}

impl GitRunner {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    pub fn with_dir(&self, dir: &Path) -> Self {
        Self::new(dir)
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Run git and return its output whatever the exit status.
    pub async fn run(&self, args: &[&str]) -> Result<Output, VcsError> {
        debug!(args = ?args, dir = %self.working_dir.display(), "Running git command");

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.working_dir)
            // Stable, parseable messages.
            .env("LC_ALL", "C")
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await
            .map_err(|source| VcsError::Spawn {
                args: args.join(" "),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(args = ?args, stderr = %stderr.trim(), "Git command failed");
        }

        Ok(output)
    }

    pub async fn run_checked(&self, args: &[&str]) -> Result<Output, VcsError> {
        let output = self.run(args).await?;

        if !output.status.success() {
            return Err(VcsError::CommandFailed {
                args: args.join(" "),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output)
    }

    /// Trimmed stdout of a command that must succeed.
    pub async fn stdout(&self, args: &[&str]) -> Result<String, VcsError> {
        let output = self.run_checked(args).await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    pub async fn branch_exists(&self, branch: &str) -> Result<bool, VcsError> {
        let output = self
            .run(&["rev-parse", "--verify", "--quiet", &format!("refs/heads/{branch}")])
            .await?;
        Ok(output.status.success())
    }

    pub async fn delete_branch(&self, branch: &str) -> Result<bool, VcsError> {
        let output = self.run(&["branch", "-D", branch]).await?;
        Ok(output.status.success())
    }

    pub async fn current_branch(&self) -> Result<String, VcsError> {
        self.stdout(&["rev-parse", "--abbrev-ref", "HEAD"]).await
    }
}
