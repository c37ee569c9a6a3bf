use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;

/// One invocation of the external fixer for one item.
#[derive(Debug, Clone)]
pub struct FixRequest {
    pub item_id: String,
    pub workspace: PathBuf,
    pub title: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FixOutcome {
    pub exit_code: i32,
    pub stdout_tail: String,
    pub stderr_tail: String,
    pub duration_ms: u64,
}

impl FixOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Opaque external action that changes files inside a workspace.
///
/// Dropping the returned future must stop the underlying work; the
/// orchestrator relies on this for timeouts and interrupts.
#[async_trait]
pub trait Fixer: Send + Sync {
    fn name(&self) -> &str;

    async fn fix(&self, request: &FixRequest) -> anyhow::Result<FixOutcome>;
}
