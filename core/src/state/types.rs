//! Item status values persisted in the execution-state file.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one work item within one attempt.
///
/// `pending → running → {completed, failed, timeout, interrupted}`, or
/// `pending → skipped` when a blocker did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
    Timeout,
    Interrupted,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Timeout => "timeout",
            Self::Interrupted => "interrupted",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    /// Terminal without success; dependents of such an item are skipped.
    pub fn is_unsuccessful(self) -> bool {
        self.is_terminal() && self != Self::Completed
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-status totals, used for summaries and the `run.end` event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub timeout: usize,
    pub interrupted: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: ItemStatus) {
        match status {
            ItemStatus::Pending => self.pending += 1,
            ItemStatus::Running => self.running += 1,
            ItemStatus::Completed => self.completed += 1,
            ItemStatus::Failed => self.failed += 1,
            ItemStatus::Skipped => self.skipped += 1,
            ItemStatus::Timeout => self.timeout += 1,
            ItemStatus::Interrupted => self.interrupted += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending
            + self.running
            + self.completed
            + self.failed
            + self.skipped
            + self.timeout
            + self.interrupted
    }

    pub fn unsuccessful(&self) -> usize {
        self.failed + self.skipped + self.timeout + self.interrupted
    }
}

impl FromIterator<ItemStatus> for StatusCounts {
    fn from_iter<I: IntoIterator<Item = ItemStatus>>(iter: I) -> Self {
        let mut counts = Self::default();
        for status in iter {
            counts.add(status);
        }
        counts
    }
}
