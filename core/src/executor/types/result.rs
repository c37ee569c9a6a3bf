use serde::Serialize;

use crate::error::ExitCode;
use crate::state::{ItemStatus, StatusCounts};

/// Result of one worker, or of a skip decision, for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    pub item_id: String,

    /// Refined wave the item belonged to; `None` for items that were never
    /// scheduled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wave_index: Option<usize>,

    pub status: ItemStatus,

    /// False when the worker never got past the interrupt check; the item
    /// then stays `pending`.
    #[serde(skip)]
    pub started: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    pub duration_ms: u64,
}

impl ItemOutcome {
    pub fn new(item_id: impl Into<String>, status: ItemStatus) -> Self {
        Self {
            item_id: item_id.into(),
            wave_index: None,
            status,
            started: true,
            reason: None,
            exit_code: None,
            duration_ms: 0,
        }
    }

    pub fn in_wave(mut self, wave_index: usize) -> Self {
        self.wave_index = Some(wave_index);
        self
    }

    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = Some(exit_code);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn not_started(item_id: impl Into<String>, wave_index: usize) -> Self {
        Self {
            started: false,
            ..Self::new(item_id, ItemStatus::Pending).in_wave(wave_index)
        }
    }
}

/// Final report of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub attempt: u32,
    pub total_items: usize,
    pub waves_total: usize,
    pub waves_run: usize,
    pub counts: StatusCounts,
    pub interrupted: bool,
    pub duration_ms: u64,
    pub outcomes: Vec<ItemOutcome>,
}

impl RunSummary {
    /// Nothing failed, timed out, was skipped or left pending.
    pub fn is_success(&self) -> bool {
        !self.interrupted && self.counts.completed == self.counts.total()
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.interrupted {
            ExitCode::Interrupted
        } else if self.is_success() {
            ExitCode::Success
        } else {
            ExitCode::ItemsFailed
        }
    }
}
