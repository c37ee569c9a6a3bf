use crate::contention::ContentionNote;
use crate::executor::ExecutionPlan;
use crate::executor::types::{ItemOutcome, RunSummary};
use crate::state::StatusCounts;

/// Output renderer plugin (controls the output format).
pub trait OutputRendererPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn format(&self) -> &str;
    fn render(&self, event: &RenderEvent);
}

/// Progress events emitted while planning and running.
#[derive(Debug, Clone)]
pub enum RenderEvent {
    RunStart {
        run_id: String,
        attempt: u32,
        total_items: usize,
        total_waves: usize,
    },
    Plan {
        run_id: String,
        plan: ExecutionPlan,
    },
    WaveStart {
        run_id: String,
        wave_index: usize,
        total_waves: usize,
        item_ids: Vec<String>,
        note: Option<ContentionNote>,
    },
    ItemStart {
        run_id: String,
        item_id: String,
        wave_index: usize,
    },
    ItemEnd {
        run_id: String,
        outcome: ItemOutcome,
    },
    WaveEnd {
        run_id: String,
        wave_index: usize,
        counts: StatusCounts,
    },
    RunEnd {
        run_id: String,
        summary: RunSummary,
    },
}

impl RenderEvent {
    /// Stable event name used by line-oriented renderers.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStart { .. } => "run.start",
            Self::Plan { .. } => "plan",
            Self::WaveStart { .. } => "wave.start",
            Self::ItemStart { .. } => "item.start",
            Self::ItemEnd { .. } => "item.end",
            Self::WaveEnd { .. } => "wave.end",
            Self::RunEnd { .. } => "run.end",
        }
    }

    pub fn run_id(&self) -> &str {
        match self {
            Self::RunStart { run_id, .. }
            | Self::Plan { run_id, .. }
            | Self::WaveStart { run_id, .. }
            | Self::ItemStart { run_id, .. }
            | Self::ItemEnd { run_id, .. }
            | Self::WaveEnd { run_id, .. }
            | Self::RunEnd { run_id, .. } => run_id,
        }
    }
}
