//! Wave executor.
//!
//! ```text
//! DependencyGraph + completed ids
//!   ↓
//! ExecutionPlan::build()          (validate → waves → contention refinement)
//!   ↓
//! Orchestrator::run()             (per wave: skip unmet, bounded workers, barrier)
//!   ├─ Worker: workspace → fixer (timeout / interrupt) → commit
//!   ├─ MergeCoordinator::merge()  (one at a time)
//!   └─ StateStore::save()         (after each wave)
//!   ↓
//! RunSummary
//! ```

mod engine;
mod plan;
mod progress;
mod scheduler;
pub mod traits;
pub mod types;

pub use engine::{Orchestrator, OrchestratorBuilder};
pub use plan::ExecutionPlan;
pub use progress::ProgressMonitor;
pub use scheduler::execute_wave_parallel;
pub use types::{ItemOutcome, OrchestratorConfig, RunSummary};
