use thiserror::Error;

use super::error::ExitCode;
use super::state::StateError;
use super::vcs::VcsError;

/// Errors raised while building the dependency graph or deriving waves.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("duplicate work item id: {0}")]
    DuplicateItemId(String),

    #[error("circular dependency detected: {}", format_cycles(.cycles))]
    CircularDependency { cycles: Vec<Vec<String>> },

    #[error(
        "{} item(s) could not be scheduled: {}",
        .remaining.len(),
        .remaining.join(", ")
    )]
    Unschedulable { remaining: Vec<String> },
}

impl GraphError {
    /// Every id that takes part in a reported cycle, sorted and deduplicated.
    pub fn cycle_members(&self) -> Vec<String> {
        let Self::CircularDependency { cycles } = self else {
            return Vec::new();
        };
        let mut members: Vec<String> = cycles.iter().flatten().cloned().collect();
        members.sort();
        members.dedup();
        members
    }
}

fn format_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|cycle| cycle.join(" -> "))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Run-level errors raised by the orchestrator.
///
/// Per-item failures (fixer exit codes, timeouts, merge conflicts) are not
/// errors at this level; they are recorded as item statuses.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("execution state error: {0}")]
    State(#[from] StateError),

    #[error("shared repository error: {0}")]
    Vcs(#[from] VcsError),

    #[error("worker pool error: {0}")]
    Runner(String),
}

impl ExecutorError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Graph(GraphError::CircularDependency { .. }) => ExitCode::CircularDependency,
            Self::Graph(_) => ExitCode::ConfigError,
            Self::State(_) => ExitCode::StateError,
            Self::Vcs(_) => ExitCode::IoError,
            Self::Runner(_) => ExitCode::Internal,
        }
    }
}
