//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `wavesmith_core::api` instead of reaching into internal modules.

pub use crate::config::{
    get_wavesmith_data_dir, load_config, AppConfig, FixerConfig, LoggingConfig, MergeConfig, OutputConfig,
    OutputFormat, SchedulerConfig, StateConfig, WorkspaceConfig,
};
pub use crate::contention::{
    extract_hints, get_overlapping_paths, overlaps_with, refine, ContentionNote, FileHints,
    RefinedWave,
};
pub use crate::context::{AppContext, Services, ServicesFactory};
pub use crate::error::{CliError, ExecutorError, ExitCode, GraphError, StateError, VcsError};
pub use crate::executor::traits::{
    ChangeKind, DirtyFile, FixOutcome, FixRequest, Fixer, MergeAttempt, OutputRendererPlugin,
    RenderEvent, RepositoryOps, WorkspaceHandle, WorkspaceProvider,
};
pub use crate::executor::{
    ExecutionPlan, ItemOutcome, Orchestrator, OrchestratorBuilder, OrchestratorConfig,
    RunSummary,
};
pub use crate::graph::{
    BlockedItem, DependencyGraph, OrphanPolicy, Priority, UnresolvedBlocker, Wave, WorkItem,
};
pub use crate::input::ItemManifest;
pub use crate::merge::{MergeCoordinator, MergeOutcome, StashExclusions};
pub use crate::state::{ExecutionState, ItemStatus, StateStore, StatusCounts};
