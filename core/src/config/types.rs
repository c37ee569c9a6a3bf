use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::executor::types::OrchestratorConfig;
use crate::graph::OrphanPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub workspace: WorkspaceConfig,

    #[serde(default)]
    pub merge: MergeConfig,

    #[serde(default)]
    pub fixer: FixerConfig,

    #[serde(default)]
    pub state: StateConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    /// Single source of the orchestrator's runtime knobs.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_workers: self.scheduler.max_workers.max(1),
            worker_timeout: Duration::from_secs(self.scheduler.worker_timeout_secs),
            keep_failed_workspaces: self.workspace.keep_failed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "wavesmith_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    #[serde(default = "default_worker_timeout_secs")]
    pub worker_timeout_secs: u64,

    /// What to do with `blocked_by` ids that match nothing.
    #[serde(default)]
    pub orphan_policy: OrphanPolicy,

    #[serde(default = "default_progress_bar")]
    pub progress_bar: bool,
}

fn default_max_workers() -> usize {
    3
}

fn default_worker_timeout_secs() -> u64 {
    1800
}

fn default_progress_bar() -> bool {
    true
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            worker_timeout_secs: default_worker_timeout_secs(),
            orphan_policy: OrphanPolicy::default(),
            progress_bar: default_progress_bar(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Isolated checkouts live under this directory, relative to the repo.
    #[serde(default = "default_workspace_root")]
    pub root: PathBuf,

    #[serde(default = "default_branch_prefix")]
    pub branch_prefix: String,

    /// Leave the workspace of a failed item on disk for inspection.
    #[serde(default)]
    pub keep_failed: bool,
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from(".wavesmith/worktrees")
}

fn default_branch_prefix() -> String {
    "wavesmith".to_string()
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
            branch_prefix: default_branch_prefix(),
            keep_failed: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Branch merged into; the shared repository's current branch when unset.
    #[serde(default)]
    pub target_branch: Option<String>,

    #[serde(default = "default_archive_dir")]
    pub archive_dir: PathBuf,

    /// Files owned by other tools that must never be stashed.
    #[serde(default = "default_external_state_files")]
    pub external_state_files: Vec<PathBuf>,

    #[serde(default)]
    pub extra_exclusions: Vec<PathBuf>,
}

fn default_archive_dir() -> PathBuf {
    PathBuf::from(".issues/completed")
}

fn default_external_state_files() -> Vec<PathBuf> {
    vec![PathBuf::from(".claude/ll-state.json")]
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            target_branch: None,
            archive_dir: default_archive_dir(),
            external_state_files: default_external_state_files(),
            extra_exclusions: Vec::new(),
        }
    }
}

/// External program invoked once per item.
///
/// `{workspace}` and `{item_id}` in `args` are substituted per invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixerConfig {
    #[serde(default = "default_fixer_command")]
    pub command: String,

    #[serde(default = "default_fixer_args")]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_fixer_command() -> String {
    "claude".to_string()
}

fn default_fixer_args() -> Vec<String> {
    vec![
        "--print".to_string(),
        "Fix issue {item_id} in this repository.".to_string(),
    ]
}

impl Default for FixerConfig {
    fn default() -> Self {
        Self {
            command: default_fixer_command(),
            args: default_fixer_args(),
            env: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
}

fn default_state_path() -> PathBuf {
    PathBuf::from(".wavesmith/state.json")
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Jsonl,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    #[serde(default)]
    pub pretty_print: bool,
}
