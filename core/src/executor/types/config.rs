use std::time::Duration;

/// Runtime knobs for the orchestrator, derived from `AppConfig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Upper bound on concurrent workers within one wave.
    pub max_workers: usize,

    /// Time budget for one fixer invocation.
    pub worker_timeout: Duration,

    /// Leave workspaces of unsuccessful items on disk.
    pub keep_failed_workspaces: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_workers: 3,
            worker_timeout: Duration::from_secs(1800),
            keep_failed_workspaces: false,
        }
    }
}

impl OrchestratorConfig {
    /// Workers actually spawned for a wave of `wave_size` items.
    pub fn workers_for(&self, wave_size: usize) -> usize {
        self.max_workers.min(wave_size).max(1)
    }
}
