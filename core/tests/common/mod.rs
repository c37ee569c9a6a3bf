#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::watch;

use wavesmith_core::api::{
    ChangeKind, DependencyGraph, DirtyFile, ExecutionPlan, ExecutionState, FixOutcome, FixRequest,
    Fixer, MergeAttempt, MergeCoordinator, Orchestrator, OrchestratorConfig, OrphanPolicy,
    OutputRendererPlugin, Priority, RenderEvent, RepositoryOps, RunSummary, StashExclusions,
    StateStore, WorkItem, WorkspaceHandle, WorkspaceProvider,
};

/// Route `tracing` output through the test harness; `RUST_LOG` filters it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn item(id: &str, blocked_by: &[&str]) -> WorkItem {
    WorkItem::new(id, Priority::new(2)).with_blocked_by(blocked_by.iter().copied())
}

pub fn branch_of(id: &str) -> String {
    format!("wavesmith/{id}")
}

#[derive(Debug, Clone, Default)]
pub struct FixBehavior {
    pub exit_code: i32,
    pub delay: Duration,
}

impl FixBehavior {
    pub fn exit(code: i32) -> Self {
        Self {
            exit_code: code,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }
}

/// Fixer whose result per item is scripted; unscripted items succeed at once.
#[derive(Default)]
pub struct FakeFixer {
    behaviors: Mutex<HashMap<String, FixBehavior>>,
    calls: Mutex<Vec<String>>,
}

impl FakeFixer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, item_id: &str, behavior: FixBehavior) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(item_id.to_string(), behavior);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fixer for FakeFixer {
    fn name(&self) -> &str {
        "fake"
    }

    async fn fix(&self, request: &FixRequest) -> anyhow::Result<FixOutcome> {
        self.calls.lock().unwrap().push(request.item_id.clone());
        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(&request.item_id)
            .cloned()
            .unwrap_or_default();

        tokio::time::sleep(behavior.delay).await;
        Ok(FixOutcome {
            exit_code: behavior.exit_code,
            stdout_tail: String::new(),
            stderr_tail: if behavior.exit_code == 0 {
                String::new()
            } else {
                "compile error\n".to_string()
            },
            duration_ms: behavior.delay.as_millis() as u64,
        })
    }
}

#[derive(Default)]
pub struct FakeWorkspaces {
    pub created: Mutex<Vec<String>>,
    pub removed: Mutex<Vec<String>>,
    pub unchanged: Mutex<HashSet<String>>,
}

impl FakeWorkspaces {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkspaceProvider for FakeWorkspaces {
    async fn create(&self, item_id: &str) -> anyhow::Result<WorkspaceHandle> {
        self.created.lock().unwrap().push(item_id.to_string());
        Ok(WorkspaceHandle {
            item_id: item_id.to_string(),
            branch: branch_of(item_id),
            path: PathBuf::from("/tmp/wavesmith-fake").join(item_id),
        })
    }

    async fn commit(&self, handle: &WorkspaceHandle, _message: &str) -> anyhow::Result<bool> {
        Ok(!self.unchanged.lock().unwrap().contains(&handle.item_id))
    }

    async fn remove(&self, handle: &WorkspaceHandle) -> anyhow::Result<()> {
        self.removed.lock().unwrap().push(handle.item_id.clone());
        Ok(())
    }
}

/// Shared repository double that logs every operation and tracks how many
/// merges overlap.
#[derive(Default)]
pub struct FakeRepo {
    pub log: Mutex<Vec<String>>,
    pub merged: Mutex<Vec<String>>,
    pub conflicts: Mutex<HashSet<String>>,
    pub dirty: Mutex<Vec<DirtyFile>>,
    pub merge_delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    pop_failures: AtomicUsize,
}

impl FakeRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            merge_delay: Duration::from_millis(10),
            ..Self::default()
        })
    }

    pub fn conflict_on(&self, item_id: &str) {
        self.conflicts.lock().unwrap().insert(branch_of(item_id));
    }

    /// The next stash pop fails, as it does when the merge touched a stashed file.
    pub fn clash_on_next_pop(&self) {
        self.pop_failures.fetch_add(1, Ordering::SeqCst);
    }

    pub fn set_dirty(&self, files: Vec<DirtyFile>) {
        *self.dirty.lock().unwrap() = files;
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn merged(&self) -> Vec<String> {
        self.merged.lock().unwrap().clone()
    }

    pub fn peak_concurrent_merges(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn record(&self, entry: impl Into<String>) {
        self.log.lock().unwrap().push(entry.into());
    }
}

#[async_trait]
impl RepositoryOps for FakeRepo {
    async fn dirty_tracked_files(&self) -> anyhow::Result<Vec<DirtyFile>> {
        self.record("status");
        Ok(self.dirty.lock().unwrap().clone())
    }

    async fn stash_push(&self, paths: &[String], _message: &str) -> anyhow::Result<()> {
        self.record(format!("stash_push:{}", paths.join(",")));
        Ok(())
    }

    async fn stash_pop(&self) -> anyhow::Result<()> {
        self.record("stash_pop");
        let clash = self
            .pop_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if clash {
            anyhow::bail!("git stash pop exited with 1");
        }
        Ok(())
    }

    async fn head(&self) -> anyhow::Result<String> {
        Ok("base".to_string())
    }

    async fn merge_branch(&self, branch: &str, _message: &str) -> anyhow::Result<MergeAttempt> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.merge_delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.record(format!("merge:{branch}"));
        if self.conflicts.lock().unwrap().contains(branch) {
            return Ok(MergeAttempt::Conflict {
                files: vec!["src/app.ts".to_string()],
            });
        }
        self.merged.lock().unwrap().push(branch.to_string());
        Ok(MergeAttempt::Merged)
    }

    async fn abort_merge(&self) -> anyhow::Result<()> {
        self.record("abort");
        Ok(())
    }

    async fn reset_hard(&self, rev: &str) -> anyhow::Result<()> {
        self.record(format!("reset:{rev}"));
        Ok(())
    }

    async fn reset_merge(&self, rev: &str) -> anyhow::Result<()> {
        self.record(format!("reset_merge:{rev}"));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingRenderer {
    pub events: Mutex<Vec<String>>,
}

impl RecordingRenderer {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl OutputRendererPlugin for RecordingRenderer {
    fn name(&self) -> &str {
        "recording"
    }

    fn format(&self) -> &str {
        "test"
    }

    fn render(&self, event: &RenderEvent) {
        self.events
            .lock()
            .unwrap()
            .push(event.event_type().to_string());
    }
}

pub fn dirty(path: &str) -> DirtyFile {
    DirtyFile::new(path, ChangeKind::Modified)
}

/// Wires fakes into an orchestrator with a state file in a temp dir.
pub struct Harness {
    pub dir: TempDir,
    pub fixer: Arc<FakeFixer>,
    pub workspaces: Arc<FakeWorkspaces>,
    pub repo: Arc<FakeRepo>,
    pub renderer: Arc<RecordingRenderer>,
    pub config: OrchestratorConfig,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        Self {
            dir: TempDir::new().unwrap(),
            fixer: FakeFixer::new(),
            workspaces: FakeWorkspaces::new(),
            repo: FakeRepo::new(),
            renderer: Arc::new(RecordingRenderer::default()),
            config: OrchestratorConfig {
                max_workers: 3,
                worker_timeout: Duration::from_secs(5),
                keep_failed_workspaces: false,
            },
        }
    }

    pub fn store(&self) -> StateStore {
        StateStore::new(self.dir.path().join(".wavesmith").join("state.json"))
    }

    pub fn orchestrator(&self) -> Orchestrator {
        let exclusions = StashExclusions::new(self.dir.path()).with_state_file(".wavesmith/state.json");
        let merger = Arc::new(MergeCoordinator::new(self.repo.clone(), exclusions));

        Orchestrator::builder(self.config.clone())
            .fixer(self.fixer.clone())
            .workspaces(self.workspaces.clone())
            .merge_coordinator(merger)
            .state_store(self.store())
            .renderer(self.renderer.clone())
            .build()
            .unwrap()
    }

    pub fn plan(&self, items: &[WorkItem], completed: &HashSet<String>) -> ExecutionPlan {
        let graph = DependencyGraph::build(items, &HashSet::new(), OrphanPolicy::Block).unwrap();
        ExecutionPlan::build(&graph, completed).unwrap()
    }

    /// Plan and run `items` from `state` without interrupting.
    pub async fn run(&self, items: &[WorkItem], state: &mut ExecutionState) -> RunSummary {
        let plan = self.plan(items, &state.completed_ids());
        let (_tx, rx) = watch::channel(false);
        self.orchestrator().run(&plan, state, rx).await.unwrap()
    }
}
