use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::watch;
use uuid::Uuid;

use crate::context::Services;
use crate::error::ExecutorError;
use crate::graph::WorkItem;
use crate::merge::{MergeCoordinator, MergeOutcome};
use crate::state::{ExecutionState, ItemStatus, StateStore, StatusCounts};

use super::plan::ExecutionPlan;
use super::progress::ProgressMonitor;
use super::scheduler::execute_wave_parallel;
use super::traits::{
    FixRequest, Fixer, OutputRendererPlugin, RenderEvent, WorkspaceHandle, WorkspaceProvider,
};
use super::types::{ItemOutcome, OrchestratorConfig, RunSummary};

/// Runs an [`ExecutionPlan`] wave by wave.
///
/// Each wave is a barrier: every worker reaches a terminal status before the
/// next wave starts. Within a wave up to `max_workers` items run at once,
/// each in its own workspace; finished workspaces are merged one at a time
/// through the [`MergeCoordinator`].
pub struct Orchestrator {
    config: OrchestratorConfig,
    fixer: Arc<dyn Fixer>,
    workspaces: Arc<dyn WorkspaceProvider>,
    merger: Arc<MergeCoordinator>,
    store: StateStore,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    progress_bar: bool,
}

pub struct OrchestratorBuilder {
    config: OrchestratorConfig,
    fixer: Option<Arc<dyn Fixer>>,
    workspaces: Option<Arc<dyn WorkspaceProvider>>,
    merger: Option<Arc<MergeCoordinator>>,
    store: Option<StateStore>,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    progress_bar: bool,
}

impl Orchestrator {
    pub fn builder(config: OrchestratorConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config)
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Execute `plan`, recording progress in `state`.
    ///
    /// State is persisted after every wave and immediately when `interrupt`
    /// flips to `true`. Per-item failures never abort the run; only state
    /// persistence errors do.
    #[tracing::instrument(skip_all, fields(attempt = state.attempt, waves = plan.waves.len()))]
    pub async fn run(
        &self,
        plan: &ExecutionPlan,
        state: &mut ExecutionState,
        interrupt: watch::Receiver<bool>,
    ) -> Result<RunSummary, ExecutorError> {
        let started = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        let total_waves = plan.waves.len();
        let mut outcomes: Vec<ItemOutcome> = Vec::new();
        let mut waves_run = 0;
        let mut interrupted = false;

        for id in plan.item_ids() {
            state.register(id);
        }

        let progress = Arc::new(Mutex::new(ProgressMonitor::new(
            plan.total_items(),
            self.progress_bar,
        )));

        self.render(RenderEvent::RunStart {
            run_id: run_id.clone(),
            attempt: state.attempt,
            total_items: plan.total_items(),
            total_waves,
        });
        self.render(RenderEvent::Plan {
            run_id: run_id.clone(),
            plan: plan.clone(),
        });

        for blocked in &plan.blocked {
            if state.status(&blocked.item_id) != Some(ItemStatus::Pending) {
                continue;
            }
            state.set_status_with_reason(&blocked.item_id, ItemStatus::Skipped, &blocked.reason)?;
            tracing::warn!(item_id = %blocked.item_id, reason = %blocked.reason, "Item can never run");
            let outcome =
                ItemOutcome::new(&blocked.item_id, ItemStatus::Skipped).with_reason(&blocked.reason);
            self.finish_item(&run_id, &progress, &outcome);
            outcomes.push(outcome);
        }

        let first_wave = state.wave_index.min(total_waves);
        for refined in &plan.waves[first_wave..] {
            if *interrupt.borrow() {
                interrupted = true;
                break;
            }

            let wave_index = refined.wave.index;
            tracing::info!(
                wave = wave_index,
                parent_wave = refined.parent_index,
                items = refined.wave.len(),
                "Starting wave"
            );
            self.render(RenderEvent::WaveStart {
                run_id: run_id.clone(),
                wave_index,
                total_waves,
                item_ids: refined.wave.ids(),
                note: refined.note.clone(),
            });
            if let Ok(monitor) = progress.lock() {
                monitor.update_wave(wave_index, total_waves);
            }

            let mut runnable: Vec<WorkItem> = Vec::new();
            for item in refined.items() {
                match state.status(&item.id) {
                    Some(ItemStatus::Pending) | None => {}
                    Some(status) => {
                        tracing::debug!(item_id = %item.id, %status, "Already resolved");
                        continue;
                    }
                }

                if let Some((blocker, status)) = unmet_blocker(plan, state, &item.id) {
                    let reason = format!("blocked by {blocker} ({status})");
                    tracing::info!(item_id = %item.id, %blocker, %status, "Skipping item");
                    state.set_status_with_reason(&item.id, ItemStatus::Skipped, &reason)?;
                    let outcome = ItemOutcome::new(&item.id, ItemStatus::Skipped)
                        .in_wave(wave_index)
                        .with_reason(reason);
                    self.finish_item(&run_id, &progress, &outcome);
                    outcomes.push(outcome);
                    continue;
                }

                runnable.push(item.clone());
            }

            let worker = Worker {
                run_id: run_id.clone(),
                wave_index,
                config: self.config.clone(),
                fixer: self.fixer.clone(),
                workspaces: self.workspaces.clone(),
                merger: self.merger.clone(),
                renderer: self.renderer.clone(),
                progress: progress.clone(),
                interrupt: interrupt.clone(),
            };
            let workers = self.config.workers_for(runnable.len());
            let wave_outcomes = execute_wave_parallel(runnable, workers, move |item| {
                let worker = worker.clone();
                async move { worker.run(item).await }
            })
            .await?;

            for outcome in wave_outcomes {
                if outcome.started {
                    state.set_status(&outcome.item_id, ItemStatus::Running)?;
                    match &outcome.reason {
                        Some(reason) => {
                            state.set_status_with_reason(&outcome.item_id, outcome.status, reason)?
                        }
                        None => state.set_status(&outcome.item_id, outcome.status)?,
                    }
                }
                outcomes.push(outcome);
            }
            waves_run += 1;

            let counts: StatusCounts = refined
                .items()
                .iter()
                .filter_map(|item| state.status(&item.id))
                .collect();

            if *interrupt.borrow() {
                interrupted = true;
                tracing::warn!(wave = wave_index, "Interrupted, persisting state");
                break;
            }

            state.wave_index = wave_index + 1;
            self.store.save(state)?;
            self.render(RenderEvent::WaveEnd {
                run_id: run_id.clone(),
                wave_index,
                counts,
            });
        }

        self.store.save(state)?;

        let counts: StatusCounts = plan
            .item_ids()
            .filter_map(|id| state.status(id))
            .collect();
        let summary = RunSummary {
            run_id: run_id.clone(),
            attempt: state.attempt,
            total_items: plan.total_items(),
            waves_total: total_waves,
            waves_run,
            counts,
            interrupted,
            duration_ms: started.elapsed().as_millis() as u64,
            outcomes,
        };

        if let Ok(monitor) = progress.lock() {
            monitor.finish(summary.is_success());
        }
        tracing::info!(
            completed = summary.counts.completed,
            unsuccessful = summary.counts.unsuccessful(),
            interrupted,
            "Run finished"
        );
        self.render(RenderEvent::RunEnd {
            run_id,
            summary: summary.clone(),
        });

        Ok(summary)
    }

    fn render(&self, event: RenderEvent) {
        render_event(&self.renderer, event);
    }

    fn finish_item(&self, run_id: &str, progress: &Mutex<ProgressMonitor>, outcome: &ItemOutcome) {
        if let Ok(mut monitor) = progress.lock() {
            monitor.finish_item(&outcome.item_id, outcome.status, outcome.duration_ms);
        }
        self.render(RenderEvent::ItemEnd {
            run_id: run_id.to_string(),
            outcome: outcome.clone(),
        });
    }
}

impl OrchestratorBuilder {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            config,
            fixer: None,
            workspaces: None,
            merger: None,
            store: None,
            renderer: None,
            progress_bar: false,
        }
    }

    /// Take fixer, workspace provider, renderer and merge coordinator from
    /// a built [`Services`] bundle.
    pub fn services(self, services: &Services) -> Self {
        let builder = self
            .fixer(services.fixer.clone())
            .workspaces(services.workspaces.clone())
            .merge_coordinator(services.merger.clone());
        match &services.renderer {
            Some(renderer) => builder.renderer(renderer.clone()),
            None => builder,
        }
    }

    pub fn fixer(mut self, fixer: Arc<dyn Fixer>) -> Self {
        self.fixer = Some(fixer);
        self
    }

    pub fn workspaces(mut self, workspaces: Arc<dyn WorkspaceProvider>) -> Self {
        self.workspaces = Some(workspaces);
        self
    }

    pub fn merge_coordinator(mut self, merger: Arc<MergeCoordinator>) -> Self {
        self.merger = Some(merger);
        self
    }

    pub fn state_store(mut self, store: StateStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn OutputRendererPlugin>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn progress_bar(mut self, enabled: bool) -> Self {
        self.progress_bar = enabled;
        self
    }

    pub fn build(self) -> Result<Orchestrator, ExecutorError> {
        let missing = |what: &str| ExecutorError::Runner(format!("orchestrator needs a {what}"));
        Ok(Orchestrator {
            fixer: self.fixer.ok_or_else(|| missing("fixer"))?,
            workspaces: self.workspaces.ok_or_else(|| missing("workspace provider"))?,
            merger: self.merger.ok_or_else(|| missing("merge coordinator"))?,
            store: self.store.ok_or_else(|| missing("state store"))?,
            config: self.config,
            renderer: self.renderer,
            progress_bar: self.progress_bar,
        })
    }
}

/// First blocker of `item_id` that ended without completing.
fn unmet_blocker(
    plan: &ExecutionPlan,
    state: &ExecutionState,
    item_id: &str,
) -> Option<(String, ItemStatus)> {
    plan.blockers_of(item_id).iter().find_map(|blocker| {
        state
            .status(blocker)
            .filter(|status| status.is_unsuccessful())
            .map(|status| (blocker.clone(), status))
    })
}

fn render_event(renderer: &Option<Arc<dyn OutputRendererPlugin>>, event: RenderEvent) {
    match renderer {
        Some(renderer) => renderer.render(&event),
        None => tracing::debug!(event = event.event_type(), "render"),
    }
}

/// Resolves once `rx` reads `true`; never resolves if the sender is gone.
async fn wait_for_interrupt(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Everything one worker needs, cloned per item.
#[derive(Clone)]
struct Worker {
    run_id: String,
    wave_index: usize,
    config: OrchestratorConfig,
    fixer: Arc<dyn Fixer>,
    workspaces: Arc<dyn WorkspaceProvider>,
    merger: Arc<MergeCoordinator>,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    progress: Arc<Mutex<ProgressMonitor>>,
    interrupt: watch::Receiver<bool>,
}

impl Worker {
    async fn run(self, item: WorkItem) -> ItemOutcome {
        if *self.interrupt.borrow() {
            return ItemOutcome::not_started(&item.id, self.wave_index);
        }

        let started = Instant::now();
        render_event(
            &self.renderer,
            RenderEvent::ItemStart {
                run_id: self.run_id.clone(),
                item_id: item.id.clone(),
                wave_index: self.wave_index,
            },
        );
        if let Ok(mut monitor) = self.progress.lock() {
            monitor.start_item(&item.id);
        }

        let mut outcome = self.execute(&item).await.in_wave(self.wave_index);
        outcome.duration_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            item_id = %item.id,
            wave = self.wave_index,
            status = %outcome.status,
            duration_ms = outcome.duration_ms,
            reason = outcome.reason.as_deref().unwrap_or(""),
            "Item finished"
        );
        if let Ok(mut monitor) = self.progress.lock() {
            monitor.finish_item(&item.id, outcome.status, outcome.duration_ms);
        }
        render_event(
            &self.renderer,
            RenderEvent::ItemEnd {
                run_id: self.run_id.clone(),
                outcome: outcome.clone(),
            },
        );
        outcome
    }

    async fn execute(&self, item: &WorkItem) -> ItemOutcome {
        let handle = match self.workspaces.create(&item.id).await {
            Ok(handle) => handle,
            Err(err) => {
                return ItemOutcome::new(&item.id, ItemStatus::Failed)
                    .with_reason(format!("workspace creation failed: {err:#}"))
            }
        };
        tracing::debug!(item_id = %item.id, path = %handle.path.display(), "Workspace ready");

        let outcome = self.fix_and_merge(item, &handle).await;

        if outcome.status != ItemStatus::Completed && self.config.keep_failed_workspaces {
            tracing::info!(
                item_id = %item.id,
                path = %handle.path.display(),
                "Keeping workspace of unsuccessful item"
            );
        } else if let Err(err) = self.workspaces.remove(&handle).await {
            tracing::warn!(item_id = %item.id, error = %err, "Workspace cleanup failed");
        }

        outcome
    }

    async fn fix_and_merge(&self, item: &WorkItem, handle: &WorkspaceHandle) -> ItemOutcome {
        let request = FixRequest {
            item_id: item.id.clone(),
            workspace: handle.path.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
        };

        let mut interrupt = self.interrupt.clone();
        let fixed = tokio::select! {
            res = tokio::time::timeout(self.config.worker_timeout, self.fixer.fix(&request)) => res,
            _ = wait_for_interrupt(&mut interrupt) => {
                return ItemOutcome::new(&item.id, ItemStatus::Interrupted)
                    .with_reason("interrupted while the fixer was running");
            }
        };

        let fix = match fixed {
            Err(_) => {
                return ItemOutcome::new(&item.id, ItemStatus::Timeout).with_reason(format!(
                    "exceeded time budget of {}s",
                    self.config.worker_timeout.as_secs()
                ))
            }
            Ok(Err(err)) => {
                return ItemOutcome::new(&item.id, ItemStatus::Failed)
                    .with_reason(format!("fixer error: {err:#}"))
            }
            Ok(Ok(fix)) => fix,
        };

        if !fix.success() {
            let detail = fix.stderr_tail.lines().last().unwrap_or("").trim();
            let reason = if detail.is_empty() {
                format!("fixer exited with code {}", fix.exit_code)
            } else {
                format!("fixer exited with code {}: {detail}", fix.exit_code)
            };
            return ItemOutcome::new(&item.id, ItemStatus::Failed)
                .with_exit_code(fix.exit_code)
                .with_reason(reason);
        }

        let done = |status: ItemStatus| ItemOutcome::new(&item.id, status).with_exit_code(0);

        let message = format!("{}: automated fix", item.display_name());
        match self.workspaces.commit(handle, &message).await {
            Ok(true) => {}
            Ok(false) => return done(ItemStatus::Completed).with_reason("no changes to merge"),
            Err(err) => {
                return done(ItemStatus::Failed).with_reason(format!("commit failed: {err:#}"))
            }
        }

        let merge_message = format!("Merge {} ({})", handle.branch, item.id);
        match self.merger.merge(handle, &merge_message, &self.interrupt).await {
            Ok(MergeOutcome::Merged) => done(ItemStatus::Completed),
            Ok(MergeOutcome::Conflict { files }) => done(ItemStatus::Failed)
                .with_reason(format!("merge conflict in {}", files.join(", "))),
            Ok(MergeOutcome::Interrupted) => {
                done(ItemStatus::Interrupted).with_reason("interrupted before merge")
            }
            Err(err) => done(ItemStatus::Failed).with_reason(format!("merge failed: {err:#}")),
        }
    }
}
