//! `run` and `resume`: plan, wire plugins, execute, and map the summary to an exit code.
use std::sync::Arc;

use tokio::sync::watch;

use wavesmith_core::api::{
    AppConfig, AppContext, CliError, ExecutionState, ExecutorError, Orchestrator, RunSummary,
};
use wavesmith_plugins::git::GitRepositoryOps;
use wavesmith_plugins::services::PluginServicesFactory;

use super::cli::RunArgs;
use super::plan::{build_plan, repo_dir};

/// Command-line overrides on top of the loaded configuration.
pub fn apply_overrides(mut cfg: AppConfig, args: &RunArgs) -> AppConfig {
    if let Some(n) = args.max_workers {
        cfg.scheduler.max_workers = n;
    }
    if let Some(secs) = args.timeout {
        cfg.scheduler.worker_timeout_secs = secs;
    }
    if args.no_progress {
        cfg.scheduler.progress_bar = false;
    }
    cfg
}

#[tracing::instrument(name = "cli.run", skip(args, cfg))]
pub async fn run_cmd(args: RunArgs, cfg: AppConfig, resume: bool) -> Result<i32, CliError> {
    let cfg = apply_overrides(cfg, &args);
    let dir = repo_dir(args.repo.as_deref())?;

    let repo = GitRepositoryOps::open(&dir)
        .await
        .map_err(ExecutorError::from)?;
    check_target_branch(&cfg, &repo).await?;

    let factory = PluginServicesFactory::new(!atty::is(atty::Stream::Stdout));
    let ctx = AppContext::new(cfg, repo.root(), Some(Arc::new(factory)));
    let store = ctx.state_store();

    let mut state = if resume {
        store.resume()?
    } else {
        ExecutionState::new()
    };

    let plan = build_plan(ctx.cfg(), ctx.repo_root(), &args.items, &state.completed_ids())?;

    let services = ctx.build_services().await?;
    let orchestrator = Orchestrator::builder(ctx.cfg().orchestrator_config())
        .services(&services)
        .state_store(store)
        .progress_bar(ctx.cfg().scheduler.progress_bar && atty::is(atty::Stream::Stderr))
        .build()?;

    let (tx, rx) = watch::channel(false);
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight work");
            let _ = tx.send(true);
            // Keep the sender alive until the run completes.
            std::future::pending::<()>().await;
        }
    });

    let summary = orchestrator.run(&plan, &mut state, rx).await;
    signal_task.abort();
    let summary = summary?;

    report(&summary);
    Ok(summary.exit_code().as_i32())
}

/// Refuse to merge into anything but the configured branch.
async fn check_target_branch(cfg: &AppConfig, repo: &GitRepositoryOps) -> Result<(), CliError> {
    let Some(target) = cfg.merge.target_branch.as_deref() else {
        return Ok(());
    };
    let current = repo.current_branch().await.map_err(ExecutorError::from)?;
    if current != target {
        return Err(CliError::Config(format!(
            "shared repository is on '{current}', expected target branch '{target}'"
        )));
    }
    Ok(())
}

fn report(summary: &RunSummary) {
    let c = &summary.counts;
    tracing::info!(
        run_id = %summary.run_id,
        attempt = summary.attempt,
        completed = c.completed,
        failed = c.failed,
        timeout = c.timeout,
        skipped = c.skipped,
        interrupted = c.interrupted,
        pending = c.pending,
        "Run summary"
    );
    if summary.interrupted {
        eprintln!("Interrupted; continue with `wavesmith resume`.");
    }
}
