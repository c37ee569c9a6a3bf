use std::collections::HashSet;
use std::path::{Path, PathBuf};

use wavesmith_core::api::{
    AppConfig, CliError, DependencyGraph, ExecutionPlan, ItemManifest, RenderEvent,
};
use wavesmith_plugins::factory;

use super::cli::PlanArgs;

/// Shared repository directory: `--repo` or the current directory.
pub fn repo_dir(repo: Option<&Path>) -> Result<PathBuf, CliError> {
    match repo {
        Some(dir) => Ok(PathBuf::from(shellexpand::tilde(&dir.to_string_lossy()).as_ref())),
        None => Ok(std::env::current_dir()?),
    }
}

/// Load the manifest and derive the plan from the current graph.
///
/// `also_completed` carries ids finished in an earlier attempt.
pub fn build_plan(
    cfg: &AppConfig,
    repo_root: &Path,
    items: &Path,
    also_completed: &HashSet<String>,
) -> Result<ExecutionPlan, CliError> {
    let manifest = ItemManifest::load(items)?;

    let archive = if cfg.merge.archive_dir.is_absolute() {
        cfg.merge.archive_dir.clone()
    } else {
        repo_root.join(&cfg.merge.archive_dir)
    };
    let mut completed = manifest.completed_ids(Some(&archive))?;
    completed.extend(also_completed.iter().cloned());

    let graph = DependencyGraph::build(&manifest.items, &completed, cfg.scheduler.orphan_policy)?;
    let plan = ExecutionPlan::build(&graph, &completed)?;

    tracing::info!(
        items = manifest.items.len(),
        waves = plan.waves.len(),
        blocked = plan.blocked.len(),
        already_completed = plan.already_completed.len(),
        "Plan ready"
    );
    Ok(plan)
}

pub fn plan_cmd(args: PlanArgs, cfg: &AppConfig) -> Result<i32, CliError> {
    let repo_root = repo_dir(args.repo.as_deref())?;
    let plan = build_plan(cfg, &repo_root, &args.items, &HashSet::new())?;

    let renderer = factory::build_renderer(&cfg.output, !atty::is(atty::Stream::Stdout));
    renderer.render(&RenderEvent::Plan {
        run_id: uuid::Uuid::new_v4().to_string(),
        plan,
    });
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use wavesmith_core::api::ExitCode;

    fn write_manifest(dir: &TempDir, json: &str) -> PathBuf {
        let path = dir.path().join("items.json");
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_build_plan_splits_contended_wave() {
        let dir = TempDir::new().unwrap();
        let items = write_manifest(
            &dir,
            r#"{"items": [
                {"id": "X", "priority": "P1", "description": "edit `src/app.ts`"},
                {"id": "Y", "priority": "P2", "description": "also touches src/app.ts"},
                {"id": "Z", "priority": "P2", "blocked_by": ["X"]}
            ]}"#,
        );

        let plan = build_plan(&AppConfig::default(), dir.path(), &items, &HashSet::new()).unwrap();
        let ids: Vec<Vec<String>> = plan.waves.iter().map(|w| w.wave.ids()).collect();
        assert_eq!(ids, vec![vec!["X"], vec!["Y"], vec!["Z"]]);
        assert!(plan.waves[0].note.is_some());
    }

    #[test]
    fn test_build_plan_honours_archive_and_prior_completion() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join(".issues/completed");
        fs::create_dir_all(&archive).unwrap();
        fs::write(archive.join("A-1-done.md"), "").unwrap();

        let items = write_manifest(
            &dir,
            r#"{"items": [
                {"id": "A-1", "priority": 1},
                {"id": "A-2", "priority": 1, "blocked_by": ["A-1"]},
                {"id": "A-3", "priority": 1}
            ]}"#,
        );
        let prior: HashSet<String> = ["A-3".to_string()].into_iter().collect();

        let plan = build_plan(&AppConfig::default(), dir.path(), &items, &prior).unwrap();
        let planned: Vec<&str> = plan.item_ids().collect();
        assert_eq!(planned, vec!["A-2"]);
    }

    #[test]
    fn test_cycle_maps_to_exit_code() {
        let dir = TempDir::new().unwrap();
        let items = write_manifest(
            &dir,
            r#"{"items": [
                {"id": "A", "priority": 1, "blocked_by": ["B"]},
                {"id": "B", "priority": 1, "blocked_by": ["A"]}
            ]}"#,
        );

        let err = build_plan(&AppConfig::default(), dir.path(), &items, &HashSet::new()).unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::CircularDependency);
        assert!(err.to_string().contains("A"));
    }

    #[test]
    fn test_missing_manifest_is_input_error() {
        let dir = TempDir::new().unwrap();
        let err = build_plan(
            &AppConfig::default(),
            dir.path(),
            &dir.path().join("nope.json"),
            &HashSet::new(),
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::ConfigError);
    }
}
