mod common;

use std::collections::HashSet;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::sync::watch;

use common::{branch_of, item, FixBehavior, Harness};
use wavesmith_core::api::{
    DependencyGraph, ExecutionPlan, ExecutionState, ExitCode, GraphError, ItemStatus, OrphanPolicy,
};

fn sorted(mut ids: Vec<String>) -> Vec<String> {
    ids.sort();
    ids
}

#[tokio::test]
async fn fan_out_runs_waves_in_dependency_order() {
    let harness = Harness::new();
    let items = vec![item("A", &[]), item("B", &["A"]), item("C", &["A"])];
    let mut state = ExecutionState::new();

    let summary = harness.run(&items, &mut state).await;

    assert!(summary.is_success());
    assert_eq!(summary.exit_code(), ExitCode::Success);
    assert_eq!(summary.waves_run, 2);
    assert_eq!(summary.counts.completed, 3);

    let merged = harness.repo.merged();
    assert_eq!(merged[0], branch_of("A"));
    assert_eq!(
        sorted(merged[1..].to_vec()),
        vec![branch_of("B"), branch_of("C")]
    );

    let persisted = harness.store().load().unwrap().unwrap();
    assert_eq!(persisted.wave_index, 2);
    assert_eq!(persisted.counts().completed, 3);
}

#[tokio::test]
async fn timeout_skips_dependents_but_not_siblings() {
    let mut harness = Harness::new();
    harness.config.worker_timeout = Duration::from_millis(200);
    harness
        .fixer
        .set("Z", FixBehavior::slow(Duration::from_secs(10)));

    let items = vec![
        item("X", &[]),
        item("Y", &[]),
        item("Z", &[]),
        item("V", &["X"]),
        item("W", &["Z"]),
    ];
    let mut state = ExecutionState::new();
    let summary = harness.run(&items, &mut state).await;

    assert_eq!(state.status("Z"), Some(ItemStatus::Timeout));
    assert_eq!(state.status("X"), Some(ItemStatus::Completed));
    assert_eq!(state.status("Y"), Some(ItemStatus::Completed));
    assert_eq!(state.status("V"), Some(ItemStatus::Completed));
    assert_eq!(state.status("W"), Some(ItemStatus::Skipped));
    assert!(state.reason("W").unwrap().contains("Z"));
    assert!(state.reason("Z").unwrap().contains("time budget"));

    assert!(!harness.repo.merged().contains(&branch_of("Z")));
    assert!(!harness.fixer.calls().contains(&"W".to_string()));
    assert_eq!(summary.exit_code(), ExitCode::ItemsFailed);
    assert!(harness.workspaces.removed().contains(&"Z".to_string()));
}

#[tokio::test]
async fn failing_fixer_does_not_cancel_siblings() {
    let harness = Harness::new();
    harness.fixer.set("A", FixBehavior::exit(1));

    let items = vec![item("A", &[]), item("B", &[])];
    let mut state = ExecutionState::new();
    let summary = harness.run(&items, &mut state).await;

    assert_eq!(state.status("A"), Some(ItemStatus::Failed));
    assert_eq!(
        state.reason("A"),
        Some("fixer exited with code 1: compile error")
    );
    assert_eq!(state.status("B"), Some(ItemStatus::Completed));
    assert_eq!(summary.counts.failed, 1);
    assert_eq!(summary.counts.completed, 1);
}

#[tokio::test]
async fn merges_are_serialized() {
    let mut harness = Harness::new();
    harness.config.max_workers = 6;

    let items: Vec<_> = (0..6).map(|i| item(&format!("I-{i}"), &[])).collect();
    let mut state = ExecutionState::new();
    let summary = harness.run(&items, &mut state).await;

    assert!(summary.is_success());
    assert_eq!(harness.repo.merged().len(), 6);
    assert_eq!(harness.repo.peak_concurrent_merges(), 1);
}

#[tokio::test]
async fn merge_conflict_fails_item_and_run_continues() {
    let harness = Harness::new();
    harness.repo.conflict_on("B");

    let items = vec![item("A", &[]), item("B", &[]), item("C", &["B"])];
    let mut state = ExecutionState::new();
    harness.run(&items, &mut state).await;

    assert_eq!(state.status("A"), Some(ItemStatus::Completed));
    assert_eq!(state.status("B"), Some(ItemStatus::Failed));
    assert_eq!(state.reason("B"), Some("merge conflict in src/app.ts"));
    assert_eq!(state.status("C"), Some(ItemStatus::Skipped));

    let log = harness.repo.log();
    assert!(log.contains(&"abort".to_string()));
    assert!(!log.iter().any(|entry| entry.starts_with("reset:")));
}

#[tokio::test]
async fn circular_dependency_is_refused_before_any_work() {
    let items = vec![item("A", &["B"]), item("B", &["A"]), item("C", &[])];
    let graph = DependencyGraph::build(&items, &HashSet::new(), OrphanPolicy::Block).unwrap();

    let err = ExecutionPlan::build(&graph, &HashSet::new()).unwrap_err();
    match err {
        GraphError::CircularDependency { cycles } => {
            assert_eq!(cycles, graph.detect_cycles());
            assert!(!cycles.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unresolved_blocker_skips_item_up_front() {
    let harness = Harness::new();
    let items = vec![item("D", &["GHOST"]), item("E", &[])];
    let mut state = ExecutionState::new();
    let summary = harness.run(&items, &mut state).await;

    assert_eq!(state.status("D"), Some(ItemStatus::Skipped));
    assert!(state.reason("D").unwrap().contains("GHOST"));
    assert_eq!(state.status("E"), Some(ItemStatus::Completed));
    assert!(!harness.fixer.calls().contains(&"D".to_string()));

    let skipped = summary
        .outcomes
        .iter()
        .find(|o| o.item_id == "D")
        .unwrap();
    assert_eq!(skipped.wave_index, None);
    assert_eq!(summary.exit_code(), ExitCode::ItemsFailed);
}

#[tokio::test]
async fn resume_with_everything_completed_does_no_work() {
    let harness = Harness::new();
    let items = vec![item("A", &[]), item("B", &["A"])];
    let mut state = ExecutionState::new();
    harness.run(&items, &mut state).await;
    let calls_before = harness.fixer.calls().len();

    let mut resumed = harness.store().resume().unwrap();
    assert_eq!(resumed.attempt, 2);

    let plan = harness.plan(&items, &resumed.completed_ids());
    assert!(plan.is_empty());

    let summary = harness.run(&items, &mut resumed).await;
    assert!(summary.is_success());
    assert_eq!(summary.exit_code(), ExitCode::Success);
    assert_eq!(harness.fixer.calls().len(), calls_before);
}

#[tokio::test]
async fn resume_retries_only_unfinished_items() {
    let harness = Harness::new();
    harness.fixer.set("A", FixBehavior::exit(1));

    let items = vec![item("A", &[]), item("B", &["A"]), item("C", &[])];
    let mut state = ExecutionState::new();
    let first = harness.run(&items, &mut state).await;
    assert_eq!(first.exit_code(), ExitCode::ItemsFailed);
    assert_eq!(state.status("B"), Some(ItemStatus::Skipped));

    harness.fixer.set("A", FixBehavior::default());
    let mut resumed = harness.store().resume().unwrap();
    assert_eq!(resumed.status("A"), Some(ItemStatus::Pending));
    assert_eq!(resumed.status("B"), Some(ItemStatus::Pending));
    assert_eq!(resumed.status("C"), Some(ItemStatus::Completed));

    let second = harness.run(&items, &mut resumed).await;
    assert!(second.is_success());
    assert_eq!(resumed.counts().completed, 3);

    let calls = harness.fixer.calls();
    assert_eq!(calls.iter().filter(|id| *id == "C").count(), 1);
    assert_eq!(calls.iter().filter(|id| *id == "A").count(), 2);
}

#[tokio::test]
async fn interrupt_stops_run_and_persists_state() {
    let harness = Harness::new();
    harness
        .fixer
        .set("A", FixBehavior::slow(Duration::from_secs(10)));

    let items = vec![item("A", &[]), item("B", &[]), item("C", &["A"])];
    let plan = harness.plan(&items, &HashSet::new());
    let mut state = ExecutionState::new();

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = tx.send(true);
        // Keep the sender alive so receivers do not see a closed channel.
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let summary = harness
        .orchestrator()
        .run(&plan, &mut state, rx)
        .await
        .unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.exit_code(), ExitCode::Interrupted);
    assert_eq!(state.status("A"), Some(ItemStatus::Interrupted));
    assert_eq!(state.status("B"), Some(ItemStatus::Completed));
    assert_eq!(state.status("C"), Some(ItemStatus::Pending));
    assert!(!harness.fixer.calls().contains(&"C".to_string()));

    let persisted = harness.store().load().unwrap().unwrap();
    assert_eq!(persisted.wave_index, 0);
    assert_eq!(persisted.status("A"), Some(ItemStatus::Interrupted));
    assert_eq!(persisted.status("C"), Some(ItemStatus::Pending));
}

#[tokio::test]
async fn fix_without_changes_completes_without_merging() {
    let harness = Harness::new();
    harness
        .workspaces
        .unchanged
        .lock()
        .unwrap()
        .insert("A".to_string());

    let mut state = ExecutionState::new();
    harness.run(&[item("A", &[])], &mut state).await;

    assert_eq!(state.status("A"), Some(ItemStatus::Completed));
    assert_eq!(state.reason("A"), Some("no changes to merge"));
    assert!(harness.repo.merged().is_empty());
}

#[tokio::test]
async fn failed_workspaces_are_kept_when_configured() {
    let mut harness = Harness::new();
    harness.config.keep_failed_workspaces = true;
    harness.fixer.set("A", FixBehavior::exit(2));

    let mut state = ExecutionState::new();
    harness
        .run(&[item("A", &[]), item("B", &[])], &mut state)
        .await;

    assert_eq!(harness.workspaces.removed(), vec!["B".to_string()]);
}

#[tokio::test]
async fn renderer_sees_lifecycle_events_in_order() {
    let harness = Harness::new();
    let mut state = ExecutionState::new();
    harness.run(&[item("A", &[])], &mut state).await;

    assert_eq!(
        harness.renderer.events(),
        vec![
            "run.start",
            "plan",
            "wave.start",
            "item.start",
            "item.end",
            "wave.end",
            "run.end"
        ]
    );
}
