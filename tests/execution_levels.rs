mod common;

use common::level_ids;
use dagpool::dag::{build_execution_levels, flatten_tasks};
use dagpool::errors::DagPoolError;
use dagpool::types::{Step, TaskStatus, ToolKind};
use dagpool_test_utils::builders::{chain, diamond, independent, PlanBuilder};

#[test]
fn empty_plan_has_no_levels() {
    let levels = build_execution_levels(&[]).unwrap();
    assert!(levels.is_empty());
}

#[test]
fn independent_steps_share_one_level_and_start_ready() {
    let levels = build_execution_levels(&independent(&["a", "b", "c"])).unwrap();

    assert_eq!(level_ids(&levels), vec![vec!["a", "b", "c"]]);
    assert_eq!(levels[0].level, 0);
    assert!(levels[0]
        .tasks
        .iter()
        .all(|t| t.status == TaskStatus::Ready && t.started_at.is_none()));
}

#[test]
fn chain_yields_one_level_per_step() {
    let levels = build_execution_levels(&chain(&["step1", "step2", "step3"])).unwrap();

    assert_eq!(
        level_ids(&levels),
        vec![vec!["step1"], vec!["step2"], vec!["step3"]]
    );
    for (i, level) in levels.iter().enumerate() {
        assert_eq!(level.level, i);
        assert_eq!(level.tasks[0].level, i);
    }
}

#[test]
fn diamond_levels() {
    let levels = build_execution_levels(&diamond()).unwrap();

    assert_eq!(
        level_ids(&levels),
        vec![vec!["root"], vec!["branch1", "branch2"], vec!["merge"]]
    );
}

#[test]
fn cycle_is_rejected_and_names_only_its_members() {
    let steps = PlanBuilder::new()
        .standard("step1", &["step3"])
        .standard("step2", &["step1"])
        .standard("step3", &["step2"])
        .standard("downstream", &["step3"])
        .standard("free", &[])
        .build();

    match build_execution_levels(&steps) {
        Err(DagPoolError::CycleDetected { steps }) => {
            assert_eq!(steps, vec!["step1", "step2", "step3"]);
        }
        other => panic!("expected CycleDetected, got {other:?}"),
    }
}

#[test]
fn self_dependency_is_a_cycle() {
    let steps = PlanBuilder::new().standard("loop", &["loop"]).build();

    let err = build_execution_levels(&steps).unwrap_err();
    assert!(err.to_string().contains("cycle detected"));
    match err {
        DagPoolError::CycleDetected { steps } => assert_eq!(steps, vec!["loop"]),
        other => panic!("expected CycleDetected, got {other:?}"),
    }
}

#[test]
fn duplicate_ids_are_rejected() {
    let steps = independent(&["a", "b", "a"]);

    match build_execution_levels(&steps) {
        Err(DagPoolError::DuplicateStep(id)) => assert_eq!(id, "a"),
        other => panic!("expected DuplicateStep, got {other:?}"),
    }
}

#[test]
fn critical_path_weight_decreases_towards_leaves() {
    let steps = chain(&["root", "branch1", "leaf"]);
    let tasks = flatten_tasks(&build_execution_levels(&steps).unwrap());

    let weights: Vec<usize> = tasks.iter().map(|t| t.critical_path_weight).collect();
    assert_eq!(weights, vec![3, 2, 1]);
}

#[test]
fn weight_follows_longest_dependent_chain() {
    // root -> short; root -> mid -> long
    let steps = PlanBuilder::new()
        .standard("root", &[])
        .standard("short", &["root"])
        .standard("mid", &["root"])
        .standard("long", &["mid"])
        .build();
    let tasks = flatten_tasks(&build_execution_levels(&steps).unwrap());
    let weight = |id: &str| {
        tasks
            .iter()
            .find(|t| t.id() == id)
            .map(|t| t.critical_path_weight)
            .unwrap()
    };

    assert_eq!(weight("root"), 3);
    assert_eq!(weight("mid"), 2);
    assert_eq!(weight("short"), 1);
    assert_eq!(weight("long"), 1);
}

#[test]
fn dangling_dependency_is_ignored() {
    let steps = vec![
        Step::new("a", "shell").depends_on("missing"),
        Step::new("b", "shell").depends_on("a"),
    ];

    let levels = build_execution_levels(&steps).unwrap();
    assert_eq!(level_ids(&levels), vec![vec!["a"], vec!["b"]]);
}

#[test]
fn audit_steps_lead_their_level() {
    let steps = PlanBuilder::new()
        .standard("build", &[])
        .standard("docs", &[])
        .audit("lint", &[])
        .standard("package", &["build"])
        .audit("verify", &["build"])
        .build();

    let levels = build_execution_levels(&steps).unwrap();
    assert_eq!(
        level_ids(&levels),
        vec![vec!["lint", "build", "docs"], vec!["verify", "package"]]
    );
    assert_eq!(levels[0].tasks[0].tool().kind(), ToolKind::Audit);
    assert_eq!(levels[0].tasks[1].tool().kind(), ToolKind::Standard);
}

#[test]
fn flatten_keeps_level_then_priority_order() {
    let steps = PlanBuilder::new()
        .standard("merge", &["left", "right"])
        .standard("right", &[])
        .audit("left", &[])
        .build();

    let flat = flatten_tasks(&build_execution_levels(&steps).unwrap());
    let ids: Vec<&str> = flat.iter().map(|t| t.id()).collect();
    assert_eq!(ids, vec!["left", "right", "merge"]);
}

#[test]
fn repeated_dependency_counts_once() {
    let steps = vec![
        Step::new("a", "shell"),
        Step::new("b", "shell").depends_on("a").depends_on("a"),
    ];

    let tasks = flatten_tasks(&build_execution_levels(&steps).unwrap());
    assert_eq!(tasks[0].critical_path_weight, 2);
    assert_eq!(tasks[1].level, 1);
}
