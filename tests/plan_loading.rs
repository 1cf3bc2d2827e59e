use std::io::Write;
use std::time::Duration;

use dagpool::config::{load_and_validate, load_from_path, PlanFile, RawPlanFile};
use dagpool::engine::{PoolConfig, DEFAULT_MAX_CONCURRENCY};
use dagpool::errors::DagPoolError;
use dagpool::exec::command::command_from_payload;
use dagpool::types::ToolKind;
use tempfile::NamedTempFile;

fn plan_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn loads_pool_section_and_steps() {
    let file = plan_file(
        r#"
[pool]
max_concurrency = 2
fail_fast = true
task_timeout_ms = 1500

[[step]]
id = "build"
action = "Compile everything"
tool = "shell"
payload = "cargo build"

[[step]]
id = "verify"
tool = "audit:test"
payload = { cmd = "cargo test", retries = 0 }
dependencies = ["build"]
"#,
    );

    let plan = load_and_validate(file.path()).unwrap();

    assert_eq!(plan.pool.max_concurrency, 2);
    assert!(plan.pool.fail_fast);
    assert_eq!(plan.pool.task_timeout_ms, Some(1500));

    assert_eq!(plan.steps.len(), 2);
    assert_eq!(plan.steps[0].action, "Compile everything");
    assert_eq!(plan.steps[0].tool.kind(), ToolKind::Standard);
    assert_eq!(command_from_payload(&plan.steps[0].payload), Some("cargo build"));

    let verify = &plan.steps[1];
    assert_eq!(verify.tool.name(), "audit:test");
    assert_eq!(verify.tool.capability(), "test");
    assert!(verify.tool.is_audit());
    assert_eq!(verify.dependencies, vec!["build"]);
    assert_eq!(command_from_payload(&verify.payload), Some("cargo test"));

    let config = PoolConfig::from(&plan.pool);
    assert_eq!(config.max_concurrency, 2);
    assert!(config.fail_fast);
    assert_eq!(config.task_timeout, Some(Duration::from_millis(1500)));
}

#[test]
fn defaults_apply_when_pool_section_is_missing() {
    let file = plan_file(
        r#"
[[step]]
id = "only"
tool = "shell"
"#,
    );

    let plan: PlanFile = load_and_validate(file.path()).unwrap();

    assert_eq!(plan.pool.max_concurrency, DEFAULT_MAX_CONCURRENCY);
    assert!(!plan.pool.fail_fast);
    assert_eq!(plan.pool.task_timeout_ms, None);
    assert!(plan.steps[0].payload.is_null());
    assert!(plan.steps[0].dependencies.is_empty());
}

#[test]
fn raw_loading_skips_validation() {
    let file = plan_file(
        r#"
[[step]]
id = "a"
tool = "shell"
dependencies = ["a"]
"#,
    );

    let raw: RawPlanFile = load_from_path(file.path()).unwrap();
    assert_eq!(raw.steps.len(), 1);

    match PlanFile::try_from(raw) {
        Err(DagPoolError::CycleDetected { steps }) => assert_eq!(steps, vec!["a"]),
        other => panic!("expected CycleDetected, got {other:?}"),
    }
}

#[test]
fn cycle_in_plan_is_a_structured_error() {
    let file = plan_file(
        r#"
[[step]]
id = "A"
tool = "shell"
dependencies = ["B"]

[[step]]
id = "B"
tool = "shell"
dependencies = ["A"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(DagPoolError::CycleDetected { steps }) => assert_eq!(steps, vec!["A", "B"]),
        other => panic!("expected CycleDetected, got {other:?}"),
    }
}

#[test]
fn duplicate_step_id_is_rejected() {
    let file = plan_file(
        r#"
[[step]]
id = "A"
tool = "shell"

[[step]]
id = "A"
tool = "audit:lint"
"#,
    );

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, DagPoolError::DuplicateStep(ref id) if id == "A"));
    assert_eq!(err.to_string(), "duplicate step id: A");
}

#[test]
fn unknown_dependency_is_accepted() {
    let file = plan_file(
        r#"
[[step]]
id = "A"
tool = "shell"
dependencies = ["NonExistent"]
"#,
    );

    let plan = load_and_validate(file.path()).unwrap();
    assert_eq!(plan.steps[0].dependencies, vec!["NonExistent"]);
}

#[test]
fn invalid_pool_settings_are_rejected() {
    for (pool, needle) in [
        ("max_concurrency = 0", "max_concurrency"),
        ("task_timeout_ms = 0", "task_timeout_ms"),
    ] {
        let file = plan_file(&format!(
            "[pool]\n{pool}\n\n[[step]]\nid = \"a\"\ntool = \"shell\"\n"
        ));

        match load_and_validate(file.path()) {
            Err(DagPoolError::PlanError(msg)) => assert!(msg.contains(needle), "{msg}"),
            other => panic!("expected PlanError for `{pool}`, got {other:?}"),
        }
    }
}

#[test]
fn plan_without_steps_is_rejected() {
    let file = plan_file("[pool]\nmax_concurrency = 2\n");

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, DagPoolError::PlanError(_)));
}

#[test]
fn empty_step_id_is_rejected() {
    let file = plan_file("[[step]]\nid = \"\"\ntool = \"shell\"\n");

    match load_and_validate(file.path()) {
        Err(DagPoolError::PlanError(msg)) => assert!(msg.contains("empty id"), "{msg}"),
        other => panic!("expected PlanError, got {other:?}"),
    }
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let file = plan_file("[[step]\nid = ");

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, DagPoolError::TomlError(_)));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();

    let err = load_and_validate(dir.path().join("Dagpool.toml")).unwrap_err();
    assert!(matches!(err, DagPoolError::IoError(_)));
}
