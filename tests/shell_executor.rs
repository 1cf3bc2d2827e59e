#![cfg(unix)]

mod common;

use std::time::Duration;

use common::{error, status};
use dagpool::engine::{ExecutionPool, PoolConfig};
use dagpool::exec::command::command_from_payload;
use dagpool::exec::ShellExecutor;
use dagpool::types::{Step, TaskStatus};
use dagpool_test_utils::{init_tracing, with_timeout};
use serde_json::json;

fn shell(id: &str, cmd: &str) -> Step {
    Step::new(id, "shell").with_payload(cmd)
}

#[test]
fn payload_accepts_string_or_cmd_table() {
    assert_eq!(command_from_payload(&json!("echo hi")), Some("echo hi"));
    assert_eq!(command_from_payload(&json!({ "cmd": "ls" })), Some("ls"));
    assert_eq!(command_from_payload(&json!({ "run": "ls" })), None);
    assert_eq!(command_from_payload(&json!(42)), None);
}

#[tokio::test]
async fn commands_run_in_dependency_order() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("order.log");
    let log = log.display();
    let steps = vec![
        shell("first", &format!("echo first >> {log}")),
        shell("second", &format!("echo second >> {log}")).depends_on("first"),
    ];

    let result = with_timeout(ExecutionPool::default().execute(&steps, ShellExecutor::new()))
        .await
        .unwrap();

    assert!(result.success);
    let written = std::fs::read_to_string(dir.path().join("order.log")).unwrap();
    assert_eq!(written, "first\nsecond\n");
}

#[tokio::test]
async fn non_zero_exit_fails_the_step() {
    init_tracing();
    let steps = vec![shell("bad", "exit 3"), shell("after", "true").depends_on("bad")];

    let result = with_timeout(ExecutionPool::default().execute(&steps, ShellExecutor::new()))
        .await
        .unwrap();

    assert_eq!(status(&result, "bad"), TaskStatus::Failed);
    assert_eq!(error(&result, "bad"), "command exited with status 3");
    assert_eq!(status(&result, "after"), TaskStatus::Cancelled);
}

#[tokio::test]
async fn missing_command_fails_the_step() {
    init_tracing();
    let steps = vec![Step::new("empty", "shell")];

    let result = with_timeout(ExecutionPool::default().execute(&steps, ShellExecutor::new()))
        .await
        .unwrap();

    assert!(error(&result, "empty").contains("no command"));
}

#[tokio::test]
async fn timeout_stops_a_long_command() {
    init_tracing();
    let steps = vec![shell("sleepy", "sleep 5")];
    let pool = ExecutionPool::new(
        PoolConfig::new().with_task_timeout(Duration::from_millis(100)),
    );

    let result = with_timeout(pool.execute(&steps, ShellExecutor::new()))
        .await
        .unwrap();

    assert_eq!(status(&result, "sleepy"), TaskStatus::Failed);
    assert!(error(&result, "sleepy").contains("timed out"));
    assert!(result.total_duration < Duration::from_secs(5));
}
