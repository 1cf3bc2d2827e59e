// src/exec/task_runner.rs

//! Individual task runner: one executor invocation raced against the
//! optional timeout, reported back to the control loop.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::exec::backend::{TaskContext, TaskExecutor};

/// Run a single task and send exactly one `TaskSettled` event.
///
/// - The executor future runs in its own Tokio task, so a panic becomes a
///   failed outcome instead of taking the worker down.
/// - If `timeout` elapses first, the executor task is aborted at its next
///   await point and the task's cancellation token fires. Code that never
///   yields keeps running in the background; its result is discarded.
pub async fn run_task(
    executor: Arc<dyn TaskExecutor>,
    ctx: TaskContext,
    timeout: Option<Duration>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    let task = ctx.id().to_string();
    info!(
        task = %task,
        tool = %ctx.tool(),
        level = ctx.task().level,
        "starting task"
    );

    let outcome = run_with_timeout(executor, ctx, timeout).await;
    let finished_at = Instant::now();

    if runtime_tx
        .send(RuntimeEvent::TaskSettled {
            task: task.clone(),
            outcome,
            finished_at,
        })
        .await
        .is_err()
    {
        debug!(task = %task, "control loop gone; dropping settlement");
    }
}

async fn run_with_timeout(
    executor: Arc<dyn TaskExecutor>,
    ctx: TaskContext,
    timeout: Option<Duration>,
) -> TaskOutcome {
    let task = ctx.id().to_string();
    let cancellation = ctx.cancellation().clone();
    let mut handle = tokio::spawn(executor.execute(ctx));
    let abort = handle.abort_handle();

    let joined = match timeout {
        Some(limit) => {
            tokio::select! {
                joined = &mut handle => joined,
                _ = tokio::time::sleep(limit) => {
                    warn!(task = %task, timeout_ms = limit.as_millis() as u64, "task timed out");
                    cancellation.cancel();
                    abort.abort();
                    return TaskOutcome::TimedOut(limit);
                }
            }
        }
        None => handle.await,
    };

    match joined {
        Ok(Ok(())) => TaskOutcome::Success,
        Ok(Err(err)) => TaskOutcome::Failed(format!("{err:#}")),
        Err(join_err) => TaskOutcome::Failed(describe_join_error(join_err)),
    }
}

fn describe_join_error(err: JoinError) -> String {
    if err.is_panic() {
        format!("executor panicked: {}", panic_message(err.into_panic()))
    } else {
        format!("executor task was cancelled: {err}")
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
