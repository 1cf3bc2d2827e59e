// src/exec/backend.rs

//! Pluggable executor abstraction.
//!
//! The pool talks to a `TaskExecutor` instead of knowing what a step does.
//! Production callers route on the step's tool and payload; tests pass a
//! plain async closure or a scripted fake.
//!
//! - Every invocation receives a [`TaskContext`]: a snapshot of the task, a
//!   cancellation token that fires on abort or timeout, and the pool's
//!   [`AbortHandle`].
//! - The pool only looks at whether the returned future resolves to `Ok` or
//!   `Err`, and how long it takes.

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::dag::ScheduledTask;
use crate::engine::AbortHandle;
use crate::types::{Step, Tool};

/// Future returned by a [`TaskExecutor`].
pub type ExecFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// Trait abstracting how a scheduled task is executed.
///
/// Implemented for every `Fn(TaskContext) -> impl Future<Output =
/// anyhow::Result<()>>` closure.
pub trait TaskExecutor: Send + Sync + 'static {
    fn execute(&self, ctx: TaskContext) -> ExecFuture;
}

impl<F, Fut> TaskExecutor for F
where
    F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn execute(&self, ctx: TaskContext) -> ExecFuture {
        Box::pin(self(ctx))
    }
}

/// Everything an executor gets to see about the task it runs.
#[derive(Debug, Clone)]
pub struct TaskContext {
    task: ScheduledTask,
    cancellation: CancellationToken,
    abort: AbortHandle,
}

impl TaskContext {
    pub(crate) fn new(task: ScheduledTask, cancellation: CancellationToken, abort: AbortHandle) -> Self {
        Self {
            task,
            cancellation,
            abort,
        }
    }

    /// Snapshot of the task taken when it was admitted.
    pub fn task(&self) -> &ScheduledTask {
        &self.task
    }

    pub fn step(&self) -> &Step {
        &self.task.step
    }

    pub fn id(&self) -> &str {
        self.task.id()
    }

    pub fn tool(&self) -> &Tool {
        self.task.tool()
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.task.step.payload
    }

    /// Token that fires when the run is aborted or this task times out.
    ///
    /// Cooperative executors should watch it; nothing forces them to stop.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Handle for aborting the whole run from inside an executor.
    pub fn abort_handle(&self) -> &AbortHandle {
        &self.abort
    }
}
