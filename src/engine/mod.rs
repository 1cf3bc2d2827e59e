// src/engine/mod.rs

//! Orchestration engine for dagpool.
//!
//! This module ties together:
//! - the DAG scheduler (which task may run, cascades, fail-fast, abort)
//! - the control loop that reacts to:
//!   - task settlements reported by workers
//!   - abort requests
//! - the outbound stream of lifecycle events and the final report
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`pool`].

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::PoolSection;
use crate::types::StepId;

pub mod core;
pub mod event_handlers;
pub mod events;
pub mod pool;
pub mod result;

pub use self::core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use events::ExecutionEvent;
pub use pool::ExecutionPool;
pub use result::ExecutionResult;

/// Concurrency ceiling used when none is configured.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Outcome of one executor invocation, as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// The executor returned an error or panicked.
    Failed(String),
    /// The executor did not settle within the configured timeout.
    TimedOut(Duration),
}

impl TaskOutcome {
    /// Error message to record on the task, `None` on success.
    pub fn into_error(self) -> Option<String> {
        match self {
            TaskOutcome::Success => None,
            TaskOutcome::Failed(message) => Some(message),
            TaskOutcome::TimedOut(limit) => {
                Some(format!("timed out after {}ms", limit.as_millis()))
            }
        }
    }
}

/// Events flowing into the control loop.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A worker finished running a task.
    TaskSettled {
        task: StepId,
        outcome: TaskOutcome,
        finished_at: Instant,
    },
    /// Stop admitting and cancel everything not yet started.
    AbortRequested { reason: String },
}

/// Cloneable handle that aborts the runs of an [`ExecutionPool`].
///
/// Aborting stops admission and cancels every task that has not started.
/// Running executors see their cancellation token fire but are never
/// force-stopped. An aborted handle stays aborted: every later run on the
/// same pool is cancelled up front.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    token: CancellationToken,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.token.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// Pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Absolute ceiling on simultaneously running executor invocations.
    pub max_concurrency: usize,
    /// Cancel every unstarted task on the first failure.
    pub fail_fast: bool,
    /// Per-task limit; `None` means tasks never time out.
    pub task_timeout: Option<Duration>,
    /// Sending half of the lifecycle event stream, if anyone listens.
    pub events: Option<mpsc::UnboundedSender<ExecutionEvent>>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            fail_fast: false,
            task_timeout: None,
            events: None,
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
        self.events = Some(events);
        self
    }
}

impl From<&PoolSection> for PoolConfig {
    fn from(section: &PoolSection) -> Self {
        Self {
            max_concurrency: section.max_concurrency,
            fail_fast: section.fail_fast,
            task_timeout: section.task_timeout_ms.map(Duration::from_millis),
            events: None,
        }
    }
}
