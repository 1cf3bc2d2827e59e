// src/engine/pool.rs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dag::{ScheduledTask, Scheduler};
use crate::errors::Result;
use crate::exec::{run_task, TaskContext, TaskExecutor};
use crate::types::Step;

use super::core::CoreRuntime;
use super::{AbortHandle, CoreCommand, ExecutionEvent, ExecutionResult, PoolConfig, RuntimeEvent};

const ABORT_REASON: &str = "execution aborted";

/// Bounded-concurrency execution of a step list.
///
/// Each call to [`execute`](Self::execute) runs one control loop that owns
/// all task state. Workers run executor invocations as Tokio tasks and report
/// back over a channel; only the loop changes task status, cascades
/// cancellations and decides what to admit next.
pub struct ExecutionPool {
    config: PoolConfig,
    abort: AbortHandle,
}

impl fmt::Debug for ExecutionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionPool")
            .field("max_concurrency", &self.config.max_concurrency)
            .field("fail_fast", &self.config.fail_fast)
            .field("task_timeout", &self.config.task_timeout)
            .field("aborted", &self.abort.is_aborted())
            .finish_non_exhaustive()
    }
}

impl Default for ExecutionPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl ExecutionPool {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            abort: AbortHandle::new(),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Handle that can abort this pool's runs from anywhere.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Stop admitting new tasks and cancel everything not yet started.
    pub fn abort(&self) {
        self.abort.abort();
    }

    /// Execute `steps` through `executor`.
    ///
    /// Returns `Err` only for structural problems in the plan (a dependency
    /// cycle or a duplicate step id), before the executor is ever called.
    /// Task failures, timeouts and cancellations are reported in the
    /// [`ExecutionResult`].
    pub async fn execute<E>(&self, steps: &[Step], executor: E) -> Result<ExecutionResult>
    where
        E: TaskExecutor,
    {
        let scheduler = Scheduler::new(steps, self.config.max_concurrency, self.config.fail_fast)?;

        if scheduler.is_empty() {
            debug!("no steps to execute");
            return Ok(ExecutionResult::empty());
        }

        info!(
            steps = scheduler.len(),
            max_concurrency = scheduler.max_concurrency(),
            fail_fast = self.config.fail_fast,
            timeout_ms = self.config.task_timeout.map(|t| t.as_millis() as u64),
            "starting execution"
        );

        let (runtime_tx, mut runtime_rx) =
            mpsc::channel::<RuntimeEvent>(scheduler.max_concurrency().min(1024));
        let mut shell = Shell {
            executor: Arc::new(executor),
            runtime_tx,
            run_token: self.abort.token().child_token(),
            abort: self.abort.clone(),
            timeout: self.config.task_timeout,
            events: self.config.events.clone(),
        };
        let mut core = CoreRuntime::new(scheduler);

        let mut step = if shell.run_token.is_cancelled() {
            core.step(abort_requested())
        } else {
            core.start(Instant::now())
        };

        loop {
            for command in step.commands {
                shell.execute_command(command);
            }

            if !step.keep_running {
                break;
            }

            step = tokio::select! {
                biased;

                _ = shell.run_token.cancelled(), if core.is_admitting() => {
                    core.step(abort_requested())
                }

                event = runtime_rx.recv() => match event {
                    Some(event) => core.step(event),
                    None => {
                        // The shell keeps a sender alive, so this cannot happen
                        // while tasks are in flight.
                        warn!("worker channel closed with tasks outstanding");
                        break;
                    }
                },
            };
        }

        let result = core.into_result();
        info!(
            success = result.success,
            completed = result.completed_count,
            failed = result.failed_count,
            cancelled = result.cancelled_count,
            total_ms = result.total_duration_ms(),
            critical_path_ms = result.critical_path_ms(),
            "execution finished"
        );

        Ok(result)
    }
}

fn abort_requested() -> RuntimeEvent {
    RuntimeEvent::AbortRequested {
        reason: ABORT_REASON.to_string(),
    }
}

/// IO side of one run: spawns workers and publishes events.
struct Shell {
    executor: Arc<dyn TaskExecutor>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    /// Cancelled when the pool is aborted.
    run_token: CancellationToken,
    abort: AbortHandle,
    timeout: Option<Duration>,
    events: Option<mpsc::UnboundedSender<ExecutionEvent>>,
}

impl Shell {
    fn execute_command(&mut self, command: CoreCommand) {
        match command {
            CoreCommand::DispatchTasks(tasks) => {
                for task in tasks {
                    self.dispatch(task);
                }
            }
            CoreCommand::Emit(event) => self.emit(event),
        }
    }

    fn dispatch(&self, task: ScheduledTask) {
        debug!(task = %task.id(), "dispatching task to worker");

        let ctx = TaskContext::new(task, self.run_token.child_token(), self.abort.clone());
        tokio::spawn(run_task(
            Arc::clone(&self.executor),
            ctx,
            self.timeout,
            self.runtime_tx.clone(),
        ));
    }

    fn emit(&mut self, event: ExecutionEvent) {
        let Some(events) = &self.events else {
            return;
        };

        if events.send(event).is_err() {
            debug!("event receiver dropped; no longer publishing lifecycle events");
            self.events = None;
        }
    }
}
