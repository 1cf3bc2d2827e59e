// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async shell (`engine::pool::ExecutionPool`) is responsible for:
//! - spawning workers for dispatched tasks
//! - reading settlements from the worker channel
//! - forwarding lifecycle events and abort requests
//!
//! The core is intended to be unit tested without any Tokio runtime,
//! channels or executors.

use tokio::time::Instant;

use crate::dag::Scheduler;
use crate::engine::event_handlers::{
    handle_abort, handle_run_start, handle_task_settled, CoreStep,
};
use crate::engine::{ExecutionResult, RuntimeEvent};

/// Pure core runtime state for one run.
///
/// It has **no** channels, spawns nothing and does not read the clock.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler) -> Self {
        Self { scheduler }
    }

    /// Read-only access to the scheduler (for tests and diagnostics).
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Whether an abort request would still change anything.
    pub fn is_admitting(&self) -> bool {
        self.scheduler.is_admitting()
    }

    pub fn is_finished(&self) -> bool {
        self.scheduler.is_finished()
    }

    /// Admit the first wave of tasks.
    pub fn start(&mut self, now: Instant) -> CoreStep {
        handle_run_start(&mut self.scheduler, now)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskSettled {
                task,
                outcome,
                finished_at,
            } => handle_task_settled(&mut self.scheduler, &task, outcome, finished_at),
            RuntimeEvent::AbortRequested { reason } => handle_abort(&mut self.scheduler, &reason),
        }
    }

    /// Final report of the run.
    pub fn into_result(self) -> ExecutionResult {
        let critical_path = self.scheduler.critical_path();
        ExecutionResult::from_tasks(self.scheduler.into_tasks(), critical_path)
    }
}
