// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tokio::time::Instant;

use crate::dag::{ScheduledTask, Scheduler, SchedulerStep};
use crate::engine::{ExecutionEvent, TaskOutcome};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Hand these tasks to workers.
    DispatchTasks(Vec<ScheduledTask>),
    /// Publish a lifecycle event.
    Emit(ExecutionEvent),
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer loop should keep waiting for settlements.
    pub keep_running: bool,
}

/// Seed a run: admit the initial wave of eligible tasks.
pub fn handle_run_start(scheduler: &mut Scheduler, now: Instant) -> CoreStep {
    let step = scheduler.step_admit(now);
    core_step_from(scheduler, step)
}

/// Handle a worker's report that `task` settled with `outcome`.
pub fn handle_task_settled(
    scheduler: &mut Scheduler,
    task: &str,
    outcome: TaskOutcome,
    finished_at: Instant,
) -> CoreStep {
    let step = scheduler.step_completion(task, outcome, finished_at);
    core_step_from(scheduler, step)
}

/// Handle an abort request.
pub fn handle_abort(scheduler: &mut Scheduler, reason: &str) -> CoreStep {
    let step = scheduler.step_abort(reason);
    core_step_from(scheduler, step)
}

/// Translate a scheduler step into shell commands.
///
/// Ordering: terminal transitions first (each followed by a progress
/// event), then start events, then the dispatch itself.
fn core_step_from(scheduler: &Scheduler, step: SchedulerStep) -> CoreStep {
    let total = scheduler.len();
    let mut finished = scheduler.finished_count() - step.terminal_transitions();
    let mut commands = Vec::new();

    let terminal = step
        .newly_completed
        .into_iter()
        .map(ExecutionEvent::TaskCompleted)
        .chain(step.newly_failed.into_iter().map(ExecutionEvent::TaskFailed))
        .chain(step.newly_cancelled.into_iter().map(ExecutionEvent::TaskCancelled));

    for event in terminal {
        finished += 1;
        commands.push(CoreCommand::Emit(event));
        commands.push(CoreCommand::Emit(ExecutionEvent::Progress { finished, total }));
    }

    if !step.newly_started.is_empty() {
        commands.extend(
            step.newly_started
                .iter()
                .cloned()
                .map(|task| CoreCommand::Emit(ExecutionEvent::TaskStarted(task))),
        );
        commands.push(CoreCommand::DispatchTasks(step.newly_started));
    }

    CoreStep {
        commands,
        keep_running: !scheduler.is_finished(),
    }
}
