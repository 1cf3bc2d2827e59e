// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::task_info::ScheduledTask;

/// Structured result of a single scheduler "step".
///
/// Every task appears as a snapshot taken right after its transition. This
/// is what the core runtime turns into dispatch commands and lifecycle
/// events, and what tests use to step the DAG by hand.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks admitted in this step (now `Running`), in admission order.
    pub newly_started: Vec<ScheduledTask>,
    /// Tasks that settled successfully in this step.
    pub newly_completed: Vec<ScheduledTask>,
    /// Tasks that settled with a failure in this step.
    pub newly_failed: Vec<ScheduledTask>,
    /// Tasks cancelled by cascade, fail-fast or abort in this step.
    pub newly_cancelled: Vec<ScheduledTask>,
    /// Whether this step left every task in a terminal state.
    pub run_just_finished: bool,
}

impl SchedulerStep {
    /// Number of terminal transitions recorded in this step.
    pub fn terminal_transitions(&self) -> usize {
        self.newly_completed.len() + self.newly_failed.len() + self.newly_cancelled.len()
    }
}
