// src/engine/events.rs

//! Outbound lifecycle events.
//!
//! A single stream replaces per-event callbacks: consumers (progress bars,
//! telemetry, tests) hold the receiving half of an unbounded channel and the
//! control loop never waits on them.

use crate::dag::ScheduledTask;

/// Lifecycle event emitted by the control loop.
///
/// Task payloads are snapshots taken right after the transition.
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    TaskStarted(ScheduledTask),
    TaskCompleted(ScheduledTask),
    /// The executor errored, panicked or timed out.
    TaskFailed(ScheduledTask),
    TaskCancelled(ScheduledTask),
    /// Emitted after every terminal transition.
    Progress { finished: usize, total: usize },
}

impl ExecutionEvent {
    /// Task the event refers to, if any.
    pub fn task(&self) -> Option<&ScheduledTask> {
        match self {
            ExecutionEvent::TaskStarted(task)
            | ExecutionEvent::TaskCompleted(task)
            | ExecutionEvent::TaskFailed(task)
            | ExecutionEvent::TaskCancelled(task) => Some(task),
            ExecutionEvent::Progress { .. } => None,
        }
    }
}
