// src/dag/task_info.rs

//! Scheduled task wrapper around an immutable [`Step`].

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::types::{Step, TaskStatus, Tool};

/// A step plus the scheduler-owned state for one run.
///
/// Only the control loop mutates these; executors and event consumers receive
/// clones, which are snapshots of the moment they were taken.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub step: Arc<Step>,
    pub status: TaskStatus,
    /// 0-based depth in the dependency graph.
    pub level: usize,
    /// Length, in steps, of the longest dependent chain starting here
    /// (this task included).
    pub critical_path_weight: usize,
    /// Failure message or cancellation reason.
    pub error: Option<String>,
    pub started_at: Option<Instant>,
    pub ended_at: Option<Instant>,
}

impl ScheduledTask {
    pub(crate) fn new(step: Arc<Step>, level: usize, critical_path_weight: usize) -> Self {
        Self {
            step,
            status: TaskStatus::Ready,
            level,
            critical_path_weight,
            error: None,
            started_at: None,
            ended_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.step.id
    }

    pub fn tool(&self) -> &Tool {
        &self.step.tool
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Measured execution time; `None` unless the task ran to settlement.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some(end.saturating_duration_since(start)),
            _ => None,
        }
    }
}
