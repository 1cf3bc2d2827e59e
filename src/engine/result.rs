// src/engine/result.rs

//! Terminal report of one run.

use std::time::Duration;

use crate::dag::ScheduledTask;
use crate::types::TaskStatus;

/// Final report returned by [`ExecutionPool::execute`](crate::engine::ExecutionPool::execute).
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// True iff no task failed. Cancellations alone do not flip it.
    pub success: bool,
    pub completed_count: usize,
    pub failed_count: usize,
    pub cancelled_count: usize,
    /// Every task, in level order (audit steps first within a level).
    pub tasks: Vec<ScheduledTask>,
    /// Wall clock from the first task start to the last settlement.
    pub total_duration: Duration,
    /// Measured duration along the heaviest executed chain.
    pub critical_path: Duration,
}

impl ExecutionResult {
    /// Report of a run with no tasks.
    pub fn empty() -> Self {
        Self::from_tasks(Vec::new(), Duration::ZERO)
    }

    pub(crate) fn from_tasks(tasks: Vec<ScheduledTask>, critical_path: Duration) -> Self {
        let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();
        let completed_count = count(TaskStatus::Completed);
        let failed_count = count(TaskStatus::Failed);
        let cancelled_count = count(TaskStatus::Cancelled);

        let first_start = tasks.iter().filter_map(|t| t.started_at).min();
        let last_end = tasks.iter().filter_map(|t| t.ended_at).max();
        let total_duration = match (first_start, last_end) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            _ => Duration::ZERO,
        };

        Self {
            success: failed_count == 0,
            completed_count,
            failed_count,
            cancelled_count,
            tasks,
            total_duration,
            critical_path,
        }
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration.as_millis() as u64
    }

    pub fn critical_path_ms(&self) -> u64 {
        self.critical_path.as_millis() as u64
    }

    pub fn task(&self, id: &str) -> Option<&ScheduledTask> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    /// Status of the task for `id`, if it exists.
    pub fn status_of(&self, id: &str) -> Option<TaskStatus> {
        self.task(id).map(|t| t.status)
    }

    pub fn tasks_with_status(&self, status: TaskStatus) -> impl Iterator<Item = &ScheduledTask> {
        self.tasks.iter().filter(move |t| t.status == status)
    }
}
