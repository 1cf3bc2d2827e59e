// src/dag/state_manager.rs

//! Per-run state transitions for scheduled tasks.

use tokio::time::Instant;
use tracing::debug;

use crate::dag::DagGraph;
use crate::dag::task_info::ScheduledTask;
use crate::types::TaskStatus;

/// Applies state transitions to the task table of one run.
///
/// Tasks are addressed by input index, like the nodes of the [`DagGraph`].
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut [ScheduledTask],
    /// Number of dependencies of each task that have not completed yet.
    pending_deps: &'a mut [usize],
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a DagGraph,
        tasks: &'a mut [ScheduledTask],
        pending_deps: &'a mut [usize],
    ) -> Self {
        Self {
            graph,
            tasks,
            pending_deps,
        }
    }

    /// Whether every resolved dependency of `index` has completed.
    pub fn deps_satisfied(&self, index: usize) -> bool {
        self.pending_deps[index] == 0
    }

    /// Record a successful settlement and release the dependents.
    pub fn mark_completed(&mut self, index: usize, now: Instant) {
        let task = &mut self.tasks[index];
        task.status = TaskStatus::Completed;
        task.ended_at = Some(now);

        for &dependent in self.graph.dependents_of(index) {
            self.pending_deps[dependent] = self.pending_deps[dependent].saturating_sub(1);
        }
    }

    pub fn mark_failed(&mut self, index: usize, message: String, now: Instant) {
        let task = &mut self.tasks[index];
        task.status = TaskStatus::Failed;
        task.error = Some(message);
        task.ended_at = Some(now);
    }

    /// Cancel every not-yet-started task that transitively depends on
    /// `root`, directly or through other cancelled tasks.
    ///
    /// Returns the newly cancelled indices; `root` itself is not included.
    pub fn cancel_dependents(&mut self, root: usize) -> Vec<usize> {
        let mut stack = vec![root];
        let mut newly_cancelled = Vec::new();

        while let Some(upstream) = stack.pop() {
            let reason = match self.tasks[upstream].status {
                TaskStatus::Failed => {
                    format!("dependency '{}' failed", self.graph.id_of(upstream))
                }
                _ => format!("dependency '{}' was cancelled", self.graph.id_of(upstream)),
            };

            for &dependent in self.graph.dependents_of(upstream) {
                let task = &mut self.tasks[dependent];
                if task.status != TaskStatus::Ready {
                    continue;
                }

                debug!(
                    task = %task.step.id,
                    upstream = %self.graph.id_of(upstream),
                    "cancelling dependent of unsuccessful task"
                );
                task.status = TaskStatus::Cancelled;
                task.error = Some(reason.clone());
                newly_cancelled.push(dependent);
                stack.push(dependent);
            }
        }

        newly_cancelled
    }

    /// Cancel every task in `order` that has not started yet.
    pub fn cancel_unstarted(&mut self, order: &[usize], reason: &str) -> Vec<usize> {
        let mut newly_cancelled = Vec::new();

        for &index in order {
            let task = &mut self.tasks[index];
            if task.status == TaskStatus::Ready {
                task.status = TaskStatus::Cancelled;
                task.error = Some(reason.to_string());
                newly_cancelled.push(index);
            }
        }

        if !newly_cancelled.is_empty() {
            debug!(count = newly_cancelled.len(), reason, "cancelled unstarted tasks");
        }

        newly_cancelled
    }

    /// Walk `order` and mark up to `limit` eligible tasks as `Running`.
    ///
    /// A task is eligible when it is still `Ready` and every one of its own
    /// dependencies has completed; siblings on the same level do not matter.
    pub fn collect_ready(&mut self, order: &[usize], limit: usize, now: Instant) -> Vec<usize> {
        let mut ready = Vec::new();

        for &index in order {
            if ready.len() >= limit {
                break;
            }
            if self.tasks[index].status != TaskStatus::Ready || !self.deps_satisfied(index) {
                continue;
            }

            let task = &mut self.tasks[index];
            debug!(
                task = %task.step.id,
                level = task.level,
                weight = task.critical_path_weight,
                "dependencies satisfied; marking Running"
            );
            task.status = TaskStatus::Running;
            task.started_at = Some(now);
            ready.push(index);
        }

        ready
    }
}
