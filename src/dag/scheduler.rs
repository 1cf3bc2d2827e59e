use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::levels::LevelPlan;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::StateManager;
use crate::dag::task_info::ScheduledTask;
use crate::engine::TaskOutcome;
use crate::errors::Result;
use crate::types::{Step, TaskStatus};

/// Scheduler holds the immutable DAG plus the mutable state of one run.
///
/// It is responsible for:
/// - deciding which tasks are eligible (all of their own deps completed)
/// - admitting eligible tasks up to the concurrency ceiling, in level
///   order with audit steps first
/// - recording settlements and cancelling dependents of failed tasks
/// - fail-fast and abort handling
///
/// It performs no IO and reads no clock; every time-dependent call takes
/// an explicit `now`.
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    /// Task table, by input index.
    tasks: Vec<ScheduledTask>,
    /// Input indices in admission priority order.
    order: Vec<usize>,
    pending_deps: Vec<usize>,
    max_concurrency: usize,
    fail_fast: bool,
    /// False once fail-fast tripped or the run was aborted.
    admitting: bool,
    in_flight: usize,
    finished: usize,
}

impl Scheduler {
    /// Build a scheduler for `steps`.
    ///
    /// Structural errors (cycles, duplicate ids) are returned here, before
    /// any task can be admitted. A `max_concurrency` of 0 is treated as 1.
    pub fn new(steps: &[Step], max_concurrency: usize, fail_fast: bool) -> Result<Self> {
        let plan = LevelPlan::build(steps)?;

        let tasks: Vec<ScheduledTask> = (0..steps.len()).map(|i| plan.task(i)).collect();
        let order = plan.flattened_order();
        let pending_deps = (0..steps.len())
            .map(|i| plan.graph.dependencies_of(i).len())
            .collect();

        if max_concurrency == 0 {
            warn!("max_concurrency of 0 requested; using 1");
        }

        Ok(Self {
            graph: plan.graph,
            tasks,
            order,
            pending_deps,
            max_concurrency: max_concurrency.max(1),
            fail_fast,
            admitting: true,
            in_flight: 0,
            finished: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Number of tasks currently `Running`.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Number of tasks in a terminal state.
    pub fn finished_count(&self) -> usize {
        self.finished
    }

    /// Whether new tasks may still be admitted.
    pub fn is_admitting(&self) -> bool {
        self.admitting
    }

    pub fn is_finished(&self) -> bool {
        self.finished == self.tasks.len()
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Snapshot of the task for `id`.
    pub fn task(&self, id: &str) -> Option<&ScheduledTask> {
        self.graph.index_of(id).map(|i| &self.tasks[i])
    }

    /// Whether all dependencies of `id` have completed. `None` for unknown ids.
    pub fn deps_satisfied(&self, id: &str) -> Option<bool> {
        let index = self.graph.index_of(id)?;
        Some(self.pending_deps[index] == 0)
    }

    /// Tasks in admission priority order.
    pub fn tasks(&self) -> impl Iterator<Item = &ScheduledTask> {
        self.order.iter().map(|&i| &self.tasks[i])
    }

    /// Admit as many eligible tasks as free slots allow.
    pub fn step_admit(&mut self, now: Instant) -> SchedulerStep {
        let mut step = SchedulerStep {
            newly_started: self.admit_ready(now),
            ..SchedulerStep::default()
        };
        step.run_just_finished = self.is_finished();
        step
    }

    /// Record the outcome of a running task, cascade cancellations, apply
    /// fail-fast, then admit whatever became eligible.
    ///
    /// Settlements for unknown or non-running tasks are ignored.
    pub fn step_completion(&mut self, id: &str, outcome: TaskOutcome, now: Instant) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        let index = match self.graph.index_of(id) {
            Some(i) if self.tasks[i].status == TaskStatus::Running => i,
            Some(_) => {
                warn!(task = %id, "settlement for a task that is not running; ignoring");
                return step;
            }
            None => {
                warn!(task = %id, "settlement for unknown task; ignoring");
                return step;
            }
        };

        self.in_flight -= 1;
        self.finished += 1;

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, &mut self.pending_deps);
        match outcome.into_error() {
            None => {
                manager.mark_completed(index, now);
                let task = &self.tasks[index];
                info!(
                    task = %id,
                    elapsed_ms = task.duration().unwrap_or_default().as_millis() as u64,
                    "task completed"
                );
                step.newly_completed.push(task.clone());
            }
            Some(message) => {
                warn!(task = %id, error = %message, "task failed; cancelling dependents");
                manager.mark_failed(index, message, now);
                let mut cancelled = manager.cancel_dependents(index);

                if self.fail_fast && self.admitting {
                    info!(task = %id, "fail-fast: stopping admission of new tasks");
                    self.admitting = false;
                    let reason = format!("fail-fast: step '{id}' failed");
                    let mut manager =
                        StateManager::new(&self.graph, &mut self.tasks, &mut self.pending_deps);
                    cancelled.extend(manager.cancel_unstarted(&self.order, &reason));
                }

                step.newly_failed.push(self.tasks[index].clone());
                self.finished += cancelled.len();
                step.newly_cancelled = self.snapshots(&cancelled);
            }
        }

        step.newly_started = self.admit_ready(now);
        step.run_just_finished = self.is_finished();
        step
    }

    /// Stop admitting and cancel every task that has not started.
    ///
    /// Running tasks are left alone; their settlements are still recorded.
    pub fn step_abort(&mut self, reason: &str) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        if self.admitting {
            info!(reason, in_flight = self.in_flight, "aborting run");
        }
        self.admitting = false;

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, &mut self.pending_deps);
        let cancelled = manager.cancel_unstarted(&self.order, reason);
        self.finished += cancelled.len();

        step.newly_cancelled = self.snapshots(&cancelled);
        step.run_just_finished = self.is_finished();
        step
    }

    /// Sum of measured durations along the executed chain with the highest
    /// critical-path weight.
    ///
    /// The chain starts at the executed task with the highest weight and
    /// repeatedly follows its executed dependent with the highest weight.
    /// Ties go to the task that comes first in admission order.
    pub fn critical_path(&self) -> Duration {
        let rank: Vec<usize> = {
            let mut rank = vec![0; self.tasks.len()];
            for (position, &i) in self.order.iter().enumerate() {
                rank[i] = position;
            }
            rank
        };
        let heaviest = |candidates: &mut dyn Iterator<Item = usize>| {
            candidates
                .filter(|&i| self.tasks[i].duration().is_some())
                .min_by_key(|&i| (std::cmp::Reverse(self.tasks[i].critical_path_weight), rank[i]))
        };

        let mut total = Duration::ZERO;
        let mut current = heaviest(&mut self.order.iter().copied());
        while let Some(i) = current {
            total += self.tasks[i].duration().unwrap_or_default();
            current = heaviest(&mut self.graph.dependents_of(i).iter().copied());
        }
        total
    }

    /// Consume the scheduler, returning the tasks in admission order.
    pub fn into_tasks(self) -> Vec<ScheduledTask> {
        let mut slots: Vec<Option<ScheduledTask>> = self.tasks.into_iter().map(Some).collect();
        self.order
            .iter()
            .filter_map(|&i| slots[i].take())
            .collect()
    }

    fn admit_ready(&mut self, now: Instant) -> Vec<ScheduledTask> {
        if !self.admitting || self.in_flight >= self.max_concurrency {
            return Vec::new();
        }

        let limit = self.max_concurrency - self.in_flight;
        let mut manager = StateManager::new(&self.graph, &mut self.tasks, &mut self.pending_deps);
        let admitted = manager.collect_ready(&self.order, limit, now);
        self.in_flight += admitted.len();

        if !admitted.is_empty() {
            debug!(
                admitted = admitted.len(),
                in_flight = self.in_flight,
                max_concurrency = self.max_concurrency,
                "admitted ready tasks"
            );
        }

        self.snapshots(&admitted)
    }

    fn snapshots(&self, indices: &[usize]) -> Vec<ScheduledTask> {
        indices.iter().map(|&i| self.tasks[i].clone()).collect()
    }
}
