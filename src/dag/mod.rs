// src/dag/mod.rs

//! DAG representation and scheduling.
//!
//! - [`graph`] holds the dependency graph of a step list, by input index.
//! - [`levels`] computes execution levels, critical-path weights and the
//!   audit-first ordering, and rejects cycles.
//! - [`task_info`] provides the scheduled task type.
//! - [`scheduler`] contains the per-run state machine that decides which
//!   tasks are ready to run and what a settlement changes.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod graph;
pub mod levels;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use graph::DagGraph;
pub use levels::{build_execution_levels, flatten_tasks, ExecutionLevel};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::ScheduledTask;
