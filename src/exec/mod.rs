// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`backend`] provides the `TaskExecutor` trait that the pool calls for
//!   every admitted task, and the `TaskContext` handed to it.
//! - [`task_runner`] runs one invocation in a worker, racing it against the
//!   optional timeout, and reports the settlement to the control loop.
//! - [`command`] contains `ShellExecutor`, which runs step payloads with
//!   `tokio::process::Command` (used by the `dagpool` binary).

pub mod backend;
pub mod command;
pub mod task_runner;

pub use backend::{ExecFuture, TaskContext, TaskExecutor};
pub use command::ShellExecutor;
pub use task_runner::run_task;
