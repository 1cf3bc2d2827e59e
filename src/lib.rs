// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::time::Duration;

use anyhow::{bail, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, PlanFile};
use crate::dag::build_execution_levels;
use crate::engine::{ExecutionPool, ExecutionResult, PoolConfig};
use crate::exec::command::command_from_payload;
use crate::exec::ShellExecutor;

pub use crate::dag::{ExecutionLevel, ScheduledTask};
pub use crate::engine::{AbortHandle, ExecutionEvent, TaskOutcome};
pub use crate::errors::DagPoolError;
pub use crate::exec::{TaskContext, TaskExecutor};
pub use crate::types::{Step, StepId, TaskStatus, Tool, ToolKind};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - plan loading and CLI overrides
/// - the execution pool with the shell executor
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let plan = load_and_validate(&args.plan)?;

    if args.dry_run {
        print_dry_run(&plan)?;
        return Ok(());
    }

    let config = pool_config(&plan, &args);
    let pool = ExecutionPool::new(config);

    // Ctrl-C → abort: unstarted steps are cancelled, running ones are killed.
    {
        let abort = pool.abort_handle();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("Ctrl+C received; aborting run");
            abort.abort();
        });
    }

    let result = pool.execute(&plan.steps, ShellExecutor::new()).await?;
    print_summary(&result);

    if !result.success {
        bail!("{} of {} steps failed", result.failed_count, result.tasks.len());
    }
    Ok(())
}

/// Pool settings from `[pool]`, with CLI flags taking precedence.
fn pool_config(plan: &PlanFile, args: &CliArgs) -> PoolConfig {
    let mut config = PoolConfig::from(&plan.pool);

    if let Some(n) = args.max_concurrency {
        config = config.with_max_concurrency(n);
    }
    if args.fail_fast {
        config = config.with_fail_fast(true);
    }
    if let Some(ms) = args.task_timeout_ms {
        config = config.with_task_timeout(Duration::from_millis(ms));
    }

    debug!(?config, "effective pool configuration");
    config
}

/// Print levels, weights and commands without running anything.
fn print_dry_run(plan: &PlanFile) -> Result<()> {
    let levels = build_execution_levels(&plan.steps)?;

    println!("dagpool dry-run");
    println!("  pool.max_concurrency = {}", plan.pool.max_concurrency);
    println!("  pool.fail_fast = {}", plan.pool.fail_fast);
    if let Some(ms) = plan.pool.task_timeout_ms {
        println!("  pool.task_timeout_ms = {ms}");
    }
    println!();

    for level in &levels {
        println!("level {} ({} steps):", level.level, level.tasks.len());
        for task in &level.tasks {
            println!(
                "  - {} [{}] weight={}",
                task.id(),
                task.tool(),
                task.critical_path_weight
            );
            if let Some(cmd) = command_from_payload(&task.step.payload) {
                println!("      cmd: {cmd}");
            }
            if !task.step.dependencies.is_empty() {
                println!("      after: {:?}", task.step.dependencies);
            }
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

fn print_summary(result: &ExecutionResult) {
    println!(
        "dagpool: {} completed, {} failed, {} cancelled in {}ms (critical path {}ms)",
        result.completed_count,
        result.failed_count,
        result.cancelled_count,
        result.total_duration_ms(),
        result.critical_path_ms(),
    );

    for task in &result.tasks {
        match &task.error {
            Some(err) => println!("  {} {}: {}", task.status, task.id(), err),
            None => println!("  {} {}", task.status, task.id()),
        }
    }
}
