// src/exec/command.rs

//! Shell command executor used by the `dagpool` binary.

use std::process::Stdio;

use anyhow::{anyhow, bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::exec::backend::{ExecFuture, TaskContext, TaskExecutor};

/// Runs each step's payload as a shell command.
///
/// The payload is either a string (`"cargo build"`) or a table with a `cmd`
/// key (`{ cmd = "cargo build" }`). The tool identifier is only used for
/// logging; audit and standard steps run the same way.
///
/// - stdout lines are logged at `info`, stderr lines at `debug`.
/// - A non-zero exit status fails the task.
/// - When the task's cancellation token fires (abort or timeout) the child
///   process is killed.
#[derive(Debug, Clone, Default)]
pub struct ShellExecutor;

impl ShellExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl TaskExecutor for ShellExecutor {
    fn execute(&self, ctx: TaskContext) -> ExecFuture {
        Box::pin(run_command(ctx))
    }
}

/// Extract the command line from a step payload.
pub fn command_from_payload(payload: &serde_json::Value) -> Option<&str> {
    match payload {
        serde_json::Value::String(cmd) => Some(cmd.as_str()),
        serde_json::Value::Object(map) => map.get("cmd").and_then(|v| v.as_str()),
        _ => None,
    }
}

async fn run_command(ctx: TaskContext) -> Result<()> {
    let cmd_line = command_from_payload(ctx.payload())
        .ok_or_else(|| anyhow!("step '{}' has no command in its payload", ctx.id()))?
        .to_string();

    info!(
        task = %ctx.id(),
        tool = %ctx.tool(),
        cmd = %cmd_line,
        "starting task process"
    );

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&cmd_line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&cmd_line);
        c
    };

    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for step '{}'", ctx.id()))?;

    if let Some(stdout) = child.stdout.take() {
        forward_lines(ctx.id().to_string(), stdout, false);
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(ctx.id().to_string(), stderr, true);
    }

    // Either the process exits on its own, or the task is cancelled.
    tokio::select! {
        status_res = child.wait() => {
            let status = status_res
                .with_context(|| format!("waiting for process of step '{}'", ctx.id()))?;
            let code = status.code().unwrap_or(-1);

            info!(
                task = %ctx.id(),
                exit_code = code,
                success = status.success(),
                "task process exited"
            );

            if !status.success() {
                bail!("command exited with status {code}");
            }
            Ok(())
        }

        _ = ctx.cancellation().cancelled() => {
            info!(task = %ctx.id(), "cancellation requested; killing process");
            if let Err(e) = child.kill().await {
                warn!(task = %ctx.id(), error = %e, "failed to kill child process on cancellation");
            }
            bail!("command cancelled before it exited");
        }
    }
}

fn forward_lines<R>(task: String, stream: R, is_stderr: bool)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if is_stderr {
                debug!(task = %task, "stderr: {}", line);
            } else {
                info!(task = %task, "stdout: {}", line);
            }
        }
    });
}
