use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::bail;
use dagpool::exec::{ExecFuture, TaskContext, TaskExecutor};

/// What a scripted task does once it starts.
#[derive(Debug, Clone)]
pub enum Behaviour {
    /// Sleep for the configured delay, then succeed.
    Succeed,
    /// Sleep for the configured delay, then return an error.
    Fail(String),
    /// Sleep for the configured delay, then panic.
    Panic(String),
    /// Never settle on its own.
    Hang,
    /// Abort the whole pool, then sleep for the delay and succeed.
    AbortPool,
    /// Wait for the task's cancellation token, record it and return an error.
    UntilCancelled,
}

#[derive(Debug, Clone)]
struct Script {
    delay: Option<Duration>,
    behaviour: Behaviour,
}

/// Shared bookkeeping of everything the executor saw.
#[derive(Debug, Default)]
struct Recorder {
    started: Mutex<Vec<String>>,
    finished: Mutex<Vec<String>>,
    observed_cancellation: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Decrements the in-flight counter even when the executor future is
/// aborted or panics.
struct InFlightGuard {
    recorder: Arc<Recorder>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.recorder.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A fake executor that:
/// - records the order in which tasks start and finish
/// - tracks how many invocations are in flight (and the peak)
/// - sleeps, fails, panics, hangs or aborts the pool per task id.
///
/// Clones share their recordings, so keep one clone for assertions and hand
/// the other to the pool.
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    default_delay: Duration,
    scripts: HashMap<String, Script>,
    recorder: Arc<Recorder>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay used by tasks without their own script.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    /// Give `id` its own delay, keeping its behaviour.
    pub fn delay(mut self, id: &str, delay: Duration) -> Self {
        self.script_mut(id).delay = Some(delay);
        self
    }

    pub fn fail(self, id: &str, message: &str) -> Self {
        self.behave(id, Behaviour::Fail(message.to_string()))
    }

    pub fn panic(self, id: &str, message: &str) -> Self {
        self.behave(id, Behaviour::Panic(message.to_string()))
    }

    pub fn hang(self, id: &str) -> Self {
        self.behave(id, Behaviour::Hang)
    }

    pub fn abort_pool(self, id: &str) -> Self {
        self.behave(id, Behaviour::AbortPool)
    }

    pub fn until_cancelled(self, id: &str) -> Self {
        self.behave(id, Behaviour::UntilCancelled)
    }

    pub fn behave(mut self, id: &str, behaviour: Behaviour) -> Self {
        self.script_mut(id).behaviour = behaviour;
        self
    }

    /// Ids in the order their executor invocations started.
    pub fn started(&self) -> Vec<String> {
        self.recorder.started.lock().unwrap().clone()
    }

    /// Ids in the order their executor invocations returned.
    pub fn finished(&self) -> Vec<String> {
        self.recorder.finished.lock().unwrap().clone()
    }

    /// Ids of tasks that saw their cancellation token fire.
    pub fn observed_cancellation(&self) -> Vec<String> {
        self.recorder.observed_cancellation.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.recorder.started.lock().unwrap().len()
    }

    /// Highest number of invocations that were running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.recorder.peak.load(Ordering::SeqCst)
    }

    fn script_mut(&mut self, id: &str) -> &mut Script {
        self.scripts.entry(id.to_string()).or_insert(Script {
            delay: None,
            behaviour: Behaviour::Succeed,
        })
    }
}

impl TaskExecutor for RecordingExecutor {
    fn execute(&self, ctx: TaskContext) -> ExecFuture {
        let script = self.scripts.get(ctx.id()).cloned().unwrap_or(Script {
            delay: None,
            behaviour: Behaviour::Succeed,
        });
        let delay = script.delay.unwrap_or(self.default_delay);
        let recorder = Arc::clone(&self.recorder);

        Box::pin(async move {
            let id = ctx.id().to_string();
            recorder.started.lock().unwrap().push(id.clone());
            let now = recorder.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            recorder.peak.fetch_max(now, Ordering::SeqCst);
            let _guard = InFlightGuard {
                recorder: Arc::clone(&recorder),
            };

            match script.behaviour {
                Behaviour::Hang => std::future::pending::<()>().await,
                Behaviour::UntilCancelled => {
                    ctx.cancellation().cancelled().await;
                    recorder.observed_cancellation.lock().unwrap().push(id.clone());
                    recorder.finished.lock().unwrap().push(id.clone());
                    bail!("{id} stopped after cancellation");
                }
                Behaviour::AbortPool => ctx.abort_handle().abort(),
                _ => {}
            }

            tokio::time::sleep(delay).await;
            recorder.finished.lock().unwrap().push(id.clone());

            match script.behaviour {
                Behaviour::Fail(message) => bail!(message),
                Behaviour::Panic(message) => panic!("{message}"),
                _ => Ok(()),
            }
        })
    }
}
