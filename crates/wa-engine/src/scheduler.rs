//! Named, cancellable scheduled tasks.
//!
//! Every timer in the engine is a [`ScheduledTask`] held in a [`TaskSlot`].
//! Replacing the task in a slot cancels the previous one, so starting a
//! timer twice never leaves two instances running. A repeating task stops
//! itself by returning [`ControlFlow::Break`] from its tick; it never
//! reaches back into its own slot.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A spawned timer task with its cancellation token.
///
/// Dropping the task cancels it.
pub struct ScheduledTask {
    name: &'static str,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Run `tick` every `period`, first after one full period.
    ///
    /// A tick in progress is abandoned when the task is cancelled.
    pub fn repeating<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = interval.tick() => {}
                }
                let flow = tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    flow = tick() => flow,
                };
                if flow.is_break() {
                    debug!(task = name, "timer stopped itself");
                    break;
                }
            }
        });
        Self {
            name,
            cancel,
            handle,
        }
    }

    /// Run `fut` once after `delay`.
    pub fn delayed<Fut>(name: &'static str, delay: Duration, fut: Fut) -> Self
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {}
                () = async { time::sleep(delay).await; fut.await } => {}
            }
        });
        Self {
            name,
            cancel,
            handle,
        }
    }

    /// Run `fut` now, cancellable.
    pub fn immediate<Fut>(name: &'static str, fut: Fut) -> Self
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::delayed(name, Duration::ZERO, fut)
    }

    /// Task name, for logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the task has returned.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Holds at most one running instance of a named timer.
pub struct TaskSlot {
    name: &'static str,
    current: Mutex<Option<ScheduledTask>>,
}

impl TaskSlot {
    /// Empty slot.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            current: Mutex::new(None),
        }
    }

    /// Install `task`, cancelling whatever was there.
    pub fn replace(&self, task: ScheduledTask) {
        if let Some(previous) = self.current.lock().replace(task) {
            if !previous.is_finished() {
                debug!(slot = self.name, task = previous.name(), "restarting timer");
            }
        }
    }

    /// Cancel and clear the slot.
    pub fn cancel(&self) {
        if let Some(task) = self.current.lock().take() {
            task.cancel();
        }
    }

    /// Whether a task is installed and still running.
    pub fn is_running(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
