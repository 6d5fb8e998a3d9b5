//! Owned handles for repeating background tasks.

use std::future::Future;
use tokio::task::JoinHandle;

/// A spawned repeating task that is aborted when the guard is released or
/// dropped. Holding the guard is the only way to keep the task alive.
#[derive(Debug)]
pub struct TimerGuard {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl TimerGuard {
    /// Spawn `task` on the current tokio runtime.
    pub fn spawn<F>(name: &'static str, task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::debug!(timer = name, "timer started");
        Self {
            name,
            handle: tokio::spawn(task),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The task ran to completion or was aborted.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the task now.
    pub fn release(self) {}
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            tracing::debug!(timer = self.name, "timer released");
        }
        self.handle.abort();
    }
}
