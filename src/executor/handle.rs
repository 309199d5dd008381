// ABOUTME: Executor that schedules onto a caller-owned tokio runtime.
// ABOUTME: Shutdown only stops acceptance; the runtime's lifetime belongs to the caller.

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;

use super::{Executor, Task};
use crate::error::ProcessorError;

/// Executor backed by a handle to an existing runtime.
///
/// Use this to share one pool between several processors, or to run a
/// processor on the runtime a test or application already has.
#[derive(Debug, Clone)]
pub struct HandleExecutor {
    handle: Handle,
    tracker: TaskTracker,
}

impl HandleExecutor {
    /// Create an executor that spawns onto `handle`.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            tracker: TaskTracker::new(),
        }
    }

    /// Create an executor on the runtime driving the current thread.
    ///
    /// Returns `Err(ProcessorError::NoRuntime)` outside a runtime.
    pub fn current() -> Result<Self, ProcessorError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| ProcessorError::NoRuntime)
    }
}

#[async_trait]
impl Executor for HandleExecutor {
    fn spawn(&self, task: Task) -> Result<(), ProcessorError> {
        if self.tracker.is_closed() {
            return Err(ProcessorError::Closed);
        }
        self.handle.spawn(self.tracker.track_future(task));
        Ok(())
    }

    fn shutdown(&self) {
        if !self.tracker.close() {
            return;
        }
        tracing::debug!(pending = self.tracker.len(), "executor.shutdown");
    }

    fn is_shutdown(&self) -> bool {
        self.tracker.is_closed()
    }

    async fn drain(&self) {
        self.shutdown();
        self.tracker.wait().await;
    }

    fn active_tasks(&self) -> usize {
        self.tracker.len()
    }
}
