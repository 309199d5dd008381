// ABOUTME: Defines the Executor trait - the injectable execution substrate.
// ABOUTME: Executors accept boxed tasks, stop accepting on shutdown, and can be drained.

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::ProcessorError;

/// A unit of work scheduled by a processor.
pub type Task = BoxFuture<'static, ()>;

/// A worker pool that runs scheduled tasks in parallel.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Schedule a task. Never blocks the caller.
    ///
    /// Returns `Err(ProcessorError::Closed)` after shutdown; the task is dropped.
    fn spawn(&self, task: Task) -> Result<(), ProcessorError>;

    /// Stop accepting new tasks. Already accepted tasks keep running.
    ///
    /// Calling this more than once is a no-op.
    fn shutdown(&self);

    /// Returns true once `shutdown` has been called.
    fn is_shutdown(&self) -> bool;

    /// Shut down and wait until every accepted task has finished.
    async fn drain(&self);

    /// Number of accepted tasks that have not finished yet.
    fn active_tasks(&self) -> usize;
}
