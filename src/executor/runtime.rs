// ABOUTME: Executor that owns a fixed-size multi-thread tokio runtime.
// ABOUTME: Queued tasks drain on a background thread when the executor is dropped.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio_util::task::TaskTracker;

use super::{Executor, Task};
use crate::config::ProcessorConfig;
use crate::error::ProcessorError;

/// Executor owning its own worker pool.
///
/// This is the default substrate for a processor. The pool has a fixed number
/// of worker threads, one per available CPU unless configured otherwise.
pub struct RuntimeExecutor {
    runtime: Option<Runtime>,
    handle: Handle,
    tracker: TaskTracker,
    worker_threads: usize,
    thread_name: String,
}

impl RuntimeExecutor {
    /// Create a pool with `worker_threads` threads and the default thread name.
    pub fn new(worker_threads: usize) -> Result<Self, ProcessorError> {
        Self::from_config(&ProcessorConfig::new().with_worker_threads(worker_threads))
    }

    /// Create a pool from a config.
    pub fn from_config(config: &ProcessorConfig) -> Result<Self, ProcessorError> {
        let worker_threads = config.resolved_worker_threads()?;
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .thread_name(config.thread_name.clone())
            .enable_all()
            .build()?;

        tracing::debug!(
            worker_threads,
            thread_name = %config.thread_name,
            "executor.start"
        );

        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
            tracker: TaskTracker::new(),
            worker_threads,
            thread_name: config.thread_name.clone(),
        })
    }

    /// Number of worker threads in the pool.
    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    /// Handle to the owned runtime.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

#[async_trait]
impl Executor for RuntimeExecutor {
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

impl Drop for RuntimeExecutor {
    fn drop(&mut self) {
        let Some(runtime) = self.runtime.take() else {
            return;
        };
        self.tracker.close();

        if self.tracker.is_empty() {
            runtime.shutdown_background();
            return;
        }

        // A runtime must not be dropped from inside an async context, so the
        // remaining tasks are awaited on a dedicated thread.
        let tracker = self.tracker.clone();
        let pending = tracker.len();
        let parked = Arc::new(Mutex::new(Some(runtime)));
        let handoff = Arc::clone(&parked);
        let spawned = std::thread::Builder::new()
            .name(format!("{}-drain", self.thread_name))
            .spawn(move || {
                let runtime = handoff.lock().take();
                if let Some(runtime) = runtime {
                    runtime.block_on(tracker.wait());
                    runtime.shutdown_background();
                }
            });

        match spawned {
            Ok(_) => tracing::debug!(pending, "executor.drain_on_drop"),
            Err(e) => {
                tracing::warn!(error = %e, pending, "executor.drain_thread_failed");
                shutdown_parked(&parked);
            }
        }
    }
}

/// Shut down a runtime without blocking, if it is still parked.
pub(super) fn shutdown_parked(parked: &Mutex<Option<Runtime>>) {
    let runtime = parked.lock().take();
    if let Some(runtime) = runtime {
        runtime.shutdown_background();
    }
}
