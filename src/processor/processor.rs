// ABOUTME: Implements CoalescingProcessor - one run in flight per key, latest submission wins.
// ABOUTME: Submissions are counted per key; stale ones are skipped when their turn comes.

use std::any::Any;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use super::handle::{Outcome, SubmissionHandle, SubmissionResult};
use super::operation::Operation;
use super::table::{SubmissionTable, Ticket};
use crate::config::ProcessorConfig;
use crate::error::ProcessorError;
use crate::executor::{Executor, RuntimeExecutor};

/// Runs an operation per submitted `(item, key)` pair with per-key coalescing.
///
/// # Guarantees
///
/// - **Single flight:** the operation never runs twice at the same time for one key.
/// - **Latest wins:** of the submissions that pile up while a run for a key is in
///   progress, only the most recent one runs next; the others resolve as
///   [`Outcome::Skipped`].
/// - **Independent keys:** runs for different keys proceed in parallel on the
///   executor's worker pool.
///
/// Each processor owns its own submission table, so separate instances never
/// interfere with each other.
pub struct CoalescingProcessor<T, K>
where
    T: Send + 'static,
    K: Send + Sync + 'static,
{
    op: Arc<dyn Operation<T, K>>,
    table: Arc<SubmissionTable<K>>,
    executor: Arc<dyn Executor>,
}

impl<T, K> CoalescingProcessor<T, K>
where
    T: Send + 'static,
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    /// Create a processor with a worker pool sized to the available CPUs.
    pub fn new(op: impl Operation<T, K> + 'static) -> Result<Self, ProcessorError> {
        Self::with_config(op, &ProcessorConfig::default())
    }

    /// Create a processor with a worker pool built from `config`.
    pub fn with_config(
        op: impl Operation<T, K> + 'static,
        config: &ProcessorConfig,
    ) -> Result<Self, ProcessorError> {
        let executor = RuntimeExecutor::from_config(config)?;
        Ok(Self::with_executor(op, Arc::new(executor)))
    }

    /// Create a processor scheduling onto an existing executor.
    ///
    /// [`close`](Self::close) shuts the executor down, including for any
    /// other user sharing it.
    pub fn with_executor(op: impl Operation<T, K> + 'static, executor: Arc<dyn Executor>) -> Self {
        Self {
            op: Arc::new(op),
            table: Arc::new(SubmissionTable::new()),
            executor,
        }
    }

    /// Submit an item for asynchronous processing. Never blocks.
    ///
    /// Returning only means the submission is counted; await the handle to
    /// learn whether it executed, was skipped, or failed. If the processor is
    /// closed the handle resolves to `Err(ProcessorError::Closed)`.
    pub fn submit(&self, item: T, key: K) -> SubmissionHandle {
        let ticket = match self.register(key) {
            Ok(ticket) => ticket,
            Err(e) => return SubmissionHandle::resolved(Err(e)),
        };
        let seq = ticket.seq();

        let (tx, handle) = SubmissionHandle::channel();
        let op = Arc::clone(&self.op);
        let task = async move {
            let result = run_slot(op.as_ref(), item, ticket).await;
            // The caller may have dropped the handle.
            let _ = tx.send(result);
        };

        // A refused task is dropped inside `spawn`, which retires its ticket.
        match self.executor.spawn(Box::pin(task)) {
            Ok(()) => {
                tracing::trace!(seq, "coalesce.submit");
                handle
            }
            Err(e) => SubmissionHandle::resolved(Err(e)),
        }
    }

    /// Process an item on the calling task and wait for the result.
    ///
    /// Accounting is identical to [`submit`](Self::submit); the difference is
    /// that the run happens inline instead of on the worker pool.
    pub async fn process(&self, item: T, key: K) -> SubmissionResult {
        let ticket = self.register(key)?;
        run_slot(self.op.as_ref(), item, ticket).await
    }

    /// Submit an item and block the current thread until it resolves.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context; use
    /// [`process`](Self::process) there.
    pub fn process_blocking(&self, item: T, key: K) -> SubmissionResult {
        self.submit(item, key).blocking_wait()
    }

    /// Stop accepting submissions. Queued and running work still completes.
    ///
    /// Calling this more than once is a no-op.
    pub fn close(&self) {
        if self.table.close() {
            tracing::debug!(pending_keys = self.pending_keys(), "coalesce.close");
        }
        self.executor.shutdown();
    }

    /// Close and wait until every scheduled task has finished.
    pub async fn drain(&self) {
        self.close();
        self.executor.drain().await;
    }

    /// Returns true once no further submissions are accepted.
    pub fn is_closed(&self) -> bool {
        self.table.is_closed() || self.executor.is_shutdown()
    }

    /// Number of keys with at least one queued or running submission.
    pub fn pending_keys(&self) -> usize {
        self.table.len()
    }

    /// Returns true if `key` has a queued or running submission.
    pub fn is_pending(&self, key: &K) -> bool {
        self.table.contains(key)
    }

    /// The executor this processor schedules onto.
    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    fn register(&self, key: K) -> Result<Ticket<K>, ProcessorError> {
        if self.executor.is_shutdown() {
            return Err(ProcessorError::Closed);
        }
        self.table.register(key)
    }
}

/// Body of one submission: skip if superseded, otherwise run.
///
/// The ticket is dropped on every exit, including when this future is
/// dropped while waiting for the key's lock or mid-run.
async fn run_slot<T, K>(op: &dyn Operation<T, K>, item: T, ticket: Ticket<K>) -> SubmissionResult
where
    T: Send + 'static,
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    let seq = ticket.seq();
    let _exclusive = ticket.slot().exclusive().lock().await;

    if !ticket.claim() {
        tracing::trace!(seq, "coalesce.skip");
        return Ok(Outcome::Skipped);
    }

    let result = AssertUnwindSafe(op.run(item, ticket.key()))
        .catch_unwind()
        .await;

    match result {
        Ok(Ok(())) => {
            tracing::trace!(seq, "coalesce.executed");
            Ok(Outcome::Executed)
        }
        Ok(Err(e)) => {
            tracing::debug!(seq, error = %e, "coalesce.failed");
            Err(ProcessorError::Operation(e))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(seq, %message, "coalesce.panicked");
            Err(ProcessorError::Panicked(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
