// ABOUTME: Implements SubmissionHandle and Outcome for asynchronous submissions.
// ABOUTME: A handle resolves once its task has executed, been skipped, or failed.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::ProcessorError;

/// What happened to a submission that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The operation ran to completion for this submission.
    Executed,
    /// A newer submission for the same key superseded this one.
    Skipped,
}

impl Outcome {
    /// Returns true if the operation ran for this submission.
    pub fn is_executed(&self) -> bool {
        matches!(self, Outcome::Executed)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Executed => write!(f, "executed"),
            Outcome::Skipped => write!(f, "skipped"),
        }
    }
}

/// Result a submission resolves to.
pub type SubmissionResult = Result<Outcome, ProcessorError>;

enum HandleState {
    Waiting(oneshot::Receiver<SubmissionResult>),
    Resolved(Option<SubmissionResult>),
}

/// Handle returned by [`CoalescingProcessor::submit`](super::CoalescingProcessor::submit).
///
/// Await it to learn the submission's fate, or call [`blocking_wait`](Self::blocking_wait)
/// from synchronous code. Dropping the handle does not cancel the submission.
pub struct SubmissionHandle {
    state: HandleState,
}

impl SubmissionHandle {
    /// Create a handle and the sender its task resolves it through.
    pub(crate) fn channel() -> (oneshot::Sender<SubmissionResult>, Self) {
        let (tx, rx) = oneshot::channel();
        (
            tx,
            Self {
                state: HandleState::Waiting(rx),
            },
        )
    }

    /// Create a handle that is already resolved.
    pub(crate) fn resolved(result: SubmissionResult) -> Self {
        Self {
            state: HandleState::Resolved(Some(result)),
        }
    }

    /// Block the current thread until the submission resolves.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn blocking_wait(self) -> SubmissionResult {
        match self.state {
            HandleState::Waiting(rx) => rx
                .blocking_recv()
                .unwrap_or(Err(ProcessorError::Interrupted)),
            HandleState::Resolved(result) => result.unwrap_or(Err(ProcessorError::Interrupted)),
        }
    }
}

impl Future for SubmissionHandle {
    type Output = SubmissionResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            HandleState::Waiting(rx) => Pin::new(rx)
                .poll(cx)
                .map(|received| received.unwrap_or(Err(ProcessorError::Interrupted))),
            // Polled again after completion: nothing left to hand out.
            HandleState::Resolved(result) => {
                Poll::Ready(result.take().unwrap_or(Err(ProcessorError::Interrupted)))
            }
        }
    }
}

impl std::fmt::Debug for SubmissionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            HandleState::Waiting(_) => "waiting",
            HandleState::Resolved(Some(_)) => "resolved",
            HandleState::Resolved(None) => "taken",
        };
        f.debug_struct("SubmissionHandle")
            .field("state", &state)
            .finish()
    }
}
