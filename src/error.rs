// ABOUTME: Defines the error type for the coalesce library using thiserror.
// ABOUTME: Covers operation failures, shutdown refusals, and runtime setup errors.

/// Top-level error type for the coalesce library.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("Operation failed: {0}")]
    Operation(#[source] anyhow::Error),

    #[error("Operation panicked: {0}")]
    Panicked(String),

    #[error("Processor is closed")]
    Closed,

    #[error("Submission was dropped before it completed")]
    Interrupted,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No tokio runtime is running on this thread")]
    NoRuntime,

    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

impl ProcessorError {
    /// Returns true if the operation itself ran and failed (error or panic).
    pub fn is_operation_failure(&self) -> bool {
        matches!(self, ProcessorError::Operation(_) | ProcessorError::Panicked(_))
    }
}
