// ABOUTME: Root module for coalesce - a per-key coalescing task executor.
// ABOUTME: Re-exports the processor, executors, configuration, and error types.

pub mod config;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod processor;

pub use config::ProcessorConfig;
pub use error::ProcessorError;
pub use processor::{CoalescingProcessor, Outcome, SubmissionHandle};
