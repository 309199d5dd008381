// ABOUTME: Processor module - the per-key coalescing executor.
// ABOUTME: Contains the submission table, operations, handles, and the processor itself.

mod handle;
mod operation;
mod processor;
mod table;

pub use handle::{Outcome, SubmissionHandle, SubmissionResult};
pub use operation::{BlockingOperation, FnOperation, Operation};
pub use processor::CoalescingProcessor;
