// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use coalesce::prelude::*;` to get started quickly.

pub use crate::config::ProcessorConfig;
pub use crate::error::ProcessorError;
pub use crate::executor::{Executor, HandleExecutor, RuntimeExecutor, Task};
pub use crate::processor::{
    BlockingOperation, CoalescingProcessor, FnOperation, Operation, Outcome, SubmissionHandle,
    SubmissionResult,
};
