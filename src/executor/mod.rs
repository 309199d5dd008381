// ABOUTME: Executor module - the worker pool abstraction processors schedule onto.
// ABOUTME: Provides the Executor trait, an owned runtime pool, and a shared-handle pool.

mod handle;
mod runtime;
mod traits;

pub use handle::HandleExecutor;
pub use runtime::RuntimeExecutor;
pub use traits::{Executor, Task};
