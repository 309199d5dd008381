// ABOUTME: Configuration for the processor's default worker pool.
// ABOUTME: Deserializable with serde; unset fields fall back to sensible defaults.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::error::ProcessorError;

/// Default thread name prefix for pool workers.
pub const DEFAULT_THREAD_NAME: &str = "coalesce-worker";

/// Settings for the worker pool a processor creates when none is injected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Number of worker threads. `None` means one per available CPU.
    pub worker_threads: Option<usize>,

    /// Name given to every worker thread.
    pub thread_name: String,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl ProcessorConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ProcessorError> {
        serde_json::from_str(json).map_err(|e| ProcessorError::InvalidConfig(e.to_string()))
    }

    /// Set a fixed worker thread count.
    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = Some(worker_threads);
        self
    }

    /// Set the worker thread name.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Resolve the effective worker count.
    ///
    /// Returns `Err(ProcessorError::InvalidConfig)` for an explicit zero.
    pub fn resolved_worker_threads(&self) -> Result<usize, ProcessorError> {
        match self.worker_threads {
            Some(0) => Err(ProcessorError::InvalidConfig(
                "worker_threads must be at least 1".to_string(),
            )),
            Some(n) => Ok(n),
            None => Ok(std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)),
        }
    }
}
