// ABOUTME: Defines the Operation trait - the work a processor runs per submission.
// ABOUTME: Includes adapters for async closures and for blocking closures.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

/// Work applied to a submitted item and its key.
///
/// The processor never runs two operations for the same key at once, but
/// runs operations for different keys concurrently.
#[async_trait]
pub trait Operation<T, K>: Send + Sync
where
    T: Send + 'static,
    K: Send + Sync + 'static,
{
    /// Run the operation for one submission.
    async fn run(&self, item: T, key: &K) -> Result<(), anyhow::Error>;
}

/// Operation built from an async closure taking the item and an owned key.
pub struct FnOperation<F> {
    f: F,
}

impl<F> FnOperation<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<T, K, F, Fut> Operation<T, K> for FnOperation<F>
where
    T: Send + 'static,
    K: Clone + Send + Sync + 'static,
    F: Fn(T, K) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
{
    async fn run(&self, item: T, key: &K) -> Result<(), anyhow::Error> {
        (self.f)(item, key.clone()).await
    }
}

/// Operation built from a synchronous closure.
///
/// The closure runs on the runtime's blocking thread pool so that slow
/// synchronous work (disk, database drivers) does not stall async workers.
/// A panic inside the closure is re-raised on the calling task.
pub struct BlockingOperation<F> {
    f: Arc<F>,
}

impl<F> BlockingOperation<F> {
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

#[async_trait]
impl<T, K, F> Operation<T, K> for BlockingOperation<F>
where
    T: Send + 'static,
    K: Clone + Send + Sync + 'static,
    F: Fn(T, &K) -> Result<(), anyhow::Error> + Send + Sync + 'static,
{
    async fn run(&self, item: T, key: &K) -> Result<(), anyhow::Error> {
        let f = Arc::clone(&self.f);
        let key = key.clone();
        match tokio::task::spawn_blocking(move || (*f)(item, &key)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(anyhow::Error::new(e)),
        }
    }
}
