use crate::error::Result;
use rayon::ThreadPool;
use std::sync::Arc;

const THREAD_PREFIX: &str = "exception-log-";

/// Whether the current thread belongs to a [`LogWorker`] pool
pub(crate) fn on_worker_thread() -> bool {
    std::thread::current()
        .name()
        .is_some_and(|name| name.starts_with(THREAD_PREFIX))
}

/// Background pool that runs logger calls off the request path
///
/// Jobs are fire-and-forget: nothing waits for them, and a panicking job is
/// reported through `tracing` without taking the pool down.
#[derive(Clone)]
pub struct LogWorker {
    pool: Arc<ThreadPool>,
}

impl LogWorker {
    pub fn new(num_threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("{THREAD_PREFIX}{i}"))
            .panic_handler(|payload| {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "Unknown panic".to_string());
                tracing::error!(reason = %reason, "Exception logger panicked");
            })
            .build()?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Schedule a job without waiting for it
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(job);
    }
}
