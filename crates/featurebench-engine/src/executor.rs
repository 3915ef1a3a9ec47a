//! Per-sample metrics-collecting executor.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use featurebench_core::{BenchError, SampleResult};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::caller::Caller;

/// Result of one sample: the collected batch plus the termination error, if
/// the pool failed to drain in time.
#[derive(Debug)]
pub struct SampleOutcome {
    /// Timed results, one per successful request. Unordered within the
    /// batch.
    pub results: Vec<SampleResult>,
    /// Set when the pool missed its termination window; the partial batch
    /// above is still valid.
    pub error: Option<BenchError>,
}

/// Executes one sample's burst of tasks through a bounded worker pool.
///
/// Concurrency is capped at the pool size; excess tasks queue FIFO on the
/// semaphore. Each task's start instant is taken inside the worker, after
/// its slot is acquired, so latency measures service time rather than queue
/// wait.
pub struct SampleExecutor {
    pool_size: usize,
    shutdown_timeout: Duration,
}

impl SampleExecutor {
    /// Default window a sample's pool gets to drain after submission.
    pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

    /// Creates an executor with `pool_size` workers.
    #[must_use]
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size: pool_size.max(1),
            shutdown_timeout: Self::DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Overrides the pool drain window.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Runs `task_count` tasks over `queue` starting at `start_index`, with
    /// modular wrap-around, and returns the collected batch.
    ///
    /// Failed requests are logged and excluded from the batch. If the pool
    /// does not drain within the shutdown window, remaining tasks are
    /// aborted and the outcome carries an `ExecutionTimeout` error alongside
    /// the partial batch.
    pub async fn execute<R>(
        &self,
        caller: Arc<dyn Caller<R>>,
        queue: Arc<Vec<R>>,
        start_index: usize,
        task_count: usize,
    ) -> SampleOutcome
    where
        R: Send + Sync + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.pool_size));
        let results = Arc::new(Mutex::new(Vec::with_capacity(task_count)));
        let mut tasks = JoinSet::new();

        for offset in 0..task_count {
            let slot = (start_index + offset) % queue.len();
            let semaphore = Arc::clone(&semaphore);
            let caller = Arc::clone(&caller);
            let queue = Arc::clone(&queue);
            let results = Arc::clone(&results);
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let started_at = Utc::now();
                let clock = Instant::now();
                match caller.issue(&queue[slot]).await {
                    Ok(()) => {
                        results
                            .lock()
                            .push(SampleResult::new(started_at, clock.elapsed()));
                    }
                    Err(error) => {
                        tracing::warn!(%error, "Request failed; latency dropped");
                    }
                }
            });
        }

        let drained = tokio::time::timeout(self.shutdown_timeout, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;

        let error = if drained.is_err() {
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
            Some(BenchError::timeout(format!(
                "sample pool failed to drain {task_count} tasks within {:?}",
                self.shutdown_timeout
            )))
        } else {
            None
        };

        let results = std::mem::take(&mut *results.lock());
        SampleOutcome { results, error }
    }
}
