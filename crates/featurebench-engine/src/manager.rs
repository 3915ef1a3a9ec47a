//! Load-generator manager: work queue, pacing loop, phases, aggregation,
//! and result streaming.

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use featurebench_core::{
    BenchError, BenchResult, GcsPath, LatencySummary, RunIdentity, SampleResult,
};
use featurebench_results::{ResultsConfig, ResultsWriter};
use featurebench_storage::{BlobStore, Warehouse};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::caller::Caller;
use crate::executor::SampleExecutor;

/// Length of one pacing window.
const SAMPLE_PERIOD: Duration = Duration::from_secs(1);

/// How long in-flight sample jobs get to finish after the pacing loop ends.
const SAMPLE_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// How the work queue orders the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleStrategy {
    /// Corpus order as built.
    InOrder,
    /// One seeded Fisher-Yates shuffle, fixed for the whole run.
    Shuffled,
}

impl FromStr for SampleStrategy {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "IN_ORDER" => Ok(Self::InOrder),
            "SHUFFLED" => Ok(Self::Shuffled),
            other => Err(BenchError::input(format!(
                "unknown sample strategy `{other}`"
            ))),
        }
    }
}

/// Run parameters for the load manager.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Tasks submitted per 1-second sample.
    pub target_qps: usize,
    /// Bounded worker-pool size per sample.
    pub worker_threads: usize,
    /// Work-queue ordering.
    pub sample_strategy: SampleStrategy,
    /// Samples whose statistics are discarded.
    pub warmup_samples: usize,
    /// Samples whose statistics are kept.
    pub measured_samples: usize,
    /// Shuffle seed; a nondeterministic seed is drawn when absent.
    pub seed: Option<u64>,
}

impl LoadConfig {
    /// Validates the parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns `BenchError::InputMalformed` when QPS or the pool size is
    /// zero.
    pub fn validate(&self) -> BenchResult<()> {
        if self.target_qps == 0 {
            return Err(BenchError::input("target QPS must be at least 1"));
        }
        if self.worker_threads == 0 {
            return Err(BenchError::input("worker thread count must be at least 1"));
        }
        Ok(())
    }
}

/// Output sink wiring; absent means console-only.
pub struct OutputOptions {
    /// Blob location all artifacts are written under.
    pub location: GcsPath,
    /// Blob sink.
    pub blob_store: Arc<dyn BlobStore>,
    /// Load-job sink.
    pub warehouse: Arc<dyn Warehouse>,
    /// Warehouse dataset; auto-named from the run identity when absent.
    pub dataset: Option<String>,
    /// Byte budget per detailed CSV object.
    pub max_object_bytes: usize,
}

impl OutputOptions {
    /// Creates options with the default rotation budget and an auto-named
    /// dataset.
    #[must_use]
    pub fn new(
        location: GcsPath,
        blob_store: Arc<dyn BlobStore>,
        warehouse: Arc<dyn Warehouse>,
    ) -> Self {
        Self {
            location,
            blob_store,
            warehouse,
            dataset: None,
            max_object_bytes: ResultsConfig::DEFAULT_MAX_OBJECT_BYTES,
        }
    }

    /// Names the warehouse dataset explicitly.
    #[must_use]
    pub fn dataset(mut self, dataset: impl Into<String>) -> Self {
        let dataset = dataset.into();
        if !dataset.is_empty() {
            self.dataset = Some(dataset);
        }
        self
    }

    /// Overrides the detailed-CSV rotation budget.
    #[must_use]
    pub fn max_object_bytes(mut self, max_object_bytes: usize) -> Self {
        self.max_object_bytes = max_object_bytes;
        self
    }
}

/// Run lifecycle. Transitions are strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Init,
    WorkQueueBuilt,
    Warmup,
    Measure,
    Aggregate,
    Flush,
    Done,
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RunReport {
    /// Aggregate statistics; `None` when no latencies were collected.
    pub aggregate: Option<LatencySummary>,
    /// Count of measured per-request records.
    pub measured_results: usize,
    /// Samples that finished past their 1-second deadline.
    pub qps_misses: usize,
    /// Samples whose bounded pool missed its termination window.
    pub pool_timeouts: usize,
    /// Identity naming this run's artifacts.
    pub run: RunIdentity,
}

/// Drives one experiment: warmup phase, measured phase, aggregation, and
/// flush.
///
/// Generic over the request type so that API-version callers and the
/// test-only calculator plug into the same pacing loop.
pub struct LoadManager<R> {
    config: LoadConfig,
    caller: Arc<dyn Caller<R>>,
    corpus: Vec<R>,
    work_queue: Arc<Vec<R>>,
    phase: Phase,
    request_stats: Vec<Duration>,
    full_result: Vec<SampleResult>,
    qps_misses: Arc<AtomicUsize>,
    pool_timeouts: Arc<AtomicUsize>,
    run: RunIdentity,
    output: Option<OutputOptions>,
}

impl<R> LoadManager<R>
where
    R: Send + Sync + 'static,
{
    /// Creates a manager over a non-empty corpus.
    ///
    /// # Errors
    ///
    /// Returns `BenchError::InputMalformed` for an empty corpus or invalid
    /// config.
    pub fn new(
        config: LoadConfig,
        caller: Arc<dyn Caller<R>>,
        corpus: Vec<R>,
    ) -> BenchResult<Self> {
        config.validate()?;
        if corpus.is_empty() {
            return Err(BenchError::input("request corpus is empty"));
        }
        Ok(Self {
            config,
            caller,
            corpus,
            work_queue: Arc::new(Vec::new()),
            phase: Phase::Init,
            request_stats: Vec::new(),
            full_result: Vec::new(),
            qps_misses: Arc::new(AtomicUsize::new(0)),
            pool_timeouts: Arc::new(AtomicUsize::new(0)),
            run: RunIdentity::generate(),
            output: None,
        })
    }

    /// Attaches durable output sinks.
    #[must_use]
    pub fn with_output(mut self, output: OutputOptions) -> Self {
        self.output = Some(output);
        self
    }

    /// The identity naming this run's artifacts.
    #[must_use]
    pub fn run_identity(&self) -> &RunIdentity {
        &self.run
    }

    /// Runs the experiment to completion.
    ///
    /// The aggregate line is always printed to stdout. When sinks are
    /// configured, artifacts are flushed even if the sampling loop failed;
    /// already-persisted artifacts survive later failures.
    pub async fn run(mut self) -> BenchResult<RunReport> {
        let writer = self.make_writer();
        if let Some(writer) = &writer {
            // Fail fast before any sample runs.
            writer.preflight().await?;
        }

        self.run_experiment().await;

        self.advance(Phase::Aggregate);
        let aggregate = LatencySummary::from_latencies(&self.request_stats);
        let line = match &aggregate {
            Some(summary) => summary.to_line(),
            None => {
                tracing::warn!("No latency statistics were collected");
                String::new()
            }
        };
        print!("{line}");

        self.advance(Phase::Flush);
        let flushed = self.flush(writer.as_ref(), &line).await;
        self.advance(Phase::Done);
        flushed?;

        Ok(RunReport {
            aggregate,
            measured_results: self.full_result.len(),
            qps_misses: self.qps_misses.load(Ordering::Relaxed),
            pool_timeouts: self.pool_timeouts.load(Ordering::Relaxed),
            run: self.run,
        })
    }

    fn make_writer(&self) -> Option<ResultsWriter> {
        let output = self.output.as_ref()?;
        let dataset = output
            .dataset
            .clone()
            .unwrap_or_else(|| self.run.default_dataset(self.config.target_qps));
        let config = ResultsConfig::new(output.location.clone(), dataset)
            .with_max_object_bytes(output.max_object_bytes);
        Some(ResultsWriter::new(
            Arc::clone(&output.blob_store),
            Arc::clone(&output.warehouse),
            config,
            self.run.clone(),
        ))
    }

    async fn flush(&self, writer: Option<&ResultsWriter>, line: &str) -> BenchResult<()> {
        let Some(writer) = writer else {
            return Ok(());
        };
        writer.write_aggregate(line).await?;
        writer.write_detailed(&self.full_result).await?;
        Ok(())
    }

    async fn run_experiment(&mut self) {
        self.build_work_queue();

        self.advance(Phase::Warmup);
        tracing::info!(samples = self.config.warmup_samples, "Running warmup samples");
        self.run_samples(self.config.warmup_samples, false).await;

        self.advance(Phase::Measure);
        tracing::info!(samples = self.config.measured_samples, "Running samples");
        self.run_samples(self.config.measured_samples, true).await;
    }

    fn build_work_queue(&mut self) {
        let mut queue = std::mem::take(&mut self.corpus);
        if self.config.sample_strategy == SampleStrategy::Shuffled {
            shuffle_queue(&mut queue, self.config.seed);
        }
        self.work_queue = Arc::new(queue);
        self.advance(Phase::WorkQueueBuilt);
        tracing::debug!(
            len = self.work_queue.len(),
            strategy = ?self.config.sample_strategy,
            "Built work queue"
        );
    }

    /// One pacing pass: `count` back-to-back 1-second samples.
    ///
    /// Each sample's job runs on an unbounded outer pool so a slow sample
    /// never delays the next window; the loop itself only sleeps to each
    /// deadline. Queue advancement never compensates for misses.
    async fn run_samples(&mut self, count: usize, keep_stats: bool) {
        let mut jobs: JoinSet<(usize, Vec<SampleResult>)> = JoinSet::new();
        let queue_len = self.work_queue.len();
        let mut index = 0usize;

        for sample_num in 0..count {
            let deadline = Instant::now() + SAMPLE_PERIOD;

            // Pool construction is per sample, so cold-pool effects land in
            // warmup instead of being amortized away.
            let executor = SampleExecutor::new(self.config.worker_threads);
            let caller = Arc::clone(&self.caller);
            let queue = Arc::clone(&self.work_queue);
            let qps_misses = Arc::clone(&self.qps_misses);
            let pool_timeouts = Arc::clone(&self.pool_timeouts);
            let target_qps = self.config.target_qps;
            let start_index = index;

            jobs.spawn(async move {
                let outcome = executor
                    .execute(caller, queue, start_index, target_qps)
                    .await;
                if let Some(error) = outcome.error {
                    pool_timeouts.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(sample = sample_num, %error, "Pending requests failed to execute");
                }
                if Instant::now() > deadline {
                    qps_misses.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(sample = sample_num, "Unable to reach desired QPS");
                } else {
                    tracing::debug!(sample = sample_num, "Reached target QPS");
                }
                (sample_num, outcome.results)
            });

            index = (index + target_qps) % queue_len;
            tokio::time::sleep_until(deadline).await;
        }

        let mut batches: Vec<(usize, Vec<SampleResult>)> = Vec::with_capacity(count);
        let drained = tokio::time::timeout(SAMPLE_DRAIN_TIMEOUT, async {
            while let Some(joined) = jobs.join_next().await {
                match joined {
                    Ok(batch) => batches.push(batch),
                    Err(error) => tracing::error!(%error, "Sample job failed"),
                }
            }
        })
        .await;
        if drained.is_err() {
            tracing::warn!(pending = jobs.len(), "Sample jobs are still pending");
            jobs.abort_all();
            while jobs.join_next().await.is_some() {}
        }

        if keep_stats {
            // Batches append in sample order regardless of completion order.
            batches.sort_by_key(|(sample_num, _)| *sample_num);
            for (_, batch) in batches {
                self.request_stats.extend(batch.iter().map(|r| r.latency));
                self.full_result.extend(batch);
            }
        }
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(self.phase <= next, "phase may only move forward");
        self.phase = next;
    }
}

/// Fisher-Yates shuffle of the work queue, seeded for reproducibility when
/// a seed is given.
fn shuffle_queue<R>(queue: &mut [R], seed: Option<u64>) {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    queue.shuffle(&mut rng);
}
