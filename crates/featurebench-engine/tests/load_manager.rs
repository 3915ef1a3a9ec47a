//! End-to-end pacing-loop behavior, driven through the calculator plug-in.

use std::sync::Arc;
use std::time::Duration;

use featurebench_core::{BenchError, GcsPath};
use featurebench_engine::calculator::{CalculatorCaller, IntegerPair};
use featurebench_engine::{LoadConfig, LoadManager, OutputOptions, SampleStrategy};
use featurebench_storage::{BlobStore, MemoryBlobStore, MemoryWarehouse};

fn arithmetic_corpus() -> Vec<IntegerPair> {
    (1..=6).map(|lhs| IntegerPair::new(lhs, 2)).collect()
}

fn config(strategy: SampleStrategy, measured: usize) -> LoadConfig {
    LoadConfig {
        target_qps: 1,
        worker_threads: 1,
        sample_strategy: strategy,
        warmup_samples: 0,
        measured_samples: measured,
        seed: Some(0),
    }
}

#[tokio::test(start_paused = true)]
async fn test_in_order_run_issues_corpus_in_sequence() {
    let caller = Arc::new(CalculatorCaller::new());
    let manager = LoadManager::new(
        config(SampleStrategy::InOrder, 6),
        caller.clone(),
        arithmetic_corpus(),
    )
    .unwrap();

    let report = manager.run().await.unwrap();

    assert_eq!(caller.sums(), vec![3, 4, 5, 6, 7, 8]);
    assert_eq!(report.measured_results, 6);
    assert_eq!(report.qps_misses, 0);
    assert!(report.aggregate.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_shuffled_run_is_deterministic_for_a_seed() {
    let mut orders = Vec::new();
    for _ in 0..2 {
        let caller = Arc::new(CalculatorCaller::new());
        let manager = LoadManager::new(
            config(SampleStrategy::Shuffled, 6),
            caller.clone(),
            arithmetic_corpus(),
        )
        .unwrap();
        manager.run().await.unwrap();
        orders.push(caller.sums());
    }

    // Same seed, same corpus: the shuffled order is bit-identical.
    assert_eq!(orders[0], orders[1]);

    // And it is a permutation of the full corpus.
    let mut sorted = orders[0].clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![3, 4, 5, 6, 7, 8]);
}

#[tokio::test(start_paused = true)]
async fn test_measured_phase_submits_samples_times_qps_tasks() {
    let caller = Arc::new(CalculatorCaller::new());
    let corpus = vec![IntegerPair::new(1, 2), IntegerPair::new(2, 2)];
    let manager = LoadManager::new(
        LoadConfig {
            target_qps: 3,
            worker_threads: 2,
            sample_strategy: SampleStrategy::InOrder,
            warmup_samples: 0,
            measured_samples: 4,
            seed: None,
        },
        caller.clone(),
        corpus,
    )
    .unwrap();

    let report = manager.run().await.unwrap();

    // numSamples x targetQPS tasks, wrapping over the 2-element queue.
    assert_eq!(report.measured_results, 12);
    let sums = caller.sums();
    assert_eq!(sums.len(), 12);
    // QPS >= |corpus|: the first sample already covered every request.
    assert!(sums[..3].contains(&3));
    assert!(sums[..3].contains(&4));
}

#[tokio::test(start_paused = true)]
async fn test_warmup_statistics_are_discarded() {
    let caller = Arc::new(CalculatorCaller::new());
    let manager = LoadManager::new(
        LoadConfig {
            target_qps: 2,
            worker_threads: 1,
            sample_strategy: SampleStrategy::InOrder,
            warmup_samples: 3,
            measured_samples: 1,
            seed: None,
        },
        caller.clone(),
        arithmetic_corpus(),
    )
    .unwrap();

    let report = manager.run().await.unwrap();

    // All 8 tasks ran, but only the measured sample kept records.
    assert_eq!(caller.sums().len(), 8);
    assert_eq!(report.measured_results, 2);
}

#[tokio::test]
async fn test_slow_caller_counts_qps_misses() {
    // 30 tasks of 50ms through one worker need 1.5s; the 1-second pool
    // window cuts each sample short.
    let caller = Arc::new(CalculatorCaller::with_delay(Duration::from_millis(50)));
    let manager = LoadManager::new(
        LoadConfig {
            target_qps: 30,
            worker_threads: 1,
            sample_strategy: SampleStrategy::InOrder,
            warmup_samples: 0,
            measured_samples: 2,
            seed: None,
        },
        caller,
        arithmetic_corpus(),
    )
    .unwrap();

    let report = manager.run().await.unwrap();

    assert_eq!(report.qps_misses, 2);
    assert_eq!(report.pool_timeouts, 2);
    // Partial batches still produce statistics.
    assert!(report.measured_results > 0);
    assert!(report.measured_results < 60);
    assert!(report.aggregate.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_configured_sinks_receive_artifacts() {
    let blobs = Arc::new(MemoryBlobStore::with_bucket("bench"));
    let warehouse = Arc::new(MemoryWarehouse::new(blobs.clone()));
    let caller = Arc::new(CalculatorCaller::new());

    let manager = LoadManager::new(
        LoadConfig {
            target_qps: 2,
            worker_threads: 1,
            sample_strategy: SampleStrategy::InOrder,
            warmup_samples: 1,
            measured_samples: 2,
            seed: None,
        },
        caller,
        arithmetic_corpus(),
    )
    .unwrap()
    .with_output(OutputOptions::new(
        GcsPath::parse("gs://bench/out").unwrap(),
        blobs.clone(),
        warehouse.clone(),
    ));

    let report = manager.run().await.unwrap();
    assert_eq!(report.measured_results, 4);

    let aggregate_key = format!("out/{}", report.run.aggregate_object());
    let aggregate = blobs.get("bench", &aggregate_key).await.unwrap();
    let line = String::from_utf8(aggregate.to_vec()).unwrap();
    assert!(line.starts_with("Min: "));
    assert!(line.ends_with("ms\n"));

    let detailed_key = format!("out/{}", report.run.detailed_object(1));
    let detailed = blobs.get("bench", &detailed_key).await.unwrap();
    let text = String::from_utf8(detailed.to_vec()).unwrap();
    assert!(text.starts_with("StartTime,Duration\n"));
    assert_eq!(text.lines().count(), 5);

    // Auto-named dataset, table rows match the measured records.
    let dataset = report.run.default_dataset(2);
    assert!(warehouse.dataset_exists(&dataset));
    assert_eq!(
        warehouse.table_rows(&dataset, &report.run.table_name()).len(),
        4
    );
}

#[tokio::test]
async fn test_missing_bucket_fails_before_sampling() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let warehouse = Arc::new(MemoryWarehouse::new(blobs.clone()));
    let caller = Arc::new(CalculatorCaller::new());

    let manager = LoadManager::new(
        config(SampleStrategy::InOrder, 2),
        caller.clone(),
        arithmetic_corpus(),
    )
    .unwrap()
    .with_output(OutputOptions::new(
        GcsPath::parse("gs://absent/out").unwrap(),
        blobs,
        warehouse,
    ));

    let result = manager.run().await;
    assert!(matches!(
        result,
        Err(BenchError::ExternalUnavailable { .. })
    ));
    assert!(caller.sums().is_empty());
}

#[tokio::test]
async fn test_empty_corpus_is_rejected() {
    let caller = Arc::new(CalculatorCaller::new());
    let result = LoadManager::new(config(SampleStrategy::InOrder, 1), caller, vec![]);
    assert!(matches!(result, Err(BenchError::InputMalformed { .. })));
}
