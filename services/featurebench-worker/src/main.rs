//! Load-test worker.
//!
//! One replica of the benchmark fleet: builds the request corpus from the
//! configured inputs, drives the feature service at the target QPS, and
//! writes aggregate plus detailed results to the configured sinks.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use clap::error::ErrorKind;
use clap::Parser;
use featurebench_core::{BenchResult, GcsPath};
use featurebench_corpus::{CorpusBuilder, EntitySource};
use featurebench_engine::{
    ApiVersion, CallerBuilder, LoadConfig, LoadManager, OutputOptions, ReadMethod, SampleStrategy,
};
use featurebench_storage::{BlobStore, LocalBlobStore, LocalWarehouse, Warehouse};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "featurebench-worker")]
#[command(about = "Closed-loop load generator for online feature retrieval", long_about = None)]
#[command(version)]
struct Cli {
    /// Target queries per second.
    #[arg(long, default_value_t = 1)]
    target_qps: usize,

    /// Number of worker threads used for sending requests.
    #[arg(long, default_value_t = 1)]
    num_threads: usize,

    /// Number of measured samples. Each sample tries to generate the target
    /// QPS for one second, so this is also roughly the measurement duration
    /// in seconds.
    #[arg(long, default_value_t = 10)]
    num_samples: usize,

    /// Number of warmup samples; their statistics are discarded.
    #[arg(long, default_value_t = 5)]
    num_warmup_samples: usize,

    /// Sample strategy: IN_ORDER or SHUFFLED.
    #[arg(long, default_value = "SHUFFLED", value_parser = parse_strategy)]
    sample_strategy: SampleStrategy,

    /// Shuffle seed, for reproducible SHUFFLED runs.
    #[arg(long)]
    seed: Option<u64>,

    /// Project ID.
    #[arg(long, required = true)]
    project_id: String,

    /// The cloud region the feature store(s) are located in.
    #[arg(long, required = true)]
    region: String,

    /// Feature service API version.
    #[arg(long, default_value = "v1beta1", value_parser = parse_api_version)]
    api_version: ApiVersion,

    /// Service endpoint override; empty keeps the regional default.
    #[arg(long)]
    endpoint_override: Option<String>,

    /// Bearer token attached to every request.
    #[arg(long, env = "FEATUREBENCH_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// GCS output path (`gs://bucket/prefix`); empty means console-only.
    #[arg(long)]
    gcs_output_path: Option<String>,

    /// File specifying the feature queries to issue; local path or
    /// `gs://` URI.
    #[arg(long, required = true)]
    feature_query_file: String,

    /// File specifying which entities to fetch feature values for; local
    /// path or `gs://` URI.
    #[arg(long, required = true)]
    entity_file: String,

    /// BigQuery output dataset; empty derives a name from the run.
    #[arg(long, default_value = "")]
    bigquery_output_dataset: String,

    /// Byte budget per detailed CSV object before rotation.
    #[arg(long, default_value_t = 2_000_000_000)]
    max_csv_object_bytes: usize,

    /// Root directory backing the blob-store and warehouse sinks.
    #[arg(long, env = "FEATUREBENCH_SINK_ROOT", default_value = ".featurebench")]
    sink_root: String,
}

fn parse_strategy(s: &str) -> Result<SampleStrategy, String> {
    SampleStrategy::from_str(s).map_err(|e| e.to_string())
}

fn parse_api_version(s: &str) -> Result<ApiVersion, String> {
    ApiVersion::from_str(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    init_logging();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            let code = match error.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            std::process::exit(code);
        }
    };

    if let Err(error) = run(cli).await {
        tracing::error!(%error, "Load test run failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> BenchResult<()> {
    let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(&cli.sink_root).await?);
    let warehouse: Arc<dyn Warehouse> = Arc::new(
        LocalWarehouse::new(Path::new(&cli.sink_root).join("warehouse"), Arc::clone(&blobs))
            .await?,
    );

    let corpus = CorpusBuilder::new()
        .with_blob_store(Arc::clone(&blobs))
        .with_warehouse(Arc::clone(&warehouse))
        .build(
            &cli.feature_query_file,
            &EntitySource::Listing(cli.entity_file.clone()),
        )
        .await?;

    let mut caller_builder = CallerBuilder::new(
        cli.api_version,
        &cli.project_id,
        &cli.region,
        ReadMethod::Get,
    );
    if let Some(endpoint) = &cli.endpoint_override {
        caller_builder = caller_builder.endpoint_override(endpoint);
    }
    if let Some(token) = &cli.access_token {
        caller_builder = caller_builder.bearer_token(token);
    }
    let caller = caller_builder.build()?;

    let config = LoadConfig {
        target_qps: cli.target_qps,
        worker_threads: cli.num_threads,
        sample_strategy: cli.sample_strategy,
        warmup_samples: cli.num_warmup_samples,
        measured_samples: cli.num_samples,
        seed: cli.seed,
    };

    let mut manager = LoadManager::new(config, caller, corpus)?;
    if let Some(raw) = &cli.gcs_output_path {
        let location = GcsPath::parse(raw)?;
        // The filesystem backend provisions buckets on demand.
        blobs.ensure_bucket(location.bucket()).await?;
        let output = OutputOptions::new(location, Arc::clone(&blobs), Arc::clone(&warehouse))
            .dataset(cli.bigquery_output_dataset.clone())
            .max_object_bytes(cli.max_csv_object_bytes);
        manager = manager.with_output(output);
    }

    let report = manager.run().await?;
    tracing::info!(
        results = report.measured_results,
        qps_misses = report.qps_misses,
        pool_timeouts = report.pool_timeouts,
        "Load test complete"
    );
    Ok(())
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).with_target(false).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_map_to_config() {
        let cli = Cli::try_parse_from([
            "featurebench-worker",
            "--target-qps",
            "250",
            "--num-threads",
            "16",
            "--num-samples",
            "30",
            "--num-warmup-samples",
            "2",
            "--sample-strategy",
            "IN_ORDER",
            "--seed",
            "7",
            "--project-id",
            "proj",
            "--region",
            "us-central1",
            "--feature-query-file",
            "template.textproto",
            "--entity-file",
            "entities.txt",
        ])
        .unwrap();

        assert_eq!(cli.target_qps, 250);
        assert_eq!(cli.num_threads, 16);
        assert_eq!(cli.num_samples, 30);
        assert_eq!(cli.num_warmup_samples, 2);
        assert_eq!(cli.sample_strategy, SampleStrategy::InOrder);
        assert_eq!(cli.seed, Some(7));
        assert_eq!(cli.api_version, ApiVersion::V1beta1);
        assert!(cli.gcs_output_path.is_none());
        assert_eq!(cli.bigquery_output_dataset, "");
    }

    #[test]
    fn test_required_flags_are_enforced() {
        let result = Cli::try_parse_from(["featurebench-worker", "--target-qps", "5"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_strategy_flag_accepts_original_casing() {
        let cli = Cli::try_parse_from([
            "featurebench-worker",
            "--sample-strategy",
            "shuffled",
            "--project-id",
            "p",
            "--region",
            "r",
            "--feature-query-file",
            "f",
            "--entity-file",
            "e",
        ])
        .unwrap();
        assert_eq!(cli.sample_strategy, SampleStrategy::Shuffled);
    }
}
