//! Results writer.
//!
//! Persists one run's outputs under its [`RunIdentity`]: the one-line
//! aggregate summary as a text object, the detailed per-request records as
//! one or more rotated CSV objects, and a warehouse table loaded from those
//! CSVs.

use std::sync::Arc;

use bytes::Bytes;
use featurebench_core::sample::CSV_HEADER;
use featurebench_core::{BenchError, BenchResult, GcsPath, RunIdentity, SampleResult};
use featurebench_storage::{BlobStore, Warehouse, WriteDisposition};

/// Sink configuration for one run's outputs.
#[derive(Debug, Clone)]
pub struct ResultsConfig {
    /// Blob location every object name is appended to.
    pub location: GcsPath,
    /// Warehouse dataset receiving the result table.
    pub dataset: String,
    /// Byte budget per detailed CSV object; the buffer rotates to a new
    /// object rather than exceed it.
    pub max_object_bytes: usize,
}

impl ResultsConfig {
    /// Default rotation budget for detailed CSV objects.
    pub const DEFAULT_MAX_OBJECT_BYTES: usize = 2_000_000_000;

    /// Creates a config with the default rotation budget.
    #[must_use]
    pub fn new(location: GcsPath, dataset: impl Into<String>) -> Self {
        Self {
            location,
            dataset: dataset.into(),
            max_object_bytes: Self::DEFAULT_MAX_OBJECT_BYTES,
        }
    }

    /// Overrides the rotation budget.
    #[must_use]
    pub fn with_max_object_bytes(mut self, max_object_bytes: usize) -> Self {
        self.max_object_bytes = max_object_bytes;
        self
    }
}

/// What a detailed-results write produced.
#[derive(Debug, Clone)]
pub struct WriteReport {
    /// Object keys of the detailed CSVs, in rotation order.
    pub detailed_objects: Vec<String>,
    /// Total data rows loaded into the warehouse table.
    pub rows_loaded: u64,
}

/// Writes one run's artifacts to the configured sinks.
pub struct ResultsWriter {
    blobs: Arc<dyn BlobStore>,
    warehouse: Arc<dyn Warehouse>,
    config: ResultsConfig,
    run: RunIdentity,
}

impl ResultsWriter {
    /// Creates a writer bound to one run identity.
    #[must_use]
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        warehouse: Arc<dyn Warehouse>,
        config: ResultsConfig,
        run: RunIdentity,
    ) -> Self {
        Self {
            blobs,
            warehouse,
            config,
            run,
        }
    }

    /// Verifies the output bucket exists before any sample runs.
    ///
    /// # Errors
    ///
    /// Returns `BenchError::ExternalUnavailable` when the bucket is missing.
    pub async fn preflight(&self) -> BenchResult<()> {
        let bucket = self.config.location.bucket();
        if !self.blobs.bucket_exists(bucket).await? {
            return Err(BenchError::unavailable(
                "blob store",
                format!("unable to find bucket `{bucket}`"),
            ));
        }
        Ok(())
    }

    /// Writes the aggregate summary object.
    pub async fn write_aggregate(&self, line: &str) -> BenchResult<()> {
        let key = self.config.location.object(&self.run.aggregate_object());
        self.blobs
            .put(
                self.config.location.bucket(),
                &key,
                Bytes::from(line.to_string()),
            )
            .await?;
        tracing::info!(object = %key, "Wrote aggregate results");
        Ok(())
    }

    /// Writes every detailed record, rotating CSV objects at the configured
    /// byte budget, and loads each object into the warehouse table. The
    /// first load truncates the table; later loads append.
    ///
    /// # Errors
    ///
    /// Blob or load-job failures surface as run failure; objects already
    /// persisted and rows already loaded are left in place.
    pub async fn write_detailed(&self, results: &[SampleResult]) -> BenchResult<WriteReport> {
        let table = self.run.table_name();
        self.warehouse.ensure_dataset(&self.config.dataset).await?;

        let mut report = WriteReport {
            detailed_objects: Vec::new(),
            rows_loaded: 0,
        };
        let mut disposition = WriteDisposition::Truncate;
        let mut object_index = 1;
        let mut buffer = String::from(CSV_HEADER);

        for result in results {
            let mut row = result.csv_row();
            row.push('\n');
            if buffer.len() + row.len() > self.config.max_object_bytes {
                self.flush_object(object_index, &buffer, &table, disposition, &mut report)
                    .await?;
                disposition = WriteDisposition::Append;
                object_index += 1;
                buffer = String::from(CSV_HEADER);
            }
            buffer.push_str(&row);
        }
        self.flush_object(object_index, &buffer, &table, disposition, &mut report)
            .await?;

        tracing::info!(
            objects = report.detailed_objects.len(),
            rows = report.rows_loaded,
            table = %table,
            "Wrote detailed results"
        );
        Ok(report)
    }

    async fn flush_object(
        &self,
        object_index: usize,
        buffer: &str,
        table: &str,
        disposition: WriteDisposition,
        report: &mut WriteReport,
    ) -> BenchResult<()> {
        let name = self.run.detailed_object(object_index);
        let key = self.config.location.object(&name);
        self.blobs
            .put(
                self.config.location.bucket(),
                &key,
                Bytes::from(buffer.to_string()),
            )
            .await?;

        let rows = self
            .warehouse
            .load_csv(
                &self.config.dataset,
                table,
                &self.config.location.uri(&name),
                disposition,
            )
            .await?;

        report.detailed_objects.push(key);
        report.rows_loaded += rows;
        Ok(())
    }
}
