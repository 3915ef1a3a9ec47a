use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use featurebench_core::{BenchError, BenchResult, GcsPath};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::blob::BlobStore;

/// How a load job treats rows already present in the target table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteDisposition {
    /// Replace the table contents.
    Truncate,
    /// Append to the table contents.
    Append,
}

/// One row of an entity-corpus query result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRow {
    pub featurestore_id: String,
    pub entity_type_id: String,
    pub entity_id: String,
}

/// Columnar warehouse contract.
///
/// Load jobs are synchronous: each call returns only once the job has
/// completed, so callers can rely on issue order matching load order.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Runs an entity-corpus query. Result rows must expose the columns
    /// `featurestore_id`, `entity_type_id`, `entity_id`.
    async fn query_entities(&self, sql: &str) -> BenchResult<Vec<EntityRow>>;

    /// Creates `dataset` when missing; succeeds when it already exists.
    async fn ensure_dataset(&self, dataset: &str) -> BenchResult<()>;

    /// Loads a CSV blob (header row skipped) into `dataset.table` and
    /// returns the number of rows loaded.
    async fn load_csv(
        &self,
        dataset: &str,
        table: &str,
        source_uri: &str,
        disposition: WriteDisposition,
    ) -> BenchResult<u64>;
}

/// Record of one completed load job, for test assertions.
#[derive(Debug, Clone)]
pub struct LoadJob {
    pub dataset: String,
    pub table: String,
    pub source_uri: String,
    pub disposition: WriteDisposition,
    pub rows: u64,
}

/// In-memory warehouse for tests.
///
/// Load jobs resolve their `gs://` source URI against the supplied blob
/// store, so rotation tests can assert that what was uploaded is exactly
/// what got loaded. Query results are canned via [`MemoryWarehouse::with_entity_rows`].
pub struct MemoryWarehouse {
    blobs: Arc<dyn BlobStore>,
    entity_rows: Vec<EntityRow>,
    state: RwLock<MemoryWarehouseState>,
}

#[derive(Default)]
struct MemoryWarehouseState {
    // dataset -> table -> CSV data rows (header excluded)
    datasets: HashMap<String, HashMap<String, Vec<String>>>,
    history: Vec<LoadJob>,
}

impl MemoryWarehouse {
    /// Creates a warehouse that resolves load-job sources from `blobs`.
    #[must_use]
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            blobs,
            entity_rows: Vec::new(),
            state: RwLock::new(MemoryWarehouseState::default()),
        }
    }

    /// Cans the rows returned by every `query_entities` call.
    #[must_use]
    pub fn with_entity_rows(mut self, rows: Vec<EntityRow>) -> Self {
        self.entity_rows = rows;
        self
    }

    /// Whether `dataset` has been provisioned.
    #[must_use]
    pub fn dataset_exists(&self, dataset: &str) -> bool {
        self.state.read().datasets.contains_key(dataset)
    }

    /// The data rows currently in `dataset.table`, in load order.
    #[must_use]
    pub fn table_rows(&self, dataset: &str, table: &str) -> Vec<String> {
        self.state
            .read()
            .datasets
            .get(dataset)
            .and_then(|tables| tables.get(table))
            .cloned()
            .unwrap_or_default()
    }

    /// Every completed load job, in issue order.
    #[must_use]
    pub fn load_history(&self) -> Vec<LoadJob> {
        self.state.read().history.clone()
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn query_entities(&self, _sql: &str) -> BenchResult<Vec<EntityRow>> {
        Ok(self.entity_rows.clone())
    }

    async fn ensure_dataset(&self, dataset: &str) -> BenchResult<()> {
        self.state
            .write()
            .datasets
            .entry(dataset.to_string())
            .or_default();
        Ok(())
    }

    async fn load_csv(
        &self,
        dataset: &str,
        table: &str,
        source_uri: &str,
        disposition: WriteDisposition,
    ) -> BenchResult<u64> {
        let (bucket, key) = GcsPath::parse_object(source_uri)?;
        let data = self.blobs.get(&bucket, &key).await?;
        let text = String::from_utf8(data.to_vec())
            .map_err(|e| BenchError::input(format!("load source is not UTF-8: {e}")))?;

        // Skip the header row, keep data rows.
        let rows: Vec<String> = text.lines().skip(1).map(str::to_string).collect();
        let loaded = rows.len() as u64;

        let mut state = self.state.write();
        let tables = state
            .datasets
            .get_mut(dataset)
            .ok_or_else(|| BenchError::unavailable("warehouse", format!("dataset `{dataset}` was not found")))?;
        let target = tables.entry(table.to_string()).or_default();
        match disposition {
            WriteDisposition::Truncate => *target = rows,
            WriteDisposition::Append => target.extend(rows),
        }
        state.history.push(LoadJob {
            dataset: dataset.to_string(),
            table: table.to_string(),
            source_uri: source_uri.to_string(),
            disposition,
            rows: loaded,
        });
        Ok(loaded)
    }
}
