//! Local filesystem sinks.
//!
//! Development and test stand-ins for the managed blob store and warehouse.
//! Buckets are directories under a base path; warehouse tables are CSV files
//! under `{dataset}/{table}.csv`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use featurebench_core::{BenchError, BenchResult, GcsPath};

use crate::blob::{BlobMetadata, BlobStore};
use crate::warehouse::{EntityRow, Warehouse, WriteDisposition};

/// Local filesystem blob store.
///
/// Stores objects as files under `{base_dir}/{bucket}/{key}`, creating
/// intermediate directories on demand.
pub struct LocalBlobStore {
    base_dir: PathBuf,
}

impl LocalBlobStore {
    /// Creates a blob store rooted at `base_dir`, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns `BenchError::Io` when directory creation fails.
    pub async fn new(base_dir: impl AsRef<Path>) -> BenchResult<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&base_dir).await?;
        Ok(Self { base_dir })
    }

    fn bucket_path(&self, bucket: &str) -> PathBuf {
        self.base_dir.join(bucket)
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.bucket_path(bucket).join(key)
    }

    fn list_recursive<'a>(
        &'a self,
        dir: &'a Path,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = BenchResult<Vec<PathBuf>>> + Send + 'a>>
    {
        Box::pin(async move {
            let mut results = Vec::new();
            let mut read_dir = tokio::fs::read_dir(dir).await?;
            while let Some(entry) = read_dir.next_entry().await? {
                let path = entry.path();
                let metadata = entry.metadata().await?;
                if metadata.is_file() {
                    results.push(path);
                } else if metadata.is_dir() {
                    let mut sub = self.list_recursive(&path).await?;
                    results.append(&mut sub);
                }
            }
            Ok(results)
        })
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn bucket_exists(&self, bucket: &str) -> BenchResult<bool> {
        Ok(tokio::fs::try_exists(self.bucket_path(bucket))
            .await
            .unwrap_or(false))
    }

    async fn ensure_bucket(&self, bucket: &str) -> BenchResult<()> {
        tokio::fs::create_dir_all(self.bucket_path(bucket)).await?;
        Ok(())
    }

    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> BenchResult<()> {
        if key.is_empty() {
            return Err(BenchError::input("blob key cannot be empty"));
        }
        let path = self.object_path(bucket, key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> BenchResult<Bytes> {
        let path = self.object_path(bucket, key);
        let data = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BenchError::unavailable("blob store", format!("object `{bucket}/{key}` was not found"))
            } else {
                BenchError::from(e)
            }
        })?;
        Ok(Bytes::from(data))
    }

    async fn list(&self, bucket: &str, prefix: &str) -> BenchResult<Vec<BlobMetadata>> {
        let bucket_path = self.bucket_path(bucket);
        if !tokio::fs::try_exists(&bucket_path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        for path in self.list_recursive(&bucket_path).await? {
            let Some(key) = path
                .strip_prefix(&bucket_path)
                .ok()
                .and_then(|p| p.to_str())
                .map(str::to_string)
            else {
                continue;
            };
            if !key.starts_with(prefix) {
                continue;
            }
            let metadata = tokio::fs::metadata(&path).await?;
            results.push(BlobMetadata {
                key,
                size_bytes: metadata.len(),
                last_modified: metadata
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .and_then(|d| DateTime::from_timestamp(d.as_secs() as i64, 0))
                    .unwrap_or_else(Utc::now),
            });
        }
        results.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(results)
    }
}

/// Local filesystem warehouse.
///
/// Load jobs copy the source CSV's data rows into `{dataset}/{table}.csv`
/// under the base directory. Entity queries need a SQL engine and are not
/// supported by this backend.
pub struct LocalWarehouse {
    base_dir: PathBuf,
    blobs: Arc<dyn BlobStore>,
}

impl LocalWarehouse {
    /// Creates a warehouse rooted at `base_dir` that resolves load-job
    /// sources from `blobs`.
    ///
    /// # Errors
    ///
    /// Returns `BenchError::Io` when directory creation fails.
    pub async fn new(base_dir: impl AsRef<Path>, blobs: Arc<dyn BlobStore>) -> BenchResult<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&base_dir).await?;
        Ok(Self { base_dir, blobs })
    }

    fn table_path(&self, dataset: &str, table: &str) -> PathBuf {
        self.base_dir.join(dataset).join(format!("{table}.csv"))
    }
}

#[async_trait]
impl Warehouse for LocalWarehouse {
    async fn query_entities(&self, _sql: &str) -> BenchResult<Vec<EntityRow>> {
        Err(BenchError::unavailable(
            "warehouse",
            "entity queries require a SQL-capable warehouse backend",
        ))
    }

    async fn ensure_dataset(&self, dataset: &str) -> BenchResult<()> {
        tokio::fs::create_dir_all(self.base_dir.join(dataset)).await?;
        Ok(())
    }

    async fn load_csv(
        &self,
        dataset: &str,
        table: &str,
        source_uri: &str,
        disposition: WriteDisposition,
    ) -> BenchResult<u64> {
        let dataset_dir = self.base_dir.join(dataset);
        if !tokio::fs::try_exists(&dataset_dir).await.unwrap_or(false) {
            return Err(BenchError::unavailable(
                "warehouse",
                format!("dataset `{dataset}` was not found"),
            ));
        }

        let (bucket, key) = GcsPath::parse_object(source_uri)?;
        let data = self.blobs.get(&bucket, &key).await?;
        let text = String::from_utf8(data.to_vec())
            .map_err(|e| BenchError::input(format!("load source is not UTF-8: {e}")))?;
        let rows: Vec<&str> = text.lines().skip(1).collect();

        let path = self.table_path(dataset, table);
        let mut contents = match disposition {
            WriteDisposition::Truncate => String::new(),
            WriteDisposition::Append => match tokio::fs::read_to_string(&path).await {
                Ok(existing) => existing,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
                Err(e) => return Err(e.into()),
            },
        };
        for row in &rows {
            contents.push_str(row);
            contents.push('\n');
        }
        tokio::fs::write(&path, contents).await?;

        tracing::info!(
            dataset,
            table,
            source = source_uri,
            rows = rows.len(),
            "Loaded CSV into warehouse table"
        );
        Ok(rows.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path()).await.unwrap();
        store.ensure_bucket("results").await.unwrap();

        store
            .put("results", "runs/a.txt", Bytes::from("hello"))
            .await
            .unwrap();
        let data = store.get("results", "runs/a.txt").await.unwrap();
        assert_eq!(data, Bytes::from("hello"));
    }

    #[tokio::test]
    async fn test_bucket_existence() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path()).await.unwrap();

        assert!(!store.bucket_exists("results").await.unwrap());
        store.ensure_bucket("results").await.unwrap();
        assert!(store.bucket_exists("results").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_object_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path()).await.unwrap();
        let result = store.get("results", "nope.txt").await;
        assert!(matches!(
            result,
            Err(BenchError::ExternalUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_filters_by_prefix() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path()).await.unwrap();
        store.ensure_bucket("results").await.unwrap();
        store.put("results", "runs/a.txt", Bytes::from("a")).await.unwrap();
        store.put("results", "runs/b.txt", Bytes::from("b")).await.unwrap();
        store.put("results", "other/c.txt", Bytes::from("c")).await.unwrap();

        let listed = store.list("results", "runs/").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].key, "runs/a.txt");
        assert_eq!(listed[1].key, "runs/b.txt");
    }

    #[tokio::test]
    async fn test_local_warehouse_load_dispositions() {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn BlobStore> =
            Arc::new(LocalBlobStore::new(dir.path().join("blobs")).await.unwrap());
        store.ensure_bucket("results").await.unwrap();
        store
            .put(
                "results",
                "part1.csv",
                Bytes::from("StartTime,Duration\nr1\nr2\n"),
            )
            .await
            .unwrap();
        store
            .put(
                "results",
                "part2.csv",
                Bytes::from("StartTime,Duration\nr3\n"),
            )
            .await
            .unwrap();

        let warehouse = LocalWarehouse::new(dir.path().join("wh"), store).await.unwrap();
        warehouse.ensure_dataset("ds").await.unwrap();

        let loaded = warehouse
            .load_csv("ds", "t", "gs://results/part1.csv", WriteDisposition::Truncate)
            .await
            .unwrap();
        assert_eq!(loaded, 2);
        let loaded = warehouse
            .load_csv("ds", "t", "gs://results/part2.csv", WriteDisposition::Append)
            .await
            .unwrap();
        assert_eq!(loaded, 1);

        let table = tokio::fs::read_to_string(dir.path().join("wh/ds/t.csv"))
            .await
            .unwrap();
        assert_eq!(table, "r1\nr2\nr3\n");
    }

    #[tokio::test]
    async fn test_local_warehouse_rejects_queries() {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn BlobStore> =
            Arc::new(LocalBlobStore::new(dir.path()).await.unwrap());
        let warehouse = LocalWarehouse::new(dir.path().join("wh"), store).await.unwrap();
        assert!(warehouse.query_entities("SELECT 1").await.is_err());
    }
}
