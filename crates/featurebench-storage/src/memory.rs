//! In-memory blob store for tests.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use featurebench_core::{BenchError, BenchResult};
use parking_lot::RwLock;

use crate::blob::{BlobMetadata, BlobStore};

/// In-memory [`BlobStore`] with bucket semantics matching the managed
/// backend: writing to a missing bucket fails, `ensure_bucket` provisions.
#[derive(Default)]
pub struct MemoryBlobStore {
    buckets: RwLock<HashMap<String, BTreeMap<String, StoredBlob>>>,
}

struct StoredBlob {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

impl MemoryBlobStore {
    /// Creates an empty store with no buckets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with `bucket` already provisioned.
    #[must_use]
    pub fn with_bucket(bucket: &str) -> Self {
        let store = Self::new();
        store
            .buckets
            .write()
            .insert(bucket.to_string(), BTreeMap::new());
        store
    }

    /// Number of objects currently held in `bucket`.
    #[must_use]
    pub fn object_count(&self, bucket: &str) -> usize {
        self.buckets
            .read()
            .get(bucket)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn bucket_exists(&self, bucket: &str) -> BenchResult<bool> {
        Ok(self.buckets.read().contains_key(bucket))
    }

    async fn ensure_bucket(&self, bucket: &str) -> BenchResult<()> {
        self.buckets
            .write()
            .entry(bucket.to_string())
            .or_default();
        Ok(())
    }

    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> BenchResult<()> {
        if key.is_empty() {
            return Err(BenchError::input("blob key cannot be empty"));
        }
        let mut buckets = self.buckets.write();
        let objects = buckets.get_mut(bucket).ok_or_else(|| {
            BenchError::unavailable("blob store", format!("bucket `{bucket}` was not found"))
        })?;
        objects.insert(
            key.to_string(),
            StoredBlob {
                data,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> BenchResult<Bytes> {
        self.buckets
            .read()
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|blob| blob.data.clone())
            .ok_or_else(|| {
                BenchError::unavailable(
                    "blob store",
                    format!("object `{bucket}/{key}` was not found"),
                )
            })
    }

    async fn list(&self, bucket: &str, prefix: &str) -> BenchResult<Vec<BlobMetadata>> {
        Ok(self
            .buckets
            .read()
            .get(bucket)
            .map(|objects| {
                objects
                    .iter()
                    .filter(|(key, _)| key.starts_with(prefix))
                    .map(|(key, blob)| BlobMetadata {
                        key: key.clone(),
                        size_bytes: blob.data.len() as u64,
                        last_modified: blob.last_modified,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}
