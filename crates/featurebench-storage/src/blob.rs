use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use featurebench_core::BenchResult;

/// Metadata returned by list operations.
#[derive(Debug, Clone)]
pub struct BlobMetadata {
    /// Object key within its bucket.
    pub key: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Last modification timestamp.
    pub last_modified: DateTime<Utc>,
}

/// Blob sink contract.
///
/// All implementations must be thread-safe and support concurrent
/// operations. Keys are UTF-8 strings treated as opaque identifiers; buckets
/// are flat namespaces of keys.
///
/// # Error Handling
///
/// Methods return `BenchResult<T>`:
/// - `BenchError::ExternalUnavailable` - bucket or object missing, or a
///   backend-specific failure (network, permissions)
/// - `BenchError::InputMalformed` - empty key
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Whether `bucket` exists.
    async fn bucket_exists(&self, bucket: &str) -> BenchResult<bool>;

    /// Creates `bucket` when missing; succeeds when it already exists.
    async fn ensure_bucket(&self, bucket: &str) -> BenchResult<()>;

    /// Writes an object (overwrites if present).
    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> BenchResult<()>;

    /// Reads an object's full contents.
    async fn get(&self, bucket: &str, key: &str) -> BenchResult<Bytes>;

    /// Lists objects under `prefix` within `bucket`.
    async fn list(&self, bucket: &str, prefix: &str) -> BenchResult<Vec<BlobMetadata>>;
}
