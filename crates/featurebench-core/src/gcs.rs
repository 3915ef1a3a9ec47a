use std::fmt;

use crate::error::{BenchError, BenchResult};

/// URI scheme prefix for blob-store locations.
pub const GS_SCHEME: &str = "gs://";

/// Parsed `gs://bucket/prefix/` output location.
///
/// The prefix is normalized to end with `/` (or be empty), so object names
/// can be appended directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcsPath {
    bucket: String,
    prefix: String,
}

impl GcsPath {
    /// Parses and normalizes a `gs://` location.
    ///
    /// # Errors
    ///
    /// Returns `BenchError::InputMalformed` when the scheme is missing or the
    /// bucket segment is empty.
    pub fn parse(raw: &str) -> BenchResult<Self> {
        let rest = raw
            .strip_prefix(GS_SCHEME)
            .ok_or_else(|| BenchError::input(format!("invalid GCS path: `{raw}`")))?;

        let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(BenchError::input(format!("invalid GCS path: `{raw}`")));
        }

        let mut prefix = prefix.to_string();
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }

        Ok(Self {
            bucket: bucket.to_string(),
            prefix,
        })
    }

    /// Splits a full object URI into `(bucket, key)`.
    ///
    /// Unlike [`GcsPath::parse`], the key is taken verbatim and must be
    /// non-empty.
    ///
    /// # Errors
    ///
    /// Returns `BenchError::InputMalformed` when the scheme, bucket, or key
    /// is missing.
    pub fn parse_object(uri: &str) -> BenchResult<(String, String)> {
        let rest = uri
            .strip_prefix(GS_SCHEME)
            .ok_or_else(|| BenchError::input(format!("invalid GCS object URI: `{uri}`")))?;
        match rest.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
                Ok((bucket.to_string(), key.to_string()))
            }
            _ => Err(BenchError::input(format!("invalid GCS object URI: `{uri}`"))),
        }
    }

    /// Whether a source string refers to the blob store rather than a local
    /// file.
    #[must_use]
    pub fn is_gcs_uri(source: &str) -> bool {
        source.starts_with(GS_SCHEME)
    }

    /// The bucket component.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The normalized object prefix (empty or `/`-terminated).
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Object key for `name` under this location's prefix.
    #[must_use]
    pub fn object(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Full `gs://` URI for `name` under this location.
    #[must_use]
    pub fn uri(&self, name: &str) -> String {
        format!("{GS_SCHEME}{}/{}{}", self.bucket, self.prefix, name)
    }
}

impl fmt::Display for GcsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{GS_SCHEME}{}/{}", self.bucket, self.prefix)
    }
}
