use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use featurebench_core::{BenchError, BenchResult, FeatureStoreRequest};

use crate::rest::FeatureStoreCaller;

/// The single-method capability that turns one request into one call
/// against the remote service.
///
/// Implementations must be cheap to share across worker tasks; channel or
/// client construction happens once per run, at build time.
#[async_trait]
pub trait Caller<R>: Send + Sync
where
    R: Send + Sync,
{
    /// Issues one request. Errors surface to the sample executor, which
    /// logs them and drops the task's latency.
    async fn issue(&self, request: &R) -> BenchResult<()>;
}

/// Feature-service API version a caller speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    V1,
    V1beta1,
}

impl ApiVersion {
    /// The URL path segment for this version.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V1beta1 => "v1beta1",
        }
    }
}

impl FromStr for ApiVersion {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v1" => Ok(Self::V1),
            "v1beta1" => Ok(Self::V1beta1),
            other => Err(BenchError::input(format!("unknown API version `{other}`"))),
        }
    }
}

/// Which read surface the caller exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMethod {
    Get,
    List,
}

impl FromStr for ReadMethod {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "list" => Ok(Self::List),
            other => Err(BenchError::input(format!("unknown read method `{other}`"))),
        }
    }
}

/// Default service endpoint for a region.
#[must_use]
pub fn default_endpoint(location: &str) -> String {
    format!("{location}-aiplatform.googleapis.com:443")
}

/// Builds the concrete feature-store caller for an API version.
///
/// Both versions share the same constructor surface; the endpoint defaults
/// to [`default_endpoint`] when no override is given.
pub struct CallerBuilder {
    api_version: ApiVersion,
    project: String,
    location: String,
    method: ReadMethod,
    endpoint_override: Option<String>,
    bearer_token: Option<String>,
}

impl CallerBuilder {
    /// Starts a builder for `api_version` against `project` in `location`.
    #[must_use]
    pub fn new(
        api_version: ApiVersion,
        project: impl Into<String>,
        location: impl Into<String>,
        method: ReadMethod,
    ) -> Self {
        Self {
            api_version,
            project: project.into(),
            location: location.into(),
            method,
            endpoint_override: None,
            bearer_token: None,
        }
    }

    /// Overrides the service endpoint. An empty override keeps the default.
    #[must_use]
    pub fn endpoint_override(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        if !endpoint.is_empty() {
            self.endpoint_override = Some(endpoint);
        }
        self
    }

    /// Attaches a bearer token to every request.
    #[must_use]
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Constructs the caller.
    ///
    /// # Errors
    ///
    /// Returns `BenchError::ExternalUnavailable` when the underlying HTTP
    /// client cannot be constructed.
    pub fn build(self) -> BenchResult<Arc<dyn Caller<FeatureStoreRequest>>> {
        let endpoint = self
            .endpoint_override
            .unwrap_or_else(|| default_endpoint(&self.location));
        let caller = FeatureStoreCaller::new(
            self.api_version,
            self.project,
            self.location,
            endpoint,
            self.method,
            self.bearer_token,
        )?;
        Ok(Arc::new(caller))
    }
}
