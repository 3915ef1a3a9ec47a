//! REST transport for the feature-retrieval service.

use async_trait::async_trait;
use featurebench_core::{BenchError, BenchResult, EntityRef, FeatureStoreRequest};
use serde_json::json;

use crate::caller::{ApiVersion, Caller, ReadMethod};

/// Caller speaking the feature service's REST surface.
///
/// One HTTP client (and its connection pool) is constructed per run and
/// shared by every worker task. The API version only selects the URL path
/// segment; both versions share the request shapes.
pub struct FeatureStoreCaller {
    client: reqwest::Client,
    base_url: String,
    project: String,
    location: String,
    bearer_token: Option<String>,
}

impl FeatureStoreCaller {
    pub(crate) fn new(
        api_version: ApiVersion,
        project: String,
        location: String,
        endpoint: String,
        method: ReadMethod,
        bearer_token: Option<String>,
    ) -> BenchResult<Self> {
        // Endpoints arrive in gRPC `host:443` form; REST speaks https to the
        // same host.
        let host = endpoint.strip_suffix(":443").unwrap_or(&endpoint);
        let base_url = format!("https://{host}/{}", api_version.as_str());

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| BenchError::unavailable("feature service", e.to_string()))?;

        tracing::debug!(
            %base_url,
            project,
            location,
            ?method,
            "Constructed feature-store caller"
        );

        Ok(Self {
            client,
            base_url,
            project,
            location,
            bearer_token,
        })
    }

    /// Fully-qualified entity-type resource name for a request.
    fn entity_type_name(&self, request: &FeatureStoreRequest) -> String {
        format!(
            "projects/{}/locations/{}/featurestores/{}/entityTypes/{}",
            self.project,
            self.location,
            request.featurestore_id(),
            request.entity_type()
        )
    }

    async fn post(&self, url: String, body: serde_json::Value) -> BenchResult<()> {
        let mut builder = self.client.post(&url).json(&body);
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| BenchError::unavailable("feature service", e.to_string()))?;
        response
            .error_for_status()
            .map_err(|e| BenchError::unavailable("feature service", e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl Caller<FeatureStoreRequest> for FeatureStoreCaller {
    async fn issue(&self, request: &FeatureStoreRequest) -> BenchResult<()> {
        let entity_type = self.entity_type_name(request);
        let selector = json!({
            "idMatcher": { "ids": request.feature_ids() }
        });

        match request.entity() {
            EntityRef::Single(entity_id) => {
                let url = format!("{}/{entity_type}:readFeatureValues", self.base_url);
                self.post(
                    url,
                    json!({
                        "entityId": entity_id,
                        "featureSelector": selector,
                    }),
                )
                .await
            }
            EntityRef::Streaming(entity_ids) => {
                let url = format!("{}/{entity_type}:streamingReadFeatureValues", self.base_url);
                self.post(
                    url,
                    json!({
                        "entityIds": entity_ids,
                        "featureSelector": selector,
                    }),
                )
                .await
            }
        }
    }
}
