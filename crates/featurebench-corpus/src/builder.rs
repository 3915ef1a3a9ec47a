//! Corpus builder: turns template + entity inputs into the ordered request
//! sequence.

use std::sync::Arc;

use featurebench_core::{BenchError, BenchResult, FeatureStoreRequest, GcsPath};
use featurebench_storage::{BlobStore, Warehouse};

use crate::entities::{EntityMap, ENTITY_ID_PLACEHOLDER};
use crate::template::{parse_template, RequestTemplate, TemplateRequest};

/// Where the entity corpus comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntitySource {
    /// A whitespace-separated resource listing; local path or `gs://` URI.
    Listing(String),
    /// A warehouse query with result columns `featurestore_id`,
    /// `entity_type_id`, `entity_id`.
    WarehouseQuery(String),
}

/// Builds the request corpus from a template document and an entity corpus.
///
/// Either input may live on the blob store (`gs://` URI) or the local
/// filesystem. Failure anywhere is fatal: no partial corpus is ever
/// returned.
#[derive(Default)]
pub struct CorpusBuilder {
    blobs: Option<Arc<dyn BlobStore>>,
    warehouse: Option<Arc<dyn Warehouse>>,
}

impl CorpusBuilder {
    /// Creates a builder that can only read local files.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables `gs://` sources.
    #[must_use]
    pub fn with_blob_store(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    /// Enables [`EntitySource::WarehouseQuery`] sources.
    #[must_use]
    pub fn with_warehouse(mut self, warehouse: Arc<dyn Warehouse>) -> Self {
        self.warehouse = Some(warehouse);
        self
    }

    /// Materializes the corpus.
    ///
    /// Ordering follows template traversal order; placeholder expansion
    /// emits ids in entity-map insertion order.
    ///
    /// # Errors
    ///
    /// - `BenchError::InputMalformed` for template or listing syntax errors,
    ///   and when the final corpus is empty
    /// - `BenchError::ExternalUnavailable` for missing blobs or failed
    ///   warehouse queries
    pub async fn build(
        &self,
        template_source: &str,
        entity_source: &EntitySource,
    ) -> BenchResult<Vec<FeatureStoreRequest>> {
        let entities = match entity_source {
            EntitySource::Listing(location) => {
                EntityMap::from_listing(&self.read_source(location).await?)?
            }
            EntitySource::WarehouseQuery(sql) => {
                let warehouse = self.warehouse.as_ref().ok_or_else(|| {
                    BenchError::internal("warehouse entity source used without a warehouse")
                })?;
                EntityMap::from_rows(warehouse.query_entities(sql).await?)
            }
        };

        let template = parse_template(&self.read_source(template_source).await?)?;
        let corpus = expand_template(&template, &entities)?;
        if corpus.is_empty() {
            return Err(BenchError::input(
                "no feature value queries generated from the template",
            ));
        }

        tracing::info!(
            requests = corpus.len(),
            entities = entities.len(),
            "Built request corpus"
        );
        Ok(corpus)
    }

    async fn read_source(&self, location: &str) -> BenchResult<String> {
        if GcsPath::is_gcs_uri(location) {
            let blobs = self.blobs.as_ref().ok_or_else(|| {
                BenchError::internal(format!(
                    "`{location}` requires a blob store, none configured"
                ))
            })?;
            let (bucket, key) = GcsPath::parse_object(location)?;
            let data = blobs.get(&bucket, &key).await?;
            String::from_utf8(data.to_vec())
                .map_err(|e| BenchError::input(format!("`{location}` is not UTF-8: {e}")))
        } else {
            Ok(tokio::fs::read_to_string(location).await?)
        }
    }
}

/// Expands a parsed template against the entity mapping.
///
/// Single-entity requests are distributive over expansion: a placeholder
/// with `k` matching ids produces `k` requests. Streaming requests splice
/// the matching ids into the `entity_ids` list in place.
pub fn expand_template(
    template: &RequestTemplate,
    entities: &EntityMap,
) -> BenchResult<Vec<FeatureStoreRequest>> {
    let mut corpus = Vec::new();

    for group in &template.groups {
        let featurestore_id = &group.featurestore_id;
        for request in &group.requests {
            match request {
                TemplateRequest::Read(read) => {
                    let matching = entities.ids(featurestore_id, &read.entity_type);
                    for entity_id in expand_entity(&read.entity_id, matching) {
                        corpus.push(FeatureStoreRequest::single(
                            featurestore_id,
                            &read.entity_type,
                            entity_id,
                            read.feature_ids.clone(),
                        )?);
                    }
                }
                TemplateRequest::StreamingRead(streaming) => {
                    let matching = entities.ids(featurestore_id, &streaming.entity_type);
                    let entity_ids: Vec<String> = streaming
                        .entity_ids
                        .iter()
                        .flat_map(|id| expand_entity(id, matching))
                        .collect();
                    corpus.push(FeatureStoreRequest::streaming(
                        featurestore_id,
                        &streaming.entity_type,
                        entity_ids,
                        streaming.feature_ids.clone(),
                    )?);
                }
            }
        }
    }

    Ok(corpus)
}

fn expand_entity(entity_id: &str, matching: &[String]) -> Vec<String> {
    if entity_id == ENTITY_ID_PLACEHOLDER {
        matching.to_vec()
    } else {
        vec![entity_id.to_string()]
    }
}
