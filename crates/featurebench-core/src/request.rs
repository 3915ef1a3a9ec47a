use serde::{Deserialize, Serialize};

use crate::error::{BenchError, BenchResult};

/// The entity reference carried by a request.
///
/// Exactly one shape is populated: a single entity id for point reads, or an
/// ordered id list for streaming reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityRef {
    /// Point read of one entity.
    Single(String),
    /// Streaming read over an ordered set of entities.
    Streaming(Vec<String>),
}

/// One immutable, parameterized call to the remote feature service.
///
/// Built once by the corpus builder and treated as read-only for the rest of
/// the run; the work queue hands out shared references only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureStoreRequest {
    featurestore_id: String,
    entity_type: String,
    entity: EntityRef,
    feature_ids: Vec<String>,
}

impl FeatureStoreRequest {
    /// Creates a single-entity read request.
    ///
    /// # Errors
    ///
    /// Returns `BenchError::InputMalformed` when the entity id is empty or no
    /// feature ids are given.
    pub fn single(
        featurestore_id: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        feature_ids: Vec<String>,
    ) -> BenchResult<Self> {
        let entity_id = entity_id.into();
        if entity_id.is_empty() {
            return Err(BenchError::input("request has an empty entity id"));
        }
        Self::validated(
            featurestore_id.into(),
            entity_type.into(),
            EntityRef::Single(entity_id),
            feature_ids,
        )
    }

    /// Creates a streaming read request over `entity_ids`.
    ///
    /// # Errors
    ///
    /// Returns `BenchError::InputMalformed` when the entity id list or the
    /// feature id list is empty.
    pub fn streaming(
        featurestore_id: impl Into<String>,
        entity_type: impl Into<String>,
        entity_ids: Vec<String>,
        feature_ids: Vec<String>,
    ) -> BenchResult<Self> {
        if entity_ids.is_empty() {
            return Err(BenchError::input(
                "streaming request resolved to no entity ids",
            ));
        }
        Self::validated(
            featurestore_id.into(),
            entity_type.into(),
            EntityRef::Streaming(entity_ids),
            feature_ids,
        )
    }

    fn validated(
        featurestore_id: String,
        entity_type: String,
        entity: EntityRef,
        feature_ids: Vec<String>,
    ) -> BenchResult<Self> {
        if feature_ids.is_empty() {
            return Err(BenchError::input("request selects no feature ids"));
        }
        Ok(Self {
            featurestore_id,
            entity_type,
            entity,
            feature_ids,
        })
    }

    /// The featurestore this request targets.
    #[must_use]
    pub fn featurestore_id(&self) -> &str {
        &self.featurestore_id
    }

    /// The entity type within the featurestore.
    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// The entity reference (single or streaming).
    #[must_use]
    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    /// The selected feature ids, in declaration order.
    #[must_use]
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    /// Whether this request takes the streaming read path.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        matches!(self.entity, EntityRef::Streaming(_))
    }
}
