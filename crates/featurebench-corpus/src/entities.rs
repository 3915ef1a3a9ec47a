//! Entity corpus: the `featurestore -> entity type -> entity ids` mapping
//! used to expand `${ENTITY_ID}` placeholders.

use std::collections::HashMap;

use featurebench_core::{BenchError, BenchResult};
use featurebench_storage::EntityRow;

/// Literal that expands to the known entity ids of the surrounding
/// `(featurestore, entity type)` pair.
pub const ENTITY_ID_PLACEHOLDER: &str = "${ENTITY_ID}";

/// Ordered entity-id mapping. Duplicates are preserved in insertion order;
/// the mapping exists only to drive placeholder expansion.
#[derive(Debug, Clone, Default)]
pub struct EntityMap {
    inner: HashMap<String, HashMap<String, Vec<String>>>,
}

impl EntityMap {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a whitespace-separated entity listing.
    ///
    /// Each token must be a six-segment resource path
    /// `featurestores/{FS}/entityTypes/{ET}/entities/{ID}`.
    ///
    /// # Errors
    ///
    /// Returns `BenchError::InputMalformed` on the first token that does not
    /// have exactly six segments.
    pub fn from_listing(contents: &str) -> BenchResult<Self> {
        let mut map = Self::new();
        for token in contents.split_whitespace() {
            let segments: Vec<&str> = token.split('/').collect();
            if segments.len() != 6 {
                return Err(BenchError::input(format!(
                    "entity resource ill-formatted: `{token}`"
                )));
            }
            map.insert(segments[1], segments[3], segments[5]);
        }
        Ok(map)
    }

    /// Builds a mapping from warehouse query rows, in row order.
    #[must_use]
    pub fn from_rows(rows: impl IntoIterator<Item = EntityRow>) -> Self {
        let mut map = Self::new();
        for row in rows {
            map.insert(&row.featurestore_id, &row.entity_type_id, &row.entity_id);
        }
        map
    }

    /// Appends an entity id under `(featurestore, entity_type)`.
    pub fn insert(&mut self, featurestore: &str, entity_type: &str, entity_id: &str) {
        self.inner
            .entry(featurestore.to_string())
            .or_default()
            .entry(entity_type.to_string())
            .or_default()
            .push(entity_id.to_string());
    }

    /// The known entity ids for a `(featurestore, entity_type)` pair, in
    /// insertion order. Unknown pairs yield an empty slice.
    #[must_use]
    pub fn ids(&self, featurestore: &str, entity_type: &str) -> &[String] {
        self.inner
            .get(featurestore)
            .and_then(|types| types.get(entity_type))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of entity ids across all pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .values()
            .flat_map(HashMap::values)
            .map(Vec::len)
            .sum()
    }

    /// Whether no entity ids are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_parse_preserves_order_and_duplicates() {
        let listing = "\
            featurestores/fs/entityTypes/users/entities/b\n\
            featurestores/fs/entityTypes/users/entities/a \
            featurestores/fs/entityTypes/users/entities/b\t\
            featurestores/other/entityTypes/movies/entities/m1";
        let map = EntityMap::from_listing(listing).unwrap();

        assert_eq!(map.ids("fs", "users"), ["b", "a", "b"]);
        assert_eq!(map.ids("other", "movies"), ["m1"]);
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_listing_rejects_wrong_segment_count() {
        for bad in [
            "featurestores/fs/entityTypes/users/entities",
            "featurestores/fs/entityTypes/users/entities/a/extra",
            "plain-token",
        ] {
            let err = EntityMap::from_listing(bad).unwrap_err();
            assert!(
                matches!(err, BenchError::InputMalformed { .. }),
                "expected rejection for `{bad}`"
            );
        }
    }

    #[test]
    fn test_unknown_pair_is_empty() {
        let map = EntityMap::new();
        assert!(map.ids("fs", "users").is_empty());
        assert!(map.is_empty());
    }

    #[test]
    fn test_from_rows() {
        let rows = vec![
            EntityRow {
                featurestore_id: "fs".into(),
                entity_type_id: "users".into(),
                entity_id: "u1".into(),
            },
            EntityRow {
                featurestore_id: "fs".into(),
                entity_type_id: "users".into(),
                entity_id: "u2".into(),
            },
        ];
        let map = EntityMap::from_rows(rows);
        assert_eq!(map.ids("fs", "users"), ["u1", "u2"]);
    }
}
