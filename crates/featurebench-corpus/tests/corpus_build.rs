//! End-to-end corpus construction from files, blobs, and warehouse queries.

use std::sync::Arc;

use bytes::Bytes;
use featurebench_core::{BenchError, EntityRef};
use featurebench_corpus::{CorpusBuilder, EntitySource};
use featurebench_storage::{BlobStore, EntityRow, MemoryBlobStore, MemoryWarehouse};

const TEMPLATE: &str = r#"
requests_per_featurestore {
  featurestore_id: "fs"
  requests {
    read_feature_values_request {
      entity_type: "users"
      entity_id: "${ENTITY_ID}"
      feature_selector { id_matcher { ids: "age" } }
    }
  }
}
"#;

const LISTING: &str = "\
featurestores/fs/entityTypes/users/entities/a
featurestores/fs/entityTypes/users/entities/b
";

#[tokio::test]
async fn test_build_from_local_files() {
    let dir = tempfile::tempdir().unwrap();
    let template_path = dir.path().join("template.textproto");
    let entity_path = dir.path().join("entities.txt");
    tokio::fs::write(&template_path, TEMPLATE).await.unwrap();
    tokio::fs::write(&entity_path, LISTING).await.unwrap();

    let corpus = CorpusBuilder::new()
        .build(
            template_path.to_str().unwrap(),
            &EntitySource::Listing(entity_path.to_str().unwrap().to_string()),
        )
        .await
        .unwrap();

    assert_eq!(corpus.len(), 2);
    assert_eq!(corpus[0].entity(), &EntityRef::Single("a".into()));
    assert_eq!(corpus[1].entity(), &EntityRef::Single("b".into()));
}

#[tokio::test]
async fn test_build_from_blob_sources() {
    let blobs = Arc::new(MemoryBlobStore::with_bucket("inputs"));
    blobs
        .put("inputs", "template.textproto", Bytes::from(TEMPLATE))
        .await
        .unwrap();
    blobs
        .put("inputs", "entities.txt", Bytes::from(LISTING))
        .await
        .unwrap();

    let corpus = CorpusBuilder::new()
        .with_blob_store(blobs)
        .build(
            "gs://inputs/template.textproto",
            &EntitySource::Listing("gs://inputs/entities.txt".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(corpus.len(), 2);
}

#[tokio::test]
async fn test_build_from_warehouse_query() {
    let dir = tempfile::tempdir().unwrap();
    let template_path = dir.path().join("template.textproto");
    tokio::fs::write(&template_path, TEMPLATE).await.unwrap();

    let blobs = Arc::new(MemoryBlobStore::new());
    let warehouse = Arc::new(MemoryWarehouse::new(blobs).with_entity_rows(vec![
        EntityRow {
            featurestore_id: "fs".into(),
            entity_type_id: "users".into(),
            entity_id: "q1".into(),
        },
        EntityRow {
            featurestore_id: "fs".into(),
            entity_type_id: "users".into(),
            entity_id: "q2".into(),
        },
    ]));

    let corpus = CorpusBuilder::new()
        .with_warehouse(warehouse)
        .build(
            template_path.to_str().unwrap(),
            &EntitySource::WarehouseQuery(
                "SELECT featurestore_id, entity_type_id, entity_id FROM corpus".to_string(),
            ),
        )
        .await
        .unwrap();

    assert_eq!(corpus.len(), 2);
    assert_eq!(corpus[0].entity(), &EntityRef::Single("q1".into()));
}

#[tokio::test]
async fn test_missing_blob_is_fatal() {
    let blobs = Arc::new(MemoryBlobStore::with_bucket("inputs"));
    let result = CorpusBuilder::new()
        .with_blob_store(blobs)
        .build(
            "gs://inputs/template.textproto",
            &EntitySource::Listing("gs://inputs/entities.txt".to_string()),
        )
        .await;
    assert!(matches!(
        result,
        Err(BenchError::ExternalUnavailable { .. })
    ));
}

#[tokio::test]
async fn test_empty_corpus_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let template_path = dir.path().join("template.textproto");
    let entity_path = dir.path().join("entities.txt");
    // Placeholder with no matching entities expands to nothing.
    tokio::fs::write(&template_path, TEMPLATE).await.unwrap();
    tokio::fs::write(&entity_path, "").await.unwrap();

    let result = CorpusBuilder::new()
        .build(
            template_path.to_str().unwrap(),
            &EntitySource::Listing(entity_path.to_str().unwrap().to_string()),
        )
        .await;

    assert!(matches!(result, Err(BenchError::InputMalformed { .. })));
}
