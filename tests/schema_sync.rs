mod common;

use catalog_index::backend::{FieldType, Operation};
use catalog_index::{
    BackendConfig, ColumnType, IndexColumn, IndexDefinition, IndexError, StaticEntity,
};
use serde_json::json;

fn sorted(mut names: Vec<String>) -> Vec<String> {
    names.sort();
    names
}

#[tokio::test]
async fn test_column_types_map_to_backend_types() {
    let (worker, _backend) = common::memory_worker();
    let mapping = worker.primary_properties(&common::products()).unwrap();

    assert_eq!(serde_json::to_value(&mapping["price"]).unwrap(), json!({"type": "double"}));
    assert_eq!(serde_json::to_value(&mapping["sku"]).unwrap(), json!({"type": "keyword"}));
    assert_eq!(mapping["stock"].field_type, FieldType::Integer);
    assert_eq!(mapping["o_id"].field_type, FieldType::Integer);
}

#[tokio::test]
async fn test_sync_creates_every_store() {
    let (worker, backend) = common::memory_worker();
    let index = common::products();

    let outcome = worker.create_or_update_index_structures(&index).await.unwrap();
    assert!(outcome.is_clean());

    let expected = vec![
        "shop_localized_products".to_string(),
        "shop_localized_products_de".to_string(),
        "shop_localized_products_en".to_string(),
        "shop_products".to_string(),
        "shop_relations_products".to_string(),
    ];
    assert_eq!(backend.store_names(), expected);

    let primary = backend.store("shop_products").unwrap();
    assert_eq!(primary.mapping["price"].field_type, FieldType::Double);
    assert!(!primary.mapping.contains_key("title"));
    let settings = primary.settings.unwrap();
    assert_eq!(settings.number_of_shards, 1);
    assert_eq!(settings.number_of_replicas, 0);

    let localized = backend.store("shop_localized_products").unwrap();
    assert!(localized.mapping.contains_key("title"));
    assert!(localized.mapping.contains_key("language"));
    assert!(!localized.mapping.contains_key("price"));

    let view = backend.store("shop_localized_products_de").unwrap();
    assert!(view.mapping.contains_key("title"));
    assert!(view.mapping.contains_key("price"));
}

#[tokio::test]
async fn test_sync_is_idempotent_and_truncates() {
    let (worker, backend) = common::memory_worker();
    let index = common::products();

    worker.create_or_update_index_structures(&index).await.unwrap();
    let first = backend.store("shop_products").unwrap().mapping;

    worker
        .update_index(&index, &StaticEntity::new(1).with_value("price", 3.0))
        .await
        .unwrap();
    assert_eq!(backend.document_ids("shop_products"), vec!["1".to_string()]);

    let outcome = worker.create_or_update_index_structures(&index).await.unwrap();
    assert!(outcome.is_clean());
    let second = backend.store("shop_products").unwrap().mapping;

    assert_eq!(first, second);
    assert!(backend.document_ids("shop_products").is_empty());
}

#[tokio::test]
async fn test_refused_acknowledgement_is_fatal() {
    let (worker, backend) = common::memory_worker();
    backend.refuse_acknowledgement(true);

    let err = worker
        .create_or_update_index_structures(&common::products())
        .await
        .unwrap_err();
    assert_eq!(err, IndexError::StoreCreationFailed("shop_products".to_string()));
    assert!(err.is_fatal());
    assert!(backend.store_names().is_empty());
}

#[tokio::test]
async fn test_unsupported_type_aborts_before_touching_stores() {
    let (worker, backend) = common::memory_worker();
    let index = common::products().with_column(IndexColumn::new("blob", ColumnType::from("LONGBLOB")));

    let err = worker.create_or_update_index_structures(&index).await.unwrap_err();
    assert_eq!(err, IndexError::UnsupportedFieldType("LONGBLOB".to_string()));
    assert!(backend.store_names().is_empty());
}

#[tokio::test]
async fn test_mapping_failure_is_best_effort() {
    let (worker, backend) = common::memory_worker();
    backend.fail_on(Operation::PutMapping, "shop_relations_products");

    let outcome = worker
        .create_or_update_index_structures(&common::products())
        .await
        .unwrap();

    assert_eq!(outcome.failed_stores(), vec!["shop_relations_products"]);
    assert_eq!(backend.store_names().len(), 5);
    assert!(backend.store("shop_products").unwrap().mapping.contains_key("price"));
}

#[tokio::test]
async fn test_failed_existence_check_still_recreates() {
    let (worker, backend, index) = common::seeded().await;
    backend.fail_on(Operation::Exists, "shop_products");

    let outcome = worker.create_or_update_index_structures(&index).await.unwrap();

    assert_eq!(outcome.failed_stores(), vec!["shop_products"]);
    assert_eq!(backend.store_names().len(), 5);
    assert!(backend.document_ids("shop_products").is_empty());
    assert!(backend.store("shop_products").unwrap().mapping.contains_key("price"));
}

#[tokio::test]
async fn test_store_surviving_its_delete_is_kept() {
    let (worker, backend, index) = common::seeded().await;
    backend.fail_on(Operation::DeleteStore, "shop_products");

    let outcome = worker.create_or_update_index_structures(&index).await.unwrap();

    assert_eq!(outcome.failed_stores(), vec!["shop_products", "shop_products"]);
    assert!(matches!(
        &outcome.failures()[1],
        IndexError::BackendCallFailed { operation, .. } if operation == "create"
    ));
    // not truncated, but the mapping is still refreshed
    assert_eq!(backend.document_ids("shop_products").len(), 4);
    assert!(backend.store("shop_products").unwrap().mapping.contains_key("price"));
    // the other stores were recreated empty
    assert!(backend.document_ids("shop_relations_products").is_empty());
}

#[tokio::test]
async fn test_missing_hosts_is_reported() {
    let (worker, _backend) = common::memory_worker();
    let index = IndexDefinition::new("products", BackendConfig::default());

    let err = worker.create_or_update_index_structures(&index).await.unwrap_err();
    assert!(matches!(err, IndexError::MissingConfiguration(_)));
}

#[tokio::test]
async fn test_rename_without_stores_is_a_noop() {
    let (worker, backend) = common::memory_worker();
    let index = common::products();

    let outcome = worker
        .rename_index_structures(&index, "products", "footwear")
        .await
        .unwrap();
    assert!(outcome.is_clean());
    assert!(backend.store_names().is_empty());
}

#[tokio::test]
async fn test_rename_moves_every_store() {
    let (worker, backend, index) = common::seeded().await;

    let outcome = worker
        .rename_index_structures(&index, "products", "footwear")
        .await
        .unwrap();
    assert!(outcome.is_clean());

    assert_eq!(
        backend.store_names(),
        sorted(worker.names().all("footwear", &worker.languages()))
    );
    assert!(backend.document("shop_footwear", "3").is_some());
    assert!(backend.document("shop_localized_footwear_de", "1").is_some());
    assert!(backend.document("shop_relations_footwear", "3_50_brand").is_some());
}

#[tokio::test]
async fn test_rename_keeps_store_when_copy_fails() {
    let (worker, backend, index) = common::seeded().await;
    backend.fail_on(Operation::Reindex, "shop_products");

    let outcome = worker
        .rename_index_structures(&index, "products", "footwear")
        .await
        .unwrap();

    assert_eq!(outcome.failed_stores(), vec!["shop_products"]);
    assert!(backend.store("shop_products").is_some());
    assert!(backend.store("shop_footwear").is_none());
    assert!(backend.store("shop_localized_products").is_none());
    assert!(backend.store("shop_localized_footwear").is_some());
}

#[tokio::test]
async fn test_delete_index_structures() {
    let (worker, backend, index) = common::seeded().await;

    let outcome = worker.delete_index_structures(&index).await.unwrap();
    assert!(outcome.is_clean());
    assert!(backend.store_names().is_empty());

    // every store is already gone; each delete still runs and reports
    let outcome = worker.delete_index_structures(&index).await.unwrap();
    assert_eq!(outcome.failures().len(), 5);
}
