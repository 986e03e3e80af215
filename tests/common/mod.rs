#![allow(dead_code)]

use catalog_index::backend::memory::MemoryBackend;
use catalog_index::{
    BackendConfig, ColumnType, ConnectionCache, IndexColumn, IndexDefinition, IndexWorker,
    RelationalValue, SourceType, StaticEntity, WorkerConfig,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub const HOSTS: &str = "http://search.test:9200";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn worker_config() -> WorkerConfig {
    WorkerConfig {
        prefix: "shop".to_string(),
        languages: vec!["en".to_string(), "de".to_string()],
        number_of_shards: 1,
        ..Default::default()
    }
}

/// A worker over a fresh in-process backend, languages `en` and `de`.
pub fn memory_worker() -> (IndexWorker, Arc<MemoryBackend>) {
    init_tracing();
    let backend = Arc::new(MemoryBackend::new());
    let cache = Arc::new(ConnectionCache::memory(backend.clone()));
    (IndexWorker::new(cache, worker_config()), backend)
}

pub fn products() -> IndexDefinition {
    IndexDefinition::new("Products", BackendConfig::new(HOSTS))
        .with_column(IndexColumn::new("price", ColumnType::Double))
        .with_column(
            IndexColumn::new("sku", ColumnType::String).with_source(SourceType::ManyToOneRelation),
        )
        .with_column(IndexColumn::new("color", ColumnType::String))
        .with_column(IndexColumn::new("stock", ColumnType::Integer))
        .with_column(
            IndexColumn::new("title", ColumnType::String).with_source(SourceType::LocalizedFields),
        )
}

/// Four products; 1 and 2 are variants of parent 100.
pub fn catalog() -> Vec<StaticEntity> {
    let mut red_shoe = StaticEntity::new(1)
        .with_value("price", 10.0)
        .with_value("color", "red")
        .with_value("stock", 3i64)
        .with_localized("en", "title", "Red Running Shoe")
        .with_localized("de", "title", "Roter Laufschuh")
        .with_relation("categories", RelationalValue::new(7, "object"))
        .with_relation("categories", RelationalValue::new(8, "object"));
    red_shoe.virtual_object_id = Some(100);

    let mut blue_shoe = StaticEntity::new(2)
        .with_value("price", 25.0)
        .with_value("color", "blue")
        .with_value("stock", 0i64)
        .with_localized("en", "title", "Blue Running Shoe")
        .with_relation("categories", RelationalValue::new(7, "object"));
    blue_shoe.virtual_object_id = Some(100);

    let boot = StaticEntity::new(3)
        .with_value("price", 40.0)
        .with_value("color", "red")
        .with_value("stock", 12i64)
        .with_localized("en", "title", "Leather Boot")
        .with_relation("categories", RelationalValue::new(9, "object"))
        .with_relation("brand", RelationalValue::new(50, "object"));

    let hat = StaticEntity::new(4)
        .with_value("price", 5.0)
        .with_value("color", "green")
        .with_value("stock", 1i64)
        .with_localized("en", "title", "Wool Hat")
        .with_relation("brand", RelationalValue::new(51, "object"));

    vec![red_shoe, blue_shoe, boot, hat]
}

/// Synchronize the schema of [`products`] and index the [`catalog`].
pub async fn seeded() -> (IndexWorker, Arc<MemoryBackend>, IndexDefinition) {
    let (worker, backend) = memory_worker();
    let index = products();
    worker
        .create_or_update_index_structures(&index)
        .await
        .unwrap();
    for entity in catalog() {
        let outcome = worker.update_index(&index, &entity).await.unwrap();
        assert!(outcome.is_clean(), "seeding failed: {:?}", outcome);
    }
    (worker, backend, index)
}
