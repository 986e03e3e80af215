//! # Catalog Index
//!
//! Keeps a catalog of objects searchable in an Elasticsearch-compatible
//! backend. Each index is denormalized into four kinds of store: a primary
//! store with one document per entity, a localized store with one document
//! per entity and language, one per-language view holding both, and a
//! relation store with one row per link between objects.
//!
//! The crate covers schema synthesis, the write fan-out from one entity into
//! those stores, and the read path that turns a relational [`QueryPlan`] into
//! native search requests, including a score-threshold relevance mode and
//! "did you mean" suggestions.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use catalog_index::{
//!     BackendConfig, ColumnType, ConnectionCache, IndexColumn, IndexDefinition, IndexWorker,
//!     QueryPlan, StaticEntity, WorkerConfig,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> catalog_index::Result<()> {
//! let worker = IndexWorker::new(Arc::new(ConnectionCache::http(None)), WorkerConfig::default());
//! let index = IndexDefinition::new("products", BackendConfig::new("http://localhost:9200"))
//!     .with_column(IndexColumn::new("price", ColumnType::Double));
//!
//! worker.create_or_update_index_structures(&index).await?;
//! worker
//!     .update_index(&index, &StaticEntity::new(1).with_value("price", 9.5))
//!     .await?;
//!
//! let mut listing = worker.listing(&index, QueryPlan::new().where_clause("price > 5")?)?;
//! let ids = listing.load().await?;
//! println!("{} of {} hits", ids.len(), listing.last_record_count());
//! # Ok(())
//! # }
//! ```
//!
//! Tests and tools that need no cluster can use
//! [`ConnectionCache::memory`] with a [`backend::memory::MemoryBackend`].

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod index;
pub mod model;
pub mod query;
pub mod types;

pub use backend::SearchBackend;
pub use cache::{ConnectionCache, Connector, HttpConnector, MemoryConnector};
pub use config::{BackendConfig, LanguageProvider, WorkerConfig};
pub use error::{IndexError, Result};
pub use index::{IndexWorker, Outcome, StoreNames};
pub use model::*;
pub use query::{Condition, GroupValue, Listing, QueryPlan, SortDirection, Suggestion, VariantMode};
pub use types::*;
