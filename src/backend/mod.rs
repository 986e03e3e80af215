//! The search backend seam.
//!
//! [`SearchBackend`] is everything the engine needs from an
//! Elasticsearch-compatible cluster. [`http::ElasticClient`] talks to a real
//! cluster; [`memory::MemoryBackend`] keeps stores in process.

pub mod http;
pub mod memory;
pub mod types;

use crate::error::Result;
use crate::types::Document;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

pub use types::{
    FieldMapping, FieldType, Hit, Hits, Property, SearchRequest, SearchResponse, SourceFilter,
    StoreSettings, SuggestEntry, SuggestOption, TotalHits,
};

/// Backend operations, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Exists,
    Create,
    DeleteStore,
    PutMapping,
    Index,
    DeleteDocument,
    DeleteByQuery,
    Reindex,
    Refresh,
    Search,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Exists => "exists",
            Operation::Create => "create",
            Operation::DeleteStore => "delete_store",
            Operation::PutMapping => "put_mapping",
            Operation::Index => "index",
            Operation::DeleteDocument => "delete_document",
            Operation::DeleteByQuery => "delete_by_query",
            Operation::Reindex => "reindex",
            Operation::Refresh => "refresh",
            Operation::Search => "search",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn store_exists(&self, store: &str) -> Result<bool>;

    /// Create a store. Returns the backend's acknowledgement flag.
    async fn create_store(&self, store: &str, settings: &StoreSettings) -> Result<bool>;

    async fn delete_store(&self, store: &str) -> Result<()>;

    async fn put_mapping(&self, store: &str, mapping: &FieldMapping) -> Result<()>;

    /// Insert or replace the document with `id`.
    async fn index_document(&self, store: &str, id: &str, document: &Document) -> Result<()>;

    /// Delete one document. A missing document is not an error.
    async fn delete_document(&self, store: &str, id: &str) -> Result<()>;

    /// Make every write to `store` visible to searches and query deletes.
    async fn refresh_store(&self, store: &str) -> Result<()>;

    /// Delete every document matching `query`; returns the number deleted.
    async fn delete_by_query(&self, store: &str, query: &Value) -> Result<u64>;

    /// Copy all documents of `source` into `dest`.
    async fn reindex(&self, source: &str, dest: &str) -> Result<()>;

    async fn search(&self, store: &str, request: &SearchRequest) -> Result<SearchResponse>;
}
