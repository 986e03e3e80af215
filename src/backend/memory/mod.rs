//! In-process backend.
//!
//! Holds stores in memory and evaluates the query subset produced by the
//! translator: `bool`, `term`, `terms`, `range`, `exists`, `wildcard`,
//! `match`/`multi_match` (scored, with `AUTO` fuzziness), `match_all`, plus
//! sorting, `collapse`, `min_score`, `terms`/`cardinality` aggregations and
//! the `term`/`phrase` suggesters. Failures can be injected per operation
//! and store.

mod eval;
mod suggest;

use super::{
    FieldMapping, Hit, Hits, Operation, SearchBackend, SearchRequest, SearchResponse,
    SourceFilter, StoreSettings, TotalHits,
};
use crate::error::{IndexError, Result};
use crate::types::Document;
use async_trait::async_trait;
use dashmap::DashMap;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

const DEFAULT_SIZE: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub settings: Option<StoreSettings>,
    pub mapping: FieldMapping,
    pub documents: IndexMap<String, Document>,
}

#[derive(Default)]
pub struct MemoryBackend {
    stores: DashMap<String, MemoryStore>,
    failures: DashMap<(Operation, String), String>,
    refuse_acknowledgement: AtomicBool,
    search_count: AtomicUsize,
    searches: Mutex<Vec<(String, SearchRequest)>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `operation` on `store` fail. `"*"` matches every store.
    pub fn fail_on(&self, operation: Operation, store: &str) {
        self.failures.insert(
            (operation, store.to_string()),
            format!("injected {} failure", operation),
        );
    }

    pub fn clear_failures(&self) {
        self.failures.clear();
    }

    /// Answer store creation with `acknowledged: false`.
    pub fn refuse_acknowledgement(&self, refuse: bool) {
        self.refuse_acknowledgement.store(refuse, Ordering::SeqCst);
    }

    pub fn store(&self, name: &str) -> Option<MemoryStore> {
        self.stores.get(name).map(|s| s.clone())
    }

    pub fn store_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn document(&self, store: &str, id: &str) -> Option<Document> {
        self.stores.get(store)?.documents.get(id).cloned()
    }

    pub fn document_ids(&self, store: &str) -> Vec<String> {
        self.stores
            .get(store)
            .map(|s| s.documents.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn search_count(&self) -> usize {
        self.search_count.load(Ordering::SeqCst)
    }

    /// Every search issued so far, in order.
    pub fn searches(&self) -> Vec<(String, SearchRequest)> {
        self.searches
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    fn check(&self, operation: Operation, store: &str) -> Result<()> {
        let message = self
            .failures
            .get(&(operation, store.to_string()))
            .or_else(|| self.failures.get(&(operation, "*".to_string())))
            .map(|m| m.clone());
        match message {
            Some(message) => Err(IndexError::BackendStatus {
                status: 500,
                message,
            }),
            None => Ok(()),
        }
    }

    fn not_found(store: &str) -> IndexError {
        IndexError::BackendStatus {
            status: 404,
            message: format!("no such index [{}]", store),
        }
    }

    fn execute(&self, store: &MemoryStore, request: &SearchRequest) -> SearchResponse {
        let query = request.query.clone().unwrap_or(Value::Null);
        let sorting_by_field = !request.sort.is_empty() && !eval::sorts_by_score(&request.sort);
        let report_scores = !sorting_by_field || request.track_scores;

        let mut matched: Vec<(&String, &Document, f64)> = store
            .documents
            .iter()
            .filter_map(|(id, doc)| {
                let score = if query.is_null() {
                    Some(1.0)
                } else {
                    eval::evaluate(&query, doc)
                };
                score.map(|s| (id, doc, s))
            })
            .filter(|(_, _, score)| request.min_score.map_or(true, |min| *score >= min))
            .collect();

        if request.sort.is_empty() {
            matched.sort_by(|a, b| b.2.total_cmp(&a.2));
        } else {
            matched.sort_by(|a, b| eval::compare_by_sort(&request.sort, (a.1, a.2), (b.1, b.2)));
        }

        // like the real backend, totals count matches before collapsing
        let total = matched.len() as u64;

        if let Some(field) = request
            .collapse
            .as_ref()
            .and_then(|c| c.get("field"))
            .and_then(Value::as_str)
        {
            let mut seen = HashSet::new();
            matched.retain(|(_, doc, _)| {
                let key = doc.get(field).map(|v| v.to_string()).unwrap_or_default();
                seen.insert(key)
            });
        }

        let max_score = if report_scores {
            matched.iter().map(|m| m.2).reduce(f64::max)
        } else {
            None
        };

        let docs: Vec<&Document> = matched.iter().map(|m| m.1).collect();
        let aggregations = request
            .aggs
            .as_ref()
            .map(|aggs| eval::aggregate(aggs, &docs))
            .unwrap_or_default();

        let suggest = request
            .suggest
            .as_ref()
            .map(|s| suggest::suggest(s, &store.documents))
            .unwrap_or_default();

        let from = request.from.unwrap_or(0);
        let size = request.size.unwrap_or(DEFAULT_SIZE);
        let hits = matched
            .iter()
            .skip(from)
            .take(size)
            .map(|(id, doc, score)| Hit {
                index: String::new(),
                id: (*id).clone(),
                score: report_scores.then_some(*score),
                source: filter_source(doc, request.source.as_ref()),
            })
            .collect();

        SearchResponse {
            hits: Hits {
                total: Some(TotalHits {
                    value: total,
                    relation: Some("eq".to_string()),
                }),
                max_score,
                hits,
            },
            aggregations,
            suggest,
        }
    }
}

fn filter_source(doc: &Document, filter: Option<&SourceFilter>) -> Option<Document> {
    match filter {
        Some(SourceFilter::Enabled(false)) => None,
        Some(SourceFilter::Fields(fields)) => Some(
            doc.iter()
                .filter(|(k, _)| fields.iter().any(|f| f == *k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        _ => Some(doc.clone()),
    }
}

#[async_trait]
impl SearchBackend for MemoryBackend {
    async fn store_exists(&self, store: &str) -> Result<bool> {
        self.check(Operation::Exists, store)?;
        Ok(self.stores.contains_key(store))
    }

    async fn create_store(&self, store: &str, settings: &StoreSettings) -> Result<bool> {
        self.check(Operation::Create, store)?;
        if self.refuse_acknowledgement.load(Ordering::SeqCst) {
            return Ok(false);
        }
        if self.stores.contains_key(store) {
            return Err(IndexError::BackendStatus {
                status: 400,
                message: format!("resource_already_exists_exception [{}]", store),
            });
        }
        self.stores.insert(
            store.to_string(),
            MemoryStore {
                settings: Some(*settings),
                ..Default::default()
            },
        );
        Ok(true)
    }

    async fn delete_store(&self, store: &str) -> Result<()> {
        self.check(Operation::DeleteStore, store)?;
        self.stores
            .remove(store)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(store))
    }

    async fn put_mapping(&self, store: &str, mapping: &FieldMapping) -> Result<()> {
        self.check(Operation::PutMapping, store)?;
        let mut entry = self
            .stores
            .get_mut(store)
            .ok_or_else(|| Self::not_found(store))?;
        for (name, property) in mapping {
            entry.mapping.insert(name.clone(), property.clone());
        }
        Ok(())
    }

    async fn index_document(&self, store: &str, id: &str, document: &Document) -> Result<()> {
        self.check(Operation::Index, store)?;
        self.stores
            .entry(store.to_string())
            .or_default()
            .documents
            .insert(id.to_string(), document.clone());
        Ok(())
    }

    async fn delete_document(&self, store: &str, id: &str) -> Result<()> {
        self.check(Operation::DeleteDocument, store)?;
        if let Some(mut entry) = self.stores.get_mut(store) {
            entry.documents.shift_remove(id);
        }
        Ok(())
    }

    async fn refresh_store(&self, store: &str) -> Result<()> {
        self.check(Operation::Refresh, store)
    }

    async fn delete_by_query(&self, store: &str, query: &Value) -> Result<u64> {
        self.check(Operation::DeleteByQuery, store)?;
        let Some(mut entry) = self.stores.get_mut(store) else {
            return Ok(0);
        };
        let before = entry.documents.len();
        entry
            .documents
            .retain(|_, doc| eval::evaluate(query, doc).is_none());
        Ok((before - entry.documents.len()) as u64)
    }

    async fn reindex(&self, source: &str, dest: &str) -> Result<()> {
        self.check(Operation::Reindex, source)?;
        let documents = self
            .stores
            .get(source)
            .map(|s| s.documents.clone())
            .ok_or_else(|| Self::not_found(source))?;
        self.stores
            .entry(dest.to_string())
            .or_default()
            .documents
            .extend(documents);
        Ok(())
    }

    async fn search(&self, store: &str, request: &SearchRequest) -> Result<SearchResponse> {
        self.check(Operation::Search, store)?;
        self.search_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut searches) = self.searches.lock() {
            searches.push((store.to_string(), request.clone()));
        }
        let entry = self.stores.get(store).ok_or_else(|| Self::not_found(store))?;
        Ok(self.execute(&entry, request))
    }
}
