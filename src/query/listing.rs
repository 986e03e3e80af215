use super::plan::{QueryPlan, VariantMode};
use super::relevance;
use super::suggest::{build_suggest_request, resolve_suggestions, Suggestion};
use super::translate::{translate, TranslatedQuery};
use crate::backend::{SearchBackend, SearchRequest, SearchResponse, SourceFilter};
use crate::error::Result;
use crate::index::StoreNames;
use crate::model::IndexDefinition;
use crate::types::EntityId;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Page size when the plan sets no limit.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Widest window fetched in one request.
pub const MAX_RESULT_WINDOW: usize = 10_000;

/// Highest `precision_threshold` the backend accepts; distinct counts below
/// it are exact.
const CARDINALITY_PRECISION: u64 = 40_000;

const VALUES_AGGREGATION: &str = "values";
const DISTINCT_AGGREGATION: &str = "distinct_parents";

/// One distinct value of a grouped column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupValue {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

/// Read access to an index through a [`QueryPlan`].
pub struct Listing {
    backend: Arc<dyn SearchBackend>,
    index: IndexDefinition,
    names: StoreNames,
    plan: QueryPlan,
    last_record_count: u64,
}

impl Listing {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        index: IndexDefinition,
        names: StoreNames,
        plan: QueryPlan,
    ) -> Self {
        Listing {
            backend,
            index,
            names,
            plan,
            last_record_count: 0,
        }
    }

    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    pub fn plan_mut(&mut self) -> &mut QueryPlan {
        &mut self.plan
    }

    /// Total hits of the last [`Listing::load`].
    pub fn last_record_count(&self) -> u64 {
        self.last_record_count
    }

    /// The per-language view for the plan's locale, else the primary store.
    pub fn query_store(&self) -> String {
        match &self.plan.locale {
            Some(locale) => self.names.localized_view(&self.index.name, locale),
            None => self.names.primary(&self.index.name),
        }
    }

    pub fn relation_store(&self) -> String {
        self.names.relations(&self.index.name)
    }

    fn parents(&self) -> bool {
        self.plan.variant_mode == VariantMode::Parents
    }

    /// The translated plan, or `None` when it cannot be expressed.
    fn translated(&self) -> Option<TranslatedQuery> {
        match translate(&self.plan) {
            Ok(translated) => Some(translated),
            Err(e) => {
                tracing::warn!(index = %self.index.name, "Returning no results: {}", e);
                None
            }
        }
    }

    async fn run(&self, store: &str, request: SearchRequest) -> Result<SearchResponse> {
        if self.plan.sort_by_score {
            relevance::search_with_threshold(self.backend.as_ref(), store, request).await
        } else {
            self.backend.search(store, &request).await
        }
    }

    /// Ids of the current page. Parent mode yields parent ids.
    pub async fn load(&mut self) -> Result<Vec<EntityId>> {
        let response = self.load_set(false, false).await?;
        self.last_record_count = response.total();

        let id_column = self.plan.variant_mode.id_column();
        Ok(response
            .hits
            .hits
            .iter()
            .filter_map(|hit| {
                hit.source
                    .as_ref()
                    .and_then(|source| source.get(id_column))
                    .and_then(Value::as_i64)
                    .or_else(|| hit.id.parse().ok())
            })
            .collect())
    }

    /// The raw response for the current page. With `with_source && all` the
    /// page widens to [`MAX_RESULT_WINDOW`] documents.
    pub async fn load_set(&self, with_source: bool, all: bool) -> Result<SearchResponse> {
        let Some(translated) = self.translated() else {
            return Ok(SearchResponse::default());
        };

        let size = if with_source && all {
            MAX_RESULT_WINDOW
        } else {
            self.plan.limit.unwrap_or(DEFAULT_PAGE_SIZE)
        };
        let source = if with_source {
            SourceFilter::Enabled(true)
        } else {
            SourceFilter::Fields(vec![self.plan.variant_mode.id_column().to_string()])
        };

        let request = SearchRequest {
            query: Some(translated.query),
            from: Some(self.plan.offset.unwrap_or(0)),
            size: Some(size),
            sort: translated.sort,
            source: Some(source),
            track_total_hits: Some(true),
            collapse: translated.collapse,
            ..Default::default()
        };
        self.run(&self.query_store(), request).await
    }

    /// Matching entities, or distinct parents in parent mode. Always exact.
    pub async fn count(&self) -> Result<u64> {
        let Some(translated) = self.translated() else {
            return Ok(0);
        };

        let mut request = SearchRequest {
            query: Some(translated.query),
            size: Some(0),
            track_total_hits: Some(true),
            ..Default::default()
        };
        if self.parents() {
            request.aggs = Some(single_aggregation(
                DISTINCT_AGGREGATION,
                json!({ "cardinality": {
                    "field": VariantMode::Parents.id_column(),
                    "precision_threshold": CARDINALITY_PRECISION
                } }),
            ));
        }

        let response = self.backend.search(&self.query_store(), &request).await?;
        if self.parents() {
            Ok(response.aggregation_value(DISTINCT_AGGREGATION).unwrap_or(0))
        } else {
            Ok(response.total())
        }
    }

    fn values_aggregation(&self, field: &str, distinct_field: &str, count_values: bool) -> Map<String, Value> {
        let mut terms = json!({
            "terms": {
                "field": field,
                "size": MAX_RESULT_WINDOW,
                "order": { "_key": "asc" }
            }
        });
        if count_values && self.parents() {
            terms["aggs"] = json!({
                DISTINCT_AGGREGATION: { "cardinality": {
                    "field": distinct_field,
                    "precision_threshold": CARDINALITY_PRECISION
                } }
            });
        }
        single_aggregation(VALUES_AGGREGATION, terms)
    }

    fn bucket_count(&self, bucket: &Map<String, Value>) -> u64 {
        if self.parents() {
            bucket
                .get(DISTINCT_AGGREGATION)
                .and_then(|agg| agg.get("value"))
                .and_then(Value::as_u64)
                .unwrap_or(0)
        } else {
            bucket.get("doc_count").and_then(Value::as_u64).unwrap_or(0)
        }
    }

    /// Distinct values of `field` among matching documents, ordered by
    /// value. In relevance mode only values carried by documents above the
    /// score cutoff are kept.
    pub async fn group_by_values(&self, field: &str, count_values: bool) -> Result<Vec<GroupValue>> {
        let Some(translated) = self.translated() else {
            return Ok(Vec::new());
        };
        let store = self.query_store();

        let request = SearchRequest {
            query: Some(translated.query.clone()),
            size: Some(0),
            aggs: Some(self.values_aggregation(
                field,
                VariantMode::Parents.id_column(),
                count_values,
            )),
            ..Default::default()
        };
        let mut buckets = self.backend.search(&store, &request).await?.buckets(VALUES_AGGREGATION);

        if self.plan.sort_by_score {
            let request = SearchRequest {
                query: Some(translated.query),
                from: Some(0),
                size: Some(MAX_RESULT_WINDOW),
                source: Some(SourceFilter::Fields(vec![field.to_string()])),
                ..Default::default()
            };
            let kept = relevance::search_with_threshold(self.backend.as_ref(), &store, request)
                .await?
                .source_values(field);
            buckets.retain(|bucket| bucket.get("key").is_some_and(|key| kept.contains(key)));
        }

        Ok(buckets
            .iter()
            .map(|bucket| {
                let key = bucket.get("key").cloned().unwrap_or(Value::Null);
                if count_values {
                    GroupValue {
                        value: key,
                        count: Some(self.bucket_count(bucket)),
                    }
                } else {
                    GroupValue {
                        value: strip_delimiters(key),
                        count: None,
                    }
                }
            })
            .collect())
    }

    pub async fn group_by_relation_values(&self, field: &str, count_values: bool) -> Result<Vec<GroupValue>> {
        self.group_by_relation_values_and_type(field, None, count_values)
            .await
    }

    /// Destination ids of `field` relations (optionally of `relation_type`)
    /// whose source matches the listing's conditions.
    pub async fn group_by_relation_values_and_type(
        &self,
        field: &str,
        relation_type: Option<&str>,
        count_values: bool,
    ) -> Result<Vec<GroupValue>> {
        let Some(translated) = self.translated() else {
            return Ok(Vec::new());
        };

        let src_ids = self.matching_source_ids(&translated).await?;
        if src_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut filter = vec![json!({ "term": { "fieldname": field } })];
        if let Some(relation_type) = relation_type {
            filter.push(json!({ "term": { "type": relation_type } }));
        }
        filter.push(json!({ "terms": { "src": src_ids } }));

        let request = SearchRequest {
            query: Some(json!({ "bool": { "filter": filter } })),
            size: Some(0),
            aggs: Some(self.values_aggregation("dest", "src_virtualObjectId", count_values)),
            ..Default::default()
        };
        let buckets = self
            .backend
            .search(&self.relation_store(), &request)
            .await?
            .buckets(VALUES_AGGREGATION);

        Ok(buckets
            .iter()
            .filter_map(|bucket| {
                let key = bucket.get("key").cloned().unwrap_or(Value::Null);
                if count_values {
                    Some(GroupValue {
                        value: key,
                        count: Some(self.bucket_count(bucket)),
                    })
                } else {
                    is_truthy(&key).then_some(GroupValue {
                        value: key,
                        count: None,
                    })
                }
            })
            .collect())
    }

    /// `o_id` of every document matching the plan, through the relevance
    /// protocol when enabled.
    async fn matching_source_ids(&self, translated: &TranslatedQuery) -> Result<Vec<Value>> {
        let request = SearchRequest {
            query: Some(translated.query.clone()),
            from: Some(0),
            size: Some(MAX_RESULT_WINDOW),
            source: Some(SourceFilter::Fields(vec!["o_id".to_string()])),
            ..Default::default()
        };
        Ok(self.run(&self.query_store(), request).await?.source_values("o_id"))
    }

    /// Ranked corrections of `term` over `fields`.
    pub async fn suggest(&self, term: &str, fields: &[String], max_suggestions: usize) -> Result<Vec<Suggestion>> {
        let request = SearchRequest {
            size: Some(0),
            source: Some(SourceFilter::Enabled(false)),
            suggest: Some(build_suggest_request(term, fields, max_suggestions)),
            ..Default::default()
        };
        let response = self.backend.search(&self.query_store(), &request).await?;
        Ok(resolve_suggestions(term, &response.suggest, max_suggestions))
    }
}

fn single_aggregation(name: &str, body: Value) -> Map<String, Value> {
    let mut aggs = Map::new();
    aggs.insert(name.to_string(), body);
    aggs
}

/// Array values are stored as `",a,b,"`; grouped values drop the commas.
fn strip_delimiters(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.replace(',', "")),
        other => other,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        _ => true,
    }
}
