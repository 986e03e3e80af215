use crate::types::Document;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Backend field type of a mapped property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Integer,
    Boolean,
    Date,
    Double,
    Keyword,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl Property {
    pub fn new(field_type: FieldType) -> Self {
        Property {
            field_type,
            options: Map::new(),
        }
    }
}

/// Field name to property, in declaration order.
pub type FieldMapping = IndexMap<String, Property>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceFilter {
    Enabled(bool),
    Fields(Vec<String>),
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Native search request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<Value>,
    #[serde(rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,
    #[serde(skip_serializing_if = "is_false")]
    pub track_scores: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_total_hits: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapse: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggs: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggest: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalHits {
    pub value: u64,
    #[serde(default)]
    pub relation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: Option<Document>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hits {
    #[serde(default)]
    pub total: Option<TotalHits>,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestOption {
    pub text: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestEntry {
    pub text: String,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub length: usize,
    #[serde(default)]
    pub options: Vec<SuggestOption>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Hits,
    #[serde(default)]
    pub aggregations: Map<String, Value>,
    #[serde(default)]
    pub suggest: IndexMap<String, Vec<SuggestEntry>>,
}

impl SearchResponse {
    pub fn total(&self) -> u64 {
        self.hits.total.as_ref().map(|t| t.value).unwrap_or(0)
    }

    pub fn max_score(&self) -> f64 {
        self.hits.max_score.unwrap_or(0.0)
    }

    /// Raw `_source[field]` of every hit that carries it.
    pub fn source_values(&self, field: &str) -> Vec<Value> {
        self.hits
            .hits
            .iter()
            .filter_map(|hit| hit.source.as_ref()?.get(field).cloned())
            .filter(|v| !v.is_null())
            .collect()
    }

    /// Buckets of a `terms` aggregation by name.
    pub fn buckets(&self, aggregation: &str) -> Vec<Map<String, Value>> {
        self.aggregations
            .get(aggregation)
            .and_then(|agg| agg.get("buckets"))
            .and_then(Value::as_array)
            .map(|buckets| {
                buckets
                    .iter()
                    .filter_map(|b| b.as_object().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `value` of a single-value aggregation such as `cardinality`.
    pub fn aggregation_value(&self, aggregation: &str) -> Option<u64> {
        self.aggregations
            .get(aggregation)
            .and_then(|agg| agg.get("value"))
            .and_then(Value::as_u64)
    }
}
