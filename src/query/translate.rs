//! Query plan to native search request translation.

use super::plan::{CompareOp, Condition, QueryPlan, VariantMode};
use crate::error::{IndexError, Result};
use crate::types::FieldValue;
use serde_json::{json, Value};

/// The native pieces of a translated plan.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedQuery {
    pub query: Value,
    pub sort: Vec<Value>,
    /// Set in parent mode, folding variants onto their parent.
    pub collapse: Option<Value>,
}

pub fn translate(plan: &QueryPlan) -> Result<TranslatedQuery> {
    Ok(TranslatedQuery {
        query: conditions_to_query(&plan.conditions)?,
        sort: sort_clauses(plan),
        collapse: match plan.variant_mode {
            VariantMode::Flat => None,
            VariantMode::Parents => Some(json!({ "field": VariantMode::Parents.id_column() })),
        },
    })
}

/// Grouping columns of `plan`: the listing id column, any explicit group-by
/// columns, then every order-by column.
///
/// Native requests do not group; row identity comes from `collapse` on the
/// id column. The list describes the rows a listing is keyed by.
pub fn group_by_columns(plan: &QueryPlan) -> Vec<String> {
    let mut columns = vec![plan.variant_mode.id_column().to_string()];
    for column in plan
        .group_by
        .iter()
        .chain(plan.order_by.iter().map(|o| &o.field))
    {
        if !columns.contains(column) {
            columns.push(column.clone());
        }
    }
    columns
}

/// Order-by columns, then the order key, then `_score` in relevance mode.
pub fn sort_clauses(plan: &QueryPlan) -> Vec<Value> {
    let mut sort: Vec<Value> = plan
        .order_by
        .iter()
        .map(|o| json!({ o.field.clone(): { "order": o.direction.as_str() } }))
        .collect();
    if let Some(key) = &plan.order_key {
        sort.push(json!({ key.clone(): { "order": plan.order.as_str() } }));
    }
    if plan.sort_by_score {
        sort.push(json!({ "_score": { "order": "desc" } }));
    }
    sort
}

/// AND of `conditions`; `match_all` when empty.
pub fn conditions_to_query(conditions: &[Condition]) -> Result<Value> {
    match conditions {
        [] => Ok(json!({ "match_all": {} })),
        [single] => condition_to_query(single),
        many => and_query(many),
    }
}

pub fn condition_to_query(condition: &Condition) -> Result<Value> {
    match condition {
        Condition::Compare { field, op, value } => {
            let value = scalar(field, value)?;
            Ok(match op {
                CompareOp::Eq => json!({ "term": { field.clone(): value } }),
                CompareOp::NotEq => {
                    json!({ "bool": { "must_not": [{ "term": { field.clone(): value } }] } })
                }
                CompareOp::Gt => json!({ "range": { field.clone(): { "gt": value } } }),
                CompareOp::Gte => json!({ "range": { field.clone(): { "gte": value } } }),
                CompareOp::Lt => json!({ "range": { field.clone(): { "lt": value } } }),
                CompareOp::Lte => json!({ "range": { field.clone(): { "lte": value } } }),
            })
        }
        Condition::In {
            field,
            values,
            negated,
        } => {
            if values.is_empty() {
                return Err(IndexError::QueryTranslationFailed(format!(
                    "empty IN list on {}",
                    field
                )));
            }
            let values = values
                .iter()
                .map(|v| scalar(field, v))
                .collect::<Result<Vec<_>>>()?;
            Ok(negate(json!({ "terms": { field.clone(): values } }), *negated))
        }
        Condition::Like {
            field,
            pattern,
            negated,
        } => {
            let wildcard = like_to_wildcard(pattern);
            Ok(negate(
                json!({ "wildcard": { field.clone(): { "value": wildcard } } }),
                *negated,
            ))
        }
        Condition::IsNull { field, negated } => {
            let exists = json!({ "exists": { "field": field } });
            Ok(negate(exists, !*negated))
        }
        Condition::Match { fields, text } => {
            if fields.is_empty() {
                return Err(IndexError::QueryTranslationFailed(
                    "MATCH without fields".to_string(),
                ));
            }
            Ok(json!({
                "multi_match": {
                    "query": text,
                    "fields": fields,
                    "fuzziness": "AUTO",
                }
            }))
        }
        Condition::And(items) => and_query(items),
        Condition::Or(items) => {
            let should = items
                .iter()
                .map(condition_to_query)
                .collect::<Result<Vec<_>>>()?;
            Ok(json!({ "bool": { "should": should, "minimum_should_match": 1 } }))
        }
        Condition::Not(inner) => {
            Ok(json!({ "bool": { "must_not": [condition_to_query(inner)?] } }))
        }
    }
}

/// Scored conditions go to `must`, the rest to `filter`, so plain filters
/// leave relevance scores untouched.
fn and_query(items: &[Condition]) -> Result<Value> {
    let mut must = Vec::new();
    let mut filter = Vec::new();
    for item in items {
        let query = condition_to_query(item)?;
        if item.is_scored() {
            must.push(query);
        } else {
            filter.push(query);
        }
    }

    let mut body = serde_json::Map::new();
    if !must.is_empty() {
        body.insert("must".into(), Value::Array(must));
    }
    if !filter.is_empty() {
        body.insert("filter".into(), Value::Array(filter));
    }
    Ok(json!({ "bool": body }))
}

fn negate(query: Value, negated: bool) -> Value {
    if negated {
        json!({ "bool": { "must_not": [query] } })
    } else {
        query
    }
}

fn scalar(field: &str, value: &FieldValue) -> Result<Value> {
    match value {
        FieldValue::Null => Err(IndexError::QueryTranslationFailed(format!(
            "comparison of {} with NULL",
            field
        ))),
        FieldValue::Array(_) => Err(IndexError::QueryTranslationFailed(format!(
            "comparison of {} with a list",
            field
        ))),
        other => Ok(other.to_json()),
    }
}

/// SQL `LIKE` pattern to a wildcard pattern: `%` becomes `*`, `_` becomes `?`.
pub fn like_to_wildcard(pattern: &str) -> String {
    pattern
        .chars()
        .map(|c| match c {
            '%' => '*',
            '_' => '?',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::plan::SortDirection;

    #[test]
    fn test_grouped_order_by_extends_group_by() {
        let plan = QueryPlan::new()
            .variant_mode(VariantMode::Parents)
            .order_by("name", SortDirection::Asc);
        let translated = translate(&plan).unwrap();
        assert_eq!(group_by_columns(&plan), vec!["o_virtualObjectId", "name"]);
        assert_eq!(
            translated.collapse,
            Some(json!({"field": "o_virtualObjectId"}))
        );
        assert_eq!(translated.sort, vec![json!({"name": {"order": "asc"}})]);
    }

    #[test]
    fn test_flat_group_by_and_relevance_sort() {
        let plan = QueryPlan::new()
            .order_by("price", SortDirection::Desc)
            .order_key("o_id", SortDirection::Asc)
            .sort_by_score(true);
        let translated = translate(&plan).unwrap();
        assert_eq!(group_by_columns(&plan), vec!["o_id", "price"]);
        assert!(translated.collapse.is_none());
        assert_eq!(
            translated.sort,
            vec![
                json!({"price": {"order": "desc"}}),
                json!({"o_id": {"order": "asc"}}),
                json!({"_score": {"order": "desc"}}),
            ]
        );
    }

    #[test]
    fn test_scored_conditions_go_to_must() {
        let query = conditions_to_query(&[
            Condition::compare("price", CompareOp::Gte, 10i64),
            Condition::matches(&["name"], "shoe"),
        ])
        .unwrap();
        assert_eq!(
            query,
            json!({"bool": {
                "must": [{"multi_match": {"query": "shoe", "fields": ["name"], "fuzziness": "AUTO"}}],
                "filter": [{"range": {"price": {"gte": 10}}}]
            }})
        );
    }

    #[test]
    fn test_like_and_null() {
        assert_eq!(
            condition_to_query(&Condition::like("categoryIds", "%,5,%")).unwrap(),
            json!({"wildcard": {"categoryIds": {"value": "*,5,*"}}})
        );
        assert_eq!(
            condition_to_query(&Condition::IsNull {
                field: "parent".into(),
                negated: false
            })
            .unwrap(),
            json!({"bool": {"must_not": [{"exists": {"field": "parent"}}]}})
        );
    }

    #[test]
    fn test_untranslatable_conditions() {
        assert!(matches!(
            condition_to_query(&Condition::eq("price", FieldValue::Null)),
            Err(IndexError::QueryTranslationFailed(_))
        ));
        assert!(condition_to_query(&Condition::is_in("color", vec![])).is_err());
    }
}
