use crate::types::Document;
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

/// Score of `doc` under `query`, or `None` when it does not match.
pub(super) fn evaluate(query: &Value, doc: &Document) -> Option<f64> {
    let Some((kind, body)) = query.as_object().and_then(|o| o.iter().next()) else {
        return Some(1.0);
    };

    match kind.as_str() {
        "match_all" => Some(1.0),
        "match_none" => None,
        "bool" => evaluate_bool(body, doc),
        "term" => {
            let (field, expected) = field_and_value(body)?;
            values_of(doc, field)
                .iter()
                .any(|v| loosely_equal(v, expected))
                .then_some(1.0)
        }
        "terms" => {
            let (field, expected) = body.as_object()?.iter().next()?;
            let expected = expected.as_array()?;
            values_of(doc, field)
                .iter()
                .any(|v| expected.iter().any(|e| loosely_equal(v, e)))
                .then_some(1.0)
        }
        "range" => {
            let (field, bounds) = body.as_object()?.iter().next()?;
            let bounds = bounds.as_object()?;
            let value = doc.get(field).filter(|v| !v.is_null())?;
            bounds
                .iter()
                .all(|(op, bound)| {
                    let ord = compare_values(value, bound);
                    match op.as_str() {
                        "gt" => ord == Ordering::Greater,
                        "gte" => ord != Ordering::Less,
                        "lt" => ord == Ordering::Less,
                        "lte" => ord != Ordering::Greater,
                        _ => true,
                    }
                })
                .then_some(1.0)
        }
        "exists" => {
            let field = body.get("field")?.as_str()?;
            doc.get(field)
                .filter(|v| !v.is_null())
                .map(|_| 1.0)
        }
        "wildcard" => {
            let (field, pattern) = field_and_value(body)?;
            let pattern = pattern.as_str()?;
            values_of(doc, field)
                .iter()
                .any(|v| wildcard_match(pattern, &value_text(v)))
                .then_some(1.0)
        }
        "match" => {
            let (field, clause) = body.as_object()?.iter().next()?;
            let (text, operator) = match clause {
                Value::Object(o) => (
                    o.get("query").map(value_text).unwrap_or_default(),
                    o.get("operator").and_then(Value::as_str).unwrap_or("or"),
                ),
                other => (value_text(other), "or"),
            };
            score_text(&text, &[field.as_str()], operator, doc)
        }
        "multi_match" => {
            let text = body.get("query").map(value_text).unwrap_or_default();
            let fields: Vec<&str> = body
                .get("fields")
                .and_then(Value::as_array)
                .map(|f| f.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            let operator = body
                .get("operator")
                .and_then(Value::as_str)
                .unwrap_or("or");
            score_text(&text, &fields, operator, doc)
        }
        other => {
            tracing::debug!("Unsupported query clause {} in memory backend", other);
            None
        }
    }
}

fn evaluate_bool(body: &Value, doc: &Document) -> Option<f64> {
    let clauses = |name: &str| -> Vec<Value> {
        match body.get(name) {
            Some(Value::Array(items)) => items.clone(),
            Some(single) => vec![single.clone()],
            None => Vec::new(),
        }
    };
    let must = clauses("must");
    let filter = clauses("filter");
    let should = clauses("should");
    let must_not = clauses("must_not");

    let mut score = 0.0;
    for clause in &must {
        score += evaluate(clause, doc)?;
    }
    for clause in &filter {
        evaluate(clause, doc)?;
    }
    if must_not.iter().any(|c| evaluate(c, doc).is_some()) {
        return None;
    }

    let mut should_matches = 0;
    for clause in &should {
        if let Some(s) = evaluate(clause, doc) {
            should_matches += 1;
            score += s;
        }
    }
    let minimum_should_match = body
        .get("minimum_should_match")
        .and_then(Value::as_u64)
        .unwrap_or(if must.is_empty() && filter.is_empty() && !should.is_empty() {
            1
        } else {
            0
        });
    if (should_matches as u64) < minimum_should_match {
        return None;
    }

    if must.is_empty() && filter.is_empty() && should.is_empty() {
        return Some(1.0);
    }
    Some(score)
}

fn field_and_value(body: &Value) -> Option<(&String, &Value)> {
    let (field, clause) = body.as_object()?.iter().next()?;
    let value = match clause {
        Value::Object(o) => o.get("value")?,
        other => other,
    };
    Some((field, value))
}

fn values_of<'a>(doc: &'a Document, field: &str) -> Vec<&'a Value> {
    match doc.get(field) {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(v) => vec![v],
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => value_text(a) == value_text(b),
    }
}

pub(super) fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => match (a.as_bool(), b.as_bool()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => value_text(a).cmp(&value_text(b)),
        },
    }
}

fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

pub(super) fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Edit distance allowed by `fuzziness: AUTO`.
pub(super) fn auto_fuzziness(term: &str) -> usize {
    match term.chars().count() {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

/// Similarity of a query token to an indexed token: 1.0 for an exact match,
/// less for a match within the fuzzy edit distance, 0.0 otherwise.
pub(super) fn token_similarity(query: &str, indexed: &str) -> f64 {
    if query == indexed {
        return 1.0;
    }
    let distance = strsim::levenshtein(query, indexed);
    if distance > auto_fuzziness(query) {
        return 0.0;
    }
    let longest = query.chars().count().max(indexed.chars().count()).max(1);
    1.0 - distance as f64 / longest as f64
}

fn score_text(text: &str, fields: &[&str], operator: &str, doc: &Document) -> Option<f64> {
    let query_tokens = tokenize(text);
    if query_tokens.is_empty() || fields.is_empty() {
        return None;
    }
    let doc_tokens: Vec<String> = fields
        .iter()
        .flat_map(|f| values_of(doc, f))
        .flat_map(|v| tokenize(&value_text(v)))
        .collect();

    let mut score = 0.0;
    for q in &query_tokens {
        let best = doc_tokens
            .iter()
            .map(|d| token_similarity(q, d))
            .fold(0.0, f64::max);
        if best == 0.0 && operator.eq_ignore_ascii_case("and") {
            return None;
        }
        score += best;
    }
    (score > 0.0).then_some(score)
}

pub(super) fn sorts_by_score(sort: &[Value]) -> bool {
    sort.iter().any(|s| match s {
        Value::String(name) => name == "_score",
        Value::Object(o) => o.contains_key("_score"),
        _ => false,
    })
}

fn sort_key(entry: &Value) -> Option<(String, bool)> {
    match entry {
        Value::String(name) => Some((name.clone(), name == "_score")),
        Value::Object(o) => {
            let (field, clause) = o.iter().next()?;
            let order = match clause {
                Value::String(order) => order.as_str(),
                Value::Object(clause) => clause.get("order").and_then(Value::as_str).unwrap_or(""),
                _ => "",
            };
            let descending = match order {
                "desc" => true,
                "asc" => false,
                _ => field == "_score",
            };
            Some((field.clone(), descending))
        }
        _ => None,
    }
}

pub(super) fn compare_by_sort(sort: &[Value], a: (&Document, f64), b: (&Document, f64)) -> Ordering {
    for entry in sort {
        let Some((field, descending)) = sort_key(entry) else {
            continue;
        };
        let ord = if field == "_score" {
            a.1.total_cmp(&b.1)
        } else {
            match (
                a.0.get(&field).filter(|v| !v.is_null()),
                b.0.get(&field).filter(|v| !v.is_null()),
            ) {
                (Some(x), Some(y)) => compare_values(x, y),
                // missing values sort last either way
                (Some(_), None) => return Ordering::Less,
                (None, Some(_)) => return Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        };
        let ord = if descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

pub(super) fn aggregate(aggs: &Map<String, Value>, docs: &[&Document]) -> Map<String, Value> {
    let mut out = Map::new();
    for (name, clause) in aggs {
        if let Some(result) = aggregate_one(clause, docs) {
            out.insert(name.clone(), result);
        }
    }
    out
}

fn aggregate_one(clause: &Value, docs: &[&Document]) -> Option<Value> {
    if let Some(cardinality) = clause.get("cardinality") {
        let field = cardinality.get("field")?.as_str()?;
        let distinct: HashSet<String> = docs
            .iter()
            .flat_map(|d| values_of(d, field))
            .map(|v| v.to_string())
            .collect();
        return Some(json!({ "value": distinct.len() }));
    }

    let terms = clause.get("terms")?;
    let field = terms.get("field")?.as_str()?;
    let size = terms.get("size").and_then(Value::as_u64).unwrap_or(10) as usize;
    let by_key = terms
        .get("order")
        .and_then(|o| o.get("_key"))
        .and_then(Value::as_str);

    let mut groups: BTreeMap<String, (Value, Vec<&Document>)> = BTreeMap::new();
    for doc in docs {
        for value in values_of(doc, field) {
            groups
                .entry(value.to_string())
                .or_insert_with(|| (value.clone(), Vec::new()))
                .1
                .push(doc);
        }
    }

    let mut buckets: Vec<(Value, Vec<&Document>)> = groups.into_values().collect();
    match by_key {
        Some(order) => {
            buckets.sort_by(|a, b| compare_values(&a.0, &b.0));
            if order == "desc" {
                buckets.reverse();
            }
        }
        None => buckets.sort_by(|a, b| {
            b.1.len()
                .cmp(&a.1.len())
                .then_with(|| compare_values(&a.0, &b.0))
        }),
    }

    let sub_aggs = clause.get("aggs").and_then(Value::as_object);
    let buckets: Vec<Value> = buckets
        .into_iter()
        .take(size)
        .map(|(key, members)| {
            let mut bucket = Map::new();
            bucket.insert("key".into(), key);
            bucket.insert("doc_count".into(), json!(members.len()));
            if let Some(sub_aggs) = sub_aggs {
                bucket.extend(aggregate(sub_aggs, &members));
            }
            Value::Object(bucket)
        })
        .collect();

    Some(json!({ "buckets": buckets }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("*,5,*", ",3,5,9,"));
        assert!(!wildcard_match("*,5,*", ",3,55,9,"));
        assert!(wildcard_match("sh?e", "shoe"));
        assert!(wildcard_match("*", ""));
    }

    #[test]
    fn test_bool_must_not_and_should() {
        let d = doc(json!({"color": "red", "size": 4}));
        let q = json!({"bool": {
            "filter": [{"term": {"color": "red"}}],
            "must_not": [{"term": {"size": 5}}]
        }});
        assert_eq!(evaluate(&q, &d), Some(0.0));

        let q = json!({"bool": {"should": [{"term": {"color": "blue"}}, {"term": {"size": 4}}]}});
        assert_eq!(evaluate(&q, &d), Some(1.0));

        let q = json!({"bool": {"should": [{"term": {"color": "blue"}}]}});
        assert_eq!(evaluate(&q, &d), None);
    }

    #[test]
    fn test_fuzzy_text_scoring() {
        let d = doc(json!({"title": "Running Shoes"}));
        let exact = evaluate(&json!({"match": {"title": "shoes"}}), &d).unwrap();
        let typo = evaluate(&json!({"match": {"title": "shoez"}}), &d).unwrap();
        assert_eq!(exact, 1.0);
        assert!(typo > 0.0 && typo < exact);
        assert_eq!(evaluate(&json!({"match": {"title": "boots"}}), &d), None);
    }

    #[test]
    fn test_terms_aggregation_with_cardinality() {
        let docs = [
            doc(json!({"color": "red", "parent": 1})),
            doc(json!({"color": "red", "parent": 1})),
            doc(json!({"color": "blue", "parent": 2})),
        ];
        let refs: Vec<&Document> = docs.iter().collect();
        let aggs = json!({"values": {
            "terms": {"field": "color", "size": 10, "order": {"_key": "asc"}},
            "aggs": {"distinct": {"cardinality": {"field": "parent"}}}
        }});
        let out = aggregate(aggs.as_object().unwrap(), &refs);
        assert_eq!(
            out["values"]["buckets"],
            json!([
                {"key": "blue", "doc_count": 1, "distinct": {"value": 1}},
                {"key": "red", "doc_count": 2, "distinct": {"value": 1}}
            ])
        );
    }
}
