use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity identifier as supplied by the object layer.
pub type EntityId = i64;

/// A stored document body: field name to JSON value, insertion ordered.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// A dynamically-typed field value extracted from an entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Array(Vec<FieldValue>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// The value as it is written to a store.
    ///
    /// Arrays are flattened to the delimited form `",a,b,"` so that a keyword
    /// field can be filtered with `LIKE '%,a,%'`.
    pub fn to_document_value(&self) -> serde_json::Value {
        match self {
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::Boolean(b) => serde_json::Value::Bool(*b),
            FieldValue::Integer(i) => serde_json::json!(i),
            FieldValue::Float(f) => serde_json::json!(f),
            FieldValue::Text(s) => serde_json::Value::String(s.clone()),
            FieldValue::Array(items) => serde_json::Value::String(join_array_values(items)),
        }
    }

    /// The value as a JSON term for query clauses. Arrays stay arrays.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Array(items) => {
                serde_json::Value::Array(items.iter().map(FieldValue::to_json).collect())
            }
            other => other.to_document_value(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Array(items) => f.write_str(&join_array_values(items)),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

pub fn json_value_to_field_value(val: &serde_json::Value) -> FieldValue {
    match val {
        serde_json::Value::Null => FieldValue::Null,
        serde_json::Value::Bool(b) => FieldValue::Boolean(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => FieldValue::Integer(i),
            None => FieldValue::Float(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => FieldValue::Text(s.clone()),
        serde_json::Value::Array(arr) => {
            FieldValue::Array(arr.iter().map(json_value_to_field_value).collect())
        }
        serde_json::Value::Object(_) => FieldValue::Text(val.to_string()),
    }
}

fn join_array_values(items: &[FieldValue]) -> String {
    let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
    format!(",{},", parts.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_is_written_delimited() {
        let v = FieldValue::Array(vec![FieldValue::Integer(3), FieldValue::Integer(7)]);
        assert_eq!(v.to_document_value(), serde_json::json!(",3,7,"));
        assert_eq!(v.to_json(), serde_json::json!([3, 7]));
    }

    #[test]
    fn test_untagged_deserialization() {
        let v: Vec<FieldValue> = serde_json::from_str(r#"[null, true, 4, 2.5, "x", [1]]"#).unwrap();
        assert_eq!(
            v,
            vec![
                FieldValue::Null,
                FieldValue::Boolean(true),
                FieldValue::Integer(4),
                FieldValue::Float(2.5),
                FieldValue::Text("x".into()),
                FieldValue::Array(vec![FieldValue::Integer(1)]),
            ]
        );
    }
}
