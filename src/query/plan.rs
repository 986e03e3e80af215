use crate::error::Result;
use crate::types::FieldValue;
use serde::{Deserialize, Serialize};

/// Listing mode: one row per entity, or one row per parent object with
/// variants collapsed onto it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantMode {
    #[default]
    Flat,
    Parents,
}

impl VariantMode {
    /// Column identifying a listing row.
    pub fn id_column(self) -> &'static str {
        match self {
            VariantMode::Flat => "o_id",
            VariantMode::Parents => "o_virtualObjectId",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// A filter condition on listing rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Compare {
        field: String,
        op: CompareOp,
        value: FieldValue,
    },
    In {
        field: String,
        values: Vec<FieldValue>,
        negated: bool,
    },
    /// SQL `LIKE` with `%` and `_` wildcards.
    Like {
        field: String,
        pattern: String,
        negated: bool,
    },
    IsNull {
        field: String,
        negated: bool,
    },
    /// Approximate full-text match over `fields`; the only scored condition.
    Match {
        fields: Vec<String>,
        text: String,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn eq(field: &str, value: impl Into<FieldValue>) -> Self {
        Condition::Compare {
            field: field.to_string(),
            op: CompareOp::Eq,
            value: value.into(),
        }
    }

    pub fn compare(field: &str, op: CompareOp, value: impl Into<FieldValue>) -> Self {
        Condition::Compare {
            field: field.to_string(),
            op,
            value: value.into(),
        }
    }

    pub fn is_in(field: &str, values: Vec<FieldValue>) -> Self {
        Condition::In {
            field: field.to_string(),
            values,
            negated: false,
        }
    }

    pub fn like(field: &str, pattern: &str) -> Self {
        Condition::Like {
            field: field.to_string(),
            pattern: pattern.to_string(),
            negated: false,
        }
    }

    pub fn matches(fields: &[&str], text: &str) -> Self {
        Condition::Match {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            text: text.to_string(),
        }
    }

    /// Parse the textual form, e.g. `price > 10 AND name LIKE '%shoe%'`.
    pub fn parse(input: &str) -> Result<Self> {
        super::filter_parser::parse_condition(input)
    }

    /// Whether the condition contributes to relevance scores.
    pub fn is_scored(&self) -> bool {
        match self {
            Condition::Match { .. } => true,
            Condition::And(items) | Condition::Or(items) => items.iter().any(Condition::is_scored),
            _ => false,
        }
    }
}

/// A relational listing query.
///
/// `conditions` are combined with AND. The store queried is chosen by the
/// listing: the per-language view when `locale` is set, the primary store
/// otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub variant_mode: VariantMode,
    #[serde(default)]
    pub sort_by_score: bool,
    #[serde(default)]
    pub order_key: Option<String>,
    #[serde(default)]
    pub order: SortDirection,
    #[serde(default)]
    pub locale: Option<String>,
}

impl QueryPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Add a condition in textual form.
    pub fn where_clause(self, expression: &str) -> Result<Self> {
        Ok(self.condition(Condition::parse(expression)?))
    }

    pub fn group_by(mut self, field: &str) -> Self {
        self.group_by.push(field.to_string());
        self
    }

    pub fn order_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.order_by.push(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn variant_mode(mut self, mode: VariantMode) -> Self {
        self.variant_mode = mode;
        self
    }

    pub fn sort_by_score(mut self, enabled: bool) -> Self {
        self.sort_by_score = enabled;
        self
    }

    pub fn order_key(mut self, key: &str, order: SortDirection) -> Self {
        self.order_key = Some(key.to_string());
        self.order = order;
        self
    }

    pub fn locale(mut self, locale: &str) -> Self {
        self.locale = Some(locale.to_string());
        self
    }
}
