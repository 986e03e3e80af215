use crate::config::BackendConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage type of an index column.
///
/// Parsed from the upper-case names used in index definitions
/// (`"INTEGER"`, `"STRING"`, ...). Names with no backend mapping are kept as
/// [`ColumnType::Unsupported`] so schema synthesis can reject them by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    Integer,
    Boolean,
    Date,
    Double,
    String,
    Text,
    Unsupported(String),
}

impl ColumnType {
    pub fn as_str(&self) -> &str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Date => "DATE",
            ColumnType::Double => "DOUBLE",
            ColumnType::String => "STRING",
            ColumnType::Text => "TEXT",
            ColumnType::Unsupported(name) => name,
        }
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, ColumnType::String | ColumnType::Text)
    }
}

impl From<String> for ColumnType {
    fn from(s: String) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "INTEGER" => ColumnType::Integer,
            "BOOLEAN" => ColumnType::Boolean,
            "DATE" => ColumnType::Date,
            "DOUBLE" => ColumnType::Double,
            "STRING" => ColumnType::String,
            "TEXT" => ColumnType::Text,
            _ => ColumnType::Unsupported(s),
        }
    }
}

impl From<&str> for ColumnType {
    fn from(s: &str) -> Self {
        ColumnType::from(s.to_string())
    }
}

impl From<ColumnType> for String {
    fn from(t: ColumnType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a column's value comes from on the source object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    #[default]
    #[serde(rename = "plain")]
    Plain,
    #[serde(rename = "manyToOneRelation")]
    ManyToOneRelation,
    #[serde(rename = "manyToManyObjectRelation")]
    ManyToManyObjectRelation,
    #[serde(rename = "localizedfields")]
    LocalizedFields,
}

impl SourceType {
    pub fn is_relation(self) -> bool {
        matches!(
            self,
            SourceType::ManyToOneRelation | SourceType::ManyToManyObjectRelation
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexColumn {
    pub name: String,
    pub column_type: ColumnType,
    #[serde(default)]
    pub source_type: SourceType,
    #[serde(default)]
    pub interpreter: Option<String>,
}

impl IndexColumn {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        IndexColumn {
            name: name.into(),
            column_type,
            source_type: SourceType::Plain,
            interpreter: None,
        }
    }

    pub fn with_source(mut self, source_type: SourceType) -> Self {
        self.source_type = source_type;
        self
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = Some(interpreter.into());
        self
    }
}

/// An index as configured by an administrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<IndexColumn>,
    #[serde(default)]
    pub configuration: BackendConfig,
}

impl IndexDefinition {
    pub fn new(name: impl Into<String>, configuration: BackendConfig) -> Self {
        IndexDefinition {
            name: name.into(),
            columns: Vec::new(),
            configuration,
        }
    }

    pub fn with_column(mut self, column: IndexColumn) -> Self {
        self.columns.push(column);
        self
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }
}
