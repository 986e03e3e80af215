//! Extension capabilities.
//!
//! An extension contributes columns that do not come from the definition's
//! own column list (category membership, store assignment, ...). Each
//! capability is its own trait; an extension advertises the ones it has via
//! the `as_*` accessors on [`Extension`].

use crate::model::{ColumnType, IndexColumn, IndexDefinition};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Column name to storage type.
pub type SystemColumns = IndexMap<String, ColumnType>;

pub trait ColumnsExtension: Send + Sync {
    /// Columns added to the primary store.
    fn system_columns(&self) -> SystemColumns;

    /// Columns added to the localized store.
    fn localized_system_columns(&self) -> SystemColumns {
        SystemColumns::new()
    }
}

pub trait RelationalColumnsExtension: Send + Sync {
    fn relational_columns(&self) -> SystemColumns;
}

pub trait ColumnConfigExtension: Send + Sync {
    fn column_config(&self, _column: &IndexColumn) -> Map<String, Value> {
        Map::new()
    }

    fn system_column_config(&self, _name: &str, _column_type: &ColumnType) -> Map<String, Value> {
        Map::new()
    }
}

pub trait Extension: Send + Sync {
    fn name(&self) -> &str;

    fn supports(&self, _index: &IndexDefinition) -> bool {
        true
    }

    fn as_columns(&self) -> Option<&dyn ColumnsExtension> {
        None
    }

    fn as_relational_columns(&self) -> Option<&dyn RelationalColumnsExtension> {
        None
    }

    fn as_column_config(&self) -> Option<&dyn ColumnConfigExtension> {
        None
    }
}

/// Category and store membership columns for catalog indices.
#[derive(Debug, Clone, Default)]
pub struct CatalogMembershipExtension;

impl ColumnsExtension for CatalogMembershipExtension {
    fn system_columns(&self) -> SystemColumns {
        IndexMap::from([
            ("categoryIds".to_string(), ColumnType::String),
            ("parentCategoryIds".to_string(), ColumnType::String),
            ("stores".to_string(), ColumnType::String),
        ])
    }
}

impl Extension for CatalogMembershipExtension {
    fn name(&self) -> &str {
        "catalog_membership"
    }

    fn as_columns(&self) -> Option<&dyn ColumnsExtension> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_are_opt_in() {
        let ext = CatalogMembershipExtension;
        assert!(ext.as_columns().is_some());
        assert!(ext.as_relational_columns().is_none());
        assert!(ext.as_column_config().is_none());
        assert_eq!(ext.as_columns().unwrap().system_columns().len(), 3);
    }
}
