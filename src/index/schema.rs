use super::{IndexWorker, Outcome};
use crate::backend::{FieldMapping, FieldType, Operation, Property, SearchBackend};
use crate::error::{IndexError, Result};
use crate::model::{ColumnType, IndexColumn, IndexDefinition, SystemColumns};
use serde_json::{json, Map, Value};

/// Extension columns that are always exact-match filterable.
const KEYWORD_SYSTEM_COLUMNS: [&str; 3] = ["categoryIds", "stores", "parentCategoryIds"];

pub fn render_field_type(column_type: &ColumnType) -> Result<FieldType> {
    match column_type {
        ColumnType::Integer => Ok(FieldType::Integer),
        ColumnType::Boolean => Ok(FieldType::Boolean),
        ColumnType::Date => Ok(FieldType::Date),
        ColumnType::Double => Ok(FieldType::Double),
        ColumnType::String | ColumnType::Text => Ok(FieldType::Keyword),
        ColumnType::Unsupported(name) => Err(IndexError::UnsupportedFieldType(name.clone())),
    }
}

pub fn system_attributes() -> SystemColumns {
    SystemColumns::from([
        ("o_id".to_string(), ColumnType::Integer),
        ("oo_id".to_string(), ColumnType::Integer),
        ("o_key".to_string(), ColumnType::String),
        ("o_classId".to_string(), ColumnType::String),
        ("o_className".to_string(), ColumnType::String),
        ("o_virtualObjectId".to_string(), ColumnType::Integer),
        ("o_virtualObjectActive".to_string(), ColumnType::Boolean),
        ("o_type".to_string(), ColumnType::String),
        ("active".to_string(), ColumnType::Boolean),
    ])
}

pub fn localized_system_attributes() -> SystemColumns {
    SystemColumns::from([
        ("oo_id".to_string(), ColumnType::Integer),
        ("language".to_string(), ColumnType::String),
        ("name".to_string(), ColumnType::String),
    ])
}

pub fn relational_system_attributes() -> SystemColumns {
    SystemColumns::from([
        ("src".to_string(), ColumnType::Integer),
        ("src_virtualObjectId".to_string(), ColumnType::Integer),
        ("dest".to_string(), ColumnType::Integer),
        ("fieldname".to_string(), ColumnType::String),
        ("type".to_string(), ColumnType::String),
    ])
}

/// A property of `field_type` carrying every config key except `notnull`.
fn property_with_config(field_type: FieldType, config: Map<String, Value>) -> Property {
    let mut property = Property::new(field_type);
    property.options = config.into_iter().filter(|(k, _)| k != "notnull").collect();
    property
}

fn base_config() -> Map<String, Value> {
    let mut config = Map::new();
    config.insert("notnull".to_string(), json!(false));
    config
}

impl IndexWorker {
    /// Column config merged over `{"notnull": false}` from every extension.
    pub fn field_type_config(&self, index: &IndexDefinition, column: &IndexColumn) -> Map<String, Value> {
        let mut config = base_config();
        for extension in self.extensions_for(index) {
            if let Some(ext) = extension.as_column_config() {
                config.extend(ext.column_config(column));
            }
        }
        config
    }

    pub fn system_field_type_config(
        &self,
        index: &IndexDefinition,
        name: &str,
        column_type: &ColumnType,
    ) -> Map<String, Value> {
        let mut config = base_config();
        for extension in self.extensions_for(index) {
            if let Some(ext) = extension.as_column_config() {
                config.extend(ext.system_column_config(name, column_type));
            }
        }
        config
    }

    fn system_property(&self, index: &IndexDefinition, name: &str, column_type: &ColumnType) -> Result<Property> {
        Ok(property_with_config(
            render_field_type(column_type)?,
            self.system_field_type_config(index, name, column_type),
        ))
    }

    pub fn primary_properties(&self, index: &IndexDefinition) -> Result<FieldMapping> {
        let mut properties = FieldMapping::new();

        for column in &index.columns {
            if self.is_localized_column(column) {
                continue;
            }
            let field_type = if column.source_type.is_relation() && column.column_type.is_textual() {
                FieldType::Keyword
            } else {
                render_field_type(&column.column_type)?
            };
            properties.insert(
                column.name.clone(),
                property_with_config(field_type, self.field_type_config(index, column)),
            );
        }

        for extension in self.extensions_for(index) {
            let Some(ext) = extension.as_columns() else {
                continue;
            };
            for (name, column_type) in ext.system_columns() {
                let property = if KEYWORD_SYSTEM_COLUMNS.contains(&name.as_str()) {
                    Property::new(FieldType::Keyword)
                } else {
                    self.system_property(index, &name, &column_type)?
                };
                properties.insert(name, property);
            }
        }

        for (name, column_type) in system_attributes() {
            properties.insert(name, Property::new(render_field_type(&column_type)?));
        }

        Ok(properties)
    }

    pub fn localized_properties(&self, index: &IndexDefinition) -> Result<FieldMapping> {
        let mut properties = FieldMapping::new();

        for column in index.columns.iter().filter(|c| self.is_localized_column(c)) {
            properties.insert(
                column.name.clone(),
                property_with_config(
                    render_field_type(&column.column_type)?,
                    self.field_type_config(index, column),
                ),
            );
        }

        for extension in self.extensions_for(index) {
            let Some(ext) = extension.as_columns() else {
                continue;
            };
            for (name, column_type) in ext.localized_system_columns() {
                let property = self.system_property(index, &name, &column_type)?;
                properties.insert(name, property);
            }
        }

        for (name, column_type) in localized_system_attributes() {
            properties.insert(name, Property::new(render_field_type(&column_type)?));
        }

        Ok(properties)
    }

    pub fn relational_properties(&self, index: &IndexDefinition) -> Result<FieldMapping> {
        let mut properties = FieldMapping::new();

        for extension in self.extensions_for(index) {
            let Some(ext) = extension.as_relational_columns() else {
                continue;
            };
            for (name, column_type) in ext.relational_columns() {
                let property = self.system_property(index, &name, &column_type)?;
                properties.insert(name, property);
            }
        }

        for (name, column_type) in relational_system_attributes() {
            properties.insert(name, Property::new(render_field_type(&column_type)?));
        }

        Ok(properties)
    }

    /// Primary fields overlaid with localized fields.
    pub fn view_properties(&self, index: &IndexDefinition) -> Result<FieldMapping> {
        let mut properties = self.primary_properties(index)?;
        properties.extend(self.localized_properties(index)?);
        Ok(properties)
    }

    /// Every store of `index` with the mapping it should carry.
    pub fn store_mappings(&self, index: &IndexDefinition) -> Result<Vec<(String, FieldMapping)>> {
        let name = &index.name;
        let mut stores = vec![
            (self.names.primary(name), self.primary_properties(index)?),
            (self.names.localized(name), self.localized_properties(index)?),
            (self.names.relations(name), self.relational_properties(index)?),
        ];
        let view = self.view_properties(index)?;
        for language in self.languages() {
            stores.push((self.names.localized_view(name, &language), view.clone()));
        }
        Ok(stores)
    }

    /// Drop and recreate every store of `index` with freshly synthesized
    /// mappings.
    ///
    /// Mapping synthesis and store creation failures abort with `Err`. Failed
    /// deletes, existence checks and mapping updates are collected in the
    /// returned [`Outcome`]; a store that survives its delete is kept and
    /// only gets the mapping update.
    pub async fn create_or_update_index_structures(&self, index: &IndexDefinition) -> Result<Outcome> {
        let backend = self.backend(index)?;
        let stores = self.store_mappings(index)?;
        let mut outcome = Outcome::new();

        for (store, mapping) in &stores {
            self.truncate_or_create(backend.as_ref(), store, &mut outcome)
                .await?;
            outcome
                .attempt(Operation::PutMapping, store, backend.put_mapping(store, mapping))
                .await;
        }

        tracing::info!(index = %index.name, stores = stores.len(), "Index structures synchronized");
        Ok(outcome)
    }

    async fn truncate_or_create(&self, backend: &dyn SearchBackend, store: &str, outcome: &mut Outcome) -> Result<()> {
        tracing::debug!(store = %store, "Dropping existing store");
        let dropped = match backend.delete_store(store).await {
            Ok(()) => true,
            Err(e) if e.is_not_found() => true,
            Err(e) => {
                outcome.record(Operation::DeleteStore, store, &e);
                false
            }
        };

        // an unanswered existence check trusts the delete
        let present = outcome
            .attempt(Operation::Exists, store, backend.store_exists(store))
            .await
            .unwrap_or(!dropped);
        if present {
            outcome.skip(Operation::Create, store, "store still exists, keeping it");
            return Ok(());
        }

        tracing::info!(store = %store, "Creating new store");
        match backend.create_store(store, &self.store_settings()).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(IndexError::StoreCreationFailed(store.to_string())),
            Err(e) => Err(IndexError::StoreCreationFailed(format!("{} ({})", store, e))),
        }
    }

    /// Delete every store of `index`. Each delete is attempted on its own.
    pub async fn delete_index_structures(&self, index: &IndexDefinition) -> Result<Outcome> {
        let backend = self.backend(index)?;
        let name = &index.name;
        let mut outcome = Outcome::new();

        let mut stores: Vec<String> = self
            .languages()
            .iter()
            .map(|language| self.names.localized_view(name, language))
            .collect();
        stores.push(self.names.primary(name));
        stores.push(self.names.relations(name));
        stores.push(self.names.localized(name));

        for store in &stores {
            outcome
                .attempt(Operation::DeleteStore, store, backend.delete_store(store))
                .await;
        }
        Ok(outcome)
    }

    /// Move every existing store of `old_name` to the matching `new_name`
    /// store by copying its documents and deleting the original. Stores that
    /// do not exist are skipped.
    pub async fn rename_index_structures(
        &self,
        index: &IndexDefinition,
        old_name: &str,
        new_name: &str,
    ) -> Result<Outcome> {
        let backend = self.backend(index)?;
        let languages = self.languages();
        let pairs = self
            .names
            .all(old_name, &languages)
            .into_iter()
            .zip(self.names.all(new_name, &languages));
        let mut outcome = Outcome::new();

        for (old_store, new_store) in pairs {
            let exists = outcome
                .attempt(Operation::Exists, &old_store, backend.store_exists(&old_store))
                .await
                .unwrap_or(false);
            if !exists {
                continue;
            }

            let copied = outcome
                .attempt(Operation::Reindex, &old_store, backend.reindex(&old_store, &new_store))
                .await;
            if copied.is_some() {
                tracing::info!(from = %old_store, to = %new_store, "Renamed store");
                outcome
                    .attempt(Operation::DeleteStore, &old_store, backend.delete_store(&old_store))
                    .await;
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::cache::ConnectionCache;
    use crate::config::{BackendConfig, WorkerConfig};
    use crate::model::{
        CatalogMembershipExtension, ColumnConfigExtension, Extension, SourceType,
    };
    use std::sync::Arc;

    struct FacetConfig;

    impl ColumnConfigExtension for FacetConfig {
        fn column_config(&self, column: &IndexColumn) -> Map<String, Value> {
            let mut config = Map::new();
            if column.name == "color" {
                config.insert("notnull".into(), json!(true));
                config.insert("doc_values".into(), json!(true));
            }
            config
        }
    }

    impl Extension for FacetConfig {
        fn name(&self) -> &str {
            "facet_config"
        }

        fn as_column_config(&self) -> Option<&dyn ColumnConfigExtension> {
            Some(self)
        }
    }

    fn worker() -> IndexWorker {
        IndexWorker::new(
            Arc::new(ConnectionCache::memory(Arc::new(MemoryBackend::new()))),
            WorkerConfig::default(),
        )
    }

    fn definition() -> IndexDefinition {
        IndexDefinition::new("products", BackendConfig::new("memory://"))
            .with_column(IndexColumn::new("price", ColumnType::Double))
            .with_column(
                IndexColumn::new("sku", ColumnType::String).with_source(SourceType::ManyToOneRelation),
            )
            .with_column(IndexColumn::new("color", ColumnType::Text))
            .with_column(
                IndexColumn::new("title", ColumnType::String).with_source(SourceType::LocalizedFields),
            )
    }

    #[test]
    fn test_render_field_type() {
        assert_eq!(render_field_type(&ColumnType::Integer).unwrap(), FieldType::Integer);
        assert_eq!(render_field_type(&ColumnType::Text).unwrap(), FieldType::Keyword);
        let err = render_field_type(&ColumnType::from("GEOPOINT")).unwrap_err();
        assert_eq!(err.to_string(), "GEOPOINT is not supported by the search backend");
    }

    #[test]
    fn test_primary_properties() {
        let mapping = worker().primary_properties(&definition()).unwrap();
        assert_eq!(mapping["price"].field_type, FieldType::Double);
        assert_eq!(mapping["sku"].field_type, FieldType::Keyword);
        assert!(!mapping.contains_key("title"));
        assert_eq!(mapping["o_virtualObjectId"].field_type, FieldType::Integer);
        assert_eq!(mapping["active"].field_type, FieldType::Boolean);
    }

    #[test]
    fn test_localized_properties_hold_localized_columns_only() {
        let mapping = worker().localized_properties(&definition()).unwrap();
        let names: Vec<&str> = mapping.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["title", "oo_id", "language", "name"]);
    }

    #[test]
    fn test_extension_columns_and_config() {
        let worker = worker()
            .with_extension(Arc::new(CatalogMembershipExtension))
            .with_extension(Arc::new(FacetConfig));
        let index = definition();
        let mapping = worker.primary_properties(&index).unwrap();

        assert_eq!(mapping["categoryIds"].field_type, FieldType::Keyword);
        assert_eq!(mapping["color"].options.get("doc_values"), Some(&json!(true)));
        assert!(!mapping["color"].options.contains_key("notnull"));

        let config = worker.field_type_config(&index, &index.columns[2]);
        assert_eq!(config["notnull"], json!(true));
        let config = worker.field_type_config(&index, &index.columns[0]);
        assert_eq!(config["notnull"], json!(false));
    }

    #[test]
    fn test_view_is_union_of_primary_and_localized() {
        let worker = worker();
        let view = worker.view_properties(&definition()).unwrap();
        assert!(view.contains_key("price"));
        assert!(view.contains_key("title"));
        assert!(view.contains_key("language"));
    }

    #[test]
    fn test_relational_properties() {
        let mapping = worker().relational_properties(&definition()).unwrap();
        assert_eq!(mapping["src"].field_type, FieldType::Integer);
        assert_eq!(mapping["fieldname"].field_type, FieldType::Keyword);
        assert_eq!(mapping.len(), 5);
    }
}
