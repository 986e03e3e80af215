use super::{IndexWorker, Outcome};
use crate::backend::{Operation, SearchBackend};
use crate::error::Result;
use crate::model::{FieldValues, Indexable, IndexDefinition};
use crate::types::{Document, EntityId};
use serde_json::json;

/// Flat field values as a stored document.
pub fn values_to_document(values: &FieldValues) -> Document {
    values
        .iter()
        .map(|(k, v)| (k.clone(), v.to_document_value()))
        .collect()
}

/// The localized document of one language.
///
/// Starts from `base` (empty for the localized store, the flat values for a
/// view), adds `oo_id` and `language`, then the language's values: keys that
/// are not columns of `index` first, then column values in column order.
pub fn localized_document(
    index: &IndexDefinition,
    base: Option<&FieldValues>,
    oo_id: EntityId,
    language: &str,
    values: &FieldValues,
) -> Document {
    let mut doc = base.map(values_to_document).unwrap_or_default();
    doc.insert("oo_id".into(), json!(oo_id));
    doc.insert("language".into(), json!(language));

    for (key, value) in values {
        if !index.has_column(key) {
            doc.insert(key.clone(), value.to_document_value());
        }
    }
    for column in &index.columns {
        if let Some(value) = values.get(&column.name) {
            doc.insert(column.name.clone(), value.to_document_value());
        }
    }
    doc
}

impl IndexWorker {
    /// Bring every store of `index` up to date with `entity`.
    ///
    /// A non-indexable entity is removed from the primary store instead.
    /// Every write is attempted independently; failures are collected in the
    /// returned [`Outcome`].
    pub async fn update_index(&self, index: &IndexDefinition, entity: &dyn Indexable) -> Result<Outcome> {
        let backend = self.backend(index)?;
        let id = entity.id();

        if !entity.is_indexable(index) {
            tracing::info!(entity_id = id, index = %index.name, "Entity is not indexable, removing it");
            return self.delete_with(backend.as_ref(), index, id).await;
        }

        let prepared = entity.prepare(index);
        let doc_id = id.to_string();
        let mut outcome = Outcome::new();

        let primary = self.names.primary(&index.name);
        outcome
            .attempt(
                Operation::Index,
                &primary,
                backend.index_document(&primary, &doc_id, &values_to_document(&prepared.data)),
            )
            .await;

        let localized_store = self.names.localized(&index.name);
        for (language, values) in &prepared.localized.values {
            let doc = localized_document(index, None, prepared.localized.oo_id, language, values);
            outcome
                .attempt(
                    Operation::Index,
                    &localized_store,
                    backend.index_document(&localized_store, &doc_id, &doc),
                )
                .await;
        }

        for (language, values) in &prepared.localized.values {
            let view = self.names.localized_view(&index.name, language);
            let doc = localized_document(
                index,
                Some(&prepared.data),
                prepared.localized.oo_id,
                language,
                values,
            );
            outcome
                .attempt(Operation::Index, &view, backend.index_document(&view, &doc_id, &doc))
                .await;
        }

        outcome.merge(self.delete_relations_with(backend.as_ref(), index, id).await);

        let relations = self.names.relations(&index.name);
        for row in &prepared.relations {
            outcome
                .attempt(
                    Operation::Index,
                    &relations,
                    backend.index_document(&relations, &row.document_id(), &row.to_document()),
                )
                .await;
        }

        tracing::debug!(
            entity_id = id,
            relations = prepared.relations.len(),
            failures = outcome.failures().len(),
            "Indexed entity"
        );
        Ok(outcome)
    }

    /// Remove the entity's primary document.
    pub async fn delete_from_index(&self, index: &IndexDefinition, entity: &dyn Indexable) -> Result<Outcome> {
        let backend = self.backend(index)?;
        self.delete_with(backend.as_ref(), index, entity.id()).await
    }

    /// Remove every relation row whose source is the entity.
    pub async fn delete_from_relational_index(
        &self,
        index: &IndexDefinition,
        entity: &dyn Indexable,
    ) -> Result<Outcome> {
        let backend = self.backend(index)?;
        Ok(self
            .delete_relations_with(backend.as_ref(), index, entity.id())
            .await)
    }

    async fn delete_with(&self, backend: &dyn SearchBackend, index: &IndexDefinition, id: EntityId) -> Result<Outcome> {
        let primary = self.names.primary(&index.name);
        let mut outcome = Outcome::new();
        outcome
            .attempt(
                Operation::DeleteDocument,
                &primary,
                backend.delete_document(&primary, &id.to_string()),
            )
            .await;
        Ok(outcome)
    }

    async fn delete_relations_with(&self, backend: &dyn SearchBackend, index: &IndexDefinition, id: EntityId) -> Outcome {
        let relations = self.names.relations(&index.name);
        let query = json!({ "term": { "src": id } });
        let mut outcome = Outcome::new();
        // rows written since the last refresh are invisible to delete_by_query
        outcome
            .attempt(Operation::Refresh, &relations, backend.refresh_store(&relations))
            .await;
        if let Some(deleted) = outcome
            .attempt(
                Operation::DeleteByQuery,
                &relations,
                backend.delete_by_query(&relations, &query),
            )
            .await
        {
            tracing::debug!(entity_id = id, deleted, "Cleared relation rows");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::model::{ColumnType, IndexColumn};
    use crate::types::FieldValue;

    #[test]
    fn test_localized_document_layout() {
        let index = IndexDefinition::new("p", BackendConfig::new("memory://"))
            .with_column(IndexColumn::new("title", ColumnType::String));
        let mut values = FieldValues::new();
        values.insert("title".into(), FieldValue::from("Schuh"));
        values.insert("slug".into(), FieldValue::from("schuh"));

        let doc = localized_document(&index, None, 4, "de", &values);
        let keys: Vec<&str> = doc.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["oo_id", "language", "slug", "title"]);
        assert_eq!(doc["title"], json!("Schuh"));

        let mut flat = FieldValues::new();
        flat.insert("o_id".into(), FieldValue::Integer(4));
        flat.insert("price".into(), FieldValue::Float(9.5));
        let view = localized_document(&index, Some(&flat), 4, "de", &values);
        assert_eq!(view["price"], json!(9.5));
        assert_eq!(view["language"], json!("de"));
    }

    #[test]
    fn test_array_values_are_delimited() {
        let mut values = FieldValues::new();
        values.insert(
            "categoryIds".into(),
            FieldValue::Array(vec![FieldValue::Integer(3), FieldValue::Integer(5)]),
        );
        assert_eq!(values_to_document(&values)["categoryIds"], json!(",3,5,"));
    }
}
