use crate::model::IndexDefinition;
use crate::types::{Document, EntityId, FieldValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Field name to value, in extraction order.
pub type FieldValues = IndexMap<String, FieldValue>;

/// A link from an entity to another object, as produced by a relational
/// interpreter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationalValue {
    pub destination_id: EntityId,
    #[serde(rename = "type")]
    pub relation_type: String,
    #[serde(default)]
    pub params: FieldValues,
}

impl RelationalValue {
    pub fn new(destination_id: EntityId, relation_type: impl Into<String>) -> Self {
        RelationalValue {
            destination_id,
            relation_type: relation_type.into(),
            params: FieldValues::new(),
        }
    }
}

/// One row of the relation store.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationRow {
    pub src: EntityId,
    pub src_virtual_object_id: EntityId,
    pub dest: EntityId,
    pub fieldname: String,
    pub relation_type: String,
    pub params: FieldValues,
}

impl RelationRow {
    pub fn from_value(
        src: EntityId,
        src_virtual_object_id: EntityId,
        fieldname: &str,
        value: &RelationalValue,
    ) -> Self {
        RelationRow {
            src,
            src_virtual_object_id,
            dest: value.destination_id,
            fieldname: fieldname.to_string(),
            relation_type: value.relation_type.clone(),
            params: value.params.clone(),
        }
    }

    /// `{src}_{dest}_{fieldname}`
    pub fn document_id(&self) -> String {
        format!("{}_{}_{}", self.src, self.dest, self.fieldname)
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert("src".into(), self.src.into());
        doc.insert(
            "src_virtualObjectId".into(),
            self.src_virtual_object_id.into(),
        );
        doc.insert("dest".into(), self.dest.into());
        doc.insert("fieldname".into(), self.fieldname.clone().into());
        doc.insert("type".into(), self.relation_type.clone().into());
        for (key, value) in &self.params {
            doc.insert(key.clone(), value.to_document_value());
        }
        doc
    }
}

/// Per-language values of an entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalizedData {
    pub oo_id: EntityId,
    /// language -> field values
    pub values: IndexMap<String, FieldValues>,
}

/// Everything extracted from one entity for one index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedData {
    pub data: FieldValues,
    pub localized: LocalizedData,
    pub relations: Vec<RelationRow>,
}

/// The source object seen by the indexing engine.
pub trait Indexable: Send + Sync {
    fn id(&self) -> EntityId;

    /// Whether this object belongs in `index` at all.
    fn is_indexable(&self, index: &IndexDefinition) -> bool;

    fn prepare(&self, index: &IndexDefinition) -> PreparedData;
}

fn default_true() -> bool {
    true
}

/// An entity whose values were computed ahead of time, e.g. read from a JSON
/// export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticEntity {
    pub id: EntityId,
    #[serde(default, rename = "virtualObjectId")]
    pub virtual_object_id: Option<EntityId>,
    #[serde(default = "default_true")]
    pub indexable: bool,
    #[serde(default)]
    pub values: FieldValues,
    /// language -> field values
    #[serde(default)]
    pub localized: IndexMap<String, FieldValues>,
    /// field name -> related objects
    #[serde(default)]
    pub relations: IndexMap<String, Vec<RelationalValue>>,
}

impl StaticEntity {
    pub fn new(id: EntityId) -> Self {
        StaticEntity {
            id,
            indexable: true,
            ..Default::default()
        }
    }

    pub fn with_value(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn with_localized(mut self, language: &str, name: &str, value: impl Into<FieldValue>) -> Self {
        self.localized
            .entry(language.to_string())
            .or_default()
            .insert(name.to_string(), value.into());
        self
    }

    pub fn with_relation(mut self, fieldname: &str, value: RelationalValue) -> Self {
        self.relations
            .entry(fieldname.to_string())
            .or_default()
            .push(value);
        self
    }

    pub fn not_indexable(mut self) -> Self {
        self.indexable = false;
        self
    }
}

impl Indexable for StaticEntity {
    fn id(&self) -> EntityId {
        self.id
    }

    fn is_indexable(&self, _index: &IndexDefinition) -> bool {
        self.indexable
    }

    fn prepare(&self, _index: &IndexDefinition) -> PreparedData {
        let virtual_id = self.virtual_object_id.unwrap_or(self.id);

        let mut data = FieldValues::new();
        data.insert("o_id".into(), FieldValue::Integer(self.id));
        data.insert("o_virtualObjectId".into(), FieldValue::Integer(virtual_id));
        for (key, value) in &self.values {
            data.insert(key.clone(), value.clone());
        }

        let relations = self
            .relations
            .iter()
            .flat_map(|(fieldname, values)| {
                values
                    .iter()
                    .map(move |v| RelationRow::from_value(self.id, virtual_id, fieldname, v))
            })
            .collect();

        PreparedData {
            data,
            localized: LocalizedData {
                oo_id: self.id,
                values: self.localized.clone(),
            },
            relations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;

    #[test]
    fn test_relation_document_id() {
        let row = RelationRow::from_value(12, 10, "categories", &RelationalValue::new(7, "object"));
        assert_eq!(row.document_id(), "12_7_categories");

        let doc = row.to_document();
        assert_eq!(doc["src"], 12);
        assert_eq!(doc["src_virtualObjectId"], 10);
        assert_eq!(doc["type"], "object");
    }

    #[test]
    fn test_static_entity_prepare() {
        let def = IndexDefinition::new("products", BackendConfig::new("http://localhost:9200"));
        let entity = StaticEntity::new(5)
            .with_value("price", 9.5)
            .with_localized("en", "title", "Shoe")
            .with_relation("categories", RelationalValue::new(3, "object"))
            .with_relation("categories", RelationalValue::new(4, "object"));

        let prepared = entity.prepare(&def);
        assert_eq!(prepared.data["o_id"], FieldValue::Integer(5));
        assert_eq!(prepared.data["o_virtualObjectId"], FieldValue::Integer(5));
        assert_eq!(prepared.localized.oo_id, 5);
        assert_eq!(prepared.localized.values["en"]["title"], FieldValue::from("Shoe"));
        assert_eq!(prepared.relations.len(), 2);
        assert_eq!(prepared.relations[1].dest, 4);
    }

    #[test]
    fn test_static_entity_from_json() {
        let json = r#"{
            "id": 9,
            "virtualObjectId": 2,
            "values": {"price": 3.0},
            "localized": {"de": {"title": "Schuh"}},
            "relations": {"brand": [{"destination_id": 44, "type": "object"}]}
        }"#;
        let entity: StaticEntity = serde_json::from_str(json).unwrap();
        assert!(entity.indexable);
        assert_eq!(entity.virtual_object_id, Some(2));
        assert_eq!(entity.relations["brand"][0].destination_id, 44);
    }
}
