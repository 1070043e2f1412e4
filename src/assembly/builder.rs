//! Nested document assembly

use serde_json::{Map, Value};
use tracing::debug;

use super::primary_key::{document_id, primary_key_string};
use crate::catalog::FieldCatalog;
use crate::models::{Document, FieldValue, Record, Table};

/// One top-level document built from a record, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct RootDocument {
    /// Top-level container, which is also the target collection
    pub collection: String,
    /// Raw primary-key string the identifier was hashed from
    pub primary_key: String,
    pub document: Document,
}

impl RootDocument {
    pub fn id(&self) -> &str {
        self.document.id().unwrap_or_default()
    }
}

/// Everything assembled from one record, keyed by top-level container.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledDocument {
    /// Load position of the source record
    pub record_index: usize,
    pub documents: Vec<RootDocument>,
}

impl AssembledDocument {
    pub fn get(&self, collection: &str) -> Option<&RootDocument> {
        self.documents.iter().find(|d| d.collection == collection)
    }

    /// `{container: document, ...}` as JSON.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .documents
            .iter()
            .map(|d| (d.collection.clone(), d.document.to_json()))
            .collect();
        Value::Object(map)
    }
}

/// Builds nested documents from cleaned records.
pub struct DocumentAssembler<'a> {
    catalog: &'a FieldCatalog,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(catalog: &'a FieldCatalog) -> Self {
        Self { catalog }
    }

    /// Assemble every top-level document for one record.
    pub fn assemble(&self, record: &Record) -> AssembledDocument {
        let documents = self
            .catalog
            .top_level_containers()
            .into_iter()
            .map(|root| self.assemble_root(record, root))
            .collect();
        AssembledDocument {
            record_index: record.index(),
            documents,
        }
    }

    fn assemble_root(&self, record: &Record, root: &str) -> RootDocument {
        let primary_key = primary_key_string(self.catalog, record, root);
        let id = document_id(&primary_key);

        let mut document = Document::new();
        for field in self.catalog.fields_of_document(root) {
            let path = self.catalog.container_path(&field.container);
            let value = if field.is_identifier() {
                FieldValue::Text(id.clone())
            } else {
                record.get(&field.name).clone()
            };
            // the top-level container is the document itself
            document.insert_at(path.get(1..).unwrap_or_default(), &field.target_name, value);
        }

        debug!("Assembled {} document {} from '{}'", root, id, primary_key);
        RootDocument {
            collection: root.to_string(),
            primary_key,
            document,
        }
    }

    /// Assemble every record of the table, in table order.
    pub fn assemble_all(&self, table: &Table) -> Vec<AssembledDocument> {
        table.records().iter().map(|r| self.assemble(r)).collect()
    }
}
