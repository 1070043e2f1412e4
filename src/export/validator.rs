//! Collection validator derivation
//!
//! Builds one `$jsonSchema` validator per top-level document from the
//! field catalog. Leaves carry the storage type tag of the field's value
//! type; containers carry the `required` list of their children.

use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

use crate::catalog::{FieldCatalog, FieldDefinition};

/// Key wrapping a validator schema.
pub const JSON_SCHEMA_KEY: &str = "$jsonSchema";

/// Storage tag for nested containers.
pub const OBJECT_TYPE: &str = "object";

/// Storage tag accepted alongside the field type when nulls are written.
pub const NULL_TYPE: &str = "null";

/// `collection -> {"$jsonSchema": {...}}` for every top-level document.
pub fn build_validators(catalog: &FieldCatalog) -> BTreeMap<String, Value> {
    catalog
        .top_level_containers()
        .into_iter()
        .map(|root| {
            let (properties, required) = build_container(catalog, root);
            (
                root.to_string(),
                json!({ JSON_SCHEMA_KEY: object_schema(properties, required) }),
            )
        })
        .collect()
}

fn leaf_schema(field: &FieldDefinition) -> Value {
    let tag = field.value_type.bson_type();
    if field.replacement.is_null_replacement() {
        json!({ "bsonType": [tag, NULL_TYPE] })
    } else {
        json!({ "bsonType": tag })
    }
}

fn object_schema(properties: Map<String, Value>, required: Vec<String>) -> Value {
    let mut schema = Map::new();
    schema.insert("bsonType".to_string(), json!(OBJECT_TYPE));
    if !required.is_empty() {
        schema.insert("required".to_string(), json!(required));
    }
    schema.insert("properties".to_string(), Value::Object(properties));
    Value::Object(schema)
}

/// Properties and required keys of one container, recursing into children.
fn build_container(catalog: &FieldCatalog, container: &str) -> (Map<String, Value>, Vec<String>) {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in catalog.fields().iter().filter(|f| f.container == container) {
        properties.insert(field.target_name.clone(), leaf_schema(field));
        if field.is_required {
            required.push(field.target_name.clone());
        }
    }

    for child in catalog.containers().children(container) {
        let (child_properties, child_required) = build_container(catalog, child);
        // a container is required as soon as one of its children is
        if !child_required.is_empty() {
            required.push(child.to_string());
        }
        properties.insert(
            child.to_string(),
            object_schema(child_properties, child_required),
        );
    }

    (properties, required)
}
