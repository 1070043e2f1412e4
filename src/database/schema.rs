//! Storage schema helpers
//!
//! Document checking against `$jsonSchema` validators (shared by every
//! backend that cannot enforce validators natively) and the bookkeeping
//! SQL used by the PostgreSQL backend.

use serde_json::Value;

use crate::export::JSON_SCHEMA_KEY;
use crate::models::{Document, Node};

/// Check a document against a collection validator.
///
/// Supports the subset of `$jsonSchema` the exporter produces: `bsonType`
/// (a tag or a list of tags), `required` and nested `properties`. A null or
/// empty validator accepts everything.
pub fn validate_document(document: &Document, validator: &Value) -> Result<(), String> {
    match validator.get(JSON_SCHEMA_KEY) {
        Some(schema) => check_object(document, schema, ""),
        None => Ok(()),
    }
}

fn allowed_types(schema: &Value) -> Vec<&str> {
    match schema.get("bsonType") {
        Some(Value::String(tag)) => vec![tag.as_str()],
        Some(Value::Array(tags)) => tags.iter().filter_map(|t| t.as_str()).collect(),
        _ => Vec::new(),
    }
}

fn node_type(node: &Node) -> &'static str {
    match node {
        Node::Value(value) => value.bson_type(),
        Node::Document(_) => "object",
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn check_object(document: &Document, schema: &Value, prefix: &str) -> Result<(), String> {
    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for key in required.iter().filter_map(|k| k.as_str()) {
            if document.get(key).is_none() {
                return Err(format!(
                    "missing required field '{}'",
                    join_path(prefix, key)
                ));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) else {
        return Ok(());
    };
    for (key, property) in properties {
        let Some(node) = document.get(key) else {
            continue;
        };
        let path = join_path(prefix, key);
        let allowed = allowed_types(property);
        let actual = node_type(node);
        if !allowed.is_empty() && !allowed.contains(&actual) {
            return Err(format!(
                "field '{}' is {} but must be {}",
                path,
                actual,
                allowed.join(" or ")
            ));
        }
        if let Node::Document(child) = node {
            check_object(child, property, &path)?;
        }
    }
    Ok(())
}

/// Bookkeeping tables of the PostgreSQL backend
pub struct StoreSchema;

impl StoreSchema {
    /// Tables recording collections (with their validators) and created roles
    pub fn create_bookkeeping_sql() -> &'static str {
        r#"
CREATE TABLE IF NOT EXISTS care_import_collections (
    name TEXT PRIMARY KEY,
    validator JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS care_import_roles (
    name TEXT PRIMARY KEY,
    created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#
    }
}

/// Collection bookkeeping queries
pub mod collection_queries {
    pub const INSERT: &str =
        "INSERT INTO care_import_collections (name, validator) VALUES ($1, $2)";
    pub const SELECT_VALIDATOR: &str =
        "SELECT validator FROM care_import_collections WHERE name = $1";
    pub const SELECT_NAMES: &str = "SELECT name FROM care_import_collections ORDER BY name";
    pub const DELETE: &str = "DELETE FROM care_import_collections WHERE name = $1";
}

/// Role bookkeeping queries
pub mod role_queries {
    pub const INSERT: &str =
        "INSERT INTO care_import_roles (name) VALUES ($1) ON CONFLICT (name) DO NOTHING";
    pub const SELECT_NAMES: &str = "SELECT name FROM care_import_roles ORDER BY name";
    pub const DELETE_ALL: &str = "DELETE FROM care_import_roles";
}
