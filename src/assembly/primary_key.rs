//! Content-derived document identifiers

use sha2::{Digest, Sha256};

use crate::catalog::FieldCatalog;
use crate::models::Record;

/// Separator between primary-key values.
pub const PK_SEPARATOR: &str = "_";

/// Primary-key string of a record for one top-level document: the values
/// of the scope's members in catalog order, joined by `_`.
pub fn primary_key_string(catalog: &FieldCatalog, record: &Record, scope: &str) -> String {
    catalog
        .primary_key_field_names(Some(scope))
        .iter()
        .map(|name| record.get(name).key_text())
        .collect::<Vec<_>>()
        .join(PK_SEPARATOR)
}

/// SHA-256 hex digest of a primary-key string.
pub fn document_id(primary_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(primary_key.as_bytes());
    format!("{:x}", hasher.finalize())
}
