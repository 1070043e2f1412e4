//! Export functionality
//!
//! Derives storage-layer constraints from the field catalog:
//! - Collection validators (`$jsonSchema`)
//! - Index lists

pub mod indexes;
pub mod validator;

use serde::Serialize;
use std::collections::BTreeMap;

use crate::catalog::FieldCatalog;

/// Result of an export operation.
///
/// Contains the exported content and format identifier.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[must_use = "export results contain the exported content and should be used"]
pub struct ExportResult {
    /// Exported content
    pub content: String,
    /// Format identifier
    pub format: String,
}

/// Error during export
#[derive(Debug, thiserror::Error, serde::Serialize, serde::Deserialize)]
pub enum ExportError {
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Validators and indexes derived from one catalog.
#[derive(Debug, Clone, Serialize)]
pub struct StorageSchema {
    pub validators: BTreeMap<String, serde_json::Value>,
    pub indexes: Vec<IndexSpec>,
}

impl StorageSchema {
    pub fn derive(catalog: &FieldCatalog) -> Self {
        Self {
            validators: build_validators(catalog),
            indexes: derive_indexes(catalog),
        }
    }

    /// Validators and indexes as pretty JSON.
    pub fn export(&self) -> Result<ExportResult, ExportError> {
        Ok(ExportResult {
            content: serde_json::to_string_pretty(self)
                .map_err(|e| ExportError::SerializationError(e.to_string()))?,
            format: "storage_schema".to_string(),
        })
    }
}

// Re-export for convenience
pub use indexes::{IndexSpec, derive_indexes, indexes_for};
pub use validator::{JSON_SCHEMA_KEY, build_validators};
