//! care-import - catalog-driven loading of healthcare records into a document store
//!
//! Provides unified interfaces for:
//! - Field catalog loading and validation
//! - Type coercion, validation masking and deduplication of tabular records
//! - Primary-key hashing and nested document assembly
//! - Validator and index derivation from the same catalog
//! - Document store backends (in-memory, PostgreSQL)
//! - Run orchestration with trace-only and production guards

pub mod assembly;
pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod database;
pub mod engine;
pub mod export;
pub mod import;
#[cfg(feature = "cli")]
pub mod logging;
pub mod models;
pub mod transform;
pub mod validation;

// Re-export commonly used types
pub use assembly::{AssembledDocument, DocumentAssembler, RootDocument};
pub use catalog::{CatalogError, FieldCatalog, FieldDefinition, ReplacementPolicy};
pub use config::{ConfigError, ImporterConfig};
#[cfg(feature = "postgres-backend")]
pub use database::PostgresStore;
pub use database::{DocumentStore, MemoryStore, StoreError, UpsertOutcome};
pub use engine::{Engine, EngineError, ImportReport, Stage};
pub use export::{ExportError, ExportResult, StorageSchema};
pub use import::{LoadError, TableSource};
pub use validation::{ValidationError, ValidationRule};

// Re-export models
pub use models::enums::*;
pub use models::{Document, FieldValue, Record, Table};
