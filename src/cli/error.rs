//! CLI-specific error types

use std::path::PathBuf;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::database::StoreError;
use crate::engine::EngineError;
use crate::export::ExportError;

/// CLI-specific error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to write file {0}: {1}")]
    FileWriteError(PathBuf, String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    CatalogError(#[from] CatalogError),

    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Import failed: {0}")]
    EngineError(#[from] EngineError),

    #[error("Export error: {0}")]
    ExportError(#[from] ExportError),

    #[error("Logging error: {0}")]
    LoggingError(String),

    #[error("IO error: {0}")]
    IoError(String),
}
