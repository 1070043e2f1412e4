//! Storage schema command
//!
//! Prints (or writes) the collection validators and indexes derived from the
//! field catalog.

use std::path::PathBuf;

use crate::catalog::FieldCatalog;
use crate::cli::error::CliError;
use crate::config::ImporterConfig;
use crate::export::StorageSchema;

/// Schema command arguments
#[derive(Debug, Clone, Default)]
pub struct SchemaArgs {
    /// Output file; stdout when absent
    pub output: Option<PathBuf>,
}

/// Derive validators and indexes from the configured catalog
pub fn handle_schema(config: &ImporterConfig, args: &SchemaArgs) -> Result<(), CliError> {
    let catalog = FieldCatalog::load(&config.paths.catalog, &config.coercion)?;
    let exported = StorageSchema::derive(&catalog).export()?;

    match &args.output {
        Some(path) => std::fs::write(path, &exported.content)
            .map_err(|e| CliError::FileWriteError(path.clone(), e.to_string()))?,
        None => println!("{}", exported.content),
    }
    Ok(())
}
