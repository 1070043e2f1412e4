//! Full import command
//!
//! Loads, cleans and deduplicates the source, prepares the store and upserts
//! every document.

use std::path::PathBuf;
use tracing::info;

use crate::cli::error::CliError;
use crate::config::ImporterConfig;
use crate::database;
use crate::engine::{Engine, ImportReport};
use crate::import::TableSource;

/// Run command arguments
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    /// Source file overriding `paths.source`
    pub source: Option<PathBuf>,
    pub start: Option<usize>,
    pub limit: Option<usize>,
    pub trace_only: bool,
    pub clean_db: bool,
    pub production: bool,
}

impl RunArgs {
    /// Apply command line flags on top of the configuration
    pub fn apply(&self, config: &mut ImporterConfig) {
        if let Some(source) = &self.source {
            config.paths.source = source.clone();
        }
        if let Some(start) = self.start {
            config.run.start = start;
        }
        if let Some(limit) = self.limit {
            config.run.limit = limit;
        }
        config.run.trace_only |= self.trace_only;
        config.run.clean_db |= self.clean_db;
        config.run.production |= self.production;
    }
}

/// Import the configured source into the configured store
pub fn handle_run(mut config: ImporterConfig, args: &RunArgs) -> Result<ImportReport, CliError> {
    args.apply(&mut config);
    config.apply_production_guard()?;
    config.database.check_credentials()?;
    info!("Target database {}", config.database.describe());

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::IoError(format!("Failed to create runtime: {}", e)))?;

    rt.block_on(async {
        let mut engine = Engine::from_config(config)?;
        let roles = if engine.config().run.trace_only {
            Vec::new()
        } else {
            engine.load_roles()?
        };

        let store = database::connect(&engine.config().database).await?;
        info!("Connected to {} store", store.backend_type());

        let source = TableSource::Path(engine.config().paths.source.clone());
        let report = engine.run(source, store.as_ref(), &roles).await?;
        Ok::<_, CliError>(report)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let mut config = ImporterConfig::new();
        config.run.limit = 50;
        let args = RunArgs {
            source: Some(PathBuf::from("other.csv")),
            start: Some(5),
            trace_only: true,
            ..Default::default()
        };
        args.apply(&mut config);
        assert_eq!(config.paths.source, PathBuf::from("other.csv"));
        assert_eq!(config.run.start, 5);
        assert_eq!(config.run.limit, 50);
        assert!(config.run.trace_only);
        assert!(!config.run.clean_db);
    }
}
