//! Transformation check without a store

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::config::ImporterConfig;
use crate::engine::{Engine, ImportReport};
use crate::import::TableSource;

/// Check command arguments
#[derive(Debug, Clone, Default)]
pub struct CheckArgs {
    pub source: Option<PathBuf>,
    pub start: Option<usize>,
    pub limit: Option<usize>,
}

/// Load, clean, deduplicate and assemble the source, touching no store
pub fn handle_check(
    mut config: ImporterConfig,
    args: &CheckArgs,
) -> Result<ImportReport, CliError> {
    if let Some(source) = &args.source {
        config.paths.source = source.clone();
    }
    if let Some(start) = args.start {
        config.run.start = start;
    }
    if let Some(limit) = args.limit {
        config.run.limit = limit;
    }

    let source = TableSource::Path(config.paths.source.clone());
    let mut engine = Engine::from_config(config)?;
    Ok(engine.check(source)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_check_reports_counts() {
        let dir = tempdir().unwrap();
        let catalog = dir.path().join("fields.yml");
        let source = dir.path().join("source.csv");
        std::fs::write(
            &catalog,
            "_id: {doc: care}\nName: {doc: patient, parent: care, primary: true}\n",
        )
        .unwrap();
        std::fs::write(&source, "Name\nBob\nAlice\nBob\n").unwrap();

        let mut config = ImporterConfig::new();
        config.paths.catalog = catalog;
        let args = CheckArgs {
            source: Some(source),
            ..Default::default()
        };
        let report = handle_check(config, &args).unwrap();
        assert_eq!(report.rows_loaded, 3);
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(report.documents_assembled, 2);
    }
}
