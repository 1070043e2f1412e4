//! CLI command implementations

pub mod check;
pub mod run;
pub mod schema;

use crate::engine::ImportReport;

use super::error::CliError;

/// Print a run report as pretty JSON on stdout
pub fn print_report(report: &ImportReport) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| CliError::IoError(format!("Failed to serialize report: {}", e)))?;
    println!("{}", json);
    Ok(())
}
