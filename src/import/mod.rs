//! Import functionality
//!
//! Turns the accepted source shapes into a uniform `Table` of text cells:
//! - an in-memory `Table`
//! - a column mapping (`column -> cells`)
//! - a path to a delimited file (CSV with a header row)
//!
//! Loading also applies the row window and checks that every catalog column
//! is present, so a missing column stops the run before any cleaning.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::catalog::FieldCatalog;
use crate::models::Table;

/// Error during loading
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    /// Columns of a mapping source have different lengths
    #[error("Column '{column}' has {found} cells, expected {expected}")]
    RaggedColumns {
        column: String,
        found: usize,
        expected: usize,
    },

    /// Catalog fields absent from the source
    #[error("Source is missing catalog columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Result type for loading
pub type LoadResult<T> = Result<T, LoadError>;

/// A tabular source accepted by the importer
#[derive(Debug, Clone)]
pub enum TableSource {
    /// Already-built table
    Table(Table),
    /// Column name to cells, every column the same length
    Mapping(BTreeMap<String, Vec<Option<String>>>),
    /// Delimited file with a header row
    Path(PathBuf),
}

impl From<Table> for TableSource {
    fn from(table: Table) -> Self {
        TableSource::Table(table)
    }
}

impl From<PathBuf> for TableSource {
    fn from(path: PathBuf) -> Self {
        TableSource::Path(path)
    }
}

impl From<&Path> for TableSource {
    fn from(path: &Path) -> Self {
        TableSource::Path(path.to_path_buf())
    }
}

impl From<BTreeMap<String, Vec<Option<String>>>> for TableSource {
    fn from(mapping: BTreeMap<String, Vec<Option<String>>>) -> Self {
        TableSource::Mapping(mapping)
    }
}

impl TableSource {
    /// Resolve the source into a table
    pub fn into_table(self) -> LoadResult<Table> {
        match self {
            TableSource::Table(table) => Ok(table),
            TableSource::Mapping(mapping) => table_from_mapping(mapping),
            TableSource::Path(path) => read_csv_file(&path),
        }
    }
}

fn table_from_mapping(mapping: BTreeMap<String, Vec<Option<String>>>) -> LoadResult<Table> {
    let expected = mapping.values().map(Vec::len).max().unwrap_or(0);
    if let Some((column, cells)) = mapping.iter().find(|(_, cells)| cells.len() != expected) {
        return Err(LoadError::RaggedColumns {
            column: column.clone(),
            found: cells.len(),
            expected,
        });
    }

    let columns: Vec<String> = mapping.keys().cloned().collect();
    let mut iters: Vec<_> = mapping.into_values().map(Vec::into_iter).collect();
    let mut table = Table::new(columns);
    for _ in 0..expected {
        table.push_row(
            iters
                .iter_mut()
                .map(|cells| cells.next().flatten())
                .collect(),
        );
    }
    Ok(table)
}

/// Read CSV content; empty cells load as missing values.
pub fn read_csv<R: Read>(reader: R) -> LoadResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| LoadError::ParseError(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut table = Table::new(columns);
    for row in reader.records() {
        let row = row.map_err(|e| LoadError::ParseError(e.to_string()))?;
        table.push_row(
            row.iter()
                .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                .collect(),
        );
    }
    Ok(table)
}

/// Read a CSV file from disk.
pub fn read_csv_file(path: &Path) -> LoadResult<Table> {
    let file = std::fs::File::open(path)
        .map_err(|e| LoadError::IoError(format!("Failed to open {}: {}", path.display(), e)))?;
    read_csv(file)
}

/// Catalog columns absent from `table`, in catalog order
pub fn missing_columns(table: &Table, catalog: &FieldCatalog) -> Vec<String> {
    catalog
        .required_columns()
        .into_iter()
        .filter(|column| !table.has_column(column))
        .map(str::to_string)
        .collect()
}

/// Load a source, slice it to the row window and check catalog columns.
///
/// # Arguments
/// * `source` - Table, mapping or file path
/// * `catalog` - Field catalog the table must satisfy
/// * `start` - First row to keep
/// * `limit` - Number of rows to keep, 0 for all
pub fn load_table(
    source: TableSource,
    catalog: &FieldCatalog,
    start: usize,
    limit: usize,
) -> LoadResult<Table> {
    let mut table = source.into_table()?;
    let total = table.len();

    let missing = missing_columns(&table, catalog);
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns(missing));
    }

    if start > 0 || limit > 0 {
        table.window(start, limit);
        debug!(
            "Row window start={} limit={} of {} rows",
            start, limit, total
        );
    }
    info!(
        "Loaded {} rows ({} columns)",
        table.len(),
        table.columns().len()
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValue;
    use crate::transform::CoercionSettings;

    const CATALOG: &str = r#"
_id: {doc: care}
Name: {doc: patient, parent: care, primary: true}
Age: {doc: patient, parent: care, type: int}
"#;

    fn catalog() -> FieldCatalog {
        FieldCatalog::parse(CATALOG, &CoercionSettings::default()).unwrap()
    }

    #[test]
    fn test_read_csv_missing_cells() {
        let table = read_csv("Name,Age\nBob,30\nAlice,\n".as_bytes()).unwrap();
        assert_eq!(table.columns(), ["Name", "Age"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].get("Age"), &FieldValue::text("30"));
        assert_eq!(table.records()[1].get("Age"), &FieldValue::Missing);
    }

    #[test]
    fn test_load_with_window() {
        let csv = "Name,Age\na,1\nb,2\nc,3\nd,4\n";
        let table = read_csv(csv.as_bytes()).unwrap();
        let table = load_table(table.into(), &catalog(), 1, 2).unwrap();
        let names: Vec<String> = table
            .column_values("Name")
            .iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let table = read_csv("Name\nBob\n".as_bytes()).unwrap();
        let err = load_table(table.into(), &catalog(), 0, 0).unwrap_err();
        assert!(
            matches!(err, LoadError::MissingColumns(ref cols) if cols == &vec!["Age".to_string()])
        );
    }

    #[test]
    fn test_mapping_source() {
        let mut mapping = BTreeMap::new();
        mapping.insert(
            "Name".to_string(),
            vec![Some("Bob".to_string()), Some("Eve".to_string())],
        );
        mapping.insert("Age".to_string(), vec![Some("30".to_string()), None]);
        let table = load_table(mapping.into(), &catalog(), 0, 0).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[1].get("Name"), &FieldValue::text("Eve"));
        assert!(table.records()[1].get("Age").is_missing());
    }

    #[test]
    fn test_ragged_mapping() {
        let mut mapping = BTreeMap::new();
        mapping.insert("Name".to_string(), vec![Some("Bob".to_string())]);
        mapping.insert("Age".to_string(), Vec::new());
        assert!(matches!(
            TableSource::from(mapping).into_table(),
            Err(LoadError::RaggedColumns { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            TableSource::from(Path::new("/nonexistent/source.csv")).into_table(),
            Err(LoadError::IoError(_))
        ));
    }
}
