//! Transformation stages applied to the working table
//!
//! - `coerce`: raw text to typed values
//! - `mask`: validation rules with replace-or-drop policies
//! - `dedup`: keep-last duplicate removal on primary-key values

pub mod coerce;
pub mod dedup;
pub mod mask;

pub use coerce::{CoercionSettings, coerce_column, coerce_value};
pub use dedup::{DedupSettings, deduplicate};
pub use mask::{MaskOutcome, apply_mask, compute_mask};

use tracing::info;

use crate::catalog::FieldCatalog;
use crate::models::Table;

/// Totals of a cleaning pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleanSummary {
    pub coercion_failures: usize,
    pub cells_replaced: usize,
    pub rows_dropped: usize,
}

/// Coerce then mask each data field, one field at a time, in catalog order.
pub fn clean_table(
    table: &mut Table,
    catalog: &FieldCatalog,
    settings: &CoercionSettings,
) -> CleanSummary {
    info!("Clean data before migration...");
    let mut summary = CleanSummary::default();
    for field in catalog.data_fields() {
        summary.coercion_failures += coerce_column(table, field, settings);
        let outcome = apply_mask(table, field);
        summary.cells_replaced += outcome.replaced;
        summary.rows_dropped += outcome.dropped;
    }
    info!(
        "Cleaning complete: {} rows kept, {} dropped, {} values replaced",
        table.len(),
        summary.rows_dropped,
        summary.cells_replaced
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValue;

    #[test]
    fn test_clean_table_drops_unparsable_dates() {
        let catalog = FieldCatalog::parse(
            r#"
_id: {doc: care}
Date of Admission: {doc: care, type: date, primary: true}
"#,
            &CoercionSettings::default(),
        )
        .unwrap();
        let mut table = Table::from_rows(
            vec!["Date of Admission".to_string()],
            ["2022-09-22", "22-09-22", "45581", "2022-19-19"]
                .iter()
                .map(|d| vec![Some(d.to_string())])
                .collect(),
        );
        let summary = clean_table(&mut table, &catalog, &CoercionSettings::default());
        assert_eq!(summary.coercion_failures, 3);
        assert_eq!(summary.rows_dropped, 3);
        assert_eq!(table.len(), 1);
        assert!(matches!(
            table.records()[0].get("Date of Admission"),
            FieldValue::Date(_)
        ));
    }
}
