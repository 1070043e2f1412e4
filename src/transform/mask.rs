//! Validation masking
//!
//! For each data field, in catalog order, flag the records violating the
//! field's rule, then either overwrite the flagged cells or drop the records.
//! Each pass sees the table left by the previous one, so a record dropped
//! for one field is never examined for the next.

use tracing::{info, warn};

use crate::catalog::{FieldDefinition, ReplacementPolicy};
use crate::models::Table;

/// Outcome of masking one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaskOutcome {
    pub flagged: usize,
    pub replaced: usize,
    pub dropped: usize,
}

/// One flag per record, in record order.
pub fn compute_mask(table: &Table, field: &FieldDefinition) -> Vec<bool> {
    table
        .records()
        .iter()
        .map(|record| field.rule.is_violated(record.get(&field.name)))
        .collect()
}

/// Mask one column according to the field's replacement policy.
pub fn apply_mask(table: &mut Table, field: &FieldDefinition) -> MaskOutcome {
    let mask = compute_mask(table, field);
    let flagged = mask.iter().filter(|m| **m).count();

    if flagged == 0 {
        info!("No anomaly detected in column {}", field.name);
        return MaskOutcome::default();
    }

    warn!(
        "{} anomalies detected in column {} (rule: {})",
        flagged, field.name, field.rule
    );
    for (record, _) in table.records().iter().zip(&mask).filter(|(_, m)| **m) {
        warn!("{}", table.describe_record(record));
    }

    match &field.replacement {
        ReplacementPolicy::ReplaceWith(replacement) => {
            for (record, flag) in table.records_mut().iter_mut().zip(&mask) {
                if *flag {
                    record.set(field.name.clone(), replacement.clone());
                }
            }
            warn!(
                "{} values of column {} replaced with {}",
                flagged, field.name, replacement
            );
            MaskOutcome {
                flagged,
                replaced: flagged,
                dropped: 0,
            }
        }
        ReplacementPolicy::DropRow => {
            let removed = table.retain_records(|position, _| !mask[position]);
            warn!(
                "{} rows dropped because of column {}",
                removed.len(),
                field.name
            );
            MaskOutcome {
                flagged,
                replaced: 0,
                dropped: removed.len(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldCatalog;
    use crate::models::FieldValue;
    use crate::transform::coerce::{CoercionSettings, coerce_column};

    fn catalog(yaml: &str) -> FieldCatalog {
        FieldCatalog::parse(yaml, &CoercionSettings::default()).unwrap()
    }

    fn table(columns: &[&str], rows: &[&[Option<&str>]]) -> Table {
        Table::from_rows(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.map(str::to_string)).collect())
                .collect(),
        )
    }

    #[test]
    fn test_range_with_null_replacement() {
        let catalog = catalog(
            r#"
_id: {doc: care}
Age:
  doc: care
  type: int
  primary: true
  replace: null
  error_mask: {function: is_inrange, param: [1, 120]}
"#,
        );
        let field = catalog.get("Age").unwrap();
        let mut t = table(
            &["Age"],
            &[&[Some("62")], &[Some("0")], &[None], &[Some("761")]],
        );
        coerce_column(&mut t, field, &CoercionSettings::default());
        assert_eq!(
            t.column_values("Age"),
            vec![
                &FieldValue::Integer(62),
                &FieldValue::Integer(0),
                &FieldValue::Missing,
                &FieldValue::Integer(761)
            ]
        );

        let outcome = apply_mask(&mut t, field);
        assert_eq!(outcome.flagged, 3);
        assert_eq!(outcome.replaced, 3);
        assert_eq!(t.len(), 4);
        assert_eq!(
            t.column_values("Age"),
            vec![
                &FieldValue::Integer(62),
                &FieldValue::Missing,
                &FieldValue::Missing,
                &FieldValue::Missing
            ]
        );
    }

    #[test]
    fn test_set_membership_drops_rows() {
        let catalog = catalog(
            r#"
_id: {doc: care}
Gender:
  doc: care
  primary: true
  error_mask: {function: is_in, param: [Male, Female]}
"#,
        );
        let field = catalog.get("Gender").unwrap();
        let mut t = table(
            &["Gender"],
            &[
                &[Some("Male")],
                &[Some("Unknown")],
                &[None],
                &[Some("Female")],
            ],
        );
        let outcome = apply_mask(&mut t, field);
        assert_eq!(outcome.dropped, 2);
        let kept: Vec<usize> = t.records().iter().map(|r| r.index()).collect();
        assert_eq!(kept, vec![0, 3]);
        assert!(compute_mask(&t, field).iter().all(|m| !m));
    }

    #[test]
    fn test_literal_replacement_keeps_row() {
        let catalog = catalog(
            r#"
_id: {doc: care}
Gender:
  doc: care
  primary: true
  replace: Other
  error_mask: {function: is_in, param: [Male, Female]}
"#,
        );
        let field = catalog.get("Gender").unwrap();
        let mut t = table(&["Gender"], &[&[Some("Unknown")]]);
        apply_mask(&mut t, field);
        assert_eq!(t.len(), 1);
        assert_eq!(t.records()[0].get("Gender"), &FieldValue::text("Other"));
    }

    #[test]
    fn test_passes_run_on_shrunk_table() {
        let catalog = catalog(
            r#"
_id: {doc: care}
Name:
  doc: care
  primary: true
Age:
  doc: care
  type: int
  replace: 0
"#,
        );
        let mut t = table(
            &["Name", "Age"],
            &[
                &[None, None],
                &[Some("Ann"), None],
                &[Some("Bob"), Some("40")],
            ],
        );
        coerce_column(
            &mut t,
            catalog.get("Age").unwrap(),
            &CoercionSettings::default(),
        );
        let outcomes: Vec<MaskOutcome> = catalog
            .data_fields()
            .map(|field| apply_mask(&mut t, field))
            .collect();
        assert_eq!(outcomes[0].dropped, 1);
        // row 0 was dropped for Name before Age was examined
        assert_eq!(outcomes[1].replaced, 1);
        assert_eq!(t.records()[0].get("Age"), &FieldValue::Integer(0));
    }
}
