//! Duplicate removal
//!
//! Records sharing the same primary-key values are the same logical entity.
//! Only the last occurrence in load order survives.

use std::collections::HashMap;
use tracing::{info, warn};

use crate::catalog::FieldCatalog;
use crate::models::{FieldValue, Record, Table};

/// Default column used to order duplicate reports.
pub const DEFAULT_DISPLAY_FIELD: &str = "Name";

/// Deduplication settings (`[dedup]` section of the importer configuration)
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DedupSettings {
    /// Column used to sort duplicates in the log
    #[serde(default = "default_display_field")]
    pub display_field: String,
}

fn default_display_field() -> String {
    DEFAULT_DISPLAY_FIELD.to_string()
}

impl Default for DedupSettings {
    fn default() -> Self {
        Self {
            display_field: default_display_field(),
        }
    }
}

type DuplicateKey = Vec<Option<String>>;

fn duplicate_key(record: &Record, key_fields: &[&str]) -> DuplicateKey {
    key_fields
        .iter()
        .map(|name| match record.get(name) {
            FieldValue::Missing => None,
            value => Some(value.to_string()),
        })
        .collect()
}

/// Positions of the records superseded by a later record with the same key.
pub fn find_duplicates(table: &Table, key_fields: &[&str]) -> Vec<usize> {
    let keys: Vec<DuplicateKey> = table
        .records()
        .iter()
        .map(|r| duplicate_key(r, key_fields))
        .collect();

    let mut last_seen: HashMap<&DuplicateKey, usize> = HashMap::new();
    for (position, key) in keys.iter().enumerate() {
        last_seen.insert(key, position);
    }

    keys.iter()
        .enumerate()
        .filter(|(position, key)| last_seen.get(key) != Some(position))
        .map(|(position, _)| position)
        .collect()
}

/// Remove duplicates from the table, keyed on every primary-key member.
///
/// Returns the number of records removed.
pub fn deduplicate(table: &mut Table, catalog: &FieldCatalog, settings: &DedupSettings) -> usize {
    let key_fields = catalog.primary_key_field_names(None);
    let duplicates = find_duplicates(table, &key_fields);

    if duplicates.is_empty() {
        info!("No duplicate detected in the dataset.");
        return 0;
    }

    let mut reported: Vec<&Record> = duplicates.iter().map(|p| &table.records()[*p]).collect();
    reported.sort_by(|a, b| {
        let display = &settings.display_field;
        a.get(display)
            .to_string()
            .cmp(&b.get(display).to_string())
            .then(a.index().cmp(&b.index()))
    });
    warn!(
        "{} duplicates detected. Only latest is retained, suppressing following elements.",
        duplicates.len()
    );
    for record in reported {
        warn!("{}", table.describe_record(record));
    }

    let mut superseded = vec![false; table.len()];
    for position in &duplicates {
        superseded[*position] = true;
    }
    table
        .retain_records(|position, _| !superseded[position])
        .len()
}
