//! Row-oriented working table
//!
//! A `Table` is the in-memory working set of the pipeline: the loader fills
//! it with text cells, cleaning mutates cells in place and drops records,
//! deduplication drops more records, and assembly reads what survives.

use std::collections::BTreeMap;

use super::value::FieldValue;

static MISSING: FieldValue = FieldValue::Missing;

/// One source row, keyed by column name.
///
/// `index` is the row's position in the source as loaded; it never changes
/// when other records are dropped, so logs and duplicate resolution can
/// refer to the original order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    index: usize,
    values: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            values: BTreeMap::new(),
        }
    }

    /// Original load position of this record.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Value of a column; absent columns read as `Missing`.
    pub fn get(&self, column: &str) -> &FieldValue {
        self.values.get(column).unwrap_or(&MISSING)
    }

    pub fn set(&mut self, column: impl Into<String>, value: FieldValue) {
        self.values.insert(column.into(), value);
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(column, value.into());
        self
    }

    pub fn values(&self) -> &BTreeMap<String, FieldValue> {
        &self.values
    }
}

/// Ordered set of records sharing one column layout.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            records: Vec::new(),
        }
    }

    /// Build a table from text rows laid out like `columns`.
    ///
    /// Rows shorter than the header are padded with missing cells.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Append a row of raw cells, assigning the next load index.
    pub fn push_row(&mut self, cells: Vec<Option<String>>) {
        let mut record = Record::new(self.records.len());
        let mut cells = cells.into_iter();
        for column in &self.columns {
            let value = cells.next().flatten();
            record.set(column.clone(), FieldValue::from(value));
        }
        self.records.push(record);
    }

    pub fn push_record(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All values of one column, in record order.
    pub fn column_values(&self, column: &str) -> Vec<&FieldValue> {
        self.records.iter().map(|r| r.get(column)).collect()
    }

    /// Keep only records for which `keep` returns true; returns the removed records.
    pub fn retain_records<F>(&mut self, mut keep: F) -> Vec<Record>
    where
        F: FnMut(usize, &Record) -> bool,
    {
        let mut kept = Vec::with_capacity(self.records.len());
        let mut removed = Vec::new();
        for (position, record) in std::mem::take(&mut self.records).into_iter().enumerate() {
            if keep(position, &record) {
                kept.push(record);
            } else {
                removed.push(record);
            }
        }
        self.records = kept;
        removed
    }

    /// Slice the table to the `[start, start + limit)` row window.
    ///
    /// A `limit` of zero means "until the end".
    pub fn window(&mut self, start: usize, limit: usize) {
        let end = if limit == 0 {
            usize::MAX
        } else {
            start.saturating_add(limit)
        };
        self.retain_records(|position, _| position >= start && position < end);
    }

    /// Render a record in column order for log output.
    pub fn describe_record(&self, record: &Record) -> String {
        let cells: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{}={}", c, record.get(c)))
            .collect();
        format!("row {}: {{{}}}", record.index(), cells.join(", "))
    }
}
