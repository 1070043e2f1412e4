//! Run report

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::UpsertOutcome;

/// Result of an import run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    /// Identifier of this run, repeated in the log
    pub run_id: Uuid,
    /// Rows in the window after loading
    pub rows_loaded: usize,
    /// Values that failed type coercion
    pub coercion_failures: usize,
    /// Cells overwritten by a replacement policy
    pub cells_replaced: usize,
    /// Rows removed by masking
    pub rows_dropped: usize,
    /// Rows removed by deduplication
    pub duplicates_removed: usize,
    /// Records turned into documents
    pub documents_assembled: usize,
    /// Collections created during setup
    pub collections_created: usize,
    /// Indexes created during setup
    pub indexes_created: usize,
    /// Roles created during setup
    pub roles_created: usize,
    /// Documents inserted
    pub inserted: usize,
    /// Documents replaced
    pub updated: usize,
    /// Documents the store rejected
    pub failed: usize,
    /// Documents not sent because the run is trace-only
    pub skipped: usize,
    /// Per-document failures, `collection/id: reason`
    pub errors: Vec<String>,
    /// Duration of the run in milliseconds
    pub duration_ms: u64,
}

impl ImportReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            rows_loaded: 0,
            coercion_failures: 0,
            cells_replaced: 0,
            rows_dropped: 0,
            duplicates_removed: 0,
            documents_assembled: 0,
            collections_created: 0,
            indexes_created: 0,
            roles_created: 0,
            inserted: 0,
            updated: 0,
            failed: 0,
            skipped: 0,
            errors: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Check if every document reached the store
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Documents written, inserted or updated
    pub fn total_written(&self) -> usize {
        self.inserted + self.updated
    }

    /// Rows that survived cleaning and deduplication
    pub fn rows_kept(&self) -> usize {
        self.rows_loaded
            .saturating_sub(self.rows_dropped)
            .saturating_sub(self.duplicates_removed)
    }

    pub(crate) fn record_outcome(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
        }
    }

    pub(crate) fn record_failure(&mut self, message: String) {
        self.failed += 1;
        self.errors.push(message);
    }
}

impl Default for ImportReport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ImportReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "run {}: {} loaded, {} dropped, {} duplicates, {} assembled, \
             {} inserted, {} updated, {} failed, {} skipped in {} ms",
            self.run_id,
            self.rows_loaded,
            self.rows_dropped,
            self.duplicates_removed,
            self.documents_assembled,
            self.inserted,
            self.updated,
            self.failed,
            self.skipped,
            self.duration_ms
        )
    }
}
