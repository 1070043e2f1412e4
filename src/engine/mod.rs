//! Import orchestration
//!
//! `Engine` walks a run through `Idle -> Loaded -> Cleaned -> Deduplicated ->
//! Persisted`. Every transition checks the current stage, so steps cannot be
//! skipped or repeated. Trace-only runs stop at `Deduplicated`: documents
//! are assembled and logged but nothing reaches the store.

pub mod report;

pub use report::ImportReport;

use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::assembly::{AssembledDocument, DocumentAssembler};
use crate::catalog::{CatalogError, FieldCatalog};
use crate::config::{ConfigError, ImporterConfig};
use crate::database::{DocumentStore, RoleError, RoleSpec, StoreError, load_roles};
use crate::export::{StorageSchema, indexes_for};
use crate::import::{LoadError, TableSource, load_table};
use crate::models::Table;
use crate::transform::{clean_table, deduplicate};

/// Error type for a run
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Roles(#[from] RoleError),

    /// A step was called out of order
    #[error("Cannot {action} while {stage}")]
    InvalidStage { action: &'static str, stage: Stage },
}

/// Result type for a run
pub type EngineResult<T> = Result<T, EngineError>;

/// Position of a run in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Idle,
    Loaded,
    Cleaned,
    Deduplicated,
    Persisted,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Idle => write!(f, "idle"),
            Stage::Loaded => write!(f, "loaded"),
            Stage::Cleaned => write!(f, "cleaned"),
            Stage::Deduplicated => write!(f, "deduplicated"),
            Stage::Persisted => write!(f, "persisted"),
        }
    }
}

/// Import engine
///
/// Owns the configuration, the field catalog and the working table of one
/// run.
pub struct Engine {
    config: ImporterConfig,
    catalog: FieldCatalog,
    stage: Stage,
    table: Table,
    report: ImportReport,
    started: Instant,
}

impl Engine {
    /// Create an engine from a configuration and an already loaded catalog
    pub fn new(config: ImporterConfig, catalog: FieldCatalog) -> Self {
        Self {
            config,
            catalog,
            stage: Stage::Idle,
            table: Table::default(),
            report: ImportReport::new(),
            started: Instant::now(),
        }
    }

    /// Create an engine, loading the catalog named by the configuration
    pub fn from_config(config: ImporterConfig) -> EngineResult<Self> {
        let catalog = FieldCatalog::load(&config.paths.catalog, &config.coercion)?;
        Ok(Self::new(config, catalog))
    }

    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Working table at the current stage
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn report(&self) -> &ImportReport {
        &self.report
    }

    fn expect_stage(&self, expected: Stage, action: &'static str) -> EngineResult<()> {
        if self.stage != expected {
            return Err(EngineError::InvalidStage {
                action,
                stage: self.stage,
            });
        }
        Ok(())
    }

    /// Roles document named by the configuration, for the target database
    pub fn load_roles(&self) -> EngineResult<Vec<RoleSpec>> {
        Ok(load_roles(
            &self.config.paths.roles,
            &self.config.database.name,
        )?)
    }

    /// Load the source table and check it against the catalog
    pub fn load(&mut self, source: TableSource) -> EngineResult<()> {
        self.expect_stage(Stage::Idle, "load")?;
        self.table = load_table(
            source,
            &self.catalog,
            self.config.run.start,
            self.config.run.limit,
        )?;
        self.report.rows_loaded = self.table.len();
        self.stage = Stage::Loaded;
        Ok(())
    }

    /// Coerce and mask every data field
    pub fn clean(&mut self) -> EngineResult<()> {
        self.expect_stage(Stage::Loaded, "clean")?;
        let summary = clean_table(&mut self.table, &self.catalog, &self.config.coercion);
        self.report.coercion_failures = summary.coercion_failures;
        self.report.cells_replaced = summary.cells_replaced;
        self.report.rows_dropped = summary.rows_dropped;
        self.stage = Stage::Cleaned;
        Ok(())
    }

    /// Remove duplicate records, keeping the last of each group
    pub fn deduplicate(&mut self) -> EngineResult<()> {
        self.expect_stage(Stage::Cleaned, "deduplicate")?;
        self.report.duplicates_removed =
            deduplicate(&mut self.table, &self.catalog, &self.config.dedup);
        self.stage = Stage::Deduplicated;
        Ok(())
    }

    /// Documents for every surviving record
    pub fn assemble(&self) -> EngineResult<Vec<AssembledDocument>> {
        if self.stage < Stage::Deduplicated {
            return Err(EngineError::InvalidStage {
                action: "assemble",
                stage: self.stage,
            });
        }
        Ok(DocumentAssembler::new(&self.catalog).assemble_all(&self.table))
    }

    /// Prepare collections, indexes and roles
    ///
    /// With `clean_db` every top-level collection and every role is dropped
    /// first. Existing collections are left untouched; validators and
    /// indexes are only applied to collections created here. Index and role
    /// failures are logged and do not stop the run.
    pub async fn initialize_store(
        &mut self,
        store: &dyn DocumentStore,
        roles: &[RoleSpec],
    ) -> EngineResult<()> {
        if self.config.run.trace_only {
            info!("Trace-only run: store setup skipped");
            return Ok(());
        }

        let collections = self.catalog.top_level_containers();

        if self.config.run.clean_db {
            warn!("Cleaning database {}", self.config.database.name);
            for collection in &collections {
                store.drop_collection(collection).await?;
            }
            store.drop_all_roles().await?;
        }

        let schema = StorageSchema::derive(&self.catalog);
        let existing = store.list_collection_names().await?;

        for collection in collections {
            if existing.iter().any(|name| name == collection) {
                info!("Collection {} already exists", collection);
                continue;
            }
            let validator = schema
                .validators
                .get(collection)
                .cloned()
                .unwrap_or_default();
            match store.create_collection(collection, &validator).await {
                Ok(()) => {
                    info!("Created collection {}", collection);
                    self.report.collections_created += 1;
                }
                Err(StoreError::CollectionExists(_)) => {
                    info!("Collection {} already exists", collection);
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            for index in indexes_for(&schema.indexes, collection) {
                match store.create_index(collection, &index.path).await {
                    Ok(()) => {
                        debug!("Created index {}", index);
                        self.report.indexes_created += 1;
                    }
                    Err(e) => error!("Index {} not created: {}", index, e),
                }
            }
        }

        for role in roles {
            match store.create_role(role).await {
                Ok(()) => {
                    info!("Created role {}", role.name);
                    self.report.roles_created += 1;
                }
                Err(e) => error!("Role {} not created: {}", role.name, e),
            }
        }
        Ok(())
    }

    /// Upsert every assembled document
    ///
    /// A rejected document is logged and counted; the batch continues.
    pub async fn persist(&mut self, store: &dyn DocumentStore) -> EngineResult<()> {
        self.expect_stage(Stage::Deduplicated, "persist")?;
        let assembled = self.assemble()?;
        self.report.documents_assembled = assembled.len();

        if self.config.run.trace_only {
            for row in &assembled {
                info!("row {}: {}", row.record_index, row.to_json());
                self.report.skipped += row.documents.len();
            }
            info!(
                "Trace-only run: {} documents not sent to the store",
                self.report.skipped
            );
            return Ok(());
        }

        info!("Migrate {} records...", assembled.len());
        for row in &assembled {
            for root in &row.documents {
                match store
                    .replace_one(&root.collection, root.id(), &root.document)
                    .await
                {
                    Ok(outcome) => {
                        debug!("{} {} {}", root.collection, root.id(), outcome);
                        self.report.record_outcome(outcome);
                    }
                    Err(e) => {
                        error!(
                            "row {} ({}): {} not written: {}",
                            row.record_index, root.primary_key, root.collection, e
                        );
                        self.report.record_failure(format!(
                            "{}/{}: {}",
                            root.collection,
                            root.id(),
                            e
                        ));
                    }
                }
            }
        }
        self.stage = Stage::Persisted;
        Ok(())
    }

    /// Run every step against `store`
    ///
    /// # Arguments
    /// * `source` - Table, mapping or file path to import
    /// * `store` - Target document store
    /// * `roles` - Roles to create during setup
    ///
    /// # Returns
    /// The run report
    pub async fn run(
        &mut self,
        source: TableSource,
        store: &dyn DocumentStore,
        roles: &[RoleSpec],
    ) -> EngineResult<ImportReport> {
        info!("Run {} started", self.report.run_id);
        self.load(source)?;
        self.clean()?;
        self.deduplicate()?;
        self.initialize_store(store, roles).await?;
        self.persist(store).await?;
        Ok(self.finish())
    }

    /// Transform without a store and return the report
    pub fn check(&mut self, source: TableSource) -> EngineResult<ImportReport> {
        self.load(source)?;
        self.clean()?;
        self.deduplicate()?;
        self.report.documents_assembled = self.assemble()?.len();
        Ok(self.finish())
    }

    fn finish(&mut self) -> ImportReport {
        self.report.duration_ms = self.started.elapsed().as_millis() as u64;
        info!("{}", self.report);
        self.report.clone()
    }
}
