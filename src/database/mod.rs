//! Document store abstraction
//!
//! The engine only needs a small contract from its store: upsert a document
//! by identifier, create a collection with a validator, list and drop
//! collections, create indexes and manage roles. Two backends implement it:
//! - `MemoryStore`: in-process, enforces validators, always available
//! - `PostgresStore`: one JSONB table per collection (feature `postgres-backend`)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(feature = "postgres-backend")]
pub mod postgres;

pub mod config;
pub mod memory;
pub mod roles;
pub mod schema;

#[cfg(feature = "postgres-backend")]
pub use self::postgres::PostgresStore;

pub use config::{DatabaseBackendType, DatabaseSection};
pub use memory::MemoryStore;
pub use roles::{RoleError, RoleSpec, load_roles, parse_roles};

use crate::models::Document;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to connect to the store
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A store command failed
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// Collection already exists
    #[error("Collection already exists: {0}")]
    CollectionExists(String),

    /// Document rejected by the collection validator
    #[error("Document {id} rejected by {collection} validator: {reason}")]
    ValidationFailed {
        collection: String,
        id: String,
        reason: String,
    },

    /// Credentials required by the backend are absent
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Backend not compiled in
    #[error("Backend not available: {0}")]
    BackendUnavailable(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<crate::validation::ValidationError> for StoreError {
    fn from(err: crate::validation::ValidationError) -> Self {
        StoreError::InvalidInput(err.to_string())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// What an upsert did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

impl std::fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpsertOutcome::Inserted => write!(f, "inserted"),
            UpsertOutcome::Updated => write!(f, "updated"),
        }
    }
}

/// Document store contract used by the engine
///
/// All operations are async so that network backends and the in-memory
/// backend share one interface.
#[async_trait(?Send)]
pub trait DocumentStore: Send + Sync {
    /// Replace the document with identifier `id`, inserting it when absent
    ///
    /// # Arguments
    /// * `collection` - Target collection
    /// * `id` - Document identifier
    /// * `document` - Full replacement document
    ///
    /// # Returns
    /// Whether the document was inserted or updated
    async fn replace_one(
        &self,
        collection: &str,
        id: &str,
        document: &Document,
    ) -> StoreResult<UpsertOutcome>;

    /// Create a collection guarded by a validator
    ///
    /// Fails with `StoreError::CollectionExists` when the collection exists.
    async fn create_collection(&self, name: &str, validator: &serde_json::Value)
    -> StoreResult<()>;

    /// Names of existing collections
    async fn list_collection_names(&self) -> StoreResult<Vec<String>>;

    /// Drop a collection and its documents; dropping a missing collection is not an error
    async fn drop_collection(&self, name: &str) -> StoreResult<()>;

    /// Create an index on a dotted path inside a collection's documents
    async fn create_index(&self, collection: &str, path: &str) -> StoreResult<()>;

    /// Create a role with its privileges
    async fn create_role(&self, role: &RoleSpec) -> StoreResult<()>;

    /// Drop every role of the target database
    async fn drop_all_roles(&self) -> StoreResult<()>;

    /// Backend type of this store
    fn backend_type(&self) -> DatabaseBackendType;
}

/// Connect to the backend selected by the configuration.
pub async fn connect(section: &DatabaseSection) -> StoreResult<Box<dyn DocumentStore>> {
    match section.backend {
        DatabaseBackendType::Memory => Ok(Box::new(MemoryStore::new())),
        #[cfg(feature = "postgres-backend")]
        DatabaseBackendType::Postgres => {
            let store = PostgresStore::connect(&section.connection_string()?).await?;
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "postgres-backend"))]
        DatabaseBackendType::Postgres => Err(StoreError::BackendUnavailable(
            "PostgreSQL support not enabled. Enable 'postgres-backend' feature.".to_string(),
        )),
    }
}
