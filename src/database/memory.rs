//! In-memory document store
//!
//! Keeps collections, indexes and roles in process memory. Validators are
//! enforced on every write, so a run against this store exercises the same
//! constraints a real document database would apply.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::schema::validate_document;
use super::{DatabaseBackendType, DocumentStore, RoleSpec, StoreError, StoreResult, UpsertOutcome};
use crate::models::Document;
use crate::validation::{validate_collection_name, validate_index_path, validate_role_name};

#[derive(Debug, Default)]
struct MemoryCollection {
    validator: Value,
    indexes: Vec<String>,
    documents: BTreeMap<String, Document>,
}

#[derive(Debug, Default)]
struct MemoryState {
    collections: BTreeMap<String, MemoryCollection>,
    roles: BTreeMap<String, RoleSpec>,
}

/// In-process document store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| StoreError::CommandFailed(format!("Store lock poisoned: {}", e)))
    }

    /// Stored document, if any
    pub fn document(&self, collection: &str, id: &str) -> Option<Document> {
        let state = self.state().ok()?;
        state
            .collections
            .get(collection)?
            .documents
            .get(id)
            .cloned()
    }

    /// Identifiers stored in a collection, sorted
    pub fn document_ids(&self, collection: &str) -> Vec<String> {
        self.state()
            .ok()
            .and_then(|s| {
                s.collections
                    .get(collection)
                    .map(|c| c.documents.keys().cloned().collect())
            })
            .unwrap_or_default()
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: &str) -> usize {
        self.state()
            .ok()
            .and_then(|s| s.collections.get(collection).map(|c| c.documents.len()))
            .unwrap_or(0)
    }

    /// Index paths of a collection, in creation order
    pub fn indexes(&self, collection: &str) -> Vec<String> {
        self.state()
            .ok()
            .and_then(|s| s.collections.get(collection).map(|c| c.indexes.clone()))
            .unwrap_or_default()
    }

    /// Validator of a collection
    pub fn validator(&self, collection: &str) -> Option<Value> {
        let state = self.state().ok()?;
        state
            .collections
            .get(collection)
            .map(|c| c.validator.clone())
    }

    /// Names of the roles created so far
    pub fn role_names(&self) -> Vec<String> {
        self.state()
            .map(|s| s.roles.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait(?Send)]
impl DocumentStore for MemoryStore {
    async fn replace_one(
        &self,
        collection: &str,
        id: &str,
        document: &Document,
    ) -> StoreResult<UpsertOutcome> {
        let mut state = self.state()?;
        // writes to an unknown collection create it without a validator
        let target = state.collections.entry(collection.to_string()).or_default();

        validate_document(document, &target.validator).map_err(|reason| {
            StoreError::ValidationFailed {
                collection: collection.to_string(),
                id: id.to_string(),
                reason,
            }
        })?;

        match target.documents.insert(id.to_string(), document.clone()) {
            Some(_) => Ok(UpsertOutcome::Updated),
            None => Ok(UpsertOutcome::Inserted),
        }
    }

    async fn create_collection(&self, name: &str, validator: &Value) -> StoreResult<()> {
        validate_collection_name(name)?;
        let mut state = self.state()?;
        if state.collections.contains_key(name) {
            return Err(StoreError::CollectionExists(name.to_string()));
        }
        state.collections.insert(
            name.to_string(),
            MemoryCollection {
                validator: validator.clone(),
                ..Default::default()
            },
        );
        debug!("Created collection {}", name);
        Ok(())
    }

    async fn list_collection_names(&self) -> StoreResult<Vec<String>> {
        Ok(self.state()?.collections.keys().cloned().collect())
    }

    async fn drop_collection(&self, name: &str) -> StoreResult<()> {
        self.state()?.collections.remove(name);
        Ok(())
    }

    async fn create_index(&self, collection: &str, path: &str) -> StoreResult<()> {
        validate_index_path(path)?;
        let mut state = self.state()?;
        let target = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::CommandFailed(format!("No collection {}", collection)))?;
        if !target.indexes.iter().any(|i| i == path) {
            target.indexes.push(path.to_string());
        }
        Ok(())
    }

    async fn create_role(&self, role: &RoleSpec) -> StoreResult<()> {
        validate_role_name(&role.name)?;
        let mut state = self.state()?;
        if state.roles.contains_key(&role.name) {
            return Err(StoreError::CommandFailed(format!(
                "Role {} already exists",
                role.name
            )));
        }
        state.roles.insert(role.name.clone(), role.clone());
        Ok(())
    }

    async fn drop_all_roles(&self) -> StoreResult<()> {
        self.state()?.roles.clear();
        Ok(())
    }

    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::Memory
    }
}
