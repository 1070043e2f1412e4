//! PostgreSQL document store
//!
//! Each collection is a table of `(_id TEXT PRIMARY KEY, doc JSONB)`.
//! Validators live in a bookkeeping table and are enforced on write, indexes
//! are expression indexes over the JSONB path, and roles map to PostgreSQL
//! roles with table grants.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::schema::{StoreSchema, collection_queries, role_queries, validate_document};
use super::{DatabaseBackendType, DocumentStore, RoleSpec, StoreError, StoreResult, UpsertOutcome};
use crate::models::Document;
use crate::validation::{
    quote_identifier, validate_collection_name, validate_index_path, validate_role_name,
};

/// PostgreSQL-backed document store
pub struct PostgresStore {
    client: Arc<Mutex<tokio_postgres::Client>>,
    /// Validators already read from the bookkeeping table
    validators: Mutex<BTreeMap<String, Value>>,
}

fn command_failed(context: &str, e: tokio_postgres::Error) -> StoreError {
    StoreError::CommandFailed(format!("{}: {}", context, e))
}

/// Privilege keyword for a document-store action
fn sql_privilege(action: &str) -> Option<&'static str> {
    match action {
        "find" => Some("SELECT"),
        "insert" => Some("INSERT"),
        "update" => Some("UPDATE"),
        "remove" => Some("DELETE"),
        _ => None,
    }
}

fn index_name(collection: &str, path: &str) -> String {
    format!("{}_{}_idx", collection, path.replace('.', "_"))
}

/// `CREATE INDEX` statement over a dotted path of the `doc` column
fn index_statement(collection: &str, path: &str) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} ((doc #>> '{{{}}}'))",
        quote_identifier(&index_name(collection, path)),
        quote_identifier(collection),
        path.replace('.', ",")
    )
}

/// Statements creating a role and granting its privileges
fn role_statements(role: &RoleSpec) -> Vec<String> {
    let grantee = quote_identifier(&role.name);
    let mut statements = vec![format!("CREATE ROLE {} NOLOGIN", grantee)];

    for privilege in &role.privileges {
        let keywords: Vec<&str> = privilege
            .actions
            .iter()
            .filter_map(|action| {
                let keyword = sql_privilege(action);
                if keyword.is_none() {
                    warn!(
                        "Action '{}' of role {} has no equivalent",
                        action, role.name
                    );
                }
                keyword
            })
            .collect();
        if keywords.is_empty() {
            continue;
        }
        let target = if privilege.resource.collection.is_empty() {
            "ALL TABLES IN SCHEMA public".to_string()
        } else {
            format!("TABLE {}", quote_identifier(&privilege.resource.collection))
        };
        statements.push(format!(
            "GRANT {} ON {} TO {}",
            keywords.join(", "),
            target,
            grantee
        ));
    }

    for inherited in &role.roles {
        statements.push(format!(
            "GRANT {} TO {}",
            quote_identifier(inherited.name()),
            grantee
        ));
    }
    statements
}

impl PostgresStore {
    /// Connect and make sure the bookkeeping tables exist
    ///
    /// # Arguments
    /// * `connection_string` - PostgreSQL connection string
    pub async fn connect(connection_string: &str) -> StoreResult<Self> {
        let (client, connection) =
            tokio_postgres::connect(connection_string, tokio_postgres::NoTls)
                .await
                .map_err(|e| {
                    StoreError::ConnectionFailed(format!("Failed to connect to PostgreSQL: {}", e))
                })?;

        // Spawn connection handler
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {}", e);
            }
        });

        client
            .batch_execute(StoreSchema::create_bookkeeping_sql())
            .await
            .map_err(|e| command_failed("Failed to create bookkeeping tables", e))?;

        Ok(Self {
            client: Arc::new(Mutex::new(client)),
            validators: Mutex::new(BTreeMap::new()),
        })
    }

    async fn validator(&self, collection: &str) -> StoreResult<Value> {
        if let Some(validator) = self.validators.lock().await.get(collection) {
            return Ok(validator.clone());
        }
        let client = self.client.lock().await;
        let row = client
            .query_opt(collection_queries::SELECT_VALIDATOR, &[&collection])
            .await
            .map_err(|e| command_failed("Failed to read validator", e))?;
        let validator: Value = row.map(|r| r.get(0)).unwrap_or(Value::Null);
        self.validators
            .lock()
            .await
            .insert(collection.to_string(), validator.clone());
        Ok(validator)
    }
}

#[async_trait(?Send)]
impl DocumentStore for PostgresStore {
    async fn replace_one(
        &self,
        collection: &str,
        id: &str,
        document: &Document,
    ) -> StoreResult<UpsertOutcome> {
        validate_collection_name(collection)?;
        let validator = self.validator(collection).await?;
        validate_document(document, &validator).map_err(|reason| StoreError::ValidationFailed {
            collection: collection.to_string(),
            id: id.to_string(),
            reason,
        })?;

        let table = quote_identifier(collection);
        let client = self.client.lock().await;
        // writes to an unknown collection create it without a validator
        client
            .batch_execute(&format!(
                "CREATE TABLE IF NOT EXISTS {} (_id TEXT PRIMARY KEY, doc JSONB NOT NULL)",
                table
            ))
            .await
            .map_err(|e| command_failed("Failed to create collection table", e))?;

        let row = client
            .query_one(
                &format!(
                    "INSERT INTO {} (_id, doc) VALUES ($1, $2) \
                     ON CONFLICT (_id) DO UPDATE SET doc = EXCLUDED.doc \
                     RETURNING (xmax = 0) AS inserted",
                    table
                ),
                &[&id, &document.to_json()],
            )
            .await
            .map_err(|e| command_failed("Failed to upsert document", e))?;

        let inserted: bool = row.get(0);
        Ok(if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }

    async fn create_collection(&self, name: &str, validator: &Value) -> StoreResult<()> {
        validate_collection_name(name)?;
        let client = self.client.lock().await;
        let existing = client
            .query_opt(collection_queries::SELECT_VALIDATOR, &[&name])
            .await
            .map_err(|e| command_failed("Failed to read collections", e))?;
        if existing.is_some() {
            return Err(StoreError::CollectionExists(name.to_string()));
        }

        client
            .batch_execute(&format!(
                "CREATE TABLE IF NOT EXISTS {} (_id TEXT PRIMARY KEY, doc JSONB NOT NULL)",
                quote_identifier(name)
            ))
            .await
            .map_err(|e| command_failed("Failed to create collection table", e))?;
        client
            .execute(collection_queries::INSERT, &[&name, validator])
            .await
            .map_err(|e| command_failed("Failed to record collection", e))?;

        self.validators
            .lock()
            .await
            .insert(name.to_string(), validator.clone());
        debug!("Created collection {}", name);
        Ok(())
    }

    async fn list_collection_names(&self) -> StoreResult<Vec<String>> {
        let client = self.client.lock().await;
        let rows = client
            .query(collection_queries::SELECT_NAMES, &[])
            .await
            .map_err(|e| command_failed("Failed to list collections", e))?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn drop_collection(&self, name: &str) -> StoreResult<()> {
        validate_collection_name(name)?;
        let client = self.client.lock().await;
        client
            .batch_execute(&format!("DROP TABLE IF EXISTS {}", quote_identifier(name)))
            .await
            .map_err(|e| command_failed("Failed to drop collection", e))?;
        client
            .execute(collection_queries::DELETE, &[&name])
            .await
            .map_err(|e| command_failed("Failed to forget collection", e))?;
        self.validators.lock().await.remove(name);
        Ok(())
    }

    async fn create_index(&self, collection: &str, path: &str) -> StoreResult<()> {
        validate_collection_name(collection)?;
        validate_index_path(path)?;
        let client = self.client.lock().await;
        client
            .batch_execute(&index_statement(collection, path))
            .await
            .map_err(|e| command_failed("Failed to create index", e))
    }

    async fn create_role(&self, role: &RoleSpec) -> StoreResult<()> {
        validate_role_name(&role.name)?;
        let client = self.client.lock().await;
        // recorded first so a partially granted role is still dropped by clean runs
        client
            .execute(role_queries::INSERT, &[&role.name])
            .await
            .map_err(|e| command_failed("Failed to record role", e))?;
        for statement in role_statements(role) {
            client
                .batch_execute(&statement)
                .await
                .map_err(|e| command_failed(&format!("Role {}", role.name), e))?;
        }
        Ok(())
    }

    async fn drop_all_roles(&self) -> StoreResult<()> {
        let client = self.client.lock().await;
        let rows = client
            .query(role_queries::SELECT_NAMES, &[])
            .await
            .map_err(|e| command_failed("Failed to list roles", e))?;
        for row in rows {
            let name: String = row.get(0);
            let role = quote_identifier(&name);
            client
                .batch_execute(&format!(
                    "DROP OWNED BY {role}; DROP ROLE IF EXISTS {role}",
                    role = role
                ))
                .await
                .map_err(|e| command_failed(&format!("Failed to drop role {}", name), e))?;
        }
        client
            .execute(role_queries::DELETE_ALL, &[])
            .await
            .map_err(|e| command_failed("Failed to forget roles", e))?;
        Ok(())
    }

    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::Postgres
    }
}
