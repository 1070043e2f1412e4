//! Database connection settings
//!
//! Handles the `[database]` section of the importer configuration and its
//! environment variable overrides. Credentials never come from the file.

use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize};

use super::{StoreError, StoreResult};

/// Environment variable for database backend
pub const ENV_DB_BACKEND: &str = "CARE_IMPORT_DB_BACKEND";

/// Environment variable for the target database name
pub const ENV_DB_NAME: &str = "CARE_IMPORT_DB_NAME";

/// Environment variable for the database host
pub const ENV_DB_HOST: &str = "CARE_IMPORT_DB_HOST";

/// Environment variable for the database port
pub const ENV_DB_PORT: &str = "CARE_IMPORT_DB_PORT";

/// Environment variable for the database user
pub const ENV_DB_USERNAME: &str = "CARE_IMPORT_DB_USERNAME";

/// Environment variable for the database password
pub const ENV_DB_PASSWORD: &str = "CARE_IMPORT_DB_PASSWORD";

/// Default database name, also the default production name
pub const DEFAULT_DATABASE_NAME: &str = "healthcare";

/// Database backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackendType {
    /// In-process store (default)
    #[default]
    Memory,
    /// PostgreSQL database
    Postgres,
}

impl std::str::FromStr for DatabaseBackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(DatabaseBackendType::Memory),
            "postgres" | "postgresql" => Ok(DatabaseBackendType::Postgres),
            _ => Err(format!(
                "Unknown database backend: {}. Use 'memory' or 'postgres'.",
                s
            )),
        }
    }
}

impl std::fmt::Display for DatabaseBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseBackendType::Memory => write!(f, "memory"),
            DatabaseBackendType::Postgres => write!(f, "postgres"),
        }
    }
}

/// Database configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// Database backend type
    #[serde(default)]
    pub backend: DatabaseBackendType,

    /// Target database name
    #[serde(default = "default_name")]
    pub name: String,

    /// Name of the production database, protected from destructive runs
    #[serde(default = "default_name")]
    pub production_name: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Database user (environment only)
    #[serde(skip)]
    pub username: Option<String>,

    /// Database password (environment only)
    #[serde(skip)]
    pub password: Option<SecretString>,
}

fn default_name() -> String {
    DEFAULT_DATABASE_NAME.to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            backend: DatabaseBackendType::default(),
            name: default_name(),
            production_name: default_name(),
            host: default_host(),
            port: default_port(),
            username: None,
            password: None,
        }
    }
}

impl DatabaseSection {
    /// Apply overrides read through `lookup` (normally `std::env::var`)
    pub fn apply_overrides<F>(&mut self, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Backend type
        if let Some(backend) = lookup(ENV_DB_BACKEND)
            && let Ok(backend_type) = backend.parse()
        {
            self.backend = backend_type;
        }

        if let Some(name) = lookup(ENV_DB_NAME) {
            self.name = name;
        }

        if let Some(host) = lookup(ENV_DB_HOST) {
            self.host = host;
        }

        if let Some(port) = lookup(ENV_DB_PORT)
            && let Ok(port) = port.parse()
        {
            self.port = port;
        }

        if let Some(username) = lookup(ENV_DB_USERNAME) {
            self.username = Some(username);
        }

        if let Some(password) = lookup(ENV_DB_PASSWORD) {
            self.password = Some(SecretString::from(password));
        }
    }

    /// Whether the backend needs a username and password
    pub fn requires_credentials(&self) -> bool {
        self.backend == DatabaseBackendType::Postgres
    }

    /// Fail when the backend needs credentials that are absent
    pub fn check_credentials(&self) -> StoreResult<()> {
        if !self.requires_credentials() {
            return Ok(());
        }
        match (&self.username, &self.password) {
            (Some(user), Some(password))
                if !user.is_empty() && !password.expose_secret().is_empty() =>
            {
                Ok(())
            }
            _ => Err(StoreError::MissingCredentials(format!(
                "set {} and {}",
                ENV_DB_USERNAME, ENV_DB_PASSWORD
            ))),
        }
    }

    /// PostgreSQL connection string
    pub fn connection_string(&self) -> StoreResult<String> {
        self.check_credentials()?;
        let user = self.username.as_deref().unwrap_or_default();
        let password = self
            .password
            .as_ref()
            .map(|p| p.expose_secret().to_owned())
            .unwrap_or_default();
        Ok(format!(
            "postgresql://{}:{}@{}:{}/{}",
            user, password, self.host, self.port, self.name
        ))
    }

    /// Connection target for logs, without credentials
    pub fn describe(&self) -> String {
        match self.backend {
            DatabaseBackendType::Memory => format!("memory://{}", self.name),
            DatabaseBackendType::Postgres => format!(
                "postgresql://{}:****@{}:{}/{}",
                self.username.as_deref().unwrap_or_default(),
                self.host,
                self.port,
                self.name
            ),
        }
    }
}
