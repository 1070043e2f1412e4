//! Importer configuration file support
//!
//! Handles parsing of `importer.toml`, environment variable overrides and
//! the production guard. The resulting `ImporterConfig` is built once and
//! passed to the engine by reference.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::database::DatabaseSection;
use crate::transform::{CoercionSettings, DedupSettings};
use crate::validation::input::{ValidationError, validate_database_name};

/// Default configuration filename
pub const CONFIG_FILENAME: &str = "importer.toml";

/// Environment variable for the first row of the window
pub const ENV_START: &str = "CARE_IMPORT_START";

/// Environment variable for the row window size
pub const ENV_LIMIT: &str = "CARE_IMPORT_LIMIT";

/// Environment variable enabling trace-only runs
pub const ENV_TRACE_ONLY: &str = "CARE_IMPORT_TRACE_ONLY";

/// Environment variable enabling the destructive reset
pub const ENV_CLEAN_DB: &str = "CARE_IMPORT_CLEAN_DB";

/// Environment variable enabling production mode
pub const ENV_PRODUCTION: &str = "CARE_IMPORT_PRODUCTION";

/// Environment variable enabling debug logging
pub const ENV_DEBUG: &str = "CARE_IMPORT_DEBUG";

/// Prefix given to the database name outside production mode
pub const TEST_DATABASE_PREFIX: &str = "test";

/// Error type for configuration handling
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Destructive operation aimed at the production database
    #[error("Refusing to reset production database '{0}'")]
    ProductionGuard(String),

    #[error("Invalid database name: {0}")]
    InvalidDatabaseName(#[from] ValidationError),
}

/// Result type for configuration handling
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Run flags (`[run]` section)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSection {
    /// First source row to import
    #[serde(default)]
    pub start: usize,

    /// Number of rows to import; 0 imports everything after `start`
    #[serde(default)]
    pub limit: usize,

    /// Transform and log, but send nothing to the store
    #[serde(default)]
    pub trace_only: bool,

    /// Drop collections and roles before setup
    #[serde(default)]
    pub clean_db: bool,

    /// Target the production database
    #[serde(default)]
    pub production: bool,
}

/// Input and output locations (`[paths]` section)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_catalog_path")]
    pub catalog: PathBuf,

    #[serde(default = "default_roles_path")]
    pub roles: PathBuf,

    #[serde(default = "default_source_path")]
    pub source: PathBuf,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/fields_settings.yml")
}

fn default_roles_path() -> PathBuf {
    PathBuf::from("data/roles.yml")
}

fn default_source_path() -> PathBuf {
    PathBuf::from("data/healthcare_dataset.csv")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            catalog: default_catalog_path(),
            roles: default_roles_path(),
            source: default_source_path(),
            log_dir: default_log_dir(),
        }
    }
}

/// Main configuration structure
///
/// Represents the `importer.toml` configuration file format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImporterConfig {
    #[serde(default)]
    pub database: DatabaseSection,

    #[serde(default)]
    pub run: RunSection,

    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub coercion: CoercionSettings,

    #[serde(default)]
    pub dedup: DedupSettings,

    /// Debug logging (environment or command line only)
    #[serde(skip)]
    pub debug: bool,
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

impl ImporterConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    ///
    /// Falls back to defaults when `path` is `None` or the file does not
    /// exist. Environment overrides are applied in both cases.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| ConfigError::IoError(format!("Failed to read config: {}", e)))?;
                Self::parse(&content)?
            }
            Some(path) => {
                warn!(
                    "Configuration file {} not found, using defaults",
                    path.display()
                );
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| {
            ConfigError::SerializationError(format!("Failed to serialize config: {}", e))
        })
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(&|key| std::env::var(key).ok());
    }

    /// Apply overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.database.apply_overrides(lookup);

        if let Some(start) = lookup(ENV_START)
            && let Ok(start) = start.trim().parse()
        {
            self.run.start = start;
        }

        if let Some(limit) = lookup(ENV_LIMIT)
            && let Ok(limit) = limit.trim().parse()
        {
            self.run.limit = limit;
        }

        if let Some(value) = lookup(ENV_TRACE_ONLY) {
            self.run.trace_only = parse_flag(&value);
        }
        if let Some(value) = lookup(ENV_CLEAN_DB) {
            self.run.clean_db = parse_flag(&value);
        }
        if let Some(value) = lookup(ENV_PRODUCTION) {
            self.run.production = parse_flag(&value);
        }
        if let Some(value) = lookup(ENV_DEBUG) {
            self.debug = parse_flag(&value);
        }
    }

    /// Settle the target database and run flags for production safety
    ///
    /// Outside production mode the production database name is swapped for
    /// its `test` twin. In production mode trace-only is switched off and a
    /// reset request is refused.
    pub fn apply_production_guard(&mut self) -> ConfigResult<()> {
        validate_database_name(&self.database.name)?;
        if !self.run.production {
            if self.database.name == self.database.production_name {
                self.database.name = format!("{}{}", TEST_DATABASE_PREFIX, self.database.name);
                info!("Test mode: targeting database {}", self.database.name);
            }
            return Ok(());
        }

        if self.run.trace_only {
            warn!("Production mode: trace-only is disabled");
            self.run.trace_only = false;
        }
        if self.run.clean_db {
            return Err(ConfigError::ProductionGuard(self.database.name.clone()));
        }
        Ok(())
    }
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# care-import configuration
# Every value can be overridden with a CARE_IMPORT_* environment variable.
# Database credentials are read from CARE_IMPORT_DB_USERNAME and
# CARE_IMPORT_DB_PASSWORD only.

[database]
# Store backend: "memory" (default) or "postgres"
backend = "memory"
name = "healthcare"
# Outside production mode this name is replaced by "test<name>"
production_name = "healthcare"
host = "localhost"
port = 5432

[run]
start = 0
# 0 imports every row after start
limit = 0
trace_only = false
clean_db = false
production = false

[paths]
catalog = "data/fields_settings.yml"
roles = "data/roles.yml"
source = "data/healthcare_dataset.csv"
log_dir = "logs"

[coercion]
date_format = "%Y-%m-%d"
float_decimals = 2

[dedup]
display_field = "Name"
"#
}
