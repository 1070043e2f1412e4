//! Role and privilege definitions
//!
//! The roles document is authored by hand and may contain placeholders
//! such as `${dbname}`, substituted in every string of the tree before the
//! document is typed.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Placeholder replaced by the target database name.
pub const DBNAME_PLACEHOLDER: &str = "${dbname}";

/// Error loading the roles document
#[derive(Debug, thiserror::Error)]
pub enum RoleError {
    #[error("Failed to read roles document {path}: {message}")]
    ReadError { path: String, message: String },

    #[error("Failed to parse roles document: {0}")]
    ParseError(String),
}

/// Resource a privilege applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub db: String,
    /// Empty string means every collection of `db`
    #[serde(default)]
    pub collection: String,
}

/// Actions granted on a resource, e.g. `find`, `insert`, `update`, `remove`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Privilege {
    pub resource: Resource,
    #[serde(default)]
    pub actions: Vec<String>,
}

/// A role inherited by another role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InheritedRole {
    Name(String),
    Scoped { role: String, db: String },
}

impl InheritedRole {
    pub fn name(&self) -> &str {
        match self {
            InheritedRole::Name(name) => name,
            InheritedRole::Scoped { role, .. } => role,
        }
    }
}

/// One `createRole` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleSpec {
    #[serde(rename = "createRole")]
    pub name: String,
    #[serde(default)]
    pub privileges: Vec<Privilege>,
    #[serde(default)]
    pub roles: Vec<InheritedRole>,
}

#[derive(Debug, Deserialize)]
struct RolesDocument {
    #[serde(default)]
    roles: Vec<RoleSpec>,
}

/// Replace placeholders in every string of a YAML tree.
pub fn substitute_placeholders(value: &mut serde_yaml::Value, replacements: &[(&str, &str)]) {
    match value {
        serde_yaml::Value::String(s) => {
            for &(placeholder, replacement) in replacements {
                if s.contains(placeholder) {
                    *s = s.replace(placeholder, replacement);
                }
            }
        }
        serde_yaml::Value::Sequence(items) => {
            for item in items {
                substitute_placeholders(item, replacements);
            }
        }
        serde_yaml::Value::Mapping(map) => {
            for (_, item) in map.iter_mut() {
                substitute_placeholders(item, replacements);
            }
        }
        serde_yaml::Value::Tagged(tagged) => {
            substitute_placeholders(&mut tagged.value, replacements);
        }
        _ => {}
    }
}

/// Parse a roles document, substituting `${dbname}` with `database`.
pub fn parse_roles(content: &str, database: &str) -> Result<Vec<RoleSpec>, RoleError> {
    let mut tree: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| RoleError::ParseError(e.to_string()))?;
    substitute_placeholders(&mut tree, &[(DBNAME_PLACEHOLDER, database)]);
    let document: RolesDocument =
        serde_yaml::from_value(tree).map_err(|e| RoleError::ParseError(e.to_string()))?;
    Ok(document.roles)
}

/// Load a roles document from disk.
pub fn load_roles(path: &Path, database: &str) -> Result<Vec<RoleSpec>, RoleError> {
    let content = std::fs::read_to_string(path).map_err(|e| RoleError::ReadError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse_roles(&content, database)
}
