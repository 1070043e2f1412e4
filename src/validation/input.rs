//! Input validation for names that reach the document store.
//!
//! Collection, role and database names come from hand-written catalog and
//! roles documents and end up in store commands (and, for the PostgreSQL
//! backend, in SQL identifiers), so they are checked before use.

use thiserror::Error;

/// Maximum length for collection, role and database names
pub const MAX_NAME_LENGTH: usize = 63;

/// Errors that can occur during input validation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// Input is empty when a value is required
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    /// Input exceeds maximum allowed length
    #[error("{field} exceeds maximum length (max: {max}, got: {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    /// Input contains invalid characters
    #[error("{field} contains invalid characters: {reason}")]
    InvalidCharacters { field: &'static str, reason: String },

    /// Input has invalid format
    #[error("{0}: {1}")]
    InvalidFormat(&'static str, String),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn validate_name(field: &'static str, name: &str, extra: &[char]) -> ValidationResult<()> {
    let Some(first_char) = name.chars().next() else {
        return Err(ValidationError::Empty(field));
    };

    if name.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field,
            max: MAX_NAME_LENGTH,
            actual: name.len(),
        });
    }

    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(ValidationError::InvalidFormat(
            field,
            "must start with a letter or underscore".to_string(),
        ));
    }

    for c in name.chars() {
        if !c.is_ascii_alphanumeric() && c != '_' && !extra.contains(&c) {
            return Err(ValidationError::InvalidCharacters {
                field,
                reason: format!("invalid character: '{}'", c),
            });
        }
    }

    Ok(())
}

/// Validate a collection (top-level document) name.
///
/// # Examples
///
/// ```
/// use care_import::validation::input::validate_collection_name;
///
/// assert!(validate_collection_name("care").is_ok());
/// assert!(validate_collection_name("patient_visits").is_ok());
/// assert!(validate_collection_name("").is_err());
/// assert!(validate_collection_name("1care").is_err());
/// ```
pub fn validate_collection_name(name: &str) -> ValidationResult<()> {
    validate_name("collection name", name, &[])
}

/// Validate a role name; hyphens are allowed.
pub fn validate_role_name(name: &str) -> ValidationResult<()> {
    validate_name("role name", name, &['-'])
}

/// Validate a database name.
pub fn validate_database_name(name: &str) -> ValidationResult<()> {
    validate_name("database name", name, &[])
}

/// Validate a dotted index path such as `patient.name`.
pub fn validate_index_path(path: &str) -> ValidationResult<()> {
    if path.is_empty() {
        return Err(ValidationError::Empty("index path"));
    }
    for segment in path.split('.') {
        if segment.is_empty() {
            return Err(ValidationError::InvalidFormat(
                "index path",
                format!("empty segment in '{}'", path),
            ));
        }
        if segment.contains(['\'', '"', '{', '}', ',', '\\']) {
            return Err(ValidationError::InvalidCharacters {
                field: "index path",
                reason: format!("segment '{}'", segment),
            });
        }
    }
    Ok(())
}

/// Quote an identifier for PostgreSQL.
///
/// # Examples
///
/// ```
/// use care_import::validation::input::quote_identifier;
///
/// assert_eq!(quote_identifier("care"), "\"care\"");
/// assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
/// ```
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
