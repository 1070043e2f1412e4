//! Validation functionality
//!
//! Provides validation logic for:
//! - Per-field validation rules used by masking
//! - Container hierarchy checks (single parent, no cycles)
//! - Names that reach the document store

pub mod containers;
pub mod input;
pub mod rules;

pub use containers::{ContainerTree, ContainerValidationError, ROOT};
pub use input::{
    ValidationError, quote_identifier, validate_collection_name, validate_database_name,
    validate_index_path, validate_role_name,
};
pub use rules::{RawRule, ValidationRule};
