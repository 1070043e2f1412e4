//! Field catalog
//!
//! The catalog is the single declarative source driving the whole pipeline:
//! coercion, masking, deduplication keys, identifier hashing, document
//! placement, validators and indexes are all derived from it. It is loaded
//! once at startup and never mutated afterwards.

pub mod field;
pub mod naming;

pub use field::{FieldDefinition, RawField, RawPrimary, ReplacementPolicy};
pub use naming::{IDENTIFIER_PREFIX, is_identifier_name, target_name};

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

use crate::models::ValueType;
use crate::transform::coerce::CoercionSettings;
use crate::validation::containers::{ContainerTree, ContainerValidationError};

/// Error loading the field catalog. Every variant is fatal at boot.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {message}")]
    ReadError { path: String, message: String },

    #[error("Failed to parse catalog: {0}")]
    ParseError(String),

    #[error("Invalid definition for field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error(transparent)]
    Containers(#[from] ContainerValidationError),

    #[error("Fields '{first}' and '{second}' both map to '{target}' in container '{container}'")]
    DuplicateTarget {
        container: String,
        target: String,
        first: String,
        second: String,
    },

    #[error("Field '{field}' maps to '{target}', which is a sub-container of '{container}'")]
    TargetShadowsContainer {
        container: String,
        target: String,
        field: String,
    },

    #[error("Document '{0}' has no identifier field")]
    MissingIdentifier(String),

    #[error("Document '{container}' has two identifier fields: '{first}' and '{second}'")]
    DuplicateIdentifier {
        container: String,
        first: String,
        second: String,
    },

    #[error("Identifier field '{field}' must belong to a top-level document, not '{container}'")]
    IdentifierNotInRoot { field: String, container: String },

    #[error("Field '{field}' is scoped to '{scope}', which is not a top-level document")]
    InvalidScope { field: String, scope: String },

    #[error("Identifier of document '{0}' has no primary key fields")]
    EmptyPrimaryKey(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Validated, immutable set of field definitions in catalog order.
#[derive(Debug, Clone)]
pub struct FieldCatalog {
    fields: Vec<FieldDefinition>,
    containers: ContainerTree,
}

impl FieldCatalog {
    /// Load the catalog from a YAML file.
    pub fn load(path: &Path, settings: &CoercionSettings) -> CatalogResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::ReadError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let catalog = Self::parse(&content, settings)?;
        info!(
            "Loaded {} field definitions from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Parse the catalog from a YAML string.
    pub fn parse(content: &str, settings: &CoercionSettings) -> CatalogResult<Self> {
        let mapping: serde_yaml::Mapping =
            serde_yaml::from_str(content).map_err(|e| CatalogError::ParseError(e.to_string()))?;

        let mut raw_fields: Vec<(String, RawField)> = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let name = match key {
                serde_yaml::Value::String(s) => s,
                other => {
                    return Err(CatalogError::ParseError(format!(
                        "field names must be strings, found {:?}",
                        other
                    )));
                }
            };
            let raw: RawField =
                serde_yaml::from_value(value).map_err(|e| CatalogError::InvalidField {
                    field: name.clone(),
                    message: e.to_string(),
                })?;
            raw_fields.push((name, raw));
        }

        let containers = ContainerTree::build(
            raw_fields
                .iter()
                .map(|(_, raw)| (raw.doc.as_str(), raw.parent.as_str())),
        )?;

        let mut fields = Vec::with_capacity(raw_fields.len());
        for (name, raw) in &raw_fields {
            let scope = resolve_scope(name, raw, &containers)?;
            let field =
                FieldDefinition::from_raw(name, raw, scope, settings).map_err(|message| {
                    CatalogError::InvalidField {
                        field: name.clone(),
                        message,
                    }
                })?;
            fields.push(field);
        }

        let catalog = Self { fields, containers };
        catalog.check_identifiers()?;
        catalog.check_targets()?;
        debug!(
            "Catalog containers: {}",
            catalog.containers.containers().join(", ")
        );
        Ok(catalog)
    }

    fn check_targets(&self) -> CatalogResult<()> {
        let mut seen: BTreeMap<(&str, &str), &str> = BTreeMap::new();
        for field in &self.fields {
            let key = (field.container.as_str(), field.target_name.as_str());
            if let Some(first) = seen.insert(key, field.name.as_str()) {
                return Err(CatalogError::DuplicateTarget {
                    container: field.container.clone(),
                    target: field.target_name.clone(),
                    first: first.to_string(),
                    second: field.name.clone(),
                });
            }
            if self
                .containers
                .children(&field.container)
                .contains(&field.target_name.as_str())
            {
                return Err(CatalogError::TargetShadowsContainer {
                    container: field.container.clone(),
                    target: field.target_name.clone(),
                    field: field.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_identifiers(&self) -> CatalogResult<()> {
        let mut identifiers: BTreeMap<&str, &str> = BTreeMap::new();
        for field in self.fields.iter().filter(|f| f.is_identifier()) {
            if let Some(first) = identifiers.insert(field.container.as_str(), field.name.as_str()) {
                return Err(CatalogError::DuplicateIdentifier {
                    container: field.container.clone(),
                    first: first.to_string(),
                    second: field.name.clone(),
                });
            }
        }

        for root in self.top_level_containers() {
            if !identifiers.contains_key(root) {
                return Err(CatalogError::MissingIdentifier(root.to_string()));
            }
            if self.primary_key_field_names(Some(root)).is_empty() {
                return Err(CatalogError::EmptyPrimaryKey(root.to_string()));
            }
        }
        Ok(())
    }

    /// All definitions in catalog order.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields backed by a source column (everything but identifiers).
    pub fn data_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| !f.is_identifier())
    }

    pub fn identifier_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| f.is_identifier())
    }

    /// Identifier field of a top-level document.
    pub fn identifier_for(&self, root: &str) -> Option<&FieldDefinition> {
        self.identifier_fields().find(|f| f.container == root)
    }

    pub fn fields_requiring_index(&self) -> Vec<&FieldDefinition> {
        self.fields.iter().filter(|f| f.is_indexed).collect()
    }

    pub fn fields_requiring_type(&self, value_type: ValueType) -> Vec<&FieldDefinition> {
        self.data_fields()
            .filter(|f| f.value_type == value_type)
            .collect()
    }

    /// Names of the primary-key members, in catalog order.
    ///
    /// With a scope, only members feeding that document's identifier; without
    /// one, every member of every scope.
    pub fn primary_key_field_names(&self, scope: Option<&str>) -> Vec<&str> {
        self.data_fields()
            .filter(|f| match (scope, f.primary_key.as_deref()) {
                (_, None) => false,
                (None, Some(_)) => true,
                (Some(wanted), Some(actual)) => wanted == actual,
            })
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Top-level documents, one collection each, in declaration order.
    pub fn top_level_containers(&self) -> Vec<&str> {
        self.containers.top_level()
    }

    /// Container chain from the top-level document down to `container`.
    pub fn container_path(&self, container: &str) -> Vec<&str> {
        self.containers.path(container)
    }

    pub fn containers(&self) -> &ContainerTree {
        &self.containers
    }

    /// Source columns every input table must provide.
    pub fn required_columns(&self) -> Vec<&str> {
        self.data_fields().map(|f| f.name.as_str()).collect()
    }

    /// Fields placed under a top-level document, in catalog order.
    pub fn fields_of_document<'a>(
        &'a self,
        root: &'a str,
    ) -> impl Iterator<Item = &'a FieldDefinition> + 'a {
        self.fields
            .iter()
            .filter(move |f| self.containers.root_of(&f.container) == Some(root))
    }
}

/// Resolve the `primary` attribute of a field to a top-level document name.
fn resolve_scope(
    name: &str,
    raw: &RawField,
    containers: &ContainerTree,
) -> CatalogResult<Option<String>> {
    let top_level: HashSet<&str> = containers.top_level().into_iter().collect();

    if is_identifier_name(name) {
        if !top_level.contains(raw.doc.as_str()) {
            return Err(CatalogError::IdentifierNotInRoot {
                field: name.to_string(),
                container: raw.doc.clone(),
            });
        }
        if let RawPrimary::Scope(scope) = &raw.primary
            && scope != &raw.doc
        {
            return Err(CatalogError::InvalidScope {
                field: name.to_string(),
                scope: scope.clone(),
            });
        }
        return Ok(Some(raw.doc.clone()));
    }

    match &raw.primary {
        RawPrimary::Flag(false) => Ok(None),
        RawPrimary::Flag(true) => Ok(containers.root_of(&raw.doc).map(str::to_string)),
        RawPrimary::Scope(scope) if top_level.contains(scope.as_str()) => Ok(Some(scope.clone())),
        RawPrimary::Scope(scope) => Err(CatalogError::InvalidScope {
            field: name.to_string(),
            scope: scope.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
_id:
  doc: care
  primary: care
Name:
  doc: patient
  parent: care
  primary: care
  index: true
Age:
  doc: patient
  parent: care
  type: int
  replace: null
  error_mask:
    function: is_inrange
    param: [1, 120]
Date of Admission:
  doc: admission
  parent: care
  type: date
  primary: true
Billing Amount:
  doc: billing
  parent: care
  type: float
"#;

    fn parse(content: &str) -> CatalogResult<FieldCatalog> {
        FieldCatalog::parse(content, &CoercionSettings::default())
    }

    #[test]
    fn test_parse_preserves_order_and_defaults() {
        let catalog = parse(CATALOG).unwrap();
        let names: Vec<&str> = catalog.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["_id", "Name", "Age", "Date of Admission", "Billing Amount"]
        );
        assert_eq!(catalog.top_level_containers(), vec!["care"]);
        assert_eq!(catalog.container_path("billing"), vec!["care", "billing"]);
        assert_eq!(catalog.get("_id").unwrap().target_name, "_id");
        assert_eq!(catalog.required_columns().len(), 4);
    }

    #[test]
    fn test_queries() {
        let catalog = parse(CATALOG).unwrap();
        assert_eq!(
            catalog.primary_key_field_names(Some("care")),
            vec!["Name", "Date of Admission"]
        );
        assert_eq!(
            catalog.primary_key_field_names(None),
            vec!["Name", "Date of Admission"]
        );
        assert!(catalog.primary_key_field_names(Some("billing")).is_empty());
        let indexed: Vec<&str> = catalog
            .fields_requiring_index()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(indexed, vec!["Name"]);
        assert_eq!(catalog.fields_requiring_type(ValueType::Int).len(), 1);
        assert_eq!(catalog.fields_requiring_type(ValueType::Str).len(), 1);
        assert_eq!(catalog.identifier_for("care").unwrap().name, "_id");
        assert_eq!(catalog.fields_of_document("care").count(), 5);
    }

    #[test]
    fn test_unparsable_catalog() {
        assert!(matches!(
            parse("Name: [unclosed"),
            Err(CatalogError::ParseError(_))
        ));
        assert!(matches!(
            parse("Name:\n  parent: root"),
            Err(CatalogError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_unknown_parent() {
        let err =
            parse("_id:\n  doc: care\nName:\n  doc: patient\n  parent: person\n  primary: care")
                .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Containers(ContainerValidationError::UnknownParent { .. })
        ));
    }

    #[test]
    fn test_duplicate_target() {
        let err = parse(
            "_id:\n  doc: care\nBlood Type:\n  doc: care\n  primary: true\nblood type:\n  doc: care",
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateTarget { .. }));
    }

    #[test]
    fn test_target_colliding_with_sub_container() {
        let err = parse(
            r#"
_id:
  doc: care
Patient:
  doc: care
  primary: true
Name:
  doc: patient
  parent: care
"#,
        )
        .unwrap_err();
        match err {
            CatalogError::TargetShadowsContainer {
                container,
                target,
                field,
            } => {
                assert_eq!(container, "care");
                assert_eq!(target, "patient");
                assert_eq!(field, "Patient");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_identifier_rules() {
        let missing = parse("Name:\n  doc: care\n  primary: true").unwrap_err();
        assert!(matches!(missing, CatalogError::MissingIdentifier(_)));

        let twice =
            parse("_id:\n  doc: care\n_id2:\n  doc: care\nName:\n  doc: care\n  primary: true")
                .unwrap_err();
        assert!(matches!(twice, CatalogError::DuplicateIdentifier { .. }));

        let nested = parse(
            "_id:\n  doc: care\nName:\n  doc: care\n  primary: true\n_id_patient:\n  doc: patient\n  parent: care",
        )
        .unwrap_err();
        assert!(matches!(nested, CatalogError::IdentifierNotInRoot { .. }));

        let empty = parse("_id:\n  doc: care\nName:\n  doc: care").unwrap_err();
        assert!(matches!(empty, CatalogError::EmptyPrimaryKey(_)));
    }

    #[test]
    fn test_scope_must_be_top_level() {
        let err =
            parse("_id:\n  doc: care\nName:\n  doc: patient\n  parent: care\n  primary: patient")
                .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidScope { .. }));
    }

    #[test]
    fn test_per_document_scopes() {
        let catalog = parse(
            r#"
_id:
  doc: care
Name:
  doc: care
  primary: true
_id_billing:
  doc: invoice
Invoice Number:
  doc: invoice
  primary: invoice
Hospital:
  doc: invoice
  primary: care
"#,
        )
        .unwrap();
        assert_eq!(catalog.top_level_containers(), vec!["care", "invoice"]);
        assert_eq!(
            catalog.primary_key_field_names(Some("care")),
            vec!["Name", "Hospital"]
        );
        assert_eq!(
            catalog.primary_key_field_names(Some("invoice")),
            vec!["Invoice Number"]
        );
    }

    #[test]
    fn test_load_missing_file() {
        let err = FieldCatalog::load(
            Path::new("/nonexistent/fields.yml"),
            &CoercionSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::ReadError { .. }));
    }
}
