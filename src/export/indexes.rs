//! Index derivation

use serde::Serialize;

use crate::catalog::FieldCatalog;

/// An index on one field of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSpec {
    /// Top-level document (collection) the index belongs to
    pub collection: String,
    /// Dotted path inside the collection's documents, e.g. `patient.name`
    pub path: String,
}

impl IndexSpec {
    /// Path including the top-level container, e.g. `care.patient.name`.
    pub fn dotted_path(&self) -> String {
        format!("{}.{}", self.collection, self.path)
    }
}

impl std::fmt::Display for IndexSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dotted_path())
    }
}

/// Indexes of every indexed field, in catalog order.
pub fn derive_indexes(catalog: &FieldCatalog) -> Vec<IndexSpec> {
    catalog
        .fields_requiring_index()
        .into_iter()
        .filter_map(|field| {
            let path = catalog.container_path(&field.container);
            let (collection, nested) = path.split_first()?;
            let mut segments: Vec<&str> = nested.to_vec();
            segments.push(&field.target_name);
            Some(IndexSpec {
                collection: collection.to_string(),
                path: segments.join("."),
            })
        })
        .collect()
}

/// Indexes of one collection.
pub fn indexes_for<'a>(indexes: &'a [IndexSpec], collection: &str) -> Vec<&'a IndexSpec> {
    indexes
        .iter()
        .filter(|i| i.collection == collection)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::coerce::CoercionSettings;

    #[test]
    fn test_index_paths() {
        let catalog = FieldCatalog::parse(
            r#"
_id: {doc: care}
Status: {doc: care, index: true}
Name: {doc: patient, parent: care, primary: true, index: true}
Phone: {doc: contact, parent: patient, index: true}
Age: {doc: patient, parent: care, type: int}
"#,
            &CoercionSettings::default(),
        )
        .unwrap();
        let indexes = derive_indexes(&catalog);
        let paths: Vec<String> = indexes.iter().map(|i| i.dotted_path()).collect();
        assert_eq!(
            paths,
            vec![
                "care.status",
                "care.patient.name",
                "care.patient.contact.phone"
            ]
        );
        assert_eq!(indexes[1].path, "patient.name");
        assert_eq!(indexes_for(&indexes, "care").len(), 3);
        assert!(indexes_for(&indexes, "billing").is_empty());
    }
}
