//! Field definitions
//!
//! `RawField` mirrors one catalog entry as written; `FieldDefinition` is the
//! typed, defaulted form every pipeline stage works from.

use serde::Deserialize;

use super::naming::{is_identifier_name, target_name};
use crate::models::{FieldValue, ValueType};
use crate::transform::coerce::{CoercionSettings, coerce_literal};
use crate::validation::containers::ROOT;
use crate::validation::rules::{RawRule, ValidationRule};

/// What to do with cells flagged by the field's validation rule.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ReplacementPolicy {
    /// Remove the whole row from the working set
    #[default]
    DropRow,
    /// Overwrite the flagged cell (`Missing` for an explicit null)
    ReplaceWith(FieldValue),
}

impl ReplacementPolicy {
    /// Whether flagged cells are replaced by an explicit null.
    pub fn is_null_replacement(&self) -> bool {
        matches!(self, ReplacementPolicy::ReplaceWith(FieldValue::Missing))
    }
}

/// `primary` attribute: a flag or the name of the scoped container.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawPrimary {
    Flag(bool),
    Scope(String),
}

impl Default for RawPrimary {
    fn default() -> Self {
        RawPrimary::Flag(false)
    }
}

/// One catalog entry as written in the YAML document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawField {
    pub doc: String,
    #[serde(default = "default_parent")]
    pub parent: String,
    #[serde(default, rename = "type")]
    pub value_type: ValueType,
    #[serde(default)]
    pub index: bool,
    #[serde(default)]
    pub primary: RawPrimary,
    #[serde(default = "default_replace")]
    pub replace: serde_yaml::Value,
    #[serde(default)]
    pub error_mask: Option<RawRule>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub round: Option<u32>,
}

fn default_parent() -> String {
    ROOT.to_string()
}

fn default_replace() -> serde_yaml::Value {
    serde_yaml::Value::Bool(false)
}

fn default_required() -> bool {
    true
}

/// Typed definition of one source column.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    /// Source column label
    pub name: String,
    /// Output key inside the container
    pub target_name: String,
    /// Sub-document this field is placed in
    pub container: String,
    /// Parent of `container` (`root` for top-level containers)
    pub parent: String,
    pub value_type: ValueType,
    pub is_indexed: bool,
    /// Root container whose identifier this field feeds, if any
    pub primary_key: Option<String>,
    pub replacement: ReplacementPolicy,
    pub rule: ValidationRule,
    pub is_required: bool,
    /// Decimal places kept for float fields; overrides the global setting
    pub decimals: Option<u32>,
}

impl FieldDefinition {
    /// Build a definition from its catalog entry.
    ///
    /// `primary_key` is the already-resolved scope container.
    pub fn from_raw(
        name: &str,
        raw: &RawField,
        primary_key: Option<String>,
        settings: &CoercionSettings,
    ) -> Result<Self, String> {
        let rule = match &raw.error_mask {
            Some(rule) => ValidationRule::from_raw(rule, raw.value_type, settings)?,
            None => ValidationRule::default(),
        };

        let replacement = match &raw.replace {
            serde_yaml::Value::Bool(false) => ReplacementPolicy::DropRow,
            serde_yaml::Value::Bool(true) => {
                return Err("replace must be false, null or a literal value".to_string());
            }
            literal => {
                ReplacementPolicy::ReplaceWith(coerce_literal(literal, raw.value_type, settings)?)
            }
        };

        if raw.round.is_some() && raw.value_type != ValueType::Float {
            return Err(format!(
                "round only applies to float fields, not {}",
                raw.value_type
            ));
        }

        Ok(Self {
            name: name.to_string(),
            target_name: target_name(name),
            container: raw.doc.clone(),
            parent: raw.parent.clone(),
            value_type: raw.value_type,
            is_indexed: raw.index,
            primary_key,
            replacement,
            rule,
            is_required: raw.required,
            decimals: raw.round,
        })
    }

    /// Identifier fields hold the content hash and have no source column.
    pub fn is_identifier(&self) -> bool {
        is_identifier_name(&self.name)
    }

    pub fn is_primary_key_member(&self) -> bool {
        !self.is_identifier() && self.primary_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(yaml: &str) -> RawField {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_defaults() {
        let field = FieldDefinition::from_raw(
            "Blood Type",
            &raw("doc: patient\nparent: care"),
            None,
            &CoercionSettings::default(),
        )
        .unwrap();
        assert_eq!(field.target_name, "bloodType");
        assert_eq!(field.value_type, ValueType::Str);
        assert!(!field.is_indexed);
        assert!(field.is_required);
        assert_eq!(field.replacement, ReplacementPolicy::DropRow);
        assert_eq!(field.rule, ValidationRule::NotMissing);
        assert!(!field.is_primary_key_member());
    }

    #[test]
    fn test_replace_values() {
        let settings = CoercionSettings::default();
        let field = FieldDefinition::from_raw(
            "Age",
            &raw("doc: patient\ntype: int\nreplace: null"),
            None,
            &settings,
        )
        .unwrap();
        assert!(field.replacement.is_null_replacement());

        let field = FieldDefinition::from_raw(
            "Gender",
            &raw("doc: patient\nreplace: Other"),
            None,
            &settings,
        )
        .unwrap();
        assert_eq!(
            field.replacement,
            ReplacementPolicy::ReplaceWith(FieldValue::text("Other"))
        );

        let err = FieldDefinition::from_raw(
            "Age",
            &raw("doc: patient\ntype: int\nreplace: unknown"),
            None,
            &settings,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_primary_forms() {
        assert_eq!(raw("doc: a\nprimary: true").primary, RawPrimary::Flag(true));
        assert_eq!(
            raw("doc: a\nprimary: care").primary,
            RawPrimary::Scope("care".to_string())
        );
        assert_eq!(raw("doc: a").primary, RawPrimary::Flag(false));
    }

    #[test]
    fn test_unknown_attribute_rejected() {
        assert!(serde_yaml::from_str::<RawField>("doc: a\nindexed: true").is_err());
    }

    #[test]
    fn test_round_only_for_floats() {
        let settings = CoercionSettings::default();
        assert!(
            FieldDefinition::from_raw("Age", &raw("doc: a\ntype: int\nround: 1"), None, &settings)
                .is_err()
        );
        let field = FieldDefinition::from_raw(
            "Billing Amount",
            &raw("doc: billing\ntype: float\nround: 1"),
            None,
            &settings,
        )
        .unwrap();
        assert_eq!(field.decimals, Some(1));
    }
}
