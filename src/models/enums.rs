//! Enums for the field catalog
//!
//! # Serde Casing Conventions
//!
//! - `lowercase`: catalog keywords authored by hand (`ValueType`, `DatabaseBackendType`)
//! - `snake_case`: the `compare` test operators (`gt`, `gte`, ...) are spelled out explicitly
//!
//! These spellings are the vocabulary of `fields_settings.yml`.

use serde::{Deserialize, Serialize};

/// Value type of a catalog field.
///
/// Raw source values are always text; every non-`Str` type is reached
/// through the coercion step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    #[serde(alias = "string")]
    Str,
    #[serde(alias = "integer")]
    Int,
    #[serde(alias = "double")]
    Float,
    Date,
}

impl ValueType {
    /// Storage-engine type tag used in collection validators.
    pub fn bson_type(&self) -> &'static str {
        match self {
            ValueType::Str => "string",
            ValueType::Int => "int",
            ValueType::Float => "double",
            ValueType::Date => "date",
        }
    }

    /// Whether values of this type need the coercion step.
    pub fn needs_coercion(&self) -> bool {
        !matches!(self, ValueType::Str)
    }
}

impl std::str::FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "str" | "string" => Ok(ValueType::Str),
            "int" | "integer" => Ok(ValueType::Int),
            "float" | "double" => Ok(ValueType::Float),
            "date" => Ok(ValueType::Date),
            _ => Err(format!(
                "Unknown value type: {}. Use 'str', 'int', 'float' or 'date'.",
                s
            )),
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueType::Str => write!(f, "str"),
            ValueType::Int => write!(f, "int"),
            ValueType::Float => write!(f, "float"),
            ValueType::Date => write!(f, "date"),
        }
    }
}

/// Test operator of a `compare` validation rule.
///
/// Each operator names the accepted range; rows outside it are flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = "gt")]
    GreaterThan,
    #[serde(rename = "gte")]
    AtLeast,
    #[serde(rename = "lt")]
    LessThan,
    #[serde(rename = "lte")]
    AtMost,
    #[serde(rename = "eq")]
    Equal,
}

impl std::str::FromStr for Comparison {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gt" => Ok(Comparison::GreaterThan),
            "gte" => Ok(Comparison::AtLeast),
            "lt" => Ok(Comparison::LessThan),
            "lte" => Ok(Comparison::AtMost),
            "eq" => Ok(Comparison::Equal),
            _ => Err(format!(
                "Unknown comparison test: {}. Use 'gt', 'gte', 'lt', 'lte' or 'eq'.",
                s
            )),
        }
    }
}

impl std::fmt::Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Comparison::GreaterThan => write!(f, "gt"),
            Comparison::AtLeast => write!(f, "gte"),
            Comparison::LessThan => write!(f, "lt"),
            Comparison::AtMost => write!(f, "lte"),
            Comparison::Equal => write!(f, "eq"),
        }
    }
}
