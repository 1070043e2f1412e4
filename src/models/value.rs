//! Cell values flowing through the pipeline

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;

/// Date rendering used for identifiers, logs and JSON output.
pub const DATE_DISPLAY_FORMAT: &str = "%Y-%m-%d";

/// A single cell of a tabular record.
///
/// Loaded cells are `Text` or `Missing`; coercion turns them into the
/// catalog's value type or back into `Missing` on failure.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    /// Absent or null value
    #[default]
    Missing,
    Text(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    /// Storage-engine type tag of this value (`null` for missing cells).
    pub fn bson_type(&self) -> &'static str {
        match self {
            FieldValue::Missing => "null",
            FieldValue::Text(_) => "string",
            FieldValue::Integer(_) => "int",
            FieldValue::Float(_) => "double",
            FieldValue::Date(_) => "date",
        }
    }

    /// Text form used when building primary-key strings.
    ///
    /// Missing values render as the empty string.
    pub fn key_text(&self) -> String {
        match self {
            FieldValue::Missing => String::new(),
            other => other.to_string(),
        }
    }

    /// Order two values of compatible types.
    ///
    /// Integers and floats compare numerically with each other. Values of
    /// unrelated types, and missing values, are unordered.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Integer(a), FieldValue::Integer(b)) => Some(a.cmp(b)),
            (FieldValue::Integer(a), FieldValue::Float(b)) => (*a as f64).partial_cmp(b),
            (FieldValue::Float(a), FieldValue::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (FieldValue::Float(a), FieldValue::Float(b)) => a.partial_cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
            (FieldValue::Date(a), FieldValue::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Equality used by set membership: numeric values compare across int/float.
    pub fn matches(&self, other: &FieldValue) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Missing => serde_json::Value::Null,
            FieldValue::Text(s) => serde_json::Value::String(s.clone()),
            FieldValue::Integer(n) => serde_json::Value::Number((*n).into()),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Date(d) => {
                serde_json::Value::String(d.format(DATE_DISPLAY_FORMAT).to_string())
            }
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Missing => write!(f, "null"),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Integer(n) => write!(f, "{}", n),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Date(d) => write!(f, "{}", d.format(DATE_DISPLAY_FORMAT)),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Missing => serializer.serialize_none(),
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Integer(n) => serializer.serialize_i64(*n),
            FieldValue::Float(v) => serializer.serialize_f64(*v),
            FieldValue::Date(d) => {
                serializer.serialize_str(&d.format(DATE_DISPLAY_FORMAT).to_string())
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map(FieldValue::Text).unwrap_or(FieldValue::Missing)
    }
}
