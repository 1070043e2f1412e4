//! Type coercion of raw text cells
//!
//! Every coercion is total: a value that cannot be converted becomes the
//! fallback (`FieldValue::Missing`) and a warning is logged. Nothing here
//! aborts a row; deciding what to do with the fallback is the masking step's job.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::FieldDefinition;
use crate::models::{FieldValue, Table, ValueType};

/// Default date format of source files.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Default decimal places kept for float fields.
pub const DEFAULT_FLOAT_DECIMALS: u32 = 2;

/// Coercion settings (`[coercion]` section of the importer configuration)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoercionSettings {
    /// `chrono` format string for date fields
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Decimal places for float fields without their own `round`; `None` keeps full precision
    #[serde(default = "default_float_decimals")]
    pub float_decimals: Option<u32>,
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

fn default_float_decimals() -> Option<u32> {
    Some(DEFAULT_FLOAT_DECIMALS)
}

impl Default for CoercionSettings {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            float_decimals: default_float_decimals(),
        }
    }
}

/// Outcome of coercing one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    pub value: FieldValue,
    /// True when the input was present but could not be converted
    pub failed: bool,
}

impl Coerced {
    fn ok(value: FieldValue) -> Self {
        Self {
            value,
            failed: false,
        }
    }

    fn fallback() -> Self {
        Self {
            value: FieldValue::Missing,
            failed: true,
        }
    }
}

pub fn parse_integer(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

pub fn parse_float(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a date that matches `format` exactly.
///
/// `chrono` accepts a year of any width for `%Y`, so the parsed date is
/// rendered back and compared with the input to reject short years like
/// `22-09-22`.
pub fn parse_date(raw: &str, format: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, format)
        .ok()
        .filter(|date| date.format(format).to_string() == raw)
}

/// Round to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

fn to_integer(value: &FieldValue) -> Coerced {
    match value {
        FieldValue::Missing => Coerced::ok(FieldValue::Missing),
        FieldValue::Integer(n) => Coerced::ok(FieldValue::Integer(*n)),
        FieldValue::Float(f) if f.fract() == 0.0 && f.is_finite() => {
            Coerced::ok(FieldValue::Integer(*f as i64))
        }
        FieldValue::Text(s) => parse_integer(s)
            .map(|n| Coerced::ok(FieldValue::Integer(n)))
            .unwrap_or_else(Coerced::fallback),
        _ => Coerced::fallback(),
    }
}

fn to_float(value: &FieldValue, decimals: Option<u32>) -> Coerced {
    let parsed = match value {
        FieldValue::Missing => return Coerced::ok(FieldValue::Missing),
        FieldValue::Float(f) => Some(*f),
        FieldValue::Integer(n) => Some(*n as f64),
        FieldValue::Text(s) => parse_float(s),
        FieldValue::Date(_) => None,
    };
    match parsed {
        Some(v) => {
            let v = decimals.map(|d| round_to(v, d)).unwrap_or(v);
            Coerced::ok(FieldValue::Float(v))
        }
        None => Coerced::fallback(),
    }
}

fn to_date(value: &FieldValue, format: &str) -> Coerced {
    match value {
        // Already-missing input is the fallback; no parse is attempted.
        FieldValue::Missing => Coerced::ok(FieldValue::Missing),
        FieldValue::Date(d) => Coerced::ok(FieldValue::Date(*d)),
        FieldValue::Text(s) => parse_date(s, format)
            .map(|d| Coerced::ok(FieldValue::Date(d)))
            .unwrap_or_else(Coerced::fallback),
        _ => Coerced::fallback(),
    }
}

/// Coerce one cell to `value_type`.
pub fn coerce_value(
    value: &FieldValue,
    value_type: ValueType,
    decimals: Option<u32>,
    settings: &CoercionSettings,
) -> Coerced {
    match value_type {
        ValueType::Str => Coerced::ok(value.clone()),
        ValueType::Int => to_integer(value),
        ValueType::Float => to_float(value, decimals.or(settings.float_decimals)),
        ValueType::Date => to_date(value, &settings.date_format),
    }
}

/// Coerce a whole column in place according to the field's value type.
///
/// Returns the number of cells that fell back to `Missing`.
pub fn coerce_column(
    table: &mut Table,
    field: &FieldDefinition,
    settings: &CoercionSettings,
) -> usize {
    if !field.value_type.needs_coercion() {
        return 0;
    }

    debug!("Converting column {} to {}", field.name, field.value_type);

    let mut failures = 0;
    for record in table.records_mut() {
        let coerced = coerce_value(
            record.get(&field.name),
            field.value_type,
            field.decimals,
            settings,
        );
        if coerced.failed {
            failures += 1;
            warn!(
                "Error converting to {} for value '{}' in column {} (row {})",
                field.value_type,
                record.get(&field.name),
                field.name,
                record.index()
            );
        }
        record.set(field.name.clone(), coerced.value);
    }
    failures
}

/// Convert a literal from the catalog (a rule parameter or a replacement
/// value) to the field's value type.
///
/// Unlike row coercion this is strict: catalog literals are authored by
/// hand, so a literal that does not fit the field type is reported.
pub fn coerce_literal(
    literal: &serde_yaml::Value,
    value_type: ValueType,
    settings: &CoercionSettings,
) -> Result<FieldValue, String> {
    use serde_yaml::Value;

    let describe = || format!("{:?} is not a valid {} literal", literal, value_type);

    match (literal, value_type) {
        (Value::Null, _) => Ok(FieldValue::Missing),
        (Value::String(s), ValueType::Str) => Ok(FieldValue::Text(s.clone())),
        (Value::Number(n), ValueType::Str) => Ok(FieldValue::Text(n.to_string())),
        (Value::Bool(b), ValueType::Str) => Ok(FieldValue::Text(b.to_string())),
        (Value::Number(n), ValueType::Int) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .map(FieldValue::Integer)
            .ok_or_else(describe),
        (Value::String(s), ValueType::Int) => parse_integer(s)
            .map(FieldValue::Integer)
            .ok_or_else(describe),
        (Value::Number(n), ValueType::Float) => {
            n.as_f64().map(FieldValue::Float).ok_or_else(describe)
        }
        (Value::String(s), ValueType::Float) => {
            parse_float(s).map(FieldValue::Float).ok_or_else(describe)
        }
        (Value::String(s), ValueType::Date) => parse_date(s, &settings.date_format)
            .map(FieldValue::Date)
            .ok_or_else(describe),
        _ => Err(describe()),
    }
}
