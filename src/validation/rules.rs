//! Validation rules attached to catalog fields
//!
//! A rule is a closed set of predicates, each carrying its own typed
//! parameters. `is_violated` answers the masking question "should this
//! cell be flagged?".

use serde::Deserialize;
use std::cmp::Ordering;

use crate::models::{Comparison, FieldValue, ValueType};
use crate::transform::coerce::{CoercionSettings, coerce_literal};

/// Rule names as written in the catalog's `error_mask.function`.
pub const RULE_NOT_MISSING: &str = "is_na";
pub const RULE_IN_SET: &str = "is_in";
pub const RULE_IN_RANGE: &str = "is_inrange";
pub const RULE_COMPARE: &str = "compare";

/// Per-field validation rule.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ValidationRule {
    /// Flags missing values
    #[default]
    NotMissing,
    /// Flags values outside the set (missing values included)
    InSet(Vec<FieldValue>),
    /// Flags missing values, values below `min` and values at or above `max`
    InRange { min: FieldValue, max: FieldValue },
    /// Flags values failing `value <op> operand`; a missing value fails every test
    Compare { op: Comparison, operand: FieldValue },
}

/// `error_mask` entry as written in the catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRule {
    pub function: String,
    #[serde(default)]
    pub param: Option<serde_yaml::Value>,
}

#[derive(Debug, Deserialize)]
struct RawComparison {
    test: Comparison,
    value: serde_yaml::Value,
}

impl ValidationRule {
    /// Build a typed rule from its catalog form.
    ///
    /// Parameters are converted to the field's value type so that they
    /// compare against coerced cells.
    pub fn from_raw(
        raw: &RawRule,
        value_type: ValueType,
        settings: &CoercionSettings,
    ) -> Result<Self, String> {
        let param = raw.param.as_ref();
        match raw.function.as_str() {
            RULE_NOT_MISSING => Ok(ValidationRule::NotMissing),
            RULE_IN_SET => {
                let items = param
                    .and_then(|p| p.as_sequence())
                    .ok_or_else(|| format!("{} expects a list parameter", RULE_IN_SET))?;
                let values = items
                    .iter()
                    .map(|item| coerce_literal(item, value_type, settings))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ValidationRule::InSet(values))
            }
            RULE_IN_RANGE => {
                let bounds = param
                    .and_then(|p| p.as_sequence())
                    .filter(|s| s.len() == 2)
                    .ok_or_else(|| format!("{} expects a [min, max] parameter", RULE_IN_RANGE))?;
                let min = coerce_literal(&bounds[0], value_type, settings)?;
                let max = coerce_literal(&bounds[1], value_type, settings)?;
                if min.is_missing() || max.is_missing() {
                    return Err(format!("{} bounds cannot be null", RULE_IN_RANGE));
                }
                if min.compare(&max) != Some(Ordering::Less) {
                    return Err(format!(
                        "{} lower bound {} must be below upper bound {}",
                        RULE_IN_RANGE, min, max
                    ));
                }
                Ok(ValidationRule::InRange { min, max })
            }
            RULE_COMPARE => {
                let param = param.cloned().ok_or_else(|| {
                    format!("{} expects a {{test, value}} parameter", RULE_COMPARE)
                })?;
                let cmp: RawComparison = serde_yaml::from_value(param)
                    .map_err(|e| format!("{} parameter: {}", RULE_COMPARE, e))?;
                let operand = coerce_literal(&cmp.value, value_type, settings)?;
                if operand.is_missing() {
                    return Err(format!("{} value cannot be null", RULE_COMPARE));
                }
                Ok(ValidationRule::Compare {
                    op: cmp.test,
                    operand,
                })
            }
            other => Err(format!(
                "Unknown validation function: {}. Use '{}', '{}', '{}' or '{}'.",
                other, RULE_NOT_MISSING, RULE_IN_SET, RULE_IN_RANGE, RULE_COMPARE
            )),
        }
    }

    /// Whether `value` must be flagged by the mask.
    pub fn is_violated(&self, value: &FieldValue) -> bool {
        match self {
            ValidationRule::NotMissing => value.is_missing(),
            ValidationRule::InSet(allowed) => !allowed.iter().any(|a| a.matches(value)),
            ValidationRule::InRange { min, max } => {
                let above_min = matches!(
                    value.compare(min),
                    Some(Ordering::Greater | Ordering::Equal)
                );
                let below_max = value.compare(max) == Some(Ordering::Less);
                !(above_min && below_max)
            }
            ValidationRule::Compare { op, operand } => {
                let Some(ordering) = value.compare(operand) else {
                    return true;
                };
                let accepted = match op {
                    Comparison::GreaterThan => ordering == Ordering::Greater,
                    Comparison::AtLeast => ordering != Ordering::Less,
                    Comparison::LessThan => ordering == Ordering::Less,
                    Comparison::AtMost => ordering != Ordering::Greater,
                    Comparison::Equal => ordering == Ordering::Equal,
                };
                !accepted
            }
        }
    }

    /// Catalog function name of this rule.
    pub fn function_name(&self) -> &'static str {
        match self {
            ValidationRule::NotMissing => RULE_NOT_MISSING,
            ValidationRule::InSet(_) => RULE_IN_SET,
            ValidationRule::InRange { .. } => RULE_IN_RANGE,
            ValidationRule::Compare { .. } => RULE_COMPARE,
        }
    }
}

impl std::fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationRule::NotMissing => write!(f, "{}", RULE_NOT_MISSING),
            ValidationRule::InSet(values) => {
                let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{} [{}]", RULE_IN_SET, items.join(", "))
            }
            ValidationRule::InRange { min, max } => {
                write!(f, "{} [{}, {})", RULE_IN_RANGE, min, max)
            }
            ValidationRule::Compare { op, operand } => {
                write!(f, "{} {} {}", RULE_COMPARE, op, operand)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(yaml: &str, value_type: ValueType) -> Result<ValidationRule, String> {
        let raw: RawRule = serde_yaml::from_str(yaml).unwrap();
        ValidationRule::from_raw(&raw, value_type, &CoercionSettings::default())
    }

    #[test]
    fn test_not_missing() {
        let r = rule("function: is_na", ValueType::Str).unwrap();
        assert!(r.is_violated(&FieldValue::Missing));
        assert!(!r.is_violated(&FieldValue::text("")));
    }

    #[test]
    fn test_in_set() {
        let r = rule("function: is_in\nparam: [Male, Female]", ValueType::Str).unwrap();
        assert!(!r.is_violated(&FieldValue::text("Male")));
        assert!(r.is_violated(&FieldValue::text("female")));
        assert!(r.is_violated(&FieldValue::text("Unknown")));
        assert!(r.is_violated(&FieldValue::Missing));
    }

    #[test]
    fn test_in_range_is_half_open() {
        let r = rule("function: is_inrange\nparam: [1, 120]", ValueType::Int).unwrap();
        assert_eq!(
            r,
            ValidationRule::InRange {
                min: FieldValue::Integer(1),
                max: FieldValue::Integer(120)
            }
        );
        assert!(!r.is_violated(&FieldValue::Integer(1)));
        assert!(!r.is_violated(&FieldValue::Integer(119)));
        assert!(r.is_violated(&FieldValue::Integer(120)));
        assert!(r.is_violated(&FieldValue::Integer(0)));
        assert!(r.is_violated(&FieldValue::Integer(-5)));
        assert!(r.is_violated(&FieldValue::Missing));
    }

    #[test]
    fn test_compare_negates_accepted_range() {
        let gt = rule(
            "function: compare\nparam: {test: gt, value: 0}",
            ValueType::Float,
        )
        .unwrap();
        assert!(gt.is_violated(&FieldValue::Float(0.0)));
        assert!(!gt.is_violated(&FieldValue::Float(0.01)));

        let gte = rule(
            "function: compare\nparam: {test: gte, value: 0}",
            ValueType::Int,
        )
        .unwrap();
        assert!(!gte.is_violated(&FieldValue::Integer(0)));
        assert!(gte.is_violated(&FieldValue::Integer(-1)));

        let lt = rule(
            "function: compare\nparam: {test: lt, value: 10}",
            ValueType::Int,
        )
        .unwrap();
        assert!(lt.is_violated(&FieldValue::Integer(10)));

        let lte = rule(
            "function: compare\nparam: {test: lte, value: 10}",
            ValueType::Int,
        )
        .unwrap();
        assert!(!lte.is_violated(&FieldValue::Integer(10)));
        assert!(lte.is_violated(&FieldValue::Integer(11)));

        let eq = rule(
            "function: compare\nparam: {test: eq, value: Urgent}",
            ValueType::Str,
        )
        .unwrap();
        assert!(!eq.is_violated(&FieldValue::text("Urgent")));
        assert!(eq.is_violated(&FieldValue::text("Elective")));
        assert!(eq.is_violated(&FieldValue::Missing));
    }

    #[test]
    fn test_invalid_rules() {
        assert!(rule("function: is_between", ValueType::Int).is_err());
        assert!(rule("function: is_in", ValueType::Str).is_err());
        assert!(rule("function: is_inrange\nparam: [5]", ValueType::Int).is_err());
        assert!(rule("function: is_inrange\nparam: [10, 1]", ValueType::Int).is_err());
        assert!(rule("function: is_inrange\nparam: [a, b]", ValueType::Int).is_err());
        assert!(
            rule(
                "function: compare\nparam: {test: ne, value: 1}",
                ValueType::Int
            )
            .is_err()
        );
    }

    #[test]
    fn test_date_range_parameters() {
        let r = rule(
            "function: is_inrange\nparam: ['2000-01-01', '2030-01-01']",
            ValueType::Date,
        )
        .unwrap();
        let d = chrono::NaiveDate::from_ymd_opt(2019, 8, 20).unwrap();
        assert!(!r.is_violated(&FieldValue::Date(d)));
        let d = chrono::NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
        assert!(r.is_violated(&FieldValue::Date(d)));
    }
}
