//! Output key naming

use crate::models::ID_KEY;

/// Prefix marking identifier fields in the catalog.
pub const IDENTIFIER_PREFIX: &str = "_id";

/// Whether a catalog entry is an identifier (hash) field.
pub fn is_identifier_name(name: &str) -> bool {
    name.starts_with(IDENTIFIER_PREFIX)
}

/// Derive the output key for a source column.
///
/// Words are title-cased, spaces removed and the first character lowered:
/// `Date of Admission` becomes `dateOfAdmission`. Identifier fields always
/// map to `_id`.
pub fn target_name(name: &str) -> String {
    if is_identifier_name(name) {
        return ID_KEY.to_string();
    }

    let mut titled = String::with_capacity(name.len());
    let mut previous_cased = false;
    for c in name.chars() {
        if c.is_alphabetic() {
            if previous_cased {
                titled.extend(c.to_lowercase());
            } else {
                titled.extend(c.to_uppercase());
            }
            previous_cased = true;
        } else {
            previous_cased = false;
            if c != ' ' {
                titled.push(c);
            }
        }
    }

    let mut chars = titled.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_names() {
        assert_eq!(target_name("Name"), "name");
        assert_eq!(target_name("Blood Type"), "bloodType");
        assert_eq!(target_name("Date of Admission"), "dateOfAdmission");
        assert_eq!(target_name("Test Results"), "testResults");
        assert_eq!(target_name("BILLING amount"), "billingAmount");
        assert_eq!(target_name("room_number 2"), "room_Number2");
        assert_eq!(target_name(""), "");
    }

    #[test]
    fn test_identifier_names() {
        assert!(is_identifier_name("_id"));
        assert!(is_identifier_name("_id_care"));
        assert!(!is_identifier_name("id"));
        assert_eq!(target_name("_id_care"), ID_KEY);
    }
}
