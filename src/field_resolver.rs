//! Field resolution - maps user- or model-supplied field names onto exact
//! dataset column names. Exact normalized match only; no fuzzy matching, so
//! behavior stays predictable and auditable. A miss fails closed with the
//! full list of available columns so the caller can self-correct.

use crate::error::{EngineError, Result};

/// Lower-case and strip whitespace and underscores.
pub fn normalize_field_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect()
}

/// Resolve a requested field name against the available columns, returning
/// the exact column name as it appears in the dataset.
pub fn resolve<'a>(requested: &str, available: &'a [String]) -> Result<&'a str> {
    let wanted = normalize_field_name(requested);
    available
        .iter()
        .find(|column| normalize_field_name(column) == wanted)
        .map(|column| column.as_str())
        .ok_or_else(|| EngineError::FieldNotFound {
            field: requested.to_string(),
            available: available.to_vec(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_match() {
        let cols = columns(&["MPG", "Origin"]);
        assert_eq!(resolve("MPG", &cols).unwrap(), "MPG");
    }

    #[test]
    fn test_case_and_spacing_insensitive() {
        let cols = columns(&["Horse Power", "Origin"]);
        assert_eq!(resolve("horsepower", &cols).unwrap(), "Horse Power");
        assert_eq!(resolve(" horse_power ", &cols).unwrap(), "Horse Power");
    }

    #[test]
    fn test_round_trip_through_normalization() {
        let cols = columns(&["Miles_per_Gallon", "Cylinders"]);
        for col in &cols {
            assert_eq!(resolve(&normalize_field_name(col), &cols).unwrap(), col);
        }
    }

    #[test]
    fn test_miss_lists_available_columns_verbatim() {
        let cols = columns(&["MPG", "Origin"]);
        match resolve("weight", &cols) {
            Err(EngineError::FieldNotFound { field, available }) => {
                assert_eq!(field, "weight");
                assert_eq!(available, vec!["MPG", "Origin"]);
            }
            other => panic!("expected FieldNotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_no_fuzzy_matching() {
        let cols = columns(&["price"]);
        assert!(resolve("prices", &cols).is_err());
    }
}
