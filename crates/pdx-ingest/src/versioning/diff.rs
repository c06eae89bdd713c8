//! Field-level comparison of normalized records

use crate::partner::{NormalizedRecord, FIELDS};

/// Schema fields whose values differ between `old` and `new`.
///
/// Only schema fields are compared; identity, status, version and
/// locations live outside the record. Tag fields are sets, so ordering
/// never registers as a change.
pub fn changed_fields(old: &NormalizedRecord, new: &NormalizedRecord) -> Vec<&'static str> {
    FIELDS
        .iter()
        .filter(|spec| old.get(spec.name) != new.get(spec.name))
        .map(|spec| spec.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partner::FieldValue;

    #[test]
    fn test_identical_records() {
        let a = NormalizedRecord::new().with("name", FieldValue::text("Contoso"));
        assert!(changed_fields(&a, &a.clone()).is_empty());
    }

    #[test]
    fn test_reports_each_changed_field() {
        let a = NormalizedRecord::new()
            .with("description", FieldValue::text("A"))
            .with("products", FieldValue::tags(["Azure"]));
        let b = NormalizedRecord::new()
            .with("description", FieldValue::text("B"))
            .with("products", FieldValue::tags(["Azure", "Dynamics 365"]));
        assert_eq!(changed_fields(&a, &b), vec!["description", "products"]);
    }

    #[test]
    fn test_missing_equals_sentinel() {
        let a = NormalizedRecord::new();
        let b = NormalizedRecord::new().with("logo", FieldValue::Unavailable);
        assert!(changed_fields(&a, &b).is_empty());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let a = NormalizedRecord::new();
        let b = NormalizedRecord::new().with("scraped_at", FieldValue::text("yesterday"));
        assert!(changed_fields(&a, &b).is_empty());
    }
}
