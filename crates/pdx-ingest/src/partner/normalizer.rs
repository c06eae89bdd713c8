//! Raw payload to canonical record
//!
//! [`normalize`] is total: any JSON value yields a record carrying every
//! schema field, with [`FieldValue::Unavailable`] standing in for whatever
//! the payload lacks. Timestamps are left to the version store.

use serde_json::Value;
use std::collections::BTreeSet;

use super::models::{FieldValue, NormalizedRecord, UNAVAILABLE};
use super::schema::{FieldKind, FIELDS};

/// Project a raw partner payload onto the canonical field set.
///
/// Fields are read from the nested `partnerDetails` object when the payload
/// has one (detail endpoint), otherwise from the top level (search item).
pub fn normalize(raw: &Value) -> NormalizedRecord {
    let source = match raw.get("partnerDetails") {
        Some(details @ Value::Object(_)) => details,
        _ => raw,
    };

    let mut record = NormalizedRecord::new();
    for spec in FIELDS {
        let value = match source.get(spec.source_key) {
            None | Some(Value::Null) => FieldValue::Unavailable,
            Some(value) => match spec.kind {
                FieldKind::Text => text_value(value),
                FieldKind::Tags => tag_value(value),
            },
        };
        record.set(spec.name, value);
    }
    record
}

fn text_value(value: &Value) -> FieldValue {
    match value {
        Value::String(s) if s == UNAVAILABLE => FieldValue::Unavailable,
        Value::String(s) => FieldValue::Text(s.clone()),
        other => FieldValue::Text(other.to_string()),
    }
}

fn tag_value(value: &Value) -> FieldValue {
    match value {
        Value::Array(items) => FieldValue::Tags(
            items
                .iter()
                .filter(|item| !item.is_null())
                .map(tag_text)
                .collect::<BTreeSet<_>>(),
        ),
        Value::String(s) if s == UNAVAILABLE => FieldValue::Unavailable,
        other => FieldValue::Tags(BTreeSet::from([tag_text(other)])),
    }
}

fn tag_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::versioning::changed_fields;
    use serde_json::json;

    #[test]
    fn test_empty_payload_is_all_sentinels() {
        let record = normalize(&json!({}));
        assert_eq!(record.len(), FIELDS.len());
        assert!(record.iter().all(|(_, v)| v.is_unavailable()));
    }

    #[test]
    fn test_non_object_payload_does_not_fail() {
        let record = normalize(&json!("just a string"));
        assert_eq!(record.len(), FIELDS.len());
        assert_eq!(record.name(), UNAVAILABLE);
    }

    #[test]
    fn test_search_item_shape() {
        let record = normalize(&json!({
            "partnerId": "p-1",
            "name": "Contoso Consulting",
            "url": "https://contoso.example",
            "industryFocus": ["Retail", "Healthcare", "Retail"],
            "product": "Azure",
            "logo": null,
            "unexpected": {"extra": true}
        }));

        assert_eq!(record.name(), "Contoso Consulting");
        assert_eq!(record.get("website"), &FieldValue::text("https://contoso.example"));
        assert_eq!(
            record.get("industry_focus"),
            &FieldValue::tags(["Healthcare", "Retail"])
        );
        assert_eq!(record.get("products"), &FieldValue::tags(["Azure"]));
        assert!(record.get("logo").is_unavailable());
        assert!(record.get("description").is_unavailable());
    }

    #[test]
    fn test_detail_shape_reads_nested_object() {
        let record = normalize(&json!({
            "partnerDetails": {
                "id": "p-2",
                "name": "Fabrikam",
                "linkedInOrganizationProfile": "https://linkedin.example/fabrikam",
                "targetCustomerCompanySizes": []
            }
        }));

        assert_eq!(record.name(), "Fabrikam");
        assert_eq!(
            record.get("linkedin"),
            &FieldValue::text("https://linkedin.example/fabrikam")
        );
        assert_eq!(record.get("target_company_sizes"), &FieldValue::tags(Vec::<String>::new()));
    }

    #[test]
    fn test_tag_order_is_irrelevant() {
        let a = normalize(&json!({"solutions": ["Data", "AI", "Security"]}));
        let b = normalize(&json!({"solutions": ["Security", "Data", "AI"]}));
        assert_eq!(a, b);
    }

    #[test]
    fn test_structured_tags_use_json_text() {
        let record = normalize(&json!({"competencies": [{"name": "Cloud Platform", "level": 2}]}));
        assert_eq!(
            record.get("competencies"),
            &FieldValue::tags([r#"{"level":2,"name":"Cloud Platform"}"#])
        );
    }

    #[test]
    fn test_literal_sentinel_survives_storage_round_trip() {
        let incoming = normalize(&json!({
            "partnerId": "p-3",
            "name": "Northwind",
            "description": "unavailable",
            "product": "unavailable"
        }));
        assert!(incoming.get("description").is_unavailable());
        assert!(incoming.get("products").is_unavailable());

        let stored: NormalizedRecord =
            serde_json::from_value(serde_json::to_value(&incoming).unwrap()).unwrap();
        assert_eq!(stored, incoming);
        assert!(changed_fields(&stored, &incoming).is_empty());
    }
}
