//! Partner data models
//!
//! - [`PartnerRecord`]: one raw item returned by the directory
//! - [`FieldValue`] / [`NormalizedRecord`]: the canonical projection stored
//!   and compared by the versioning engine

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Placeholder stored instead of a missing value.
pub const UNAVAILABLE: &str = "unavailable";

static UNAVAILABLE_FIELD: FieldValue = FieldValue::Unavailable;

/// Raw partner payload keyed by its directory id
#[derive(Debug, Clone, PartialEq)]
pub struct PartnerRecord {
    pub entity_id: String,
    pub payload: Value,
}

impl PartnerRecord {
    /// Build a record from a search item or a detail payload.
    ///
    /// The id comes from `partnerId`, falling back to `partnerDetails.id`.
    /// Returns `None` when neither is present.
    pub fn from_payload(payload: Value) -> Option<Self> {
        let entity_id = id_at(&payload, &["partnerId"])
            .or_else(|| id_at(&payload, &["partnerDetails", "id"]))?;

        Some(Self {
            entity_id,
            payload,
        })
    }
}

fn id_at(value: &Value, path: &[&str]) -> Option<String> {
    let found = path.iter().try_fold(value, |v, key| v.get(*key))?;
    let id = match found {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!id.is_empty()).then_some(id)
}

/// Search response envelope: `{"matchingPartners": {"items": [...]}}`
#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "matchingPartners", default)]
    pub matching_partners: MatchingPartners,
}

#[derive(Debug, Default, Deserialize)]
pub struct MatchingPartners {
    #[serde(default)]
    pub items: Vec<Value>,
}

/// One normalized field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredValue", into = "StoredValue")]
pub enum FieldValue {
    Text(String),
    Tags(BTreeSet<String>),
    Unavailable,
}

impl FieldValue {
    pub fn tags<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::Tags(items.into_iter().map(Into::into).collect())
    }

    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, FieldValue::Unavailable)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Unavailable => Some(UNAVAILABLE),
            FieldValue::Tags(_) => None,
        }
    }
}

/// Persisted shape: the sentinel is a plain string
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum StoredValue {
    Text(String),
    Tags(BTreeSet<String>),
}

impl From<StoredValue> for FieldValue {
    fn from(value: StoredValue) -> Self {
        match value {
            StoredValue::Text(s) if s == UNAVAILABLE => FieldValue::Unavailable,
            StoredValue::Text(s) => FieldValue::Text(s),
            StoredValue::Tags(t) => FieldValue::Tags(t),
        }
    }
}

impl From<FieldValue> for StoredValue {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Text(s) => StoredValue::Text(s),
            FieldValue::Tags(t) => StoredValue::Tags(t),
            FieldValue::Unavailable => StoredValue::Text(UNAVAILABLE.to_string()),
        }
    }
}

/// Canonical partner record, one value per schema field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl NormalizedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a field; absent fields read as the sentinel
    pub fn get(&self, name: &str) -> &FieldValue {
        self.fields.get(name).unwrap_or(&UNAVAILABLE_FIELD)
    }

    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.set(name, value);
        self
    }

    /// Display name, if the partner has one
    pub fn name(&self) -> &str {
        self.get("name").as_text().unwrap_or(UNAVAILABLE)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
