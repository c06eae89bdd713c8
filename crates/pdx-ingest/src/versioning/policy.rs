//! Version decision
//!
//! Given the active version (if any), an incoming record and the partition
//! it was seen in, decide what the store should do. The decision is pure;
//! [`VersionStore`](super::VersionStore) carries it out.

use std::collections::BTreeSet;

use super::diff::changed_fields;
use super::types::{IngestOutcome, StoredVersion};
use crate::partner::NormalizedRecord;

/// What to write for one incoming record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionDecision {
    /// No active version: insert version 1
    Insert { locations: BTreeSet<String> },
    /// Nothing new
    Unchanged,
    /// Same content, new partition label
    MergeLocations { locations: BTreeSet<String> },
    /// Content changed: retire the active version, insert its successor
    Supersede {
        changed_fields: Vec<&'static str>,
        locations: BTreeSet<String>,
    },
}

impl VersionDecision {
    pub fn outcome(&self) -> IngestOutcome {
        match self {
            VersionDecision::Insert { .. } => IngestOutcome::New,
            VersionDecision::Unchanged => IngestOutcome::Unchanged,
            VersionDecision::MergeLocations { .. } => IngestOutcome::LocationOnlyUpdate,
            VersionDecision::Supersede { .. } => IngestOutcome::Changed,
        }
    }
}

/// Versioning rule set
pub trait VersionPolicy: Send + Sync {
    fn decide(
        &self,
        active: Option<&StoredVersion>,
        incoming: &NormalizedRecord,
        location: &str,
    ) -> VersionDecision;
}

/// Content changes create a new version; a new location only widens the
/// active version's location set.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultVersionPolicy;

impl VersionPolicy for DefaultVersionPolicy {
    fn decide(
        &self,
        active: Option<&StoredVersion>,
        incoming: &NormalizedRecord,
        location: &str,
    ) -> VersionDecision {
        let Some(active) = active else {
            return VersionDecision::Insert {
                locations: BTreeSet::from([location.to_string()]),
            };
        };

        let mut locations = active.locations.clone();
        let new_location = locations.insert(location.to_string());
        let changed = changed_fields(&active.record, incoming);

        match (changed.is_empty(), new_location) {
            (true, false) => VersionDecision::Unchanged,
            (true, true) => VersionDecision::MergeLocations { locations },
            (false, _) => VersionDecision::Supersede {
                changed_fields: changed,
                locations,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partner::FieldValue;
    use chrono::Utc;

    fn active(description: &str, locations: &[&str]) -> StoredVersion {
        StoredVersion::first(
            "p-1",
            NormalizedRecord::new().with("description", FieldValue::text(description)),
            locations.iter().map(|l| l.to_string()).collect(),
            Utc::now(),
        )
    }

    fn incoming(description: &str) -> NormalizedRecord {
        NormalizedRecord::new().with("description", FieldValue::text(description))
    }

    #[test]
    fn test_first_sighting_inserts() {
        let decision = DefaultVersionPolicy.decide(None, &incoming("A"), "US");
        assert_eq!(
            decision,
            VersionDecision::Insert {
                locations: BTreeSet::from(["US".to_string()])
            }
        );
    }

    #[test]
    fn test_same_content_same_location() {
        let doc = active("A", &["US"]);
        let decision = DefaultVersionPolicy.decide(Some(&doc), &incoming("A"), "US");
        assert_eq!(decision.outcome(), IngestOutcome::Unchanged);
    }

    #[test]
    fn test_same_content_new_location() {
        let doc = active("A", &["US"]);
        let decision = DefaultVersionPolicy.decide(Some(&doc), &incoming("A"), "GB");
        assert_eq!(
            decision,
            VersionDecision::MergeLocations {
                locations: BTreeSet::from(["GB".to_string(), "US".to_string()])
            }
        );
    }

    #[test]
    fn test_changed_content_carries_merged_locations() {
        let doc = active("A", &["US"]);
        let decision = DefaultVersionPolicy.decide(Some(&doc), &incoming("B"), "GB");
        match decision {
            VersionDecision::Supersede {
                changed_fields,
                locations,
            } => {
                assert_eq!(changed_fields, vec!["description"]);
                assert_eq!(locations.len(), 2);
            },
            other => panic!("expected supersede, got {other:?}"),
        }
    }
}
