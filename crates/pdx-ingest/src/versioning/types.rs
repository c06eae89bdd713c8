//! Core types for versioned partner documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::IngestError;
use crate::partner::NormalizedRecord;

// ============================================================================
// Status
// ============================================================================

/// Lifecycle status of a stored version
///
/// A document written without a status reads as active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    #[default]
    Active,
    Retired,
}

impl VersionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionStatus::Active => "active",
            VersionStatus::Retired => "retired",
        }
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionStatus {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "active" => Ok(VersionStatus::Active),
            "retired" => Ok(VersionStatus::Retired),
            other => Err(IngestError::Store(format!("Unknown version status: {other}"))),
        }
    }
}

// ============================================================================
// Stored version
// ============================================================================

/// One persisted version of a partner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVersion {
    pub id: Uuid,
    pub entity_id: String,
    pub record: NormalizedRecord,
    /// Every partition label the partner has been observed under
    pub locations: BTreeSet<String>,
    /// Starts at 1, incremented on each content change
    pub version: u32,
    #[serde(default)]
    pub status: VersionStatus,
    pub last_modified: DateTime<Utc>,
}

impl StoredVersion {
    /// Version 1 of a newly seen partner
    pub fn first(
        entity_id: impl Into<String>,
        record: NormalizedRecord,
        locations: BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_id: entity_id.into(),
            record,
            locations,
            version: 1,
            status: VersionStatus::Active,
            last_modified: now,
        }
    }

    /// Active successor carrying new content
    pub fn successor(
        &self,
        record: NormalizedRecord,
        locations: BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_id: self.entity_id.clone(),
            record,
            locations,
            version: self.version.saturating_add(1),
            status: VersionStatus::Active,
            last_modified: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == VersionStatus::Active
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// What an ingest call did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestOutcome {
    /// First version inserted
    New,
    /// Nothing written
    Unchanged,
    /// Only the location set (and timestamp) grew
    LocationOnlyUpdate,
    /// Old version retired, successor inserted
    Changed,
}

impl IngestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestOutcome::New => "new",
            IngestOutcome::Unchanged => "unchanged",
            IngestOutcome::LocationOnlyUpdate => "location_only",
            IngestOutcome::Changed => "changed",
        }
    }

    /// Whether the store was written
    pub fn wrote(&self) -> bool {
        !matches!(self, IngestOutcome::Unchanged)
    }
}

impl fmt::Display for IngestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
