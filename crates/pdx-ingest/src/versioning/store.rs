//! Versioned partner store
//!
//! [`DocumentStore`] is the persistence seam; [`VersionStore`] combines one
//! with a [`VersionPolicy`] and applies the decision for each incoming
//! record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::policy::{DefaultVersionPolicy, VersionDecision, VersionPolicy};
use super::types::{IngestOutcome, StoredVersion};
use crate::error::{IngestError, Result};
use crate::partner::NormalizedRecord;

/// Storage for partner versions.
///
/// Implementations keep at most one active version per entity.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// The active version of `entity_id`, if any
    async fn find_active(&self, entity_id: &str) -> Result<Option<StoredVersion>>;

    /// Insert a new document
    async fn insert(&self, version: &StoredVersion) -> Result<()>;

    /// Replace the location set of an active document in place
    async fn set_locations(
        &self,
        id: Uuid,
        locations: &BTreeSet<String>,
        last_modified: DateTime<Utc>,
    ) -> Result<()>;

    /// Retire `old_id` and insert `successor` as one atomic step
    async fn supersede(&self, old_id: Uuid, successor: &StoredVersion) -> Result<()>;

    /// Every version of `entity_id`, oldest first
    async fn history(&self, entity_id: &str) -> Result<Vec<StoredVersion>>;
}

/// Applies a [`VersionPolicy`] on top of a [`DocumentStore`]
#[derive(Clone)]
pub struct VersionStore {
    store: Arc<dyn DocumentStore>,
    policy: Arc<dyn VersionPolicy>,
}

impl VersionStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_policy(store, Arc::new(DefaultVersionPolicy))
    }

    pub fn with_policy(store: Arc<dyn DocumentStore>, policy: Arc<dyn VersionPolicy>) -> Self {
        Self { store, policy }
    }

    /// Ingest one normalized record observed under `location`
    pub async fn ingest(
        &self,
        entity_id: &str,
        record: NormalizedRecord,
        location: &str,
    ) -> Result<IngestOutcome> {
        let active = self.store.find_active(entity_id).await?;
        let decision = self.policy.decide(active.as_ref(), &record, location);
        let outcome = decision.outcome();
        let now = Utc::now();

        match (decision, active) {
            (VersionDecision::Insert { locations }, _) => {
                let doc = StoredVersion::first(entity_id, record, locations, now);
                self.store.insert(&doc).await?;
                info!(entity_id, location, "Inserted version 1");
            },
            (VersionDecision::Unchanged, _) => {
                debug!(entity_id, location, "No changes");
            },
            (VersionDecision::MergeLocations { locations }, Some(active)) => {
                self.store.set_locations(active.id, &locations, now).await?;
                info!(entity_id, location, version = active.version, "Merged location");
            },
            (
                VersionDecision::Supersede {
                    changed_fields,
                    locations,
                },
                Some(active),
            ) => {
                let successor = active.successor(record, locations, now);
                self.store.supersede(active.id, &successor).await?;
                info!(
                    entity_id,
                    location,
                    version = successor.version,
                    changed = ?changed_fields,
                    "Created new version"
                );
            },
            (decision, None) => {
                return Err(IngestError::Store(format!(
                    "Policy returned {:?} for {entity_id} without an active version",
                    decision.outcome()
                )));
            },
        }

        Ok(outcome)
    }

    pub async fn history(&self, entity_id: &str) -> Result<Vec<StoredVersion>> {
        self.store.history(entity_id).await
    }
}
