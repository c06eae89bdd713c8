//! In-process document store for dry runs and tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::DocumentStore;
use super::types::{StoredVersion, VersionStatus};
use crate::error::{IngestError, Result};

/// Vec-backed [`DocumentStore`] with the same one-active rule as the
/// database's partial unique index
#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<Vec<StoredVersion>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored document
    pub async fn snapshot(&self) -> Vec<StoredVersion> {
        self.docs.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }
}

fn check_insert(docs: &[StoredVersion], version: &StoredVersion) -> Result<()> {
    if version.is_active()
        && docs
            .iter()
            .any(|d| d.entity_id == version.entity_id && d.is_active())
    {
        return Err(IngestError::Store(format!(
            "Active version already exists for {}",
            version.entity_id
        )));
    }
    Ok(())
}

fn retire_in(docs: &mut [StoredVersion], id: Uuid, at: DateTime<Utc>) -> Result<()> {
    let doc = docs
        .iter_mut()
        .find(|d| d.id == id && d.is_active())
        .ok_or_else(|| IngestError::Store(format!("No active document {id}")))?;
    doc.status = VersionStatus::Retired;
    doc.last_modified = at;
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_active(&self, entity_id: &str) -> Result<Option<StoredVersion>> {
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .find(|d| d.entity_id == entity_id && d.is_active())
            .cloned())
    }

    async fn insert(&self, version: &StoredVersion) -> Result<()> {
        let mut docs = self.docs.write().await;
        check_insert(&docs, version)?;
        docs.push(version.clone());
        Ok(())
    }

    async fn set_locations(
        &self,
        id: Uuid,
        locations: &BTreeSet<String>,
        last_modified: DateTime<Utc>,
    ) -> Result<()> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| IngestError::Store(format!("No document {id}")))?;
        doc.locations = locations.clone();
        doc.last_modified = last_modified;
        Ok(())
    }

    async fn supersede(&self, old_id: Uuid, successor: &StoredVersion) -> Result<()> {
        let mut docs = self.docs.write().await;

        // Validate on a scratch copy so a failure leaves nothing half-applied.
        let mut next = docs.clone();
        retire_in(&mut next, old_id, successor.last_modified)?;
        check_insert(&next, successor)?;
        next.push(successor.clone());

        *docs = next;
        Ok(())
    }

    async fn history(&self, entity_id: &str) -> Result<Vec<StoredVersion>> {
        let docs = self.docs.read().await;
        let mut versions: Vec<_> = docs
            .iter()
            .filter(|d| d.entity_id == entity_id)
            .cloned()
            .collect();
        versions.sort_by_key(|d| d.version);
        Ok(versions)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::partner::{FieldValue, NormalizedRecord};
    use crate::versioning::{IngestOutcome, VersionStore};
    use std::sync::Arc;

    fn record(description: &str) -> NormalizedRecord {
        NormalizedRecord::new()
            .with("name", FieldValue::text("Contoso"))
            .with("description", FieldValue::text(description))
    }

    fn store() -> (Arc<MemoryDocumentStore>, VersionStore) {
        let docs = Arc::new(MemoryDocumentStore::new());
        let versions = VersionStore::new(docs.clone());
        (docs, versions)
    }

    #[tokio::test]
    async fn test_idempotent_reingest() {
        let (docs, versions) = store();

        assert_eq!(versions.ingest("p-1", record("A"), "US").await.unwrap(), IngestOutcome::New);
        assert_eq!(
            versions.ingest("p-1", record("A"), "US").await.unwrap(),
            IngestOutcome::Unchanged
        );
        assert_eq!(docs.len().await, 1);
    }

    #[tokio::test]
    async fn test_location_merge() {
        let (docs, versions) = store();

        versions.ingest("p-1", record("A"), "US").await.unwrap();
        assert_eq!(
            versions.ingest("p-1", record("A"), "GB").await.unwrap(),
            IngestOutcome::LocationOnlyUpdate
        );

        let all = docs.snapshot().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].version, 1);
        assert_eq!(
            all[0].locations,
            BTreeSet::from(["GB".to_string(), "US".to_string()])
        );
    }

    #[tokio::test]
    async fn test_version_churn() {
        let (_, versions) = store();

        versions.ingest("p-1", record("A"), "US").await.unwrap();
        assert_eq!(
            versions.ingest("p-1", record("B"), "US").await.unwrap(),
            IngestOutcome::Changed
        );

        let history = versions.history("p-1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].version, 1);
        assert_eq!(history[0].status, VersionStatus::Retired);
        assert_eq!(history[1].version, 2);
        assert!(history[1].is_active());
        assert_eq!(history[1].record.get("description"), &FieldValue::text("B"));
    }

    #[tokio::test]
    async fn test_second_active_version_rejected() {
        let docs = MemoryDocumentStore::new();
        let now = Utc::now();
        let v1 = StoredVersion::first("p-1", record("A"), BTreeSet::new(), now);
        docs.insert(&v1).await.unwrap();

        let dup = StoredVersion::first("p-1", record("B"), BTreeSet::new(), now);
        assert!(docs.insert(&dup).await.is_err());

        let v2 = v1.successor(record("B"), BTreeSet::new(), now);
        docs.supersede(v1.id, &v2).await.unwrap();
        assert!(docs.insert(&dup).await.is_err());
        assert_eq!(docs.find_active("p-1").await.unwrap().unwrap().id, v2.id);
    }

    #[tokio::test]
    async fn test_failed_supersede_changes_nothing() {
        let docs = MemoryDocumentStore::new();
        let v1 = StoredVersion::first("p-1", record("A"), BTreeSet::new(), Utc::now());
        docs.insert(&v1).await.unwrap();

        let orphan = v1.successor(record("B"), BTreeSet::new(), Utc::now());
        assert!(docs.supersede(Uuid::new_v4(), &orphan).await.is_err());

        let all = docs.snapshot().await;
        assert_eq!(all, vec![v1]);
    }
}
