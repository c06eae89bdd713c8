//! Ingestion orchestrator
//!
//! Walks partitions in order and pushes every fetched partner through
//! dedup, optional detail enrichment, normalization and the version store.
//! A failing record is logged and counted without stopping its partition;
//! a partition whose page fetch exhausts its retries is reported as
//! aborted and the run moves on to the next one.

use futures::{pin_mut, StreamExt};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::config::IngestConfig;
use crate::dedup::{DedupIndex, DedupScope};
use crate::directory::{FetchLoop, FetchStrategy, Partition};
use crate::error::Result;
use crate::partner::{normalize, PartnerRecord};
use crate::retry::RetryPolicy;
use crate::versioning::{IngestOutcome, VersionStore};

/// How a partition walk ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum PartitionStatus {
    Completed,
    Aborted(String),
}

impl fmt::Display for PartitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionStatus::Completed => write!(f, "completed"),
            PartitionStatus::Aborted(reason) => write!(f, "aborted: {reason}"),
        }
    }
}

/// Counters for one partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionReport {
    pub partition: String,
    pub pages: usize,
    pub items_seen: usize,
    /// Items without a partner id
    pub dropped: usize,
    /// Already in the dedup index
    pub skipped: usize,
    pub new: usize,
    pub unchanged: usize,
    pub location_only: usize,
    pub changed: usize,
    pub failed: usize,
    pub status: PartitionStatus,
}

impl PartitionReport {
    fn new(partition: &Partition) -> Self {
        Self {
            partition: partition.key.clone(),
            pages: 0,
            items_seen: 0,
            dropped: 0,
            skipped: 0,
            new: 0,
            unchanged: 0,
            location_only: 0,
            changed: 0,
            failed: 0,
            status: PartitionStatus::Completed,
        }
    }

    fn record_outcome(&mut self, outcome: IngestOutcome) {
        match outcome {
            IngestOutcome::New => self.new += 1,
            IngestOutcome::Unchanged => self.unchanged += 1,
            IngestOutcome::LocationOnlyUpdate => self.location_only += 1,
            IngestOutcome::Changed => self.changed += 1,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.status, PartitionStatus::Aborted(_))
    }
}

/// Summed counters across partitions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    pub pages: usize,
    pub items_seen: usize,
    pub dropped: usize,
    pub skipped: usize,
    pub new: usize,
    pub unchanged: usize,
    pub location_only: usize,
    pub changed: usize,
    pub failed: usize,
    pub completed_partitions: usize,
    pub aborted_partitions: usize,
}

/// Result of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub partitions: Vec<PartitionReport>,
}

impl RunSummary {
    pub fn totals(&self) -> RunTotals {
        self.partitions
            .iter()
            .fold(RunTotals::default(), |mut t, p| {
                t.pages += p.pages;
                t.items_seen += p.items_seen;
                t.dropped += p.dropped;
                t.skipped += p.skipped;
                t.new += p.new;
                t.unchanged += p.unchanged;
                t.location_only += p.location_only;
                t.changed += p.changed;
                t.failed += p.failed;
                if p.is_aborted() {
                    t.aborted_partitions += 1;
                } else {
                    t.completed_partitions += 1;
                }
                t
            })
    }

    pub fn aborted(&self) -> impl Iterator<Item = &PartitionReport> {
        self.partitions.iter().filter(|p| p.is_aborted())
    }

    pub fn has_aborted(&self) -> bool {
        self.aborted().next().is_some()
    }
}

/// Drives partitions through fetch, dedup and versioning
pub struct IngestionOrchestrator {
    fetch: FetchLoop,
    versions: VersionStore,
    dedup: Arc<dyn DedupIndex>,
    dedup_scope: DedupScope,
    fetch_details: bool,
    record_delay: Duration,
    partition_delay: Duration,
}

impl IngestionOrchestrator {
    pub fn new(fetch: FetchLoop, versions: VersionStore, dedup: Arc<dyn DedupIndex>) -> Self {
        Self {
            fetch,
            versions,
            dedup,
            dedup_scope: DedupScope::Global,
            fetch_details: false,
            record_delay: Duration::ZERO,
            partition_delay: Duration::ZERO,
        }
    }

    /// Wire an orchestrator from configuration and injected collaborators
    pub fn from_config(
        config: &IngestConfig,
        strategy: Arc<dyn FetchStrategy>,
        versions: VersionStore,
        dedup: Arc<dyn DedupIndex>,
    ) -> Self {
        let fetch = FetchLoop::new(
            strategy,
            RetryPolicy::from(config.retry),
            config.directory.page_size,
        )
        .with_max_page_offset(config.directory.max_page_offset);

        Self::new(fetch, versions, dedup)
            .with_dedup_scope(config.dedup_scope)
            .with_fetch_details(config.fetch_details)
            .with_delays(config.record_delay(), config.partition_delay())
    }

    pub fn with_dedup_scope(mut self, scope: DedupScope) -> Self {
        self.dedup_scope = scope;
        self
    }

    pub fn with_fetch_details(mut self, enabled: bool) -> Self {
        self.fetch_details = enabled;
        self
    }

    pub fn with_delays(mut self, record: Duration, partition: Duration) -> Self {
        self.record_delay = record;
        self.partition_delay = partition;
        self
    }

    /// Walk every partition in order
    pub async fn run(&self, partitions: &[Partition]) -> RunSummary {
        info!(partitions = partitions.len(), "Starting ingestion run");

        let mut summary = RunSummary::default();
        for (i, partition) in partitions.iter().enumerate() {
            if i > 0 && !self.partition_delay.is_zero() {
                sleep(self.partition_delay).await;
            }
            summary.partitions.push(self.run_partition(partition).await);
        }

        let totals = summary.totals();
        info!(
            new = totals.new,
            changed = totals.changed,
            location_only = totals.location_only,
            unchanged = totals.unchanged,
            skipped = totals.skipped,
            failed = totals.failed,
            aborted = totals.aborted_partitions,
            "Ingestion run completed"
        );

        summary
    }

    #[instrument(skip(self, partition), fields(partition = %partition.key))]
    async fn run_partition(&self, partition: &Partition) -> PartitionReport {
        info!("Walking {partition}");
        let mut report = PartitionReport::new(partition);

        let pages = self.fetch.pages(partition);
        pin_mut!(pages);

        while let Some(page) = pages.next().await {
            let page = match page {
                Ok(page) => page,
                Err(e) => {
                    error!(error = %e, "Partition aborted");
                    report.status = PartitionStatus::Aborted(e.to_string());
                    break;
                },
            };

            report.pages += 1;
            report.items_seen += page.item_count();
            report.dropped += page.dropped;

            for record in page.records {
                let entity_id = record.entity_id.clone();
                match self.process_record(partition, record).await {
                    Ok(None) => report.skipped += 1,
                    Ok(Some(outcome)) => {
                        report.record_outcome(outcome);
                        self.throttle().await;
                    },
                    Err(e) => {
                        warn!(entity_id = %entity_id, error = %e, "Failed to ingest partner");
                        report.failed += 1;
                        self.throttle().await;
                    },
                }
            }
        }

        info!(
            pages = report.pages,
            items = report.items_seen,
            new = report.new,
            changed = report.changed,
            failed = report.failed,
            status = %report.status,
            "Partition finished"
        );
        report
    }

    /// `None` when the partner was already processed
    async fn process_record(
        &self,
        partition: &Partition,
        record: PartnerRecord,
    ) -> Result<Option<IngestOutcome>> {
        let key = self.dedup_scope.key(&partition.label, &record.entity_id);
        if self.dedup.contains(&key)? {
            debug!(entity_id = %record.entity_id, "Already processed, skipping");
            return Ok(None);
        }

        let payload = if self.fetch_details {
            self.fetch.fetch_details(&record.entity_id).await?
        } else {
            record.payload
        };

        let normalized = normalize(&payload);
        let outcome = self
            .versions
            .ingest(&record.entity_id, normalized, &partition.label)
            .await?;

        debug!(entity_id = %record.entity_id, outcome = %outcome, "Ingested partner");

        if outcome.wrote() {
            self.dedup.mark(&key)?;
        }
        Ok(Some(outcome))
    }

    async fn throttle(&self) {
        if !self.record_delay.is_zero() {
            sleep(self.record_delay).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dedup::MemoryDedupIndex;
    use crate::error::IngestError;
    use crate::versioning::MemoryDocumentStore;
    use async_trait::async_trait;
    use pdx_common::types::PageWindow;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// One page per partition label, then empty; optional failing labels
    #[derive(Default)]
    struct FakeDirectory {
        pages: HashMap<String, Vec<Value>>,
        failing: Vec<String>,
        detail_calls: AtomicUsize,
    }

    #[async_trait]
    impl FetchStrategy for FakeDirectory {
        async fn fetch_page(&self, partition: &Partition, window: PageWindow) -> Result<Vec<Value>> {
            if self.failing.contains(&partition.key) {
                return Err(IngestError::Status {
                    status: 500,
                    url: "fake".to_string(),
                });
            }
            if window.offset > 0 {
                return Ok(Vec::new());
            }
            Ok(self.pages.get(&partition.key).cloned().unwrap_or_default())
        }

        async fn fetch_details(&self, entity_id: &str) -> Result<Value> {
            self.detail_calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"partnerDetails": {"id": entity_id, "name": "Detailed", "description": "full"}}))
        }
    }

    fn orchestrator(
        directory: Arc<FakeDirectory>,
        docs: Arc<MemoryDocumentStore>,
        dedup: Arc<dyn DedupIndex>,
    ) -> IngestionOrchestrator {
        let fetch = FetchLoop::new(directory, RetryPolicy::new(2, Duration::from_secs(30)), 18);
        IngestionOrchestrator::new(fetch, VersionStore::new(docs), dedup)
    }

    fn partner(id: &str, description: &str) -> Value {
        json!({"partnerId": id, "name": format!("Partner {id}"), "description": description})
    }

    #[tokio::test(start_paused = true)]
    async fn test_location_merge_across_partitions() {
        let mut directory = FakeDirectory::default();
        directory.pages.insert("US".into(), vec![partner("p-1", "A")]);
        directory.pages.insert("GB".into(), vec![partner("p-1", "A")]);
        let docs = Arc::new(MemoryDocumentStore::new());
        let dedup: Arc<dyn DedupIndex> = Arc::new(MemoryDedupIndex::new());

        let orch = orchestrator(Arc::new(directory), docs.clone(), dedup)
            .with_dedup_scope(DedupScope::PerPartition);
        let summary = orch
            .run(&[Partition::country("United States", "US"), Partition::country("United Kingdom", "GB")])
            .await;

        let totals = summary.totals();
        assert_eq!(totals.new, 1);
        assert_eq!(totals.location_only, 1);
        let all = docs.snapshot().await;
        assert_eq!(all.len(), 1);
        assert!(all[0].locations.contains("US") && all[0].locations.contains("GB"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_global_dedup_skips_second_partition() {
        let mut directory = FakeDirectory::default();
        directory.pages.insert("a".into(), vec![partner("p-1", "A")]);
        directory.pages.insert("b".into(), vec![partner("p-1", "A")]);
        let docs = Arc::new(MemoryDocumentStore::new());
        let dedup: Arc<dyn DedupIndex> = Arc::new(MemoryDedupIndex::new());

        let summary = orchestrator(Arc::new(directory), docs, dedup)
            .run(&[Partition::letter('a'), Partition::letter('b')])
            .await;

        assert_eq!(summary.partitions[0].new, 1);
        assert_eq!(summary.partitions[1].skipped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_partner_is_not_marked_processed() {
        let item = partner("p-4", "Same as before");
        let mut directory = FakeDirectory::default();
        directory.pages.insert("a".into(), vec![item.clone()]);
        let docs = Arc::new(MemoryDocumentStore::new());
        VersionStore::new(docs.clone())
            .ingest("p-4", normalize(&item), "a")
            .await
            .unwrap();
        let dedup = Arc::new(MemoryDedupIndex::new());

        let summary = orchestrator(Arc::new(directory), docs.clone(), dedup.clone())
            .run(&[Partition::letter('a')])
            .await;

        let report = &summary.partitions[0];
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.new + report.changed + report.location_only, 0);
        assert!(dedup.is_empty());
        assert_eq!(docs.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_partition_does_not_stop_run() {
        let mut directory = FakeDirectory::default();
        directory.failing.push("a".into());
        directory.pages.insert("b".into(), vec![partner("p-2", "B")]);
        let docs = Arc::new(MemoryDocumentStore::new());
        let dedup: Arc<dyn DedupIndex> = Arc::new(MemoryDedupIndex::new());

        let summary = orchestrator(Arc::new(directory), docs, dedup)
            .run(&[Partition::letter('a'), Partition::letter('b')])
            .await;

        assert!(summary.partitions[0].is_aborted());
        assert_eq!(summary.partitions[1].status, PartitionStatus::Completed);
        assert_eq!(summary.partitions[1].new, 1);
        assert!(summary.has_aborted());
        assert_eq!(summary.totals().aborted_partitions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detail_enrichment_replaces_search_payload() {
        let mut directory = FakeDirectory::default();
        directory.pages.insert("a".into(), vec![partner("p-3", "short")]);
        let directory = Arc::new(directory);
        let docs = Arc::new(MemoryDocumentStore::new());
        let dedup: Arc<dyn DedupIndex> = Arc::new(MemoryDedupIndex::new());

        orchestrator(directory.clone(), docs.clone(), dedup)
            .with_fetch_details(true)
            .run(&[Partition::letter('a')])
            .await;

        assert_eq!(directory.detail_calls.load(Ordering::SeqCst), 1);
        let stored = docs.snapshot().await;
        assert_eq!(stored[0].record.name(), "Detailed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_delay_throttles() {
        let mut directory = FakeDirectory::default();
        directory
            .pages
            .insert("a".into(), vec![partner("p-1", "A"), partner("p-2", "B")]);
        let docs = Arc::new(MemoryDocumentStore::new());
        let dedup: Arc<dyn DedupIndex> = Arc::new(MemoryDedupIndex::new());

        let start = tokio::time::Instant::now();
        orchestrator(Arc::new(directory), docs, dedup)
            .with_delays(Duration::from_secs(1), Duration::ZERO)
            .run(&[Partition::letter('a')])
            .await;

        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }
}
