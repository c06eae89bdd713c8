//! End-to-end runs against a mocked directory with in-memory storage

mod common;

use common::{directory_config, init_tracing, partners, quick_retry, search_page, FilterHas};
use pdx_ingest::dedup::{DedupIndex, FileDedupIndex};
use pdx_ingest::directory::{ApiFetchStrategy, FetchLoop, Partition};
use pdx_ingest::orchestrator::{IngestionOrchestrator, PartitionStatus};
use pdx_ingest::versioning::{MemoryDocumentStore, VersionStore};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn orchestrator(
    server: &MockServer,
    docs: Arc<MemoryDocumentStore>,
    dedup_path: &Path,
) -> IngestionOrchestrator {
    let strategy = ApiFetchStrategy::new(directory_config(server)).unwrap();
    let fetch = FetchLoop::new(Arc::new(strategy), quick_retry(), 18);
    let dedup: Arc<dyn DedupIndex> = Arc::new(FileDedupIndex::open(dedup_path).unwrap());
    IngestionOrchestrator::new(fetch, VersionStore::new(docs), dedup)
}

async fn mount_letter(server: &MockServer, letter: char, items: Vec<serde_json::Value>) {
    Mock::given(method("GET"))
        .and(FilterHas::letter(letter, 0))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(items)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(FilterHas::letter(letter, 18))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(vec![])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_dedup_skips_across_runs() {
    init_tracing();
    let server = MockServer::start().await;
    mount_letter(&server, 'a', partners("p", 0, 3)).await;

    let dir = TempDir::new().unwrap();
    let dedup_path = dir.path().join("processed_ids.txt");
    let docs = Arc::new(MemoryDocumentStore::new());

    let first = orchestrator(&server, docs.clone(), &dedup_path)
        .run(&[Partition::letter('a')])
        .await;
    assert_eq!(first.totals().new, 3);
    assert_eq!(first.totals().skipped, 0);

    // Fresh index instance reads the persisted log
    let second = orchestrator(&server, docs.clone(), &dedup_path)
        .run(&[Partition::letter('a')])
        .await;
    assert_eq!(second.totals().skipped, 3);
    assert_eq!(second.totals().new, 0);
    assert_eq!(second.totals().unchanged, 0);

    assert_eq!(docs.len().await, 3);
    let log = std::fs::read_to_string(&dedup_path).unwrap();
    assert_eq!(log.lines().count(), 3);
}

#[tokio::test]
async fn test_aborted_partition_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(FilterHas::any_offset('a'))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_letter(&server, 'b', partners("b", 0, 2)).await;

    let dir = TempDir::new().unwrap();
    let docs = Arc::new(MemoryDocumentStore::new());

    let summary = orchestrator(&server, docs.clone(), &dir.path().join("ids.txt"))
        .run(&[Partition::letter('a'), Partition::letter('b')])
        .await;

    assert!(matches!(summary.partitions[0].status, PartitionStatus::Aborted(_)));
    assert_eq!(summary.partitions[0].pages, 0);
    assert_eq!(summary.partitions[1].status, PartitionStatus::Completed);
    assert_eq!(summary.partitions[1].new, 2);
    assert!(summary.has_aborted());
}

#[tokio::test]
async fn test_detail_enrichment_and_record_isolation() {
    let server = MockServer::start().await;
    mount_letter(
        &server,
        'e',
        vec![json!({"partnerId": "ok-1"}), json!({"partnerId": "broken-1"})],
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/api/partners/ok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "partnerDetails": {
                "id": "ok-1",
                "name": "Northwind Traders",
                "description": "Full profile",
                "solutions": ["Data & AI", "Security"]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/partners/broken-1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let docs = Arc::new(MemoryDocumentStore::new());

    let summary = orchestrator(&server, docs.clone(), &dir.path().join("ids.txt"))
        .with_fetch_details(true)
        .run(&[Partition::letter('e')])
        .await;

    let report = &summary.partitions[0];
    assert_eq!(report.new, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.status, PartitionStatus::Completed);

    let stored = docs.snapshot().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].entity_id, "ok-1");
    assert_eq!(stored[0].record.name(), "Northwind Traders");
}
