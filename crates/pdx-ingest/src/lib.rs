//! PDX Ingest Library
//!
//! Harvests the public partner directory partition by partition and keeps
//! a versioned history of every partner it sees.
//!
//! # Pipeline
//!
//! - [`directory`]: partition schemes, HTTP fetch strategy, paginated walk
//! - [`retry`]: bounded fixed-delay retry around every network call
//! - [`dedup`]: persistent index of already-processed partner ids
//! - [`partner`]: canonical field schema and normalizer
//! - [`versioning`]: one-active-version store with location merging
//! - [`orchestrator`]: ties the above together and reports per partition
//!
//! # Example
//!
//! ```no_run
//! use pdx_ingest::dedup::FileDedupIndex;
//! use pdx_ingest::directory::{ApiFetchStrategy, PartitionScheme};
//! use pdx_ingest::orchestrator::IngestionOrchestrator;
//! use pdx_ingest::versioning::{MemoryDocumentStore, VersionStore};
//! use pdx_ingest::IngestConfig;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::from_env()?;
//!     let strategy = Arc::new(ApiFetchStrategy::new(config.directory.clone())?);
//!     let versions = VersionStore::new(Arc::new(MemoryDocumentStore::new()));
//!     let dedup = Arc::new(FileDedupIndex::open(&config.dedup_file)?);
//!
//!     let orchestrator = IngestionOrchestrator::from_config(&config, strategy, versions, dedup);
//!     let summary = orchestrator.run(&PartitionScheme::Letters.enumerate()).await;
//!     println!("{} new partners", summary.totals().new);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod dedup;
pub mod directory;
pub mod error;
pub mod orchestrator;
pub mod partner;
pub mod retry;
pub mod versioning;

pub use config::IngestConfig;
pub use error::{IngestError, Result};
