//! Versioned persistence of normalized partner records
//!
//! Each partner has exactly one active version. Re-observing it either
//! changes nothing, widens its location set in place, or retires it in
//! favour of a successor with the version counter incremented.
//!
//! # Example
//!
//! ```rust,ignore
//! use pdx_ingest::versioning::{MemoryDocumentStore, VersionStore, IngestOutcome};
//!
//! let store = VersionStore::new(Arc::new(MemoryDocumentStore::new()));
//! let outcome = store.ingest("partner-id", record, "US").await?;
//! assert_eq!(outcome, IngestOutcome::New);
//! ```

mod diff;
mod memory;
mod policy;
#[cfg(feature = "database")]
mod postgres;
mod store;
mod types;

pub use diff::changed_fields;
pub use memory::MemoryDocumentStore;
pub use policy::{DefaultVersionPolicy, VersionDecision, VersionPolicy};
#[cfg(feature = "database")]
pub use postgres::PgDocumentStore;
pub use store::{DocumentStore, VersionStore};
pub use types::{IngestOutcome, StoredVersion, VersionStatus};
