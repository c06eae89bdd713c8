//! Partner directory access: partitioning, HTTP strategy and pagination

pub mod client;
pub mod fetch_loop;
pub mod partition;

pub use client::{ApiFetchStrategy, FetchStrategy};
pub use fetch_loop::{FetchLoop, Page};
pub use partition::{Partition, PartitionKind, PartitionScheme, COUNTRIES};
