//! Partner records
//!
//! Raw directory payloads, the canonical field schema, and the normalizer
//! that projects one onto the other.

pub mod models;
pub mod normalizer;
pub mod schema;

pub use models::{FieldValue, NormalizedRecord, PartnerRecord, SearchResponse, UNAVAILABLE};
pub use normalizer::normalize;
pub use schema::{FieldKind, FieldSpec, FIELDS};
