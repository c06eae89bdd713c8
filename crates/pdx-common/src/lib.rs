//! PDX Common Library
//!
//! Shared error handling, logging, and small domain types for the partner
//! directory harvester workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`PdxError`] and the [`Result`] alias
//! - **Logging**: `tracing` subscriber setup driven by environment variables
//! - **Types**: pagination windows
//!
//! # Example
//!
//! ```no_run
//! use pdx_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> pdx_common::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     let _guard = init_logging(&config)?;
//!     tracing::info!("harvester started");
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{PdxError, Result};
