//! Error types for partner ingestion

use thiserror::Error;

/// Result type for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Error types for partner ingestion
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Dedup index error: {0}")]
    Dedup(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[cfg(feature = "database")]
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

impl IngestError {
    /// Whether the failure is worth another attempt.
    ///
    /// Transport errors, non-2xx statuses and undecodable bodies are
    /// transient from the directory's point of view; everything else is not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            IngestError::Http(_) | IngestError::Status { .. } | IngestError::Decode(_)
        )
    }
}
