//! Error types shared across PDX crates

use thiserror::Error;

/// Result type alias for shared PDX operations
pub type Result<T> = std::result::Result<T, PdxError>;

/// Main error type for the shared crate
#[derive(Error, Debug)]
pub enum PdxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

impl PdxError {
    /// Shorthand for a rejected configuration value
    pub fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        PdxError::InvalidValue {
            field,
            value: value.into(),
        }
    }
}
