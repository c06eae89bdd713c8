//! Ingestion configuration
//!
//! All knobs for a harvesting run: directory endpoint, pagination, retry
//! policy, throttling, dedup persistence and (with the `database` feature)
//! the PostgreSQL connection.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::dedup::DedupScope;
use crate::error::{IngestError, Result};

// ============================================================================
// Defaults
// ============================================================================

/// Directory search endpoint; detail records live at `{base}/{partnerId}`.
pub const DEFAULT_API_BASE_URL: &str =
    "https://main.prod.marketplacepartnerdirectory.azure.com/api/partners";

/// Items per page. The directory ignores larger values.
pub const DEFAULT_PAGE_SIZE: u32 = 18;

/// Search radius sent with every query.
pub const DEFAULT_RADIUS: u32 = 100;

/// Attempts per network call before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Fixed pause after each failed attempt.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 30;

/// Per-request timeout for search pages.
pub const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 30;

/// Per-request timeout for partner detail calls.
pub const DEFAULT_DETAIL_TIMEOUT_SECS: u64 = 60;

/// Pause between records to throttle outbound requests.
pub const DEFAULT_RECORD_DELAY_MS: u64 = 1000;

/// Append-only log of processed partner ids.
pub const DEFAULT_DEDUP_FILE: &str = "processed_ids.txt";

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/pdx";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Directory API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    pub base_url: String,
    pub page_size: u32,
    pub radius: u32,
    /// Stop walking a partition after the page at this offset
    pub max_page_offset: Option<u32>,
    /// Optional `products=` facet, e.g. "Azure"
    pub product_filter: Option<String>,
    pub page_timeout_secs: u64,
    pub detail_timeout_secs: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            radius: DEFAULT_RADIUS,
            max_page_offset: None,
            product_filter: None,
            page_timeout_secs: DEFAULT_PAGE_TIMEOUT_SECS,
            detail_timeout_secs: DEFAULT_DETAIL_TIMEOUT_SECS,
        }
    }
}

impl DirectoryConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn detail_timeout(&self) -> Duration {
        Duration::from_secs(self.detail_timeout_secs)
    }
}

/// Retry settings shared by page and detail calls
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay_secs: DEFAULT_RETRY_DELAY_SECS,
        }
    }
}

/// PostgreSQL settings for the versioned store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
        }
    }
}

/// Main ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub directory: DirectoryConfig,
    pub retry: RetryConfig,
    pub record_delay_ms: u64,
    pub partition_delay_ms: u64,
    /// Replace search items with the full detail payload before normalizing
    pub fetch_details: bool,
    pub dedup_file: PathBuf,
    pub dedup_scope: DedupScope,
    pub database: DatabaseConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            directory: DirectoryConfig::default(),
            retry: RetryConfig::default(),
            record_delay_ms: DEFAULT_RECORD_DELAY_MS,
            partition_delay_ms: 0,
            fetch_details: false,
            dedup_file: PathBuf::from(DEFAULT_DEDUP_FILE),
            dedup_scope: DedupScope::Global,
            database: DatabaseConfig::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    parse_value(key, env_opt(key).as_deref()).unwrap_or(default)
}

/// Parse a set value, warning and yielding `None` when it is malformed
fn parse_value<T: std::str::FromStr>(key: &str, raw: Option<&str>) -> Option<T> {
    let raw = raw?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = raw, "Ignoring malformed environment value, using default");
            None
        },
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl IngestConfig {
    /// Load configuration from environment variables (and `.env` if present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let dedup_scope = match env_opt("PDX_DEDUP_SCOPE") {
            Some(scope) => scope.parse()?,
            None => defaults.dedup_scope,
        };

        let config = Self {
            directory: DirectoryConfig {
                base_url: env_opt("PDX_API_BASE_URL").unwrap_or(defaults.directory.base_url),
                page_size: env_parse("PDX_PAGE_SIZE", DEFAULT_PAGE_SIZE),
                radius: env_parse("PDX_RADIUS", DEFAULT_RADIUS),
                max_page_offset: parse_value(
                    "PDX_MAX_PAGE_OFFSET",
                    env_opt("PDX_MAX_PAGE_OFFSET").as_deref(),
                ),
                product_filter: env_opt("PDX_PRODUCT_FILTER"),
                page_timeout_secs: env_parse("PDX_PAGE_TIMEOUT_SECS", DEFAULT_PAGE_TIMEOUT_SECS),
                detail_timeout_secs: env_parse(
                    "PDX_DETAIL_TIMEOUT_SECS",
                    DEFAULT_DETAIL_TIMEOUT_SECS,
                ),
            },
            retry: RetryConfig {
                max_retries: env_parse("PDX_MAX_RETRIES", DEFAULT_MAX_RETRIES),
                delay_secs: env_parse("PDX_RETRY_DELAY_SECS", DEFAULT_RETRY_DELAY_SECS),
            },
            record_delay_ms: env_parse("PDX_RECORD_DELAY_MS", DEFAULT_RECORD_DELAY_MS),
            partition_delay_ms: env_parse("PDX_PARTITION_DELAY_MS", 0),
            fetch_details: env_parse("PDX_FETCH_DETAILS", false),
            dedup_file: env_opt("PDX_DEDUP_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.dedup_file),
            dedup_scope,
            database: DatabaseConfig {
                url: env_opt("DATABASE_URL").unwrap_or(defaults.database.url),
                max_connections: env_parse(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.directory.base_url.is_empty() {
            return Err(IngestError::Config("PDX_API_BASE_URL cannot be empty".into()));
        }
        if self.directory.page_size == 0 {
            return Err(IngestError::Config("PDX_PAGE_SIZE must be greater than 0".into()));
        }
        if self.retry.max_retries == 0 {
            return Err(IngestError::Config("PDX_MAX_RETRIES must be greater than 0".into()));
        }
        if self.directory.page_timeout_secs == 0 || self.directory.detail_timeout_secs == 0 {
            return Err(IngestError::Config("Request timeouts must be greater than 0".into()));
        }
        if self.database.max_connections == 0 {
            return Err(IngestError::Config(
                "DATABASE_MAX_CONNECTIONS must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn record_delay(&self) -> Duration {
        Duration::from_millis(self.record_delay_ms)
    }

    pub fn partition_delay(&self) -> Duration {
        Duration::from_millis(self.partition_delay_ms)
    }
}

/// Builder for IngestConfig
#[derive(Debug, Default)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.directory.base_url = url.into();
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.config.directory.page_size = size;
        self
    }

    pub fn max_page_offset(mut self, offset: Option<u32>) -> Self {
        self.config.directory.max_page_offset = offset;
        self
    }

    pub fn product_filter(mut self, product: impl Into<String>) -> Self {
        self.config.directory.product_filter = Some(product.into());
        self
    }

    pub fn retry(mut self, max_retries: u32, delay_secs: u64) -> Self {
        self.config.retry = RetryConfig {
            max_retries,
            delay_secs,
        };
        self
    }

    pub fn record_delay_ms(mut self, ms: u64) -> Self {
        self.config.record_delay_ms = ms;
        self
    }

    pub fn partition_delay_ms(mut self, ms: u64) -> Self {
        self.config.partition_delay_ms = ms;
        self
    }

    pub fn fetch_details(mut self, enabled: bool) -> Self {
        self.config.fetch_details = enabled;
        self
    }

    pub fn dedup_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.dedup_file = path.into();
        self
    }

    pub fn dedup_scope(mut self, scope: DedupScope) -> Self {
        self.config.dedup_scope = scope;
        self
    }

    pub fn build(self) -> Result<IngestConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_directory_limits() {
        let config = IngestConfig::default();
        assert_eq!(config.directory.page_size, 18);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.delay_secs, 30);
        assert_eq!(config.directory.page_timeout(), Duration::from_secs(30));
        assert_eq!(config.directory.detail_timeout(), Duration::from_secs(60));
        assert_eq!(config.record_delay(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_values_fall_back() {
        assert_eq!(parse_value::<u32>("PDX_PAGE_SIZE", Some("abc")), None);
        assert_eq!(parse_value::<u32>("PDX_PAGE_SIZE", Some("24")), Some(24));
        assert_eq!(parse_value::<u32>("PDX_PAGE_SIZE", None), None);
        assert_eq!(parse_value::<bool>("PDX_FETCH_DETAILS", Some("yes")), None);
        assert_eq!(parse_value("PDX_PAGE_SIZE", Some("abc")).unwrap_or(DEFAULT_PAGE_SIZE), 18);
    }

    #[test]
    fn test_builder_rejects_zero_page_size() {
        let result = IngestConfig::builder().page_size(0).build();
        assert!(matches!(result, Err(IngestError::Config(_))));
    }

    #[test]
    fn test_builder_rejects_zero_retries() {
        let result = IngestConfig::builder().retry(0, 1).build();
        assert!(matches!(result, Err(IngestError::Config(_))));
    }

    #[test]
    fn test_builder_overrides() {
        let config = IngestConfig::builder()
            .base_url("http://127.0.0.1:9000/api/partners")
            .max_page_offset(Some(90))
            .product_filter("Azure")
            .record_delay_ms(0)
            .dedup_scope(DedupScope::PerPartition)
            .build()
            .unwrap();

        assert_eq!(config.directory.base_url, "http://127.0.0.1:9000/api/partners");
        assert_eq!(config.directory.max_page_offset, Some(90));
        assert_eq!(config.directory.product_filter.as_deref(), Some("Azure"));
        assert_eq!(config.record_delay(), Duration::ZERO);
        assert_eq!(config.dedup_scope, DedupScope::PerPartition);
    }
}
