//! Bounded retry with a fixed pause between attempts
//!
//! Every network call to the directory goes through [`RetryPolicy::attempt`].
//! A transient failure (transport error, non-2xx status, undecodable body)
//! is followed by a fixed sleep and another attempt, up to `max_retries`
//! attempts in total. The pause also follows the final failure, so an
//! exhausted call always costs `max_retries × delay`.
//!
//! Exhaustion is reported as [`RetryOutcome::Exhausted`] rather than an
//! error so that callers have to decide what it means for them; the fetch
//! loop, for example, must not read it as an empty page.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::IngestError;

/// Result of a retried call
#[derive(Debug)]
pub enum RetryOutcome<T> {
    /// A 2xx response was received and decoded
    Success(T),
    /// No attempt succeeded; `last_error` is the final failure
    Exhausted { attempts: u32, last_error: IngestError },
}

impl<T> RetryOutcome<T> {
    /// Convert exhaustion into [`IngestError::RetryExhausted`]
    pub fn into_result(self, operation: impl Into<String>) -> Result<T, IngestError> {
        match self {
            RetryOutcome::Success(value) => Ok(value),
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => Err(IngestError::RetryExhausted {
                operation: operation.into(),
                attempts,
                last_error: last_error.to_string(),
            }),
        }
    }
}

/// Fixed-delay retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(RetryConfig::default())
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        Self::new(config.max_retries, Duration::from_secs(config.delay_secs))
    }
}

impl RetryPolicy {
    /// `max_retries` is clamped to at least one attempt.
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            delay,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `call` until it succeeds or the attempt budget is spent.
    ///
    /// A non-transient error stops retrying at once and is reported as
    /// exhaustion after the attempts made so far, without sleeping.
    pub async fn attempt<T, F, Fut>(&self, label: &str, mut call: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, IngestError>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(operation = label, attempt, max = self.max_retries, "Attempting call");

            let error = match call().await {
                Ok(value) => return RetryOutcome::Success(value),
                Err(e) => e,
            };

            if !error.is_transient() {
                warn!(operation = label, attempt, error = %error, "Non-retryable failure");
                return RetryOutcome::Exhausted {
                    attempts: attempt,
                    last_error: error,
                };
            }

            warn!(
                operation = label,
                attempt,
                max = self.max_retries,
                error = %error,
                "Attempt failed, retrying in {:?}",
                self.delay
            );
            tokio::time::sleep(self.delay).await;

            if attempt >= self.max_retries {
                return RetryOutcome::Exhausted {
                    attempts: attempt,
                    last_error: error,
                };
            }
        }
    }
}
