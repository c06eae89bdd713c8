//! Paginated walk over one partition
//!
//! [`FetchLoop::pages`] is a lazy, finite stream. Each step requests the
//! next offset through the retry policy and yields the decoded records.
//! The stream ends at:
//!
//! - the first page with no items,
//! - the first offset past `max_page_offset`, when a cap is set,
//! - retry exhaustion, which is yielded once as
//!   [`IngestError::RetryExhausted`] so the caller can tell a failed
//!   partition from a finished one.

use futures::stream::{self, Stream};
use pdx_common::types::PageWindow;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::client::FetchStrategy;
use super::partition::Partition;
use crate::error::{IngestError, Result};
use crate::partner::PartnerRecord;
use crate::retry::{RetryOutcome, RetryPolicy};

/// One fetched page
#[derive(Debug, Clone)]
pub struct Page {
    pub window: PageWindow,
    pub records: Vec<PartnerRecord>,
    /// Items dropped because they carried no partner id
    pub dropped: usize,
}

impl Page {
    /// Items the directory returned, identifiable or not
    pub fn item_count(&self) -> usize {
        self.records.len() + self.dropped
    }
}

/// Drives a [`FetchStrategy`] through pagination and retries
pub struct FetchLoop {
    strategy: Arc<dyn FetchStrategy>,
    retry: RetryPolicy,
    page_size: u32,
    max_page_offset: Option<u32>,
}

impl FetchLoop {
    pub fn new(strategy: Arc<dyn FetchStrategy>, retry: RetryPolicy, page_size: u32) -> Self {
        Self {
            strategy,
            retry,
            page_size,
            max_page_offset: None,
        }
    }

    pub fn with_max_page_offset(mut self, max_page_offset: Option<u32>) -> Self {
        self.max_page_offset = max_page_offset;
        self
    }

    /// Lazily walk `partition` page by page
    pub fn pages<'a>(&'a self, partition: &'a Partition) -> impl Stream<Item = Result<Page>> + 'a {
        stream::unfold(Some(PageWindow::first(self.page_size)), move |state| async move {
            let window = state?;

            if window.exceeds(self.max_page_offset) {
                info!(partition = %partition.key, offset = window.offset, "Reached page offset cap");
                return None;
            }

            let operation = format!("page {} @ {}", partition.key, window.offset);
            let outcome = self
                .retry
                .attempt(&operation, || self.strategy.fetch_page(partition, window))
                .await;

            match outcome {
                RetryOutcome::Success(items) if items.is_empty() => {
                    debug!(partition = %partition.key, offset = window.offset, "Empty page, partition done");
                    None
                },
                RetryOutcome::Success(items) => {
                    let page = into_page(partition, window, items);
                    Some((Ok(page), Some(window.next())))
                },
                RetryOutcome::Exhausted {
                    attempts,
                    last_error,
                } => {
                    warn!(
                        partition = %partition.key,
                        offset = window.offset,
                        attempts,
                        error = %last_error,
                        "Giving up on partition"
                    );
                    let error = IngestError::RetryExhausted {
                        operation,
                        attempts,
                        last_error: last_error.to_string(),
                    };
                    Some((Err(error), None))
                },
            }
        })
    }

    /// Detail payload for one partner, retried like a page
    pub async fn fetch_details(&self, entity_id: &str) -> Result<Value> {
        let operation = format!("details {entity_id}");
        self.retry
            .attempt(&operation, || self.strategy.fetch_details(entity_id))
            .await
            .into_result(operation)
    }
}

fn into_page(partition: &Partition, window: PageWindow, items: Vec<Value>) -> Page {
    let mut records = Vec::with_capacity(items.len());
    let mut dropped = 0;

    for item in items {
        match PartnerRecord::from_payload(item) {
            Some(record) => records.push(record),
            None => {
                dropped += 1;
                warn!(partition = %partition.key, offset = window.offset, "Skipping item without partner id");
            },
        }
    }

    debug!(
        partition = %partition.key,
        offset = window.offset,
        records = records.len(),
        dropped,
        "Fetched page"
    );

    Page {
        window,
        records,
        dropped,
    }
}
