//! Directory HTTP access
//!
//! [`FetchStrategy`] is the seam between the fetch loop and the network:
//! "give me the raw items for this partition at this offset". The loop owns
//! pagination and retries; a strategy makes exactly one request per call.

use async_trait::async_trait;
use pdx_common::types::PageWindow;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::partition::Partition;
use crate::config::DirectoryConfig;
use crate::error::{IngestError, Result};
use crate::partner::SearchResponse;

/// Source of raw partner items
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// One page of raw search items. An empty vector means the partition
    /// has no more results.
    async fn fetch_page(&self, partition: &Partition, window: PageWindow) -> Result<Vec<Value>>;

    /// Full detail payload for one partner
    async fn fetch_details(&self, entity_id: &str) -> Result<Value>;
}

/// [`FetchStrategy`] over the public partner directory API
pub struct ApiFetchStrategy {
    client: Client,
    config: DirectoryConfig,
}

impl ApiFetchStrategy {
    pub fn new(config: DirectoryConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("pdx-ingest/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// `filter` query value: `;`-joined `key=value` pairs
    pub fn build_filter(&self, partition: &Partition, window: PageWindow) -> String {
        let mut pairs: Vec<(&str, String)> = Vec::new();

        if let Some(product) = &self.config.product_filter {
            pairs.push(("products", product.clone()));
        }
        pairs.push(("sort", "0".to_string()));
        pairs.push(("pageSize", window.size.to_string()));
        pairs.push(("pageOffset", window.offset.to_string()));
        pairs.push(("radius", self.config.radius.to_string()));
        pairs.extend(partition.facets());
        pairs.push(("locationNotRequired", "true".to_string()));

        pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(";")
    }

    async fn get_json(&self, request: reqwest::RequestBuilder, url: &str) -> Result<Value> {
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl FetchStrategy for ApiFetchStrategy {
    async fn fetch_page(&self, partition: &Partition, window: PageWindow) -> Result<Vec<Value>> {
        let url = self.base_url();
        let filter = self.build_filter(partition, window);
        debug!(partition = %partition.key, offset = window.offset, %filter, "Fetching page");

        let request = self
            .client
            .get(url)
            .query(&[("filter", filter.as_str())])
            .timeout(self.config.page_timeout());

        let body = self.get_json(request, url).await?;
        let response: SearchResponse = serde_json::from_value(body)?;
        Ok(response.matching_partners.items)
    }

    async fn fetch_details(&self, entity_id: &str) -> Result<Value> {
        let url = format!("{}/{}", self.base_url(), entity_id);
        debug!(entity_id, "Fetching partner details");

        let request = self.client.get(&url).timeout(self.config.detail_timeout());
        self.get_json(request, &url).await
    }
}
