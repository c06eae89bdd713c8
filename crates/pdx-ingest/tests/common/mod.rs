//! Shared helpers for pdx-ingest integration tests

#![allow(dead_code)]

use pdx_ingest::config::DirectoryConfig;
use pdx_ingest::directory::{ApiFetchStrategy, FetchLoop};
use pdx_ingest::retry::RetryPolicy;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::{Match, MockServer, Request};

/// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pdx_ingest=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Matches requests whose `filter` query contains every given `key=value`
pub struct FilterHas(Vec<String>);

impl FilterHas {
    pub fn letter(letter: char, offset: u32) -> Self {
        Self(vec![format!("freetext={letter}"), format!("pageOffset={offset}")])
    }

    pub fn any_offset(letter: char) -> Self {
        Self(vec![format!("freetext={letter}")])
    }
}

impl Match for FilterHas {
    fn matches(&self, request: &Request) -> bool {
        let Some((_, filter)) = request.url.query_pairs().find(|(k, _)| k == "filter") else {
            return false;
        };
        let pairs: Vec<&str> = filter.split(';').collect();
        self.0.iter().all(|wanted| pairs.contains(&wanted.as_str()))
    }
}

/// Search response envelope around `items`
pub fn search_page(items: Vec<Value>) -> Value {
    json!({ "matchingPartners": { "items": items } })
}

/// `count` search items with ids `{prefix}-{start}..`
pub fn partners(prefix: &str, start: usize, count: usize) -> Vec<Value> {
    (start..start + count)
        .map(|i| {
            json!({
                "partnerId": format!("{prefix}-{i}"),
                "name": format!("Partner {i}"),
                "description": "Cloud consulting",
                "industryFocus": ["Retail", "Manufacturing"]
            })
        })
        .collect()
}

pub fn directory_config(server: &MockServer) -> DirectoryConfig {
    DirectoryConfig {
        base_url: format!("{}/api/partners", server.uri()),
        page_timeout_secs: 5,
        detail_timeout_secs: 5,
        ..Default::default()
    }
}

/// Short fixed delay so exhaustion tests finish quickly on a real clock
pub fn quick_retry() -> RetryPolicy {
    RetryPolicy::new(5, Duration::from_millis(10))
}

pub fn fetch_loop(server: &MockServer) -> FetchLoop {
    let strategy = ApiFetchStrategy::new(directory_config(server)).unwrap();
    FetchLoop::new(Arc::new(strategy), quick_retry(), 18)
}
