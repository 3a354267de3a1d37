// src/feeds/mod.rs
//! Feed fetching. A provider turns one configured feed into a batch of
//! normalized items; any failure (network, status, parse) is logged and
//! yields an empty batch so one broken feed never aborts a collection run.

pub mod parser;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;

use crate::config::{FeedSpec, FEED_FETCH_TIMEOUT_SECS};

/// One article as it came out of a feed, title already normalized. The body
/// keeps its markup; cleanup happens where the text is actually used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub url: String,
    pub description: String,
    pub published: DateTime<Utc>,
    pub source: String,
}

#[async_trait]
pub trait FeedProvider: Send + Sync {
    /// Fetch and parse one feed. Infallible by contract; failures come back
    /// as an empty batch.
    async fn fetch(&self, feed: &FeedSpec) -> Vec<RawItem>;
}

/// Production provider: plain HTTP GET with a bounded timeout, then the
/// RSS/Atom parser.
pub struct HttpFeedProvider {
    http: reqwest::Client,
}

impl HttpFeedProvider {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .user_agent("ai-news-collector/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(FEED_FETCH_TIMEOUT_SECS))
            .build()
            .expect("reqwest client");
        Self { http }
    }
}

impl Default for HttpFeedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedProvider for HttpFeedProvider {
    async fn fetch(&self, feed: &FeedSpec) -> Vec<RawItem> {
        let resp = match self.http.get(&feed.url).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                tracing::warn!(feed = %feed.name, "feed fetch timed out");
                counter!("feed_fetch_errors_total").increment(1);
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(error = ?e, feed = %feed.name, "feed fetch failed");
                counter!("feed_fetch_errors_total").increment(1);
                return Vec::new();
            }
        };

        if !resp.status().is_success() {
            tracing::warn!(status = %resp.status(), feed = %feed.name, "feed returned non-success");
            counter!("feed_fetch_errors_total").increment(1);
            return Vec::new();
        }

        let body = match resp.text().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = ?e, feed = %feed.name, "feed body read failed");
                counter!("feed_fetch_errors_total").increment(1);
                return Vec::new();
            }
        };

        match parser::parse_feed(&body, &feed.name) {
            Ok(items) => {
                counter!("feed_items_total").increment(items.len() as u64);
                tracing::debug!(feed = %feed.name, items = items.len(), "feed fetched");
                items
            }
            Err(e) => {
                tracing::warn!(error = ?e, feed = %feed.name, "feed parse failed");
                counter!("feed_fetch_errors_total").increment(1);
                Vec::new()
            }
        }
    }
}
