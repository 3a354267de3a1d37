// src/collector.rs
//! The collection run: feeds -> dedup -> classify -> image -> insert. Items
//! are independent; every per-item failure is logged and the run moves on.
//! The only fatal condition is a classifier with no usable credentials,
//! checked before any feed is touched.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::classify::Classifier;
use crate::config::{CollectorConfig, FeedSpec};
use crate::feeds::{FeedProvider, RawItem};
use crate::images::ImageResolver;
use crate::store::{InsertOutcome, NewNewsRecord, NewsStore};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("collect_runs_total", "Completed collection runs.");
        describe_counter!("collect_items_total", "Valid feed items considered per run.");
        describe_counter!("collect_saved_total", "Items accepted and stored.");
        describe_counter!("collect_filtered_total", "Items rejected by the relevance gate.");
        describe_counter!("collect_duplicate_total", "Items skipped as already known.");
        describe_counter!("collect_store_errors_total", "Insert failures other than duplicates.");
        describe_counter!("feed_items_total", "Items parsed out of feeds.");
        describe_counter!("feed_fetch_errors_total", "Feed fetch/parse failures.");
        describe_histogram!("feed_parse_ms", "Feed parse time in milliseconds.");
        describe_counter!("classify_fallback_total", "Ladder advances to the next model.");
        describe_counter!("classify_rate_limited_total", "429 responses from LLM providers.");
        describe_counter!("classify_exhausted_total", "Items the whole ladder failed on.");
        describe_counter!("image_from_page_total", "Images taken from article page metadata.");
        describe_counter!("image_from_search_total", "Images taken from keyword search.");
        describe_counter!("image_generated_total", "Placeholder images generated.");
        describe_gauge!("collect_last_run_ts", "Unix ts when a collection last finished.");
    });
}

/// What one run did. Every valid item lands in exactly one of saved,
/// filtered, or duplicate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub collected: u64,
    pub saved: u64,
    pub filtered: u64,
    pub duplicate: u64,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "collected={} saved={} filtered={} duplicate={}",
            self.collected, self.saved, self.filtered, self.duplicate
        )
    }
}

pub struct NewsCollector {
    feeds: Vec<FeedSpec>,
    fetcher: Arc<dyn FeedProvider>,
    classifier: Arc<dyn Classifier>,
    images: Arc<dyn ImageResolver>,
    store: Arc<dyn NewsStore>,
    item_limit: usize,
    pacing: Duration,
}

impl NewsCollector {
    pub fn new(
        cfg: &CollectorConfig,
        fetcher: Arc<dyn FeedProvider>,
        classifier: Arc<dyn Classifier>,
        images: Arc<dyn ImageResolver>,
        store: Arc<dyn NewsStore>,
    ) -> Self {
        Self {
            feeds: cfg.feeds.clone(),
            fetcher,
            classifier,
            images,
            store,
            item_limit: cfg.feed_item_limit,
            pacing: cfg.classify_pacing,
        }
    }

    /// Run one collection over all configured feeds. Re-running against
    /// unchanged feeds is safe: everything already stored comes back as a
    /// duplicate.
    pub async fn run(&self) -> Result<RunSummary> {
        ensure_metrics_described();
        self.classifier.preflight()?;

        let mut summary = RunSummary::default();
        // URLs touched this run; catches the same article cross-posted by
        // two feeds before the store has a row for it.
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut classify_calls = 0u64;

        for feed in &self.feeds {
            let items = self.fetcher.fetch(feed).await;
            let batch: Vec<RawItem> = items.into_iter().take(self.item_limit).collect();
            tracing::info!(feed = %feed.name, items = batch.len(), "processing feed");

            for item in batch {
                // the parser already drops these; a custom provider may not
                if item.title.is_empty() || item.url.is_empty() {
                    continue;
                }
                summary.collected += 1;

                if !seen_urls.insert(item.url.clone()) {
                    summary.duplicate += 1;
                    continue;
                }
                if self.already_known(&item.url).await {
                    summary.duplicate += 1;
                    continue;
                }

                if classify_calls > 0 && !self.pacing.is_zero() {
                    tokio::time::sleep(self.pacing).await;
                }
                classify_calls += 1;
                let verdict = self.classifier.classify(&item.title, &item.description).await;

                if !verdict.is_relevant {
                    tracing::debug!(
                        title = %item.title,
                        score = verdict.score,
                        category = verdict.category.as_str(),
                        "item rejected"
                    );
                    summary.filtered += 1;
                    continue;
                }

                let title = verdict.translated_title.clone().unwrap_or_else(|| item.title.clone());
                let image = self.images.resolve(&item.url, &title, verdict.category).await;

                let translated =
                    verdict.translated_title.is_some() || verdict.translated_summary.is_some();
                let record = NewNewsRecord {
                    title,
                    url: item.url.clone(),
                    summary: verdict.translated_summary.unwrap_or(verdict.summary),
                    source: item.source.clone(),
                    published_at: item.published,
                    relevance_score: verdict.score,
                    category: verdict.category,
                    original_language: verdict.detected_language,
                    translated,
                    image_url: image.url,
                    image_source: image.source,
                };

                match self.store.insert(record).await {
                    Ok(InsertOutcome::Inserted) => {
                        tracing::info!(url = %item.url, "news item saved");
                        summary.saved += 1;
                    }
                    // a concurrent writer beat us to the unique index
                    Ok(InsertOutcome::DuplicateUrl) => summary.duplicate += 1,
                    Err(e) => {
                        tracing::error!(error = ?e, url = %item.url, "insert failed");
                        counter!("collect_store_errors_total").increment(1);
                    }
                }
            }
        }

        counter!("collect_runs_total").increment(1);
        counter!("collect_items_total").increment(summary.collected);
        counter!("collect_saved_total").increment(summary.saved);
        counter!("collect_filtered_total").increment(summary.filtered);
        counter!("collect_duplicate_total").increment(summary.duplicate);
        gauge!("collect_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

        tracing::info!(
            collected = summary.collected,
            saved = summary.saved,
            filtered = summary.filtered,
            duplicate = summary.duplicate,
            "collection run finished"
        );
        Ok(summary)
    }

    /// Dedup gate. Fails open: if the lookup errors, the item proceeds and
    /// the UNIQUE constraint at insert time has the final word.
    async fn already_known(&self, url: &str) -> bool {
        match self.store.find_by_url(url).await {
            Ok(existing) => existing.is_some(),
            Err(e) => {
                tracing::warn!(error = ?e, url, "dedup lookup failed, treating as new");
                false
            }
        }
    }
}
