// src/images/mod.rs
//! Presentation image resolution, three tiers: article page metadata,
//! keyword photo search, generated placeholder. The last tier is total, so
//! resolution never fails and every saved item has an image.

pub mod placeholder;
pub mod search;

use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::classify::Category;
use crate::config::{CollectorConfig, PAGE_FETCH_TIMEOUT_SECS};
use placeholder::placeholder_data_url;
use search::PexelsClient;

/// Where a saved item's image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageSource {
    PageMetadata,
    KeywordSearch,
    Generated,
}

impl ImageSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageSource::PageMetadata => "page-metadata",
            ImageSource::KeywordSearch => "keyword-search",
            ImageSource::Generated => "generated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub url: String,
    pub source: ImageSource,
}

#[async_trait]
pub trait ImageResolver: Send + Sync {
    /// Find an image for one accepted item. Total: the placeholder tier
    /// always answers.
    async fn resolve(&self, article_url: &str, title: &str, category: Category) -> ResolvedImage;
}

/// Pull og:image / twitter:image out of raw HTML. Both attribute orders are
/// seen in the wild, og wins over twitter.
pub fn extract_meta_image(html: &str) -> Option<String> {
    static RES: OnceCell<Vec<Regex>> = OnceCell::new();
    let res = RES.get_or_init(|| {
        [
            r#"<meta[^>]+property=["']og:image["'][^>]+content=["']([^"']+)["']"#,
            r#"<meta[^>]+content=["']([^"']+)["'][^>]+property=["']og:image["']"#,
            r#"<meta[^>]+name=["']twitter:image["'][^>]+content=["']([^"']+)["']"#,
            r#"<meta[^>]+content=["']([^"']+)["'][^>]+name=["']twitter:image["']"#,
        ]
        .iter()
        .map(|p| Regex::new(p).expect("meta image regex"))
        .collect()
    });

    for re in res {
        if let Some(caps) = re.captures(html) {
            let raw = caps[1].trim();
            if !raw.is_empty() {
                // content attributes carry entity-encoded URLs (&amp;)
                return Some(html_escape::decode_html_entities(raw).to_string());
            }
        }
    }
    None
}

/// Make a meta-tag image URL absolute. Protocol-relative and root-relative
/// references resolve against the page; anything else must already be an
/// absolute http(s) URL.
pub fn resolve_image_url(raw: &str, page_url: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let base = Url::parse(page_url).ok()?;
    let abs = if raw.starts_with("//") {
        Url::parse(&format!("{}:{}", base.scheme(), raw)).ok()?
    } else if raw.starts_with('/') {
        base.join(raw).ok()?
    } else {
        Url::parse(raw).ok()?
    };
    if matches!(abs.scheme(), "http" | "https") {
        Some(abs.into())
    } else {
        None
    }
}

/// AI product and vendor names that make good photo-search keywords. A title
/// matching one of these searches for the product itself instead of whatever
/// generic words the headline opens with.
const AI_TERMS: &[&str] = &[
    "chatgpt",
    "openai",
    "claude",
    "anthropic",
    "gemini",
    "copilot",
    "midjourney",
    "stable diffusion",
    "dall-e",
    "sora",
    "llama",
    "mistral",
    "perplexity",
    "hugging face",
    "nvidia",
    "deepmind",
    "notebooklm",
];

/// Derive a photo-search keyword from a title: curated terms first, else the
/// first couple of meaningful words, else a generic fallback.
pub fn pick_search_keyword(title: &str) -> String {
    let lower = title.to_lowercase();
    for term in AI_TERMS {
        if lower.contains(term) {
            return (*term).to_string();
        }
    }

    let words: Vec<&str> = title
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() > 2 && !w.chars().all(|c| c.is_ascii_digit()))
        .take(2)
        .collect();

    if words.is_empty() {
        "AI".to_string()
    } else {
        words.join(" ")
    }
}

pub struct TieredImageResolver {
    http: reqwest::Client,
    search: Option<PexelsClient>,
}

impl TieredImageResolver {
    pub fn new(http: reqwest::Client, search: Option<PexelsClient>) -> Self {
        Self { http, search }
    }

    pub fn from_config(cfg: &CollectorConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("ai-news-collector/0.1")
            .redirect(reqwest::redirect::Policy::limited(5))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(PAGE_FETCH_TIMEOUT_SECS))
            .build()
            .expect("reqwest client");

        let search = cfg
            .pexels_api_key
            .clone()
            .map(|key| PexelsClient::new(key, http.clone()));

        tracing::info!(search_enabled = search.is_some(), "image resolver ready");
        Self::new(http, search)
    }

    /// Tier 1: fetch the article page and scrape its social-preview image.
    async fn page_image(&self, article_url: &str) -> Option<String> {
        let resp = match self.http.get(article_url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(error = ?e, url = article_url, "page fetch failed");
                return None;
            }
        };
        if !resp.status().is_success() {
            tracing::debug!(status = %resp.status(), url = article_url, "page fetch non-success");
            return None;
        }
        let html = resp.text().await.ok()?;
        let raw = extract_meta_image(&html)?;
        resolve_image_url(&raw, article_url)
    }
}

#[async_trait]
impl ImageResolver for TieredImageResolver {
    async fn resolve(&self, article_url: &str, title: &str, category: Category) -> ResolvedImage {
        if let Some(url) = self.page_image(article_url).await {
            counter!("image_from_page_total").increment(1);
            return ResolvedImage { url, source: ImageSource::PageMetadata };
        }

        if let Some(search) = &self.search {
            let query = format!("{} technology AI", pick_search_keyword(title));
            match search.first_photo(&query).await {
                Ok(Some(url)) => {
                    counter!("image_from_search_total").increment(1);
                    return ResolvedImage { url, source: ImageSource::KeywordSearch };
                }
                Ok(None) => tracing::debug!(query, "no photo hits, using placeholder"),
                Err(e) => tracing::warn!(error = ?e, query, "image search failed"),
            }
        }

        counter!("image_generated_total").increment(1);
        ResolvedImage {
            url: placeholder_data_url(category),
            source: ImageSource::Generated,
        }
    }
}
