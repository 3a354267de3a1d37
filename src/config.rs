// src/config.rs
//! Runtime configuration: environment variables plus the feed list from
//! `config/feeds.toml`. Every tunable has a named default here so there is
//! exactly one place to change a knob.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::classify::endpoint::ChatEndpoint;

// --- Defaults -------------------------------------------------------------

/// Minimum relevance score an item must reach to be saved.
pub const DEFAULT_RELEVANCE_THRESHOLD: f32 = 0.85;
/// Delay between consecutive LLM calls within one run.
pub const DEFAULT_CLASSIFY_PACING_MS: u64 = 800;
/// Newest items taken per feed per run.
pub const DEFAULT_FEED_ITEM_LIMIT: usize = 10;
/// Background collection interval; 0 disables the scheduler.
pub const DEFAULT_COLLECT_INTERVAL_SECS: u64 = 21_600; // 6 hours
/// Language the site publishes in; summaries are written in this language.
pub const DEFAULT_SITE_LANG: &str = "ja";
/// Ordered classification ladder, cheapest first.
pub const DEFAULT_LLM_MODELS: &str = "openai:gpt-4o-mini,openai:gpt-4o";
pub const DEFAULT_FEEDS_CONFIG_PATH: &str = "config/feeds.toml";
pub const DEFAULT_PORT: u16 = 8000;

/// Whole-request timeout for feed downloads.
pub const FEED_FETCH_TIMEOUT_SECS: u64 = 10;
/// Whole-request timeout for article page scrapes (image lookup).
pub const PAGE_FETCH_TIMEOUT_SECS: u64 = 8;

// --- Env var names ---------------------------------------------------------

pub const ENV_RELEVANCE_THRESHOLD: &str = "RELEVANCE_THRESHOLD";
pub const ENV_CLASSIFY_PACING_MS: &str = "CLASSIFY_PACING_MS";
pub const ENV_FEED_ITEM_LIMIT: &str = "FEED_ITEM_LIMIT";
pub const ENV_COLLECT_INTERVAL_SECS: &str = "COLLECT_INTERVAL_SECS";
pub const ENV_SITE_LANG: &str = "SITE_LANG";
pub const ENV_LLM_MODELS: &str = "LLM_MODELS";
pub const ENV_FEEDS_CONFIG_PATH: &str = "FEEDS_CONFIG_PATH";

/// One feed to poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSpec {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub database_url: String,
    pub port: u16,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub pexels_api_key: Option<String>,
    pub site_lang: String,
    pub relevance_threshold: f32,
    pub classify_pacing: Duration,
    pub feed_item_limit: usize,
    pub collect_interval_secs: u64,
    pub models: Vec<ChatEndpoint>,
    pub feeds: Vec<FeedSpec>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            port: DEFAULT_PORT,
            openai_api_key: None,
            anthropic_api_key: None,
            pexels_api_key: None,
            site_lang: DEFAULT_SITE_LANG.to_string(),
            relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD,
            classify_pacing: Duration::from_millis(DEFAULT_CLASSIFY_PACING_MS),
            feed_item_limit: DEFAULT_FEED_ITEM_LIMIT,
            collect_interval_secs: DEFAULT_COLLECT_INTERVAL_SECS,
            models: parse_model_list(DEFAULT_LLM_MODELS),
            feeds: default_feeds(),
        }
    }
}

impl CollectorConfig {
    /// Build the configuration from the process environment. Only
    /// `DATABASE_URL` is required at boot; a missing LLM key is reported
    /// when a collection actually starts.
    pub fn from_env() -> Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let feeds_path = env_opt(ENV_FEEDS_CONFIG_PATH)
            .unwrap_or_else(|| DEFAULT_FEEDS_CONFIG_PATH.to_string());

        Ok(Self {
            database_url,
            port: env_parsed("PORT", DEFAULT_PORT),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            anthropic_api_key: env_opt("ANTHROPIC_API_KEY"),
            pexels_api_key: env_opt("PEXELS_API_KEY"),
            site_lang: env_opt(ENV_SITE_LANG).unwrap_or_else(|| DEFAULT_SITE_LANG.to_string()),
            relevance_threshold: env_parsed(ENV_RELEVANCE_THRESHOLD, DEFAULT_RELEVANCE_THRESHOLD),
            classify_pacing: Duration::from_millis(env_parsed(
                ENV_CLASSIFY_PACING_MS,
                DEFAULT_CLASSIFY_PACING_MS,
            )),
            feed_item_limit: env_parsed(ENV_FEED_ITEM_LIMIT, DEFAULT_FEED_ITEM_LIMIT),
            collect_interval_secs: env_parsed(
                ENV_COLLECT_INTERVAL_SECS,
                DEFAULT_COLLECT_INTERVAL_SECS,
            ),
            models: env_opt(ENV_LLM_MODELS)
                .map(|raw| parse_model_list(&raw))
                .unwrap_or_else(|| parse_model_list(DEFAULT_LLM_MODELS)),
            feeds: load_feeds(&feeds_path),
        })
    }
}

/// Non-empty trimmed env var, or None.
fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an env var, falling back to the default on absence or garbage.
fn env_parsed<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match env_opt(name) {
        None => default,
        Some(raw) => match raw.parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(var = name, value = %raw, "unparseable env var, using default");
                default
            }
        },
    }
}

/// Parse a comma-separated `provider:model` ladder, skipping bad entries.
pub fn parse_model_list(raw: &str) -> Vec<ChatEndpoint> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|spec| {
            let parsed = ChatEndpoint::parse(spec);
            if parsed.is_none() {
                tracing::warn!(spec, "unknown model spec, skipping");
            }
            parsed
        })
        .collect()
}

// --- Feed list --------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FeedsFile {
    #[serde(default)]
    feeds: Vec<FeedEntry>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    name: String,
    url: String,
}

/// Read the feed list from a TOML file; fall back to the built-in list when
/// the file is missing or malformed so the collector always has sources.
pub fn load_feeds(path: &str) -> Vec<FeedSpec> {
    match std::fs::read_to_string(path) {
        Ok(raw) => match parse_feeds_toml(&raw) {
            Ok(feeds) if !feeds.is_empty() => feeds,
            Ok(_) => {
                tracing::warn!(path, "feed config lists no feeds, using built-in defaults");
                default_feeds()
            }
            Err(e) => {
                tracing::warn!(error = ?e, path, "bad feed config, using built-in defaults");
                default_feeds()
            }
        },
        Err(_) => {
            tracing::info!(path, "no feed config file, using built-in defaults");
            default_feeds()
        }
    }
}

pub fn parse_feeds_toml(raw: &str) -> Result<Vec<FeedSpec>> {
    let file: FeedsFile = toml::from_str(raw).context("parsing feeds toml")?;
    Ok(file
        .feeds
        .into_iter()
        .map(|f| FeedSpec { name: f.name, url: f.url })
        .collect())
}

pub fn default_feeds() -> Vec<FeedSpec> {
    [
        ("OpenAI News", "https://openai.com/news/rss.xml"),
        ("Google AI Blog", "https://blog.google/technology/ai/rss/"),
        ("The Verge AI", "https://www.theverge.com/rss/ai-artificial-intelligence/index.xml"),
        ("ITmedia AI+", "https://rss.itmedia.co.jp/rss/2.0/aiplus.xml"),
        ("Publickey", "https://www.publickey1.jp/atom.xml"),
    ]
    .into_iter()
    .map(|(name, url)| FeedSpec {
        name: name.to_string(),
        url: url.to_string(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_list_parses_and_skips_garbage() {
        let models = parse_model_list("openai:gpt-4o-mini, claude:claude-3-5-haiku-latest ,bogus");
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].model(), "gpt-4o-mini");
        assert_eq!(models[1].model(), "claude-3-5-haiku-latest");
    }

    #[test]
    fn feeds_toml_round_trip() {
        let raw = r#"
            [[feeds]]
            name = "OpenAI News"
            url = "https://openai.com/news/rss.xml"

            [[feeds]]
            name = "Publickey"
            url = "https://www.publickey1.jp/atom.xml"
        "#;
        let feeds = parse_feeds_toml(raw).unwrap();
        assert_eq!(feeds.len(), 2);
        assert_eq!(feeds[0].name, "OpenAI News");
        assert_eq!(feeds[1].url, "https://www.publickey1.jp/atom.xml");
    }

    #[test]
    fn empty_feeds_toml_is_ok_but_empty() {
        let feeds = parse_feeds_toml("").unwrap();
        assert!(feeds.is_empty());
    }

    #[test]
    fn defaults_are_sane() {
        let cfg = CollectorConfig::default();
        assert_eq!(cfg.relevance_threshold, DEFAULT_RELEVANCE_THRESHOLD);
        assert_eq!(cfg.feed_item_limit, 10);
        assert!(!cfg.feeds.is_empty());
        assert_eq!(cfg.models.len(), 2);
    }
}
