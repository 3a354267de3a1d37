// src/classify/mod.rs
//! LLM relevance gate. One prompt, an ordered ladder of chat endpoints, and
//! a local acceptance rule. The model's own opinion of relevance is never
//! trusted; acceptance is always recomputed from score + category here.

pub mod endpoint;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::CollectorConfig;
use crate::normalize::{normalize_text, truncate_chars};
use endpoint::{ChatEndpoint, CompletionError, ANTHROPIC_API_URL, OPENAI_API_URL};

/// Sampling temperature for classification calls.
pub const CLASSIFY_TEMPERATURE: f32 = 0.2;
/// Token budget for the verdict (JSON with summary and translations).
pub const CLASSIFY_MAX_TOKENS: u32 = 400;
/// Article body is cut to this many chars before prompting.
pub const DESCRIPTION_PROMPT_CHARS: usize = 800;
/// Upper bound requested for model-written summaries.
pub const SUMMARY_MAX_CHARS: usize = 50;
/// Pause after a 429 before trying the next rung.
const RATE_LIMIT_PAUSE: Duration = Duration::from_millis(1000);

/// Editorial category of a news item. Kebab-case is the canonical string
/// form (API, database, prompts); snake_case spellings are accepted on input
/// because models drift between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    #[serde(alias = "official_announcement")]
    OfficialAnnouncement,
    #[serde(alias = "tool_update")]
    ToolUpdate,
    #[serde(alias = "how_to", alias = "howto")]
    HowTo,
    Other,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::OfficialAnnouncement => "official-announcement",
            Category::ToolUpdate => "tool-update",
            Category::HowTo => "how-to",
            Category::Other => "other",
        }
    }

    /// Whether this category is on the save allow list.
    pub fn is_accepted(self) -> bool {
        !matches!(self, Category::Other)
    }

    /// Forgiving parse of whatever spelling a model produced.
    pub fn from_loose(s: &str) -> Self {
        let norm = s.trim().to_ascii_lowercase().replace([' ', '_'], "-");
        match norm.as_str() {
            "official-announcement" => Category::OfficialAnnouncement,
            "tool-update" => Category::ToolUpdate,
            "how-to" | "howto" => Category::HowTo,
            _ => Category::Other,
        }
    }
}

/// Final verdict for one item, after clamping and local acceptance.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub is_relevant: bool,
    pub score: f32,
    pub category: Category,
    pub summary: String,
    pub translated_title: Option<String>,
    pub translated_summary: Option<String>,
    pub detected_language: String,
}

impl Classification {
    /// Conservative verdict used when every rung of the ladder failed: an
    /// unclassifiable item must be dropped, not saved or retried forever.
    pub fn not_relevant(detected_language: &str) -> Self {
        Self {
            is_relevant: false,
            score: 0.0,
            category: Category::Other,
            summary: String::new(),
            translated_title: None,
            translated_summary: None,
            detected_language: detected_language.to_string(),
        }
    }
}

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Cheap credential check run once per collection, before any feed I/O.
    fn preflight(&self) -> Result<()> {
        Ok(())
    }

    /// Judge one item. Never fails; an undecidable item comes back as
    /// `not_relevant`.
    async fn classify(&self, title: &str, description: &str) -> Classification;
}

/// The acceptance rule. Callers needing a different bar change the threshold
/// in one place (`config::DEFAULT_RELEVANCE_THRESHOLD`).
pub fn accepted(score: f32, category: Category, threshold: f32) -> bool {
    score >= threshold && category.is_accepted()
}

pub fn clamp_score(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Pull the first `{` through the last `}` out of a completion. Models wrap
/// JSON in prose and code fences often enough that this lives in one place.
pub fn extract_json_object(text: &str) -> Option<&str> {
    static RE_JSON: OnceCell<Regex> = OnceCell::new();
    let re = RE_JSON.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("json object regex"));
    re.find(text).map(|m| m.as_str())
}

/// Character-range language sniff: any kana or CJK ideograph means "ja",
/// everything else defaults to "en". Only a fallback; a language reported by
/// the model wins.
pub fn detect_language(text: &str) -> &'static str {
    let is_ja = text.chars().any(|c| {
        matches!(c,
            '\u{3040}'..='\u{309F}'   // hiragana
            | '\u{30A0}'..='\u{30FF}' // katakana
            | '\u{4E00}'..='\u{9FFF}' // CJK unified ideographs
            | '\u{FF66}'..='\u{FF9D}' // halfwidth katakana
        )
    });
    if is_ja {
        "ja"
    } else {
        "en"
    }
}

/// Shape of the JSON a model is asked to return. Everything beyond score and
/// category is optional so a slightly lazy model still parses.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(default)]
    #[allow(dead_code)] // accepted on input, recomputed locally
    is_relevant: Option<bool>,
    score: f32,
    category: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    translated_title: Option<String>,
    #[serde(default)]
    translated_summary: Option<String>,
    #[serde(default)]
    detected_language: Option<String>,
}

fn parse_verdict(completion: &str) -> Option<RawVerdict> {
    let json = extract_json_object(completion)?;
    serde_json::from_str(json).ok()
}

fn lang_name(code: &str) -> &str {
    match code {
        "ja" => "Japanese",
        "en" => "English",
        other => other,
    }
}

fn build_prompt(site_lang: &str, title: &str, body: &str) -> String {
    let lang = lang_name(site_lang);
    format!(
        "You are a news curator for a website that helps small businesses use AI tools.\n\
         Judge the article below.\n\n\
         Title: {title}\n\
         Body: {body}\n\n\
         Respond with ONLY one JSON object, no prose and no code fences, with these keys:\n\
         - \"score\": number between 0.0 and 1.0; how useful this article is to a small-business reader adopting AI tools\n\
         - \"category\": exactly one of \"official-announcement\", \"tool-update\", \"how-to\", \"other\"\n\
         - \"summary\": one sentence of at most {SUMMARY_MAX_CHARS} characters, written in {lang}\n\
         - \"detected_language\": two-letter code of the article's language, e.g. \"en\" or \"ja\"\n\
         - if the article is not written in {lang}, also include \"translated_title\" and \"translated_summary\" in {lang}\n"
    )
}

struct Rung {
    endpoint: ChatEndpoint,
    api_key: String,
}

/// Classifier backed by the configured endpoint ladder. Rungs whose provider
/// has no key are dropped at construction time.
pub struct LlmClassifier {
    http: reqwest::Client,
    ladder: Vec<Rung>,
    site_lang: String,
    threshold: f32,
    openai_base: String,
    anthropic_base: String,
}

impl LlmClassifier {
    pub fn from_config(cfg: &CollectorConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("ai-news-collector/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");

        let mut ladder = Vec::with_capacity(cfg.models.len());
        for ep in &cfg.models {
            let key = match ep {
                ChatEndpoint::OpenAi { .. } => cfg.openai_api_key.clone(),
                ChatEndpoint::Claude { .. } => cfg.anthropic_api_key.clone(),
            };
            match key {
                Some(api_key) => ladder.push(Rung { endpoint: ep.clone(), api_key }),
                None => {
                    tracing::warn!(model = %ep, "no API key for provider, dropping from ladder")
                }
            }
        }

        if ladder.is_empty() {
            tracing::warn!("classifier has no usable endpoints; collections will refuse to run");
        } else {
            let rungs: Vec<String> = ladder.iter().map(|r| r.endpoint.to_string()).collect();
            tracing::info!(ladder = rungs.join(" -> "), "classifier ready");
        }

        Self {
            http,
            ladder,
            site_lang: cfg.site_lang.clone(),
            threshold: cfg.relevance_threshold,
            openai_base: OPENAI_API_URL.to_string(),
            anthropic_base: ANTHROPIC_API_URL.to_string(),
        }
    }

    /// Point both providers at different hosts. Test hook.
    pub fn with_base_urls(mut self, openai: &str, anthropic: &str) -> Self {
        self.openai_base = openai.trim_end_matches('/').to_string();
        self.anthropic_base = anthropic.trim_end_matches('/').to_string();
        self
    }

    fn base_for(&self, ep: &ChatEndpoint) -> &str {
        match ep {
            ChatEndpoint::OpenAi { .. } => &self.openai_base,
            ChatEndpoint::Claude { .. } => &self.anthropic_base,
        }
    }

    fn finish(&self, v: RawVerdict, heuristic_lang: &str) -> Classification {
        let score = clamp_score(v.score);
        let category = Category::from_loose(&v.category);
        let non_empty = |s: Option<String>| s.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        Classification {
            is_relevant: accepted(score, category, self.threshold),
            score,
            category,
            summary: non_empty(v.summary).unwrap_or_default(),
            translated_title: non_empty(v.translated_title),
            translated_summary: non_empty(v.translated_summary),
            detected_language: non_empty(v.detected_language)
                .unwrap_or_else(|| heuristic_lang.to_string()),
        }
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    fn preflight(&self) -> Result<()> {
        if self.ladder.is_empty() {
            anyhow::bail!(
                "no usable LLM endpoint: set OPENAI_API_KEY (or ANTHROPIC_API_KEY for claude models)"
            );
        }
        Ok(())
    }

    async fn classify(&self, title: &str, description: &str) -> Classification {
        let body = truncate_chars(&normalize_text(description), DESCRIPTION_PROMPT_CHARS);
        let heuristic_lang = detect_language(&format!("{title} {body}"));
        let prompt = build_prompt(&self.site_lang, title, &body);

        for rung in &self.ladder {
            let attempt = rung
                .endpoint
                .complete(
                    &self.http,
                    self.base_for(&rung.endpoint),
                    &rung.api_key,
                    &prompt,
                    CLASSIFY_TEMPERATURE,
                    CLASSIFY_MAX_TOKENS,
                )
                .await;

            match attempt {
                Ok(text) => match parse_verdict(&text) {
                    Some(v) => return self.finish(v, heuristic_lang),
                    None => {
                        tracing::warn!(model = %rung.endpoint, "unparseable verdict, trying next model");
                        counter!("classify_fallback_total").increment(1);
                    }
                },
                Err(CompletionError::RateLimited) => {
                    tracing::warn!(model = %rung.endpoint, "rate limited, pausing before next model");
                    counter!("classify_rate_limited_total").increment(1);
                    counter!("classify_fallback_total").increment(1);
                    tokio::time::sleep(RATE_LIMIT_PAUSE).await;
                }
                Err(CompletionError::Other(e)) => {
                    tracing::warn!(error = ?e, model = %rung.endpoint, "completion failed, trying next model");
                    counter!("classify_fallback_total").increment(1);
                }
            }
        }

        tracing::warn!(title, "model ladder exhausted, dropping item as not relevant");
        counter!("classify_exhausted_total").increment(1);
        Classification::not_relevant(heuristic_lang)
    }
}
