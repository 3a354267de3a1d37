// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use ai_news_collector::api::{self, AppState};
use ai_news_collector::classify::{Category, Classification, Classifier};
use ai_news_collector::collector::NewsCollector;
use ai_news_collector::config::{CollectorConfig, FeedSpec};
use ai_news_collector::feeds::{FeedProvider, RawItem};
use ai_news_collector::images::{ImageResolver, ImageSource, ResolvedImage};
use ai_news_collector::store::{InsertOutcome, NewNewsRecord, NewsRecord, NewsStore};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

// --- Minimal mocks so a run completes in-process -----------------------------

struct OneItemFeed;

#[async_trait]
impl FeedProvider for OneItemFeed {
    async fn fetch(&self, feed: &FeedSpec) -> Vec<RawItem> {
        vec![RawItem {
            title: "Claude adds file editing".to_string(),
            url: "https://example.com/claude-files".to_string(),
            description: "Anthropic shipped file editing.".to_string(),
            published: Utc::now(),
            source: feed.name.clone(),
        }]
    }
}

struct AcceptAll;

#[async_trait]
impl Classifier for AcceptAll {
    async fn classify(&self, _title: &str, _description: &str) -> Classification {
        Classification {
            is_relevant: true,
            score: 0.9,
            category: Category::ToolUpdate,
            summary: "summary".to_string(),
            translated_title: None,
            translated_summary: None,
            detected_language: "en".to_string(),
        }
    }
}

struct NoCredentials;

#[async_trait]
impl Classifier for NoCredentials {
    fn preflight(&self) -> Result<()> {
        anyhow::bail!("no usable LLM endpoint")
    }
    async fn classify(&self, _title: &str, _description: &str) -> Classification {
        unreachable!()
    }
}

struct StubResolver;

#[async_trait]
impl ImageResolver for StubResolver {
    async fn resolve(&self, _url: &str, _title: &str, _category: Category) -> ResolvedImage {
        ResolvedImage {
            url: "https://img.example.com/x.jpg".to_string(),
            source: ImageSource::PageMetadata,
        }
    }
}

struct NullStore;

#[async_trait]
impl NewsStore for NullStore {
    async fn find_by_url(&self, _url: &str) -> Result<Option<NewsRecord>> {
        Ok(None)
    }
    async fn insert(&self, _record: NewNewsRecord) -> Result<InsertOutcome> {
        Ok(InsertOutcome::Inserted)
    }
}

fn test_router(classifier: Arc<dyn Classifier>) -> axum::Router {
    let mut cfg = CollectorConfig::default();
    cfg.feeds = vec![FeedSpec {
        name: "Test Feed".to_string(),
        url: "https://feeds.test/one".to_string(),
    }];
    cfg.classify_pacing = std::time::Duration::ZERO;

    let collector = Arc::new(NewsCollector::new(
        &cfg,
        Arc::new(OneItemFeed),
        classifier,
        Arc::new(StubResolver),
        Arc::new(NullStore),
    ));
    api::router(AppState { collector })
}

// --- Tests -------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_and_ok_body() {
    let app = test_router(Arc::new(AcceptAll));

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.expect("read body");
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap().trim(), "OK");
}

#[tokio::test]
async fn collect_returns_run_summary_json() {
    let app = test_router(Arc::new(AcceptAll));

    let req = Request::builder()
        .method("POST")
        .uri("/collect")
        .body(Body::empty())
        .expect("build POST /collect");

    let resp = app.oneshot(req).await.expect("oneshot /collect");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.expect("read body");
    let json: Json = serde_json::from_slice(&bytes).expect("json body");
    assert_eq!(json["collected"], 1);
    assert_eq!(json["saved"], 1);
    assert_eq!(json["filtered"], 0);
    assert_eq!(json["duplicate"], 0);
}

#[tokio::test]
async fn collect_without_credentials_is_503() {
    let app = test_router(Arc::new(NoCredentials));

    let req = Request::builder()
        .method("POST")
        .uri("/collect")
        .body(Body::empty())
        .expect("build POST /collect");

    let resp = app.oneshot(req).await.expect("oneshot /collect");
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.expect("read body");
    let json: Json = serde_json::from_slice(&bytes).expect("json body");
    assert!(json["error"].as_str().unwrap().contains("LLM"));
}
