// tests/classifier_ladder.rs
// The model fallback ladder against a local stub of the chat-completions
// endpoint. One route serves every "model"; behavior is keyed off the model
// name in the request body.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use ai_news_collector::classify::{Category, LlmClassifier};
use ai_news_collector::config::{parse_model_list, CollectorConfig};

#[derive(Clone)]
enum Behavior {
    RateLimit,
    Garbage,
    Verdict(Value),
}

type Script = Arc<HashMap<String, Behavior>>;

async fn completions(
    State(script): State<Script>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let model = body["model"].as_str().unwrap_or_default();
    match script.get(model) {
        Some(Behavior::RateLimit) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error": {"message": "rate limited"}})),
        ),
        Some(Behavior::Garbage) => (
            StatusCode::OK,
            Json(json!({"choices": [{"message": {"content": "I cannot judge this article."}}]})),
        ),
        Some(Behavior::Verdict(v)) => {
            // wrap the JSON in prose, as chatty models do
            let content = format!("Sure! Here is my verdict:\n```json\n{v}\n```");
            (
                StatusCode::OK,
                Json(json!({"choices": [{"message": {"content": content}}]})),
            )
        }
        None => (StatusCode::NOT_FOUND, Json(json!({"error": "unknown model"}))),
    }
}

async fn spawn_stub(script: Vec<(&str, Behavior)>) -> String {
    let script: Script = Arc::new(
        script.into_iter().map(|(m, b)| (m.to_string(), b)).collect(),
    );
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(script);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn classifier(base: &str) -> LlmClassifier {
    let mut cfg = CollectorConfig::default();
    cfg.openai_api_key = Some("test-key".to_string());
    cfg.models = parse_model_list("openai:gpt-4o-mini,openai:gpt-4o");
    LlmClassifier::from_config(&cfg).with_base_urls(base, base)
}

fn good_verdict() -> Value {
    json!({
        "score": 0.93,
        "category": "tool_update",
        "summary": "新しい音声モードが登場",
        "detected_language": "en"
    })
}

#[tokio::test]
async fn first_model_that_answers_wins() {
    use ai_news_collector::classify::Classifier as _;

    let base = spawn_stub(vec![("gpt-4o-mini", Behavior::Verdict(good_verdict()))]).await;
    let c = classifier(&base);

    let verdict = c.classify("ChatGPT gets new voice mode", "body text").await;
    assert!(verdict.is_relevant);
    assert_eq!(verdict.category, Category::ToolUpdate);
    assert!((verdict.score - 0.93).abs() < 1e-6);
    assert_eq!(verdict.summary, "新しい音声モードが登場");
    assert_eq!(verdict.detected_language, "en");
}

#[tokio::test]
async fn rate_limited_rung_advances_to_the_next() {
    use ai_news_collector::classify::Classifier as _;

    let base = spawn_stub(vec![
        ("gpt-4o-mini", Behavior::RateLimit),
        ("gpt-4o", Behavior::Verdict(good_verdict())),
    ])
    .await;
    let c = classifier(&base);

    let verdict = c.classify("ChatGPT gets new voice mode", "body").await;
    assert!(verdict.is_relevant);
    assert_eq!(verdict.category, Category::ToolUpdate);
}

#[tokio::test]
async fn unparseable_output_advances_to_the_next() {
    use ai_news_collector::classify::Classifier as _;

    let base = spawn_stub(vec![
        ("gpt-4o-mini", Behavior::Garbage),
        ("gpt-4o", Behavior::Verdict(good_verdict())),
    ])
    .await;
    let c = classifier(&base);

    let verdict = c.classify("ChatGPT gets new voice mode", "body").await;
    assert!(verdict.is_relevant);
}

#[tokio::test]
async fn exhausted_ladder_rejects_instead_of_failing() {
    use ai_news_collector::classify::Classifier as _;

    let base = spawn_stub(vec![
        ("gpt-4o-mini", Behavior::RateLimit),
        ("gpt-4o", Behavior::RateLimit),
    ])
    .await;
    let c = classifier(&base);

    let verdict = c.classify("ChatGPT gets new voice mode", "body").await;
    assert!(!verdict.is_relevant);
    assert_eq!(verdict.score, 0.0);
    assert_eq!(verdict.category, Category::Other);
    assert_eq!(verdict.detected_language, "en");
}

#[tokio::test]
async fn acceptance_is_recomputed_locally() {
    use ai_news_collector::classify::Classifier as _;

    // model claims relevance but the score is under the bar
    let low_score = json!({
        "is_relevant": true,
        "score": 0.5,
        "category": "tool-update",
        "summary": "s"
    });
    let base = spawn_stub(vec![("gpt-4o-mini", Behavior::Verdict(low_score))]).await;
    let verdict = classifier(&base).classify("t", "d").await;
    assert!(!verdict.is_relevant);

    // high score but the category is off the allow list
    let off_list = json!({
        "is_relevant": true,
        "score": 0.99,
        "category": "other",
        "summary": "s"
    });
    let base = spawn_stub(vec![("gpt-4o-mini", Behavior::Verdict(off_list))]).await;
    let verdict = classifier(&base).classify("t", "d").await;
    assert!(!verdict.is_relevant);
    assert_eq!(verdict.category, Category::Other);
}

#[tokio::test]
async fn heuristic_language_fills_a_silent_verdict() {
    use ai_news_collector::classify::Classifier as _;

    let no_lang = json!({"score": 0.9, "category": "how-to", "summary": "要約"});
    let base = spawn_stub(vec![("gpt-4o-mini", Behavior::Verdict(no_lang))]).await;
    let c = classifier(&base);

    let verdict = c.classify("ChatGPTの使い方ガイド", "日本語の本文").await;
    assert_eq!(verdict.detected_language, "ja");
    assert_eq!(verdict.category, Category::HowTo);
}
