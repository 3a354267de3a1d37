// src/api.rs
//! HTTP surface: a health probe and the manual collection trigger. The
//! scheduler and an operator share the same entry point, so a manual run is
//! exactly a scheduled run that returns its summary.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::collector::{NewsCollector, RunSummary};

#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<NewsCollector>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/collect", post(collect))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Run one collection and return its counts. A failed precondition (no
/// usable LLM endpoint) is the only error path; everything item-level is
/// absorbed into the summary.
async fn collect(
    State(state): State<AppState>,
) -> Result<Json<RunSummary>, (StatusCode, Json<serde_json::Value>)> {
    match state.collector.run().await {
        Ok(summary) => Ok(Json(summary)),
        Err(e) => {
            tracing::error!(error = ?e, "collection run refused");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": e.to_string() })),
            ))
        }
    }
}
