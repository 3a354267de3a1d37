//! AI News Collector: binary entrypoint
//! Boots the Axum HTTP server and the background collection scheduler.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ai_news_collector::api::{self, AppState};
use ai_news_collector::classify::LlmClassifier;
use ai_news_collector::collector::NewsCollector;
use ai_news_collector::config::CollectorConfig;
use ai_news_collector::feeds::HttpFeedProvider;
use ai_news_collector::images::TieredImageResolver;
use ai_news_collector::metrics::Metrics;
use ai_news_collector::scheduler::spawn_collect_scheduler;
use ai_news_collector::store::pg::PgNewsStore;

#[tokio::main]
async fn main() -> Result<()> {
    // .env in local/dev; no-op when vars come from the environment.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CollectorConfig::from_env().context("loading configuration")?;
    tracing::info!(feeds = config.feeds.len(), "configuration loaded");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("connecting to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("running migrations")?;

    // Recorder first, so collection counters register against it.
    let metrics = Metrics::init();

    let collector = Arc::new(NewsCollector::new(
        &config,
        Arc::new(HttpFeedProvider::new()),
        Arc::new(LlmClassifier::from_config(&config)),
        Arc::new(TieredImageResolver::from_config(&config)),
        Arc::new(PgNewsStore::new(pool)),
    ));

    let _scheduler = spawn_collect_scheduler(collector.clone(), config.collect_interval_secs);

    let app = api::router(AppState { collector }).merge(metrics.router());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(%addr, "starting server");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("binding listener")?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
