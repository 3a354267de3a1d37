// src/store/pg.rs
//! Postgres-backed store. Schema lives in `migrations/`; the UNIQUE
//! constraint on `url` is the real dedup authority.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;

use super::{InsertOutcome, NewNewsRecord, NewsRecord, NewsStore, STATUS_PENDING};

#[derive(Clone)]
pub struct PgNewsStore {
    pool: PgPool,
}

impl PgNewsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NewsStore for PgNewsStore {
    async fn find_by_url(&self, url: &str) -> Result<Option<NewsRecord>> {
        sqlx::query_as::<_, NewsRecord>("SELECT * FROM news_items WHERE url = $1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .context("looking up news item by url")
    }

    async fn insert(&self, record: NewNewsRecord) -> Result<InsertOutcome> {
        let result = sqlx::query(
            "INSERT INTO news_items
                 (title, url, summary, source, published_at, status,
                  relevance_score, category, original_language, translated,
                  image_url, image_source)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             ON CONFLICT (url) DO NOTHING",
        )
        .bind(&record.title)
        .bind(&record.url)
        .bind(&record.summary)
        .bind(&record.source)
        .bind(record.published_at)
        .bind(STATUS_PENDING)
        .bind(record.relevance_score)
        .bind(record.category.as_str())
        .bind(&record.original_language)
        .bind(record.translated)
        .bind(&record.image_url)
        .bind(record.image_source.as_str())
        .execute(&self.pool)
        .await
        .context("inserting news item")?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::DuplicateUrl)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }
}
