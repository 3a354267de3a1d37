// src/store/mod.rs
//! Persistence seam. The collector only ever needs two operations: a lookup
//! by canonical URL (dedup gate) and a conflict-tolerant insert.

pub mod pg;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classify::Category;
use crate::images::ImageSource;

/// Moderation state a row starts in. Everything after insert belongs to the
/// admin UI, so the pipeline only ever writes this value.
pub const STATUS_PENDING: &str = "pending";

/// A stored news item, as read back from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NewsRecord {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub summary: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub status: String,
    pub relevance_score: f32,
    pub category: String,
    pub original_language: String,
    pub translated: bool,
    pub image_url: String,
    pub image_source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for one accepted item. `id`, `status` and the timestamps
/// are owned by the database.
#[derive(Debug, Clone)]
pub struct NewNewsRecord {
    pub title: String,
    pub url: String,
    pub summary: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub relevance_score: f32,
    pub category: Category,
    pub original_language: String,
    pub translated: bool,
    pub image_url: String,
    pub image_source: ImageSource,
}

/// What an insert did. The UNIQUE constraint on `url` absorbs races, so a
/// duplicate is an outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    DuplicateUrl,
}

#[async_trait]
pub trait NewsStore: Send + Sync {
    async fn find_by_url(&self, url: &str) -> Result<Option<NewsRecord>>;
    async fn insert(&self, record: NewNewsRecord) -> Result<InsertOutcome>;
}
