// src/images/search.rs
//! Keyword photo search against the Pexels API. Only used when an API key
//! is configured; the resolver falls through to the generated placeholder
//! otherwise.

use anyhow::{bail, Context, Result};
use serde::Deserialize;

const PEXELS_API_URL: &str = "https://api.pexels.com/v1";

pub struct PexelsClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    src: PhotoSrc,
}

#[derive(Debug, Deserialize)]
struct PhotoSrc {
    medium: String,
}

impl PexelsClient {
    pub fn new(api_key: String, http: reqwest::Client) -> Self {
        Self {
            api_key,
            http,
            base_url: PEXELS_API_URL.to_string(),
        }
    }

    /// Point the client at a different host. Test hook.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// First landscape photo for the query, medium rendition, if any.
    pub async fn first_photo(&self, query: &str) -> Result<Option<String>> {
        let resp = self
            .http
            .get(format!("{}/search", self.base_url))
            .header("Authorization", &self.api_key)
            .query(&[("query", query), ("per_page", "1"), ("orientation", "landscape")])
            .send()
            .await
            .context("pexels search request")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("pexels API error ({status}): {body}");
        }

        let parsed: SearchResponse = resp.json().await.context("pexels response decode")?;
        Ok(parsed.photos.into_iter().next().map(|p| p.src.medium))
    }
}
