// src/classify/endpoint.rs
//! One rung of the model ladder: a provider plus a model id, with the wire
//! format for each provider kept behind a single `complete` call so the
//! fallback loop never needs to know who it is talking to.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const OPENAI_API_URL: &str = "https://api.openai.com";
pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Why a single completion attempt failed. Rate limiting is the only case
/// the caller treats differently (brief pause before the next rung).
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("rate limited (429)")]
    RateLimited,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEndpoint {
    OpenAi { model: String },
    Claude { model: String },
}

impl ChatEndpoint {
    /// Parse a `provider:model` spec, e.g. `openai:gpt-4o-mini` or
    /// `claude:claude-3-5-haiku-latest`.
    pub fn parse(spec: &str) -> Option<Self> {
        let (provider, model) = spec.split_once(':')?;
        let model = model.trim();
        if model.is_empty() {
            return None;
        }
        match provider.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi { model: model.to_string() }),
            "claude" | "anthropic" => Some(Self::Claude { model: model.to_string() }),
            _ => None,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::OpenAi { model } | Self::Claude { model } => model,
        }
    }

    pub fn provider(&self) -> &'static str {
        match self {
            Self::OpenAi { .. } => "openai",
            Self::Claude { .. } => "claude",
        }
    }

    /// Run one completion against this endpoint and return the raw text of
    /// the first choice/content block.
    pub async fn complete(
        &self,
        http: &reqwest::Client,
        base_url: &str,
        api_key: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, CompletionError> {
        match self {
            Self::OpenAi { model } => {
                complete_openai(http, base_url, api_key, model, prompt, temperature, max_tokens)
                    .await
            }
            Self::Claude { model } => {
                complete_claude(http, base_url, api_key, model, prompt, temperature, max_tokens)
                    .await
            }
        }
    }
}

impl std::fmt::Display for ChatEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.provider(), self.model())
    }
}

fn classify_status(provider: &str, status: StatusCode, body: &str) -> CompletionError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        CompletionError::RateLimited
    } else {
        CompletionError::Other(anyhow::anyhow!("{provider} API error ({status}): {body}"))
    }
}

// --- OpenAI chat completions -------------------------------------------------

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessageOut,
}

#[derive(Deserialize)]
struct OpenAiMessageOut {
    content: String,
}

async fn complete_openai(
    http: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    prompt: &str,
    temperature: f32,
    max_tokens: u32,
) -> Result<String, CompletionError> {
    let req = OpenAiRequest {
        model,
        messages: vec![OpenAiMessage { role: "user", content: prompt }],
        temperature,
        max_tokens,
    };

    let resp = http
        .post(format!("{base_url}/v1/chat/completions"))
        .bearer_auth(api_key)
        .json(&req)
        .send()
        .await
        .map_err(|e| CompletionError::Other(anyhow::anyhow!("openai request failed: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(classify_status("openai", status, &body));
    }

    let parsed: OpenAiResponse = resp
        .json()
        .await
        .map_err(|e| CompletionError::Other(anyhow::anyhow!("openai response decode: {e}")))?;

    parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| CompletionError::Other(anyhow::anyhow!("openai returned no choices")))
}

// --- Anthropic messages -------------------------------------------------------

#[derive(Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ClaudeMessage<'a>>,
}

#[derive(Serialize)]
struct ClaudeMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ClaudeBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Unknown,
}

async fn complete_claude(
    http: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    prompt: &str,
    temperature: f32,
    max_tokens: u32,
) -> Result<String, CompletionError> {
    let req = ClaudeRequest {
        model,
        max_tokens,
        temperature,
        messages: vec![ClaudeMessage { role: "user", content: prompt }],
    };

    let resp = http
        .post(format!("{base_url}/v1/messages"))
        .header("x-api-key", api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&req)
        .send()
        .await
        .map_err(|e| CompletionError::Other(anyhow::anyhow!("claude request failed: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(classify_status("claude", status, &body));
    }

    let parsed: ClaudeResponse = resp
        .json()
        .await
        .map_err(|e| CompletionError::Other(anyhow::anyhow!("claude response decode: {e}")))?;

    let text = parsed
        .content
        .into_iter()
        .filter_map(|b| match b {
            ClaudeBlock::Text { text } => Some(text),
            ClaudeBlock::Unknown => None,
        })
        .collect::<Vec<_>>()
        .join("");

    if text.is_empty() {
        return Err(CompletionError::Other(anyhow::anyhow!(
            "claude returned no text content"
        )));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_specs() {
        let e = ChatEndpoint::parse("openai:gpt-4o-mini").unwrap();
        assert_eq!(e, ChatEndpoint::OpenAi { model: "gpt-4o-mini".into() });
        assert_eq!(e.to_string(), "openai:gpt-4o-mini");

        let e = ChatEndpoint::parse("claude:claude-3-5-haiku-latest").unwrap();
        assert_eq!(e.provider(), "claude");

        // anthropic is accepted as an alias
        assert!(ChatEndpoint::parse("anthropic:claude-3-5-sonnet-latest").is_some());

        assert!(ChatEndpoint::parse("gpt-4o-mini").is_none());
        assert!(ChatEndpoint::parse("openai:").is_none());
        assert!(ChatEndpoint::parse("mistral:large").is_none());
    }

    #[test]
    fn only_429_maps_to_rate_limited() {
        assert!(matches!(
            classify_status("openai", StatusCode::TOO_MANY_REQUESTS, ""),
            CompletionError::RateLimited
        ));
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            assert!(matches!(
                classify_status("openai", status, "boom"),
                CompletionError::Other(_)
            ));
        }
    }

    #[test]
    fn claude_response_blocks_decode() {
        let raw = r#"{"content":[{"type":"text","text":"{\"score\":0.9}"},{"type":"tool_use","id":"x","name":"t","input":{}}]}"#;
        let parsed: ClaudeResponse = serde_json::from_str(raw).unwrap();
        let text: String = parsed
            .content
            .into_iter()
            .filter_map(|b| match b {
                ClaudeBlock::Text { text } => Some(text),
                ClaudeBlock::Unknown => None,
            })
            .collect();
        assert_eq!(text, "{\"score\":0.9}");
    }
}
