//! Third-party AI and video API clients
//!
//! - OpenAI chat completions (`{base}/chat/completions`)
//! - Perplexity chat completions with citations (`{base}/chat/completions`)
//! - YouTube Data API v3 search + video details (`{base}/search`, `{base}/videos`)
//!
//! Non-2xx responses become [`Error::Provider`] carrying
//! `"<Provider> API error: <status> - <message>"`.

use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::types::{ChatMessage, ChatRequest, VideoSummary};
use crate::{Error, Result};

/// Returned when a completion carries no content
pub const EMPTY_ANSWER: &str = "응답을 받지 못했습니다.";

const UNKNOWN_ERROR: &str = "알 수 없는 오류";

pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const OPENAI_DEFAULT_TEMPERATURE: f32 = 0.7;
pub const OPENAI_DEFAULT_MAX_TOKENS: u32 = 500;

pub const PERPLEXITY_MODEL: &str = "llama-3.1-sonar-small-128k-online";
const PERPLEXITY_MAX_TOKENS: u32 = 600;
const PERPLEXITY_TEMPERATURE: f32 = 0.3;
const MAX_CITATIONS: usize = 3;

pub const YOUTUBE_DEFAULT_MAX_RESULTS: u32 = 5;
/// Appended to every video query to keep results classroom-appropriate
const YOUTUBE_QUERY_SUFFIX: &str = "초등학교 과학 실험";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

fn build_http_client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Build the provider error from a non-2xx response
async fn provider_error(provider: &str, response: Response) -> Error {
    let status = response.status().as_u16();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    let message = body
        .pointer("/error/message")
        .and_then(Value::as_str)
        .or_else(|| body.get("error").and_then(Value::as_str))
        .unwrap_or(UNKNOWN_ERROR);
    warn!(provider, status, message, "Provider returned an error");
    Error::Provider(format!("{} API error: {} - {}", provider, status, message))
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionResponse {
    fn answer(&self) -> String {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.clone())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| EMPTY_ANSWER.to_string())
    }
}

/// OpenAI chat completions client
pub struct OpenAiClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    default_model: String,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        Ok(Self {
            http_client: build_http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            default_model: OPENAI_DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_default_model(mut self, model: &str) -> Self {
        if !model.trim().is_empty() {
            self.default_model = model.to_string();
        }
        self
    }

    /// Run a chat completion; unset options take the client defaults
    pub async fn chat(&self, request: &ChatRequest) -> Result<String> {
        let body = json!({
            "model": request.model.as_deref().unwrap_or(&self.default_model),
            "messages": request.messages,
            "temperature": request.temperature.unwrap_or(OPENAI_DEFAULT_TEMPERATURE),
            "max_tokens": request.max_tokens.unwrap_or(OPENAI_DEFAULT_MAX_TOKENS),
        });
        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, messages = request.messages.len(), "Calling OpenAI");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(provider_error("OpenAI", response).await);
        }

        let completion: CompletionResponse = response.json().await?;
        Ok(completion.answer())
    }
}

/// Perplexity search-backed completions client
pub struct PerplexityClient {
    http_client: Client,
    base_url: String,
    api_key: String,
}

impl PerplexityClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        Ok(Self {
            http_client: build_http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Ask with citations; up to three sources are appended to the answer
    pub async fn search(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = json!({
            "model": PERPLEXITY_MODEL,
            "messages": messages,
            "max_tokens": PERPLEXITY_MAX_TOKENS,
            "temperature": PERPLEXITY_TEMPERATURE,
            "return_citations": true,
        });
        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, "Calling Perplexity");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(provider_error("Perplexity", response).await);
        }

        let completion: CompletionResponse = response.json().await?;
        Ok(append_citations(completion.answer(), &completion.citations))
    }
}

/// Append a numbered reference list of at most [`MAX_CITATIONS`] sources
pub fn append_citations(answer: String, citations: &[String]) -> String {
    if citations.is_empty() {
        return answer;
    }
    let list: Vec<String> = citations
        .iter()
        .take(MAX_CITATIONS)
        .enumerate()
        .map(|(i, url)| format!("{}. {}", i + 1, url))
        .collect();
    format!("{}\n\n📚 참고 자료:\n{}", answer, list.join("\n"))
}

#[derive(Debug, Deserialize)]
struct YtSearchResponse {
    #[serde(default)]
    items: Vec<YtSearchItem>,
}

#[derive(Debug, Deserialize)]
struct YtSearchItem {
    id: YtSearchId,
    snippet: YtSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YtSearchId {
    #[serde(default)]
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YtSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    channel_title: String,
    #[serde(default)]
    published_at: String,
    #[serde(default)]
    thumbnails: HashMap<String, YtThumbnail>,
}

#[derive(Debug, Deserialize)]
struct YtThumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct YtVideosResponse {
    #[serde(default)]
    items: Vec<YtVideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YtVideoItem {
    id: String,
    #[serde(default)]
    content_details: Option<YtContentDetails>,
}

#[derive(Debug, Deserialize)]
struct YtContentDetails {
    #[serde(default)]
    duration: Option<String>,
}

/// YouTube Data API client
pub struct YouTubeClient {
    http_client: Client,
    base_url: String,
    api_key: String,
}

impl YouTubeClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        Ok(Self {
            http_client: build_http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Search science videos for `query`
    ///
    /// Durations come from a second details lookup; if that lookup fails the
    /// search results are still returned without durations.
    pub async fn search_videos(&self, query: &str, max_results: u32) -> Result<Vec<VideoSummary>> {
        let search_query = format!("{} {}", query, YOUTUBE_QUERY_SUFFIX);
        let max_results = max_results.to_string();
        debug!(query = %search_query, "Searching YouTube");

        let response = self
            .http_client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("part", "snippet"),
                ("q", search_query.as_str()),
                ("type", "video"),
                ("maxResults", max_results.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(provider_error("YouTube", response).await);
        }

        let search: YtSearchResponse = response.json().await?;
        let items: Vec<(String, YtSnippet)> = search
            .items
            .into_iter()
            .filter_map(|item| Some((item.id.video_id?, item.snippet)))
            .collect();
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<&str> = items.iter().map(|(id, _)| id.as_str()).collect();
        let durations = self.fetch_durations(&ids.join(",")).await;

        let videos: Vec<VideoSummary> = items
            .into_iter()
            .map(|(video_id, snippet)| {
                let duration = durations
                    .get(&video_id)
                    .and_then(|iso| parse_iso8601_duration(iso))
                    .and_then(format_duration);
                let thumbnail = snippet
                    .thumbnails
                    .get("medium")
                    .or_else(|| snippet.thumbnails.get("default"))
                    .map(|t| t.url.clone())
                    .unwrap_or_default();
                VideoSummary {
                    video_id,
                    title: snippet.title,
                    description: snippet.description,
                    thumbnail,
                    channel_title: snippet.channel_title,
                    published_at: snippet.published_at,
                    duration,
                }
            })
            .collect();

        info!(count = videos.len(), "YouTube search complete");
        Ok(videos)
    }

    async fn fetch_durations(&self, ids: &str) -> HashMap<String, String> {
        let result = self
            .http_client
            .get(format!("{}/videos", self.base_url))
            .query(&[
                ("part", "snippet,contentDetails"),
                ("id", ids),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await;

        let response = match result {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!(status = r.status().as_u16(), "Video details lookup failed");
                return HashMap::new();
            }
            Err(e) => {
                warn!("Video details lookup failed: {}", e);
                return HashMap::new();
            }
        };

        match response.json::<YtVideosResponse>().await {
            Ok(details) => details
                .items
                .into_iter()
                .filter_map(|item| Some((item.id, item.content_details?.duration?)))
                .collect(),
            Err(e) => {
                warn!("Video details response unreadable: {}", e);
                HashMap::new()
            }
        }
    }
}

/// Parse `PT#H#M#S` into seconds
pub fn parse_iso8601_duration(iso: &str) -> Option<u64> {
    let rest = iso.strip_prefix("PT")?;
    let mut total = 0u64;
    let mut number = String::new();
    for c in rest.chars() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }
        let value: u64 = number.parse().ok()?;
        number.clear();
        total += match c {
            'H' => value * 3600,
            'M' => value * 60,
            'S' => value,
            _ => return None,
        };
    }
    if !number.is_empty() {
        return None;
    }
    Some(total)
}

/// `m:ss`; zero-length videos have no displayable duration
pub fn format_duration(seconds: u64) -> Option<String> {
    if seconds == 0 {
        return None;
    }
    Some(format!("{}:{:02}", seconds / 60, seconds % 60))
}
