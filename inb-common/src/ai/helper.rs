//! AI helper used by the notebook service
//!
//! The transport is fixed at construction from [`AiSettings::use_proxy`]:
//! - proxy: requests go to the proxy service, which holds the secrets
//! - direct: providers are called with locally configured keys
//!
//! Every call returns an [`AiResponse`]; failures never propagate as errors.

use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use super::prompts::{
    help_request, scientist_request, search_messages, HelpContext, HelpKind, ScientistContext,
    SearchPurpose,
};
use super::providers::{OpenAiClient, PerplexityClient, YouTubeClient};
use super::types::{AiResponse, ChatMessage, ChatRequest, SearchRequest, VideoSummary};
use crate::config::AiSettings;
use crate::model::DialogueMessage;
use crate::{Error, Result};

const PROXY_TIMEOUT: Duration = Duration::from_secs(90);

pub const OPENAI_KEY_MISSING: &str =
    "OpenAI API 키가 설정되지 않았습니다. 환경 변수를 확인해주세요.";
pub const PERPLEXITY_KEY_MISSING: &str =
    "Perplexity API 키가 설정되지 않았습니다. 환경 변수를 확인해주세요.";
pub const YOUTUBE_KEY_MISSING: &str =
    "YouTube API 키가 설정되지 않았습니다. 환경 변수를 확인해주세요.";

enum Transport {
    Proxy {
        http_client: Client,
        base_url: String,
    },
    Direct {
        openai: Option<OpenAiClient>,
        perplexity: Option<PerplexityClient>,
        youtube: Option<YouTubeClient>,
    },
}

pub struct AiHelper {
    transport: Transport,
}

impl AiHelper {
    pub fn from_settings(settings: &AiSettings) -> Result<Self> {
        let transport = if settings.use_proxy {
            let http_client = Client::builder()
                .timeout(PROXY_TIMEOUT)
                .build()
                .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
            Transport::Proxy {
                http_client,
                base_url: settings.proxy_base_url.trim_end_matches('/').to_string(),
            }
        } else {
            let openai = settings
                .openai_api_key
                .as_deref()
                .map(|key| {
                    OpenAiClient::new(&settings.openai_base_url, key)
                        .map(|c| c.with_default_model(&settings.openai_model))
                })
                .transpose()?;
            let perplexity = settings
                .perplexity_api_key
                .as_deref()
                .map(|key| PerplexityClient::new(&settings.perplexity_base_url, key))
                .transpose()?;
            let youtube = settings
                .youtube_api_key
                .as_deref()
                .map(|key| YouTubeClient::new(&settings.youtube_base_url, key))
                .transpose()?;
            Transport::Direct {
                openai,
                perplexity,
                youtube,
            }
        };
        Ok(Self { transport })
    }

    pub fn uses_proxy(&self) -> bool {
        matches!(self.transport, Transport::Proxy { .. })
    }

    /// Chat completion (hints, scientist dialogue)
    pub async fn chat(&self, request: &ChatRequest) -> AiResponse<String> {
        match &self.transport {
            Transport::Proxy {
                http_client,
                base_url,
            } => {
                let req = http_client
                    .post(format!("{}/api/chatgpt", base_url))
                    .json(request);
                proxy_call(req).await
            }
            Transport::Direct { openai, .. } => match openai {
                Some(client) => log_failure("OpenAI", client.chat(request).await).into(),
                None => AiResponse::err(OPENAI_KEY_MISSING),
            },
        }
    }

    /// Search-backed answer with citations
    pub async fn search(&self, messages: Vec<ChatMessage>) -> AiResponse<String> {
        match &self.transport {
            Transport::Proxy {
                http_client,
                base_url,
            } => {
                let req = http_client
                    .post(format!("{}/api/perplexity", base_url))
                    .json(&SearchRequest { messages });
                proxy_call(req).await
            }
            Transport::Direct { perplexity, .. } => match perplexity {
                Some(client) => log_failure("Perplexity", client.search(&messages).await).into(),
                None => AiResponse::err(PERPLEXITY_KEY_MISSING),
            },
        }
    }

    /// Science video search
    pub async fn videos(&self, query: &str, max_results: u32) -> AiResponse<Vec<VideoSummary>> {
        match &self.transport {
            Transport::Proxy {
                http_client,
                base_url,
            } => {
                let max_results = max_results.to_string();
                let req = http_client
                    .get(format!("{}/api/youtube", base_url))
                    .query(&[("q", query), ("maxResults", max_results.as_str())]);
                proxy_call(req).await
            }
            Transport::Direct { youtube, .. } => match youtube {
                Some(client) => {
                    log_failure("YouTube", client.search_videos(query, max_results).await).into()
                }
                None => AiResponse::err(YOUTUBE_KEY_MISSING),
            },
        }
    }

    /// Hint for one of the entry's fields
    pub async fn suggest(&self, kind: HelpKind, ctx: &HelpContext) -> AiResponse<String> {
        self.chat(&help_request(kind, ctx)).await
    }

    pub async fn search_science(&self, purpose: SearchPurpose, query: &str) -> AiResponse<String> {
        self.search(search_messages(purpose, query)).await
    }

    /// Next turn of a scientist-persona dialogue
    pub async fn scientist_turn(
        &self,
        scientist_name: &str,
        ctx: &ScientistContext,
        history: &[DialogueMessage],
    ) -> AiResponse<String> {
        self.chat(&scientist_request(scientist_name, ctx, history))
            .await
    }
}

fn log_failure<T>(provider: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        warn!(provider, error = %e, "AI request failed");
    }
    result
}

/// Send a request to the proxy and unwrap its envelope
async fn proxy_call<T>(request: reqwest::RequestBuilder) -> AiResponse<T>
where
    T: serde::de::DeserializeOwned,
{
    let response = match request.send().await {
        Ok(r) => r,
        Err(e) => {
            warn!("AI proxy unreachable: {}", e);
            return AiResponse::err(Error::from(e).user_message());
        }
    };

    let status = response.status();
    let envelope = response.json::<AiResponse<T>>().await;
    debug!(status = status.as_u16(), "AI proxy responded");

    match envelope {
        Ok(envelope) if status.is_success() => envelope,
        Ok(envelope) => AiResponse::err(format!(
            "AI 프록시 오류: {} - {}",
            status.as_u16(),
            envelope.error.unwrap_or_else(|| "알 수 없는 오류".to_string())
        )),
        Err(e) => {
            warn!("AI proxy response unreadable: {}", e);
            AiResponse::err(format!("AI 프록시 오류: {} - 알 수 없는 오류", status.as_u16()))
        }
    }
}
