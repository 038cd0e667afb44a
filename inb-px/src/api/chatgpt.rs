//! POST /api/chatgpt

use axum::{body::Bytes, extract::State, Json};
use inb_common::ai::helper::OPENAI_KEY_MISSING;
use inb_common::ai::{AiResponse, ChatMessage, ChatRequest};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::error::{ProxyError, ProxyResult};
use crate::ProxyState;

pub(crate) const MESSAGES_REQUIRED: &str = "Messages array is required";

#[derive(Debug, Default, Deserialize)]
struct ChatBody {
    #[serde(default)]
    messages: Option<Value>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default)]
    max_tokens: Option<u32>,
}

/// Decode a JSON body; an empty body counts as `{}`
pub(crate) fn parse_body<T>(body: &Bytes) -> ProxyResult<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ProxyError::BadRequest(format!("Invalid request body: {}", e)))
}

/// `messages` must be an array of chat messages
pub(crate) fn require_messages(messages: Option<Value>) -> ProxyResult<Vec<ChatMessage>> {
    match messages {
        Some(messages @ Value::Array(_)) => serde_json::from_value(messages)
            .map_err(|e| ProxyError::BadRequest(format!("Invalid messages: {}", e))),
        _ => Err(ProxyError::BadRequest(MESSAGES_REQUIRED.to_string())),
    }
}

/// Chat completion with the server-held OpenAI key
pub async fn chatgpt(
    State(state): State<ProxyState>,
    body: Bytes,
) -> ProxyResult<Json<AiResponse<String>>> {
    let body: ChatBody = parse_body(&body)?;
    let messages = require_messages(body.messages)?;
    let client = state
        .openai
        .as_ref()
        .ok_or(ProxyError::NotConfigured(OPENAI_KEY_MISSING))?;

    debug!(messages = messages.len(), "Proxying chat completion");
    let request = ChatRequest {
        messages,
        model: body.model,
        temperature: body.temperature,
        max_tokens: body.max_tokens,
    };
    let answer = client.chat(&request).await?;
    Ok(Json(AiResponse::ok(answer)))
}
