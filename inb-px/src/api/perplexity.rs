//! POST /api/perplexity

use axum::{body::Bytes, extract::State, Json};
use inb_common::ai::helper::PERPLEXITY_KEY_MISSING;
use inb_common::ai::AiResponse;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::chatgpt::{parse_body, require_messages};
use super::error::{ProxyError, ProxyResult};
use crate::ProxyState;

#[derive(Debug, Default, Deserialize)]
struct SearchBody {
    #[serde(default)]
    messages: Option<Value>,
}

/// Search-backed answer with citations, using the server-held key
pub async fn perplexity(
    State(state): State<ProxyState>,
    body: Bytes,
) -> ProxyResult<Json<AiResponse<String>>> {
    let body: SearchBody = parse_body(&body)?;
    let messages = require_messages(body.messages)?;
    let client = state
        .perplexity
        .as_ref()
        .ok_or(ProxyError::NotConfigured(PERPLEXITY_KEY_MISSING))?;

    debug!(messages = messages.len(), "Proxying search");
    let answer = client.search(&messages).await?;
    Ok(Json(AiResponse::ok(answer)))
}
