//! GET /api/youtube?q=&maxResults=

use axum::{
    extract::{Query, State},
    Json,
};
use inb_common::ai::helper::YOUTUBE_KEY_MISSING;
use inb_common::ai::providers::YOUTUBE_DEFAULT_MAX_RESULTS;
use inb_common::ai::{AiResponse, VideoSummary};
use std::collections::HashMap;

use super::error::{ProxyError, ProxyResult};
use crate::ProxyState;

/// Science video search with the server-held key
///
/// An unparseable `maxResults` falls back to the default.
pub async fn youtube(
    State(state): State<ProxyState>,
    Query(params): Query<HashMap<String, String>>,
) -> ProxyResult<Json<AiResponse<Vec<VideoSummary>>>> {
    let query = params
        .get("q")
        .map(|q| q.trim())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ProxyError::BadRequest("Query parameter \"q\" is required".to_string()))?;
    let max_results = params
        .get("maxResults")
        .and_then(|n| n.trim().parse::<u32>().ok())
        .unwrap_or(YOUTUBE_DEFAULT_MAX_RESULTS);
    let client = state
        .youtube
        .as_ref()
        .ok_or(ProxyError::NotConfigured(YOUTUBE_KEY_MISSING))?;

    let videos = client.search_videos(query, max_results).await?;
    Ok(Json(AiResponse::ok(videos)))
}
