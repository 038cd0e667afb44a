//! AI help endpoints
//!
//! Each answered request is appended to the entry's AI help log. Logging is
//! best-effort: a failed or skipped append never hides the answer.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use inb_common::ai::prompts::{help_prompt, scientist_opening_prompt};
use inb_common::ai::providers::YOUTUBE_DEFAULT_MAX_RESULTS;
use inb_common::ai::{
    AiResponse, HelpContext, HelpKind, ScientistContext, SearchPurpose, VideoSummary,
};
use inb_common::model::{AiLogRequest, AiProvider, DialogueMessage, DialogueRole};
use inb_common::InquiryEntry;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::entries::validate_date;
use super::error::{ApiError, ApiResult};
use crate::AppState;

/// Field recorded for scientist dialogue turns
const SCIENTIST_LOG_FIELD: &str = "scientistNote";

/// AI envelope plus whether the exchange was written to the help log
#[derive(Debug, Serialize)]
pub struct LoggedAiResponse {
    #[serde(flatten)]
    pub response: AiResponse<String>,
    pub logged: bool,
}

async fn log_exchange(
    state: &AppState,
    student_id: &str,
    date: &str,
    provider: AiProvider,
    log: AiLogRequest,
) -> bool {
    match state
        .repo
        .append_ai_help_log(student_id, date, provider, &log)
        .await
    {
        Ok(appended) => appended,
        Err(e) => {
            warn!(student_id = %student_id, date = %date, error = %e, "AI help log not written");
            false
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HelpRequest {
    pub kind: HelpKind,
    #[serde(flatten)]
    pub context: HelpContext,
}

/// POST /api/students/:student_id/entries/:date/help
pub async fn request_help(
    State(state): State<AppState>,
    Path((student_id, date)): Path<(String, String)>,
    Json(request): Json<HelpRequest>,
) -> ApiResult<Json<LoggedAiResponse>> {
    validate_date(&date)?;
    let response = state.ai.suggest(request.kind, &request.context).await;

    let logged = match &response.data {
        Some(answer) if response.success => {
            let log = AiLogRequest {
                field: Some(request.kind.field().to_string()),
                prompt: Some(help_prompt(request.kind, &request.context)),
                response: answer.clone(),
                ..Default::default()
            };
            log_exchange(&state, &student_id, &date, AiProvider::Chatgpt, log).await
        }
        _ => false,
    };

    Ok(Json(LoggedAiResponse { response, logged }))
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    pub purpose: SearchPurpose,
    #[serde(default)]
    pub query: String,
}

/// POST /api/students/:student_id/entries/:date/search
pub async fn request_search(
    State(state): State<AppState>,
    Path((student_id, date)): Path<(String, String)>,
    Json(body): Json<SearchBody>,
) -> ApiResult<Json<LoggedAiResponse>> {
    validate_date(&date)?;
    let query = body.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Search query is required".to_string()));
    }

    let response = state.ai.search_science(body.purpose, query).await;

    let logged = match &response.data {
        Some(answer) if response.success => {
            let log = AiLogRequest {
                purpose: Some(body.purpose.as_str().to_string()),
                query: Some(query.to_string()),
                response: answer.clone(),
                ..Default::default()
            };
            log_exchange(&state, &student_id, &date, AiProvider::Perplexity, log).await
        }
        _ => false,
    };

    Ok(Json(LoggedAiResponse { response, logged }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScientistBody {
    pub scientist_name: String,
    #[serde(default)]
    pub history: Vec<DialogueMessage>,
    /// Entry fields to discuss; read from the stored entry when omitted
    #[serde(default)]
    pub context: Option<ScientistContext>,
}

fn context_from_entry(entry: &InquiryEntry) -> ScientistContext {
    ScientistContext {
        today_topic: entry.today_topic.clone(),
        questions: entry.questions.clone(),
        observations: entry.observations.clone(),
        methods: entry.methods.clone(),
        findings: entry.findings.clone(),
    }
}

/// POST /api/students/:student_id/entries/:date/scientist
pub async fn scientist_turn(
    State(state): State<AppState>,
    Path((student_id, date)): Path<(String, String)>,
    Json(body): Json<ScientistBody>,
) -> ApiResult<Json<LoggedAiResponse>> {
    validate_date(&date)?;

    let context = match body.context {
        Some(context) => context,
        None => state
            .repo
            .get_entry(&student_id, &date)
            .await?
            .map(|entry| context_from_entry(&entry))
            .unwrap_or_default(),
    };

    let response = state
        .ai
        .scientist_turn(&body.scientist_name, &context, &body.history)
        .await;

    let logged = match &response.data {
        Some(answer) if response.success => {
            let prompt = body
                .history
                .iter()
                .rev()
                .find(|m| m.role == DialogueRole::Student)
                .map(|m| m.content.clone())
                .unwrap_or_else(|| scientist_opening_prompt(&context));
            let log = AiLogRequest {
                field: Some(SCIENTIST_LOG_FIELD.to_string()),
                prompt: Some(prompt),
                response: answer.clone(),
                ..Default::default()
            };
            log_exchange(&state, &student_id, &date, AiProvider::Chatgpt, log).await
        }
        _ => false,
    };

    Ok(Json(LoggedAiResponse { response, logged }))
}

#[derive(Debug, Deserialize)]
pub struct VideoQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default, rename = "maxResults")]
    pub max_results: Option<u32>,
}

/// GET /api/videos
pub async fn search_videos(
    State(state): State<AppState>,
    Query(query): Query<VideoQuery>,
) -> ApiResult<Json<AiResponse<Vec<VideoSummary>>>> {
    let q = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Query parameter q is required".to_string()))?;
    let max_results = query.max_results.unwrap_or(YOUTUBE_DEFAULT_MAX_RESULTS);
    Ok(Json(state.ai.videos(q, max_results).await))
}
