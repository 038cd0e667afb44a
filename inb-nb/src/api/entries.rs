//! Daily entry read, save, draft auto-save and AI log endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use inb_common::model::{AiLogRequest, AiProvider};
use inb_common::time::{is_future, is_today, is_valid_date};
use inb_common::{EntrySource, InquiryEntry};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::error::{ApiError, ApiResult};
use crate::AppState;

/// Reject path dates that are not `YYYY-MM-DD`
pub(crate) fn validate_date(date: &str) -> ApiResult<()> {
    if is_valid_date(date) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("Invalid date: {}", date)))
    }
}

/// Checks shared by manual saves and drafts
fn validate_entry_for_save(date: &str, entry: &InquiryEntry) -> ApiResult<()> {
    validate_date(date)?;
    if entry.date != date {
        return Err(ApiError::BadRequest(format!(
            "Entry date {} does not match {}",
            entry.date, date
        )));
    }
    if is_future(date) {
        return Err(ApiError::BadRequest(format!("Cannot save a future date: {}", date)));
    }
    if let Some(voice) = &entry.voice_recording {
        if STANDARD.decode(voice.data_base64.as_bytes()).is_err() {
            return Err(ApiError::BadRequest(
                "Voice recording is not valid base64".to_string(),
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub entry: InquiryEntry,
    /// Whether a document exists for the date
    pub exists: bool,
    /// Only today's entry can be edited
    pub editable: bool,
    /// The store was unreachable and `entry` is the last local copy
    #[serde(rename = "fromCache")]
    pub from_cache: bool,
}

/// GET /api/students/:student_id/entries/:date
pub async fn get_entry(
    State(state): State<AppState>,
    Path((student_id, date)): Path<(String, String)>,
) -> ApiResult<Json<EntryResponse>> {
    validate_date(&date)?;
    let response = match state.repo.load_entry(&student_id, &date).await? {
        Some((entry, source)) => EntryResponse {
            entry,
            exists: true,
            editable: is_today(&date),
            from_cache: source == EntrySource::Cache,
        },
        None => EntryResponse {
            entry: InquiryEntry::empty(date.as_str()),
            exists: false,
            editable: is_today(&date),
            from_cache: false,
        },
    };
    Ok(Json(response))
}

/// PUT /api/students/:student_id/entries/:date
///
/// Manual save. Any draft waiting on the auto-save timer is dropped since
/// the body carries the newer content.
pub async fn save_entry(
    State(state): State<AppState>,
    Path((student_id, date)): Path<(String, String)>,
    Json(entry): Json<InquiryEntry>,
) -> ApiResult<Json<Value>> {
    validate_entry_for_save(&date, &entry)?;

    if state.autosaver.cancel(&student_id, &date).await {
        debug!(student_id = %student_id, date = %date, "Manual save superseded pending draft");
    }

    state
        .repo
        .save_entry(&student_id, &entry)
        .await
        .map_err(|e| match e {
            inb_common::Error::InvalidInput(_) => ApiError::Common(e),
            e => ApiError::SaveFailed(e),
        })?;

    Ok(Json(json!({ "saved": true, "date": date })))
}

/// PUT /api/students/:student_id/entries/:date/draft
///
/// Debounced auto-save; the newest draft wins when the timer fires.
pub async fn save_draft(
    State(state): State<AppState>,
    Path((student_id, date)): Path<(String, String)>,
    Json(entry): Json<InquiryEntry>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    validate_entry_for_save(&date, &entry)?;
    if !inb_common::identity::is_valid_student_id(&student_id) {
        return Err(ApiError::BadRequest("Invalid student id".to_string()));
    }

    state.autosaver.schedule(&student_id, entry).await;
    let debounce_ms = state.autosaver.debounce().as_millis() as u64;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "scheduled": true, "debounceMs": debounce_ms })),
    ))
}

/// GET /api/students/:student_id/entries/:date/cached
///
/// Last copy confirmed written to the store, from the local cache.
pub async fn get_cached_entry(
    State(state): State<AppState>,
    Path((student_id, date)): Path<(String, String)>,
) -> ApiResult<Json<InquiryEntry>> {
    validate_date(&date)?;
    state
        .repo
        .get_cached_entry(&student_id, &date)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No cached entry for {}", date)))
}

#[derive(Debug, Deserialize)]
pub struct AiLogBody {
    pub provider: AiProvider,
    #[serde(flatten)]
    pub log: AiLogRequest,
}

/// POST /api/students/:student_id/entries/:date/ai-logs
pub async fn append_ai_log(
    State(state): State<AppState>,
    Path((student_id, date)): Path<(String, String)>,
    Json(body): Json<AiLogBody>,
) -> ApiResult<Json<Value>> {
    validate_date(&date)?;
    let appended = state
        .repo
        .append_ai_help_log(&student_id, &date, body.provider, &body.log)
        .await?;
    if appended {
        info!(student_id = %student_id, date = %date, provider = body.provider.log_key(), "AI help logged");
    }
    Ok(Json(json!({ "appended": appended })))
}
