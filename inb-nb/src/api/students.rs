//! Student login, history and teacher listing

use axum::{
    extract::{Path, State},
    Json,
};
use inb_common::sanitize::Document;
use inb_common::{InquiryEntry, Student};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
}

/// POST /api/login
///
/// Resolves name + code to a student, creating the notebook on first login.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<Student>> {
    let student = state
        .repo
        .get_or_create_student(&request.name, &request.code)
        .await?;
    info!(student_id = %student.student_id, "Student logged in");
    Ok(Json(student))
}

/// GET /api/students
///
/// Teacher view: every student, sorted by name.
pub async fn list_students(State(state): State<AppState>) -> Json<Vec<Student>> {
    Json(state.repo.list_students().await)
}

/// GET /api/students/:student_id/entries
///
/// Entry history, newest date first. Empty on any read failure.
pub async fn list_entries(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Json<Vec<InquiryEntry>> {
    Json(state.repo.get_all_entries(&student_id).await)
}

#[derive(Debug, Serialize)]
pub struct PendingEntry {
    pub date: String,
    pub error: String,
    pub entry: Document,
}

/// GET /api/students/:student_id/pending
///
/// Entries saved locally whose store write failed.
pub async fn list_pending(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Json<Vec<PendingEntry>> {
    let pending = state
        .repo
        .pending_entries(&student_id)
        .into_iter()
        .map(|record| PendingEntry {
            date: record.date,
            error: record.error,
            entry: record.document,
        })
        .collect();
    Json(pending)
}
