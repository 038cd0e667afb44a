//! inb-nb library - Notebook service
//!
//! HTTP API over the entry repository: student login, daily entries,
//! draft auto-save, AI help with logging and read-only teacher views.

use axum::Router;
use inb_common::ai::AiHelper;
use inb_common::autosave::AutoSaver;
use inb_common::EntryRepository;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub mod api;

/// Default listen port
pub const DEFAULT_PORT: u16 = 5780;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<EntryRepository>,
    pub ai: Arc<AiHelper>,
    pub autosaver: AutoSaver,
}

impl AppState {
    pub fn new(repo: Arc<EntryRepository>, ai: AiHelper, autosaver: AutoSaver) -> Self {
        Self {
            repo,
            ai: Arc::new(ai),
            autosaver,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post, put};

    let students = Router::new()
        .route("/api/login", post(api::login))
        .route("/api/students", get(api::list_students))
        .route("/api/students/:student_id/entries", get(api::list_entries))
        .route("/api/students/:student_id/pending", get(api::list_pending));

    let entries = Router::new()
        .route(
            "/api/students/:student_id/entries/:date",
            get(api::get_entry).put(api::save_entry),
        )
        .route(
            "/api/students/:student_id/entries/:date/draft",
            put(api::save_draft),
        )
        .route(
            "/api/students/:student_id/entries/:date/cached",
            get(api::get_cached_entry),
        )
        .route(
            "/api/students/:student_id/entries/:date/ai-logs",
            post(api::append_ai_log),
        );

    let ai = Router::new()
        .route("/api/students/:student_id/entries/:date/help", post(api::request_help))
        .route("/api/students/:student_id/entries/:date/search", post(api::request_search))
        .route(
            "/api/students/:student_id/entries/:date/scientist",
            post(api::scientist_turn),
        )
        .route("/api/videos", get(api::search_videos));

    Router::new()
        .merge(students)
        .merge(entries)
        .merge(ai)
        .merge(api::health_routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
