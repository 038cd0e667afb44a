//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::ProxyState;

/// Which provider secrets are configured
#[derive(Debug, Serialize)]
pub struct ProvidersStatus {
    pub openai: bool,
    pub perplexity: bool,
    pub youtube: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub git_hash: String,
    pub build_timestamp: String,
    pub build_profile: String,
    pub providers: ProvidersStatus,
}

/// GET /health
pub async fn health_check(State(state): State<ProxyState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "inb-px".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
        providers: ProvidersStatus {
            openai: state.openai.is_some(),
            perplexity: state.perplexity.is_some(),
            youtube: state.youtube.is_some(),
        },
    })
}

/// Build health check routes
pub fn health_routes() -> Router<ProxyState> {
    Router::new().route("/health", get(health_check))
}
