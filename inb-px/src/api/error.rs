//! Error envelope for the proxy API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use inb_common::ai::AiResponse;
use thiserror::Error;
use tracing::error;

/// API error type; every variant renders `{success: false, error}`
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Method other than the endpoint's own or OPTIONS (405)
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Missing or malformed request data (400)
    #[error("{0}")]
    BadRequest(String),

    /// Provider secret not configured (500)
    #[error("{0}")]
    NotConfigured(&'static str),

    /// Provider call failed (500)
    #[error("{0}")]
    Upstream(#[from] inb_common::Error),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ProxyError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
            }
            ProxyError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ProxyError::NotConfigured(msg) => {
                error!("{}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg.to_string())
            }
            ProxyError::Upstream(err) => {
                error!(error = %err, "Provider request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.user_message())
            }
        };

        (status, Json(AiResponse::<()>::err(message))).into_response()
    }
}

/// Result type for API handlers
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Fallback for methods an endpoint does not serve
pub async fn method_not_allowed() -> ProxyError {
    ProxyError::MethodNotAllowed
}
