//! Error responses for the notebook API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Save failed; the entry is kept locally as pending
    #[error("Save failed: {0}")]
    SaveFailed(inb_common::Error),

    /// inb-common error
    #[error("Common error: {0}")]
    Common(#[from] inb_common::Error),
}

/// Status and code for a library error
fn classify(err: &inb_common::Error) -> (StatusCode, &'static str) {
    use inb_common::Error;
    match err {
        Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        Error::PermissionDenied(_) => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
        Error::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
        Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
        Error::Provider(_) => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
        e if e.is_transient() => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, pending) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, false),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, false),
            ApiError::SaveFailed(ref err) => {
                let (status, code) = classify(err);
                (status, code, err.user_message(), true)
            }
            ApiError::Common(ref err) => {
                let (status, code) = classify(err);
                (status, code, err.user_message(), false)
            }
        };

        let mut body = json!({
            "error": {
                "code": code,
                "message": message,
            }
        });
        if pending {
            body["pending"] = json!(true);
        }

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_maps_to_503() {
        let err = inb_common::Error::Unavailable("offline".into());
        let response = ApiError::SaveFailed(err).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_invalid_input_maps_to_400() {
        let err = inb_common::Error::InvalidInput("bad date".into());
        assert_eq!(ApiError::from(err).into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_permission_maps_to_403() {
        let err = inb_common::Error::PermissionDenied("rules".into());
        assert_eq!(ApiError::from(err).into_response().status(), StatusCode::FORBIDDEN);
    }
}
