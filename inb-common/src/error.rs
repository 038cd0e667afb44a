//! Common error types for the inquiry notebook

use thiserror::Error;

/// Common result type for notebook operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the notebook services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Document (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Store or provider unreachable (offline, connection refused, timeout)
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Configuration loading or validation error (missing credentials etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store rejected the request for lack of permission
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conditional write precondition failed (document changed underneath)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Third-party provider returned an error response
    #[error("{0}")]
    Provider(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Connectivity failures are the only class worth one reconnect-and-retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Unavailable(_) => true,
            Error::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            _ => false,
        }
    }

    /// Message suitable for showing to a student or teacher.
    pub fn user_message(&self) -> String {
        match self {
            Error::Unavailable(_) => "인터넷 연결을 확인해주세요.".to_string(),
            e if e.is_transient() => "인터넷 연결을 확인해주세요.".to_string(),
            Error::Config(_) => {
                "저장소 설정이 올바르지 않습니다. 환경 변수를 확인하세요.".to_string()
            }
            Error::PermissionDenied(_) => "저장소 보안 규칙을 확인해주세요.".to_string(),
            Error::NotFound(what) => format!("찾을 수 없습니다: {}", what),
            Error::InvalidInput(msg) | Error::Provider(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            Error::Unavailable(e.to_string())
        } else if e.is_decode() {
            Error::Internal(format!("Failed to decode response: {}", e))
        } else {
            Error::Provider(e.to_string())
        }
    }
}
