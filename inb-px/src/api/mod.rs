//! HTTP API handlers for inb-px

pub mod chatgpt;
pub mod error;
pub mod health;
pub mod perplexity;
pub mod youtube;

use axum::http::StatusCode;

pub use chatgpt::chatgpt;
pub use error::{method_not_allowed, ProxyError, ProxyResult};
pub use health::health_routes;
pub use perplexity::perplexity;
pub use youtube::youtube;

/// OPTIONS on any endpoint: 200 with an empty body
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}
