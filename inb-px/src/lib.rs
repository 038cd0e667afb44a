//! inb-px library - AI proxy service
//!
//! Holds the provider secrets so browsers and the notebook service never
//! see them. Every endpoint answers with the `{success, data|error}`
//! envelope.

use axum::http::{header, Method};
use axum::routing::{get, post, MethodRouter};
use axum::Router;
use inb_common::ai::{OpenAiClient, PerplexityClient, YouTubeClient};
use inb_common::config::AiSettings;
use inb_common::Result;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub mod api;

/// Default listen port
pub const DEFAULT_PORT: u16 = 5781;

/// Provider clients; `None` where no key is configured
#[derive(Clone, Default)]
pub struct ProxyState {
    pub openai: Option<Arc<OpenAiClient>>,
    pub perplexity: Option<Arc<PerplexityClient>>,
    pub youtube: Option<Arc<YouTubeClient>>,
}

impl ProxyState {
    pub fn from_settings(settings: &AiSettings) -> Result<Self> {
        let openai = settings
            .openai_api_key
            .as_deref()
            .map(|key| {
                OpenAiClient::new(&settings.openai_base_url, key)
                    .map(|c| Arc::new(c.with_default_model(&settings.openai_model)))
            })
            .transpose()?;
        let perplexity = settings
            .perplexity_api_key
            .as_deref()
            .map(|key| PerplexityClient::new(&settings.perplexity_base_url, key).map(Arc::new))
            .transpose()?;
        let youtube = settings
            .youtube_api_key
            .as_deref()
            .map(|key| YouTubeClient::new(&settings.youtube_base_url, key).map(Arc::new))
            .transpose()?;
        Ok(Self {
            openai,
            perplexity,
            youtube,
        })
    }
}

/// CORS for one endpoint: any origin, `Content-Type`, the route's method plus OPTIONS
fn cors(method: Method) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([header::CONTENT_TYPE])
        .allow_methods([method, Method::OPTIONS])
}

/// Route with an OPTIONS preflight and a 405 for every other method
fn endpoint(method: Method, route: MethodRouter<ProxyState>) -> MethodRouter<ProxyState> {
    route
        .options(api::preflight)
        .fallback(api::method_not_allowed)
        .layer(cors(method))
}

/// Build application router
pub fn build_router(state: ProxyState) -> Router {
    Router::new()
        .route("/api/chatgpt", endpoint(Method::POST, post(api::chatgpt)))
        .route("/api/perplexity", endpoint(Method::POST, post(api::perplexity)))
        .route("/api/youtube", endpoint(Method::GET, get(api::youtube)))
        .merge(api::health_routes())
        .with_state(state)
}
