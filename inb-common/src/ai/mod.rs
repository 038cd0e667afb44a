//! AI assistance: provider clients, prompt builders and the notebook helper

pub mod helper;
pub mod prompts;
pub mod providers;
pub mod types;

pub use helper::AiHelper;
pub use prompts::{HelpContext, HelpKind, ScientistContext, SearchPurpose};
pub use providers::{OpenAiClient, PerplexityClient, YouTubeClient};
pub use types::{AiResponse, ChatMessage, ChatRequest, ChatRole, SearchRequest, VideoSummary};
