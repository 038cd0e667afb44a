//! HTTP API handlers for inb-nb

pub mod ai;
pub mod entries;
pub mod error;
pub mod health;
pub mod students;

pub use ai::{request_help, request_search, scientist_turn, search_videos};
pub use entries::{append_ai_log, get_cached_entry, get_entry, save_draft, save_entry};
pub use error::{ApiError, ApiResult};
pub use health::health_routes;
pub use students::{list_entries, list_pending, list_students, login};
