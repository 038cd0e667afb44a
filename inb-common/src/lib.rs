//! # Inquiry Notebook Common Library
//!
//! Shared code for the notebook and proxy services including:
//! - Notebook data model (students, daily inquiry entries)
//! - Student identity derivation
//! - Document store abstraction (SQLite and Firestore backends)
//! - Entry repository with local cache fallback
//! - AI provider clients and the AI helper
//! - Debounced auto-save
//! - Configuration loading
//! - Utility functions

pub mod ai;
pub mod autosave;
pub mod cache;
pub mod config;
pub mod error;
pub mod identity;
pub mod model;
pub mod repository;
pub mod sanitize;
pub mod store;
pub mod time;

pub use error::{Error, Result};
pub use model::{InquiryEntry, Student};
pub use repository::{EntryRepository, EntrySource};
