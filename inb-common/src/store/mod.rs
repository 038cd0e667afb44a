//! Document store abstraction
//!
//! Notebook data lives in a hierarchical document store:
//! - `students/{studentId}`
//! - `students/{studentId}/entries/{date}`
//!
//! Two backends implement [`DocumentStore`]:
//! - [`SqliteStore`]: local SQLite file (default, zero-config)
//! - [`FirestoreStore`]: Cloud Firestore over its REST API
//!
//! Both honour the same merge semantics (see [`merge`]) and the same network
//! gate: while the store's network mode is disabled every operation fails
//! with [`Error::Unavailable`], and `enable_network()` brings it back.

use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use tracing::{info, warn};

use crate::{Error, Result};

pub mod firestore;
mod firestore_value;
pub mod merge;
pub mod sqlite;

pub use crate::sanitize::Document;
pub use firestore::FirestoreStore;
pub use sqlite::SqliteStore;

/// Top-level collection holding student profiles
pub const STUDENTS: &str = "students";
/// Per-student sub-collection holding daily entries
pub const ENTRIES: &str = "entries";

/// `students/{studentId}`
pub fn student_path(student_id: &str) -> String {
    format!("{}/{}", STUDENTS, student_id)
}

/// `students/{studentId}/entries`
pub fn entries_collection(student_id: &str) -> String {
    format!("{}/{}/{}", STUDENTS, student_id, ENTRIES)
}

/// `students/{studentId}/entries/{date}`
pub fn entry_path(student_id: &str, date: &str) -> String {
    format!("{}/{}", entries_collection(student_id), date)
}

/// Split a document path into `(collection path, document id)`
///
/// Document paths have an even number of non-empty segments.
pub fn split_document_path(path: &str) -> Result<(String, String)> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() < 2 || segments.len() % 2 != 0 || segments.iter().any(|s| s.is_empty()) {
        return Err(Error::InvalidInput(format!("Invalid document path: {}", path)));
    }
    let (collection, id) = segments.split_at(segments.len() - 1);
    Ok((collection.join("/"), id[0].to_string()))
}

/// Collection paths have an odd number of non-empty segments
pub fn validate_collection_path(path: &str) -> Result<()> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() % 2 != 1 || segments.iter().any(|s| s.is_empty()) {
        return Err(Error::InvalidInput(format!("Invalid collection path: {}", path)));
    }
    Ok(())
}

/// How a write combines with an existing document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    /// Replace the whole document
    Overwrite,
    /// Merge fields; fields absent from the write are left untouched
    Merge,
}

/// Opaque document version used for optimistic concurrency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version(pub String);

/// Sort direction for collection listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Order a collection listing by a top-level field
///
/// Documents lacking the field are excluded from ordered listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Descending,
        }
    }

    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Ascending,
        }
    }

    /// Apply this ordering to an in-memory listing
    pub fn apply(&self, docs: &mut Vec<StoredDocument>) {
        docs.retain(|d| d.fields.contains_key(&self.field));
        docs.sort_by(|a, b| {
            let ord = compare_values(&a.fields[&self.field], &b.fields[&self.field]);
            match self.direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            }
        });
    }
}

/// Document as returned from a collection listing
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Last path segment (e.g. the date for entries)
    pub id: String,
    pub fields: Document,
}

/// Hierarchical document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Backend name for logs and health output
    fn backend_name(&self) -> &'static str;

    /// Fetch a document and its current version
    async fn get_versioned(&self, path: &str) -> Result<Option<(Document, Version)>>;

    /// Fetch a document
    async fn get(&self, path: &str) -> Result<Option<Document>> {
        Ok(self.get_versioned(path).await?.map(|(doc, _)| doc))
    }

    /// Write a document
    async fn set(&self, path: &str, fields: Document, mode: SetMode) -> Result<()>;

    /// Write only if the document is still at `expected` (`None` = must not exist)
    ///
    /// Fails with [`Error::Conflict`] when the precondition does not hold.
    async fn set_if_version(
        &self,
        path: &str,
        fields: Document,
        mode: SetMode,
        expected: Option<&Version>,
    ) -> Result<()>;

    /// List the documents of a collection, optionally ordered
    async fn list(&self, collection: &str, order: Option<&OrderBy>) -> Result<Vec<StoredDocument>>;

    /// Re-enable network access after going offline
    async fn enable_network(&self) -> Result<()>;

    /// Take the store offline; operations fail with `Unavailable` until re-enabled
    async fn disable_network(&self) -> Result<()>;

    /// Current network mode
    fn is_online(&self) -> bool;
}

/// Online/offline switch shared by both backends
#[derive(Debug)]
pub struct NetworkGate {
    online: AtomicBool,
}

impl Default for NetworkGate {
    fn default() -> Self {
        Self {
            online: AtomicBool::new(true),
        }
    }
}

impl NetworkGate {
    /// Fail fast while offline
    pub fn check(&self) -> Result<()> {
        if self.is_online() {
            Ok(())
        } else {
            Err(Error::Unavailable(
                "Document store is offline (network disabled)".to_string(),
            ))
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(AtomicOrdering::SeqCst)
    }

    pub fn enable(&self) {
        if !self.online.swap(true, AtomicOrdering::SeqCst) {
            info!("Document store network enabled");
        }
    }

    pub fn disable(&self) {
        if self.online.swap(false, AtomicOrdering::SeqCst) {
            warn!("Document store network disabled");
        }
    }
}

/// Total order over JSON values for listings: null < bool < number < string < other
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
