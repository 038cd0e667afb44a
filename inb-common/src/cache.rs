//! Local entry cache
//!
//! A directory of JSON files, one per key, standing in for the browser's
//! local storage. Every operation is best-effort: failures are logged and
//! reported as "nothing cached", never raised.
//!
//! Keys:
//! - `entry_{studentId}_{date}`: last entry confirmed written to the store
//! - `entry_{studentId}_{date}_pending`: entry whose write failed, carrying
//!   `_pending: true` and `_error`

use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::sanitize::Document;

/// Suffix marking an unsynced local write
const PENDING_SUFFIX: &str = "_pending";

/// Cached entry that never reached the store
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRecord {
    pub date: String,
    pub error: String,
    /// Sanitized entry fields plus the `_pending` / `_error` markers
    pub document: Document,
}

/// File-backed key/value cache
#[derive(Debug, Clone)]
pub struct LocalCache {
    dir: PathBuf,
}

impl LocalCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!("Failed to create cache directory {}: {}", dir.display(), e);
        }
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry_key(student_id: &str, date: &str) -> String {
        format!("entry_{}_{}", student_id, date)
    }

    pub fn pending_key(student_id: &str, date: &str) -> String {
        format!("{}{}", Self::entry_key(student_id, date), PENDING_SUFFIX)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }

    /// Store a value; returns whether it was written
    pub fn put(&self, key: &str, value: &Value) -> bool {
        let path = self.path_for(key);
        let result = serde_json::to_vec(value)
            .map_err(std::io::Error::from)
            .and_then(|bytes| std::fs::write(&path, bytes));
        match result {
            Ok(()) => {
                debug!(key = %key, "Cached");
                true
            }
            Err(e) => {
                warn!("Local cache write failed for {}: {}", key, e);
                false
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let path = self.path_for(key);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Local cache read failed for {}: {}", key, e);
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Local cache entry {} is corrupt: {}", key, e);
                None
            }
        }
    }

    pub fn remove(&self, key: &str) {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => debug!(key = %key, "Cache entry removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Local cache remove failed for {}: {}", key, e),
        }
    }

    /// Mirror a confirmed write
    pub fn cache_entry(&self, student_id: &str, date: &str, doc: &Document) -> bool {
        self.put(
            &Self::entry_key(student_id, date),
            &Value::Object(doc.clone()),
        )
    }

    /// Record a failed write with the error that caused it
    pub fn cache_pending(&self, student_id: &str, date: &str, doc: &Document, error: &str) -> bool {
        let mut marked = doc.clone();
        marked.insert("_pending".into(), Value::Bool(true));
        marked.insert("_error".into(), Value::String(error.to_string()));
        self.put(&Self::pending_key(student_id, date), &Value::Object(marked))
    }

    /// Last confirmed copy of an entry
    pub fn cached_entry(&self, student_id: &str, date: &str) -> Option<Document> {
        match self.get(&Self::entry_key(student_id, date))? {
            Value::Object(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn clear_pending(&self, student_id: &str, date: &str) {
        self.remove(&Self::pending_key(student_id, date));
    }

    /// Pending records for one student, oldest date first
    pub fn pending_entries(&self, student_id: &str) -> Vec<PendingRecord> {
        let prefix = Self::entry_key(student_id, "");
        let read_dir = match std::fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) => {
                warn!("Local cache listing failed: {}", e);
                return Vec::new();
            }
        };

        let mut records: Vec<PendingRecord> = read_dir
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                let key = name.strip_suffix(".json")?;
                let date = key.strip_prefix(&prefix)?.strip_suffix(PENDING_SUFFIX)?;
                let doc = match self.get(key)? {
                    Value::Object(doc) => doc,
                    _ => return None,
                };
                let error = doc
                    .get("_error")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Some(PendingRecord {
                    date: date.to_string(),
                    error,
                    document: doc,
                })
            })
            .collect();

        records.sort_by(|a, b| a.date.cmp(&b.date));
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_keys() {
        assert_eq!(LocalCache::entry_key("abc", "2025-03-01"), "entry_abc_2025-03-01");
        assert_eq!(
            LocalCache::pending_key("abc", "2025-03-01"),
            "entry_abc_2025-03-01_pending"
        );
    }

    #[test]
    fn test_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path());
        let entry = doc(json!({"date": "2025-03-01", "todayTopic": "씨앗"}));

        assert!(cache.cache_entry("abc", "2025-03-01", &entry));
        assert_eq!(cache.cached_entry("abc", "2025-03-01"), Some(entry));
        assert!(cache.cached_entry("abc", "2025-03-02").is_none());
    }

    #[test]
    fn test_pending_markers() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path());
        let entry = doc(json!({"date": "2025-03-02"}));

        cache.cache_pending("abc", "2025-03-02", &entry, "offline");
        cache.cache_pending("abc", "2025-03-01", &entry, "offline");
        cache.cache_pending("other", "2025-03-01", &entry, "offline");
        cache.cache_entry("abc", "2025-03-03", &entry);

        let pending = cache.pending_entries("abc");
        let dates: Vec<&str> = pending.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(dates, vec!["2025-03-01", "2025-03-02"]);
        assert_eq!(pending[0].error, "offline");
        assert_eq!(pending[0].document["_pending"], true);

        cache.clear_pending("abc", "2025-03-01");
        assert_eq!(cache.pending_entries("abc").len(), 1);
    }

    #[test]
    fn test_unwritable_dir_is_soft_failure() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();

        let cache = LocalCache::new(&file);
        assert!(!cache.put("k", &json!(1)));
        assert!(cache.get("k").is_none());
        assert!(cache.pending_entries("abc").is_empty());
    }

    #[test]
    fn test_unsafe_key_characters_are_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path());
        assert!(cache.put("../escape", &json!(1)));
        assert!(dir.path().join("___escape.json").exists());
        assert_eq!(cache.get("../escape"), Some(json!(1)));
    }
}
