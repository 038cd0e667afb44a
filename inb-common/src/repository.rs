//! Entry repository
//!
//! Student login, entry reads and writes, AI help logs and the local cache
//! fallback. Every store call goes through [`with_reconnect`]: a transient
//! failure re-enables the store's network mode and retries exactly once.

use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::cache::{LocalCache, PendingRecord};
use crate::identity::{is_valid_student_id, resolve_student_id};
use crate::model::{AiLogRequest, AiProvider, InquiryEntry, Student};
use crate::sanitize::{entry_from_document, sanitize_entry, Document};
use crate::store::{
    entries_collection, entry_path, student_path, DocumentStore, OrderBy, SetMode, STUDENTS,
};
use crate::time::{is_valid_date, now_iso};
use crate::{Error, Result};

/// Attempts for the versioned read-modify-write of an AI help log
pub const MAX_LOG_APPEND_ATTEMPTS: u32 = 5;

const AI_HELP_LOGS: &str = "aiHelpLogs";

/// Where a loaded entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySource {
    /// Read from the document store
    Store,
    /// Last confirmed local copy, served while the store is unreachable
    Cache,
}

/// Run a store operation, re-enabling the network and retrying once on a
/// transient failure
pub async fn with_reconnect<F, Fut, T>(
    store: &dyn DocumentStore,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match operation().await {
        Ok(result) => Ok(result),
        Err(err) if err.is_transient() => {
            warn!(
                operation = operation_name,
                error = %err,
                "Store unavailable, re-enabling network and retrying"
            );
            store.enable_network().await?;
            let result = operation().await;
            match &result {
                Ok(_) => debug!(operation = operation_name, "Store operation succeeded after retry"),
                Err(e) => error!(operation = operation_name, error = %e, "Store operation failed after retry"),
            }
            result
        }
        Err(err) => Err(err),
    }
}

/// Persistence layer over a [`DocumentStore`] and a [`LocalCache`]
pub struct EntryRepository {
    store: Arc<dyn DocumentStore>,
    cache: LocalCache,
}

impl EntryRepository {
    pub fn new(store: Arc<dyn DocumentStore>, cache: LocalCache) -> Self {
        Self { store, cache }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    /// Resolve a login to its student document, creating it on first login
    pub async fn get_or_create_student(&self, name: &str, code: &str) -> Result<Student> {
        let (student_id, name, code) = resolve_student_id(name, code)?;
        let store = self.store.as_ref();
        let path = student_path(&student_id);

        let existing = with_reconnect(store, "load student", || store.get(&path)).await?;
        if let Some(doc) = existing {
            debug!(student_id = %student_id, "Student found");
            return Ok(student_from_document(student_id, &doc));
        }

        let now = now_iso();
        let student = Student {
            student_id: student_id.clone(),
            student_name: name,
            student_code: code,
            created_at: now.clone(),
            last_modified: now,
        };
        let mut fields = Document::new();
        fields.insert("studentName".into(), Value::String(student.student_name.clone()));
        fields.insert("studentCode".into(), Value::String(student.student_code.clone()));
        fields.insert("createdAt".into(), Value::String(student.created_at.clone()));
        fields.insert("lastModified".into(), Value::String(student.last_modified.clone()));

        with_reconnect(store, "create student", || {
            store.set(&path, fields.clone(), SetMode::Overwrite)
        })
        .await?;

        info!(student_id = %student_id, "Created student notebook");
        Ok(student)
    }

    /// Fetch one day's entry; `None` if no document exists yet
    pub async fn get_entry(&self, student_id: &str, date: &str) -> Result<Option<InquiryEntry>> {
        Ok(self
            .load_entry(student_id, date)
            .await?
            .map(|(entry, _source)| entry))
    }

    /// Fetch one day's entry along with where it was read from
    ///
    /// When the store stays unreachable after the retry, the last confirmed
    /// local copy is returned as [`EntrySource::Cache`] if there is one.
    pub async fn load_entry(
        &self,
        student_id: &str,
        date: &str,
    ) -> Result<Option<(InquiryEntry, EntrySource)>> {
        validate_key(student_id, date)?;
        let store = self.store.as_ref();
        let path = entry_path(student_id, date);

        match with_reconnect(store, "load entry", || store.get(&path)).await {
            Ok(Some(doc)) => Ok(Some((entry_from_document(doc)?, EntrySource::Store))),
            Ok(None) => Ok(None),
            Err(e) if e.is_transient() => match self.get_cached_entry(student_id, date) {
                Some(cached) => {
                    warn!(
                        student_id = %student_id,
                        date = %date,
                        "Store unreachable, serving cached entry"
                    );
                    Ok(Some((cached, EntrySource::Cache)))
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// All entries of a student, newest date first; `[]` on any failure
    pub async fn get_all_entries(&self, student_id: &str) -> Vec<InquiryEntry> {
        if !is_valid_student_id(student_id) {
            warn!("Rejected entry listing for invalid student id");
            return Vec::new();
        }
        let store = self.store.as_ref();
        let collection = entries_collection(student_id);
        let order = OrderBy::desc("date");

        let docs = match with_reconnect(store, "list entries", || {
            store.list(&collection, Some(&order))
        })
        .await
        {
            Ok(docs) => docs,
            Err(e) => {
                error!(student_id = %student_id, error = %e, "Failed to list entries");
                return Vec::new();
            }
        };

        let mut entries: Vec<InquiryEntry> = docs
            .into_iter()
            .filter_map(|doc| match entry_from_document(doc.fields) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(date = %doc.id, error = %e, "Skipping unreadable entry");
                    None
                }
            })
            .collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        entries
    }

    /// Teacher view of one student's history
    pub async fn get_student_entries(&self, student_id: &str) -> Vec<InquiryEntry> {
        self.get_all_entries(student_id).await
    }

    /// Sanitize and merge-write an entry, then touch the student's
    /// `lastModified`
    ///
    /// `aiHelpLogs` is never written here: only [`Self::append_ai_help_log`]
    /// changes it, so a form loaded before an append cannot drop the record.
    ///
    /// On success the sanitized entry is mirrored into the local cache. On
    /// failure a pending marker carrying the error is cached and the error
    /// is returned.
    pub async fn save_entry(&self, student_id: &str, entry: &InquiryEntry) -> Result<()> {
        validate_key(student_id, &entry.date)?;
        let doc = sanitize_entry(entry)?;
        let mut fields = doc.clone();
        fields.remove(AI_HELP_LOGS);

        match self.write_entry(student_id, &entry.date, &fields).await {
            Ok(()) => {
                self.cache.cache_entry(student_id, &entry.date, &doc);
                self.cache.clear_pending(student_id, &entry.date);
                info!(student_id = %student_id, date = %entry.date, "Entry saved");
                Ok(())
            }
            Err(e) => {
                error!(
                    student_id = %student_id,
                    date = %entry.date,
                    error = %e,
                    "Entry save failed, keeping pending copy"
                );
                self.cache
                    .cache_pending(student_id, &entry.date, &doc, &e.user_message());
                Err(e)
            }
        }
    }

    async fn write_entry(&self, student_id: &str, date: &str, doc: &Document) -> Result<()> {
        let store = self.store.as_ref();
        let path = entry_path(student_id, date);
        with_reconnect(store, "save entry", || {
            store.set(&path, doc.clone(), SetMode::Merge)
        })
        .await?;

        // Entry is stored; a failed touch only warns
        let student = student_path(student_id);
        let mut touch = Document::new();
        touch.insert("lastModified".into(), Value::String(now_iso()));
        if let Err(e) = with_reconnect(store, "touch student", || {
            store.set(&student, touch.clone(), SetMode::Merge)
        })
        .await
        {
            warn!(student_id = %student_id, error = %e, "Failed to update student lastModified");
        }
        Ok(())
    }

    /// Append a timestamped record to the provider's AI help log
    ///
    /// Returns `false` without writing when the entry does not exist.
    /// Concurrent appends are serialized by the store's version check.
    pub async fn append_ai_help_log(
        &self,
        student_id: &str,
        date: &str,
        provider: AiProvider,
        log: &AiLogRequest,
    ) -> Result<bool> {
        validate_key(student_id, date)?;
        let store = self.store.as_ref();
        let path = entry_path(student_id, date);
        let key = provider.log_key();

        for attempt in 1..=MAX_LOG_APPEND_ATTEMPTS {
            let current =
                with_reconnect(store, "load entry for AI log", || store.get_versioned(&path))
                    .await?;
            let Some((doc, version)) = current else {
                debug!(student_id = %student_id, date = %date, "No entry yet, AI log skipped");
                return Ok(false);
            };

            let mut logs = match doc.get(AI_HELP_LOGS) {
                Some(Value::Object(logs)) => logs.clone(),
                _ => Map::new(),
            };
            let mut records = match logs.remove(key) {
                Some(Value::Array(records)) => records,
                _ => Vec::new(),
            };
            records.push(log.to_record(provider, &now_iso()));
            logs.insert(key.to_string(), Value::Array(records));

            let mut patch = Document::new();
            patch.insert(AI_HELP_LOGS.into(), Value::Object(logs));

            let written = with_reconnect(store, "append AI log", || {
                store.set_if_version(&path, patch.clone(), SetMode::Merge, Some(&version))
            })
            .await;

            match written {
                Ok(()) => {
                    debug!(student_id = %student_id, date = %date, provider = key, "AI help log appended");
                    return Ok(true);
                }
                Err(Error::Conflict(reason)) => {
                    warn!(attempt, reason = %reason, "AI help log write raced, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::Conflict(format!(
            "AI help log for {} not appended after {} attempts",
            date, MAX_LOG_APPEND_ATTEMPTS
        )))
    }

    /// Last confirmed local copy of an entry
    pub fn get_cached_entry(&self, student_id: &str, date: &str) -> Option<InquiryEntry> {
        let doc = self.cache.cached_entry(student_id, date)?;
        match entry_from_document(doc) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Cached entry for {} is unreadable: {}", date, e);
                None
            }
        }
    }

    /// Local writes that never reached the store
    pub fn pending_entries(&self, student_id: &str) -> Vec<PendingRecord> {
        self.cache.pending_entries(student_id)
    }

    pub fn clear_pending(&self, student_id: &str, date: &str) {
        self.cache.clear_pending(student_id, date);
    }

    /// All students sorted by name (teacher view); `[]` on any failure
    pub async fn list_students(&self) -> Vec<Student> {
        let store = self.store.as_ref();
        match with_reconnect(store, "list students", || store.list(STUDENTS, None)).await {
            Ok(docs) => {
                let mut students: Vec<Student> = docs
                    .into_iter()
                    .map(|doc| student_from_document(doc.id, &doc.fields))
                    .collect();
                students.sort_by(|a, b| a.student_name.cmp(&b.student_name));
                students
            }
            Err(e) => {
                error!(error = %e, "Failed to list students");
                Vec::new()
            }
        }
    }
}

fn validate_key(student_id: &str, date: &str) -> Result<()> {
    if !is_valid_student_id(student_id) {
        return Err(Error::InvalidInput(format!("Invalid student id: {}", student_id)));
    }
    if !is_valid_date(date) {
        return Err(Error::InvalidInput(format!("Invalid date (YYYY-MM-DD): {}", date)));
    }
    Ok(())
}

fn student_from_document(student_id: String, doc: &Document) -> Student {
    let text = |key: &str| {
        doc.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Student {
        student_id,
        student_name: text("studentName"),
        student_code: text("studentCode"),
        created_at: text("createdAt"),
        last_modified: text("lastModified"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_with_reconnect_retries_once_after_enabling_network() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.disable_network().await.unwrap();

        let calls = AtomicU32::new(0);
        let result = with_reconnect(&store, "load student", || {
            calls.fetch_add(1, Ordering::SeqCst);
            store.get("students/a")
        })
        .await;

        assert!(result.unwrap().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(store.is_online());
    }

    #[tokio::test]
    async fn test_with_reconnect_does_not_retry_permanent_errors() {
        let store = SqliteStore::in_memory().await.unwrap();
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_reconnect(&store, "load student", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::PermissionDenied("rules".into())) }
        })
        .await;

        assert!(matches!(result, Err(Error::PermissionDenied(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("a2ltOjQy", "2025-03-01").is_ok());
        assert!(validate_key("a2lt/OjQy", "2025-03-01").is_err());
        assert!(validate_key("a2ltOjQy", "2025-3-1").is_err());
    }

    #[test]
    fn test_student_from_partial_document() {
        let doc = serde_json::json!({"studentName": "민수"});
        let student = student_from_document("id1".into(), doc.as_object().unwrap());
        assert_eq!(student.student_name, "민수");
        assert_eq!(student.student_code, "");
    }
}
