//! Debounced auto-save
//!
//! One pending draft per `(studentId, date)`. Every [`AutoSaver::schedule`]
//! replaces the draft and restarts the debounce timer; when the timer
//! expires the newest draft is saved. [`AutoSaver::flush`] saves the pending
//! draft immediately, which is what a manual save does. Last write wins.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::model::InquiryEntry;
use crate::repository::EntryRepository;
use crate::Result;

type DraftKey = (String, String);

struct Draft {
    entry: InquiryEntry,
    generation: u64,
}

struct Inner {
    repo: Arc<EntryRepository>,
    debounce: Duration,
    drafts: Mutex<HashMap<DraftKey, Draft>>,
    next_generation: Mutex<u64>,
}

/// Debounced saver shared by all request handlers
#[derive(Clone)]
pub struct AutoSaver {
    inner: Arc<Inner>,
}

impl AutoSaver {
    pub fn new(repo: Arc<EntryRepository>, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                repo,
                debounce,
                drafts: Mutex::new(HashMap::new()),
                next_generation: Mutex::new(0),
            }),
        }
    }

    pub fn debounce(&self) -> Duration {
        self.inner.debounce
    }

    /// Replace the pending draft and restart its timer
    pub async fn schedule(&self, student_id: &str, entry: InquiryEntry) {
        let key = (student_id.to_string(), entry.date.clone());
        let generation = {
            let mut next = self.inner.next_generation.lock().await;
            *next += 1;
            *next
        };

        self.inner
            .drafts
            .lock()
            .await
            .insert(key.clone(), Draft { entry, generation });
        debug!(student_id = %key.0, date = %key.1, generation, "Auto-save scheduled");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;

            let draft = {
                let mut drafts = inner.drafts.lock().await;
                match drafts.get(&key) {
                    Some(d) if d.generation == generation => drafts.remove(&key),
                    // Superseded by a newer draft or already flushed
                    _ => None,
                }
            };

            if let Some(draft) = draft {
                if let Err(e) = inner.repo.save_entry(&key.0, &draft.entry).await {
                    warn!(student_id = %key.0, date = %key.1, error = %e, "Auto-save failed");
                }
            }
        });
    }

    /// Save the pending draft now; `Ok(false)` if nothing was pending
    pub async fn flush(&self, student_id: &str, date: &str) -> Result<bool> {
        let key = (student_id.to_string(), date.to_string());
        let draft = self.inner.drafts.lock().await.remove(&key);
        match draft {
            Some(draft) => {
                self.inner.repo.save_entry(student_id, &draft.entry).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drop the pending draft without saving (a manual save superseded it)
    pub async fn cancel(&self, student_id: &str, date: &str) -> bool {
        let key = (student_id.to_string(), date.to_string());
        self.inner.drafts.lock().await.remove(&key).is_some()
    }

    /// Save every pending draft (shutdown)
    pub async fn flush_all(&self) {
        let drafts: Vec<(DraftKey, Draft)> = self.inner.drafts.lock().await.drain().collect();
        for ((student_id, date), draft) in drafts {
            if let Err(e) = self.inner.repo.save_entry(&student_id, &draft.entry).await {
                warn!(student_id = %student_id, date = %date, error = %e, "Auto-save flush failed");
            }
        }
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.drafts.lock().await.len()
    }
}
