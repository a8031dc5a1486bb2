//! In-memory storage backend
//!
//! Used by tests and by tooling that does not need durability. The failure
//! switches let tests exercise the audit-failure and outage paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::{StorageBackend, StorageError, WriteBatch};
use crate::audit::{AuditEvent, AuditEventType, AuditFilter, NewAuditEvent};
use crate::lexicon::TrackedWord;

#[derive(Default)]
struct MemoryInner {
    words: BTreeMap<String, TrackedWord>,
    audit: Vec<AuditEvent>,
    next_audit_id: i64,
    /// Commits left before the backend goes offline, `None` for unlimited
    commit_budget: Option<usize>,
}

impl MemoryInner {
    fn push_audit(&mut self, event: NewAuditEvent) -> AuditEvent {
        self.next_audit_id += 1;
        let stored = AuditEvent {
            id: self.next_audit_id,
            event_type: event.event_type,
            actor: event.actor,
            ip_address: event.ip_address,
            details: event.details,
            created_at: Utc::now(),
        };
        self.audit.push(stored.clone());
        stored
    }
}

/// Storage backend that keeps everything in process memory
#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<MemoryInner>,
    fail_audit: AtomicBool,
    unavailable: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the word table
    pub fn with_words(words: impl IntoIterator<Item = TrackedWord>) -> Self {
        let backend = Self::new();
        {
            let mut inner = backend.inner.lock();
            for word in words {
                inner.words.insert(word.word.clone(), word);
            }
        }
        backend
    }

    /// Make every audit write fail
    pub fn set_audit_failure(&self, fail: bool) {
        self.fail_audit.store(fail, Ordering::SeqCst);
    }

    /// Make every operation fail as if the backend were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Let `commits` more commits through, then fail every later one as unavailable
    pub fn fail_commits_after(&self, commits: Option<usize>) {
        self.inner.lock().commit_budget = commits;
    }

    /// Words as currently stored
    pub fn stored_words(&self) -> Vec<TrackedWord> {
        self.inner.lock().words.values().cloned().collect()
    }

    /// Audit events in insertion order
    pub fn stored_audit(&self) -> Vec<AuditEvent> {
        self.inner.lock().audit.clone()
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("memory backend offline".to_string()));
        }
        Ok(())
    }

    fn check_audit(&self) -> Result<(), StorageError> {
        if self.fail_audit.load(Ordering::SeqCst) {
            return Err(StorageError::AuditWrite("audit log rejected write".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn load_words(&self) -> Result<Vec<TrackedWord>, StorageError> {
        self.check_available()?;
        Ok(self.stored_words())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<Option<AuditEvent>, StorageError> {
        self.check_available()?;
        if batch.audit.is_some() {
            self.check_audit()?;
        }

        let mut inner = self.inner.lock();
        match inner.commit_budget {
            Some(0) => {
                return Err(StorageError::Unavailable("memory backend offline".to_string()));
            }
            Some(left) => inner.commit_budget = Some(left - 1),
            None => {}
        }
        if batch.clear_words {
            inner.words.clear();
        }
        for word in &batch.deletes {
            inner.words.remove(word);
        }
        for word in batch.upserts {
            inner.words.insert(word.word.clone(), word);
        }
        Ok(batch.audit.map(|event| inner.push_audit(event)))
    }

    async fn append_audit(&self, event: NewAuditEvent) -> Result<AuditEvent, StorageError> {
        self.check_available()?;
        self.check_audit()?;
        Ok(self.inner.lock().push_audit(event))
    }

    async fn list_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>, StorageError> {
        self.check_available()?;
        let inner = self.inner.lock();
        let mut events: Vec<AuditEvent> = inner
            .audit
            .iter()
            .filter(|event| filter.matches(event))
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(events
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn audit_counts(&self) -> Result<Vec<(AuditEventType, u64)>, StorageError> {
        self.check_available()?;
        let inner = self.inner.lock();
        let mut counts: HashMap<AuditEventType, u64> = HashMap::new();
        for event in &inner.audit {
            *counts.entry(event.event_type).or_default() += 1;
        }
        Ok(AuditEventType::ALL
            .iter()
            .filter_map(|ty| counts.get(ty).map(|n| (*ty, *n)))
            .collect())
    }
}
