//! Word store
//!
//! In-process view of every tracked word, backed by a `StorageBackend`.
//!
//! Locking:
//! - per-word updates hold the map read lock plus that entry's mutex
//! - inserting a new word, removing a word and bulk operations hold the map
//!   write lock, so they serialize against each other and against every
//!   in-flight per-word update
//!
//! The backend commit is awaited while the locks are held and memory is only
//! touched after the commit succeeded, so a failed write leaves both the
//! backend and the in-process view unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use super::types::TrackedWord;
use crate::audit::{AuditEvent, NewAuditEvent};
use crate::persistence::{StorageBackend, StorageError, WriteBatch};

type Entry = Arc<Mutex<TrackedWord>>;

pub struct WordStore {
    backend: Arc<dyn StorageBackend>,
    words: RwLock<HashMap<String, Entry>>,
}

impl WordStore {
    /// Load every stored word from the backend
    pub async fn open(backend: Arc<dyn StorageBackend>) -> Result<Self, StorageError> {
        let loaded = backend.load_words().await?;
        tracing::info!(words = loaded.len(), "Word store loaded");

        let words = loaded
            .into_iter()
            .map(|w| (w.word.clone(), Arc::new(Mutex::new(w))))
            .collect();

        Ok(Self {
            backend,
            words: RwLock::new(words),
        })
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Current state of one word
    pub async fn get(&self, word: &str) -> Option<TrackedWord> {
        let map = self.words.read().await;
        let entry = map.get(word)?;
        let current = entry.lock().await.clone();
        Some(current)
    }

    /// Every word, ordered by word
    pub async fn snapshot(&self) -> Vec<TrackedWord> {
        let map = self.words.read().await;
        let mut words = Vec::with_capacity(map.len());
        for entry in map.values() {
            words.push(entry.lock().await.clone());
        }
        words.sort_by(|a, b| a.word.cmp(&b.word));
        words
    }

    pub async fn len(&self) -> usize {
        self.words.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.words.read().await.is_empty()
    }

    /// Read-modify-write of a single word, creating it if absent.
    ///
    /// `step` receives the current state (`None` for a first sighting) and
    /// returns the new state plus a value handed back to the caller.
    pub async fn upsert<T>(
        &self,
        word: &str,
        step: impl FnOnce(Option<&TrackedWord>) -> (TrackedWord, T),
    ) -> Result<(TrackedWord, T), StorageError> {
        {
            let map = self.words.read().await;
            if let Some(entry) = map.get(word) {
                let mut current = entry.lock().await;
                let (next, out) = step(Some(&*current));
                self.backend.commit(WriteBatch::upsert(next.clone())).await?;
                *current = next.clone();
                return Ok((next, out));
            }
        }

        let mut map = self.words.write().await;
        let existing = match map.get(word) {
            Some(entry) => Some(entry.lock().await.clone()),
            None => None,
        };
        let (next, out) = step(existing.as_ref());
        self.backend.commit(WriteBatch::upsert(next.clone())).await?;
        match map.get(word) {
            Some(entry) => *entry.lock().await = next.clone(),
            None => {
                map.insert(word.to_string(), Arc::new(Mutex::new(next.clone())));
            }
        }
        Ok((next, out))
    }

    /// Read-modify-write of an existing word, committed together with an audit event.
    /// Returns `None` without writing anything if the word is not stored.
    pub async fn modify<T>(
        &self,
        word: &str,
        step: impl FnOnce(&TrackedWord) -> (TrackedWord, NewAuditEvent, T),
    ) -> Result<Option<(TrackedWord, T)>, StorageError> {
        let map = self.words.read().await;
        let Some(entry) = map.get(word) else {
            return Ok(None);
        };

        let mut current = entry.lock().await;
        let (next, audit, out) = step(&*current);
        self.backend
            .commit(WriteBatch::upsert(next.clone()).with_audit(audit))
            .await?;
        *current = next.clone();
        Ok(Some((next, out)))
    }

    /// Delete a word together with an audit event. Returns the removed state.
    pub async fn remove(
        &self,
        word: &str,
        audit: impl FnOnce(&TrackedWord) -> NewAuditEvent,
    ) -> Result<Option<TrackedWord>, StorageError> {
        let mut map = self.words.write().await;
        let Some(entry) = map.get(word) else {
            return Ok(None);
        };

        let removed = entry.lock().await.clone();
        self.backend
            .commit(WriteBatch::delete(word).with_audit(audit(&removed)))
            .await?;
        map.remove(word);
        Ok(Some(removed))
    }

    /// Exclusive whole-store operation.
    ///
    /// `plan` sees every current word and returns the batch to apply. The
    /// batch is committed atomically, then mirrored into memory.
    pub async fn bulk<T>(
        &self,
        plan: impl FnOnce(&HashMap<String, TrackedWord>) -> (WriteBatch, T),
    ) -> Result<(T, Option<AuditEvent>), StorageError> {
        let mut map = self.words.write().await;

        let mut current = HashMap::with_capacity(map.len());
        for (key, entry) in map.iter() {
            current.insert(key.clone(), entry.lock().await.clone());
        }

        let (batch, out) = plan(&current);
        let audit = self.backend.commit(batch.clone()).await?;

        if batch.clear_words {
            map.clear();
        }
        for word in &batch.deletes {
            map.remove(word);
        }
        for word in batch.upserts {
            map.insert(word.word.clone(), Arc::new(Mutex::new(word)));
        }

        Ok((out, audit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditEventType;
    use crate::persistence::MemoryBackend;
    use chrono::Utc;

    async fn setup() -> (Arc<MemoryBackend>, WordStore) {
        let backend = Arc::new(MemoryBackend::new());
        let store = WordStore::open(backend.clone()).await.unwrap();
        (backend, store)
    }

    fn bump(existing: Option<&TrackedWord>, word: &str) -> TrackedWord {
        let now = Utc::now();
        match existing {
            Some(w) => TrackedWord {
                frequency: w.frequency + 1,
                last_seen: now,
                ..w.clone()
            },
            None => TrackedWord::first_sighting(word, now),
        }
    }

    #[tokio::test]
    async fn test_open_loads_backend_words() {
        let backend = Arc::new(MemoryBackend::with_words([TrackedWord::first_sighting(
            "merdeka",
            Utc::now(),
        )]));
        let store = WordStore::open(backend).await.unwrap();
        assert_eq!(store.get("merdeka").await.unwrap().frequency, 1);
    }

    #[tokio::test]
    async fn test_upsert_persists_before_memory() {
        let (backend, store) = setup().await;

        store.upsert("merdeka", |w| (bump(w, "merdeka"), ())).await.unwrap();
        store.upsert("merdeka", |w| (bump(w, "merdeka"), ())).await.unwrap();
        assert_eq!(store.get("merdeka").await.unwrap().frequency, 2);
        assert_eq!(backend.stored_words()[0].frequency, 2);

        backend.set_unavailable(true);
        let result = store.upsert("merdeka", |w| (bump(w, "merdeka"), ())).await;
        assert!(matches!(result, Err(StorageError::Unavailable(_))));
        assert_eq!(store.get("merdeka").await.unwrap().frequency, 2);

        let result = store.upsert("koperasi", |w| (bump(w, "koperasi"), ())).await;
        assert!(result.is_err());
        assert!(store.get("koperasi").await.is_none());
    }

    #[tokio::test]
    async fn test_modify_missing_word_writes_nothing() {
        let (backend, store) = setup().await;
        let result = store
            .modify("absent", |w| {
                (w.clone(), NewAuditEvent::new(AuditEventType::WordApproved), ())
            })
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(backend.stored_audit().is_empty());
    }

    #[tokio::test]
    async fn test_remove_rolls_back_on_audit_failure() {
        let (backend, store) = setup().await;
        store.upsert("merdeka", |w| (bump(w, "merdeka"), ())).await.unwrap();

        backend.set_audit_failure(true);
        let result = store
            .remove("merdeka", |_| NewAuditEvent::new(AuditEventType::WordRejected))
            .await;
        assert!(matches!(result, Err(StorageError::AuditWrite(_))));
        assert!(store.get("merdeka").await.is_some());
        assert_eq!(backend.stored_words().len(), 1);
    }

    #[tokio::test]
    async fn test_bulk_clear_mirrors_batch() {
        let (backend, store) = setup().await;
        store.upsert("merdeka", |w| (bump(w, "merdeka"), ())).await.unwrap();

        let (seen, _) = store
            .bulk(|current| {
                let batch = WriteBatch {
                    clear_words: true,
                    upserts: vec![TrackedWord::first_sighting("koperasi", Utc::now())],
                    ..Default::default()
                };
                (batch, current.len())
            })
            .await
            .unwrap();

        assert_eq!(seen, 1);
        let words: Vec<String> = store.snapshot().await.into_iter().map(|w| w.word).collect();
        assert_eq!(words, vec!["koperasi"]);
        assert_eq!(backend.stored_words().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_never_lose_counts() {
        let (backend, store) = setup().await;
        let store = Arc::new(store);

        let tasks: Vec<_> = (0..64)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.upsert("merdeka", |w| (bump(w, "merdeka"), ())).await.unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.get("merdeka").await.unwrap().frequency, 64);
        assert_eq!(backend.stored_words()[0].frequency, 64);
    }
}
