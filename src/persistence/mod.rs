//! Durable storage for tracked words and audit events
//!
//! The lexicon and the audit log share one backend so that a word mutation and
//! the audit entry describing it land in the same atomic write.
//!
//! Two implementations:
//! - `SqliteBackend` for the running server
//! - `MemoryBackend` for isolated tests

mod memory;
mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::audit::{AuditEvent, AuditEventType, AuditFilter, NewAuditEvent};
use crate::lexicon::TrackedWord;

/// Storage-layer failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    /// The audit entry of a write could not be stored; nothing was applied
    #[error("audit write failed: {0}")]
    AuditWrite(String),

    /// The backend could not be reached or rejected the write; nothing was applied
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// A set of changes applied all-or-nothing
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    /// Delete every tracked word before applying the rest
    pub clear_words: bool,
    pub deletes: Vec<String>,
    pub upserts: Vec<TrackedWord>,
    pub audit: Option<NewAuditEvent>,
}

impl WriteBatch {
    pub fn upsert(word: TrackedWord) -> Self {
        Self {
            upserts: vec![word],
            ..Default::default()
        }
    }

    pub fn delete(word: impl Into<String>) -> Self {
        Self {
            deletes: vec![word.into()],
            ..Default::default()
        }
    }

    pub fn with_audit(mut self, event: NewAuditEvent) -> Self {
        self.audit = Some(event);
        self
    }
}

/// Storage backend trait
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Load every tracked word
    async fn load_words(&self) -> Result<Vec<TrackedWord>, StorageError>;

    /// Apply a batch atomically; returns the stored audit event, if any
    async fn commit(&self, batch: WriteBatch) -> Result<Option<AuditEvent>, StorageError>;

    /// Append a standalone audit event
    async fn append_audit(&self, event: NewAuditEvent) -> Result<AuditEvent, StorageError>;

    /// List audit events, most recent first
    async fn list_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>, StorageError>;

    /// Number of audit events per type
    async fn audit_counts(&self) -> Result<Vec<(AuditEventType, u64)>, StorageError>;
}

/// Render a timestamp so that text order equals time order
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Unavailable(format!("corrupt timestamp '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_text_order_matches_time_order() {
        let early = Utc.with_ymd_and_hms(2024, 1, 9, 23, 59, 59).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        assert!(format_timestamp(&early) < format_timestamp(&late));
        assert_eq!(parse_timestamp(&format_timestamp(&late)).unwrap(), late);
    }
}
