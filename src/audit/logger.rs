//! Audit logger

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::types::{AuditContext, AuditEvent, AuditEventType, AuditFilter, NewAuditEvent};
use crate::persistence::{StorageBackend, StorageError};

/// Largest page the read API hands out
pub const MAX_AUDIT_PAGE: u32 = 500;

/// Per-type event counts
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditStats {
    pub total: u64,
    pub by_type: serde_json::Map<String, Value>,
}

/// Records and reads audit events
#[derive(Clone)]
pub struct AuditLog {
    backend: Arc<dyn StorageBackend>,
}

impl AuditLog {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Append one event. Returns once the event is durably stored.
    pub async fn record(&self, event: NewAuditEvent) -> Result<AuditEvent, StorageError> {
        let event_type = event.event_type;
        match self.backend.append_audit(event).await {
            Ok(stored) => {
                tracing::info!(
                    event_type = %stored.event_type,
                    actor = stored.actor.as_deref().unwrap_or("-"),
                    id = stored.id,
                    "Audit event recorded"
                );
                Ok(stored)
            }
            Err(e) => {
                tracing::error!(event_type = %event_type, error = %e, "Failed to record audit event");
                Err(match e {
                    StorageError::Unavailable(msg) => StorageError::AuditWrite(msg),
                    other => other,
                })
            }
        }
    }

    /// Shorthand for `record` with a request context and details
    pub async fn record_action(
        &self,
        event_type: AuditEventType,
        ctx: &AuditContext,
        details: Value,
    ) -> Result<AuditEvent, StorageError> {
        self.record(NewAuditEvent::new(event_type).by(ctx).details(details))
            .await
    }

    /// Most recent first; the page size is capped
    pub async fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>, StorageError> {
        let mut filter = filter.clone();
        filter.limit = filter.limit.clamp(1, MAX_AUDIT_PAGE);
        self.backend.list_audit(&filter).await
    }

    pub async fn stats(&self) -> Result<AuditStats, StorageError> {
        let counts = self.backend.audit_counts().await?;
        let mut stats = AuditStats::default();
        for (ty, count) in counts {
            stats.total += count;
            stats.by_type.insert(ty.as_str().to_string(), Value::from(count));
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryBackend;
    use serde_json::json;

    fn setup() -> (Arc<MemoryBackend>, AuditLog) {
        let backend = Arc::new(MemoryBackend::new());
        (backend.clone(), AuditLog::new(backend))
    }

    #[tokio::test]
    async fn test_record_stores_context_and_details() {
        let (backend, log) = setup();
        let ctx = AuditContext::new("sk-ocr-1a2b3c4d...", Some("192.168.1.20".into()));

        let event = log
            .record_action(AuditEventType::ApiKeyCreated, &ctx, json!({ "name": "scanner" }))
            .await
            .unwrap();

        assert_eq!(event.actor.as_deref(), Some("sk-ocr-1a2b3c4d..."));
        assert_eq!(event.ip_address.as_deref(), Some("192.168.1.20"));
        assert_eq!(backend.stored_audit().len(), 1);
    }

    #[tokio::test]
    async fn test_record_failure_propagates_as_audit_error() {
        let (backend, log) = setup();
        backend.set_unavailable(true);

        let result = log.record(NewAuditEvent::new(AuditEventType::AuthFailed)).await;
        assert!(matches!(result, Err(StorageError::AuditWrite(_))));

        backend.set_unavailable(false);
        backend.set_audit_failure(true);
        let result = log.record(NewAuditEvent::new(AuditEventType::AuthFailed)).await;
        assert!(matches!(result, Err(StorageError::AuditWrite(_))));
    }

    #[tokio::test]
    async fn test_list_caps_page_size_and_filters() {
        let (_, log) = setup();
        for _ in 0..3 {
            log.record(NewAuditEvent::new(AuditEventType::WordApproved))
                .await
                .unwrap();
        }
        log.record(NewAuditEvent::new(AuditEventType::WordsExported))
            .await
            .unwrap();

        let all = log
            .list(&AuditFilter {
                limit: 10_000,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].event_type, AuditEventType::WordsExported);

        let paged = log
            .list(&AuditFilter {
                event_type: Some(AuditEventType::WordApproved),
                limit: 2,
                offset: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(paged.len(), 1);
    }

    #[tokio::test]
    async fn test_stats_counts_by_type() {
        let (_, log) = setup();
        log.record(NewAuditEvent::new(AuditEventType::AuthFailed))
            .await
            .unwrap();
        log.record(NewAuditEvent::new(AuditEventType::AuthFailed))
            .await
            .unwrap();
        log.record(NewAuditEvent::new(AuditEventType::WordRejected))
            .await
            .unwrap();

        let stats = log.stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_type["AUTH_FAILED"], json!(2));
        assert_eq!(stats.by_type["WORD_REJECTED"], json!(1));
    }
}
