//! SQLite storage backend

use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};

use super::{format_timestamp, parse_timestamp, StorageBackend, StorageError, WriteBatch};
use crate::audit::{AuditEvent, AuditEventType, AuditFilter, NewAuditEvent};
use crate::lexicon::TrackedWord;

/// Backend over the server's SQLite pool
#[derive(Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// The pool must already carry the schema (see `db::create_pool`)
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn insert_audit(
        tx: &mut Transaction<'_, Sqlite>,
        event: NewAuditEvent,
    ) -> Result<AuditEvent, StorageError> {
        let created_at = chrono::Utc::now();
        let details = event
            .details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StorageError::AuditWrite(e.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO audit_logs (event_type, actor, ip_address, details, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.event_type.as_str())
        .bind(&event.actor)
        .bind(&event.ip_address)
        .bind(&details)
        .bind(format_timestamp(&created_at))
        .execute(&mut **tx)
        .await
        .map_err(audit_error)?;

        Ok(AuditEvent {
            id: result.last_insert_rowid(),
            event_type: event.event_type,
            actor: event.actor,
            ip_address: event.ip_address,
            details: event.details,
            created_at,
        })
    }
}

fn store_error(err: sqlx::Error) -> StorageError {
    StorageError::Unavailable(err.to_string())
}

fn audit_error(err: sqlx::Error) -> StorageError {
    StorageError::AuditWrite(err.to_string())
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    async fn load_words(&self) -> Result<Vec<TrackedWord>, StorageError> {
        let rows = sqlx::query_as::<_, WordRow>(
            r#"
            SELECT word, frequency, is_approved, first_seen, last_seen, approved_at
            FROM learned_words
            ORDER BY word ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.into_iter().map(WordRow::into_word).collect()
    }

    async fn commit(&self, batch: WriteBatch) -> Result<Option<AuditEvent>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        if batch.clear_words {
            sqlx::query("DELETE FROM learned_words")
                .execute(&mut *tx)
                .await
                .map_err(store_error)?;
        }

        for word in &batch.deletes {
            sqlx::query("DELETE FROM learned_words WHERE word = ?")
                .bind(word)
                .execute(&mut *tx)
                .await
                .map_err(store_error)?;
        }

        for word in &batch.upserts {
            sqlx::query(
                r#"
                INSERT INTO learned_words (word, frequency, is_approved, first_seen, last_seen, approved_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(word) DO UPDATE SET
                    frequency = excluded.frequency,
                    is_approved = excluded.is_approved,
                    first_seen = excluded.first_seen,
                    last_seen = excluded.last_seen,
                    approved_at = excluded.approved_at
                "#,
            )
            .bind(&word.word)
            .bind(i64::from(word.frequency))
            .bind(word.is_approved)
            .bind(format_timestamp(&word.first_seen))
            .bind(format_timestamp(&word.last_seen))
            .bind(word.approved_at.as_ref().map(format_timestamp))
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;
        }

        let audit = match batch.audit {
            Some(event) => Some(Self::insert_audit(&mut tx, event).await?),
            None => None,
        };

        tx.commit().await.map_err(store_error)?;
        Ok(audit)
    }

    async fn append_audit(&self, event: NewAuditEvent) -> Result<AuditEvent, StorageError> {
        let mut tx = self.pool.begin().await.map_err(audit_error)?;
        let stored = Self::insert_audit(&mut tx, event).await?;
        tx.commit().await.map_err(audit_error)?;
        Ok(stored)
    }

    async fn list_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>, StorageError> {
        let mut sql = String::from(
            r#"
            SELECT id, event_type, actor, ip_address, details, created_at
            FROM audit_logs
            WHERE 1=1
            "#,
        );

        if filter.event_type.is_some() {
            sql.push_str(" AND event_type = ?");
        }
        if filter.since.is_some() {
            sql.push_str(" AND created_at >= ?");
        }
        if filter.until.is_some() {
            sql.push_str(" AND created_at <= ?");
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?");

        let mut q = sqlx::query_as::<_, AuditRow>(&sql);
        if let Some(ty) = filter.event_type {
            q = q.bind(ty.as_str());
        }
        if let Some(since) = filter.since {
            q = q.bind(format_timestamp(&since));
        }
        if let Some(until) = filter.until {
            q = q.bind(format_timestamp(&until));
        }
        q = q.bind(i64::from(filter.limit)).bind(i64::from(filter.offset));

        let rows = q.fetch_all(&self.pool).await.map_err(store_error)?;
        rows.into_iter().map(AuditRow::into_event).collect()
    }

    async fn audit_counts(&self) -> Result<Vec<(AuditEventType, u64)>, StorageError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT event_type, COUNT(*) FROM audit_logs GROUP BY event_type ORDER BY event_type",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|(name, count)| {
                AuditEventType::parse(&name).map(|ty| (ty, u64::try_from(count).unwrap_or(0)))
            })
            .collect())
    }
}

/// Internal row type for `learned_words`
#[derive(sqlx::FromRow)]
struct WordRow {
    word: String,
    frequency: i64,
    is_approved: bool,
    first_seen: String,
    last_seen: String,
    approved_at: Option<String>,
}

impl WordRow {
    fn into_word(self) -> Result<TrackedWord, StorageError> {
        Ok(TrackedWord {
            frequency: u32::try_from(self.frequency.max(1)).unwrap_or(u32::MAX),
            is_approved: self.is_approved,
            first_seen: parse_timestamp(&self.first_seen)?,
            last_seen: parse_timestamp(&self.last_seen)?,
            approved_at: self.approved_at.as_deref().map(parse_timestamp).transpose()?,
            word: self.word,
        })
    }
}

/// Internal row type for `audit_logs`
#[derive(sqlx::FromRow)]
struct AuditRow {
    id: i64,
    event_type: String,
    actor: Option<String>,
    ip_address: Option<String>,
    details: Option<String>,
    created_at: String,
}

impl AuditRow {
    fn into_event(self) -> Result<AuditEvent, StorageError> {
        let event_type = AuditEventType::parse(&self.event_type).ok_or_else(|| {
            StorageError::Unavailable(format!("unknown audit event type '{}'", self.event_type))
        })?;
        // Details are free-form; keep unparseable legacy text as a JSON string
        let details = self.details.map(|raw| {
            serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
        });

        Ok(AuditEvent {
            id: self.id,
            event_type,
            actor: self.actor,
            ip_address: self.ip_address,
            details,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditContext;
    use crate::db::create_memory_pool;
    use chrono::Utc;

    async fn setup_test_db() -> SqlitePool {
        create_memory_pool().await.unwrap()
    }

    #[tokio::test]
    async fn test_commit_and_reload_words() {
        let pool = setup_test_db().await;
        let backend = SqliteBackend::new(pool);

        let now = Utc::now();
        let mut word = TrackedWord::first_sighting("djawatan", now);
        word.frequency = 4;
        word.approve(now);

        backend.commit(WriteBatch::upsert(word.clone())).await.unwrap();

        let loaded = backend.load_words().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].word, "djawatan");
        assert_eq!(loaded[0].frequency, 4);
        assert!(loaded[0].is_approved);
        assert!(loaded[0].approved_at.is_some());
    }

    #[tokio::test]
    async fn test_clear_and_audit_in_one_batch() {
        let pool = setup_test_db().await;
        let backend = SqliteBackend::new(pool);
        let now = Utc::now();

        backend
            .commit(WriteBatch::upsert(TrackedWord::first_sighting("lama", now)))
            .await
            .unwrap();

        let batch = WriteBatch {
            clear_words: true,
            upserts: vec![TrackedWord::first_sighting("baru", now)],
            audit: Some(
                NewAuditEvent::new(AuditEventType::WordsImported)
                    .by(&AuditContext::new("master-key", Some("10.0.0.1".into())))
                    .details(serde_json::json!({ "mode": "replace" })),
            ),
            ..Default::default()
        };
        let event = backend.commit(batch).await.unwrap().unwrap();
        assert_eq!(event.event_type, AuditEventType::WordsImported);

        let words: Vec<String> = backend
            .load_words()
            .await
            .unwrap()
            .into_iter()
            .map(|w| w.word)
            .collect();
        assert_eq!(words, vec!["baru".to_string()]);

        let events = backend.list_audit(&AuditFilter::default()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].actor.as_deref(), Some("master-key"));
        assert_eq!(events[0].details, Some(serde_json::json!({ "mode": "replace" })));
    }

    #[tokio::test]
    async fn test_audit_log_rejects_updates_and_deletes() {
        let pool = setup_test_db().await;
        let backend = SqliteBackend::new(pool.clone());
        backend
            .append_audit(NewAuditEvent::new(AuditEventType::AuthFailed))
            .await
            .unwrap();

        let update = sqlx::query("UPDATE audit_logs SET actor = 'someone'")
            .execute(&pool)
            .await;
        assert!(update.is_err());

        let delete = sqlx::query("DELETE FROM audit_logs").execute(&pool).await;
        assert!(delete.is_err());

        assert_eq!(backend.list_audit(&AuditFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_audit_filters_by_type_and_window() {
        let pool = setup_test_db().await;
        let backend = SqliteBackend::new(pool);

        let before = Utc::now();
        backend
            .append_audit(NewAuditEvent::new(AuditEventType::WordApproved))
            .await
            .unwrap();
        backend
            .append_audit(NewAuditEvent::new(AuditEventType::WordRejected))
            .await
            .unwrap();
        backend
            .append_audit(NewAuditEvent::new(AuditEventType::WordApproved))
            .await
            .unwrap();

        let approved = backend
            .list_audit(&AuditFilter {
                event_type: Some(AuditEventType::WordApproved),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(approved.len(), 2);
        assert!(approved[0].id > approved[1].id);

        let future = backend
            .list_audit(&AuditFilter {
                since: Some(Utc::now() + chrono::Duration::hours(1)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(future.is_empty());

        let window = backend
            .list_audit(&AuditFilter {
                since: Some(before),
                limit: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(window.len(), 2);

        let counts = backend.audit_counts().await.unwrap();
        assert!(counts.contains(&(AuditEventType::WordApproved, 2)));
        assert!(counts.contains(&(AuditEventType::WordRejected, 1)));
    }
}
