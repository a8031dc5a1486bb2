//! API key database operations
//!
//! Keys look like `sk-ocr-<32 hex>`. Only the SHA-256 hash is stored, the
//! plaintext is returned once at creation.

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;
use crate::persistence::format_timestamp;

const KEY_PREFIX: &str = "sk-ocr-";

/// API key record (never contains the key itself)
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ApiKey {
    pub id: i64,
    pub key_prefix: String,
    pub name: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub requests_count: i64,
    pub last_used_at: Option<String>,
    pub created_at: String,
    pub revoked_at: Option<String>,
}

/// Freshly generated key material, before it is stored
#[derive(Debug, Clone)]
pub struct GeneratedKey {
    pub key: String,
    pub key_prefix: String,
    pub key_hash: String,
}

impl GeneratedKey {
    pub fn generate() -> Self {
        let random = Uuid::new_v4().simple().to_string();
        let key = format!("{}{}", KEY_PREFIX, random);
        Self {
            key_prefix: format!("{}{}...", KEY_PREFIX, &random[..8]),
            key_hash: hash_key(&key),
            key,
        }
    }
}

/// Aggregate key statistics
#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
pub struct ApiKeyStats {
    pub total_keys: i64,
    pub active_keys: i64,
    pub revoked_keys: i64,
    pub total_requests: i64,
}

/// Hex-encoded SHA-256 of a key
pub fn hash_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// API key repository
pub struct ApiKeyRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ApiKeyRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a key record by id
    pub async fn get(&self, id: i64) -> Result<Option<ApiKey>> {
        let key = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, key_prefix, name, is_admin, is_active, requests_count,
                   last_used_at, created_at, revoked_at
            FROM api_keys
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(key)
    }

    /// Store a generated key
    pub async fn insert(&self, generated: &GeneratedKey, name: &str, is_admin: bool) -> Result<ApiKey> {
        let now = format_timestamp(&Utc::now());

        let result = sqlx::query(
            r#"
            INSERT INTO api_keys (key_hash, key_prefix, name, is_admin, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&generated.key_hash)
        .bind(&generated.key_prefix)
        .bind(name)
        .bind(is_admin)
        .bind(&now)
        .execute(self.pool)
        .await?;

        self.get(result.last_insert_rowid())
            .await?
            .ok_or_else(|| crate::error::AppError::Internal("Failed to fetch created API key".to_string()))
    }

    /// Look up an active key by its plaintext and record the use
    pub async fn validate(&self, key: &str) -> Result<Option<ApiKey>> {
        let found = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, key_prefix, name, is_admin, is_active, requests_count,
                   last_used_at, created_at, revoked_at
            FROM api_keys
            WHERE key_hash = ? AND is_active = 1
            "#,
        )
        .bind(hash_key(key))
        .fetch_optional(self.pool)
        .await?;

        if let Some(ref record) = found {
            sqlx::query(
                "UPDATE api_keys SET requests_count = requests_count + 1, last_used_at = ? WHERE id = ?",
            )
            .bind(format_timestamp(&Utc::now()))
            .bind(record.id)
            .execute(self.pool)
            .await?;
        }

        Ok(found)
    }

    /// List all keys, newest first
    pub async fn list(&self) -> Result<Vec<ApiKey>> {
        let keys = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, key_prefix, name, is_admin, is_active, requests_count,
                   last_used_at, created_at, revoked_at
            FROM api_keys
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(keys)
    }

    /// Deactivate a key
    pub async fn revoke(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE api_keys SET is_active = 0, revoked_at = ? WHERE id = ? AND is_active = 1",
        )
        .bind(format_timestamp(&Utc::now()))
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Usage statistics
    pub async fn stats(&self) -> Result<ApiKeyStats> {
        let stats = sqlx::query_as::<_, ApiKeyStats>(
            r#"
            SELECT
                COUNT(*) AS total_keys,
                COALESCE(SUM(CASE WHEN is_active = 1 THEN 1 ELSE 0 END), 0) AS active_keys,
                COALESCE(SUM(CASE WHEN is_active = 0 THEN 1 ELSE 0 END), 0) AS revoked_keys,
                COALESCE(SUM(requests_count), 0) AS total_requests
            FROM api_keys
            "#,
        )
        .fetch_one(self.pool)
        .await?;

        Ok(stats)
    }
}
