//! API key administration routes
//!
//! Key creation and revocation are audited before the key table changes, so a
//! failed audit write leaves the keys untouched.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::audit::AuditEventType;
use crate::auth::AdminIdentity;
use crate::db::{ApiKey, ApiKeyRepository, ApiKeyStats, GeneratedKey};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create the admin router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/keys", get(list_keys).post(create_key))
        .route("/keys/stats", get(key_stats))
        .route("/keys/:id", delete(revoke_key))
}

#[derive(Debug, Deserialize)]
pub struct CreateKeyRequest {
    pub name: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Serialize)]
struct CreateKeyResponse {
    success: bool,
    /// Plaintext key, only ever returned here
    key: String,
    api_key: ApiKey,
}

async fn create_key(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Json(request): Json<CreateKeyRequest>,
) -> Result<(StatusCode, Json<CreateKeyResponse>)> {
    let name = request.name.trim();
    if name.is_empty() || name.chars().count() > 100 {
        return Err(AppError::BadRequest(
            "Key name must be between 1 and 100 characters".to_string(),
        ));
    }

    let generated = GeneratedKey::generate();
    state
        .audit()
        .record_action(
            AuditEventType::ApiKeyCreated,
            &admin.audit_context(),
            json!({
                "name": name,
                "key_prefix": generated.key_prefix,
                "is_admin": request.is_admin,
            }),
        )
        .await?;

    let api_key = ApiKeyRepository::new(state.db())
        .insert(&generated, name, request.is_admin)
        .await?;
    tracing::info!(key_prefix = %api_key.key_prefix, is_admin = api_key.is_admin, actor = %admin.actor, "API key created");

    Ok((
        StatusCode::CREATED,
        Json(CreateKeyResponse {
            success: true,
            key: generated.key,
            api_key,
        }),
    ))
}

#[derive(Serialize)]
struct KeyListResponse {
    success: bool,
    count: usize,
    keys: Vec<ApiKey>,
}

async fn list_keys(State(state): State<AppState>, _admin: AdminIdentity) -> Result<Json<KeyListResponse>> {
    let keys = ApiKeyRepository::new(state.db()).list().await?;
    Ok(Json(KeyListResponse {
        success: true,
        count: keys.len(),
        keys,
    }))
}

#[derive(Serialize)]
struct RevokeResponse {
    success: bool,
    message: String,
}

async fn revoke_key(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(id): Path<i64>,
) -> Result<Json<RevokeResponse>> {
    let repo = ApiKeyRepository::new(state.db());
    let key = repo.get(id).await?.ok_or(AppError::KeyNotFound(id))?;
    if !key.is_active {
        return Err(AppError::BadRequest(format!(
            "API key {} is already revoked",
            key.key_prefix
        )));
    }

    state
        .audit()
        .record_action(
            AuditEventType::ApiKeyRevoked,
            &admin.audit_context(),
            json!({ "id": key.id, "key_prefix": key.key_prefix, "name": key.name }),
        )
        .await?;
    repo.revoke(id).await?;
    tracing::info!(key_prefix = %key.key_prefix, actor = %admin.actor, "API key revoked");

    Ok(Json(RevokeResponse {
        success: true,
        message: format!("API key {} revoked", key.key_prefix),
    }))
}

#[derive(Serialize)]
struct KeyStatsResponse {
    success: bool,
    #[serde(flatten)]
    stats: ApiKeyStats,
}

async fn key_stats(State(state): State<AppState>, _admin: AdminIdentity) -> Result<Json<KeyStatsResponse>> {
    Ok(Json(KeyStatsResponse {
        success: true,
        stats: ApiKeyRepository::new(state.db()).stats().await?,
    }))
}
