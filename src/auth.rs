//! Request authentication
//!
//! Extractors that resolve who is calling: `AdminIdentity` for the learning and
//! admin endpoints (`X-Admin-Key`), `ApiClient` for OCR endpoints (`X-API-Key`,
//! only enforced when `API_KEYS_ENABLED`). Every rejected credential is written
//! to the audit log as `AUTH_FAILED` before the error response goes out.

use std::net::SocketAddr;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, OriginalUri},
    http::request::Parts,
};
use serde_json::json;

use crate::audit::{AuditContext, AuditEventType, NewAuditEvent};
use crate::db::ApiKeyRepository;
use crate::error::AppError;
use crate::state::AppState;

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";
pub const API_KEY_HEADER: &str = "x-api-key";

/// Actor name used when the master key authenticates a request
pub const MASTER_KEY_ACTOR: &str = "master-key";

/// An authenticated administrator
#[derive(Debug, Clone)]
pub struct AdminIdentity {
    pub actor: String,
    pub ip_address: Option<String>,
}

impl AdminIdentity {
    pub fn audit_context(&self) -> AuditContext {
        AuditContext::new(self.actor.clone(), self.ip_address.clone())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let ip_address = client_ip(parts);

        let Some(key) = header_value(parts, ADMIN_KEY_HEADER) else {
            return Err(auth_failure(
                state,
                parts,
                ip_address,
                "missing_admin_key",
                AppError::Unauthorized {
                    code: "ADMIN_KEY_REQUIRED",
                    message: "X-Admin-Key header is required".to_string(),
                },
            )
            .await);
        };

        if state.config().auth.admin_master_key.as_deref() == Some(key.as_str()) {
            return Ok(AdminIdentity {
                actor: MASTER_KEY_ACTOR.to_string(),
                ip_address,
            });
        }

        match ApiKeyRepository::new(state.db()).validate(&key).await? {
            Some(record) if record.is_admin => Ok(AdminIdentity {
                actor: record.key_prefix,
                ip_address,
            }),
            _ => Err(auth_failure(
                state,
                parts,
                ip_address,
                "invalid_admin_key",
                AppError::Forbidden {
                    code: "ADMIN_KEY_INVALID",
                    message: "Invalid admin key".to_string(),
                },
            )
            .await),
        }
    }
}

/// Caller of an OCR endpoint
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// Key prefix, `static-key`, or `None` when keys are not enforced
    pub actor: Option<String>,
    pub ip_address: Option<String>,
}

#[async_trait]
impl FromRequestParts<AppState> for ApiClient {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let ip_address = client_ip(parts);
        let auth = &state.config().auth;
        if !auth.api_keys_enabled {
            return Ok(ApiClient {
                actor: None,
                ip_address,
            });
        }

        let Some(key) = header_value(parts, API_KEY_HEADER) else {
            return Err(auth_failure(
                state,
                parts,
                ip_address,
                "missing_api_key",
                AppError::Unauthorized {
                    code: "AUTH_MISSING_KEY",
                    message: "X-API-Key header is required".to_string(),
                },
            )
            .await);
        };

        if auth.api_keys.iter().any(|k| k == &key) {
            return Ok(ApiClient {
                actor: Some("static-key".to_string()),
                ip_address,
            });
        }

        match ApiKeyRepository::new(state.db()).validate(&key).await? {
            Some(record) => Ok(ApiClient {
                actor: Some(record.key_prefix),
                ip_address,
            }),
            None => Err(auth_failure(
                state,
                parts,
                ip_address,
                "invalid_api_key",
                AppError::Forbidden {
                    code: "AUTH_INVALID_KEY",
                    message: "Invalid API key".to_string(),
                },
            )
            .await),
        }
    }
}

/// Record `AUTH_FAILED`, then hand back the rejection. If the audit write
/// itself fails, that failure is what the caller sees.
async fn auth_failure(
    state: &AppState,
    parts: &Parts,
    ip_address: Option<String>,
    reason: &str,
    rejection: AppError,
) -> AppError {
    let endpoint = parts
        .extensions
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());
    tracing::warn!(reason, endpoint = %endpoint, ip = ip_address.as_deref().unwrap_or("-"), "Authentication failed");

    let event = NewAuditEvent::new(AuditEventType::AuthFailed)
        .ip_address(ip_address)
        .details(json!({ "reason": reason, "endpoint": endpoint }));
    match state.audit().record(event).await {
        Ok(_) => rejection,
        Err(e) => AppError::Storage(e),
    }
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// First `X-Forwarded-For` hop, else `X-Real-IP`, else the socket peer
pub fn client_ip(parts: &Parts) -> Option<String> {
    if let Some(forwarded) = header_value(parts, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').map(str::trim).find(|ip| !ip.is_empty()) {
            return Some(first.to_string());
        }
    }
    header_value(parts, "x-real-ip").or_else(|| {
        parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    })
}
