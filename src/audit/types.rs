//! Audit event types
//!
//! Audit events are immutable once written. `NewAuditEvent` is what callers
//! hand to the storage layer; `AuditEvent` is what comes back, with the id
//! and timestamp the storage layer assigned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of sensitive action being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    ApiKeyCreated,
    ApiKeyRevoked,
    WordsImported,
    WordsExported,
    WordApproved,
    WordRejected,
    AuthFailed,
}

impl AuditEventType {
    pub const ALL: [AuditEventType; 7] = [
        Self::ApiKeyCreated,
        Self::ApiKeyRevoked,
        Self::WordsImported,
        Self::WordsExported,
        Self::WordApproved,
        Self::WordRejected,
        Self::AuthFailed,
    ];

    /// Stable storage / wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiKeyCreated => "API_KEY_CREATED",
            Self::ApiKeyRevoked => "API_KEY_REVOKED",
            Self::WordsImported => "WORDS_IMPORTED",
            Self::WordsExported => "WORDS_EXPORTED",
            Self::WordApproved => "WORD_APPROVED",
            Self::WordRejected => "WORD_REJECTED",
            Self::AuthFailed => "AUTH_FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|ty| ty.as_str().eq_ignore_ascii_case(value))
    }
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted audit entry
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub id: i64,
    pub event_type: AuditEventType,
    pub actor: Option<String>,
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// An audit entry that has not been stored yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEvent {
    pub event_type: AuditEventType,
    pub actor: Option<String>,
    pub ip_address: Option<String>,
    pub details: Option<Value>,
}

impl NewAuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_type,
            actor: None,
            ip_address: None,
            details: None,
        }
    }

    /// Attach the actor and client address from a request context
    pub fn by(mut self, ctx: &AuditContext) -> Self {
        self.actor = Some(ctx.actor.clone());
        self.ip_address = ctx.ip_address.clone();
        self
    }

    pub fn ip_address(mut self, ip: Option<String>) -> Self {
        self.ip_address = ip;
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Who triggered an action, as supplied by the auth layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditContext {
    pub actor: String,
    pub ip_address: Option<String>,
}

impl AuditContext {
    pub fn new(actor: impl Into<String>, ip_address: Option<String>) -> Self {
        Self {
            actor: actor.into(),
            ip_address,
        }
    }

    /// Context for actions the server performs on its own behalf
    pub fn system() -> Self {
        Self::new("system", None)
    }
}

/// Query filters for listing audit events
#[derive(Debug, Clone)]
pub struct AuditFilter {
    pub event_type: Option<AuditEventType>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for AuditFilter {
    fn default() -> Self {
        Self {
            event_type: None,
            since: None,
            until: None,
            limit: 100,
            offset: 0,
        }
    }
}

impl AuditFilter {
    /// Whether an event falls inside this filter (ignores paging)
    pub fn matches(&self, event: &AuditEvent) -> bool {
        self.event_type.map_or(true, |ty| ty == event.event_type)
            && self.since.map_or(true, |since| event.created_at >= since)
            && self.until.map_or(true, |until| event.created_at <= until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_names_round_trip() {
        for ty in AuditEventType::ALL {
            assert_eq!(AuditEventType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(
            AuditEventType::parse("word_approved"),
            Some(AuditEventType::WordApproved)
        );
        assert_eq!(AuditEventType::parse("RATE_LIMITED"), None);
    }

    #[test]
    fn test_serde_name_matches_storage_name() {
        let json = serde_json::to_string(&AuditEventType::WordsImported).unwrap();
        assert_eq!(json, "\"WORDS_IMPORTED\"");
    }
}
