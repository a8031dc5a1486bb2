//! Lexicon types
//!
//! Defines the tracked-word model, import/export modes and the error type
//! shared by the learning dictionary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::persistence::StorageError;

// ============================================================================
// Constants
// ============================================================================

/// Default promotion threshold
pub const DEFAULT_FREQUENCY_THRESHOLD: u32 = 5;

/// Hard ceiling on records per import request
pub const MAX_IMPORT_WORDS: usize = 10_000;

/// Imported word length bounds (characters)
pub const MIN_IMPORT_WORD_LENGTH: usize = 2;
pub const MAX_IMPORT_WORD_LENGTH: usize = 50;

/// Imported frequencies are clamped into this range
pub const MAX_IMPORT_FREQUENCY: i64 = 1000;

// ============================================================================
// Tracked Word
// ============================================================================

/// A token recorded by the learning dictionary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedWord {
    /// Lower-cased literal token (unique key)
    pub word: String,
    /// Number of sightings, always >= 1
    pub frequency: u32,
    pub is_approved: bool,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
}

impl TrackedWord {
    /// A word seen for the first time
    pub fn first_sighting(word: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            word: word.into(),
            frequency: 1,
            is_approved: false,
            first_seen: now,
            last_seen: now,
            approved_at: None,
        }
    }

    /// Flip the approval flag; returns true if it was not set before
    pub fn approve(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_approved {
            return false;
        }
        self.is_approved = true;
        self.approved_at = Some(now);
        true
    }
}

/// Normalize a raw token into its dictionary key
pub fn normalize_word(raw: &str) -> String {
    raw.trim().to_lowercase()
}

// ============================================================================
// Import / Export
// ============================================================================

/// How imported records combine with the existing store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Keep the higher frequency, OR the approval flags
    #[default]
    Merge,
    /// Discard the store and install exactly the imported records
    Replace,
    /// Merge, dropping records that are not approved
    ApprovedOnly,
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Replace => "replace",
            Self::ApprovedOnly => "approved_only",
        }
    }
}

/// Which words an export contains
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportMode {
    #[default]
    All,
    ApprovedOnly,
}

impl ExportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "full",
            Self::ApprovedOnly => "approved_only",
        }
    }
}

fn default_frequency() -> i64 {
    1
}

fn default_approved() -> bool {
    true
}

/// A single imported record. Extra fields (timestamps from an export) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRecord {
    pub word: String,
    #[serde(default = "default_frequency")]
    pub frequency: i64,
    #[serde(default = "default_approved")]
    pub is_approved: bool,
}

impl WordRecord {
    pub fn new(word: impl Into<String>, frequency: i64, is_approved: bool) -> Self {
        Self {
            word: word.into(),
            frequency,
            is_approved,
        }
    }
}

/// Outcome of an import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub mode: ImportMode,
    /// Distinct words written to the store
    pub imported: usize,
    /// Records discarded (not approved in approved-only mode, or invalid in a word list)
    pub skipped: usize,
}

/// Counts over the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LexiconStats {
    pub total: usize,
    pub approved: usize,
    pub pending: usize,
    pub threshold: u32,
}

/// Result of a manual approval
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalOutcome {
    pub word: TrackedWord,
    pub already_approved: bool,
}

/// What one tracking pass did to the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackingReport {
    /// Candidate tokens counted in this pass
    pub tracked: usize,
    /// Tokens seen for the first time
    pub new_words: usize,
    /// Words promoted during this pass
    pub newly_approved: Vec<String>,
}

// ============================================================================
// Errors
// ============================================================================

/// Learning dictionary errors
#[derive(Debug, thiserror::Error)]
pub enum LexiconError {
    #[error("Too many words ({count}). Maximum allowed: {max}")]
    ImportLimitExceeded { count: usize, max: usize },

    #[error("Invalid word '{word}': {reason}")]
    InvalidWord { word: String, reason: String },

    #[error("Word not found: {0}")]
    WordNotFound(String),

    #[error("Audit trail could not be written: {0}")]
    AuditWriteFailed(String),

    #[error("Word store unavailable: {0}")]
    StoreUnavailable(String),
}

impl LexiconError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::ImportLimitExceeded { .. } => "IMPORT_LIMIT_EXCEEDED",
            Self::InvalidWord { .. } => "INVALID_WORD",
            Self::WordNotFound(_) => "WORD_NOT_FOUND",
            Self::AuditWriteFailed(_) => "AUDIT_WRITE_FAILED",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
        }
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::ImportLimitExceeded { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidWord { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::WordNotFound(_) => StatusCode::NOT_FOUND,
            Self::AuditWriteFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<StorageError> for LexiconError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AuditWrite(msg) => Self::AuditWriteFailed(msg),
            StorageError::Unavailable(msg) => Self::StoreUnavailable(msg),
        }
    }
}
