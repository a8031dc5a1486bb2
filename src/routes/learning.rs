//! Learning dictionary API routes
//!
//! Reads (stats, pending, approved, single word) are open. Everything that
//! mutates the dictionary, hands out its contents, or reads the audit trail
//! requires an admin key.

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::{AuditEvent, AuditEventType, AuditFilter, AuditStats};
use crate::auth::AdminIdentity;
use crate::error::{AppError, Result};
use crate::lexicon::{
    ApprovalOutcome, ExportMode, ImportMode, ImportSummary, LexiconStats, TrackedWord, WordRecord,
};
use crate::state::AppState;

/// Version tag written into export documents
pub const EXPORT_FORMAT_VERSION: &str = "1.0";

/// Create the learning router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/pending", get(list_pending))
        .route("/approved", get(list_approved))
        .route("/words/:word", get(get_word))
        .route("/approve/:word", post(approve_word))
        .route("/reject/:word", delete(reject_word))
        .route("/export", get(export_all))
        .route("/export/approved", get(export_approved))
        .route("/import", post(import_words))
        .route("/import/simple", post(import_simple))
        .route("/audit-logs", get(list_audit_logs))
        .route("/audit-logs/stats", get(audit_stats))
}

#[derive(Serialize)]
struct StatsResponse {
    success: bool,
    #[serde(flatten)]
    stats: LexiconStats,
}

async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        success: true,
        stats: state.lexicon().stats().await,
    })
}

#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    #[serde(default = "default_pending_limit")]
    pub limit: usize,
}

fn default_pending_limit() -> usize {
    50
}

#[derive(Serialize)]
struct WordListResponse {
    success: bool,
    count: usize,
    words: Vec<TrackedWord>,
}

impl WordListResponse {
    fn new(words: Vec<TrackedWord>) -> Self {
        Self {
            success: true,
            count: words.len(),
            words,
        }
    }
}

/// Pending words, most frequent first
async fn list_pending(
    State(state): State<AppState>,
    Query(query): Query<PendingQuery>,
) -> Json<WordListResponse> {
    Json(WordListResponse::new(
        state.lexicon().list_pending(query.limit).await,
    ))
}

async fn list_approved(State(state): State<AppState>) -> Json<WordListResponse> {
    Json(WordListResponse::new(state.lexicon().list_approved().await))
}

async fn get_word(State(state): State<AppState>, Path(word): Path<String>) -> Result<Json<TrackedWord>> {
    Ok(Json(state.lexicon().get_word(&word).await?))
}

#[derive(Serialize)]
struct ApproveResponse {
    success: bool,
    message: String,
    #[serde(flatten)]
    outcome: ApprovalOutcome,
}

/// Force a word into the approved set
async fn approve_word(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(word): Path<String>,
) -> Result<Json<ApproveResponse>> {
    let outcome = state.lexicon().approve(&word, &admin.audit_context()).await?;
    let message = if outcome.already_approved {
        format!("Word '{}' was already approved", outcome.word.word)
    } else {
        format!("Word '{}' approved", outcome.word.word)
    };
    Ok(Json(ApproveResponse {
        success: true,
        message,
        outcome,
    }))
}

#[derive(Serialize)]
struct RejectResponse {
    success: bool,
    message: String,
    word: TrackedWord,
}

/// Delete a word from the dictionary
async fn reject_word(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(word): Path<String>,
) -> Result<Json<RejectResponse>> {
    let removed = state.lexicon().reject(&word, &admin.audit_context()).await?;
    Ok(Json(RejectResponse {
        success: true,
        message: format!("Word '{}' rejected and removed", removed.word),
        word: removed,
    }))
}

/// Full export: approved and pending words side by side
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportDocument {
    pub version: String,
    pub export_date: DateTime<Utc>,
    pub total_words: usize,
    pub approved_words: Vec<TrackedWord>,
    pub pending_words: Vec<TrackedWord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApprovedExportDocument {
    pub version: String,
    pub export_date: DateTime<Utc>,
    pub total_words: usize,
    pub words: Vec<TrackedWord>,
}

async fn export_all(State(state): State<AppState>, admin: AdminIdentity) -> Result<Json<ExportDocument>> {
    let words = state
        .lexicon()
        .export_words(ExportMode::All, &admin.audit_context())
        .await?;
    let total_words = words.len();
    let (approved_words, pending_words): (Vec<_>, Vec<_>) =
        words.into_iter().partition(|w| w.is_approved);

    Ok(Json(ExportDocument {
        version: EXPORT_FORMAT_VERSION.to_string(),
        export_date: Utc::now(),
        total_words,
        approved_words,
        pending_words,
    }))
}

async fn export_approved(
    State(state): State<AppState>,
    admin: AdminIdentity,
) -> Result<Json<ApprovedExportDocument>> {
    let words = state
        .lexicon()
        .export_words(ExportMode::ApprovedOnly, &admin.audit_context())
        .await?;

    Ok(Json(ApprovedExportDocument {
        version: EXPORT_FORMAT_VERSION.to_string(),
        export_date: Utc::now(),
        total_words: words.len(),
        words,
    }))
}

/// Import body. Accepts a plain `words` array as well as a full export
/// document (`approved_words` / `pending_words`), so an export can be fed
/// back unchanged.
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub words: Vec<WordRecord>,
    #[serde(default)]
    pub approved_words: Vec<WordRecord>,
    #[serde(default)]
    pub pending_words: Vec<WordRecord>,
    #[serde(default)]
    pub mode: Option<ImportMode>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImportQuery {
    pub mode: Option<ImportMode>,
}

#[derive(Serialize)]
struct ImportResponse {
    success: bool,
    message: String,
    #[serde(flatten)]
    summary: ImportSummary,
}

impl ImportResponse {
    fn new(summary: ImportSummary) -> Self {
        Self {
            success: true,
            message: format!(
                "Imported {} words ({} skipped)",
                summary.imported, summary.skipped
            ),
            summary,
        }
    }
}

/// Import word records; the query `mode` wins over the body's
async fn import_words(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Query(query): Query<ImportQuery>,
    Json(request): Json<ImportRequest>,
) -> Result<Json<ImportResponse>> {
    let mode = query.mode.or(request.mode).unwrap_or_default();
    let mut records = request.words;
    records.extend(request.approved_words);
    records.extend(request.pending_words);

    let summary = state
        .lexicon()
        .import_words(records, mode, &admin.audit_context())
        .await?;
    Ok(Json(ImportResponse::new(summary)))
}

#[derive(Debug, Deserialize)]
pub struct SimpleImportRequest {
    pub words: Vec<String>,
    #[serde(default = "default_auto_approve")]
    pub auto_approve: bool,
}

fn default_auto_approve() -> bool {
    true
}

/// Merge a plain list of words
async fn import_simple(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Json(request): Json<SimpleImportRequest>,
) -> Result<Json<ImportResponse>> {
    let summary = state
        .lexicon()
        .import_wordlist(request.words, request.auto_approve, &admin.audit_context())
        .await?;
    Ok(Json(ImportResponse::new(summary)))
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub event_type: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl AuditQuery {
    fn into_filter(self) -> Result<AuditFilter> {
        let event_type = self
            .event_type
            .map(|name| {
                AuditEventType::parse(&name)
                    .ok_or_else(|| AppError::BadRequest(format!("Unknown audit event type: {}", name)))
            })
            .transpose()?;

        let defaults = AuditFilter::default();
        Ok(AuditFilter {
            event_type,
            since: self.since,
            until: self.until,
            limit: self.limit.unwrap_or(defaults.limit),
            offset: self.offset.unwrap_or(0),
        })
    }
}

#[derive(Serialize)]
struct AuditLogResponse {
    success: bool,
    count: usize,
    logs: Vec<AuditEvent>,
}

/// Audit events, most recent first
async fn list_audit_logs(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    Query(query): Query<AuditQuery>,
) -> Result<Json<AuditLogResponse>> {
    let filter = query.into_filter()?;
    let logs = state.audit().list(&filter).await?;
    Ok(Json(AuditLogResponse {
        success: true,
        count: logs.len(),
        logs,
    }))
}

#[derive(Serialize)]
struct AuditStatsResponse {
    success: bool,
    #[serde(flatten)]
    stats: AuditStats,
}

async fn audit_stats(State(state): State<AppState>, _admin: AdminIdentity) -> Result<Json<AuditStatsResponse>> {
    Ok(Json(AuditStatsResponse {
        success: true,
        stats: state.audit().stats().await?,
    }))
}
