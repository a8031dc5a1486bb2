//! OCR API routes
//!
//! `POST /extract` runs an upload through recognize and optional spelling
//! normalization, feeds that text to the learning dictionary, then applies
//! optional dictionary correction to the text returned to the caller.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::auth::ApiClient;
use crate::error::{AppError, Result};
use crate::lexicon::TrackingReport;
use crate::ocr::{EngineStatus, OcrEngineKind, OcrLanguage};
use crate::state::AppState;

/// Multipart overhead allowed on top of the file size limit
const MULTIPART_SLACK: usize = 64 * 1024;

/// Create the OCR router
pub fn router(max_file_size: usize) -> Router<AppState> {
    Router::new()
        .route("/extract", post(extract))
        .route("/engines", get(list_engines))
        .layer(DefaultBodyLimit::max(max_file_size.saturating_add(MULTIPART_SLACK)))
}

/// Parsed multipart form
#[derive(Debug, Default)]
struct ExtractForm {
    file: Option<(String, Vec<u8>)>,
    language: Option<OcrLanguage>,
    engine: Option<OcrEngineKind>,
    correct: Option<bool>,
    normalize_spelling: Option<bool>,
}

impl ExtractForm {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = ExtractForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    let filename = field.file_name().unwrap_or("upload").to_string();
                    let data = field.bytes().await?;
                    form.file = Some((filename, data.to_vec()));
                }
                "language" => {
                    let value = field.text().await?;
                    form.language = Some(OcrLanguage::parse(&value)?);
                }
                "engine" => {
                    let value = field.text().await?;
                    if !value.trim().is_empty() {
                        let engine = OcrEngineKind::parse(&value).ok_or_else(|| {
                            AppError::BadRequest(format!("Unknown OCR engine: {}", value.trim()))
                        })?;
                        form.engine = Some(engine);
                    }
                }
                "correct" => form.correct = Some(parse_flag(&name, &field.text().await?)?),
                "normalize_spelling" => {
                    form.normalize_spelling = Some(parse_flag(&name, &field.text().await?)?)
                }
                other => tracing::debug!(field = other, "Ignoring unknown form field"),
            }
        }
        Ok(form)
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::BadRequest(format!(
            "Invalid value for {}: {}",
            name, value
        ))),
    }
}

/// What the learning dictionary made of the text
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LearningStatus {
    Tracked(TrackingReport),
    Failed { error_code: &'static str, error: String },
}

#[derive(Serialize)]
struct ExtractResponse {
    success: bool,
    filename: String,
    text: String,
    pages: usize,
    engine: OcrEngineKind,
    language: OcrLanguage,
    processing_time_ms: u64,
    spelling_changes: usize,
    corrections: usize,
    learning: LearningStatus,
}

/// Recognize an uploaded image or PDF
async fn extract(
    State(state): State<AppState>,
    client: ApiClient,
    multipart: Multipart,
) -> Result<Json<ExtractResponse>> {
    let form = ExtractForm::read(multipart).await?;
    let (filename, data) = form
        .file
        .ok_or_else(|| AppError::BadRequest("Missing 'file' field".to_string()))?;
    tracing::debug!(
        filename = %filename,
        size = data.len(),
        client = client.actor.as_deref().unwrap_or("-"),
        "OCR request"
    );

    let extraction = state
        .ocr()
        .extract(&filename, data, form.language, form.engine)
        .await?;
    let mut text = extraction.text;

    let learning_config = &state.config().learning;
    let mut spelling_changes = 0;
    if form
        .normalize_spelling
        .unwrap_or(learning_config.spelling_normalization)
    {
        let normalized = state.normalizer().normalize(&text);
        spelling_changes = normalized.changes;
        text = normalized.text;
    }

    // Tracking sees the recognized text, not the corrected one, so tokens the
    // corrector would rewrite are still counted. The text is returned even
    // when learning fails.
    let learning = match state.lexicon().track_unknown_words(&text).await {
        Ok(report) => LearningStatus::Tracked(report),
        Err(e) => {
            tracing::error!(error_code = e.code(), error = %e, filename = %filename, "Word tracking failed");
            LearningStatus::Failed {
                error_code: e.code(),
                error: e.to_string(),
            }
        }
    };

    let mut corrections = 0;
    if form.correct.unwrap_or(learning_config.dictionary_correction) {
        let approved = state.lexicon().approved_vocabulary().await;
        let corrected = state.corrector().correct(&text, &approved);
        corrections = corrected.corrections;
        text = corrected.text;
    }

    Ok(Json(ExtractResponse {
        success: true,
        filename,
        text,
        pages: extraction.pages,
        engine: extraction.engine,
        language: extraction.language,
        processing_time_ms: extraction.processing_time_ms,
        spelling_changes,
        corrections,
        learning,
    }))
}

#[derive(Serialize)]
struct EnginesResponse {
    success: bool,
    engines: Vec<EngineStatus>,
    default_language: OcrLanguage,
}

/// Configured engines and their availability
async fn list_engines(State(state): State<AppState>) -> Json<EnginesResponse> {
    Json(EnginesResponse {
        success: true,
        engines: state.ocr().engine_status().await,
        default_language: state.ocr().config().default_language,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("correct", "TRUE").unwrap());
        assert!(!parse_flag("correct", " 0 ").unwrap());
        assert!(parse_flag("correct", "perhaps").is_err());
    }

    #[test]
    fn test_learning_failure_serializes_code() {
        let status = LearningStatus::Failed {
            error_code: "AUDIT_WRITE_FAILED",
            error: "audit write failed".into(),
        };
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json["error_code"], "AUDIT_WRITE_FAILED");
    }
}
