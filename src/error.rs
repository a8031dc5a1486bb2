//! Error types for the OCR lexicon server

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::lexicon::LexiconError;
use crate::ocr::OcrError;
use crate::persistence::StorageError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("API key not found: {0}")]
    KeyNotFound(i64),

    /// Missing credentials (401)
    #[error("{message}")]
    Unauthorized { code: &'static str, message: String },

    /// Rejected credentials (403)
    #[error("{message}")]
    Forbidden { code: &'static str, message: String },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Lexicon(#[from] LexiconError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::KeyNotFound(_) => "KEY_NOT_FOUND",
            AppError::BadRequest(_) | AppError::Multipart(_) => "BAD_REQUEST",
            AppError::Unauthorized { code, .. } | AppError::Forbidden { code, .. } => *code,
            AppError::Internal(_) | AppError::Io(_) => "INTERNAL_ERROR",
            AppError::Lexicon(e) => e.code(),
            AppError::Ocr(e) => e.code(),
            AppError::Storage(StorageError::AuditWrite(_)) => "AUDIT_WRITE_FAILED",
            AppError::Storage(StorageError::Unavailable(_)) => "STORE_UNAVAILABLE",
            AppError::Database(_) => "DATABASE_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) | AppError::KeyNotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Multipart(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::Internal(_) | AppError::Io(_) | AppError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Lexicon(e) => e.status_code(),
            AppError::Ocr(e) => e.status_code(),
            AppError::Storage(e) => LexiconError::from(e.clone()).status_code(),
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error_code: &'static str,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Server-side failures get a generic message; the cause goes to the log
        let message = if status.is_server_error() {
            tracing::error!(error_code = code, "{}", self);
            match &self {
                AppError::Lexicon(e) => e.to_string(),
                AppError::Storage(e) => e.to_string(),
                AppError::Ocr(e) => e.to_string(),
                AppError::Database(_) => "Database error".to_string(),
                _ => "An internal error occurred".to_string(),
            }
        } else {
            tracing::debug!(error_code = code, "{}", self);
            self.to_string()
        };

        let details = if cfg!(debug_assertions) {
            Some(format!("{:?}", self))
        } else {
            None
        };

        let body = Json(ErrorResponse {
            success: false,
            error_code: code,
            error: message,
            details,
        });

        (status, body).into_response()
    }
}
