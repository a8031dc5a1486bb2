//! OCR Lexicon Server
//!
//! REST OCR gateway over Tesseract and PaddleOCR. Recognized text is corrected
//! against a dictionary that learns new words from the documents it sees:
//! unknown words are counted, promoted once they are seen often enough, and
//! curated by administrators through an audited API.
//!
//! # Modules
//!
//! - `lexicon`: word tracking, promotion, import/export, correction
//! - `audit`: append-only audit trail for administrative actions
//! - `persistence`: storage backends shared by the lexicon and the audit log
//! - `ocr`: engines, PDF rasterization and upload handling
//! - `routes`: HTTP handlers

pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod lexicon;
pub mod ocr;
pub mod persistence;
pub mod routes;
pub mod state;
pub mod text;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the full HTTP router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/health", get(routes::health::health_check))
        .nest("/api/ocr", routes::ocr::router(state.config().ocr.max_file_size))
        .nest("/api/learning", routes::learning::router())
        .nest("/api/admin", routes::admin::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
