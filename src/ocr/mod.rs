//! OCR Module
//!
//! Thin layer over external OCR engines:
//! - Tesseract (local CLI)
//! - PaddleOCR (HTTP serving endpoint)
//!
//! PDFs are rasterized with Poppler's `pdftoppm` before recognition.

mod pdf;
mod provider;
mod service;
mod types;

pub use pdf::PdfRasterizer;
pub use provider::{MockProvider, OcrProviderTrait, PaddleProvider, TesseractProvider};
pub use service::{OcrService, OcrServiceConfig, UploadKind, ALLOWED_EXTENSIONS};
pub use types::{EngineStatus, Extraction, OcrEngineKind, OcrError, OcrLanguage, OcrResult};
