//! OCR Types
//!
//! Defines engine identifiers, languages, results and errors for document OCR.

use serde::{Deserialize, Serialize};

/// OCR engine type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngineKind {
    /// Tesseract CLI (local)
    Tesseract,
    /// PaddleOCR serving endpoint
    Paddle,
}

impl OcrEngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tesseract => "tesseract",
            Self::Paddle => "paddle",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tesseract" => Some(Self::Tesseract),
            "paddle" | "paddleocr" => Some(Self::Paddle),
            _ => None,
        }
    }
}

impl std::fmt::Display for OcrEngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrLanguage {
    #[serde(rename = "id")]
    Indonesian,
    #[serde(rename = "en")]
    English,
    #[default]
    Mixed,
}

impl OcrLanguage {
    pub fn parse(value: &str) -> Result<Self, OcrError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "id" | "ind" => Ok(Self::Indonesian),
            "en" | "eng" => Ok(Self::English),
            "mixed" | "" => Ok(Self::Mixed),
            other => Err(OcrError::LanguageNotSupported(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Indonesian => "id",
            Self::English => "en",
            Self::Mixed => "mixed",
        }
    }

    /// Tesseract `-l` argument
    pub fn tesseract_code(&self) -> &'static str {
        match self {
            Self::Indonesian => "ind",
            Self::English => "eng",
            Self::Mixed => "ind+eng",
        }
    }
}

/// Recognized text of one image
#[derive(Debug, Clone, Serialize)]
pub struct OcrResult {
    pub text: String,
    /// Mean confidence (0-1), when the engine reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub engine: OcrEngineKind,
}

/// Recognized text of a whole upload
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub text: String,
    pub pages: usize,
    pub engine: OcrEngineKind,
    pub language: OcrLanguage,
    pub processing_time_ms: u64,
}

/// Engine availability as reported by `GET /api/ocr/engines`
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub engine: OcrEngineKind,
    pub available: bool,
}

/// OCR error types
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("File type not allowed: {0}")]
    FileTypeNotAllowed(String),

    #[error("File too large: {size} bytes (maximum {max})")]
    FileTooLarge { size: usize, max: usize },

    #[error("File is empty")]
    FileEmpty,

    #[error("File could not be decoded: {0}")]
    FileCorrupted(String),

    #[error("OCR processing failed: {0}")]
    EngineError(String),

    #[error("OCR engine not available: {0}")]
    EngineUnavailable(String),

    #[error("Language not supported: {0}")]
    LanguageNotSupported(String),

    #[error("PDF conversion failed: {0}")]
    PdfConversion(String),

    #[error("PDF is password protected")]
    PdfPasswordProtected,

    #[error("PDF has more than {max} pages")]
    PdfTooManyPages { max: usize },
}

impl OcrError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::FileTypeNotAllowed(_) => "FILE_TYPE_NOT_ALLOWED",
            Self::FileTooLarge { .. } => "FILE_TOO_LARGE",
            Self::FileEmpty => "FILE_EMPTY",
            Self::FileCorrupted(_) => "FILE_CORRUPTED",
            Self::EngineError(_) => "OCR_ENGINE_ERROR",
            Self::EngineUnavailable(_) => "OCR_ENGINE_UNAVAILABLE",
            Self::LanguageNotSupported(_) => "OCR_LANGUAGE_NOT_SUPPORTED",
            Self::PdfConversion(_) => "PDF_CONVERSION_ERROR",
            Self::PdfPasswordProtected => "PDF_PASSWORD_PROTECTED",
            Self::PdfTooManyPages { .. } => "PDF_TOO_MANY_PAGES",
        }
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::FileTypeNotAllowed(_)
            | Self::FileEmpty
            | Self::LanguageNotSupported(_)
            | Self::PdfTooManyPages { .. } => StatusCode::BAD_REQUEST,
            Self::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::FileCorrupted(_) | Self::PdfConversion(_) | Self::PdfPasswordProtected => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::EngineUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::EngineError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_codes() {
        assert_eq!(OcrLanguage::parse("id").unwrap().tesseract_code(), "ind");
        assert_eq!(OcrLanguage::parse("EN").unwrap().tesseract_code(), "eng");
        assert_eq!(OcrLanguage::parse("mixed").unwrap().tesseract_code(), "ind+eng");
        assert!(matches!(
            OcrLanguage::parse("fr"),
            Err(OcrError::LanguageNotSupported(_))
        ));
    }

    #[test]
    fn test_engine_names() {
        assert_eq!(OcrEngineKind::parse("PaddleOCR"), Some(OcrEngineKind::Paddle));
        assert_eq!(OcrEngineKind::parse("easyocr"), None);
        assert_eq!(
            serde_json::to_string(&OcrEngineKind::Tesseract).unwrap(),
            "\"tesseract\""
        );
    }
}
