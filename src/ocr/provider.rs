//! OCR Providers
//!
//! Defines the provider trait and implementations for the supported engines.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::types::{OcrEngineKind, OcrError, OcrLanguage, OcrResult};

/// OCR provider trait
#[async_trait]
pub trait OcrProviderTrait: Send + Sync {
    /// Get the engine type
    fn engine(&self) -> OcrEngineKind;

    /// Check if the engine can be used right now
    async fn is_available(&self) -> bool;

    /// Perform OCR on an encoded image
    async fn recognize(&self, image_data: &[u8], language: OcrLanguage) -> Result<OcrResult, OcrError>;
}

/// Tesseract CLI provider
pub struct TesseractProvider {
    command: String,
}

impl TesseractProvider {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
        }
    }
}

#[async_trait]
impl OcrProviderTrait for TesseractProvider {
    fn engine(&self) -> OcrEngineKind {
        OcrEngineKind::Tesseract
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(lang = language.tesseract_code()))]
    async fn recognize(&self, image_data: &[u8], language: OcrLanguage) -> Result<OcrResult, OcrError> {
        let tmpdir = tempfile::TempDir::with_prefix("tesseract")
            .map_err(|e| OcrError::EngineError(format!("Failed to create temp dir: {}", e)))?;
        let input_path = tmpdir.path().join("input.png");
        tokio::fs::write(&input_path, image_data)
            .await
            .map_err(|e| OcrError::EngineError(format!("Failed to write temp file: {}", e)))?;

        let output = Command::new(&self.command)
            .arg(&input_path)
            .arg("stdout")
            .arg("-l")
            .arg(language.tesseract_code())
            .arg("--oem")
            .arg("3")
            .arg("--psm")
            .arg("6")
            .output()
            .await
            .map_err(|e| OcrError::EngineUnavailable(format!("Failed to run tesseract: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(stderr = %stderr, "Tesseract failed");
            if stderr.contains("Failed loading language") {
                return Err(OcrError::LanguageNotSupported(
                    language.tesseract_code().to_string(),
                ));
            }
            return Err(OcrError::EngineError(format!("Tesseract failed: {}", stderr.trim())));
        }

        Ok(OcrResult {
            text: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            confidence: None,
            engine: OcrEngineKind::Tesseract,
        })
    }
}

/// PaddleOCR serving provider (`hub serving` / PaddleServing HTTP API)
pub struct PaddleProvider {
    base_url: String,
    client: reqwest::Client,
}

impl PaddleProvider {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl OcrProviderTrait for PaddleProvider {
    fn engine(&self) -> OcrEngineKind {
        OcrEngineKind::Paddle
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(&self.base_url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .is_ok()
    }

    async fn recognize(&self, image_data: &[u8], _language: OcrLanguage) -> Result<OcrResult, OcrError> {
        use base64::Engine;

        let url = format!("{}/predict/ocr_system", self.base_url);
        let image_base64 = base64::engine::general_purpose::STANDARD.encode(image_data);
        let request = serde_json::json!({ "images": [image_base64] });

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| OcrError::EngineUnavailable(format!("Failed to call PaddleOCR: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::EngineError(format!(
                "PaddleOCR returned {}: {}",
                status, body
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OcrError::EngineError(format!("Failed to parse response: {}", e)))?;

        parse_paddle_response(&result)
    }
}

/// Pull lines and mean confidence out of a PaddleOCR serving response:
/// `{"status": "000", "results": [[{"text": .., "confidence": ..}, ..]]}`
fn parse_paddle_response(result: &serde_json::Value) -> Result<OcrResult, OcrError> {
    let status = result["status"].as_str().unwrap_or("000");
    if status != "000" {
        let msg = result["msg"].as_str().unwrap_or("unknown error");
        return Err(OcrError::EngineError(format!("PaddleOCR status {}: {}", status, msg)));
    }

    let lines = result["results"]
        .get(0)
        .and_then(|r| r.as_array())
        .cloned()
        .unwrap_or_default();

    let mut texts = Vec::with_capacity(lines.len());
    let mut confidence_sum = 0.0;
    for line in &lines {
        if let Some(text) = line["text"].as_str() {
            texts.push(text.to_string());
            confidence_sum += line["confidence"].as_f64().unwrap_or(0.0);
        }
    }

    Ok(OcrResult {
        confidence: (!texts.is_empty()).then(|| confidence_sum / texts.len() as f64),
        text: texts.join("\n"),
        engine: OcrEngineKind::Paddle,
    })
}

/// Provider returning canned text, for tests and local development
pub struct MockProvider {
    pub engine: OcrEngineKind,
    pub text: String,
    pub available: bool,
    pub fail: bool,
}

impl MockProvider {
    pub fn new(engine: OcrEngineKind, text: &str) -> Self {
        Self {
            engine,
            text: text.to_string(),
            available: true,
            fail: false,
        }
    }
}

#[async_trait]
impl OcrProviderTrait for MockProvider {
    fn engine(&self) -> OcrEngineKind {
        self.engine
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn recognize(&self, _image_data: &[u8], _language: OcrLanguage) -> Result<OcrResult, OcrError> {
        if self.fail {
            return Err(OcrError::EngineError("mock engine failure".to_string()));
        }
        Ok(OcrResult {
            text: self.text.clone(),
            confidence: Some(1.0),
            engine: self.engine,
        })
    }
}
