//! OCR Service
//!
//! Validates uploads, turns them into page images and runs them through the
//! configured engines.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;

use futures::{StreamExt, TryStreamExt};
use image::imageops::FilterType;

use super::{
    pdf::PdfRasterizer,
    provider::{OcrProviderTrait, PaddleProvider, TesseractProvider},
    types::{EngineStatus, Extraction, OcrEngineKind, OcrError, OcrLanguage, OcrResult},
};

/// Extensions accepted for upload
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tiff", "tif", "pdf"];

/// OCR service configuration
#[derive(Debug, Clone)]
pub struct OcrServiceConfig {
    /// Preferred engine order
    pub engines: Vec<OcrEngineKind>,
    pub tesseract_cmd: String,
    pub pdftoppm_cmd: String,
    pub paddle_url: String,
    pub default_language: OcrLanguage,
    pub pdf_dpi: u32,
    pub pdf_max_pages: usize,
    /// Pages recognized concurrently
    pub pdf_workers: usize,
    /// Longest image edge before downscaling
    pub max_image_dimension: u32,
    pub max_file_size: usize,
}

impl Default for OcrServiceConfig {
    fn default() -> Self {
        Self {
            engines: vec![OcrEngineKind::Tesseract, OcrEngineKind::Paddle],
            tesseract_cmd: "tesseract".to_string(),
            pdftoppm_cmd: "pdftoppm".to_string(),
            paddle_url: "http://localhost:8866".to_string(),
            default_language: OcrLanguage::Mixed,
            pdf_dpi: 150,
            pdf_max_pages: 50,
            pdf_workers: 2,
            max_image_dimension: 2000,
            max_file_size: 50 * 1024 * 1024,
        }
    }
}

/// What an accepted upload contains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    Pdf,
}

/// OCR service for uploaded images and PDFs
pub struct OcrService {
    config: OcrServiceConfig,
    providers: Vec<Arc<dyn OcrProviderTrait>>,
    rasterizer: PdfRasterizer,
}

impl OcrService {
    /// Create a new OCR service with the engines named in the config
    pub fn new(config: OcrServiceConfig) -> Self {
        let mut providers: Vec<Arc<dyn OcrProviderTrait>> = Vec::new();
        for engine in &config.engines {
            match engine {
                OcrEngineKind::Tesseract => {
                    providers.push(Arc::new(TesseractProvider::new(&config.tesseract_cmd)))
                }
                OcrEngineKind::Paddle => providers.push(Arc::new(PaddleProvider::new(&config.paddle_url))),
            }
        }
        Self::with_providers(config, providers)
    }

    /// Create a service over explicit providers, tried in the given order
    pub fn with_providers(config: OcrServiceConfig, providers: Vec<Arc<dyn OcrProviderTrait>>) -> Self {
        let rasterizer = PdfRasterizer::new(&config.pdftoppm_cmd, config.pdf_dpi, config.pdf_max_pages);
        Self {
            config,
            providers,
            rasterizer,
        }
    }

    pub fn config(&self) -> &OcrServiceConfig {
        &self.config
    }

    /// Configured engines and whether each is reachable
    pub async fn engine_status(&self) -> Vec<EngineStatus> {
        let mut statuses = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            statuses.push(EngineStatus {
                engine: provider.engine(),
                available: provider.is_available().await,
            });
        }
        statuses
    }

    /// Check name, emptiness and size of an upload
    pub fn validate_upload(&self, filename: &str, size: usize) -> Result<UploadKind, OcrError> {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(OcrError::FileTypeNotAllowed(format!(
                "'{}' (allowed: {})",
                filename,
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }
        if size == 0 {
            return Err(OcrError::FileEmpty);
        }
        if size > self.config.max_file_size {
            return Err(OcrError::FileTooLarge {
                size,
                max: self.config.max_file_size,
            });
        }

        let mime = mime_guess::from_path(filename).first_or_octet_stream();
        if mime.essence_str() == "application/pdf" {
            Ok(UploadKind::Pdf)
        } else {
            Ok(UploadKind::Image)
        }
    }

    /// Recognize an uploaded file. PDF pages are recognized concurrently and
    /// joined in page order.
    pub async fn extract(
        &self,
        filename: &str,
        data: Vec<u8>,
        language: Option<OcrLanguage>,
        engine: Option<OcrEngineKind>,
    ) -> Result<Extraction, OcrError> {
        let started = Instant::now();
        let language = language.unwrap_or(self.config.default_language);
        let kind = self.validate_upload(filename, data.len())?;

        let pages = match kind {
            UploadKind::Pdf => self.rasterizer.rasterize(&data).await?,
            UploadKind::Image => vec![data],
        };
        let page_count = pages.len();

        let results: Vec<OcrResult> = futures::stream::iter(pages)
            .map(|page| async move {
                let prepared = self.prepare_image(page).await?;
                self.recognize(&prepared, engine, language).await
            })
            .buffered(self.config.pdf_workers.max(1))
            .try_collect()
            .await?;

        let used_engine = results
            .first()
            .map(|r| r.engine)
            .or(engine)
            .unwrap_or(OcrEngineKind::Tesseract);

        let text = match kind {
            UploadKind::Pdf => join_pages(&results),
            UploadKind::Image => results.into_iter().map(|r| r.text).collect(),
        };

        let extraction = Extraction {
            text,
            pages: page_count,
            engine: used_engine,
            language,
            processing_time_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            filename,
            pages = extraction.pages,
            engine = %extraction.engine,
            ms = extraction.processing_time_ms,
            "OCR extraction finished"
        );
        Ok(extraction)
    }

    /// Perform OCR on a prepared image
    pub async fn recognize(
        &self,
        image_data: &[u8],
        preferred: Option<OcrEngineKind>,
        language: OcrLanguage,
    ) -> Result<OcrResult, OcrError> {
        // If a specific engine is requested, only that one is used
        if let Some(preferred) = preferred {
            let provider = self
                .providers
                .iter()
                .find(|p| p.engine() == preferred)
                .ok_or_else(|| {
                    OcrError::EngineUnavailable(format!("{} engine is not configured", preferred))
                })?;
            if !provider.is_available().await {
                return Err(OcrError::EngineUnavailable(format!(
                    "{} engine is not available",
                    preferred
                )));
            }
            return provider.recognize(image_data, language).await;
        }

        // Try engines in order
        let mut last_error = None;
        for provider in &self.providers {
            if !provider.is_available().await {
                continue;
            }
            match provider.recognize(image_data, language).await {
                Ok(result) => return Ok(result),
                Err(e @ OcrError::LanguageNotSupported(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!(engine = %provider.engine(), error = %e, "OCR engine failed, trying next");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            OcrError::EngineUnavailable("No OCR engines available".to_string())
        }))
    }

    /// Decode an image and downscale it if it exceeds the size limit
    async fn prepare_image(&self, data: Vec<u8>) -> Result<Vec<u8>, OcrError> {
        let max_dimension = self.config.max_image_dimension;
        tokio::task::spawn_blocking(move || downscale(data, max_dimension))
            .await
            .map_err(|e| OcrError::EngineError(format!("Image worker failed: {}", e)))?
    }
}

/// Re-encode as PNG when the longest edge exceeds `max_dimension`
fn downscale(data: Vec<u8>, max_dimension: u32) -> Result<Vec<u8>, OcrError> {
    let img = image::load_from_memory(&data).map_err(|e| OcrError::FileCorrupted(e.to_string()))?;
    if img.width().max(img.height()) <= max_dimension {
        return Ok(data);
    }

    let resized = img.resize(max_dimension, max_dimension, FilterType::Lanczos3);
    tracing::debug!(
        from = ?(img.width(), img.height()),
        to = ?(resized.width(), resized.height()),
        "Downscaled image"
    );

    let mut buffer = Vec::new();
    resized
        .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .map_err(|e| OcrError::FileCorrupted(format!("Failed to encode image: {}", e)))?;
    Ok(buffer)
}

/// Join page texts under `--- Page N ---` headers, skipping blank pages
fn join_pages(results: &[OcrResult]) -> String {
    results
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.text.trim().is_empty())
        .map(|(i, r)| format!("--- Page {} ---\n{}", i + 1, r.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::MockProvider;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::new_rgb8(width, height);
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn service(providers: Vec<Arc<dyn OcrProviderTrait>>) -> OcrService {
        OcrService::with_providers(OcrServiceConfig::default(), providers)
    }

    #[test]
    fn test_validate_upload() {
        let service = service(Vec::new());
        assert_eq!(service.validate_upload("scan.PNG", 10).unwrap(), UploadKind::Image);
        assert_eq!(service.validate_upload("surat.pdf", 10).unwrap(), UploadKind::Pdf);
        assert!(matches!(
            service.validate_upload("notes.docx", 10),
            Err(OcrError::FileTypeNotAllowed(_))
        ));
        assert!(matches!(
            service.validate_upload("noext", 10),
            Err(OcrError::FileTypeNotAllowed(_))
        ));
        assert!(matches!(service.validate_upload("scan.jpg", 0), Err(OcrError::FileEmpty)));
        assert!(matches!(
            service.validate_upload("scan.jpg", 60 * 1024 * 1024),
            Err(OcrError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_downscale_only_large_images() {
        let small = png(100, 50);
        assert_eq!(downscale(small.clone(), 2000).unwrap(), small);

        let large = downscale(png(400, 200), 100).unwrap();
        let img = image::load_from_memory(&large).unwrap();
        assert_eq!((img.width(), img.height()), (100, 50));

        assert!(matches!(
            downscale(b"garbage".to_vec(), 100),
            Err(OcrError::FileCorrupted(_))
        ));
    }

    #[test]
    fn test_join_pages() {
        let page = |text: &str| OcrResult {
            text: text.to_string(),
            confidence: None,
            engine: OcrEngineKind::Tesseract,
        };
        let joined = join_pages(&[page("satu"), page("  "), page("tiga")]);
        assert_eq!(joined, "--- Page 1 ---\nsatu\n\n--- Page 3 ---\ntiga");
    }

    #[tokio::test]
    async fn test_falls_back_to_next_engine() {
        let mut broken = MockProvider::new(OcrEngineKind::Tesseract, "");
        broken.fail = true;
        let service = service(vec![
            Arc::new(broken),
            Arc::new(MockProvider::new(OcrEngineKind::Paddle, "Surat Keputusan")),
        ]);

        let extraction = service
            .extract("scan.png", png(10, 10), None, None)
            .await
            .unwrap();
        assert_eq!(extraction.text, "Surat Keputusan");
        assert_eq!(extraction.engine, OcrEngineKind::Paddle);
        assert_eq!(extraction.pages, 1);
    }

    #[tokio::test]
    async fn test_requested_engine_must_be_available() {
        let mut offline = MockProvider::new(OcrEngineKind::Paddle, "x");
        offline.available = false;
        let service = service(vec![
            Arc::new(MockProvider::new(OcrEngineKind::Tesseract, "x")),
            Arc::new(offline),
        ]);

        let result = service
            .extract("scan.png", png(10, 10), None, Some(OcrEngineKind::Paddle))
            .await;
        assert!(matches!(result, Err(OcrError::EngineUnavailable(_))));
    }

    #[tokio::test]
    async fn test_no_engines() {
        let result = service(Vec::new())
            .extract("scan.png", png(10, 10), None, None)
            .await;
        assert!(matches!(result, Err(OcrError::EngineUnavailable(_))));
    }

    #[tokio::test]
    async fn test_engine_status() {
        let mut offline = MockProvider::new(OcrEngineKind::Paddle, "x");
        offline.available = false;
        let statuses = service(vec![
            Arc::new(MockProvider::new(OcrEngineKind::Tesseract, "x")),
            Arc::new(offline),
        ])
        .engine_status()
        .await;
        assert!(statuses[0].available);
        assert!(!statuses[1].available);
    }
}
