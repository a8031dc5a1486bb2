//! PDF rasterization via Poppler's `pdftoppm`

use std::path::PathBuf;

use tokio::process::Command;

use super::types::OcrError;

/// Converts PDF documents into one PNG per page
#[derive(Debug, Clone)]
pub struct PdfRasterizer {
    command: String,
    dpi: u32,
    max_pages: usize,
}

impl PdfRasterizer {
    pub fn new(command: &str, dpi: u32, max_pages: usize) -> Self {
        Self {
            command: command.to_string(),
            dpi,
            max_pages: max_pages.max(1),
        }
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub async fn is_available(&self) -> bool {
        Command::new(&self.command).arg("-v").output().await.is_ok()
    }

    /// Render every page to PNG, in page order
    #[tracing::instrument(level = "debug", skip_all, fields(bytes = pdf.len(), dpi = self.dpi))]
    pub async fn rasterize(&self, pdf: &[u8]) -> Result<Vec<Vec<u8>>, OcrError> {
        let tmpdir = tempfile::TempDir::with_prefix("pages")
            .map_err(|e| OcrError::PdfConversion(format!("Failed to create temp dir: {}", e)))?;
        let input_path = tmpdir.path().join("input.pdf");
        tokio::fs::write(&input_path, pdf)
            .await
            .map_err(|e| OcrError::PdfConversion(format!("Failed to write temp file: {}", e)))?;

        // One page past the limit tells us whether the document is too long
        let last_page = self.max_pages + 1;
        let output = Command::new(&self.command)
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg("-f")
            .arg("1")
            .arg("-l")
            .arg(last_page.to_string())
            .arg(&input_path)
            .arg(tmpdir.path().join("page"))
            .output()
            .await
            .map_err(|e| OcrError::EngineUnavailable(format!("Failed to run pdftoppm: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(stderr = %stderr, "pdftoppm failed");
            if is_password_error(&stderr) {
                return Err(OcrError::PdfPasswordProtected);
            }
            return Err(OcrError::PdfConversion(stderr.trim().to_string()));
        }

        let mut page_paths: Vec<PathBuf> = std::fs::read_dir(tmpdir.path())
            .map_err(|e| OcrError::PdfConversion(format!("Failed to list pages: {}", e)))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
            .collect();
        // pdftoppm zero-pads page numbers, so name order is page order
        page_paths.sort();

        if page_paths.len() > self.max_pages {
            return Err(OcrError::PdfTooManyPages {
                max: self.max_pages,
            });
        }
        if page_paths.is_empty() {
            return Err(OcrError::PdfConversion("PDF has no pages".to_string()));
        }

        let mut pages = Vec::with_capacity(page_paths.len());
        for path in page_paths {
            let data = tokio::fs::read(&path)
                .await
                .map_err(|e| OcrError::PdfConversion(format!("Failed to read page: {}", e)))?;
            pages.push(data);
        }

        tracing::debug!(pages = pages.len(), "PDF rasterized");
        Ok(pages)
    }
}

fn is_password_error(stderr: &str) -> bool {
    stderr.to_ascii_lowercase().contains("password")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_error_detection() {
        assert!(is_password_error("Command Line Error: Incorrect password"));
        assert!(!is_password_error("Syntax Error: Couldn't find trailer dictionary"));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let rasterizer = PdfRasterizer::new("/nonexistent/pdftoppm", 150, 50);
        assert!(!rasterizer.is_available().await);
        assert!(matches!(
            rasterizer.rasterize(b"%PDF-1.4").await,
            Err(OcrError::EngineUnavailable(_))
        ));
    }
}
