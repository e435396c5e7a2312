//! Text extraction: turns an uploaded resume file into plain text.
//!
//! Dispatch is by file extension only:
//! - `.pdf`                   → `pdf-extract`
//! - `.docx`                  → `docx-rs` paragraph, table and hyperlink text
//! - `.png` / `.jpg` / `.jpeg` → Tesseract OCR (`-l eng --oem 1 --psm 3`)
//!
//! Anything else fails with `UnsupportedFormat` and must not be retried.

mod document;
mod ocr;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

pub use ocr::TesseractOcr;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(#[source] pdf_extract::OutputError),

    #[error("DOCX extraction failed: {0}")]
    Docx(#[source] docx_rs::ReaderError),

    #[error("Failed to launch {binary}: {source}")]
    OcrLaunch {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// Tesseract ran but exited non-zero; carries its stderr.
    #[error("OCR failed: {0}")]
    Ocr(String),
}

/// Source format of an uploaded resume, resolved from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Pdf,
    Docx,
    Image,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self, ExtractionError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => Ok(SourceFormat::Pdf),
            "docx" => Ok(SourceFormat::Docx),
            "png" | "jpg" | "jpeg" => Ok(SourceFormat::Image),
            other => Err(ExtractionError::UnsupportedFormat(if other.is_empty() {
                "(none)".to_string()
            } else {
                other.to_string()
            })),
        }
    }
}

/// Turns a file on local disk into plain text.
///
/// Carried in `AppState` as `Arc<dyn TextExtractor>` so the pipeline can be tested without
/// real documents or a Tesseract install.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Production extractor: documents are parsed in-process, images go through OCR.
pub struct FileTextExtractor {
    ocr: TesseractOcr,
}

impl FileTextExtractor {
    pub fn new(ocr: TesseractOcr) -> Self {
        Self { ocr }
    }
}

#[async_trait]
impl TextExtractor for FileTextExtractor {
    async fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        let format = SourceFormat::from_path(path)?;
        debug!("Extracting text from {} as {:?}", path.display(), format);

        match format {
            SourceFormat::Pdf => {
                let owned = path.to_path_buf();
                run_blocking(move || document::extract_pdf(&owned)).await
            }
            SourceFormat::Docx => {
                let owned = path.to_path_buf();
                run_blocking(move || document::extract_docx(&owned)).await
            }
            SourceFormat::Image => self.ocr.recognize(path).await,
        }
    }
}

/// PDF and DOCX parsing is CPU-bound; keep it off the async workers.
async fn run_blocking<F>(f: F) -> Result<String, ExtractionError>
where
    F: FnOnce() -> Result<String, ExtractionError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ExtractionError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_dispatch_is_case_insensitive() {
        assert_eq!(
            SourceFormat::from_path(Path::new("/tmp/CV.PDF")).unwrap(),
            SourceFormat::Pdf
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("resume.Docx")).unwrap(),
            SourceFormat::Docx
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("scan.jpeg")).unwrap(),
            SourceFormat::Image
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("scan.png")).unwrap(),
            SourceFormat::Image
        );
    }

    #[test]
    fn test_unknown_extension_is_unsupported() {
        let err = SourceFormat::from_path(Path::new("notes.txt")).unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedFormat(ref ext) if ext == "txt"));
        assert_eq!(err.to_string(), "Unsupported file format: txt");
    }

    #[test]
    fn test_missing_extension_is_unsupported() {
        let err = SourceFormat::from_path(Path::new("README")).unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_extractor_rejects_unsupported_before_touching_disk() {
        let extractor = FileTextExtractor::new(TesseractOcr::new("tesseract"));
        let err = extractor
            .extract_text(Path::new("/definitely/not/here/resume.odt"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_missing_pdf_surfaces_underlying_cause() {
        let extractor = FileTextExtractor::new(TesseractOcr::new("tesseract"));
        let err = extractor
            .extract_text(Path::new("/definitely/not/here/resume.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Io(_)));
    }
}
