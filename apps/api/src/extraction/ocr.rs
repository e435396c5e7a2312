use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use super::ExtractionError;

/// Fixed Tesseract configuration used for every scanned resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrConfig {
    pub lang: &'static str,
    /// OCR engine mode: 1 = LSTM only.
    pub oem: u8,
    /// Page segmentation mode: 3 = fully automatic.
    pub psm: u8,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            lang: "eng",
            oem: 1,
            psm: 3,
        }
    }
}

impl OcrConfig {
    fn args(&self, image: &Path) -> Vec<String> {
        vec![
            image.display().to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.lang.to_string(),
            "--oem".to_string(),
            self.oem.to_string(),
            "--psm".to_string(),
            self.psm.to_string(),
        ]
    }
}

/// Runs the `tesseract` CLI as a child process.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: String,
    config: OcrConfig,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            config: OcrConfig::default(),
        }
    }

    pub async fn recognize(&self, image: &Path) -> Result<String, ExtractionError> {
        if !tokio::fs::try_exists(image).await? {
            return Err(ExtractionError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", image.display()),
            )));
        }

        debug!("Running {} on {}", self.binary, image.display());
        let output = Command::new(&self.binary)
            .args(self.config.args(image))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExtractionError::OcrLaunch {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::Ocr(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
