//! Optical character recognition on a single raster image file.
//!
//! [`OcrEngine`] is the only capability the extraction pipeline needs from a
//! recogniser: image path in, text out. [`TesseractEngine`] fulfils it by
//! running the `tesseract` command-line tool, which keeps the native
//! leptonica/tesseract libraries out of this crate's link step.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Recognition is English-only.
const OCR_LANGUAGE: &str = "eng";

/// Failure reported by an [`OcrEngine`].
#[derive(Debug, Error)]
pub enum OcrError {
    /// The engine process could not be started at all.
    #[error("failed to run '{program}' (is it installed?): {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The engine ran but exited unsuccessfully.
    #[error("exited with status {status}: {stderr}")]
    Failed { status: i32, stderr: String },
}

/// Performs text recognition on one image file.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image_path: &Path) -> Result<String, OcrError>;
}

/// [`OcrEngine`] that shells out to `tesseract <image> stdout -l eng`.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    program: PathBuf,
}

impl TesseractEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Whether the configured binary can be executed.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(&self, image_path: &Path) -> Result<String, OcrError> {
        let output = Command::new(&self.program)
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(OCR_LANGUAGE)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| OcrError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(OcrError::Failed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(
            "tesseract recognised {} bytes from {}",
            text.len(),
            image_path.display()
        );
        Ok(text)
    }
}
