//! Scoped scratch images: the on-disk copy the OCR engine reads from.
//!
//! A [`ScratchImage`] owns a [`tempfile::NamedTempFile`], so the file is
//! removed when the value is dropped: after OCR succeeds, after OCR fails, or
//! when the surrounding future is cancelled mid-await. Names carry a caller
//! prefix (page index or timestamp) plus tempfile's random suffix, so
//! concurrent requests sharing one directory never collide.

use crate::error::ExtractionError;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct ScratchImage {
    file: NamedTempFile,
}

impl ScratchImage {
    /// Create `<dir>/<prefix><random>.<extension>` holding `bytes`.
    pub async fn create(
        dir: &Path,
        prefix: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<Self, ExtractionError> {
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(&format!(".{extension}"))
            .tempfile_in(dir)
            .map_err(|source| ExtractionError::TempFile { source })?;

        // On failure `file` is dropped here and the empty file goes with it.
        tokio::fs::write(file.path(), bytes)
            .await
            .map_err(|source| ExtractionError::TempFile { source })?;

        debug!("Wrote scratch image {} ({} bytes)", file.path().display(), bytes.len());
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Remove the file now, logging instead of failing if removal errors.
    ///
    /// Dropping has the same effect silently.
    pub fn release(self) {
        let path = self.file.path().to_path_buf();
        if let Err(e) = self.file.close() {
            warn!("Failed to remove scratch image {}: {}", path.display(), e);
        }
    }
}
