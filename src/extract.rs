//! Document-to-text extraction entry points.
//!
//! [`ExtractionPipeline`] turns one [`Document`] into plain text:
//!
//! * **PDF**: for each page in order, rasterise, write a scratch PNG, OCR it,
//!   remove the scratch file, append the text plus `\n`.
//! * **Image**: write the bytes to a scratch file, OCR once, remove it.
//!
//! Pages are never processed concurrently, and a failure on any page aborts
//! the whole extraction with no partial text. Scratch files are released on
//! every exit path, including cancellation of the returned future.

use crate::config::ExtractionConfig;
use crate::document::{image_extension, Document, DocumentKind};
use crate::error::{Error, ExtractionError};
use crate::pipeline::ocr::{OcrEngine, TesseractEngine};
use crate::pipeline::render::{PdfiumRasterizer, Rasterizer};
use crate::pipeline::scratch::ScratchImage;
use crate::progress::ProgressCallback;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Orchestrates a [`Rasterizer`] and an [`OcrEngine`] over a document.
#[derive(Clone)]
pub struct ExtractionPipeline {
    rasterizer: Arc<dyn Rasterizer>,
    ocr: Arc<dyn OcrEngine>,
    config: ExtractionConfig,
}

impl ExtractionPipeline {
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        ocr: Arc<dyn OcrEngine>,
        config: ExtractionConfig,
    ) -> Self {
        Self {
            rasterizer,
            ocr,
            config,
        }
    }

    /// Pipeline with the default backends: pdfium for rendering, the
    /// `tesseract` CLI for recognition.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        let rasterizer =
            PdfiumRasterizer::new(config.pdfium_lib_path.clone(), config.password.clone());
        let ocr = TesseractEngine::new(config.tesseract_path.clone());
        Self::new(Arc::new(rasterizer), Arc::new(ocr), config.clone())
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract the text of `document`.
    ///
    /// # Errors
    /// - [`ExtractionError::UnsupportedFormat`] if the declared type is
    ///   neither `image/*` nor `application/pdf`; nothing touches disk.
    /// - Any rasterisation, scratch-file or OCR failure, for any page.
    pub async fn extract(&self, document: &Document) -> Result<String, ExtractionError> {
        let kind = document
            .kind()
            .ok_or_else(|| ExtractionError::UnsupportedFormat {
                content_type: document.content_type.clone(),
            })?;

        let start = Instant::now();
        info!(
            "Starting extraction: {} ({} bytes)",
            document.content_type,
            document.content.len()
        );

        let (text, pages) = match kind {
            DocumentKind::Pdf => self.extract_pdf(document).await?,
            DocumentKind::Image => (self.extract_image(document).await?, 1),
        };

        info!(
            "Extraction complete: {} pages, {} bytes of text, {}ms",
            pages,
            text.len(),
            start.elapsed().as_millis()
        );
        if let Some(cb) = self.progress() {
            cb.on_extraction_complete(pages, text.len());
        }
        Ok(text)
    }

    async fn extract_pdf(&self, document: &Document) -> Result<(String, usize), ExtractionError> {
        let total_pages = self
            .run_blocking(document, |rasterizer, pdf| rasterizer.page_count(pdf))
            .await?;
        info!("PDF has {} pages", total_pages);

        if let Some(cb) = self.progress() {
            cb.on_extraction_start(total_pages);
        }

        let dir = self.config.scratch_dir();
        let mut text = String::new();

        for page_num in 1..=total_pages {
            if let Some(cb) = self.progress() {
                cb.on_page_start(page_num, total_pages);
            }

            match self.extract_page(document, &dir, page_num).await {
                Ok(page_text) => {
                    if let Some(cb) = self.progress() {
                        cb.on_page_complete(page_num, total_pages, page_text.len());
                    }
                    text.push_str(&page_text);
                    text.push('\n');
                }
                Err(e) => {
                    warn!("Page {}/{} failed: {}", page_num, total_pages, e);
                    if let Some(cb) = self.progress() {
                        cb.on_page_error(page_num, total_pages, &e.to_string());
                    }
                    return Err(e);
                }
            }
        }

        Ok((text, total_pages))
    }

    async fn extract_page(
        &self,
        document: &Document,
        dir: &Path,
        page_num: usize,
    ) -> Result<String, ExtractionError> {
        let scale = self.config.render_scale;
        let image = self
            .run_blocking(document, move |rasterizer, pdf| {
                rasterizer.render_page(pdf, page_num, scale)
            })
            .await?;
        debug!(
            "Page {}: {}x{} px at scale {}",
            image.page_num, image.width, image.height, scale
        );

        self.recognize_scratch(dir, &format!("page-{page_num}-"), "png", &image.png, Some(page_num))
            .await
    }

    async fn extract_image(&self, document: &Document) -> Result<String, ExtractionError> {
        if let Some(cb) = self.progress() {
            cb.on_extraction_start(1);
            cb.on_page_start(1, 1);
        }

        let prefix = format!("upload-{}-", Utc::now().timestamp_millis());
        let result = self
            .recognize_scratch(
                &self.config.scratch_dir(),
                &prefix,
                image_extension(&document.content_type),
                &document.content,
                None,
            )
            .await;

        if let Some(cb) = self.progress() {
            match &result {
                Ok(text) => cb.on_page_complete(1, 1, text.len()),
                Err(e) => cb.on_page_error(1, 1, &e.to_string()),
            }
        }
        result
    }

    /// Write `bytes` to a scratch file, OCR it, and release the file whatever
    /// the outcome.
    async fn recognize_scratch(
        &self,
        dir: &Path,
        prefix: &str,
        extension: &str,
        bytes: &[u8],
        page: Option<usize>,
    ) -> Result<String, ExtractionError> {
        let scratch = ScratchImage::create(dir, prefix, extension, bytes).await?;
        let result = self.ocr.recognize(scratch.path()).await;
        scratch.release();

        result.map_err(|e| ExtractionError::OcrFailed {
            page,
            detail: e.to_string(),
        })
    }

    /// Run a rasterizer call on the blocking pool and wait for it.
    async fn run_blocking<T, F>(&self, document: &Document, f: F) -> Result<T, ExtractionError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Rasterizer, &[u8]) -> Result<T, ExtractionError> + Send + 'static,
    {
        let rasterizer = Arc::clone(&self.rasterizer);
        let pdf = Arc::clone(&document.content);

        tokio::task::spawn_blocking(move || f(rasterizer.as_ref(), &pdf))
            .await
            .map_err(|e| ExtractionError::Internal(format!("Render task panicked: {}", e)))?
    }

    fn progress(&self) -> Option<&ProgressCallback> {
        self.config.progress_callback.as_ref()
    }
}

/// Extract text from in-memory bytes with the default backends.
pub async fn extract_bytes(
    bytes: impl Into<Vec<u8>>,
    content_type: impl Into<String>,
    config: &ExtractionConfig,
) -> Result<String, ExtractionError> {
    let document = Document::new(bytes, content_type);
    ExtractionPipeline::from_config(config)
        .extract(&document)
        .await
}

/// Extract text from a local file, detecting its type from magic bytes.
pub async fn extract_file(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<String, Error> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| Error::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;

    let content_type =
        DocumentKind::sniff(&bytes).ok_or_else(|| ExtractionError::UnsupportedFormat {
            content_type: "application/octet-stream".to_string(),
        })?;
    debug!("Sniffed {} as {}", path.display(), content_type);

    Ok(extract_bytes(bytes, content_type, config).await?)
}

/// Synchronous wrapper around [`ExtractionPipeline::extract`] with the default
/// backends.
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    document: &Document,
    config: &ExtractionConfig,
) -> Result<String, ExtractionError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractionError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(ExtractionPipeline::from_config(config).extract(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ocr::OcrError;
    use crate::pipeline::render::PageImage;
    use async_trait::async_trait;

    struct NoPages;

    impl Rasterizer for NoPages {
        fn page_count(&self, _pdf: &[u8]) -> Result<usize, ExtractionError> {
            Ok(0)
        }

        fn render_page(
            &self,
            _pdf: &[u8],
            page_num: usize,
            _scale: f32,
        ) -> Result<PageImage, ExtractionError> {
            Err(ExtractionError::RasterisationFailed {
                page: page_num,
                detail: "no pages".into(),
            })
        }
    }

    struct Echo;

    #[async_trait]
    impl OcrEngine for Echo {
        async fn recognize(&self, image_path: &Path) -> Result<String, OcrError> {
            Ok(String::from_utf8_lossy(&std::fs::read(image_path).unwrap()).into_owned())
        }
    }

    fn pipeline(dir: &Path) -> ExtractionPipeline {
        let config = ExtractionConfig::builder().temp_dir(dir).build().unwrap();
        ExtractionPipeline::new(Arc::new(NoPages), Arc::new(Echo), config)
    }

    #[tokio::test]
    async fn unsupported_type_fails_without_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document::new(b"hello".to_vec(), "text/plain");

        let err = pipeline(dir.path()).extract(&doc).await.unwrap_err();
        match err {
            ExtractionError::UnsupportedFormat { content_type } => {
                assert_eq!(content_type, "text/plain")
            }
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn image_text_is_returned_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document::new(b"scanned receipt".to_vec(), "image/png");

        let text = pipeline(dir.path()).extract(&doc).await.unwrap();
        assert_eq!(text, "scanned receipt");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn empty_pdf_yields_empty_text() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document::new(b"%PDF-1.4".to_vec(), "application/pdf");

        let text = pipeline(dir.path()).extract(&doc).await.unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn extract_file_rejects_unknown_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"just text").unwrap();

        let err = extract_file(&path, &ExtractionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Extraction(ExtractionError::UnsupportedFormat { .. })
        ));
    }
}
