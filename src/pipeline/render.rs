//! PDF rasterisation: render one page at a time to a PNG buffer via pdfium.
//!
//! The [`Rasterizer`] trait is the seam between the extraction loop and the
//! rendering backend. Its methods are blocking; the pipeline always calls
//! them from `tokio::task::spawn_blocking`.
//!
//! ## Why bind pdfium per call?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state. Binding inside the blocking closure keeps every pdfium object on
//! the thread that created it, so [`PdfiumRasterizer`] itself only carries
//! plain configuration and is trivially `Send + Sync`.
//!
//! The document is re-parsed on every call as well: an N-page PDF is loaded
//! N + 1 times (one page count, one per page). No pdfium handle has to
//! outlive a blocking call, so rendering of page `i + 1` can wait on OCR of
//! page `i` without pinning a blocking thread.

use crate::error::ExtractionError;
use crate::pipeline::encode;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::debug;

/// One rasterised PDF page, PNG-encoded.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-indexed page number.
    pub page_num: usize,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

/// Renders PDF pages to raster images.
///
/// Both methods block and take the whole PDF as a byte slice; implementations
/// must not cache anything across calls.
pub trait Rasterizer: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self, pdf: &[u8]) -> Result<usize, ExtractionError>;

    /// Render the 1-indexed page `page_num` at `scale` × its viewport size.
    fn render_page(
        &self,
        pdf: &[u8],
        page_num: usize,
        scale: f32,
    ) -> Result<PageImage, ExtractionError>;
}

/// [`Rasterizer`] backed by pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library: Option<PathBuf>,
    password: Option<String>,
}

impl PdfiumRasterizer {
    /// `library` may be the pdfium shared library itself or the directory
    /// holding it. `None` binds to the system library.
    pub fn new(library: Option<PathBuf>, password: Option<String>) -> Self {
        Self { library, password }
    }

    fn bind(&self) -> Result<Pdfium, ExtractionError> {
        let bindings = match &self.library {
            Some(path) => {
                let file = if path.is_dir() {
                    path.join(format!(
                        "{}pdfium{}",
                        std::env::consts::DLL_PREFIX,
                        std::env::consts::DLL_SUFFIX
                    ))
                } else {
                    path.clone()
                };
                Pdfium::bind_to_library(&file)
            }
            None => Pdfium::bind_to_system_library(),
        };

        bindings
            .map(Pdfium::new)
            .map_err(|e| ExtractionError::PdfiumBindingFailed(e.to_string()))
    }

    fn load<'a>(
        &self,
        pdfium: &'a Pdfium,
        pdf: &'a [u8],
    ) -> Result<PdfDocument<'a>, ExtractionError> {
        pdfium
            .load_pdf_from_byte_slice(pdf, self.password.as_deref())
            .map_err(|e| {
                let err_str = format!("{:?}", e);
                if err_str.contains("Password") || err_str.contains("password") {
                    ExtractionError::PasswordRequired
                } else {
                    ExtractionError::CorruptPdf { detail: err_str }
                }
            })
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn page_count(&self, pdf: &[u8]) -> Result<usize, ExtractionError> {
        let pdfium = self.bind()?;
        let document = self.load(&pdfium, pdf)?;
        Ok(document.pages().len() as usize)
    }

    fn render_page(
        &self,
        pdf: &[u8],
        page_num: usize,
        scale: f32,
    ) -> Result<PageImage, ExtractionError> {
        let pdfium = self.bind()?;
        let document = self.load(&pdfium, pdf)?;

        let failed = |detail: String| ExtractionError::RasterisationFailed {
            page: page_num,
            detail,
        };

        let index = page_num
            .checked_sub(1)
            .and_then(|i| u16::try_from(i).ok())
            .ok_or_else(|| failed(format!("page {page_num} is out of range")))?;

        let page = document
            .pages()
            .get(index)
            .map_err(|e| failed(format!("{:?}", e)))?;

        let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| failed(format!("{:?}", e)))?;

        let image = bitmap.as_image();
        let png = encode::encode_png(&image)
            .map_err(|e| failed(format!("PNG encoding failed: {}", e)))?;

        debug!(
            "Rendered page {} → {}x{} px, {} bytes PNG",
            page_num,
            image.width(),
            image.height(),
            png.len()
        );

        Ok(PageImage {
            page_num,
            width: image.width(),
            height: image.height(),
            png,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_library_reports_binding_failure() {
        let r = PdfiumRasterizer::new(Some(PathBuf::from("/definitely/not/libpdfium.so")), None);
        match r.page_count(b"%PDF-1.4") {
            Err(ExtractionError::PdfiumBindingFailed(_)) => {}
            other => panic!("expected PdfiumBindingFailed, got {other:?}"),
        }
    }
}
