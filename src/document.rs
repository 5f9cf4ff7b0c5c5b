//! The uploaded document: raw bytes plus the media type the uploader declared.

use std::sync::Arc;

/// An immutable uploaded document.
///
/// The bytes sit behind an `Arc` so the rasteriser's blocking thread can hold
/// them without copying a multi-megabyte buffer per page.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: Arc<[u8]>,
    pub content_type: String,
}

impl Document {
    pub fn new(content: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            content: Arc::from(content.into()),
            content_type: content_type.into(),
        }
    }

    /// The kind of document, or `None` if the declared type is unsupported.
    pub fn kind(&self) -> Option<DocumentKind> {
        DocumentKind::from_content_type(&self.content_type)
    }
}

/// What the extraction pipeline has to do with a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// A single raster image; OCR runs once on it.
    Image,
    /// A paginated PDF; each page is rasterised and OCR'd in order.
    Pdf,
}

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_SOI: &[u8] = &[0xFF, 0xD8, 0xFF];

impl DocumentKind {
    /// Classify a declared MIME type. Parameters (`; charset=…`) and case are ignored.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = essence(content_type);

        if essence == "application/pdf" {
            Some(DocumentKind::Pdf)
        } else if essence
            .strip_prefix("image/")
            .is_some_and(|sub| !sub.is_empty())
        {
            Some(DocumentKind::Image)
        } else {
            None
        }
    }

    /// Guess a MIME type from magic bytes.
    ///
    /// Only the three types the upload gateway accepts are recognised.
    pub fn sniff(bytes: &[u8]) -> Option<&'static str> {
        if bytes.starts_with(b"%PDF") {
            Some("application/pdf")
        } else if bytes.starts_with(PNG_SIGNATURE) {
            Some("image/png")
        } else if bytes.starts_with(JPEG_SOI) {
            Some("image/jpeg")
        } else {
            None
        }
    }
}

/// Lowercased media type with any `;` parameters dropped.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// File extension used for a scratch copy of an image upload.
pub(crate) fn image_extension(content_type: &str) -> &'static str {
    match essence(content_type).as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/tiff" => "tif",
        "image/bmp" => "bmp",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "png",
    }
}
