//! Error types for the edgequake-ocrbatch library.
//!
//! One error type per failure domain, mirroring the stages of a request:
//!
//! * [`ValidationError`]: the upload was rejected before any processing
//!   (too large, wrong media type). Carries every failed rule so the caller
//!   can show them all at once.
//!
//! * [`ExtractionError`]: rasterisation or OCR failed on some page, or the
//!   media type is not something the pipeline can read. Never retried; the
//!   whole extraction is abandoned.
//!
//! * [`DispatchError`]: the downstream chat endpoint rejected a batch.
//!   Remaining batches are not sent and the partial reply is discarded.
//!
//! [`Error`] wraps all of them for callers that drive the full flow, and maps
//! each onto the HTTP status the upload boundary should answer with.

use std::path::PathBuf;
use thiserror::Error;

/// The crate-level error returned by end-to-end entry points.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The BPE tables for the requested encoding could not be loaded.
    #[error("Failed to load tokenizer '{encoding}': {detail}")]
    Tokenizer { encoding: String, detail: String },

    /// Could not read an input file from disk.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// HTTP status the upload boundary answers with for this error.
    ///
    /// Validation failures are the caller's fault (400); everything else is
    /// reported as an opaque processing failure (500).
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            _ => 500,
        }
    }
}

/// One or more upload validation rules failed.
///
/// Displays as the comma-joined list of messages, which is exactly what the
/// upload boundary returns in its error body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .messages.join(", "))]
pub struct ValidationError {
    pub messages: Vec<String>,
}

/// Fatal extraction failures. No partial text survives any of these.
#[derive(Debug, Error)]
pub enum ExtractionError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Declared media type is neither an image nor a PDF.
    #[error("Unsupported media type '{content_type}': expected image/* or application/pdf")]
    UnsupportedFormat { content_type: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt: {detail}")]
    CorruptPdf { detail: String },

    /// PDF requires a password but none (or the wrong one) was provided.
    #[error("PDF is encrypted and requires a valid password")]
    PasswordRequired,

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The OCR engine failed. `page` is `None` for single-image documents.
    #[error("OCR failed{}: {detail}", .page.map(|p| format!(" on page {p}")).unwrap_or_default())]
    OcrFailed { page: Option<usize>, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write a scratch image.
    #[error("Failed to write scratch image: {source}")]
    TempFile {
        #[source]
        source: std::io::Error,
    },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set OCRBATCH_PDFIUM_LIB=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures while sending batches to the downstream chat endpoint.
///
/// `batch` is the 1-indexed position of the batch that failed.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Transport-level failure (DNS, connection reset, TLS, …).
    #[error("Batch {batch}: request failed: {source}")]
    Request {
        batch: usize,
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered with a non-2xx status.
    #[error("Batch {batch}: endpoint returned HTTP {status}")]
    Status { batch: usize, status: u16 },

    /// The endpoint answered 2xx but the body had no `response` string.
    #[error("Batch {batch}: malformed reply: {detail}")]
    InvalidResponse { batch: usize, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_joins_messages() {
        let e = ValidationError {
            messages: vec!["too big".into(), "wrong type".into()],
        };
        assert_eq!(e.to_string(), "too big, wrong type");
    }

    #[test]
    fn ocr_failed_display_with_and_without_page() {
        let e = ExtractionError::OcrFailed {
            page: Some(2),
            detail: "boom".into(),
        };
        assert_eq!(e.to_string(), "OCR failed on page 2: boom");

        let e = ExtractionError::OcrFailed {
            page: None,
            detail: "boom".into(),
        };
        assert_eq!(e.to_string(), "OCR failed: boom");
    }

    #[test]
    fn status_codes() {
        let v: Error = ValidationError {
            messages: vec!["x".into()],
        }
        .into();
        assert_eq!(v.status_code(), 400);

        let x: Error = ExtractionError::Internal("x".into()).into();
        assert_eq!(x.status_code(), 500);

        let d: Error = DispatchError::Status {
            batch: 1,
            status: 502,
        }
        .into();
        assert_eq!(d.status_code(), 500);
    }

    #[test]
    fn dispatch_status_display() {
        let e = DispatchError::Status {
            batch: 3,
            status: 429,
        };
        let msg = e.to_string();
        assert!(msg.contains("Batch 3"), "got: {msg}");
        assert!(msg.contains("429"), "got: {msg}");
    }
}
