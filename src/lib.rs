//! # edgequake-ocrbatch
//!
//! Turn uploaded images and PDFs into plain text with OCR, then split any
//! amount of text into token-bounded messages for a chat endpoint with a
//! fixed context limit.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (bytes + MIME type)
//!  │
//!  ├─ 1. Validate  ≤ 5 MiB, JPEG / PNG / PDF
//!  ├─ 2. Render    each PDF page at 2.0× via pdfium (spawn_blocking)
//!  ├─ 3. OCR       scratch PNG → tesseract → text, scratch removed
//!  ├─ 4. Batch     whitespace words packed under a token ceiling (tiktoken)
//!  └─ 5. Dispatch  one POST per batch, strictly in order
//! ```
//!
//! Pages and batches are always handled one at a time, in document order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_ocrbatch::{
//!     extract_file, Attachment, BatchConfig, Batcher, ExtractionConfig, TokenCounter,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let text = extract_file("scan.pdf", &ExtractionConfig::default()).await?;
//!
//!     let batcher = Batcher::from_config(&BatchConfig::default())?;
//!     let batches = batcher.batch(&text, &[Attachment::new("https://example.com/scan.pdf")]);
//!     for b in &batches {
//!         println!("{} tokens", batcher.counter().count_tokens(&b.content));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ocrbatch` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## Runtime requirements
//!
//! * a pdfium shared library (system-wide, or pointed at via
//!   [`ExtractionConfig::pdfium_lib_path`]) for PDF input;
//! * the `tesseract` executable with English traineddata.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod progress;
pub mod tokens;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{Attachment, Batch, Batcher, Role};
pub use config::{
    BatchConfig, DispatchConfig, ExtractionConfig, ExtractionConfigBuilder, DEFAULT_RENDER_SCALE,
    DEFAULT_TOKEN_CEILING,
};
pub use dispatch::Dispatcher;
pub use document::{Document, DocumentKind};
pub use error::{DispatchError, Error, ExtractionError, ValidationError};
pub use extract::{extract_bytes, extract_file, extract_sync, ExtractionPipeline};
pub use pipeline::ocr::{OcrEngine, OcrError, TesseractEngine};
pub use pipeline::render::{PageImage, PdfiumRasterizer, Rasterizer};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use tokens::{BpeTokenCounter, TokenCounter, TokenEncoding};
pub use upload::{process_upload, ErrorResponse, Upload, UploadResponse};
