//! Pipeline stages for document-to-text extraction.
//!
//! Each submodule implements one step, so each can be tested alone and the
//! rendering or recognition backend can be swapped without touching the rest.
//!
//! ## Data Flow
//!
//! ```text
//! render ──▶ encode ──▶ scratch ──▶ ocr
//! (pdfium)   (PNG)      (temp file)  (tesseract)
//! ```
//!
//! 1. [`render`]: rasterise one PDF page at a fixed scale
//! 2. [`encode`]: PNG-encode the rendered `DynamicImage`
//! 3. [`scratch`]: persist the image to a temp file removed on drop
//! 4. [`ocr`]: recognise text from the temp file
//!
//! [`crate::extract`] drives these stages page by page.

pub mod encode;
pub mod ocr;
pub mod render;
pub mod scratch;
