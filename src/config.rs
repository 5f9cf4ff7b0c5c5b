//! Configuration types for extraction, batching and dispatch.
//!
//! Extraction knobs live in [`ExtractionConfig`], built via its
//! [`ExtractionConfigBuilder`]. Batching and dispatch are small enough to be
//! plain structs with defaults. The token ceiling in particular is a value
//! passed into the batcher, never a module-wide constant, so tests can drive
//! the batcher with any ceiling they like.

use crate::error::Error;
use crate::progress::ProgressCallback;
use crate::tokens::TokenEncoding;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Scale factor applied to the PDF page viewport before rasterising.
pub const DEFAULT_RENDER_SCALE: f32 = 2.0;

/// Default token ceiling for a single text batch.
pub const DEFAULT_TOKEN_CEILING: usize = 4000;

/// Configuration for document-to-text extraction.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_ocrbatch::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .render_scale(2.0)
///     .temp_dir("/tmp/ocrbatch")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Viewport scale used when rasterising each PDF page. Range: 0.5–8.0. Default: 2.0.
    ///
    /// 2.0× of the PDF's 72 DPI user space gives an effective 144 DPI, which
    /// tesseract reads reliably for body-size fonts.
    pub render_scale: f32,

    /// Directory that holds scratch images while OCR runs on them.
    /// If None, uses the system temp dir.
    pub temp_dir: Option<PathBuf>,

    /// Path to the `tesseract` executable. Default: `"tesseract"` (resolved via PATH).
    pub tesseract_path: PathBuf,

    /// Path to a pdfium shared library, or a directory containing one.
    /// If None, binds to the system library.
    pub pdfium_lib_path: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Optional per-page progress hooks.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            render_scale: DEFAULT_RENDER_SCALE,
            temp_dir: None,
            tesseract_path: PathBuf::from("tesseract"),
            pdfium_lib_path: None,
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("render_scale", &self.render_scale)
            .field("temp_dir", &self.temp_dir)
            .field("tesseract_path", &self.tesseract_path)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Directory scratch images are created in.
    pub fn scratch_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale;
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(dir.into());
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_path = path.into();
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, Error> {
        let c = &self.config;
        if !(0.5..=8.0).contains(&c.render_scale) {
            return Err(Error::InvalidConfig(format!(
                "Render scale must be 0.5–8.0, got {}",
                c.render_scale
            )));
        }
        if c.tesseract_path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "Tesseract path must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Configuration for splitting text into token-bounded batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum tokens per text batch. Default: 4000.
    ///
    /// A single word longer than this is still emitted, alone, in its own batch.
    pub ceiling: usize,

    /// BPE encoding used to count tokens. Must match the endpoint's.
    pub encoding: TokenEncoding,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            ceiling: DEFAULT_TOKEN_CEILING,
            encoding: TokenEncoding::default(),
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.ceiling == 0 {
            return Err(Error::InvalidConfig("Token ceiling must be ≥ 1".into()));
        }
        Ok(())
    }
}

/// Configuration for the downstream chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Absolute URL every batch is POSTed to.
    pub endpoint: String,
}

impl DispatchConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ExtractionConfig::default();
        assert_eq!(c.render_scale, 2.0);
        assert!(c.temp_dir.is_none());
        assert_eq!(c.tesseract_path, PathBuf::from("tesseract"));

        let b = BatchConfig::default();
        assert_eq!(b.ceiling, 4000);
        assert_eq!(b.encoding, TokenEncoding::Cl100kBase);
    }

    #[test]
    fn builder_rejects_bad_scale() {
        let err = ExtractionConfig::builder()
            .render_scale(0.0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Render scale"), "got: {err}");
    }

    #[test]
    fn scratch_dir_falls_back_to_system_temp() {
        let c = ExtractionConfig::default();
        assert_eq!(c.scratch_dir(), std::env::temp_dir());

        let c = ExtractionConfig::builder().temp_dir("/x/y").build().unwrap();
        assert_eq!(c.scratch_dir(), PathBuf::from("/x/y"));
    }

    #[test]
    fn zero_ceiling_is_invalid() {
        let b = BatchConfig {
            ceiling: 0,
            ..Default::default()
        };
        assert!(b.validate().is_err());
        assert!(BatchConfig::default().validate().is_ok());
    }

    #[test]
    fn debug_redacts_password() {
        let c = ExtractionConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
