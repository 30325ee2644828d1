//! Configuration types for the extraction pipeline.
//!
//! All pipeline behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Keeping every knob in one struct
//! makes it trivial to share configs across threads and to diff two runs to
//! understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest.

use crate::error::ExtractError;
use crate::pipeline::ocr::OcrEngine;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for the document text-extraction pipeline.
///
/// Built via [`ExtractionConfig::builder()`] or
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use labeltext::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .dpi(300)
///     .language_hints(["it", "en"])
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Minimum trimmed character count for the native PDF text layer to be
    /// accepted without any OCR. Default: 50.
    ///
    /// Below this, the text layer is assumed to be furniture (page numbers,
    /// a producer watermark) rather than the label itself, and the pipeline
    /// falls through to rasterisation.
    pub native_text_threshold: usize,

    /// An OCR candidate must have strictly more trimmed characters than
    /// this to be accepted. Default: 30.
    ///
    /// OCR on a blank or hopeless image tends to return a handful of noise
    /// characters; this gate stops them reaching the downstream analyser.
    pub ocr_text_threshold: usize,

    /// Rendering DPI for first-page rasterisation. Range 72–600. Default: 300.
    ///
    /// 300 DPI is the conventional OCR sweet spot for printed labels:
    /// small print stays legible without producing multi-hundred-megapixel
    /// renders of poster-sized artwork.
    pub dpi: u32,

    /// Timeout for the external rasterisation process in seconds. Default: 30.
    ///
    /// Expiry is reported as a rasterisation failure, never a crash; the
    /// child process is killed.
    pub raster_timeout_secs: u64,

    /// Per-OCR-engine call timeout in seconds. Default: 30.
    pub ocr_timeout_secs: u64,

    /// ISO-639-1 language hints passed to OCR engines, in preference order.
    /// Default: `["it", "en", "fr"]` — the markets the service accepts.
    pub language_hints: Vec<String>,

    /// API key for the remote Vision OCR service. When `None`, the
    /// `GOOGLE_VISION_API_KEY` environment variable is consulted at engine
    /// construction; absent both, the remote engine reports itself
    /// unconfigured and the chain skips straight to the local engine.
    pub vision_api_key: Option<String>,

    /// Base URL of the Vision REST endpoint. Overridable for tests and
    /// regional endpoints. Default: `https://vision.googleapis.com`.
    pub vision_endpoint: String,

    /// Path of the `pdftoppm` rasteriser binary. Default: `pdftoppm` (PATH).
    pub pdftoppm_binary: PathBuf,

    /// Path of the `tesseract` binary for the local OCR engine.
    /// Default: `tesseract` (PATH).
    pub tesseract_binary: PathBuf,

    /// Pre-constructed OCR engine chain, tried strictly in order. Takes
    /// precedence over the built-in remote+local pair. Intended for tests
    /// and for callers wiring custom engines.
    pub engines: Option<Vec<Arc<dyn OcrEngine>>>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            native_text_threshold: 50,
            ocr_text_threshold: 30,
            dpi: 300,
            raster_timeout_secs: 30,
            ocr_timeout_secs: 30,
            language_hints: vec!["it".into(), "en".into(), "fr".into()],
            vision_api_key: None,
            vision_endpoint: "https://vision.googleapis.com".into(),
            pdftoppm_binary: PathBuf::from("pdftoppm"),
            tesseract_binary: PathBuf::from("tesseract"),
            engines: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("native_text_threshold", &self.native_text_threshold)
            .field("ocr_text_threshold", &self.ocr_text_threshold)
            .field("dpi", &self.dpi)
            .field("raster_timeout_secs", &self.raster_timeout_secs)
            .field("ocr_timeout_secs", &self.ocr_timeout_secs)
            .field("language_hints", &self.language_hints)
            .field("vision_api_key", &self.vision_api_key.as_ref().map(|_| "<redacted>"))
            .field("vision_endpoint", &self.vision_endpoint)
            .field("pdftoppm_binary", &self.pdftoppm_binary)
            .field("tesseract_binary", &self.tesseract_binary)
            .field("engines", &self.engines.as_ref().map(|e| e.len()))
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
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn native_text_threshold(mut self, chars: usize) -> Self {
        self.config.native_text_threshold = chars.max(1);
        self
    }

    pub fn ocr_text_threshold(mut self, chars: usize) -> Self {
        self.config.ocr_text_threshold = chars;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn raster_timeout_secs(mut self, secs: u64) -> Self {
        self.config.raster_timeout_secs = secs.max(1);
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs.max(1);
        self
    }

    pub fn language_hints<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.language_hints = hints.into_iter().map(Into::into).collect();
        self
    }

    pub fn vision_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.vision_api_key = Some(key.into());
        self
    }

    pub fn vision_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.vision_endpoint = url.into();
        self
    }

    pub fn pdftoppm_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdftoppm_binary = path.into();
        self
    }

    pub fn tesseract_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_binary = path.into();
        self
    }

    pub fn engines(mut self, engines: Vec<Arc<dyn OcrEngine>>) -> Self {
        self.config.engines = Some(engines);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if !(72..=600).contains(&c.dpi) {
            return Err(ExtractError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.native_text_threshold == 0 {
            return Err(ExtractError::InvalidConfig(
                "native_text_threshold must be ≥ 1".into(),
            ));
        }
        if c.language_hints.is_empty() {
            return Err(ExtractError::InvalidConfig(
                "at least one language hint is required".into(),
            ));
        }
        if let Some(ref engines) = c.engines {
            if engines.is_empty() {
                return Err(ExtractError::InvalidConfig(
                    "injected engine chain must not be empty".into(),
                ));
            }
        }
        Ok(self.config)
    }
}
