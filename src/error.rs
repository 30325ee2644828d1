//! Error types for the labeltext library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`] — **Fatal**: the pipeline cannot produce a result at
//!   all (unsupported upload format, rasterisation broke, every OCR engine
//!   came back below the quality gate). Returned as `Err(ExtractError)` from
//!   [`crate::extract::Extractor::extract`].
//!
//! * [`StageError`] — **Non-fatal**: a single extraction stage failed (the
//!   text layer was unreadable, one OCR engine was unreachable). The
//!   orchestrator absorbs these, records them in the attempt trail, and
//!   moves on to the next stage. Only exhaustion of every applicable stage
//!   is promoted to a fatal error.
//!
//! Cleanup failures are in neither bucket on purpose: a scratch file that
//! cannot be deleted is logged with `tracing::warn!` and never surfaced,
//! because it must not change the outcome of a request that otherwise
//! succeeded or failed on its own merits.

use thiserror::Error;

/// All fatal errors returned by the labeltext library.
///
/// Stage-level failures use [`StageError`] and are recorded in the
/// [`crate::output::ExtractionOutput`] attempt trail rather than propagated
/// here.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The upload is neither a PDF nor a recognised raster image.
    #[error("Unsupported upload format: declared '{declared}', sniffed {sniffed}\nExpected a PDF or a PNG/JPEG/WebP/GIF/TIFF/BMP image.")]
    UnsupportedFormat { declared: String, sniffed: String },

    /// The rendering utility errored, produced no page image, or timed out.
    #[error("Rasterisation failed: {detail}")]
    RasterizationFailed { detail: String },

    /// Every OCR engine was exhausted without clearing the quality gate.
    #[error("No OCR engine produced usable text (best candidate: {best_chars} chars, gate: >{threshold})")]
    OcrInsufficient { best_chars: usize, threshold: usize },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single extraction stage.
///
/// Absorbed by the orchestrator: each one becomes a rejected
/// [`crate::output::StageAttempt`] and the pipeline proceeds to the next
/// stage in priority order.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum StageError {
    /// The native PDF text layer could not be read (malformed or scanned PDF).
    #[error("Native text extraction failed: {detail}")]
    NativeFailed { detail: String },

    /// An OCR engine is not configured or not installed — skipped, never retried.
    #[error("OCR engine '{engine}' is unavailable: {detail}")]
    EngineUnavailable { engine: String, detail: String },

    /// An OCR engine was invoked and errored.
    #[error("OCR engine '{engine}' failed: {detail}")]
    EngineFailed { engine: String, detail: String },

    /// An OCR engine exceeded its per-call timeout.
    #[error("OCR engine '{engine}' timed out after {secs}s")]
    EngineTimeout { engine: String, secs: u64 },
}

impl StageError {
    /// Short human-readable form used in attempt-trail details.
    pub fn summary(&self) -> String {
        self.to_string()
    }
}
