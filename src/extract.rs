//! Pipeline orchestrator: drives an upload through the extraction state
//! machine and guarantees scratch cleanup on every exit path.
//!
//! ## State machine
//!
//! ```text
//! Received ── image upload ───────────────────────────────▶ Succeeded
//!    │
//!    ▼ (PDF)
//! NativeTried ── text layer ≥ gate ───────────────────────▶ Succeeded
//!    │
//!    ▼ (layer short or unreadable)
//! Rasterized ── render + enhance failed ──────────────────▶ Failed
//!    │
//!    ▼
//! CloudOcrTried ─▶ LocalOcrTried ── chain win ────────────▶ Succeeded
//!                        │
//!                        ▼ (chain exhausted)
//!                      Failed
//! ```
//!
//! States advance strictly forward; there are no retries of earlier
//! stages. The full attempt trail is returned on success so callers can
//! see which strategy won and which were rejected on the way.

use crate::config::ExtractionConfig;
use crate::document::{classify, DocumentKind, UploadedDocument};
use crate::error::ExtractError;
use crate::normalize::normalize;
use crate::output::{
    ExtractedPayload, ExtractionOutput, ExtractionStats, PipelineState, Stage, StageAttempt,
};
use crate::pipeline::ocr::{self, candidate_chars, OcrEngine};
use crate::pipeline::tesseract::TesseractOcr;
use crate::pipeline::vision::CloudVisionOcr;
use crate::pipeline::{native, raster};
use crate::scratch::Scratch;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The document text-extraction pipeline.
///
/// Construct once, share across requests: the engine chain (and the remote
/// engine's HTTP client) is built a single time in [`Extractor::new`].
///
/// # Example
/// ```rust,no_run
/// use labeltext::{Extractor, ExtractionConfig, UploadedDocument};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let extractor = Extractor::new(ExtractionConfig::default())?;
/// let upload = UploadedDocument::new(
///     std::fs::read("label.pdf")?,
///     "application/pdf",
///     "label.pdf",
/// );
/// let output = extractor.extract(&upload).await?;
/// println!("{}", output.payload.text().unwrap_or(""));
/// # Ok(())
/// # }
/// ```
pub struct Extractor {
    config: ExtractionConfig,
    engines: Vec<Arc<dyn OcrEngine>>,
}

impl Extractor {
    /// Build the pipeline with its OCR engine chain.
    ///
    /// The chain is the injected [`ExtractionConfig::engines`] when given,
    /// otherwise the built-in remote-then-local pair.
    pub fn new(config: ExtractionConfig) -> Result<Self, ExtractError> {
        let engines: Vec<Arc<dyn OcrEngine>> = match config.engines.clone() {
            Some(injected) => injected,
            None => vec![
                Arc::new(CloudVisionOcr::new(&config)?),
                Arc::new(TesseractOcr::new(&config)),
            ],
        };
        Ok(Self { config, engines })
    }

    /// Run the full extraction pipeline over one upload.
    ///
    /// Non-PDF images are passed through byte-identical without touching
    /// any extraction stage. PDFs walk the state machine: native text
    /// layer, then first-page rasterisation, then the OCR engine chain.
    /// The per-request scratch directory is removed before this returns,
    /// on success and on every error path alike.
    pub async fn extract(
        &self,
        doc: &UploadedDocument,
    ) -> Result<ExtractionOutput, ExtractError> {
        let scratch = Scratch::new().map_err(|e| {
            ExtractError::Internal(format!("failed to create scratch directory: {e}"))
        })?;
        let request_id = scratch.request_id().to_string();
        info!(
            %request_id,
            filename = %doc.filename,
            bytes = doc.bytes.len(),
            "extraction started"
        );

        let result = self.run(doc, &scratch, request_id).await;

        // Cleanup runs whatever the outcome; a failed delete is logged
        // inside close() and never overrides the pipeline result.
        scratch.close();

        match &result {
            Ok(out) => info!(
                request_id = %out.request_id,
                total_ms = out.stats.total_ms,
                attempts = out.attempts.len(),
                "extraction succeeded"
            ),
            Err(e) => warn!("extraction failed: {e}"),
        }
        result
    }

    async fn run(
        &self,
        doc: &UploadedDocument,
        scratch: &Scratch,
        request_id: String,
    ) -> Result<ExtractionOutput, ExtractError> {
        let started = Instant::now();
        let attempts: Vec<StageAttempt> = Vec::new();
        let mut stats = ExtractionStats::default();

        let kind = classify(doc)?;
        let mime_type = match kind {
            DocumentKind::Image { mime_type } => mime_type,
            DocumentKind::Pdf => {
                return self
                    .run_pdf(doc, scratch, request_id, started, attempts, stats)
                    .await;
            }
        };

        // Image uploads bypass extraction entirely: the downstream
        // analyser reads them visually, so the original bytes are echoed
        // back untouched.
        debug!(%mime_type, "image upload, forwarding as-is");
        stats.total_ms = started.elapsed().as_millis() as u64;
        Ok(ExtractionOutput {
            payload: ExtractedPayload::Image {
                bytes: doc.bytes.clone(),
                mime_type,
            },
            state: PipelineState::Succeeded,
            attempts,
            stats,
            request_id,
        })
    }

    async fn run_pdf(
        &self,
        doc: &UploadedDocument,
        scratch: &Scratch,
        request_id: String,
        started: Instant,
        mut attempts: Vec<StageAttempt>,
        mut stats: ExtractionStats,
    ) -> Result<ExtractionOutput, ExtractError> {
        let mut state = PipelineState::Received;

        // Stage 1: native text layer. Cheap, so always tried first; a
        // short or unreadable layer falls through to OCR without error.
        let native_started = Instant::now();
        let native = native::extract_text(&doc.bytes).await;
        stats.native_ms = native_started.elapsed().as_millis() as u64;
        state = PipelineState::NativeTried;
        debug!(?state, ms = stats.native_ms, "native stage finished");

        match native {
            Ok(text) => {
                let chars = candidate_chars(&text);
                if chars >= self.config.native_text_threshold {
                    info!(chars, "native text layer accepted");
                    attempts.push(StageAttempt::accepted(Stage::Native, chars));
                    stats.total_ms = started.elapsed().as_millis() as u64;
                    return Ok(ExtractionOutput {
                        payload: ExtractedPayload::Text {
                            text: normalize(&text),
                            language_hint: None,
                        },
                        state: PipelineState::Succeeded,
                        attempts,
                        stats,
                        request_id,
                    });
                }
                debug!(
                    chars,
                    gate = self.config.native_text_threshold,
                    "native text layer too short, falling through to OCR"
                );
                attempts.push(StageAttempt::rejected(Stage::Native, chars));
            }
            Err(e) => {
                debug!("native text extraction failed: {e}");
                attempts.push(StageAttempt::failed(Stage::Native, e));
            }
        }

        // Stage 2: rasterise the first page. Failure here is fatal — with
        // no page image there is nothing left to OCR.
        let raster_started = Instant::now();
        let png = raster::rasterize_first_page(&doc.bytes, &self.config, scratch).await?;
        stats.raster_ms = raster_started.elapsed().as_millis() as u64;
        state = PipelineState::Rasterized;
        debug!(
            ?state,
            png_bytes = png.len(),
            "first page rasterised and enhanced"
        );

        // Stage 3: the OCR engine chain, strictly in priority order.
        let ocr_started = Instant::now();
        let outcome =
            ocr::run_chain(&self.engines, &png, &self.config, scratch, &mut attempts).await;
        stats.ocr_ms = ocr_started.elapsed().as_millis() as u64;

        let outcome = match outcome {
            Ok(o) => o,
            Err(e) => {
                stats.total_ms = started.elapsed().as_millis() as u64;
                debug!(?state, "OCR chain exhausted");
                return Err(e);
            }
        };

        state = match outcome.stage {
            Stage::CloudOcr => PipelineState::CloudOcrTried,
            _ => PipelineState::LocalOcrTried,
        };
        debug!(?state, winner = outcome.stage.as_str(), "OCR chain resolved");

        stats.total_ms = started.elapsed().as_millis() as u64;
        Ok(ExtractionOutput {
            payload: ExtractedPayload::Text {
                text: normalize(&outcome.text),
                language_hint: outcome.language,
            },
            state: PipelineState::Succeeded,
            attempts,
            stats,
            request_id,
        })
    }

    /// Synchronous wrapper around [`Extractor::extract`].
    ///
    /// Creates a temporary tokio runtime internally.
    pub fn extract_sync(
        &self,
        doc: &UploadedDocument,
    ) -> Result<ExtractionOutput, ExtractError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {e}")))?
            .block_on(self.extract(doc))
    }
}
