//! # labeltext
//!
//! Turn an uploaded beverage-label document (PDF or photo) into
//! machine-readable text for downstream compliance analysis.
//!
//! ## Why this crate?
//!
//! Producers upload labels in whatever form they have at hand: a
//! print-ready PDF with a real text layer, a flattened scan wrapped in a
//! PDF, or a phone photo of the bottle. A text analyser needs one thing —
//! clean text — so this crate runs the cheapest strategy that works and
//! escalates only when it has to, never asking the caller to know which
//! kind of upload they hold.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Upload (PDF or image)
//!  │
//!  ├─ 1. Classify   magic bytes reconciled with the declared MIME type
//!  ├─ 2. Native     PDF text layer via pdf-extract (accept at ≥ 50 chars)
//!  ├─ 3. Rasterise  first page via pdftoppm at 300 DPI, enhance for OCR
//!  ├─ 4. OCR chain  remote Vision service, then local tesseract (> 30 chars)
//!  ├─ 5. Normalise  whitespace, unit and percentage token repair
//!  └─ 6. Output     text + attempt trail + timings (images pass through as-is)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use labeltext::{Extractor, ExtractionConfig, UploadedDocument};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Remote OCR auto-configured from GOOGLE_VISION_API_KEY when present;
//!     // without it the chain falls straight through to local tesseract.
//!     let extractor = Extractor::new(ExtractionConfig::default())?;
//!     let upload = UploadedDocument::new(
//!         std::fs::read("label.pdf")?,
//!         "application/pdf",
//!         "label.pdf",
//!     );
//!     let output = extractor.extract(&upload).await?;
//!     println!("{}", output.payload.text().unwrap_or(""));
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `labeltext` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! labeltext = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod scratch;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use document::{classify, DocumentKind, UploadedDocument};
pub use error::{ExtractError, StageError};
pub use extract::Extractor;
pub use normalize::normalize;
pub use output::{
    ExtractedPayload, ExtractionOutput, ExtractionStats, PipelineState, Stage, StageAttempt,
};
pub use pipeline::ocr::{ChainOutcome, OcrEngine, Recognized};
pub use scratch::Scratch;
