//! Pipeline stages for label-document text extraction.
//!
//! Each submodule implements exactly one extraction strategy with its own
//! success/failure contract. Keeping stages separate makes each
//! independently testable and lets us swap an implementation (e.g. a
//! different rasteriser or OCR backend) without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! pdf bytes ──▶ native ──▶ raster ──▶ enhance ──▶ ocr (vision, tesseract)
//!              (text layer) (pdftoppm) (filters)   (chain, first win)
//! ```
//!
//! 1. [`native`]    — read text already embedded in the PDF; the cheap
//!    common path for text-based PDFs
//! 2. [`raster`]    — render page one to a PNG via an external process,
//!    bounded by a timeout
//! 3. [`enhance`]   — deterministic contrast/denoise filters to raise OCR
//!    accuracy on printed labels
//! 4. [`ocr`]       — ordered engine chain; [`vision`] (remote, higher
//!    quality) is tried before [`tesseract`] (local, resilience fallback)
//!
//! The orchestrator in [`crate::extract`] sequences these behind quality
//! gates; no stage is aware of the others.

pub mod enhance;
pub mod native;
pub mod ocr;
pub mod raster;
pub mod tesseract;
pub mod vision;
