//! Native text extraction: read the text layer already embedded in a PDF.
//!
//! ## Why catch_unwind?
//!
//! `pdf-extract` panics on some malformed files rather than returning an
//! error. The contract here is stricter: malformed input must yield a
//! [`StageError`] the orchestrator treats as "insufficient", never abort
//! the pipeline. Parsing is CPU-bound and runs under `spawn_blocking`, and
//! the panic boundary lives inside that closure.

use crate::error::StageError;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::debug;

/// Extract the embedded text layer from PDF bytes.
///
/// Returns the raw text layer (whole document, all pages). An empty or
/// whitespace-only layer is an `Ok` — the orchestrator's quality gate, not
/// this stage, decides whether it is usable.
pub async fn extract_text(pdf: &[u8]) -> Result<String, StageError> {
    let bytes = pdf.to_vec();

    let result = tokio::task::spawn_blocking(move || {
        catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(&bytes)))
    })
    .await
    .map_err(|e| StageError::NativeFailed {
        detail: format!("task join error: {e}"),
    })?;

    match result {
        Ok(Ok(text)) => {
            debug!(chars = text.trim().chars().count(), "native text layer read");
            Ok(text)
        }
        Ok(Err(e)) => Err(StageError::NativeFailed {
            detail: e.to_string(),
        }),
        Err(panic) => {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "parser panicked".to_string());
            Err(StageError::NativeFailed { detail })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn malformed_pdf_is_a_stage_error_not_a_panic() {
        let garbage = b"%PDF-1.4 this is not actually a pdf body";
        let result = extract_text(garbage).await;
        assert!(matches!(result, Err(StageError::NativeFailed { .. })));
    }

    #[tokio::test]
    async fn empty_buffer_is_a_stage_error() {
        assert!(extract_text(b"").await.is_err());
    }
}
