//! PDF rasterisation: render the first page to an enhanced PNG via an
//! external `pdftoppm` process.
//!
//! ## Why an external process?
//!
//! Rendering is the one stage that can hang on adversarial input. Running
//! it as a child process means it can be bounded by a wall-clock timeout
//! and killed cleanly — including when the caller drops the extraction
//! future mid-run (`kill_on_drop`). Timeout expiry is reported as a
//! rasterisation failure, never a crash.
//!
//! ## First page only
//!
//! Labels are single-page artwork; multi-page uploads are intentionally
//! reduced to page one (`-f 1 -l 1`). This is a documented scope limit of
//! the pipeline, not a bug.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::pipeline::enhance;
use crate::scratch::Scratch;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Render page one of `pdf` at the configured DPI and run the enhancement
/// sequence over it. All on-disk artifacts live in `scratch` and are
/// removed with it.
pub async fn rasterize_first_page(
    pdf: &[u8],
    config: &ExtractionConfig,
    scratch: &Scratch,
) -> Result<Vec<u8>, ExtractError> {
    let source = scratch.path_for("source", "pdf");
    tokio::fs::write(&source, pdf)
        .await
        .map_err(|e| ExtractError::RasterizationFailed {
            detail: format!("failed to stage source PDF: {e}"),
        })?;

    // pdftoppm writes <prefix>-<page>.png; the page-number padding depends
    // on the document's page count, so the output is located by scanning
    // the scratch dir rather than guessing the name.
    let prefix = scratch.dir().join("page");

    let child = Command::new(&config.pdftoppm_binary)
        .arg("-png")
        .arg("-r")
        .arg(config.dpi.to_string())
        .arg("-f")
        .arg("1")
        .arg("-l")
        .arg("1")
        .arg(&source)
        .arg(&prefix)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ExtractError::RasterizationFailed {
            detail: format!(
                "failed to launch {}: {e}",
                config.pdftoppm_binary.display()
            ),
        })?;

    let output = match tokio::time::timeout(
        Duration::from_secs(config.raster_timeout_secs),
        child.wait_with_output(),
    )
    .await
    {
        Err(_elapsed) => {
            // The child is killed when its handle is dropped by the
            // timed-out future.
            warn!(
                request_id = scratch.request_id(),
                "rasterisation timed out after {}s", config.raster_timeout_secs
            );
            return Err(ExtractError::RasterizationFailed {
                detail: format!("timed out after {}s", config.raster_timeout_secs),
            });
        }
        Ok(Err(e)) => {
            return Err(ExtractError::RasterizationFailed {
                detail: format!("process error: {e}"),
            });
        }
        Ok(Ok(output)) => output,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractError::RasterizationFailed {
            detail: format!(
                "pdftoppm exited with {}: {}",
                output.status,
                stderr.trim()
            ),
        });
    }

    let page_png = find_rendered_page(scratch)?;
    let raw = tokio::fs::read(&page_png)
        .await
        .map_err(|e| ExtractError::RasterizationFailed {
            detail: format!("failed to read rendered page: {e}"),
        })?;
    debug!(
        request_id = scratch.request_id(),
        bytes = raw.len(),
        dpi = config.dpi,
        "first page rendered"
    );

    // Enhancement belongs to this stage's contract: a page that rendered
    // but cannot be decoded and filtered is a rasterisation failure.
    tokio::task::spawn_blocking(move || enhance::enhance_for_ocr(&raw))
        .await
        .map_err(|e| ExtractError::Internal(format!("enhance task panicked: {e}")))?
        .map_err(|e| ExtractError::RasterizationFailed {
            detail: format!("enhancement failed: {e}"),
        })
}

/// Locate the single `page-*.png` pdftoppm produced.
fn find_rendered_page(scratch: &Scratch) -> Result<std::path::PathBuf, ExtractError> {
    let entries = std::fs::read_dir(scratch.dir()).map_err(|e| ExtractError::Internal(format!(
        "scratch dir unreadable: {e}"
    )))?;

    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("page-") && name.ends_with(".png") {
            return Ok(path);
        }
    }

    Err(ExtractError::RasterizationFailed {
        detail: "pdftoppm produced no page image".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_missing_binary() -> ExtractionConfig {
        ExtractionConfig::builder()
            .pdftoppm_binary("/nonexistent/labeltext-pdftoppm")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn missing_binary_is_rasterization_failure() {
        let scratch = Scratch::new().unwrap();
        let err = rasterize_first_page(b"%PDF-1.4", &config_with_missing_binary(), &scratch)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::RasterizationFailed { .. }));
    }

    #[tokio::test]
    async fn missing_binary_leaves_no_artifacts_after_close() {
        let scratch = Scratch::new().unwrap();
        let root = scratch.dir().to_path_buf();
        let _ = rasterize_first_page(b"%PDF-1.4", &config_with_missing_binary(), &scratch).await;
        // The staged source PDF exists until scratch teardown.
        assert!(root.join("source.pdf").exists());
        scratch.close();
        assert!(!root.exists());
    }

    #[test]
    fn find_rendered_page_reports_missing_output() {
        let scratch = Scratch::new().unwrap();
        assert!(matches!(
            find_rendered_page(&scratch),
            Err(ExtractError::RasterizationFailed { .. })
        ));
    }
}
