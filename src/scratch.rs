//! Per-request scratch space for on-disk pipeline artifacts.
//!
//! ## Why a directory per request?
//!
//! The rasteriser and the local OCR engine both talk to external processes
//! that only understand file paths. Giving every pipeline run its own
//! `TempDir` means concurrent requests can never collide on filenames, and
//! gives us a single deletion point covering every artifact the run created.
//!
//! Cleanup is guaranteed on all exit paths: [`Scratch::close`] deletes
//! eagerly on the normal return path, and `TempDir`'s `Drop` covers early
//! returns, panics, and a caller dropping the extraction future mid-run.
//! Deletion errors are logged and swallowed — a stuck temp file must never
//! change the outcome of the request.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::TempDir;
use tracing::{debug, warn};

static NEXT_REQUEST: AtomicU64 = AtomicU64::new(1);

/// Scratch directory owned by one pipeline run.
pub struct Scratch {
    dir: TempDir,
    request_id: String,
}

impl Scratch {
    /// Create a fresh scratch directory with a process-unique request token.
    pub fn new() -> std::io::Result<Self> {
        let seq = NEXT_REQUEST.fetch_add(1, Ordering::Relaxed);
        let request_id = format!("req-{:06}-{:x}", seq, std::process::id());
        let dir = tempfile::Builder::new()
            .prefix(&format!("labeltext-{request_id}-"))
            .tempdir()?;
        debug!(request_id, path = %dir.path().display(), "scratch created");
        Ok(Self { dir, request_id })
    }

    /// The per-request unique token, used in artifact names and log spans.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Root of the scratch directory.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Path for an artifact owned by `stage`, e.g. `raster.png`.
    ///
    /// The file is not created; the stage writes it and this directory's
    /// teardown deletes it.
    pub fn path_for(&self, stage: &str, ext: &str) -> PathBuf {
        self.dir.path().join(format!("{stage}.{ext}"))
    }

    /// Delete the scratch directory eagerly.
    ///
    /// Failures are logged, never propagated: cleanup must not block or
    /// rewrite the request's result.
    pub fn close(self) {
        let request_id = self.request_id;
        if let Err(e) = self.dir.close() {
            warn!(request_id, "scratch cleanup failed: {e}");
        } else {
            debug!(request_id, "scratch removed");
        }
    }
}
