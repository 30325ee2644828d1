//! Local OCR engine: the `tesseract` command-line binary.
//!
//! The local engine is the resilience fallback for offline or
//! quota-exhausted conditions: CPU-bound, no network dependency, runs the
//! system tesseract over a scratch-file copy of the page image. It accepts
//! several language hints simultaneously via tesseract's `+`-joined
//! language argument (`-l ita+eng+fra`).
//!
//! The child process is spawned with `kill_on_drop`, so a cancelled
//! extraction terminates any in-flight recognition.

use crate::config::ExtractionConfig;
use crate::error::StageError;
use crate::output::Stage;
use crate::pipeline::ocr::{OcrEngine, Recognized};
use crate::scratch::Scratch;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// ISO-639-1 hint → tesseract traineddata code. Hints outside this table
/// are dropped for the local engine (its code set is fixed).
const LANG_CODES: &[(&str, &str)] = &[
    ("it", "ita"),
    ("en", "eng"),
    ("fr", "fra"),
    ("de", "deu"),
    ("es", "spa"),
    ("pt", "por"),
];

pub struct TesseractOcr {
    binary: PathBuf,
}

impl TesseractOcr {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            binary: config.tesseract_binary.clone(),
        }
    }

    /// Map ISO-639-1 hints to a tesseract `-l` argument, e.g. `ita+eng+fra`.
    /// Falls back to `eng` when no hint is mappable.
    fn language_arg(hints: &[String]) -> String {
        let codes: Vec<&str> = hints
            .iter()
            .filter_map(|h| {
                let h = h.to_ascii_lowercase();
                LANG_CODES
                    .iter()
                    .find(|(iso, _)| *iso == h)
                    .map(|(_, code)| *code)
            })
            .collect();
        if codes.is_empty() {
            "eng".to_string()
        } else {
            codes.join("+")
        }
    }
}

fn binary_available(binary: &Path) -> bool {
    if binary.components().count() > 1 {
        return binary.is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(binary).is_file()))
        .unwrap_or(false)
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn stage(&self) -> Stage {
        Stage::LocalOcr
    }

    fn is_configured(&self) -> bool {
        binary_available(&self.binary)
    }

    async fn recognize(
        &self,
        png: &[u8],
        language_hints: &[String],
        scratch: &Scratch,
    ) -> Result<Recognized, StageError> {
        let image_path = scratch.path_for("ocr-input", "png");
        tokio::fs::write(&image_path, png)
            .await
            .map_err(|e| StageError::EngineFailed {
                engine: self.name().into(),
                detail: format!("failed to stage image: {e}"),
            })?;

        let lang = Self::language_arg(language_hints);
        debug!(%lang, "running tesseract");

        let output = Command::new(&self.binary)
            .arg(&image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&lang)
            .arg("--psm")
            .arg("6")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StageError::EngineUnavailable {
                        engine: self.name().into(),
                        detail: format!("{} not installed", self.binary.display()),
                    }
                } else {
                    StageError::EngineFailed {
                        engine: self.name().into(),
                        detail: e.to_string(),
                    }
                }
            })?;

        if !output.status.success() {
            return Err(StageError::EngineFailed {
                engine: self.name().into(),
                detail: format!(
                    "tesseract exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        // Strip the form feed tesseract appends per page.
        let text = String::from_utf8_lossy(&output.stdout).replace('\x0c', "");
        Ok(Recognized {
            text,
            language: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_arg_maps_and_joins() {
        let hints = vec!["it".to_string(), "en".to_string(), "fr".to_string()];
        assert_eq!(TesseractOcr::language_arg(&hints), "ita+eng+fra");
    }

    #[test]
    fn unknown_hints_are_dropped() {
        let hints = vec!["it".to_string(), "xx".to_string()];
        assert_eq!(TesseractOcr::language_arg(&hints), "ita");
    }

    #[test]
    fn no_mappable_hint_falls_back_to_eng() {
        let hints = vec!["xx".to_string()];
        assert_eq!(TesseractOcr::language_arg(&hints), "eng");
        assert_eq!(TesseractOcr::language_arg(&[]), "eng");
    }

    #[test]
    fn absolute_missing_binary_is_unconfigured() {
        let c = ExtractionConfig::builder()
            .tesseract_binary("/nonexistent/labeltext-tesseract")
            .build()
            .unwrap();
        let engine = TesseractOcr::new(&c);
        assert!(!engine.is_configured());
    }
}
