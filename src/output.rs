//! Result types produced by the extraction pipeline.
//!
//! One [`ExtractionOutput`] is produced per uploaded document — never zero,
//! never two. Alongside the payload it carries the attempt trail and timing
//! stats so the surrounding service can log why a given stage won instead
//! of re-running the pipeline to find out what it did.

use crate::error::StageError;
use serde::{Deserialize, Serialize};

/// The discriminated payload of a successful extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractedPayload {
    /// Machine-readable text, normalised, never empty.
    Text {
        text: String,
        /// BCP-47 hint reported by the winning OCR engine, when it has one.
        #[serde(skip_serializing_if = "Option::is_none")]
        language_hint: Option<String>,
    },
    /// A non-PDF image forwarded as-is for downstream vision analysis.
    /// `bytes` are byte-identical to the upload.
    Image { bytes: Vec<u8>, mime_type: String },
}

impl ExtractedPayload {
    /// The extracted text, if this payload carries one.
    pub fn text(&self) -> Option<&str> {
        match self {
            ExtractedPayload::Text { text, .. } => Some(text),
            ExtractedPayload::Image { .. } => None,
        }
    }
}

/// States of the extraction state machine.
///
/// `Received` is the initial state; `Succeeded` and `Failed` are terminal.
/// The orchestrator walks these strictly forward; the final state is
/// recorded on the output for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Received,
    NativeTried,
    Rasterized,
    CloudOcrTried,
    LocalOcrTried,
    Succeeded,
    Failed,
}

/// One discrete extraction strategy, used to tag attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Native PDF text layer.
    Native,
    /// First-page rasterisation.
    Rasterize,
    /// Remote OCR service.
    CloudOcr,
    /// Local OCR engine.
    LocalOcr,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Native => "native",
            Stage::Rasterize => "rasterize",
            Stage::CloudOcr => "cloud-ocr",
            Stage::LocalOcr => "local-ocr",
        }
    }
}

/// Transient record of one stage attempt within a run.
///
/// Created per stage, returned in the output trail, never persisted by the
/// library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageAttempt {
    pub stage: Stage,
    /// Trimmed character count of the candidate text (0 when the stage
    /// produced none).
    pub chars: usize,
    /// Whether the candidate cleared the stage's quality gate.
    pub accepted: bool,
    /// The stage error for rejected attempts that failed outright.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StageError>,
}

impl StageAttempt {
    pub fn accepted(stage: Stage, chars: usize) -> Self {
        Self {
            stage,
            chars,
            accepted: true,
            error: None,
        }
    }

    pub fn rejected(stage: Stage, chars: usize) -> Self {
        Self {
            stage,
            chars,
            accepted: false,
            error: None,
        }
    }

    pub fn failed(stage: Stage, error: StageError) -> Self {
        Self {
            stage,
            chars: 0,
            accepted: false,
            error: Some(error),
        }
    }
}

/// Wall-clock timing breakdown for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub total_ms: u64,
    pub native_ms: u64,
    pub raster_ms: u64,
    pub ocr_ms: u64,
}

/// The pipeline's single output per uploaded document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub payload: ExtractedPayload,
    /// Final state of the run; always `Succeeded` on the `Ok` path.
    pub state: PipelineState,
    /// Every stage attempt made during the run, in execution order.
    pub attempts: Vec<StageAttempt>,
    pub stats: ExtractionStats,
    /// The per-request scratch token, for correlating logs.
    pub request_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_text_accessor() {
        let p = ExtractedPayload::Text {
            text: "VINO ROSSO".into(),
            language_hint: Some("it".into()),
        };
        assert_eq!(p.text(), Some("VINO ROSSO"));

        let img = ExtractedPayload::Image {
            bytes: vec![1, 2, 3],
            mime_type: "image/jpeg".into(),
        };
        assert_eq!(img.text(), None);
    }

    #[test]
    fn payload_serialises_with_kind_tag() {
        let p = ExtractedPayload::Text {
            text: "abc".into(),
            language_hint: None,
        };
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains(r#""kind":"text""#), "got: {json}");
        assert!(!json.contains("language_hint"), "got: {json}");
    }

    #[test]
    fn attempt_constructors() {
        let a = StageAttempt::accepted(Stage::Native, 80);
        assert!(a.accepted);
        assert_eq!(a.chars, 80);

        let r = StageAttempt::rejected(Stage::CloudOcr, 12);
        assert!(!r.accepted);
        assert!(r.error.is_none());

        let f = StageAttempt::failed(
            Stage::LocalOcr,
            crate::error::StageError::EngineUnavailable {
                engine: "tesseract".into(),
                detail: "not installed".into(),
            },
        );
        assert!(!f.accepted);
        assert!(f.error.is_some());
    }
}
