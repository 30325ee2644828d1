//! OCR engine chain: an ordered list of recognition backends behind one
//! uniform interface.
//!
//! ## Chain semantics
//!
//! Engines are tried strictly in priority order (remote service first,
//! local engine as resilience fallback). A lower-priority engine runs only
//! when the higher-priority one is unconfigured, errors, times out, or
//! returns text at or below the quality gate. Engine failure is never
//! pipeline-fatal on its own — only exhausting the whole chain is.
//!
//! Engines are stateless per request and hold no retry logic: one call per
//! engine per extraction. Transport-level retries, if any, belong inside
//! an engine's client, not here.

use crate::config::ExtractionConfig;
use crate::error::{ExtractError, StageError};
use crate::output::{Stage, StageAttempt};
use crate::scratch::Scratch;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Text recognised by one engine.
#[derive(Debug, Clone)]
pub struct Recognized {
    pub text: String,
    /// BCP-47 language reported by the engine, when it detects one.
    pub language: Option<String>,
}

/// A single OCR backend.
///
/// Implementations must be `Send + Sync`: one engine instance is shared
/// across concurrent pipeline runs (long-lived client handles, no
/// per-request state).
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Stable engine name for logs and attempt trails.
    fn name(&self) -> &'static str;

    /// The pipeline stage this engine represents.
    fn stage(&self) -> Stage;

    /// Whether the engine can run at all (credentials present, binary
    /// installed). Unconfigured engines are skipped, never retried.
    fn is_configured(&self) -> bool;

    /// Recognise text in an encoded page image.
    async fn recognize(
        &self,
        png: &[u8],
        language_hints: &[String],
        scratch: &Scratch,
    ) -> Result<Recognized, StageError>;
}

/// The winning candidate of a chain run.
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub text: String,
    pub language: Option<String>,
    pub stage: Stage,
}

/// Trimmed character count used by every quality gate.
pub(crate) fn candidate_chars(text: &str) -> usize {
    text.trim().chars().count()
}

/// Drive the engine chain over an enhanced page image.
///
/// Appends one [`StageAttempt`] per engine consulted. Returns the first
/// candidate whose trimmed length strictly exceeds the OCR gate, or
/// [`ExtractError::OcrInsufficient`] when the chain is exhausted.
pub async fn run_chain(
    engines: &[Arc<dyn OcrEngine>],
    png: &[u8],
    config: &ExtractionConfig,
    scratch: &Scratch,
    attempts: &mut Vec<StageAttempt>,
) -> Result<ChainOutcome, ExtractError> {
    let gate = config.ocr_text_threshold;
    let mut best_chars = 0usize;

    for engine in engines {
        if !engine.is_configured() {
            info!(engine = engine.name(), "OCR engine unconfigured, skipping");
            attempts.push(StageAttempt::failed(
                engine.stage(),
                StageError::EngineUnavailable {
                    engine: engine.name().into(),
                    detail: "not configured".into(),
                },
            ));
            continue;
        }

        debug!(engine = engine.name(), "trying OCR engine");
        let call = engine.recognize(png, &config.language_hints, scratch);
        let result = tokio::time::timeout(Duration::from_secs(config.ocr_timeout_secs), call)
            .await
            .unwrap_or_else(|_elapsed| {
                Err(StageError::EngineTimeout {
                    engine: engine.name().into(),
                    secs: config.ocr_timeout_secs,
                })
            });

        match result {
            Ok(recognized) => {
                let chars = candidate_chars(&recognized.text);
                if chars > gate {
                    info!(
                        engine = engine.name(),
                        chars, "OCR candidate accepted"
                    );
                    attempts.push(StageAttempt::accepted(engine.stage(), chars));
                    return Ok(ChainOutcome {
                        text: recognized.text,
                        language: recognized.language,
                        stage: engine.stage(),
                    });
                }
                debug!(
                    engine = engine.name(),
                    chars, gate, "OCR candidate below quality gate"
                );
                best_chars = best_chars.max(chars);
                attempts.push(StageAttempt::rejected(engine.stage(), chars));
            }
            Err(e) => {
                warn!(engine = engine.name(), "OCR engine failed: {e}");
                attempts.push(StageAttempt::failed(engine.stage(), e));
            }
        }
    }

    Err(ExtractError::OcrInsufficient {
        best_chars,
        threshold: gate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Engine returning a fixed response, counting invocations.
    struct FixedEngine {
        name: &'static str,
        stage: Stage,
        configured: bool,
        response: Result<&'static str, ()>,
        calls: AtomicUsize,
    }

    impl FixedEngine {
        fn ok(name: &'static str, stage: Stage, text: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                stage,
                configured: true,
                response: Ok(text),
                calls: AtomicUsize::new(0),
            })
        }

        fn unconfigured(name: &'static str, stage: Stage) -> Arc<Self> {
            Arc::new(Self {
                name,
                stage,
                configured: false,
                response: Err(()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(name: &'static str, stage: Stage) -> Arc<Self> {
            Arc::new(Self {
                name,
                stage,
                configured: true,
                response: Err(()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OcrEngine for FixedEngine {
        fn name(&self) -> &'static str {
            self.name
        }

        fn stage(&self) -> Stage {
            self.stage
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn recognize(
            &self,
            _png: &[u8],
            _hints: &[String],
            _scratch: &Scratch,
        ) -> Result<Recognized, StageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.response {
                Ok(text) => Ok(Recognized {
                    text: text.to_string(),
                    language: None,
                }),
                Err(()) => Err(StageError::EngineFailed {
                    engine: self.name.into(),
                    detail: "synthetic failure".into(),
                }),
            }
        }
    }

    fn config() -> ExtractionConfig {
        ExtractionConfig::default()
    }

    const LONG: &str = "DENOMINAZIONE DI ORIGINE PROTETTA 750 ml 12,5% vol";
    const SHORT: &str = "L1234";

    #[tokio::test]
    async fn first_engine_win_skips_the_rest() {
        let remote = FixedEngine::ok("remote", Stage::CloudOcr, LONG);
        let local = FixedEngine::ok("local", Stage::LocalOcr, LONG);
        let engines: Vec<Arc<dyn OcrEngine>> = vec![remote.clone(), local.clone()];
        let scratch = Scratch::new().unwrap();
        let mut attempts = Vec::new();

        let out = run_chain(&engines, b"png", &config(), &scratch, &mut attempts)
            .await
            .unwrap();

        assert_eq!(out.stage, Stage::CloudOcr);
        assert_eq!(remote.calls(), 1);
        assert_eq!(local.calls(), 0, "local engine must not run after a win");
        assert_eq!(attempts.len(), 1);
        assert!(attempts[0].accepted);
    }

    #[tokio::test]
    async fn unconfigured_engine_falls_through_without_invocation() {
        let remote = FixedEngine::unconfigured("remote", Stage::CloudOcr);
        let local = FixedEngine::ok("local", Stage::LocalOcr, LONG);
        let engines: Vec<Arc<dyn OcrEngine>> = vec![remote.clone(), local.clone()];
        let scratch = Scratch::new().unwrap();
        let mut attempts = Vec::new();

        let out = run_chain(&engines, b"png", &config(), &scratch, &mut attempts)
            .await
            .unwrap();

        assert_eq!(out.stage, Stage::LocalOcr);
        assert_eq!(remote.calls(), 0);
        assert!(matches!(
            attempts[0].error,
            Some(StageError::EngineUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn short_candidates_exhaust_the_chain() {
        let remote = FixedEngine::unconfigured("remote", Stage::CloudOcr);
        let local = FixedEngine::ok("local", Stage::LocalOcr, SHORT);
        let engines: Vec<Arc<dyn OcrEngine>> = vec![remote, local];
        let scratch = Scratch::new().unwrap();
        let mut attempts = Vec::new();

        let err = run_chain(&engines, b"png", &config(), &scratch, &mut attempts)
            .await
            .unwrap_err();

        match err {
            ExtractError::OcrInsufficient {
                best_chars,
                threshold,
            } => {
                assert_eq!(best_chars, SHORT.chars().count());
                assert_eq!(threshold, 30);
            }
            other => panic!("expected OcrInsufficient, got {other:?}"),
        }
        assert_eq!(attempts.len(), 2);
    }

    #[tokio::test]
    async fn engine_error_is_absorbed_and_next_engine_runs() {
        let remote = FixedEngine::failing("remote", Stage::CloudOcr);
        let local = FixedEngine::ok("local", Stage::LocalOcr, LONG);
        let engines: Vec<Arc<dyn OcrEngine>> = vec![remote.clone(), local.clone()];
        let scratch = Scratch::new().unwrap();
        let mut attempts = Vec::new();

        let out = run_chain(&engines, b"png", &config(), &scratch, &mut attempts)
            .await
            .unwrap();

        assert_eq!(out.stage, Stage::LocalOcr);
        assert_eq!(remote.calls(), 1);
        assert_eq!(local.calls(), 1);
    }

    #[tokio::test]
    async fn gate_is_strictly_greater_than() {
        // Exactly 30 trimmed chars must be rejected.
        let exactly_30 = "123456789012345678901234567890";
        assert_eq!(candidate_chars(exactly_30), 30);
        let remote = FixedEngine::ok("remote", Stage::CloudOcr, exactly_30);
        let engines: Vec<Arc<dyn OcrEngine>> = vec![remote];
        let scratch = Scratch::new().unwrap();
        let mut attempts = Vec::new();

        let err = run_chain(&engines, b"png", &config(), &scratch, &mut attempts)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::OcrInsufficient { .. }));
    }
}
