//! Remote OCR engine: Google Cloud Vision `images:annotate` REST API.
//!
//! The remote service is the higher-quality engine and is always first in
//! the chain. It is network-dependent and may be entirely unconfigured
//! (no API key in config or environment) — in that case the engine reports
//! itself unconfigured and the chain skips it without a network round-trip
//! and without retrying.
//!
//! The HTTP client is built once and shared across requests; it is cheap
//! to clone and safe for concurrent use.

use crate::config::ExtractionConfig;
use crate::error::{ExtractError, StageError};
use crate::output::Stage;
use crate::pipeline::ocr::{OcrEngine, Recognized};
use crate::scratch::Scratch;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Environment variable consulted when the config carries no API key.
pub const VISION_API_KEY_ENV: &str = "GOOGLE_VISION_API_KEY";

pub struct CloudVisionOcr {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
    timeout_secs: u64,
}

impl CloudVisionOcr {
    /// Build the engine from config, falling back to `GOOGLE_VISION_API_KEY`
    /// for the key. An absent key is not an error: the engine simply
    /// reports itself unconfigured.
    pub fn new(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let api_key = config
            .vision_api_key
            .clone()
            .or_else(|| std::env::var(VISION_API_KEY_ENV).ok())
            .filter(|k| !k.is_empty());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.ocr_timeout_secs))
            .build()
            .map_err(|e| ExtractError::Internal(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            client,
            api_key,
            endpoint: config.vision_endpoint.trim_end_matches('/').to_string(),
            timeout_secs: config.ocr_timeout_secs,
        })
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateRequest<'a> {
    requests: Vec<ImageRequest<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageRequest<'a> {
    image: ImageContent,
    features: Vec<Feature>,
    image_context: ImageContext<'a>,
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Feature {
    r#type: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageContext<'a> {
    language_hints: &'a [String],
}

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    full_text_annotation: Option<FullTextAnnotation>,
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct FullTextAnnotation {
    text: String,
}

#[derive(Deserialize)]
struct TextAnnotation {
    locale: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: Option<String>,
}

// ── Engine impl ──────────────────────────────────────────────────────────

#[async_trait]
impl OcrEngine for CloudVisionOcr {
    fn name(&self) -> &'static str {
        "cloud-vision"
    }

    fn stage(&self) -> Stage {
        Stage::CloudOcr
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn recognize(
        &self,
        png: &[u8],
        language_hints: &[String],
        _scratch: &Scratch,
    ) -> Result<Recognized, StageError> {
        let key = self.api_key.as_deref().ok_or_else(|| {
            StageError::EngineUnavailable {
                engine: self.name().into(),
                detail: "no API key".into(),
            }
        })?;

        let body = AnnotateRequest {
            requests: vec![ImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(png),
                },
                features: vec![Feature {
                    r#type: "TEXT_DETECTION",
                }],
                image_context: ImageContext { language_hints },
            }],
        };

        let url = format!("{}/v1/images:annotate?key={key}", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(self.name(), self.timeout_secs, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StageError::EngineFailed {
                engine: self.name().into(),
                detail: format!("HTTP {status}"),
            });
        }

        let annotate: AnnotateResponse =
            response
                .json()
                .await
                .map_err(|e| StageError::EngineFailed {
                    engine: self.name().into(),
                    detail: format!("malformed response: {e}"),
                })?;

        let page = annotate.responses.into_iter().next().unwrap_or_default();
        if let Some(err) = page.error {
            return Err(StageError::EngineFailed {
                engine: self.name().into(),
                detail: err.message.unwrap_or_else(|| "unspecified API error".into()),
            });
        }

        let language = page
            .text_annotations
            .first()
            .and_then(|a| a.locale.clone());
        let text = page
            .full_text_annotation
            .map(|f| f.text)
            .or_else(|| {
                page.text_annotations
                    .into_iter()
                    .next()
                    .and_then(|a| a.description)
            })
            .unwrap_or_default();

        debug!(
            chars = text.trim().chars().count(),
            language = language.as_deref().unwrap_or("unknown"),
            "vision annotate returned"
        );

        // An empty transcription is an Ok: the chain's quality gate, not
        // the engine, decides whether it is usable.
        Ok(Recognized { text, language })
    }
}

fn map_transport_error(engine: &str, timeout_secs: u64, e: reqwest::Error) -> StageError {
    if e.is_timeout() {
        StageError::EngineTimeout {
            engine: engine.into(),
            secs: timeout_secs,
        }
    } else {
        StageError::EngineFailed {
            engine: engine.into(),
            detail: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_means_unconfigured() {
        // An explicitly empty key never falls back to the environment.
        let mut c = ExtractionConfig::default();
        c.vision_api_key = Some(String::new());
        let engine = CloudVisionOcr::new(&c).unwrap();
        assert!(!engine.is_configured());
    }

    #[test]
    fn explicit_key_means_configured() {
        let c = ExtractionConfig::builder()
            .vision_api_key("test-key")
            .build()
            .unwrap();
        let engine = CloudVisionOcr::new(&c).unwrap();
        assert!(engine.is_configured());
    }

    #[test]
    fn request_body_shape_matches_the_api() {
        let hints = vec!["it".to_string(), "en".to_string()];
        let body = AnnotateRequest {
            requests: vec![ImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(b"png"),
                },
                features: vec![Feature {
                    r#type: "TEXT_DETECTION",
                }],
                image_context: ImageContext {
                    language_hints: &hints,
                },
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["requests"][0]["features"][0]["type"], "TEXT_DETECTION");
        assert_eq!(json["requests"][0]["imageContext"]["languageHints"][0], "it");
    }

    #[test]
    fn response_parsing_prefers_full_text_annotation() {
        let raw = serde_json::json!({
            "responses": [{
                "fullTextAnnotation": { "text": "VINO ROSSO\n750 ml" },
                "textAnnotations": [{ "locale": "it", "description": "VINO" }]
            }]
        });
        let parsed: AnnotateResponse = serde_json::from_value(raw).unwrap();
        let page = parsed.responses.into_iter().next().unwrap();
        assert_eq!(page.full_text_annotation.unwrap().text, "VINO ROSSO\n750 ml");
        assert_eq!(page.text_annotations[0].locale.as_deref(), Some("it"));
    }
}
