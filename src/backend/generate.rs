//! Synchronous image generation backends
//!
//! Each backend is a single request/response call: build the model-specific
//! request body, invoke once, extract the first image artifact from the
//! response. Callers do not retry.

use serde_json::{json, Value};
use tracing::debug;

use crate::backend::invoke::ModelInvoker;
use crate::backend::model::ModelKind;
use crate::error::{AppError, Result};
use crate::response;

/// Dispatcher over the closed set of synchronous backends
#[derive(Clone)]
pub struct ImageGenerator {
    invoker: ModelInvoker,
}

impl ImageGenerator {
    pub fn new(invoker: ModelInvoker) -> Self {
        Self { invoker }
    }

    /// Generate one image and return its decoded bytes.
    ///
    /// Transport failures and malformed responses surface as
    /// `GenerationFailed` carrying the backend identifier and cause.
    pub async fn generate(
        &self,
        model: ModelKind,
        prompt: &str,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>> {
        let body = request_body(model, prompt, width, height);
        debug!(model = %model, width, height, "Dispatching generation request");

        let payload = self
            .invoker
            .invoke(model.model_id(), &body)
            .await
            .map_err(|e| AppError::GenerationFailed {
                backend: model.as_str().to_string(),
                message: e.to_string(),
            })?;

        let artifact = extract_artifact(model, &payload).ok_or_else(|| AppError::GenerationFailed {
            backend: model.as_str().to_string(),
            message: "response contained no image artifact".to_string(),
        })?;

        response::decode(artifact).map_err(|e| AppError::GenerationFailed {
            backend: model.as_str().to_string(),
            message: format!("image artifact is not valid base64: {}", e),
        })
    }
}

/// Build the model-specific request body
fn request_body(model: ModelKind, prompt: &str, width: u32, height: u32) -> Value {
    match model {
        ModelKind::TitanG1 | ModelKind::TitanG2 => json!({
            "taskType": "TEXT_IMAGE",
            "textToImageParams": { "text": prompt },
            "imageGenerationConfig": {
                "numberOfImages": 1,
                "width": width,
                "height": height,
                "cfgScale": 8.0,
                "seed": 0,
            },
        }),
        ModelKind::NovaCanvas => json!({
            "taskType": "TEXT_IMAGE",
            "textToImageParams": { "text": prompt },
            "imageGenerationConfig": {
                "numberOfImages": 1,
                "width": width,
                "height": height,
                "cfgScale": 8.0,
            },
        }),
        ModelKind::Sdxl => json!({
            "text_prompts": [{ "text": prompt, "weight": 1.0 }],
            "cfg_scale": 10,
            "seed": 0,
            "steps": 30,
            "width": width,
            "height": height,
        }),
    }
}

/// Pull the first base64 image artifact out of a backend response
fn extract_artifact(model: ModelKind, payload: &Value) -> Option<&str> {
    match model {
        ModelKind::TitanG1 | ModelKind::TitanG2 | ModelKind::NovaCanvas => {
            payload.get("images")?.get(0)?.as_str()
        }
        ModelKind::Sdxl => payload.get("artifacts")?.get(0)?.get("base64")?.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titan_body_shape() {
        let body = request_body(ModelKind::TitanG1, "a red fox", 1024, 768);
        assert_eq!(body["taskType"], "TEXT_IMAGE");
        assert_eq!(body["textToImageParams"]["text"], "a red fox");
        assert_eq!(body["imageGenerationConfig"]["width"], 1024);
        assert_eq!(body["imageGenerationConfig"]["height"], 768);
        assert_eq!(body["imageGenerationConfig"]["seed"], 0);
    }

    #[test]
    fn test_nova_body_has_no_seed() {
        let body = request_body(ModelKind::NovaCanvas, "a red fox", 512, 512);
        assert!(body["imageGenerationConfig"].get("seed").is_none());
    }

    #[test]
    fn test_sdxl_body_shape() {
        let body = request_body(ModelKind::Sdxl, "a red fox", 512, 512);
        assert_eq!(body["text_prompts"][0]["text"], "a red fox");
        assert_eq!(body["cfg_scale"], 10);
        assert_eq!(body["steps"], 30);
    }

    #[test]
    fn test_extract_titan_artifact() {
        let payload = json!({ "images": ["aGVsbG8="] });
        assert_eq!(extract_artifact(ModelKind::TitanG2, &payload), Some("aGVsbG8="));
    }

    #[test]
    fn test_extract_sdxl_artifact() {
        let payload = json!({ "artifacts": [{ "base64": "aGVsbG8=", "finishReason": "SUCCESS" }] });
        assert_eq!(extract_artifact(ModelKind::Sdxl, &payload), Some("aGVsbG8="));
    }

    #[test]
    fn test_extract_missing_artifact() {
        let payload = json!({ "images": [] });
        assert_eq!(extract_artifact(ModelKind::TitanG1, &payload), None);
    }
}
