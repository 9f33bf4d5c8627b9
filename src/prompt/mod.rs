//! Prompt enhancement collaborator
//!
//! A pure text-to-text layer on top of the invoke endpoint. Enhancement
//! failures never fail a generation request; callers fall back to the
//! original prompt.

use serde_json::{json, Value};
use tracing::warn;

use crate::backend::invoke::ModelInvoker;
use crate::backend::model::ModelKind;
use crate::error::{AppError, Result};

/// Text models available for prompt work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextModel {
    Claude,
    Titan,
}

impl TextModel {
    /// Parse a client-supplied text model identifier; anything unknown falls
    /// back to the default model rather than failing the request.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value {
            Some("titan") => TextModel::Titan,
            _ => TextModel::Claude,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TextModel::Claude => "claude",
            TextModel::Titan => "titan",
        }
    }

    fn model_id(&self) -> &'static str {
        match self {
            TextModel::Claude => "anthropic.claude-3-sonnet-20240229-v1:0",
            TextModel::Titan => "amazon.titan-text-express-v1",
        }
    }
}

/// Client for prompt enhancement and edit-instruction optimization
#[derive(Clone)]
pub struct PromptClient {
    invoker: ModelInvoker,
}

impl PromptClient {
    pub fn new(invoker: ModelInvoker) -> Self {
        Self { invoker }
    }

    /// Enhance a user prompt, with a strategy matched to the target image
    /// model's prompt budget.
    pub async fn enhance(
        &self,
        prompt: &str,
        text_model: TextModel,
        image_model: ModelKind,
    ) -> Result<String> {
        let instruction = if image_model.prompt_limit() <= 512 {
            format!(
                "Take this prompt: \"{}\"\n\n\
                 Make it more professional by adding 2-3 key visual details such as \
                 lighting, style, or quality terms. Keep it concise and under 400 \
                 characters total.\n\nEnhanced prompt:",
                prompt
            )
        } else {
            format!(
                "You are an expert prompt engineer for photorealistic image generation.\n\n\
                 Take this basic prompt: \"{}\"\n\n\
                 Enhance it with professional photography terms, lighting descriptions, \
                 camera settings and angles, style descriptors, and composition details. \
                 Keep the original intent. Return only the enhanced prompt, no \
                 explanations.\n\nEnhanced prompt:",
                prompt
            )
        };

        let text = self.complete(text_model, &instruction, 500).await?;
        Ok(text.trim().to_string())
    }

    /// Rewrite an edit instruction into the precise phrasing the edit backend
    /// responds best to. Falls back to a static template when the text model
    /// is unavailable, so the edit request itself never fails here.
    pub async fn optimize_edit_instruction(&self, prompt: &str, text_model: TextModel) -> String {
        let instruction = format!(
            "You rewrite instructions for a reference-image editing model. The \
             image layout is: person on the left, product on the right.\n\n\
             Original instruction: \"{}\"\n\n\
             Rewrite it to be specific about what changes and what stays the \
             same: preserve the person's facial features, hairstyle, pose, \
             position and scale; keep lighting, background, camera angle and \
             framing unchanged unless the instruction says otherwise; reference \
             \"the person on the left\" and \"the product on the right\"; use \
             \"change\", \"replace\" or \"add\" rather than \"transform\". Keep \
             it under 400 characters.\n\nOptimized instruction:",
            prompt
        );

        match self.complete(text_model, &instruction, 300).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "Edit instruction optimization failed, using fallback template");
                format!(
                    "Change the person on the left to {}, while maintaining the same \
                     facial features, pose, and background",
                    prompt
                )
            }
        }
    }

    /// One text completion against the invoke endpoint
    async fn complete(&self, text_model: TextModel, instruction: &str, max_tokens: u32) -> Result<String> {
        let body = completion_body(text_model, instruction, max_tokens);
        let payload = self.invoker.invoke(text_model.model_id(), &body).await?;

        extract_completion(text_model, &payload)
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "text model '{}' returned no completion",
                    text_model.as_str()
                ))
            })
    }
}

fn completion_body(text_model: TextModel, instruction: &str, max_tokens: u32) -> Value {
    match text_model {
        TextModel::Claude => json!({
            "anthropic_version": "bedrock-2023-05-31",
            "max_tokens": max_tokens,
            "messages": [{ "role": "user", "content": instruction }],
            "temperature": 0.7,
            "top_p": 0.9,
        }),
        TextModel::Titan => json!({
            "inputText": instruction,
            "textGenerationConfig": {
                "maxTokenCount": max_tokens,
                "temperature": 0.7,
                "topP": 0.9,
                "stopSequences": [],
            },
        }),
    }
}

fn extract_completion(text_model: TextModel, payload: &Value) -> Option<&str> {
    match text_model {
        TextModel::Claude => payload.get("content")?.get(0)?.get("text")?.as_str(),
        TextModel::Titan => payload.get("results")?.get(0)?.get("outputText")?.as_str(),
    }
}
