//! Closed set of synchronous generation backends and their per-model limits

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Identifier of the edit-style backend. It runs a submit/poll protocol and
/// is deliberately not a `ModelKind`; its outputs are excluded from the
/// public listing.
pub const EDIT_MODEL: &str = "flux-kontext-pro";

/// The synchronous text-to-image backends this service can dispatch to.
///
/// The set is closed: an unknown identifier fails at parse time, before any
/// network call is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    TitanG1,
    TitanG2,
    NovaCanvas,
    Sdxl,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::TitanG1,
        ModelKind::TitanG2,
        ModelKind::NovaCanvas,
        ModelKind::Sdxl,
    ];

    /// Parse a client-supplied model identifier
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "titan-g1" => Ok(ModelKind::TitanG1),
            "titan-g2" => Ok(ModelKind::TitanG2),
            "nova-canvas" => Ok(ModelKind::NovaCanvas),
            "sdxl" => Ok(ModelKind::Sdxl),
            other => Err(AppError::UnsupportedModel(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::TitanG1 => "titan-g1",
            ModelKind::TitanG2 => "titan-g2",
            ModelKind::NovaCanvas => "nova-canvas",
            ModelKind::Sdxl => "sdxl",
        }
    }

    /// Upstream model identifier used on the invoke endpoint
    pub fn model_id(&self) -> &'static str {
        match self {
            ModelKind::TitanG1 => "amazon.titan-image-generator-v1",
            ModelKind::TitanG2 => "amazon.titan-image-generator-v2:0",
            ModelKind::NovaCanvas => "amazon.nova-canvas-v1:0",
            ModelKind::Sdxl => "stability.stable-diffusion-xl-base-v1-0",
        }
    }

    /// Human-readable name for model listings
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelKind::TitanG1 => "Titan Image Generator G1",
            ModelKind::TitanG2 => "Titan Image Generator G1 v2",
            ModelKind::NovaCanvas => "Nova Canvas",
            ModelKind::Sdxl => "SDXL 1.0",
        }
    }

    /// Maximum prompt length (characters) accepted by the backend
    pub fn prompt_limit(&self) -> usize {
        match self {
            ModelKind::TitanG1 | ModelKind::TitanG2 => 512,
            ModelKind::NovaCanvas | ModelKind::Sdxl => 1000,
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Truncate a prompt to at most `limit` characters, cutting at a whitespace
/// boundary so no word is split. A prompt with no whitespace inside the limit
/// is hard-cut at the limit.
pub fn truncate_prompt(prompt: &str, limit: usize) -> String {
    if prompt.chars().count() <= limit {
        return prompt.to_string();
    }

    let cut: String = prompt.chars().take(limit).collect();
    match cut.rfind(char::is_whitespace) {
        Some(idx) => cut[..idx].trim_end().to_string(),
        None => cut,
    }
}
