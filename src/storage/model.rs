//! Persisted generation records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Lifecycle status of a generation record. Only `Completed` is produced
/// today; records are written after generation succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Completed,
}

/// One persisted image generation: metadata plus a pointer into the object
/// store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub generation_id: Uuid,
    pub user_id: String,
    pub user_email: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced_prompt: Option<String>,
    pub image_model: String,
    pub llm_model: String,
    pub image_url: String,
    pub image_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: GenerationStatus,
    /// Canonically a boolean. Legacy records encoded this as the strings
    /// "true"/"false"; the deserializer coerces them once, here at the
    /// record-store boundary.
    #[serde(default, deserialize_with = "visibility_flag")]
    pub is_public: bool,
}

/// Inputs for creating a new generation record
#[derive(Debug, Clone)]
pub struct NewGeneration {
    pub user_id: String,
    pub user_email: String,
    pub prompt: String,
    pub enhanced_prompt: Option<String>,
    pub image_model: String,
    pub llm_model: String,
    pub character_data: Option<serde_json::Value>,
}

/// One page of records plus the cursor to resume from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordPage {
    pub records: Vec<GenerationRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

fn visibility_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => Ok(value),
        Flag::Text(value) => match value.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "invalid visibility flag '{}'",
                other
            ))),
        },
    }
}
