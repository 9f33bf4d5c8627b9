//! Request handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::identity::{MaybeIdentity, UserIdentity};
use crate::backend::edit::EditRequest;
use crate::backend::model::{truncate_prompt, ModelKind, EDIT_MODEL};
use crate::error::{AppError, Result};
use crate::prompt::TextModel;
use crate::response;
use crate::storage::model::{GenerationRecord, NewGeneration, RecordPage};
use crate::AppState;

fn default_model() -> String {
    "titan-g1".to_string()
}

fn default_dimension() -> u32 {
    1024
}

fn default_aspect_ratio() -> String {
    "1:1".to_string()
}

fn default_safety_tolerance() -> u8 {
    2
}

fn default_output_format() -> String {
    "jpeg".to_string()
}

fn default_gallery_limit() -> usize {
    20
}

fn default_explore_limit() -> usize {
    50
}

#[derive(Debug, Deserialize)]
pub struct GenerateImageRequest {
    pub prompt: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub llm_model: Option<String>,
    #[serde(default)]
    pub enhance_prompt: bool,
    #[serde(default = "default_dimension")]
    pub width: u32,
    #[serde(default = "default_dimension")]
    pub height: u32,
    #[serde(default)]
    pub character_features: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct GenerateImageResponse {
    pub success: bool,
    /// Embeddable data URL of the generated image
    pub image: String,
    /// The prompt actually sent to the backend
    pub prompt: String,
    pub original_prompt: String,
    pub enhanced_prompt: Option<String>,
    pub was_enhanced: bool,
    /// Present only when the generation was persisted
    pub generation_id: Option<Uuid>,
}

/// Generate an image with one of the synchronous backends, optionally
/// enhancing the prompt first, and persist the result when the caller is
/// identified and storage is up. Persistence failures never fail the
/// generation response.
pub async fn generate_image(
    State(state): State<Arc<AppState>>,
    MaybeIdentity(user): MaybeIdentity,
    Json(request): Json<GenerateImageRequest>,
) -> Result<Json<GenerateImageResponse>> {
    if request.prompt.trim().is_empty() {
        return Err(AppError::InvalidRequest("prompt is required".to_string()));
    }

    let model = ModelKind::parse(&request.model)?;
    let text_model = TextModel::parse_or_default(request.llm_model.as_deref());

    let mut final_prompt = request.prompt.clone();
    let mut enhanced_prompt = None;

    if request.enhance_prompt {
        match state.prompts.enhance(&request.prompt, text_model, model).await {
            Ok(text) => {
                final_prompt = text.clone();
                enhanced_prompt = Some(text);
            }
            Err(e) => {
                warn!(error = %e, "Prompt enhancement failed, using original prompt");
            }
        }
    }

    let limit = model.prompt_limit();
    if final_prompt.chars().count() > limit {
        final_prompt = truncate_prompt(&final_prompt, limit);
        info!(model = %model, limit, "Truncated prompt to fit the backend's limit");
    }

    let image = state
        .generator
        .generate(model, &final_prompt, request.width, request.height)
        .await?;
    let image_data_url = response::data_url(&image, "png");

    let mut generation_id = None;
    if let (Some(user), Some(gallery)) = (&user, &state.gallery) {
        let new = NewGeneration {
            user_id: user.user_id.clone(),
            user_email: user.email.clone(),
            prompt: request.prompt.clone(),
            enhanced_prompt: enhanced_prompt.clone(),
            image_model: model.as_str().to_string(),
            llm_model: text_model.as_str().to_string(),
            character_data: request.character_features.clone(),
        };
        match gallery.store(new, image).await {
            Ok(record) => generation_id = Some(record.generation_id),
            Err(e) => {
                warn!(error = %e, "Failed to persist generation; returning the image anyway");
            }
        }
    }

    let was_enhanced = enhanced_prompt.is_some();
    Ok(Json(GenerateImageResponse {
        success: true,
        image: image_data_url,
        prompt: final_prompt,
        original_prompt: request.prompt,
        enhanced_prompt,
        was_enhanced,
        generation_id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct EditImageRequest {
    pub prompt: String,
    /// Reference image, as a data URL or bare base64
    pub input_image: String,
    #[serde(default)]
    pub llm_model: Option<String>,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default)]
    pub seed: Option<i64>,
    #[serde(default = "default_safety_tolerance")]
    pub safety_tolerance: u8,
    #[serde(default = "default_output_format")]
    pub output_format: String,
}

#[derive(Debug, Serialize)]
pub struct EditImageResponse {
    pub success: bool,
    pub image: String,
    pub original_prompt: String,
    pub optimized_prompt: String,
    pub model: &'static str,
    pub width: u32,
    pub height: u32,
    pub request_id: String,
}

/// Edit a reference image through the asynchronous submit/poll backend
pub async fn edit_image(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EditImageRequest>,
) -> Result<Json<EditImageResponse>> {
    if request.prompt.trim().is_empty() || request.input_image.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "both prompt and input_image are required".to_string(),
        ));
    }

    let text_model = TextModel::parse_or_default(request.llm_model.as_deref());
    let optimized_prompt = state
        .prompts
        .optimize_edit_instruction(&request.prompt, text_model)
        .await;
    info!(original = %request.prompt, optimized = %optimized_prompt, "Optimized edit instruction");

    let input_image = response::strip_data_url(&request.input_image).to_string();

    let outcome = state
        .editor
        .run(&EditRequest {
            prompt: optimized_prompt.clone(),
            input_image,
            aspect_ratio: request.aspect_ratio,
            seed: request.seed,
            safety_tolerance: request.safety_tolerance,
            output_format: request.output_format.clone(),
        })
        .await?;

    let format = response::detect_image_format(&outcome.image).unwrap_or(match request.output_format.as_str() {
        "png" => "png",
        _ => "jpeg",
    });

    Ok(Json(EditImageResponse {
        success: true,
        image: response::data_url(&outcome.image, format),
        original_prompt: request.prompt,
        optimized_prompt,
        model: EDIT_MODEL,
        width: outcome.width,
        height: outcome.height,
        request_id: outcome.job_id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct GalleryQuery {
    #[serde(default = "default_gallery_limit")]
    pub limit: usize,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerationListResponse {
    pub success: bool,
    pub generations: Vec<GenerationRecord>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl From<RecordPage> for GenerationListResponse {
    fn from(page: RecordPage) -> Self {
        Self {
            success: true,
            count: page.records.len(),
            generations: page.records,
            next_cursor: page.next_cursor,
        }
    }
}

fn gallery(state: &AppState) -> Result<&crate::storage::GalleryStore> {
    state.gallery.as_deref().ok_or(AppError::StorageUnavailable)
}

/// List the caller's generations, newest first
pub async fn list_generations(
    State(state): State<Arc<AppState>>,
    user: UserIdentity,
    Query(query): Query<GalleryQuery>,
) -> Result<Json<GenerationListResponse>> {
    let page = gallery(&state)?
        .list_by_owner(&user.user_id, query.limit, query.cursor.as_deref())
        .await?;
    Ok(Json(page.into()))
}

#[derive(Debug, Serialize)]
pub struct GenerationResponse {
    pub success: bool,
    pub generation: GenerationRecord,
}

pub async fn get_generation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GenerationResponse>> {
    let record = gallery(&state)?.fetch_by_id(&id).await?;
    Ok(Json(GenerationResponse {
        success: true,
        generation: record,
    }))
}

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub success: bool,
    pub message: String,
}

pub async fn delete_generation(
    State(state): State<Arc<AppState>>,
    user: UserIdentity,
    Path(id): Path<String>,
) -> Result<Json<MutationResponse>> {
    gallery(&state)?.delete(&id, &user.user_id).await?;
    Ok(Json(MutationResponse {
        success: true,
        message: "Generation deleted".to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct VisibilityResponse {
    pub success: bool,
    pub message: String,
    pub is_public: bool,
}

async fn set_visibility(
    state: &AppState,
    user: &UserIdentity,
    id: &str,
    visible: bool,
) -> Result<Json<VisibilityResponse>> {
    gallery(state)?.set_visibility(id, &user.user_id, visible).await?;
    let action = if visible { "published" } else { "unpublished" };
    Ok(Json(VisibilityResponse {
        success: true,
        message: format!("Generation {}", action),
        is_public: visible,
    }))
}

pub async fn publish_generation(
    State(state): State<Arc<AppState>>,
    user: UserIdentity,
    Path(id): Path<String>,
) -> Result<Json<VisibilityResponse>> {
    set_visibility(&state, &user, &id, true).await
}

pub async fn unpublish_generation(
    State(state): State<Arc<AppState>>,
    user: UserIdentity,
    Path(id): Path<String>,
) -> Result<Json<VisibilityResponse>> {
    set_visibility(&state, &user, &id, false).await
}

#[derive(Debug, Deserialize)]
pub struct ExploreQuery {
    #[serde(default = "default_explore_limit")]
    pub limit: usize,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExploreResponse {
    pub success: bool,
    pub generations: Vec<GenerationRecord>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Public explore feed. Never hard-fails when the feed is merely degraded:
/// an empty page beats an error in front of users.
pub async fn explore(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExploreQuery>,
) -> Result<Json<ExploreResponse>> {
    let Some(feed) = &state.explore else {
        return Ok(Json(ExploreResponse {
            success: true,
            generations: Vec::new(),
            count: 0,
            next_cursor: None,
            message: Some("public feed unavailable: storage is disabled".to_string()),
        }));
    };

    let page = feed.list_public(query.limit, query.cursor.as_deref()).await?;
    Ok(Json(ExploreResponse {
        success: true,
        count: page.records.len(),
        generations: page.records,
        next_cursor: page.next_cursor,
        message: page.message,
    }))
}

#[derive(Debug, Serialize)]
pub struct UserStatsResponse {
    pub success: bool,
    pub stats: UserStats,
}

#[derive(Debug, Serialize)]
pub struct UserStats {
    pub total_generations: u64,
    pub user_id: String,
}

pub async fn user_stats(
    State(state): State<Arc<AppState>>,
    user: UserIdentity,
) -> Result<Json<UserStatsResponse>> {
    let total_generations = gallery(&state)?.count_by_owner(&user.user_id).await?;
    Ok(Json(UserStatsResponse {
        success: true,
        stats: UserStats {
            total_generations,
            user_id: user.user_id,
        },
    }))
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ModelListResponse {
    pub image_models: Vec<ModelInfo>,
    pub text_models: Vec<ModelInfo>,
}

/// List the models a client may request
pub async fn list_models() -> Json<ModelListResponse> {
    let image_models = ModelKind::ALL
        .iter()
        .map(|model| ModelInfo {
            id: model.as_str(),
            name: model.display_name(),
            prompt_limit: Some(model.prompt_limit()),
        })
        .collect();

    let text_models = vec![
        ModelInfo {
            id: "claude",
            name: "Claude 3 Sonnet",
            prompt_limit: None,
        },
        ModelInfo {
            id: "titan",
            name: "Amazon Titan Text",
            prompt_limit: None,
        },
    ];

    Json(ModelListResponse {
        image_models,
        text_models,
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}
