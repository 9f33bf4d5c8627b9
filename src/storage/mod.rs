//! Persistence layer - generation records and image objects
//!
//! `GalleryStore` orchestrates the record store and object store
//! collaborators. It is constructed explicitly at startup; when construction
//! fails the process keeps serving generations with persistence disabled.

pub mod memory;
pub mod model;
pub mod object;
pub mod record;

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{AppError, Result};
use memory::{MemoryObjectStore, MemoryRecordStore};
use model::{GenerationRecord, GenerationStatus, NewGeneration, RecordPage};
use object::{HttpObjectStore, ObjectStore};
use record::{HttpRecordStore, RecordStore};

/// Content type for stored generation images
const IMAGE_CONTENT_TYPE: &str = "image/png";

/// The persistence layer: create, fetch, paginate, and owner-checked
/// mutation of generation records.
pub struct GalleryStore {
    records: Arc<dyn RecordStore>,
    objects: Arc<dyn ObjectStore>,
}

impl GalleryStore {
    /// Assemble a store from explicit collaborators
    pub fn new(records: Arc<dyn RecordStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { records, objects }
    }

    /// Build the configured store implementations and probe the record store
    /// once. A failed probe disables persistence for the process lifetime.
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);

        let store = match config.mode.as_str() {
            "memory" => {
                info!("Using in-memory storage; records will not survive a restart");
                Self::new(Arc::new(MemoryRecordStore::new()), Arc::new(MemoryObjectStore::new()))
            }
            "http" => {
                let records_url = config
                    .records_url
                    .as_deref()
                    .ok_or_else(|| AppError::Internal("storage.records_url is not set".to_string()))?;
                let objects_url = config
                    .objects_url
                    .as_deref()
                    .ok_or_else(|| AppError::Internal("storage.objects_url is not set".to_string()))?;

                let records =
                    HttpRecordStore::new(records_url, config.api_token.clone(), timeout)?;
                let objects = HttpObjectStore::new(
                    objects_url,
                    config.public_url_prefix.as_deref(),
                    config.api_token.clone(),
                    timeout,
                )?;
                Self::new(Arc::new(records), Arc::new(objects))
            }
            other => {
                return Err(AppError::Internal(format!("unknown storage mode '{}'", other)));
            }
        };

        store.records.ready().await?;
        Ok(store)
    }

    /// Handle to the record store, shared with the public listing assembler
    pub fn records(&self) -> Arc<dyn RecordStore> {
        Arc::clone(&self.records)
    }

    /// Persist a completed generation: upload the image bytes, then write the
    /// metadata record. A metadata-write failure after a successful upload
    /// leaves an orphan object behind; there is no compensating delete.
    pub async fn store(&self, new: NewGeneration, image: Vec<u8>) -> Result<GenerationRecord> {
        let generation_id = Uuid::new_v4();
        let image_key = format!("generations/{}/{}.png", new.user_id, generation_id);

        let image_url = self
            .objects
            .put(&image_key, image, IMAGE_CONTENT_TYPE)
            .await?;

        let now = Utc::now();
        let record = GenerationRecord {
            generation_id,
            user_id: new.user_id,
            user_email: new.user_email,
            prompt: new.prompt,
            enhanced_prompt: new.enhanced_prompt,
            image_model: new.image_model,
            llm_model: new.llm_model,
            image_url,
            image_key,
            character_data: new.character_data,
            created_at: now,
            updated_at: now,
            status: GenerationStatus::Completed,
            is_public: false,
        };

        self.records.put(&record).await?;
        debug!(generation_id = %record.generation_id, "Stored generation");
        Ok(record)
    }

    pub async fn fetch_by_id(&self, id: &str) -> Result<GenerationRecord> {
        self.records
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("generation {}", id)))
    }

    /// One page of an owner's records, newest first
    pub async fn list_by_owner(
        &self,
        owner: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<RecordPage> {
        Ok(self.records.query_by_owner(owner, limit, cursor).await?)
    }

    pub async fn count_by_owner(&self, owner: &str) -> Result<u64> {
        Ok(self.records.count_by_owner(owner).await?)
    }

    /// Delete a generation. The record delete is authoritative; removing the
    /// image bytes is best-effort cleanup. An ownership mismatch deletes
    /// nothing.
    pub async fn delete(&self, id: &str, requester: &str) -> Result<()> {
        let record = self.fetch_by_id(id).await?;
        if record.user_id != requester {
            return Err(AppError::Unauthorized);
        }

        self.records.delete(id).await?;

        if let Err(e) = self.objects.delete(&record.image_key).await {
            warn!(generation_id = %id, key = %record.image_key, error = %e,
                "Record deleted but image cleanup failed");
        }

        info!(generation_id = %id, "Deleted generation");
        Ok(())
    }

    /// Publish or unpublish a generation. Updates the visibility flag and the
    /// last-update timestamp together. An ownership mismatch changes nothing.
    pub async fn set_visibility(&self, id: &str, requester: &str, visible: bool) -> Result<()> {
        let record = self.fetch_by_id(id).await?;
        if record.user_id != requester {
            return Err(AppError::Unauthorized);
        }

        self.records.set_visibility(id, visible, Utc::now()).await?;
        info!(generation_id = %id, visible, "Updated generation visibility");
        Ok(())
    }
}
