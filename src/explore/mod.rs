//! Public listing assembler
//!
//! The record store has no index keyed on visibility, so the explore feed is
//! assembled from a broad scan filtered and sorted client-side. This is
//! documented architectural debt: a visibility-keyed index should replace the
//! scan, behind the same `list_public` contract.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::backend::model::EDIT_MODEL;
use crate::error::Result;
use crate::storage::model::GenerationRecord;
use crate::storage::record::{RecordStore, RecordStoreError};

/// One page of the public feed
#[derive(Debug, Default)]
pub struct ExplorePage {
    pub records: Vec<GenerationRecord>,
    pub next_cursor: Option<String>,
    /// Set when the feed is degraded rather than failed
    pub message: Option<String>,
}

/// Assembles the public explore feed
#[derive(Clone)]
pub struct ExploreFeed {
    records: Arc<dyn RecordStore>,
}

impl ExploreFeed {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// List publicly visible generations, newest first.
    ///
    /// Edit-backend outputs are excluded by policy even when marked public.
    /// A scan denied by the store's access policy degrades to an empty page
    /// with a diagnostic message instead of a hard failure.
    pub async fn list_public(&self, limit: usize, cursor: Option<&str>) -> Result<ExplorePage> {
        let page = match self.records.scan(limit, cursor).await {
            Ok(page) => page,
            Err(RecordStoreError::ScanDenied) => {
                warn!("Record store denied the broad read; returning an empty public feed");
                return Ok(ExplorePage {
                    records: Vec::new(),
                    next_cursor: None,
                    message: Some(
                        "public feed temporarily unavailable: the record store denied a broad read"
                            .to_string(),
                    ),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let scanned = page.records.len();
        let mut records: Vec<GenerationRecord> = page
            .records
            .into_iter()
            .filter(|record| record.is_public && record.image_model != EDIT_MODEL)
            .collect();

        // The scan carries no ordering guarantee; sort here.
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        debug!(scanned, kept = records.len(), "Assembled public feed page");

        Ok(ExplorePage {
            records,
            next_cursor: page.next_cursor,
            message: None,
        })
    }
}
