//! Image Generation Studio Service
//!
//! Dispatches prompts to interchangeable image-generation backends (four
//! synchronous models plus an asynchronous edit-style backend), persists
//! completed generations, and assembles a public explore feed.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod explore;
pub mod prompt;
pub mod response;
pub mod storage;

pub use error::{AppError, Result};

use std::sync::Arc;
use tracing::warn;

use backend::{EditClient, ImageGenerator, ModelInvoker};
use explore::ExploreFeed;
use prompt::PromptClient;
use storage::GalleryStore;

/// Application state shared across all handlers.
///
/// Every client is built once at startup and shared read-only; `gallery` is
/// `None` for the whole process lifetime when storage failed to initialize.
pub struct AppState {
    pub settings: config::Settings,
    pub generator: ImageGenerator,
    pub editor: EditClient,
    pub prompts: PromptClient,
    pub gallery: Option<Arc<GalleryStore>>,
    pub explore: Option<ExploreFeed>,
}

impl AppState {
    /// Build all clients from settings. A storage initialization failure is
    /// downgraded to a warning: the service still generates images, it just
    /// stops persisting them.
    pub async fn from_settings(settings: config::Settings) -> Result<Self> {
        let invoker = ModelInvoker::new(&settings.invoke)?;
        let generator = ImageGenerator::new(invoker.clone());
        let prompts = PromptClient::new(invoker);
        let editor = EditClient::new(&settings.edit)?;

        let gallery = match GalleryStore::connect(&settings.storage).await {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                warn!(error = %e, "Storage initialization failed; persistence is disabled");
                None
            }
        };
        let explore = gallery.as_ref().map(|g| ExploreFeed::new(g.records()));

        Ok(Self {
            settings,
            generator,
            editor,
            prompts,
            gallery,
            explore,
        })
    }
}
