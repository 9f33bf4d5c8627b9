//! HTTP route table

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::handlers;
use crate::AppState;

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/models", get(handlers::list_models))
        .route("/api/images/generations", post(handlers::generate_image))
        .route("/api/images/edits", post(handlers::edit_image))
        .route("/api/generations", get(handlers::list_generations))
        .route(
            "/api/generations/:id",
            get(handlers::get_generation).delete(handlers::delete_generation),
        )
        .route("/api/generations/:id/publish", post(handlers::publish_generation))
        .route("/api/generations/:id/unpublish", post(handlers::unpublish_generation))
        .route("/api/explore", get(handlers::explore))
        .route("/api/user/stats", get(handlers::user_stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
