use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.upload_body_limit();
    let front_end = ServeDir::new(&state.config.storage.public_dir);

    Router::new()
        // Files
        .route(
            "/upload",
            post(handlers::upload_files).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/files", get(handlers::list_files))
        .route("/download/:stored_name", get(handlers::download_file))
        .route("/delete/:stored_name", delete(handlers::delete_file))
        // Discovery
        .route("/qr", get(handlers::qr_code))
        // Live channel
        .route("/ws", get(handlers::live_updates))
        // Internal
        .route("/_internal/health", get(handlers::health))
        // Static front-end
        .fallback_service(front_end)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
