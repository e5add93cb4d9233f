// crates/server/src/lib.rs
//! Stemsplit server library.
//!
//! This crate provides the Axum-based HTTP server wrapping the
//! separation job orchestrator: multipart upload in, two wav stems out,
//! retrievable by job id.

pub mod error;
pub mod retention;
pub mod routes;
pub mod state;

pub use error::*;
pub use retention::RetentionConfig;
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Default cap on upload size. Long mixes in lossless formats are big.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes (health, jobs)
/// - a request body limit sized for audio uploads
/// - CORS for development (allows any origin)
/// - Request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    create_app_with_limit(state, DEFAULT_MAX_UPLOAD_BYTES)
}

/// `create_app` with an explicit upload size cap.
pub fn create_app_with_limit(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes(state))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================
