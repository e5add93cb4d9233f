// crates/server/src/routes/mod.rs
//! API route handlers for the stemsplit server.

pub mod health;
pub mod jobs;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET  /api/health - Health check
/// - POST /api/jobs - Submit an audio file for separation
/// - GET  /api/jobs/{job_id}/vocals - Download the vocal stem
/// - GET  /api/jobs/{job_id}/instrumental - Download the instrumental stem
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", jobs::router())
        .with_state(state)
}
