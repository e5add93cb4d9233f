// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use stemsplit_core::JobOrchestrator;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// The separation job orchestrator all routes drive.
    pub orchestrator: Arc<JobOrchestrator>,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(orchestrator: JobOrchestrator) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            orchestrator: Arc::new(orchestrator),
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
