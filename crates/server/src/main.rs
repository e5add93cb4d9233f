// crates/server/src/main.rs
//! Stemsplit server binary.
//!
//! Builds the orchestrator from environment configuration, starts the
//! Axum HTTP server, and spawns the retention sweeper.

use std::net::SocketAddr;

use anyhow::Result;
use stemsplit_core::{JobOrchestrator, SeparatorConfig};
use stemsplit_server::{
    create_app_with_limit, retention::retention_loop, AppState, RetentionConfig,
    DEFAULT_MAX_UPLOAD_BYTES,
};
use tracing_subscriber::EnvFilter;

/// Default port for the server.
const DEFAULT_PORT: u16 = 8000;

/// Get the server port from environment or use default.
fn get_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

fn get_host() -> String {
    std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string())
}

fn get_max_upload_bytes() -> usize {
    std::env::var("MAX_UPLOAD_BYTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = SeparatorConfig::from_env();
    tracing::info!(
        jobs_dir = %config.jobs_dir.display(),
        model = %config.model,
        device = %config.device,
        max_concurrent_jobs = config.max_concurrent_jobs,
        "starting stemsplit v{}",
        env!("CARGO_PKG_VERSION")
    );

    let orchestrator = JobOrchestrator::from_config(&config).await?;
    let state = AppState::new(orchestrator);

    if let Some(retention) = RetentionConfig::from_env() {
        tokio::spawn(retention_loop(state.clone(), retention));
    } else {
        tracing::info!("retention disabled, job workspaces persist indefinitely");
    }

    let app = create_app_with_limit(state, get_max_upload_bytes());

    let addr: SocketAddr = format!("{}:{}", get_host(), get_port()).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
