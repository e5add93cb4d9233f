// crates/server/src/retention.rs
//! Periodic cleanup of expired job workspaces.
//!
//! Published stems are large and callers rarely come back for them twice,
//! so the server sweeps workspaces whose artifacts have outlived a TTL.
//! In-flight jobs are never touched; the core's purge only considers
//! fully published workspaces.

use std::sync::Arc;
use std::time::Duration;

use crate::state::AppState;

/// Sweeps never run more often than this, whatever the env says.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Retention policy, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionConfig {
    /// How long published artifacts stay retrievable.
    pub ttl: Duration,
    /// How often the sweep runs.
    pub sweep_interval: Duration,
}

impl RetentionConfig {
    pub const DEFAULT_TTL_SECS: u64 = 3600;
    pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 600;

    /// Read `JOBS_TTL_SECONDS` and `JOBS_SWEEP_INTERVAL_SECONDS`.
    ///
    /// Returns `None` when the TTL is zero: retention is disabled and
    /// workspaces persist until removed externally.
    pub fn from_env() -> Option<Self> {
        let ttl_secs = std::env::var("JOBS_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Self::DEFAULT_TTL_SECS);
        if ttl_secs == 0 {
            return None;
        }
        let sweep_secs = std::env::var("JOBS_SWEEP_INTERVAL_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Self::DEFAULT_SWEEP_INTERVAL_SECS);
        Some(Self {
            ttl: Duration::from_secs(ttl_secs),
            sweep_interval: Duration::from_secs(sweep_secs),
        })
    }
}

/// Run the sweep loop forever. Spawned as a background task at startup.
pub async fn retention_loop(state: Arc<AppState>, config: RetentionConfig) {
    let interval = config.sweep_interval.max(MIN_SWEEP_INTERVAL);
    tracing::info!(
        ttl_secs = config.ttl.as_secs(),
        interval_secs = interval.as_secs(),
        "retention sweeper running"
    );
    loop {
        tokio::time::sleep(interval).await;
        match state.orchestrator.purge_expired(config.ttl).await {
            Ok(0) => tracing::debug!("retention sweep: nothing expired"),
            Ok(removed) => tracing::info!(removed, "retention sweep removed expired jobs"),
            Err(e) => tracing::error!(error = %e, "retention sweep failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var("JOBS_TTL_SECONDS");
        std::env::remove_var("JOBS_SWEEP_INTERVAL_SECONDS");
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = RetentionConfig::from_env().unwrap();
        assert_eq!(config.ttl, Duration::from_secs(3600));
        assert_eq!(config.sweep_interval, Duration::from_secs(600));
    }

    #[test]
    #[serial]
    fn test_from_env_zero_ttl_disables() {
        clear_env();
        std::env::set_var("JOBS_TTL_SECONDS", "0");
        assert_eq!(RetentionConfig::from_env(), None);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("JOBS_TTL_SECONDS", "7200");
        std::env::set_var("JOBS_SWEEP_INTERVAL_SECONDS", "120");
        let config = RetentionConfig::from_env().unwrap();
        assert_eq!(config.ttl, Duration::from_secs(7200));
        assert_eq!(config.sweep_interval, Duration::from_secs(120));
        clear_env();
    }
}
