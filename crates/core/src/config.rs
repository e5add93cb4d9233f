// crates/core/src/config.rs
//! Runtime configuration for the separation pipeline.

use std::env;
use std::path::PathBuf;

/// Configuration consumed by the orchestrator and the engine adapter.
///
/// Populated from the environment in binaries; constructed directly in
/// tests.
#[derive(Debug, Clone)]
pub struct SeparatorConfig {
    /// Root directory under which per-job workspaces are created.
    pub jobs_dir: PathBuf,
    /// Interpreter used to launch the engine (`{python_bin} -m demucs ...`).
    pub python_bin: String,
    /// Demucs model identifier.
    pub model: String,
    /// Compute device handed to the engine (`cuda`, `cpu`, ...).
    pub device: String,
    /// Upper bound on concurrently running separation invocations.
    pub max_concurrent_jobs: usize,
}

impl Default for SeparatorConfig {
    fn default() -> Self {
        Self {
            jobs_dir: PathBuf::from("jobs"),
            python_bin: "python3".to_string(),
            model: "mdx_extra_q".to_string(),
            device: "cuda".to_string(),
            max_concurrent_jobs: 1,
        }
    }
}

impl SeparatorConfig {
    /// Read configuration from the environment, falling back to defaults
    /// for unset or unparseable values.
    ///
    /// Variables: `JOBS_DIR`, `PYTHON_BIN`, `DEMUCS_MODEL`, `DEMUCS_DEVICE`,
    /// `MAX_CONCURRENT_JOBS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            jobs_dir: env::var("JOBS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.jobs_dir),
            python_bin: env::var("PYTHON_BIN").unwrap_or(defaults.python_bin),
            model: env::var("DEMUCS_MODEL").unwrap_or(defaults.model),
            device: env::var("DEMUCS_DEVICE").unwrap_or(defaults.device),
            max_concurrent_jobs: env::var("MAX_CONCURRENT_JOBS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(defaults.max_concurrent_jobs),
        }
    }
}
