// crates/core/src/orchestrator.rs
//! Job orchestration façade.
//!
//! Drives a submission through its whole lifecycle: validate, stage,
//! wait for an admission slot, invoke the engine, then publish or tear
//! down. Results only ever become visible through `publish`; every
//! failure after workspace creation removes the workspace entirely.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncRead;
use uuid::Uuid;

use crate::admission::AdmissionPool;
use crate::config::SeparatorConfig;
use crate::engine::{DemucsEngine, SeparationEngine};
use crate::error::{SubmitError, WorkspaceError};
use crate::types::{is_supported_extension, normalized_extension, CompletedJob, Stem};
use crate::workspace::{JobWorkspace, WorkspaceStore};

/// Ties engine, workspace store, and admission pool together.
///
/// Owns each job exclusively from submission to its terminal state. The
/// admission pool is the only resource shared across jobs; workspaces
/// are per-job and never shared, so their contents need no locking.
pub struct JobOrchestrator {
    engine: Arc<dyn SeparationEngine>,
    workspaces: WorkspaceStore,
    admission: AdmissionPool,
}

impl JobOrchestrator {
    pub fn new(
        engine: Arc<dyn SeparationEngine>,
        workspaces: WorkspaceStore,
        admission: AdmissionPool,
    ) -> Self {
        Self {
            engine,
            workspaces,
            admission,
        }
    }

    /// Build a production orchestrator (Demucs engine) from configuration.
    pub async fn from_config(config: &SeparatorConfig) -> Result<Self, WorkspaceError> {
        Ok(Self::new(
            Arc::new(DemucsEngine::new(config)),
            WorkspaceStore::open(&config.jobs_dir).await?,
            AdmissionPool::new(config.max_concurrent_jobs),
        ))
    }

    /// Run one upload through separation to published artifacts.
    ///
    /// The upload is rejected on an unsupported extension before any
    /// workspace exists. After that point any failure destroys the
    /// workspace and the job id is never retrievable.
    pub async fn submit<R>(&self, filename: &str, input: R) -> Result<CompletedJob, SubmitError>
    where
        R: AsyncRead + Unpin,
    {
        let extension = validated_extension(filename)?;
        let job_id = Uuid::new_v4().simple().to_string();

        let workspace = self.workspaces.create(&job_id).await?;
        tracing::info!(job_id = %job_id, filename = %filename, "job received");

        match self.run(&workspace, &job_id, &extension, input).await {
            Ok(job) => {
                tracing::info!(job_id = %job_id, "job published");
                Ok(job)
            }
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "job failed, tearing down workspace");
                workspace.destroy().await;
                Err(e)
            }
        }
    }

    /// Staged → Admitted → Invoking → Published. Teardown on error is the
    /// caller's (submit's) job, so this can use `?` freely.
    async fn run<R>(
        &self,
        workspace: &JobWorkspace,
        job_id: &str,
        extension: &str,
        input: R,
    ) -> Result<CompletedJob, SubmitError>
    where
        R: AsyncRead + Unpin,
    {
        let input_path = workspace.stage_input(input, extension).await?;

        let stems = {
            let _slot = self.admission.admit().await;
            tracing::debug!(job_id = %job_id, "admission slot acquired");
            self.engine
                .separate(&input_path, &workspace.scratch_dir())
                .await?
            // Slot drops here: the engine is done with the compute
            // resource before the filesystem publish.
        };

        let (vocals, instrumental) = workspace.publish(stems).await?;
        Ok(CompletedJob {
            job_id: job_id.to_string(),
            vocals,
            instrumental,
        })
    }

    /// Resolve a published artifact. `None` covers unknown, failed, and
    /// still-running jobs alike.
    pub async fn stem_path(&self, job_id: &str, stem: Stem) -> Option<PathBuf> {
        self.workspaces.published_stem(job_id, stem).await
    }

    /// Remove published workspaces older than `ttl`. See
    /// `WorkspaceStore::purge_expired`.
    pub async fn purge_expired(&self, ttl: Duration) -> Result<usize, WorkspaceError> {
        self.workspaces.purge_expired(ttl).await
    }

    pub fn max_concurrent_jobs(&self) -> usize {
        self.admission.capacity()
    }
}

fn validated_extension(filename: &str) -> Result<String, SubmitError> {
    let extension = normalized_extension(filename).ok_or_else(|| SubmitError::MissingExtension {
        filename: filename.to_string(),
    })?;
    if !is_supported_extension(&extension) {
        return Err(SubmitError::UnsupportedExtension { extension });
    }
    Ok(extension)
}
