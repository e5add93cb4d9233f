// crates/core/src/workspace.rs
//! Per-job filesystem workspaces.
//!
//! Every job owns one directory under the store root for its entire
//! lifetime: staged input, the engine's scratch output tree, and (only
//! after `publish`) the two canonical artifacts. A workspace is ever in
//! one of two terminal shapes — fully published or gone — so readers
//! never observe partial results.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::error::WorkspaceError;
use crate::types::{SeparatedStems, Stem};

/// Subdirectory handed to the engine as its output root.
const SCRATCH_DIR: &str = "outputs";

/// Allocates and resolves job workspaces under a single root directory.
#[derive(Debug, Clone)]
pub struct WorkspaceStore {
    root: PathBuf,
}

/// A directory exclusively owned by one job.
#[derive(Debug)]
pub struct JobWorkspace {
    dir: PathBuf,
}

impl WorkspaceStore {
    /// Open a store, creating the root directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, WorkspaceError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| WorkspaceError::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate the workspace for a new job id.
    ///
    /// Uses plain `create_dir` so an existing directory for the id fails
    /// with `AlreadyExists` instead of being silently reused.
    pub async fn create(&self, job_id: &str) -> Result<JobWorkspace, WorkspaceError> {
        let dir = self.root.join(job_id);
        fs::create_dir(&dir)
            .await
            .map_err(|e| WorkspaceError::io(&dir, e))?;
        Ok(JobWorkspace { dir })
    }

    /// Resolve a published artifact by job id and stem.
    ///
    /// Returns `None` for unknown ids, failed jobs, jobs still running,
    /// and ids that are not well-formed job tokens — callers cannot
    /// distinguish these cases.
    pub async fn published_stem(&self, job_id: &str, stem: Stem) -> Option<PathBuf> {
        if !is_job_id(job_id) {
            return None;
        }
        let path = self.root.join(job_id).join(stem.artifact_name());
        match fs::try_exists(&path).await {
            Ok(true) => Some(path),
            _ => None,
        }
    }

    /// Remove published workspaces whose newest artifact is older than
    /// `ttl`. Workspaces that have not published both stems are in flight
    /// (or already doomed to teardown) and are never touched here.
    ///
    /// Returns the number of workspaces removed.
    pub async fn purge_expired(&self, ttl: Duration) -> Result<usize, WorkspaceError> {
        let now = SystemTime::now();
        let mut removed = 0;

        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| WorkspaceError::io(&self.root, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| WorkspaceError::io(&self.root, e))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !is_job_id(name) {
                continue;
            }
            let dir = entry.path();
            let Some(published_at) = published_at(&dir).await else {
                continue;
            };

            let age = now.duration_since(published_at).unwrap_or_default();
            if age < ttl {
                continue;
            }
            match fs::remove_dir_all(&dir).await {
                Ok(()) => {
                    tracing::info!(job_id = %name, "expired job workspace removed");
                    removed += 1;
                }
                Err(e) => {
                    tracing::error!(dir = %dir.display(), error = %e, "failed to remove expired workspace");
                }
            }
        }
        Ok(removed)
    }
}

impl JobWorkspace {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Scratch directory handed to the engine as its output root.
    pub fn scratch_dir(&self) -> PathBuf {
        self.dir.join(SCRATCH_DIR)
    }

    /// Stream the uploaded content to `input.{extension}`.
    ///
    /// Copies through a bounded buffer, so memory use is independent of
    /// the upload size. The fixed naming convention lets the engine infer
    /// the input codec from the extension.
    pub async fn stage_input<R>(
        &self,
        mut reader: R,
        extension: &str,
    ) -> Result<PathBuf, WorkspaceError>
    where
        R: AsyncRead + Unpin,
    {
        let path = self.dir.join(format!("input.{extension}"));
        let mut file = fs::File::create(&path)
            .await
            .map_err(|e| WorkspaceError::io(&path, e))?;
        tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(|e| WorkspaceError::io(&path, e))?;
        file.flush()
            .await
            .map_err(|e| WorkspaceError::io(&path, e))?;
        Ok(path)
    }

    /// Move the engine's stem files onto their canonical names.
    ///
    /// Rename, not copy: each destination appears atomically, and this is
    /// the sole step that makes the job's results retrievable. Note the
    /// instrumental source may be named `no_vocals.wav` in the engine
    /// tree; it is normalized to `instrumental.wav` here regardless.
    pub async fn publish(
        &self,
        stems: SeparatedStems,
    ) -> Result<(PathBuf, PathBuf), WorkspaceError> {
        let vocals = self.dir.join(Stem::Vocals.artifact_name());
        let instrumental = self.dir.join(Stem::Instrumental.artifact_name());

        fs::rename(&stems.vocals, &vocals)
            .await
            .map_err(|e| WorkspaceError::io(&stems.vocals, e))?;
        fs::rename(&stems.instrumental, &instrumental)
            .await
            .map_err(|e| WorkspaceError::io(&stems.instrumental, e))?;
        Ok((vocals, instrumental))
    }

    /// Recursively remove the workspace.
    ///
    /// Idempotent: an absent workspace is not an error. Other IO failures
    /// are logged and swallowed — teardown runs on error paths where a
    /// better error is already in flight.
    pub async fn destroy(&self) {
        match fs::remove_dir_all(&self.dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::error!(dir = %self.dir.display(), error = %e, "failed to remove job workspace");
            }
        }
    }
}

/// Well-formedness check for job ids (32 hex chars, uuid v4 simple form).
///
/// Rejecting everything else keeps retrieval from ever joining arbitrary
/// caller strings into the store root.
fn is_job_id(candidate: &str) -> bool {
    candidate.len() == 32 && candidate.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Newest artifact mtime, or `None` unless both stems are published.
async fn published_at(dir: &Path) -> Option<SystemTime> {
    let vocals = fs::metadata(dir.join(Stem::Vocals.artifact_name()))
        .await
        .ok()?
        .modified()
        .ok()?;
    let instrumental = fs::metadata(dir.join(Stem::Instrumental.artifact_name()))
        .await
        .ok()?
        .modified()
        .ok()?;
    Some(vocals.max(instrumental))
}
