// crates/core/src/error.rs
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors from a separation engine invocation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to launch separation engine: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },

    /// The engine process exited non-zero. `output` carries the combined
    /// stdout/stderr text for user-facing diagnostics.
    #[error("separation engine exited with {status}:\n{output}")]
    Failed { status: ExitStatus, output: String },

    /// The engine reported success but an expected stem file is missing
    /// from its output tree.
    #[error("separation engine produced no {stem} file under {root}")]
    StemNotFound { stem: String, root: PathBuf },

    #[error("IO error under {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn stem_not_found(stem: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self::StemNotFound {
            stem: stem.into(),
            root: root.into(),
        }
    }
}

/// Errors from job workspace management.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// A workspace for this job id already exists. Ids carry enough
    /// entropy that this indicates reuse, not coincidence.
    #[error("job workspace already exists: {path}")]
    AlreadyExists { path: PathBuf },

    #[error("IO error in job workspace {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WorkspaceError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Errors surfaced to callers of `JobOrchestrator::submit`.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Rejected before any workspace is created.
    #[error("unsupported file type: .{extension}")]
    UnsupportedExtension { extension: String },

    #[error("unable to detect a file extension for {filename:?}")]
    MissingExtension { filename: String },

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_failed_display_carries_output() {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            let err = EngineError::Failed {
                status: ExitStatus::from_raw(256), // exit code 1
                output: "CUDA out of memory".to_string(),
            };
            let msg = err.to_string();
            assert!(msg.contains("exited with"));
            assert!(msg.contains("CUDA out of memory"));
        }
    }

    #[test]
    fn test_stem_not_found_display() {
        let err = EngineError::stem_not_found("vocals.wav", "/jobs/abc/outputs");
        let msg = err.to_string();
        assert!(msg.contains("vocals.wav"));
        assert!(msg.contains("/jobs/abc/outputs"));
    }

    #[test]
    fn test_workspace_io_classification() {
        let source = std::io::Error::new(std::io::ErrorKind::AlreadyExists, "exists");
        let err = WorkspaceError::io("/jobs/abc", source);
        assert!(matches!(err, WorkspaceError::AlreadyExists { .. }));

        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = WorkspaceError::io("/jobs/abc", source);
        assert!(matches!(err, WorkspaceError::Io { .. }));
    }

    #[test]
    fn test_submit_error_from_workspace_error() {
        let err: SubmitError = WorkspaceError::AlreadyExists {
            path: PathBuf::from("/jobs/abc"),
        }
        .into();
        assert!(matches!(err, SubmitError::Workspace(_)));
    }

    #[test]
    fn test_unsupported_extension_display() {
        let err = SubmitError::UnsupportedExtension {
            extension: "xyz".to_string(),
        };
        assert_eq!(err.to_string(), "unsupported file type: .xyz");
    }
}
