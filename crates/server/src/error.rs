// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use stemsplit_core::{EngineError, SubmitError, WorkspaceError};
use thiserror::Error;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Submission failed: {0}")]
    Submit(#[from] SubmitError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::JobNotFound(id) => {
                tracing::warn!(job_id = %id, "job not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Job not found", format!("Job ID: {}", id)),
                )
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg.clone()),
                )
            }
            ApiError::Submit(submit_err) => match submit_err {
                SubmitError::UnsupportedExtension { extension } => {
                    tracing::warn!(extension = %extension, "unsupported upload type");
                    (
                        StatusCode::BAD_REQUEST,
                        ErrorResponse::with_details(
                            "Unsupported file type",
                            submit_err.to_string(),
                        ),
                    )
                }
                SubmitError::MissingExtension { filename } => {
                    tracing::warn!(filename = %filename, "upload without extension");
                    (
                        StatusCode::BAD_REQUEST,
                        ErrorResponse::with_details(
                            "Unsupported file type",
                            submit_err.to_string(),
                        ),
                    )
                }
                SubmitError::Engine(engine_err) => {
                    let (error_msg, details) = match engine_err {
                        EngineError::Failed { output, .. } => {
                            tracing::error!(error = %engine_err, "separation engine failed");
                            // Surface the engine's own diagnostic text.
                            ("Separation failed", output.clone())
                        }
                        EngineError::StemNotFound { .. } => {
                            tracing::error!(error = %engine_err, "engine output contract violated");
                            ("Separation produced no output", engine_err.to_string())
                        }
                        EngineError::Spawn { .. } | EngineError::Io { .. } => {
                            tracing::error!(error = %engine_err, "separation engine unavailable");
                            ("Separation engine unavailable", engine_err.to_string())
                        }
                    };
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorResponse::with_details(error_msg, details),
                    )
                }
                SubmitError::Workspace(workspace_err) => {
                    let error_msg = match workspace_err {
                        WorkspaceError::AlreadyExists { path } => {
                            tracing::error!(path = %path.display(), "job id collision");
                            "Job storage conflict"
                        }
                        WorkspaceError::Io { path, source } => {
                            tracing::error!(path = %path.display(), error = %source, "job storage error");
                            "Job storage error"
                        }
                    };
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorResponse::with_details(error_msg, workspace_err.to_string()),
                    )
                }
            },
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::path::PathBuf;

    /// Helper to extract status code and body from a response
    async fn extract_response(response: Response) -> (StatusCode, ErrorResponse) {
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error_response: ErrorResponse = serde_json::from_slice(&body).unwrap();
        (status, error_response)
    }

    #[tokio::test]
    async fn test_job_not_found_returns_404() {
        let error = ApiError::JobNotFound("abc123".to_string());
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Job not found");
        assert!(body.details.unwrap().contains("abc123"));
    }

    #[tokio::test]
    async fn test_bad_request_returns_400() {
        let error = ApiError::BadRequest("file field missing".to_string());
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Bad request");
        assert_eq!(body.details.unwrap(), "file field missing");
    }

    #[tokio::test]
    async fn test_unsupported_extension_returns_400() {
        let error = ApiError::Submit(SubmitError::UnsupportedExtension {
            extension: "xyz".to_string(),
        });
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Unsupported file type");
        assert!(body.details.unwrap().contains(".xyz"));
    }

    #[tokio::test]
    async fn test_missing_extension_returns_400() {
        let error = ApiError::Submit(SubmitError::MissingExtension {
            filename: "mystery".to_string(),
        });
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Unsupported file type");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_engine_failure_returns_500_with_diagnostics() {
        use std::os::unix::process::ExitStatusExt;

        let error = ApiError::Submit(SubmitError::Engine(EngineError::Failed {
            status: std::process::ExitStatus::from_raw(256),
            output: "CUDA out of memory".to_string(),
        }));
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Separation failed");
        // The engine's raw diagnostic text is passed through.
        assert_eq!(body.details.unwrap(), "CUDA out of memory");
    }

    #[tokio::test]
    async fn test_stem_not_found_returns_500() {
        let error = ApiError::Submit(SubmitError::Engine(EngineError::StemNotFound {
            stem: "vocals.wav".to_string(),
            root: PathBuf::from("/jobs/abc/outputs"),
        }));
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Separation produced no output");
    }

    #[tokio::test]
    async fn test_workspace_error_returns_500() {
        let error = ApiError::Submit(SubmitError::Workspace(WorkspaceError::AlreadyExists {
            path: PathBuf::from("/jobs/abc"),
        }));
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Job storage conflict");
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let error = ApiError::Internal("something went wrong".to_string());
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal server error");
        // Internal errors should NOT expose details to clients
        assert!(body.details.is_none());
    }

    #[test]
    fn test_api_error_from_submit_error() {
        let submit_err = SubmitError::UnsupportedExtension {
            extension: "xyz".to_string(),
        };
        let api_err: ApiError = submit_err.into();
        assert!(matches!(api_err, ApiError::Submit(_)));
    }

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse::new("Test error");
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"error\":\"Test error\""));
        assert!(!json.contains("details")); // None should be skipped

        let response = ErrorResponse::with_details("Test error", "More info");
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"details\":\"More info\""));
    }
}
