// crates/server/src/routes/jobs.rs
//! Separation job endpoints: upload, and per-stem artifact retrieval.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::TryStreamExt;
use serde::Serialize;
use stemsplit_core::Stem;
use tokio::fs::File;
use tokio_util::io::{ReaderStream, StreamReader};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Response for a successful job submission.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct JobResponse {
    pub job_id: String,
    pub vocals_url: String,
    pub instrumental_url: String,
}

/// POST /api/jobs - Submit an audio file for separation.
///
/// Expects a multipart form with a `file` field carrying the upload. The
/// field's byte stream is handed to the orchestrator as-is, so the upload
/// is staged to disk without buffering the whole file in memory. The call
/// completes when the job reaches a terminal state.
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<JobResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("filename missing".into()))?;

        let reader = Box::pin(StreamReader::new(field.map_err(std::io::Error::other)));
        let job = state.orchestrator.submit(&filename, reader).await?;

        return Ok(Json(JobResponse {
            vocals_url: format!("/api/jobs/{}/vocals", job.job_id),
            instrumental_url: format!("/api/jobs/{}/instrumental", job.job_id),
            job_id: job.job_id,
        }));
    }
    Err(ApiError::BadRequest("file field missing".into()))
}

/// GET /api/jobs/{job_id}/vocals - Download the vocal stem.
pub async fn get_vocals(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    serve_stem(&state, &job_id, Stem::Vocals).await
}

/// GET /api/jobs/{job_id}/instrumental - Download the instrumental stem.
pub async fn get_instrumental(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    serve_stem(&state, &job_id, Stem::Instrumental).await
}

/// Stream a published artifact as `audio/wav`.
///
/// Unknown ids, failed jobs, and jobs still separating all look the same
/// from here: not found.
async fn serve_stem(state: &AppState, job_id: &str, stem: Stem) -> ApiResult<Response> {
    let Some(path) = state.orchestrator.stem_path(job_id, stem).await else {
        return Err(ApiError::JobNotFound(job_id.to_string()));
    };

    let file = match File::open(&path).await {
        Ok(file) => file,
        // The workspace can vanish between the probe and the open (the
        // retention sweeper, most likely). Still just a miss.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::JobNotFound(job_id.to_string()));
        }
        Err(e) => {
            return Err(ApiError::Internal(format!(
                "failed to open artifact {}: {e}",
                path.display()
            )));
        }
    };

    let body = Body::from_stream(ReaderStream::new(file));

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/wav"));
    let disposition = format!("attachment; filename=\"{}\"", stem.artifact_name());
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok((headers, body).into_response())
}

/// Create the jobs routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs", post(create_job))
        .route("/jobs/{job_id}/vocals", get(get_vocals))
        .route("/jobs/{job_id}/instrumental", get(get_instrumental))
}
