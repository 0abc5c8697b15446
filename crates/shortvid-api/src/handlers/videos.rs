//! Video job handlers: submit, status, download, history.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tracing::info;

use shortvid_models::{Job, JobId, JobStatus, SceneOutcome, VideoStyle};
use shortvid_queue::RenderJob;

use crate::error::{ApiError, ApiResult};
use crate::metrics::names;
use crate::state::AppState;

// ============================================================================
// Types
// ============================================================================

/// Submit request.
#[derive(Deserialize)]
pub struct GenerateVideoRequest {
    pub topic: String,
    pub style: String,
    #[serde(default = "default_speaker")]
    pub speaker_id: u32,
    #[serde(default)]
    pub enable_preview: bool,
    pub user_id: Option<String>,
}

fn default_speaker() -> u32 {
    1
}

/// Submit response: the caller gets the id before any pipeline stage runs.
#[derive(Serialize)]
pub struct GenerateVideoResponse {
    pub job_id: JobId,
    pub status: &'static str,
    pub estimated_seconds: u32,
}

/// Status response.
#[derive(Serialize)]
pub struct VideoStatusResponse {
    pub job_id: String,
    pub status: &'static str,
    pub progress: u8,
    pub current_step: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_outcomes: Option<Vec<SceneOutcome>>,
}

/// History response.
#[derive(Serialize)]
pub struct HistoryResponse {
    pub generations: Vec<HistorySummary>,
}

#[derive(Serialize)]
pub struct HistorySummary {
    pub id: String,
    pub topic: String,
    pub style: String,
    pub status: &'static str,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

// ============================================================================
// Constants
// ============================================================================

/// Rough wall-clock estimate returned at submission.
const ESTIMATED_SECONDS: u32 = 120;

/// Bound on history queries.
const HISTORY_LIMIT: u32 = 20;

// ============================================================================
// Handlers
// ============================================================================

/// Submit a generation job.
///
/// The pending record is durable before this returns; the pipeline runs in
/// the worker, decoupled from this connection.
pub async fn generate_video(
    State(state): State<AppState>,
    Json(request): Json<GenerateVideoRequest>,
) -> ApiResult<Json<GenerateVideoResponse>> {
    let topic = request.topic.trim();
    if topic.is_empty() {
        return Err(ApiError::bad_request("topic must not be empty"));
    }
    let style: VideoStyle = request
        .style
        .parse()
        .map_err(|e: shortvid_models::StyleParseError| ApiError::bad_request(e.to_string()))?;

    let user_id = request
        .user_id
        .unwrap_or_else(|| "anonymous".to_string());

    let job = Job::new(
        &user_id,
        topic,
        style,
        request.speaker_id,
        request.enable_preview,
    );
    state.store.create(&job).await?;

    let render = RenderJob::new(
        job.id.clone(),
        &user_id,
        topic,
        style,
        request.speaker_id,
        request.enable_preview,
    );
    if let Err(e) = state.queue.enqueue(&render).await {
        // The pending row must not outlive a failed dispatch, or callers
        // would poll a job that will never run.
        state
            .store
            .mark_failed(&job.id, &format!("dispatch failed: {e}"), &[])
            .await
            .ok();
        return Err(e.into());
    }

    counter!(names::JOBS_ENQUEUED_TOTAL).increment(1);
    info!(job_id = %job.id, topic = %topic, style = %style, "Job submitted");

    Ok(Json(GenerateVideoResponse {
        job_id: job.id,
        status: "pending",
        estimated_seconds: ESTIMATED_SECONDS,
    }))
}

/// Poll job status.
///
/// While processing, prefers the advisory progress cache; otherwise the
/// percent is derived from the authoritative job status.
pub async fn get_video_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<VideoStatusResponse>> {
    let id = JobId::from_string(job_id);
    let job = state.store.get(&id).await?;

    let snapshot = if job.status == JobStatus::Processing {
        // Cache reads tolerate a missing entry or an unreachable cache
        state.progress.get(&id).await.unwrap_or(None)
    } else {
        None
    };

    let (progress, current_step) = match snapshot {
        Some(snapshot) => (snapshot.percent, snapshot.step),
        None => derive_progress(job.status),
    };

    let video_url = (job.status == JobStatus::Completed)
        .then(|| format!("/api/video/download/{id}"));

    Ok(Json(VideoStatusResponse {
        job_id: id.to_string(),
        status: job.status.as_str(),
        progress,
        current_step,
        video_url,
        error_message: job.error_detail,
        scene_outcomes: job.status.is_terminal().then_some(job.scene_outcomes),
    }))
}

/// Download the encoded video.
pub async fn download_video(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let id = JobId::from_string(job_id);
    let job = state.store.get(&id).await?;

    let result_path = downloadable_path(&job)?;

    let file = tokio::fs::File::open(result_path)
        .await
        .map_err(|_| ApiError::not_found("video file not found"))?;

    let body = Body::from_stream(ReaderStream::new(file));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download_filename(&job.topic)),
        )
        .body(body)
        .map_err(|e| ApiError::internal(e.to_string()))
}

/// Reverse-chronological generation history for one user.
pub async fn get_user_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<HistoryResponse>> {
    let jobs = state.store.list_for_user(&user_id, HISTORY_LIMIT).await?;

    let generations = jobs
        .into_iter()
        .map(|job| {
            let video_url = (job.status == JobStatus::Completed)
                .then(|| format!("/api/video/download/{}", job.id));
            HistorySummary {
                id: job.id.to_string(),
                topic: job.topic,
                style: job.style.to_string(),
                status: job.status.as_str(),
                created_at: job.created_at.to_rfc3339(),
                video_url,
            }
        })
        .collect();

    Ok(Json(HistoryResponse { generations }))
}

// ============================================================================
// Helpers
// ============================================================================

/// A download is only possible for a completed job with a recorded result.
fn downloadable_path(job: &Job) -> ApiResult<&str> {
    if job.status != JobStatus::Completed {
        return Err(ApiError::not_found("video not found or still generating"));
    }
    job.result_path
        .as_deref()
        .ok_or_else(|| ApiError::not_found("video file not found"))
}

/// Coarse progress when no cache entry exists: terminal states read 100,
/// pending 0, processing a low first-stage default.
fn derive_progress(status: JobStatus) -> (u8, String) {
    match status {
        JobStatus::Pending => (0, "Waiting to start".to_string()),
        JobStatus::Processing => (10, "Processing".to_string()),
        JobStatus::Completed => (100, "Completed".to_string()),
        JobStatus::Failed => (100, "Failed".to_string()),
    }
}

/// Safe attachment filename derived from the topic.
fn download_filename(topic: &str) -> String {
    let stem: String = topic
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.mp4", if stem.is_empty() { "video" } else { &stem })
}
