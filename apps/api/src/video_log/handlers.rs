use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use super::grouping::{group_by_month, VideoGroup};
use super::models::{ProgressSummary, VideoLogEntry};
use super::profiles::{is_owner, resolve_visible_profile, ProfileQuery};
use super::reload::{ReloadRequest, ReloadResponse, Reloader};
use crate::auth::Identity;
use crate::errors::AppError;
use crate::extract::{AppJson, AppQuery};
use crate::state::AppState;
use crate::store::{by_username, is_monthly_progress};

#[derive(Debug, Serialize)]
pub struct VideoLogResponse {
    pub video_groups: Vec<VideoGroup>,
    pub is_requester_owner: bool,
}

#[derive(Debug, Serialize)]
pub struct RecordingListResponse {
    pub practice_recordings: Vec<VideoLogEntry>,
    pub monthly_progress_recordings: Vec<VideoLogEntry>,
}

#[derive(Debug, Serialize)]
pub struct ProgressSummaryListResponse {
    pub summaries: Vec<ProgressSummary>,
    pub is_requester_owner: bool,
}

/// GET /api/v1/videolog/entries
pub async fn handle_list_my_video_groups(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<VideoGroup>>, AppError> {
    let videos = state
        .video_log
        .select_video_log_entries(&[by_username(identity.email)])
        .await?;
    Ok(Json(group_by_month(videos)))
}

/// GET /api/v1/videolog/recordings
/// The requester's videos split by kind, each newest first.
pub async fn handle_list_my_recordings(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<RecordingListResponse>, AppError> {
    let monthly_progress_recordings = state
        .video_log
        .select_video_log_entries(&[by_username(identity.email.clone()), is_monthly_progress(true)])
        .await?;
    let practice_recordings = state
        .video_log
        .select_video_log_entries(&[by_username(identity.email), is_monthly_progress(false)])
        .await?;
    Ok(Json(RecordingListResponse {
        practice_recordings,
        monthly_progress_recordings,
    }))
}

/// GET /api/v1/videolog/summaries
pub async fn handle_list_my_summaries(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<ProgressSummary>>, AppError> {
    let summaries = state
        .video_log
        .select_progress_summaries(&[by_username(identity.email)])
        .await?;
    Ok(Json(summaries))
}

/// GET /api/v2/videolog/entries?profile=
pub async fn handle_list_video_groups(
    State(state): State<AppState>,
    identity: Option<Identity>,
    AppQuery(query): AppQuery<ProfileQuery>,
) -> Result<Json<VideoLogResponse>, AppError> {
    let requester = identity.as_ref().map(|i| i.email.as_str());
    let profile = resolve_visible_profile(state.video_log.as_ref(), &query, requester).await?;

    let videos = state
        .video_log
        .select_video_log_entries(&[by_username(profile.username.clone())])
        .await?;
    Ok(Json(VideoLogResponse {
        video_groups: group_by_month(videos),
        is_requester_owner: is_owner(&profile, requester),
    }))
}

/// GET /api/v2/videolog/summaries?profile=
pub async fn handle_list_summaries(
    State(state): State<AppState>,
    identity: Option<Identity>,
    AppQuery(query): AppQuery<ProfileQuery>,
) -> Result<Json<ProgressSummaryListResponse>, AppError> {
    let requester = identity.as_ref().map(|i| i.email.as_str());
    let profile = resolve_visible_profile(state.video_log.as_ref(), &query, requester).await?;

    let summaries = state
        .video_log
        .select_progress_summaries(&[by_username(profile.username.clone())])
        .await?;
    Ok(Json(ProgressSummaryListResponse {
        summaries,
        is_requester_owner: is_owner(&profile, requester),
    }))
}

/// POST /api/v2/videolog/summaries?profile=
pub async fn handle_upsert_summary(
    State(state): State<AppState>,
    identity: Identity,
    AppQuery(query): AppQuery<ProfileQuery>,
    AppJson(mut summary): AppJson<ProgressSummary>,
) -> Result<Json<ProgressSummary>, AppError> {
    let requester = Some(identity.email.as_str());
    let profile = resolve_visible_profile(state.video_log.as_ref(), &query, requester).await?;
    if !is_owner(&profile, requester) {
        return Err(AppError::Unauthorized(format!(
            "client {} does not have access to profile {}",
            identity.email, profile.id
        )));
    }
    if !(1..=12).contains(&summary.month) {
        return Err(AppError::Validation(format!(
            "month must be between 1 and 12, got {}",
            summary.month
        )));
    }
    if summary.title.trim().is_empty() {
        return Err(AppError::Validation("title is required".to_string()));
    }

    summary.username = profile.username;
    state.video_log.upsert_progress_summary(&mut summary).await?;
    Ok(Json(summary))
}

/// POST /videolog/entries/reload (v1 and v2)
pub async fn handle_reload_from_playlists(
    State(state): State<AppState>,
    identity: Identity,
    AppJson(request): AppJson<ReloadRequest>,
) -> Result<(StatusCode, Json<ReloadResponse>), AppError> {
    let reloader = Reloader {
        videos: state.video_log.as_ref(),
        practice_log: state.practice_log.as_ref(),
        platform: state.youtube.as_ref(),
    };
    let response = reloader.reload(&identity.email, &request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
