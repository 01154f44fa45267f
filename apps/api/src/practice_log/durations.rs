use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::handlers::parse_label_ids;
use super::models::{Label, LabelDuration};
use super::time_series::{
    build_time_series, Granularity, SeriesMode, TimeSeriesDataPoint, UnknownGranularity,
};
use crate::auth::Identity;
use crate::errors::AppError;
use crate::extract::{AppPath, AppQuery};
use crate::state::AppState;
use crate::store::{by_id, by_label_ids, by_username};

#[derive(Debug, Serialize)]
pub struct LabelDurationListResponse {
    pub count: usize,
    pub results: Vec<LabelDuration>,
}

#[derive(Debug, Serialize)]
pub struct LabelDurationResponse {
    #[serde(flatten)]
    pub label: Label,
    pub duration: i64,
}

#[derive(Debug, Serialize)]
pub struct TotalDurationResponse {
    pub in_minutes: i64,
    pub in_hours: f64,
}

#[derive(Debug, Serialize)]
pub struct TimeSeriesResponse {
    pub count: usize,
    pub time_series: Vec<TimeSeriesDataPoint>,
    pub group: Granularity,
}

#[derive(Debug, Default, Deserialize)]
pub struct LabelIdsQuery {
    pub label_ids: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GroupQuery {
    pub group: Option<String>,
}

/// GET /log/labels/duration
pub async fn handle_list_label_durations(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<LabelDurationListResponse>, AppError> {
    let durations = state
        .practice_log
        .list_log_label_durations(&[by_username(identity.email)])
        .await?;
    Ok(Json(LabelDurationListResponse {
        count: durations.len(),
        results: durations,
    }))
}

/// GET /log/labels/:label_id/duration
pub async fn handle_get_label_duration(
    State(state): State<AppState>,
    identity: Identity,
    AppPath(label_id): AppPath<Uuid>,
) -> Result<Json<LabelDurationResponse>, AppError> {
    let label = state
        .practice_log
        .select_log_labels(&[by_username(identity.email.clone()), by_id(label_id)])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound(format!("label {label_id} not found")))?;

    let duration = state
        .practice_log
        .sum_log_entry_duration(&[by_username(identity.email), by_label_ids(vec![label_id])])
        .await?;
    Ok(Json(LabelDurationResponse { label, duration }))
}

/// GET /log/entries/duration
pub async fn handle_get_total_duration(
    State(state): State<AppState>,
    identity: Identity,
    AppQuery(query): AppQuery<LabelIdsQuery>,
) -> Result<Json<TotalDurationResponse>, AppError> {
    let filters = [
        by_username(identity.email),
        by_label_ids(parse_label_ids(query.label_ids.as_deref())?),
    ];
    let in_minutes = state.practice_log.sum_log_entry_duration(&filters).await?;
    Ok(Json(TotalDurationResponse {
        in_minutes,
        in_hours: in_minutes as f64 / 60.0,
    }))
}

async fn time_series(
    state: &AppState,
    identity: Identity,
    query: GroupQuery,
    cumulative: bool,
) -> Result<Json<TimeSeriesResponse>, AppError> {
    let granularity: Granularity = query
        .group
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|e: UnknownGranularity| AppError::Validation(e.to_string()))?;

    let durations = state
        .practice_log
        .select_entry_durations(&[by_username(identity.email)])
        .await?;
    let points = build_time_series(
        &durations,
        SeriesMode {
            granularity,
            cumulative,
        },
    );

    Ok(Json(TimeSeriesResponse {
        count: durations.len(),
        time_series: points,
        group: granularity,
    }))
}

/// GET /log/entries/duration/time-series?group=
pub async fn handle_duration_time_series(
    State(state): State<AppState>,
    identity: Identity,
    AppQuery(query): AppQuery<GroupQuery>,
) -> Result<Json<TimeSeriesResponse>, AppError> {
    time_series(&state, identity, query, false).await
}

/// GET /log/entries/duration/accum-time-series?group=
pub async fn handle_accum_duration_time_series(
    State(state): State<AppState>,
    identity: Identity,
    AppQuery(query): AppQuery<GroupQuery>,
) -> Result<Json<TimeSeriesResponse>, AppError> {
    time_series(&state, identity, query, true).await
}
