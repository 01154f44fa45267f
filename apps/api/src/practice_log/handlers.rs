use std::collections::HashSet;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::models::{Entry, Label};
use super::store::PracticeLogStore;
use super::validation::{ensure_ids_match, validate_assignments, validate_entry, validate_label};
use crate::auth::Identity;
use crate::errors::AppError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::state::AppState;
use crate::store::{by_id, by_label_ids, by_username};

pub const DEFAULT_PAGE_LIMIT: i64 = 50;

#[derive(Debug, Serialize)]
pub struct IdResponse {
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct LabelListResponse {
    pub count: usize,
    pub results: Vec<Label>,
}

#[derive(Debug, Serialize)]
pub struct EntryListResponse {
    pub count: usize,
    pub results: Vec<Entry>,
    pub more: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct EntryListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub label_ids: Option<String>,
}

/// Parses `?label_ids=a,b,c`. Blank input means no label restriction.
pub fn parse_label_ids(raw: Option<&str>) -> Result<Vec<Uuid>, AppError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Uuid::parse_str(s)
                .map_err(|_| AppError::Validation(format!("label_ids contains an invalid UUID: {s}")))
        })
        .collect()
}

/// Every referenced label must exist and belong to `username`.
pub async fn ensure_labels_exist(
    store: &dyn PracticeLogStore,
    username: &str,
    ids: &[Uuid],
) -> Result<(), AppError> {
    let wanted: HashSet<Uuid> = ids.iter().copied().collect();
    if wanted.is_empty() {
        return Ok(());
    }

    let found: HashSet<Uuid> = store
        .select_log_labels(&[by_username(username), by_label_ids(ids.to_vec())])
        .await?
        .into_iter()
        .map(|l| l.id)
        .collect();

    let mut missing: Vec<String> = wanted.difference(&found).map(Uuid::to_string).collect();
    if missing.is_empty() {
        return Ok(());
    }
    missing.sort();
    Err(AppError::Validation(format!(
        "labels do not exist: {}",
        missing.join(", ")
    )))
}

async fn ensure_parent_exists(
    store: &dyn PracticeLogStore,
    label: &Label,
) -> Result<(), AppError> {
    match label.parent_id {
        Some(parent_id) => match ensure_labels_exist(store, &label.username, &[parent_id]).await {
            Err(AppError::Validation(_)) => Err(AppError::Validation(format!(
                "parent label {parent_id} does not exist"
            ))),
            other => other,
        },
        None => Ok(()),
    }
}

// ── Labels ──────────────────────────────────────────────────────────────────

/// GET /log/labels
pub async fn handle_list_labels(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<LabelListResponse>, AppError> {
    let labels = state
        .practice_log
        .select_log_labels(&[by_username(identity.email)])
        .await?;
    Ok(Json(LabelListResponse {
        count: labels.len(),
        results: labels,
    }))
}

/// POST /log/labels
pub async fn handle_create_label(
    State(state): State<AppState>,
    identity: Identity,
    AppJson(mut label): AppJson<Label>,
) -> Result<(StatusCode, Json<IdResponse>), AppError> {
    label.username = identity.email;
    label.children.clear();
    validate_label(&label)?;
    ensure_parent_exists(state.practice_log.as_ref(), &label).await?;

    let mut labels = [label];
    state.practice_log.batch_insert_log_labels(&mut labels).await?;
    Ok((StatusCode::CREATED, Json(IdResponse { id: labels[0].id })))
}

/// PUT /log/labels/:label_id
pub async fn handle_update_label(
    State(state): State<AppState>,
    identity: Identity,
    AppPath(label_id): AppPath<Uuid>,
    AppJson(mut label): AppJson<Label>,
) -> Result<Json<Label>, AppError> {
    ensure_ids_match(label_id, label.id, "label")?;
    label.username = identity.email;
    label.children.clear();
    validate_label(&label)?;
    ensure_parent_exists(state.practice_log.as_ref(), &label).await?;

    state.practice_log.update_log_label(&label).await?;
    Ok(Json(label))
}

/// DELETE /log/labels/:label_id
pub async fn handle_delete_label(
    State(state): State<AppState>,
    identity: Identity,
    AppPath(label_id): AppPath<Uuid>,
) -> Result<Json<IdResponse>, AppError> {
    state
        .practice_log
        .delete_log_label(&identity.email, label_id)
        .await?;
    Ok(Json(IdResponse { id: label_id }))
}

// ── Entries ─────────────────────────────────────────────────────────────────

/// GET /log/entries
pub async fn handle_list_entries(
    State(state): State<AppState>,
    identity: Identity,
    AppQuery(query): AppQuery<EntryListQuery>,
) -> Result<Json<EntryListResponse>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    let offset = query.offset.unwrap_or(0);
    if limit < 0 || offset < 0 {
        return Err(AppError::Validation(
            "limit and offset must not be negative".to_string(),
        ));
    }

    let filters = [
        by_username(identity.email),
        by_label_ids(parse_label_ids(query.label_ids.as_deref())?),
    ];
    let total = state.practice_log.count_log_entries(&filters).await?;
    let entries = state
        .practice_log
        .select_log_entries(limit, offset, &filters)
        .await?;

    Ok(Json(EntryListResponse {
        count: entries.len(),
        results: entries,
        more: total > limit.saturating_add(offset),
    }))
}

/// POST /log/entries
pub async fn handle_create_entry(
    State(state): State<AppState>,
    identity: Identity,
    AppJson(mut entry): AppJson<Entry>,
) -> Result<(StatusCode, Json<IdResponse>), AppError> {
    entry.username = identity.email;
    validate_entry(&mut entry)?;
    ensure_labels_exist(state.practice_log.as_ref(), &entry.username, &entry.label_ids()).await?;

    let mut entries = [entry];
    state.practice_log.batch_insert_log_entries(&mut entries).await?;
    Ok((StatusCode::CREATED, Json(IdResponse { id: entries[0].id })))
}

/// PUT /log/entries/:entry_id
pub async fn handle_update_entry(
    State(state): State<AppState>,
    identity: Identity,
    AppPath(entry_id): AppPath<Uuid>,
    AppJson(mut entry): AppJson<Entry>,
) -> Result<Json<Entry>, AppError> {
    ensure_ids_match(entry_id, entry.id, "entry")?;
    entry.username = identity.email;
    validate_entry(&mut entry)?;
    ensure_labels_exist(state.practice_log.as_ref(), &entry.username, &entry.label_ids()).await?;

    state.practice_log.update_log_entry(&entry).await?;
    Ok(Json(entry))
}

/// PUT /log/entries/:entry_id/assignments
pub async fn handle_update_entry_assignments(
    State(state): State<AppState>,
    identity: Identity,
    AppPath(entry_id): AppPath<Uuid>,
    AppJson(mut entry): AppJson<Entry>,
) -> Result<Json<Entry>, AppError> {
    ensure_ids_match(entry_id, entry.id, "entry")?;
    entry.username = identity.email;
    validate_assignments(&entry.assignments)?;

    state.practice_log.update_log_assignments(&entry).await?;

    let mut stored = state
        .practice_log
        .select_log_entries(1, 0, &[by_id(entry_id), by_username(entry.username.clone())])
        .await?;
    stored
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("log entry {entry_id} not found")))
}

/// DELETE /log/entries/:entry_id
pub async fn handle_delete_entry(
    State(state): State<AppState>,
    identity: Identity,
    AppPath(entry_id): AppPath<Uuid>,
) -> Result<Json<IdResponse>, AppError> {
    state
        .practice_log
        .delete_log_entry(&identity.email, entry_id)
        .await?;
    Ok(Json(IdResponse { id: entry_id }))
}
