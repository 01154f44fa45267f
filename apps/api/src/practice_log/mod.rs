//! Practice sessions, their labels, and the duration reports built from them.

pub mod durations;
pub mod handlers;
pub mod models;
pub mod rows;
pub mod store;
pub mod time_series;
pub mod validation;

use axum::{
    routing::{get, put},
    Router,
};

use crate::state::AppState;

/// Routes mounted identically under `/api/v1` and `/api/v2`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/log/labels",
            get(handlers::handle_list_labels).post(handlers::handle_create_label),
        )
        .route(
            "/log/labels/duration",
            get(durations::handle_list_label_durations),
        )
        .route(
            "/log/labels/:label_id",
            put(handlers::handle_update_label).delete(handlers::handle_delete_label),
        )
        .route(
            "/log/labels/:label_id/duration",
            get(durations::handle_get_label_duration),
        )
        .route(
            "/log/entries",
            get(handlers::handle_list_entries).post(handlers::handle_create_entry),
        )
        .route(
            "/log/entries/duration",
            get(durations::handle_get_total_duration),
        )
        .route(
            "/log/entries/duration/time-series",
            get(durations::handle_duration_time_series),
        )
        .route(
            "/log/entries/duration/accum-time-series",
            get(durations::handle_accum_duration_time_series),
        )
        .route(
            "/log/entries/:entry_id",
            put(handlers::handle_update_entry).delete(handlers::handle_delete_entry),
        )
        .route(
            "/log/entries/:entry_id/assignments",
            put(handlers::handle_update_entry_assignments),
        )
}
