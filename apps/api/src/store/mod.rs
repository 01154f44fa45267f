//! Shared persistence plumbing for the practice-log and video-log stores.

pub mod filters;

use sqlx::postgres::PgQueryResult;
use thiserror::Error;

pub use filters::{
    by_id, by_label_ids, by_username, date_before, is_monthly_progress, SqlFilter, Table,
};

pub const LOG_ENTRY_TABLE: &str = "log_entries";
pub const LOG_LABEL_TABLE: &str = "log_labels";
pub const ASSOCIATION_LOG_ENTRY_LABEL_TABLE: &str = "association_log_entries_labels";
pub const VIDEO_LOG_ENTRY_TABLE: &str = "video_log_entries";
pub const VIDEO_LOG_PROFILE_TABLE: &str = "video_log_profiles";
pub const PROGRESS_SUMMARY_TABLE: &str = "progress_summaries";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    /// An UPDATE or DELETE matched nothing.
    #[error("no row was affected in {table} for {id}")]
    NoRowsAffected { table: &'static str, id: String },

    #[error("failed to construct query: {0}")]
    InvalidFilter(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_foreign_key_violation(&self) -> bool {
        match self {
            StoreError::Query(sqlx::Error::Database(db_err)) => db_err.is_foreign_key_violation(),
            _ => false,
        }
    }
}

/// Promotes "zero rows affected" into an explicit error.
pub fn require_rows_affected(
    result: PgQueryResult,
    table: &'static str,
    id: impl ToString,
) -> Result<u64, StoreError> {
    match result.rows_affected() {
        0 => Err(StoreError::NoRowsAffected {
            table,
            id: id.to_string(),
        }),
        n => Ok(n),
    }
}
