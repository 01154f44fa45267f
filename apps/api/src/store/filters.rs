//! Composable equality filters appended to a `QueryBuilder` as bound parameters.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::{StoreError, ASSOCIATION_LOG_ENTRY_LABEL_TABLE};

#[derive(Debug, Clone, PartialEq)]
pub enum SqlFilter {
    ById(Uuid),
    /// Rows associated with any of the labels. An empty list restricts nothing.
    ByLabelIds(Vec<Uuid>),
    ByUsername(String),
    IsMonthlyProgress(bool),
    /// Strictly earlier than the instant, on the table's date column.
    DateBefore(DateTime<Utc>),
}

pub fn by_id(id: Uuid) -> SqlFilter {
    SqlFilter::ById(id)
}

pub fn by_label_ids(ids: impl Into<Vec<Uuid>>) -> SqlFilter {
    SqlFilter::ByLabelIds(ids.into())
}

pub fn by_username(username: impl Into<String>) -> SqlFilter {
    SqlFilter::ByUsername(username.into())
}

pub fn is_monthly_progress(val: bool) -> SqlFilter {
    SqlFilter::IsMonthlyProgress(val)
}

pub fn date_before(instant: DateTime<Utc>) -> SqlFilter {
    SqlFilter::DateBefore(instant)
}

/// Tables a filter can be applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    LogEntries,
    LogLabels,
    VideoLogEntries,
    ProgressSummaries,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::LogEntries => super::LOG_ENTRY_TABLE,
            Table::LogLabels => super::LOG_LABEL_TABLE,
            Table::VideoLogEntries => super::VIDEO_LOG_ENTRY_TABLE,
            Table::ProgressSummaries => super::PROGRESS_SUMMARY_TABLE,
        }
    }

    fn date_column(self) -> Option<&'static str> {
        match self {
            Table::LogEntries => Some("date"),
            Table::VideoLogEntries => Some("published"),
            Table::LogLabels | Table::ProgressSummaries => None,
        }
    }
}

/// Appends ` WHERE a AND b ...` for the given filters. Nothing is appended
/// when no filter restricts anything.
pub fn push_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    table: Table,
    filters: &[SqlFilter],
) -> Result<(), StoreError> {
    let t = table.name();
    let mut first = true;

    for filter in filters {
        if matches!(filter, SqlFilter::ByLabelIds(ids) if ids.is_empty()) {
            continue;
        }
        qb.push(if first { " WHERE " } else { " AND " });
        first = false;

        match filter {
            SqlFilter::ById(id) => match table {
                Table::LogEntries | Table::LogLabels | Table::ProgressSummaries => {
                    qb.push(format!("{t}.id = "));
                    qb.push_bind(*id);
                }
                Table::VideoLogEntries => return Err(unsupported("id (uuid)", table)),
            },
            SqlFilter::ByLabelIds(ids) => match table {
                Table::LogEntries => {
                    // Subquery keeps an entry counted once however many labels match.
                    qb.push(format!(
                        "{t}.id IN (SELECT entry_id FROM {ASSOCIATION_LOG_ENTRY_LABEL_TABLE} WHERE label_id = ANY("
                    ));
                    qb.push_bind(ids.clone());
                    qb.push("))");
                }
                Table::LogLabels => {
                    qb.push(format!("{t}.id = ANY("));
                    qb.push_bind(ids.clone());
                    qb.push(")");
                }
                _ => return Err(unsupported("label_id", table)),
            },
            SqlFilter::ByUsername(username) => {
                qb.push(format!("{t}.username = "));
                qb.push_bind(username.clone());
            }
            SqlFilter::IsMonthlyProgress(val) => match table {
                Table::VideoLogEntries => {
                    qb.push(format!("{t}.is_monthly_progress = "));
                    qb.push_bind(*val);
                }
                _ => return Err(unsupported("is_monthly_progress", table)),
            },
            SqlFilter::DateBefore(instant) => match table.date_column() {
                Some(column) => {
                    qb.push(format!("{t}.{column} < "));
                    qb.push_bind(*instant);
                }
                None => return Err(unsupported("date", table)),
            },
        }
    }
    Ok(())
}

fn unsupported(column: &str, table: Table) -> StoreError {
    StoreError::InvalidFilter(format!("{} has no {column} column to filter on", table.name()))
}
