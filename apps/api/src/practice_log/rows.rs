//! Persisted row shapes and their conversion to and from domain models.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::models::{Assignment, Entry, Label, LabelDuration};
use super::time_series::DatedDuration;

#[derive(Debug, Clone, FromRow)]
pub struct LogEntryRow {
    pub id: Uuid,
    pub username: String,
    pub date: DateTime<Utc>,
    pub duration: i32,
    pub message: String,
    pub details: String,
    pub assignments: Json<Vec<Assignment>>,
}

impl LogEntryRow {
    pub fn from_model(entry: &Entry) -> Self {
        Self {
            id: entry.id,
            username: entry.username.clone(),
            date: entry.date,
            duration: entry.duration,
            message: entry.message.clone(),
            details: entry.details.clone(),
            assignments: Json(entry.assignments.clone()),
        }
    }

    /// Labels are loaded separately and start empty.
    pub fn into_model(self) -> Entry {
        Entry {
            id: self.id,
            username: self.username,
            date: self.date,
            duration: self.duration,
            labels: Vec::new(),
            message: self.message,
            details: self.details,
            assignments: self.assignments.0,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct LogLabelRow {
    pub id: Uuid,
    pub username: String,
    pub parent_id: Option<Uuid>,
    pub name: String,
}

impl LogLabelRow {
    pub fn from_model(label: &Label) -> Self {
        Self {
            id: label.id,
            username: label.username.clone(),
            parent_id: label.parent_id,
            name: label.name.clone(),
        }
    }

    pub fn into_model(self) -> Label {
        Label {
            id: self.id,
            username: self.username,
            parent_id: self.parent_id,
            name: self.name,
            children: Vec::new(),
        }
    }
}

/// A label joined through the association table to the entry it is attached to.
#[derive(Debug, Clone, FromRow)]
pub struct EntryLabelRow {
    pub entry_id: Uuid,
    pub label_id: Uuid,
    pub username: String,
    pub parent_id: Option<Uuid>,
    pub name: String,
}

impl EntryLabelRow {
    pub fn into_model(self) -> (Uuid, Label) {
        (
            self.entry_id,
            Label {
                id: self.label_id,
                username: self.username,
                parent_id: self.parent_id,
                name: self.name,
                children: Vec::new(),
            },
        )
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct LabelDurationRow {
    pub label_id: Uuid,
    pub duration: i64,
}

impl From<LabelDurationRow> for LabelDuration {
    fn from(row: LabelDurationRow) -> Self {
        LabelDuration {
            label_id: row.label_id,
            duration: row.duration,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DatedDurationRow {
    pub date: DateTime<Utc>,
    pub duration: i32,
}

impl From<DatedDurationRow> for DatedDuration {
    fn from(row: DatedDurationRow) -> Self {
        DatedDuration {
            date: row.date,
            duration: row.duration,
        }
    }
}
