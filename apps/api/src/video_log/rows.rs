use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::models::{Profile, ProgressSummary, VideoLogEntry};
use crate::store::StoreError;
use crate::youtube::Thumbnail;

#[derive(Debug, Clone, FromRow)]
pub struct VideoLogEntryRow {
    pub id: String,
    pub username: String,
    pub published: DateTime<Utc>,
    pub video_orientation: String,
    pub title: String,
    pub description: String,
    pub is_monthly_progress: bool,
    pub thumbnails: Json<HashMap<String, Thumbnail>>,
    pub minutes_of_guitar_practice: i32,
}

impl VideoLogEntryRow {
    pub fn from_model(entry: &VideoLogEntry) -> Self {
        Self {
            id: entry.id.clone(),
            username: entry.username.clone(),
            published: entry.published,
            video_orientation: entry.video_orientation.as_str().to_string(),
            title: entry.title.clone(),
            description: entry.description.clone(),
            is_monthly_progress: entry.is_monthly_progress,
            thumbnails: Json(entry.thumbnails.clone()),
            minutes_of_guitar_practice: entry.minutes_of_guitar_practice,
        }
    }

    pub fn into_model(self) -> Result<VideoLogEntry, StoreError> {
        Ok(VideoLogEntry {
            video_orientation: self
                .video_orientation
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("video {}: {e}", self.id)))?,
            id: self.id,
            username: self.username,
            published: self.published,
            title: self.title,
            description: self.description,
            is_monthly_progress: self.is_monthly_progress,
            thumbnails: self.thumbnails.0,
            minutes_of_guitar_practice: self.minutes_of_guitar_practice,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub id: String,
    pub username: String,
    pub privacy: String,
}

impl ProfileRow {
    pub fn into_model(self) -> Result<Profile, StoreError> {
        Ok(Profile {
            privacy: self
                .privacy
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("profile {}: {e}", self.id)))?,
            id: self.id,
            username: self.username,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ProgressSummaryRow {
    pub id: Uuid,
    pub username: String,
    pub year: i32,
    pub month: i32,
    pub title: String,
    pub subtitle: String,
    pub body: String,
}

impl From<ProgressSummaryRow> for ProgressSummary {
    fn from(row: ProgressSummaryRow) -> Self {
        ProgressSummary {
            id: row.id,
            username: row.username,
            year: row.year,
            month: row.month,
            title: row.title,
            subtitle: row.subtitle,
            body: row.body,
        }
    }
}
