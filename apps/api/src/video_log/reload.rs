//! Rebuilds a user's video log from their YouTube playlists.
//!
//! Each playlist is fetched in full, converted into video log entries (with a
//! snapshot of the practice minutes logged before each upload) and upserted
//! in one transaction. Playlists are processed independently: a failing one
//! does not stop the other, and every failure is reported together.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::models::{Orientation, Privacy, VideoLogEntry};
use super::store::VideoLogStore;
use crate::errors::{AppError, ErrorList};
use crate::practice_log::store::PracticeLogStore;
use crate::store::{by_username, date_before, StoreError};
use crate::youtube::{VideoPlatform, YouTubeError};

/// Titles carrying this marker were recorded for a vertical screen.
const PORTRAIT_MARKER: &str = "AR 9:16";

#[derive(Debug, Default, Deserialize)]
pub struct ReloadRequest {
    #[serde(default)]
    pub monthly_progress_playlist_id: Option<String>,
    #[serde(default)]
    pub practice_recording_playlist_id: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReloadResponse {
    pub monthly_progress_video_count: u64,
    pub practice_recording_video_count: u64,
}

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("YouTube API has returned 0 items for playlist {0}")]
    EmptyPlaylist(String),

    #[error("failed to list playlist {playlist_id}: {source}")]
    Listing {
        playlist_id: String,
        #[source]
        source: YouTubeError,
    },

    #[error("failed to sum log entry duration for video {video_id} {title}: {source}")]
    Snapshot {
        video_id: String,
        title: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to save videos of playlist {playlist_id}: {source}")]
    Upsert {
        playlist_id: String,
        #[source]
        source: StoreError,
    },
}

pub struct Reloader<'a> {
    pub videos: &'a dyn VideoLogStore,
    pub practice_log: &'a dyn PracticeLogStore,
    pub platform: &'a dyn VideoPlatform,
}

pub fn orientation_for_title(title: &str) -> Orientation {
    if title.contains(PORTRAIT_MARKER) {
        Orientation::Portrait
    } else {
        Orientation::Landscape
    }
}

fn non_blank(id: &Option<String>) -> Option<&str> {
    id.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Reloader<'_> {
    pub async fn reload(
        &self,
        username: &str,
        request: &ReloadRequest,
    ) -> Result<ReloadResponse, AppError> {
        let monthly = non_blank(&request.monthly_progress_playlist_id);
        let practice = non_blank(&request.practice_recording_playlist_id);
        if monthly.is_none() && practice.is_none() {
            return Err(AppError::Validation(
                "at least one playlist ID is required in body payload keys=[practice_recording_playlist_id, monthly_progress_playlist_id]"
                    .to_string(),
            ));
        }

        if self.videos.get_profile_by_username(username).await?.is_none() {
            let profile = self.videos.upsert_profile(username, Privacy::Private).await?;
            info!("Created {} video log profile {} for {username}", profile.privacy, profile.id);
        }

        let mut response = ReloadResponse::default();
        let mut outcomes: Vec<Result<(), ReloadError>> = Vec::new();

        if let Some(id) = monthly {
            outcomes.push(
                self.sync_playlist(id, username, true)
                    .await
                    .map(|n| response.monthly_progress_video_count = n),
            );
        }
        if let Some(id) = practice {
            outcomes.push(
                self.sync_playlist(id, username, false)
                    .await
                    .map(|n| response.practice_recording_video_count = n),
            );
        }

        match ErrorList::concat(outcomes) {
            Some(errors) => {
                warn!(
                    "{} playlist reload(s) failed for {username}",
                    errors.messages().len()
                );
                Err(errors.into())
            }
            None => Ok(response),
        }
    }

    async fn sync_playlist(
        &self,
        playlist_id: &str,
        username: &str,
        is_monthly_progress: bool,
    ) -> Result<u64, ReloadError> {
        let videos = self
            .load_playlist(playlist_id, username, is_monthly_progress)
            .await
            .inspect_err(|e| warn!("Reload of playlist {playlist_id} failed: {e}"))?;

        let count = self
            .videos
            .batch_upsert_video_log_entries(&videos)
            .await
            .map_err(|source| ReloadError::Upsert {
                playlist_id: playlist_id.to_string(),
                source,
            })?;
        info!("Reloaded {count} videos from playlist {playlist_id} for {username}");
        Ok(count)
    }

    pub async fn load_playlist(
        &self,
        playlist_id: &str,
        username: &str,
        is_monthly_progress: bool,
    ) -> Result<Vec<VideoLogEntry>, ReloadError> {
        let items = self
            .platform
            .playlist_items(playlist_id)
            .await
            .map_err(|source| ReloadError::Listing {
                playlist_id: playlist_id.to_string(),
                source,
            })?;
        if items.is_empty() {
            return Err(ReloadError::EmptyPlaylist(playlist_id.to_string()));
        }

        let mut videos = Vec::with_capacity(items.len());
        for item in items {
            // Deleted and private videos have no publish time.
            let Some(published) = item.content_details.video_published_at else {
                continue;
            };

            let minutes = self
                .practice_log
                .sum_log_entry_duration(&[by_username(username), date_before(published)])
                .await
                .map_err(|source| ReloadError::Snapshot {
                    video_id: item.content_details.video_id.clone(),
                    title: item.snippet.title.clone(),
                    source,
                })?;

            videos.push(VideoLogEntry {
                id: item.content_details.video_id,
                username: username.to_string(),
                published,
                video_orientation: orientation_for_title(&item.snippet.title),
                title: item.snippet.title,
                description: item.snippet.description,
                is_monthly_progress,
                thumbnails: item.snippet.thumbnails,
                minutes_of_guitar_practice: i32::try_from(minutes).unwrap_or(i32::MAX),
            });
        }

        Ok(videos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portrait_marker_in_title() {
        assert_eq!(orientation_for_title("Blues in A AR 9:16"), Orientation::Portrait);
        assert_eq!(orientation_for_title("AR 9:16 | Sweep picking"), Orientation::Portrait);
    }

    #[test]
    fn test_landscape_by_default() {
        assert_eq!(orientation_for_title("Blues in A"), Orientation::Landscape);
        assert_eq!(orientation_for_title("AR 16:9"), Orientation::Landscape);
    }

    #[test]
    fn test_blank_playlist_id_counts_as_missing() {
        assert_eq!(non_blank(&Some("  ".into())), None);
        assert_eq!(non_blank(&Some("PL1".into())), Some("PL1"));
        assert_eq!(non_blank(&None), None);
    }
}
