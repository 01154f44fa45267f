//! YouTube Data API client. Only playlist listing is needed: the video log is
//! rebuilt from the items of the owner's playlists.
use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const PLAYLIST_ITEMS_URL: &str = "https://www.googleapis.com/youtube/v3/playlistItems";
const MAX_RESULTS_PER_PAGE: u32 = 50;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum YouTubeError {
    #[error("YouTube request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("YouTube API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("YouTube API key is not configured")]
    MissingApiKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnails: HashMap<String, Thumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDetails {
    pub video_id: String,
    /// Absent for deleted or private videos.
    #[serde(default)]
    pub video_published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    pub snippet: Snippet,
    pub content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemListResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleApiError {
    error: GoogleApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleApiErrorBody {
    message: String,
}

/// Source of playlist contents. `AppState` carries it as `Arc<dyn VideoPlatform>`.
#[async_trait]
pub trait VideoPlatform: Send + Sync {
    /// Every item of the playlist, across all result pages.
    async fn playlist_items(&self, playlist_id: &str) -> Result<Vec<PlaylistItem>, YouTubeError>;
}

#[derive(Clone)]
pub struct YouTubeClient {
    client: Client,
    api_key: Option<String>,
}

impl YouTubeClient {
    pub fn new(api_key: Option<String>) -> Result<Self, YouTubeError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
        })
    }

    async fn fetch_page(
        &self,
        api_key: &str,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemListResponse, YouTubeError> {
        let max_results = MAX_RESULTS_PER_PAGE.to_string();
        let mut query = vec![
            ("part", "snippet,contentDetails"),
            ("maxResults", max_results.as_str()),
            ("playlistId", playlist_id),
            ("key", api_key),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self.client.get(PLAYLIST_ITEMS_URL).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GoogleApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!("YouTube API returned {status} for playlist {playlist_id}: {message}");
            return Err(YouTubeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl VideoPlatform for YouTubeClient {
    async fn playlist_items(&self, playlist_id: &str) -> Result<Vec<PlaylistItem>, YouTubeError> {
        let api_key = self.api_key.as_deref().ok_or(YouTubeError::MissingApiKey)?;

        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self
                .fetch_page(api_key, playlist_id, page_token.as_deref())
                .await?;
            items.extend(page.items);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!("Fetched {} items from playlist {playlist_id}", items.len());
        Ok(items)
    }
}
