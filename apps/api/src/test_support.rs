//! In-memory backends for driving the real router in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use crate::auth::google::{GoogleUserInfo, TokenInfo, TokenVerifier};
use crate::auth::policy::AllowList;
use crate::auth::AuthError;
use crate::config::Config;
use crate::practice_log::models::{attach_children, Entry, Label, LabelDuration};
use crate::practice_log::store::PracticeLogStore;
use crate::practice_log::time_series::DatedDuration;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{SqlFilter, StoreError, LOG_ENTRY_TABLE, LOG_LABEL_TABLE};
use crate::video_log::models::{Privacy, Profile, ProgressSummary, VideoLogEntry};
use crate::video_log::store::{generate_profile_id, VideoLogStore};
use crate::youtube::{PlaylistItem, VideoPlatform, YouTubeError};

pub const OWNER: &str = "me@example.com";
pub const FRIEND: &str = "friend@example.com";

// ── Practice log ────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryPracticeLogStore {
    pub entries: Mutex<Vec<Entry>>,
    pub labels: Mutex<Vec<Label>>,
    /// When set, label reads fail like a lost database connection.
    pub fail_label_reads: AtomicBool,
}

fn entry_matches(entry: &Entry, filters: &[SqlFilter]) -> Result<bool, StoreError> {
    for filter in filters {
        let ok = match filter {
            SqlFilter::ById(id) => entry.id == *id,
            SqlFilter::ByLabelIds(ids) => {
                ids.is_empty() || entry.labels.iter().any(|l| ids.contains(&l.id))
            }
            SqlFilter::ByUsername(username) => entry.username == *username,
            SqlFilter::DateBefore(instant) => entry.date < *instant,
            SqlFilter::IsMonthlyProgress(_) => {
                return Err(StoreError::InvalidFilter("log_entries has no is_monthly_progress".into()))
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn label_matches(label: &Label, filters: &[SqlFilter]) -> Result<bool, StoreError> {
    for filter in filters {
        let ok = match filter {
            SqlFilter::ById(id) => label.id == *id,
            SqlFilter::ByLabelIds(ids) => ids.is_empty() || ids.contains(&label.id),
            SqlFilter::ByUsername(username) => label.username == *username,
            _ => return Err(StoreError::InvalidFilter("unsupported on log_labels".into())),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

impl MemoryPracticeLogStore {
    fn matching_entries(&self, filters: &[SqlFilter]) -> Result<Vec<Entry>, StoreError> {
        let mut out = Vec::new();
        for entry in self.entries.lock().unwrap().iter() {
            if entry_matches(entry, filters)? {
                out.push(entry.clone());
            }
        }
        out.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(out)
    }

    /// Labels as stored, so entries echo full label records like a join would.
    fn resolve_labels(&self, ids: &[Uuid]) -> Result<Vec<Label>, StoreError> {
        let labels = self.labels.lock().unwrap();
        ids.iter()
            .map(|id| {
                labels
                    .iter()
                    .find(|l| l.id == *id)
                    .cloned()
                    .ok_or_else(|| StoreError::InvalidFilter(format!("foreign key: label {id}")))
            })
            .collect()
    }
}

#[async_trait]
impl PracticeLogStore for MemoryPracticeLogStore {
    async fn count_log_entries(&self, filters: &[SqlFilter]) -> Result<i64, StoreError> {
        Ok(self.matching_entries(filters)?.len() as i64)
    }

    async fn select_log_entries(
        &self,
        limit: i64,
        offset: i64,
        filters: &[SqlFilter],
    ) -> Result<Vec<Entry>, StoreError> {
        Ok(self
            .matching_entries(filters)?
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn select_entry_durations(
        &self,
        filters: &[SqlFilter],
    ) -> Result<Vec<DatedDuration>, StoreError> {
        Ok(self
            .matching_entries(filters)?
            .into_iter()
            .map(|e| DatedDuration {
                date: e.date,
                duration: e.duration,
            })
            .collect())
    }

    async fn batch_insert_log_entries(&self, entries: &mut [Entry]) -> Result<(), StoreError> {
        let mut staged = Vec::with_capacity(entries.len());
        for entry in entries.iter_mut() {
            entry.id = Uuid::new_v4();
            let mut stored = entry.clone();
            stored.labels = self.resolve_labels(&entry.label_ids())?;
            staged.push(stored);
        }
        self.entries.lock().unwrap().extend(staged);
        Ok(())
    }

    async fn update_log_entry(&self, entry: &Entry) -> Result<(), StoreError> {
        let labels = self.resolve_labels(&entry.label_ids())?;
        let mut entries = self.entries.lock().unwrap();
        let stored = entries
            .iter_mut()
            .find(|e| e.id == entry.id && e.username == entry.username)
            .ok_or_else(|| StoreError::NoRowsAffected {
                table: LOG_ENTRY_TABLE,
                id: entry.id.to_string(),
            })?;
        *stored = Entry {
            labels,
            ..entry.clone()
        };
        Ok(())
    }

    async fn update_log_assignments(&self, entry: &Entry) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        let stored = entries
            .iter_mut()
            .find(|e| e.id == entry.id && e.username == entry.username)
            .ok_or_else(|| StoreError::NoRowsAffected {
                table: LOG_ENTRY_TABLE,
                id: entry.id.to_string(),
            })?;
        stored.assignments = entry.assignments.clone();
        Ok(())
    }

    async fn delete_log_entry(&self, username: &str, id: Uuid) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| !(e.id == id && e.username == username));
        if entries.len() == before {
            return Err(StoreError::NoRowsAffected {
                table: LOG_ENTRY_TABLE,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn sum_log_entry_duration(&self, filters: &[SqlFilter]) -> Result<i64, StoreError> {
        Ok(self
            .matching_entries(filters)?
            .iter()
            .map(|e| i64::from(e.duration))
            .sum())
    }

    async fn list_log_label_durations(
        &self,
        filters: &[SqlFilter],
    ) -> Result<Vec<LabelDuration>, StoreError> {
        let mut sums: HashMap<Uuid, i64> = HashMap::new();
        for entry in self.matching_entries(filters)? {
            for label in &entry.labels {
                *sums.entry(label.id).or_default() += i64::from(entry.duration);
            }
        }
        let mut out: Vec<LabelDuration> = sums
            .into_iter()
            .map(|(label_id, duration)| LabelDuration { label_id, duration })
            .collect();
        out.sort_by_key(|d| d.label_id);
        Ok(out)
    }

    async fn select_log_labels(&self, filters: &[SqlFilter]) -> Result<Vec<Label>, StoreError> {
        if self.fail_label_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Query(sqlx::Error::PoolTimedOut));
        }
        let mut out = Vec::new();
        for label in self.labels.lock().unwrap().iter() {
            if label_matches(label, filters)? {
                out.push(label.clone());
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        attach_children(&mut out);
        Ok(out)
    }

    async fn batch_insert_log_labels(&self, labels: &mut [Label]) -> Result<(), StoreError> {
        let mut stored = self.labels.lock().unwrap();
        for label in labels.iter_mut() {
            label.id = Uuid::new_v4();
            stored.push(label.clone());
        }
        Ok(())
    }

    async fn update_log_label(&self, label: &Label) -> Result<(), StoreError> {
        let mut labels = self.labels.lock().unwrap();
        let stored = labels
            .iter_mut()
            .find(|l| l.id == label.id && l.username == label.username)
            .ok_or_else(|| StoreError::NoRowsAffected {
                table: LOG_LABEL_TABLE,
                id: label.id.to_string(),
            })?;
        stored.name = label.name.clone();
        stored.parent_id = label.parent_id;
        Ok(())
    }

    async fn delete_log_label(&self, username: &str, id: Uuid) -> Result<(), StoreError> {
        let mut labels = self.labels.lock().unwrap();
        let before = labels.len();
        labels.retain(|l| !(l.id == id && l.username == username));
        if labels.len() == before {
            return Err(StoreError::NoRowsAffected {
                table: LOG_LABEL_TABLE,
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

// ── Video log ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryVideoLogStore {
    pub videos: Mutex<Vec<VideoLogEntry>>,
    pub summaries: Mutex<Vec<ProgressSummary>>,
    pub profiles: Mutex<Vec<Profile>>,
}

fn video_matches(video: &VideoLogEntry, filters: &[SqlFilter]) -> Result<bool, StoreError> {
    for filter in filters {
        let ok = match filter {
            SqlFilter::ByUsername(username) => video.username == *username,
            SqlFilter::IsMonthlyProgress(flag) => video.is_monthly_progress == *flag,
            SqlFilter::DateBefore(instant) => video.published < *instant,
            other => {
                return Err(StoreError::InvalidFilter(format!("unsupported in fake: {other:?}")))
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn username_filter(filters: &[SqlFilter]) -> Result<Option<&str>, StoreError> {
    let mut username = None;
    for filter in filters {
        match filter {
            SqlFilter::ByUsername(u) => username = Some(u.as_str()),
            other => {
                return Err(StoreError::InvalidFilter(format!("unsupported in fake: {other:?}")))
            }
        }
    }
    Ok(username)
}

#[async_trait]
impl VideoLogStore for MemoryVideoLogStore {
    async fn batch_upsert_video_log_entries(
        &self,
        entries: &[VideoLogEntry],
    ) -> Result<u64, StoreError> {
        let mut videos = self.videos.lock().unwrap();
        for entry in entries {
            match videos.iter_mut().find(|v| v.id == entry.id) {
                Some(existing) => *existing = entry.clone(),
                None => videos.push(entry.clone()),
            }
        }
        Ok(entries.len() as u64)
    }

    async fn select_video_log_entries(
        &self,
        filters: &[SqlFilter],
    ) -> Result<Vec<VideoLogEntry>, StoreError> {
        let mut out = Vec::new();
        for video in self.videos.lock().unwrap().iter() {
            if video_matches(video, filters)? {
                out.push(video.clone());
            }
        }
        out.sort_by(|a, b| b.published.cmp(&a.published));
        Ok(out)
    }

    async fn select_progress_summaries(
        &self,
        filters: &[SqlFilter],
    ) -> Result<Vec<ProgressSummary>, StoreError> {
        let username = username_filter(filters)?;
        let mut out: Vec<ProgressSummary> = self
            .summaries
            .lock()
            .unwrap()
            .iter()
            .filter(|s| username.map_or(true, |u| s.username == u))
            .cloned()
            .collect();
        out.sort_by(|a, b| (b.year, b.month).cmp(&(a.year, a.month)));
        Ok(out)
    }

    async fn upsert_progress_summary(
        &self,
        summary: &mut ProgressSummary,
    ) -> Result<(), StoreError> {
        let mut summaries = self.summaries.lock().unwrap();
        match summaries.iter_mut().find(|s| {
            s.username == summary.username && s.year == summary.year && s.month == summary.month
        }) {
            Some(existing) => {
                summary.id = existing.id;
                *existing = summary.clone();
            }
            None => {
                summary.id = Uuid::new_v4();
                summaries.push(summary.clone());
            }
        }
        Ok(())
    }

    async fn get_profile_by_id(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn get_profile_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Profile>, StoreError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.username == username)
            .cloned())
    }

    async fn upsert_profile(
        &self,
        username: &str,
        privacy: Privacy,
    ) -> Result<Profile, StoreError> {
        let mut profiles = self.profiles.lock().unwrap();
        if let Some(existing) = profiles.iter_mut().find(|p| p.username == username) {
            existing.privacy = privacy;
            return Ok(existing.clone());
        }
        let profile = Profile {
            id: generate_profile_id(),
            username: username.to_string(),
            privacy,
        };
        profiles.push(profile.clone());
        Ok(profile)
    }
}

// ── External services ───────────────────────────────────────────────────────

/// Playlists keyed by id; an `Err` stands in for an upstream failure.
#[derive(Default)]
pub struct FakePlatform {
    pub playlists: HashMap<String, Result<Vec<PlaylistItem>, String>>,
}

#[async_trait]
impl VideoPlatform for FakePlatform {
    async fn playlist_items(&self, playlist_id: &str) -> Result<Vec<PlaylistItem>, YouTubeError> {
        match self.playlists.get(playlist_id) {
            Some(Ok(items)) => Ok(items.clone()),
            Some(Err(message)) => Err(YouTubeError::Api {
                status: 500,
                message: message.clone(),
            }),
            None => Err(YouTubeError::Api {
                status: 404,
                message: format!("playlist {playlist_id} not found"),
            }),
        }
    }
}

/// Accepts tokens of the form `token:<email>`.
pub struct FakeVerifier;

#[async_trait]
impl TokenVerifier for FakeVerifier {
    async fn verify_id_token(&self, id_token: &str) -> Result<TokenInfo, AuthError> {
        let email = id_token
            .strip_prefix("token:")
            .ok_or_else(|| AuthError::InvalidToken(id_token.to_string()))?;
        Ok(TokenInfo {
            email: email.to_string(),
            scope: "openid email".to_string(),
            verified_email: true,
            expires_in: Some(3600),
        })
    }

    async fn user_info(&self, access_token: &str) -> Result<GoogleUserInfo, AuthError> {
        if access_token == "expired" {
            return Err(AuthError::Upstream("Google user info endpoint returned 401".into()));
        }
        Ok(GoogleUserInfo {
            id: "42".into(),
            email: OWNER.into(),
            name: "Practice Owner".into(),
            verified_email: true,
            ..Default::default()
        })
    }
}

// ── Harness ─────────────────────────────────────────────────────────────────

pub fn test_config(auth_enabled: bool) -> Config {
    Config {
        database_url: "postgres://unused".into(),
        port: 0,
        rust_log: "debug".into(),
        auth_enabled,
        allowed_emails: vec![OWNER.into(), FRIEND.into()],
        default_username: OWNER.into(),
        youtube_api_key: None,
        cors_allow_origin: None,
        run_migrations: false,
        db_max_connections: 1,
    }
}

pub struct TestApp {
    pub router: Router,
    pub practice_log: Arc<MemoryPracticeLogStore>,
    pub video_log: Arc<MemoryVideoLogStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_platform(FakePlatform::default())
    }

    pub fn with_platform(platform: FakePlatform) -> Self {
        Self::build(platform, test_config(true))
    }

    pub fn build(platform: FakePlatform, config: Config) -> Self {
        let practice_log = Arc::new(MemoryPracticeLogStore::default());
        let video_log = Arc::new(MemoryVideoLogStore::default());
        let state = AppState {
            policy: Arc::new(AllowList::new(&config.allowed_emails)),
            config,
            practice_log: practice_log.clone(),
            video_log: video_log.clone(),
            youtube: Arc::new(platform),
            verifier: Arc::new(FakeVerifier),
        };
        Self {
            router: build_router(state),
            practice_log,
            video_log,
        }
    }

    /// Sends a request as `user` (anonymous when `None`) and returns the
    /// status with the parsed JSON body (`Null` when empty).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer token:{user}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::String(
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, user: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, user, None).await
    }

    pub async fn post(&self, uri: &str, user: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, user, Some(body)).await
    }

    pub async fn put(&self, uri: &str, user: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, user, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, user, None).await
    }

    /// Creates a label through the API and returns its id.
    pub async fn create_label(&self, user: &str, name: &str, parent: Option<Uuid>) -> Uuid {
        let mut body = serde_json::json!({ "name": name });
        if let Some(parent) = parent {
            body["parent_id"] = Value::String(parent.to_string());
        }
        let (status, json) = self.post("/api/v1/log/labels", Some(user), body).await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["id"].as_str().unwrap().parse().unwrap()
    }

    /// Creates an entry through the API and returns its id.
    pub async fn create_entry(&self, user: &str, date: &str, minutes: i32, labels: &[Uuid]) -> Uuid {
        let labels: Vec<Value> = labels
            .iter()
            .map(|id| serde_json::json!({ "id": id }))
            .collect();
        let body = serde_json::json!({
            "date": date,
            "duration": minutes,
            "message": "practice",
            "labels": labels,
        });
        let (status, json) = self.post("/api/v1/log/entries", Some(user), body).await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["id"].as_str().unwrap().parse().unwrap()
    }
}
