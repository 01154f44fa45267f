use axum::{extract::State, Json};
use serde::Deserialize;

use super::models::{Privacy, Profile};
use super::store::VideoLogStore;
use crate::auth::Identity;
use crate::errors::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

/// Owners always see their own profile; anyone else only when it is public.
pub fn can_view(profile: &Profile, requester: Option<&str>) -> bool {
    requester == Some(profile.username.as_str()) || profile.privacy == Privacy::Public
}

pub fn is_owner(profile: &Profile, requester: Option<&str>) -> bool {
    requester == Some(profile.username.as_str())
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileQuery {
    pub profile: Option<String>,
}

/// Looks up `?profile=` and applies the visibility gate.
pub async fn resolve_visible_profile(
    store: &dyn VideoLogStore,
    query: &ProfileQuery,
    requester: Option<&str>,
) -> Result<Profile, AppError> {
    let profile_id = query
        .profile
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::Validation("query param ?profile= is required".to_string()))?;

    let profile = store
        .get_profile_by_id(profile_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("video log profile {profile_id} not found")))?;

    if !can_view(&profile, requester) {
        return Err(AppError::Unauthorized("profile is not public".to_string()));
    }
    Ok(profile)
}

#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    pub privacy: Privacy,
}

/// GET /api/v2/videolog/profiles/me
pub async fn handle_get_my_profile(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Profile>, AppError> {
    state
        .video_log
        .get_profile_by_username(&identity.email)
        .await?
        .map(Json)
        .ok_or_else(|| {
            AppError::NotFound(format!("video log profile not found for user {}", identity.email))
        })
}

/// PUT /api/v2/videolog/profiles/me
pub async fn handle_update_my_profile(
    State(state): State<AppState>,
    identity: Identity,
    AppJson(update): AppJson<ProfileUpdate>,
) -> Result<Json<Profile>, AppError> {
    let profile = state
        .video_log
        .upsert_profile(&identity.email, update.privacy)
        .await?;
    Ok(Json(profile))
}
