//! YouTube-backed video log: practice recordings, monthly progress videos,
//! per-month write-ups and the profile that controls who may read them.

pub mod grouping;
pub mod handlers;
pub mod models;
pub mod profiles;
pub mod reload;
pub mod rows;
pub mod store;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// First-generation routes: the caller's own log only.
pub fn v1_routes() -> Router<AppState> {
    Router::new()
        .route("/videolog/entries", get(handlers::handle_list_my_video_groups))
        .route(
            "/videolog/entries/reload",
            post(handlers::handle_reload_from_playlists),
        )
        .route(
            "/videolog/recordings",
            get(handlers::handle_list_my_recordings),
        )
        .route("/videolog/summaries", get(handlers::handle_list_my_summaries))
}

/// Profile-addressed routes; reads may be anonymous when the profile is public.
pub fn v2_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/videolog/profiles/me",
            get(profiles::handle_get_my_profile).put(profiles::handle_update_my_profile),
        )
        .route("/videolog/entries", get(handlers::handle_list_video_groups))
        .route(
            "/videolog/entries/reload",
            post(handlers::handle_reload_from_playlists),
        )
        .route(
            "/videolog/summaries",
            get(handlers::handle_list_summaries).post(handlers::handle_upsert_summary),
        )
}
