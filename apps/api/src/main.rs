mod auth;
mod config;
mod db;
mod errors;
mod extract;
mod practice_log;
mod routes;
mod state;
mod store;
mod video_log;
mod youtube;

#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::google::GoogleTokenVerifier;
use crate::auth::policy::AllowList;
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::practice_log::store::PgPracticeLogStore;
use crate::routes::build_router;
use crate::state::AppState;
use crate::video_log::store::PgVideoLogStore;
use crate::youtube::YouTubeClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting practice log API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url, config.db_max_connections).await?;
    if config.run_migrations {
        run_migrations(&db).await?;
    }

    // Initialize external clients
    let youtube = YouTubeClient::new(config.youtube_api_key.clone())
        .context("failed to build YouTube client")?;
    if config.youtube_api_key.is_none() {
        warn!("YOUTUBE_API_KEY is not set; playlist reloads will fail");
    }
    let verifier = GoogleTokenVerifier::new().context("failed to build Google token client")?;

    let policy = AllowList::new(&config.allowed_emails);
    if config.auth_enabled {
        info!("Authentication enabled for {} allowed e-mails", policy.len());
    } else {
        warn!(
            "Authentication disabled; every request acts as {}",
            config.default_username
        );
    }

    // Build app state
    let state = AppState {
        config: config.clone(),
        practice_log: Arc::new(PgPracticeLogStore::new(db.clone())),
        video_log: Arc::new(PgVideoLogStore::new(db)),
        youtube: Arc::new(youtube),
        verifier: Arc::new(verifier),
        policy: Arc::new(policy),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config)?);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(config: &Config) -> Result<CorsLayer> {
    match &config.cors_allow_origin {
        None => Ok(CorsLayer::permissive()),
        Some(origin) => {
            let origin = HeaderValue::from_str(origin)
                .with_context(|| format!("CORS_ALLOW_ORIGIN '{origin}' is not a valid origin"))?;
            Ok(CorsLayer::permissive().allow_origin(AllowOrigin::exact(origin)))
        }
    }
}
