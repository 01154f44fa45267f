//! Request identity.
//!
//! The `authenticate` middleware resolves the caller once per request and
//! stores an [`Identity`] in the request extensions:
//!
//! - auth disabled: the configured default username, no token needed;
//! - `Authorization` present: the token is verified with Google, then checked
//!   against the [`policy::AccessPolicy`]; any failure is a 401;
//! - no header: the request continues anonymously.
//!
//! Handlers that need an owner take `Identity` (rejecting anonymous callers);
//! handlers that serve public content take `Option<Identity>`.

pub mod google;
pub mod handlers;
pub mod policy;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use thiserror::Error;
use tracing::debug;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("ID token is not provided")]
    MissingToken,

    #[error("provided token {0} is invalid")]
    InvalidToken(String),

    #[error("{0} is not an accepted user email")]
    NotAllowed(String),

    #[error("identity provider request failed: {0}")]
    Upstream(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Verified e-mail; doubles as the `username` owning every record.
    pub email: String,
    /// OAuth scopes granted to the token, space separated.
    pub scope: String,
}

impl Identity {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            scope: String::new(),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or_else(|| AuthError::MissingToken.into())
    }
}

/// Accepts both a raw token and `Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
    (!token.is_empty()).then_some(token)
}

pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.config.auth_enabled {
        request
            .extensions_mut()
            .insert(Identity::new(state.config.default_username.clone()));
        return Ok(next.run(request).await);
    }

    let Some(token) = bearer_token(request.headers()).map(str::to_owned) else {
        debug!("{} {} anonymous request", request.method(), request.uri());
        return Ok(next.run(request).await);
    };

    let info = state.verifier.verify_id_token(&token).await?;
    state.policy.check(&info.email)?;

    debug!(
        "{} {} authenticated user: {}",
        request.method(),
        request.uri(),
        info.email
    );
    request.extensions_mut().insert(Identity {
        email: info.email,
        scope: info.scope,
    });
    Ok(next.run(request).await)
}
