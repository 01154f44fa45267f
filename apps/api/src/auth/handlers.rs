use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::google::GoogleUserInfo;
use super::Identity;
use crate::errors::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AccessTokenPayload {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenValidationResponse {
    pub granted_scopes: String,
    #[serde(flatten)]
    pub user_info: GoogleUserInfo,
}

/// POST /api/v1/token/validate
pub async fn handle_validate_token(
    State(state): State<AppState>,
    identity: Identity,
    AppJson(payload): AppJson<AccessTokenPayload>,
) -> Result<Json<TokenValidationResponse>, AppError> {
    if payload.access_token.trim().is_empty() {
        return Err(AppError::Validation("access_token is required".to_string()));
    }

    let user_info = state.verifier.user_info(&payload.access_token).await?;
    Ok(Json(TokenValidationResponse {
        granted_scopes: identity.scope,
        user_info,
    }))
}
