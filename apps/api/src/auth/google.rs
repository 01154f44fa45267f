use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::AuthError;

const TOKEN_INFO_URL: &str = "https://www.googleapis.com/oauth2/v2/tokeninfo";
const USER_INFO_URL: &str = "https://www.googleapis.com/oauth2/v1/userinfo";

/// Claims Google reports for a verified ID token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenInfo {
    pub email: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub verified_email: bool,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleUserInfo {
    pub id: String,
    pub email: String,
    pub family_name: String,
    pub given_name: String,
    pub name: String,
    pub locale: String,
    pub picture: String,
    pub verified_email: bool,
}

/// Verifies bearer tokens against an identity provider.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify_id_token(&self, id_token: &str) -> Result<TokenInfo, AuthError>;

    async fn user_info(&self, access_token: &str) -> Result<GoogleUserInfo, AuthError>;
}

#[derive(Clone)]
pub struct GoogleTokenVerifier {
    client: Client,
}

impl GoogleTokenVerifier {
    pub fn new() -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AuthError::Upstream(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TokenVerifier for GoogleTokenVerifier {
    async fn verify_id_token(&self, id_token: &str) -> Result<TokenInfo, AuthError> {
        let response = self
            .client
            .get(TOKEN_INFO_URL)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| AuthError::Upstream(format!("token info request failed: {e}")))?;

        // Google answers 400 for malformed and expired tokens alike.
        if !response.status().is_success() {
            return Err(AuthError::InvalidToken(abbreviate(id_token, 20)));
        }

        response
            .json::<TokenInfo>()
            .await
            .map_err(|_| AuthError::InvalidToken(abbreviate(id_token, 20)))
    }

    async fn user_info(&self, access_token: &str) -> Result<GoogleUserInfo, AuthError> {
        let response = self
            .client
            .get(USER_INFO_URL)
            .query(&[("alt", "json"), ("access_token", access_token)])
            .send()
            .await
            .map_err(|e| {
                AuthError::Upstream(format!("unable to fetch user information from Google API: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(AuthError::Upstream(format!(
                "Google user info endpoint returned {}",
                response.status()
            )));
        }

        response.json().await.map_err(|e| {
            AuthError::Upstream(format!(
                "unable to decode user information from Google API response: {e}"
            ))
        })
    }
}

/// Shortens a token for logs and error messages.
pub fn abbreviate(token: &str, max_chars: usize) -> String {
    if token.chars().count() > max_chars {
        let head: String = token.chars().take(max_chars).collect();
        format!("{head}...")
    } else {
        token.to_string()
    }
}
