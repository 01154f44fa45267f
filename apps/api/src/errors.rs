use std::fmt;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::store::StoreError;
use crate::youtube::YouTubeError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Server-side failures carry their cause into the response body. This is a
/// single-operator tool; the cause is more useful to the operator than hidden.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("External service error: {0}")]
    External(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("failed to parse JSON data: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(format!("invalid path parameter: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(format!("invalid query parameter: {}", rejection.body_text()))
    }
}

impl From<YouTubeError> for AppError {
    fn from(err: YouTubeError) -> Self {
        AppError::External(err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Upstream(_) => AppError::External(err.to_string()),
            _ => AppError::Unauthorized(err.to_string()),
        }
    }
}

impl From<ErrorList> for AppError {
    fn from(list: ErrorList) -> Self {
        AppError::External(list.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Store(StoreError::NoRowsAffected { table, id }) => (
                StatusCode::NOT_FOUND,
                "NO_ROWS_AFFECTED",
                format!("no row in {table} matched {id}"),
            ),
            // A label deleted between the existence check and the insert.
            AppError::Store(e) if e.is_foreign_key_violation() => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                format!("referenced record does not exist: {e}"),
            ),
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    format!("failed to query database: {e}"),
                )
            }
            AppError::External(msg) => {
                tracing::error!("External service error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "EXTERNAL_ERROR", msg.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

/// Several independent failures reported together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorList(Vec<String>);

impl ErrorList {
    /// Collects the messages of every `Err`; `None` when all succeeded.
    pub fn concat<E: fmt::Display>(results: impl IntoIterator<Item = Result<(), E>>) -> Option<Self> {
        let messages: Vec<String> = results
            .into_iter()
            .filter_map(|r| r.err().map(|e| e.to_string()))
            .collect();
        if messages.is_empty() {
            None
        } else {
            Some(ErrorList(messages))
        }
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("; "))
    }
}

impl std::error::Error for ErrorList {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_all_ok_is_none() {
        let results: Vec<Result<(), String>> = vec![Ok(()), Ok(())];
        assert!(ErrorList::concat(results).is_none());
    }

    #[test]
    fn test_concat_joins_every_failure() {
        let results = vec![
            Err("playlist A returned 0 items".to_string()),
            Ok(()),
            Err("playlist B request timed out".to_string()),
        ];
        let list = ErrorList::concat(results).unwrap();
        assert_eq!(list.messages().len(), 2);
        assert_eq!(
            list.to_string(),
            "playlist A returned 0 items; playlist B request timed out"
        );
    }

    #[test]
    fn test_no_rows_affected_maps_to_404() {
        let err = AppError::Store(StoreError::NoRowsAffected {
            table: "log_entries",
            id: "abc".to_string(),
        });
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_filter_maps_to_500() {
        let err = AppError::Store(StoreError::InvalidFilter("label_ids on log_labels".into()));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unauthorized_maps_to_401() {
        let err = AppError::Unauthorized("ID token is not provided".into());
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}
