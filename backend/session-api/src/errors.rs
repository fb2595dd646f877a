use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::services::{
    account_client::AccountError, auth_client::AuthError, question_catalog::CatalogError,
    session_store::StoreError,
};

/// Error taxonomy of the session surface. Everything a handler can fail with
/// maps onto one of these variants; `IntoResponse` turns them into the
/// `{"message": ...}` JSON bodies the other QuizArena services emit.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Session not found")]
    SessionNotFound,
    #[error("Session already finished")]
    SessionAlreadyFinished,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    /// The account service call failed after the session was already scored
    /// locally. Surfaced as an upstream error; the stored score stands.
    #[error("{0}")]
    Propagation(String),
    #[error("session store error: {0}")]
    Store(String),
    #[error("question catalog error: {0}")]
    Catalog(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::SessionNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::SessionAlreadyFinished => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            ApiError::Propagation(message) => {
                tracing::error!("account propagation failed: {}", message);
                (
                    StatusCode::BAD_GATEWAY,
                    "Failed to update user stats".to_string(),
                )
            }
            ApiError::Store(message) => {
                tracing::error!("session store failure: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server error".to_string(),
                )
            }
            ApiError::Catalog(message) => {
                tracing::error!("question catalog failure: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server error".to_string(),
                )
            }
        };

        let body = Json(serde_json::json!({ "message": message }));
        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::SessionNotFound,
            StoreError::Finished => ApiError::SessionAlreadyFinished,
            StoreError::Database(message) => ApiError::Store(message),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err.to_string())
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        ApiError::Propagation(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let AuthError::InvalidToken(message) = err;
        ApiError::Unauthorized(message)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{}: {}", field, e.code),
                })
            })
            .collect();
        ApiError::Validation(messages.join("; "))
    }
}
