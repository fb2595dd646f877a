//! Bearer-token validation against the auth gateway.
//!
//! The session endpoints never inspect tokens themselves; every request is
//! resolved to a user identity by the auth service before any session
//! operation runs.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::models::AuthenticatedUser;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidToken(String),
}

/// Body of `POST /api/auth/validate`.
#[derive(Debug, Deserialize)]
struct ValidateResponse {
    #[serde(default)]
    valid: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    user: Option<AuthenticatedUser>,
}

#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Resolves a bearer token to the user it belongs to.
    async fn resolve(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}

pub struct HttpAuthClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthClient {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl AuthClient for HttpAuthClient {
    async fn resolve(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let url = format!("{}/api/auth/validate", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| {
                // An unreachable gateway denies the request rather than
                // letting it through anonymously
                tracing::warn!("auth service unreachable: {}", err);
                AuthError::InvalidToken("Invalid token".to_string())
            })?;

        let body: ValidateResponse = response.json().await.map_err(|err| {
            tracing::warn!("auth service sent a malformed response: {}", err);
            AuthError::InvalidToken("Invalid token".to_string())
        })?;

        if !body.valid {
            return Err(AuthError::InvalidToken(
                body.message.unwrap_or_else(|| "Invalid token".to_string()),
            ));
        }

        body.user
            .ok_or_else(|| AuthError::InvalidToken("Invalid token".to_string()))
    }
}
