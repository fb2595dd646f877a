//! HTTP client for the account-owning user service.
//!
//! The user service is the system of record for cumulative score, the
//! completed-quiz counter and the badge set. Calls are plain at-most-once
//! HTTP: no retries, because `add_score` is an increment and a blind retry
//! would double-credit. The caller decides what a failure means.

use async_trait::async_trait;
use thiserror::Error;

use crate::metrics::ACCOUNT_CALLS_TOTAL;
use crate::models::{AccountSnapshot, ScoreUpdate};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("account service unreachable: {0}")]
    Transport(String),
    #[error("account service returned status {0}")]
    Status(u16),
    #[error("account service sent a malformed response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait AccountClient: Send + Sync {
    /// Adds `score` to the user's cumulative total. The user service also
    /// increments the completed-quiz counter as part of this call.
    async fn add_score(&self, user_id: &str, score: i32) -> Result<ScoreUpdate, AccountError>;

    /// Current cumulative stats and badge set.
    async fn stats(&self, user_id: &str) -> Result<AccountSnapshot, AccountError>;

    /// Unions `badges` into the user's badge set. Safe to call with names
    /// the user already holds.
    async fn add_badges(&self, user_id: &str, badges: &[String]) -> Result<(), AccountError>;
}

pub struct HttpAccountClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAccountClient {
    /// The client is injected so timeout policy is set in one place at
    /// startup rather than per call site.
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    fn observe(operation: &str, ok: bool) {
        let status = if ok { "ok" } else { "error" };
        ACCOUNT_CALLS_TOTAL
            .with_label_values(&[operation, status])
            .inc();
    }
}

#[async_trait]
impl AccountClient for HttpAccountClient {
    async fn add_score(&self, user_id: &str, score: i32) -> Result<ScoreUpdate, AccountError> {
        let url = format!("{}/api/user/{}/score", self.base_url, user_id);
        let result = async {
            let response = self
                .client
                .post(&url)
                .json(&serde_json::json!({ "score": score }))
                .send()
                .await
                .map_err(|err| AccountError::Transport(err.to_string()))?;

            if !response.status().is_success() {
                return Err(AccountError::Status(response.status().as_u16()));
            }

            response
                .json::<ScoreUpdate>()
                .await
                .map_err(|err| AccountError::Malformed(err.to_string()))
        }
        .await;

        Self::observe("add_score", result.is_ok());
        result
    }

    async fn stats(&self, user_id: &str) -> Result<AccountSnapshot, AccountError> {
        let url = format!("{}/api/user/{}", self.base_url, user_id);
        let result = async {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|err| AccountError::Transport(err.to_string()))?;

            if !response.status().is_success() {
                return Err(AccountError::Status(response.status().as_u16()));
            }

            response
                .json::<AccountSnapshot>()
                .await
                .map_err(|err| AccountError::Malformed(err.to_string()))
        }
        .await;

        Self::observe("stats", result.is_ok());
        result
    }

    async fn add_badges(&self, user_id: &str, badges: &[String]) -> Result<(), AccountError> {
        let url = format!("{}/api/user/{}/badges", self.base_url, user_id);
        let result = async {
            let response = self
                .client
                .post(&url)
                .json(&serde_json::json!({ "badges": badges }))
                .send()
                .await
                .map_err(|err| AccountError::Transport(err.to_string()))?;

            if !response.status().is_success() {
                return Err(AccountError::Status(response.status().as_u16()));
            }

            Ok(())
        }
        .await;

        Self::observe("add_badges", result.is_ok());
        result
    }
}
