//! Persistence for quiz sessions.
//!
//! The store owns the open/finished state machine at the document level:
//! answer updates and finalization are guarded single-document updates, and
//! the one-open-session-per-(user, quiz) rule is a partial unique index, not
//! application-side bookkeeping.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc},
    options::IndexOptions,
    Collection, Database, IndexModel,
};
use thiserror::Error;

use crate::models::{Session, SessionAnswer};

pub const SESSIONS_COLLECTION: &str = "quiz_sessions";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session not found")]
    NotFound,
    #[error("session already finished")]
    Finished,
    #[error("{0}")]
    Database(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for StoreError {
    fn from(err: bson::ser::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// Session persistence contract. Every method that addresses a session by id
/// also takes the caller's user id: a session owned by someone else is
/// indistinguishable from a missing one.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the caller's open session for `quiz_id`, creating one
    /// atomically if none exists. The flag is `true` when this call created
    /// the session.
    async fn open_or_create(&self, user_id: &str, quiz_id: &str)
        -> Result<(Session, bool), StoreError>;

    async fn get(&self, id: &str, user_id: &str) -> Result<Session, StoreError>;

    /// Replaces the answer list of an open session. Fails with `Finished`
    /// once `finalize` has run.
    async fn replace_answers(
        &self,
        id: &str,
        user_id: &str,
        answers: &[SessionAnswer],
    ) -> Result<Session, StoreError>;

    /// Writes answers, score and the finish timestamp in one update and
    /// closes the session. Finishing twice fails with `Finished`.
    async fn finalize(
        &self,
        id: &str,
        user_id: &str,
        answers: &[SessionAnswer],
        score: i32,
    ) -> Result<Session, StoreError>;

    /// All of the caller's sessions, most recently started first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Session>, StoreError>;
}

pub struct MongoSessionStore {
    collection: Collection<Session>,
}

impl MongoSessionStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(SESSIONS_COLLECTION),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        tracing::info!("Creating indexes for {} collection", SESSIONS_COLLECTION);

        // Uniqueness applies to open sessions only; finished ones accumulate
        // freely per (user, quiz).
        let open_session_index = IndexModel::builder()
            .keys(doc! { "userId": 1, "quizId": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .partial_filter_expression(doc! { "open": true })
                    .name("one_open_session_per_user_quiz".to_string())
                    .build(),
            )
            .build();

        let user_history_index = IndexModel::builder()
            .keys(doc! { "userId": 1, "startedAt": -1 })
            .options(
                IndexOptions::builder()
                    .name("user_history".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(open_session_index).await?;
        self.collection.create_index(user_history_index).await?;
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(write_err)) => {
            write_err.code == 11000
        }
        mongodb::error::ErrorKind::Command(command_err) => command_err.code == 11000,
        _ => false,
    }
}

#[async_trait]
impl SessionStore for MongoSessionStore {
    async fn open_or_create(
        &self,
        user_id: &str,
        quiz_id: &str,
    ) -> Result<(Session, bool), StoreError> {
        // Two passes: a concurrent start can beat the upsert to the partial
        // unique index (duplicate key), and a concurrent finish can close
        // the session between the upsert and the read-back. One more pass
        // settles either race.
        for attempt in 0..2 {
            let fresh = Session::new(user_id, quiz_id);
            let filter = doc! { "userId": user_id, "quizId": quiz_id, "open": true };
            let insert = bson::to_document(&fresh)?;

            match self
                .collection
                .update_one(filter.clone(), doc! { "$setOnInsert": insert })
                .upsert(true)
                .await
            {
                Ok(outcome) if outcome.upserted_id.is_some() => return Ok((fresh, true)),
                Ok(_) => {
                    if let Some(existing) = self.collection.find_one(filter).await? {
                        return Ok((existing, false));
                    }
                }
                Err(err) if attempt == 0 && is_duplicate_key(&err) => {
                    tracing::debug!(
                        "concurrent start for user {} quiz {}, retrying lookup",
                        user_id,
                        quiz_id
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(StoreError::Database(
            "open session changed concurrently during start".to_string(),
        ))
    }

    async fn get(&self, id: &str, user_id: &str) -> Result<Session, StoreError> {
        self.collection
            .find_one(doc! { "_id": id, "userId": user_id })
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn replace_answers(
        &self,
        id: &str,
        user_id: &str,
        answers: &[SessionAnswer],
    ) -> Result<Session, StoreError> {
        let outcome = self
            .collection
            .update_one(
                doc! { "_id": id, "userId": user_id, "open": true },
                doc! { "$set": { "answers": bson::to_bson(answers)? } },
            )
            .await?;

        if outcome.matched_count == 0 {
            // Distinguish a missing session from a finished one
            return match self.get(id, user_id).await {
                Ok(_) => Err(StoreError::Finished),
                Err(err) => Err(err),
            };
        }

        self.get(id, user_id).await
    }

    async fn finalize(
        &self,
        id: &str,
        user_id: &str,
        answers: &[SessionAnswer],
        score: i32,
    ) -> Result<Session, StoreError> {
        let finished_at = chrono::Utc::now();
        let outcome = self
            .collection
            .update_one(
                doc! { "_id": id, "userId": user_id, "open": true },
                doc! { "$set": {
                    "answers": bson::to_bson(answers)?,
                    "score": score,
                    "finishedAt": bson::to_bson(&finished_at)?,
                    "open": false,
                } },
            )
            .await?;

        if outcome.matched_count == 0 {
            return match self.get(id, user_id).await {
                Ok(_) => Err(StoreError::Finished),
                Err(err) => Err(err),
            };
        }

        self.get(id, user_id).await
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Session>, StoreError> {
        let sessions = self
            .collection
            .find(doc! { "userId": user_id })
            .sort(doc! { "startedAt": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(sessions)
    }
}
