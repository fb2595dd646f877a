//! Read-only access to the question definitions a quiz is graded against.
//!
//! The content service owns the `questions` collection; this module only
//! reads it during finish.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, Collection, Database};
use thiserror::Error;

use crate::models::Question;

pub const QUESTIONS_COLLECTION: &str = "questions";

#[derive(Debug, Error)]
#[error("{0}")]
pub struct CatalogError(pub String);

impl From<mongodb::error::Error> for CatalogError {
    fn from(err: mongodb::error::Error) -> Self {
        CatalogError(err.to_string())
    }
}

#[async_trait]
pub trait QuestionCatalog: Send + Sync {
    /// Every question belonging to `quiz_id`. An unknown quiz yields an
    /// empty list, which grades to score 0 / max 0.
    async fn questions_for_quiz(&self, quiz_id: &str) -> Result<Vec<Question>, CatalogError>;
}

pub struct MongoQuestionCatalog {
    collection: Collection<Question>,
}

impl MongoQuestionCatalog {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(QUESTIONS_COLLECTION),
        }
    }
}

#[async_trait]
impl QuestionCatalog for MongoQuestionCatalog {
    async fn questions_for_quiz(&self, quiz_id: &str) -> Result<Vec<Question>, CatalogError> {
        let questions = self
            .collection
            .find(doc! { "quiz": quiz_id })
            .await?
            .try_collect()
            .await?;
        Ok(questions)
    }
}
