//! Session lifecycle coordination.
//!
//! Orchestrates the start / update / finish flow across the session store,
//! the question catalog, grading and the account service. All methods are
//! scoped to the authenticated caller; a session owned by another user is
//! reported as not found.

use std::sync::Arc;

use crate::errors::ApiError;
use crate::metrics::{
    BADGES_AWARDED_TOTAL, QUESTIONS_GRADED_TOTAL, SESSIONS_OPEN, SESSIONS_TOTAL,
};
use crate::models::{AuthenticatedUser, FinishOutcome, Session, SessionAnswer};
use crate::services::{
    account_client::AccountClient, badge_policy, grading, question_catalog::QuestionCatalog,
    session_store::SessionStore,
};

pub struct SessionService {
    store: Arc<dyn SessionStore>,
    catalog: Arc<dyn QuestionCatalog>,
    accounts: Arc<dyn AccountClient>,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        catalog: Arc<dyn QuestionCatalog>,
        accounts: Arc<dyn AccountClient>,
    ) -> Self {
        Self {
            store,
            catalog,
            accounts,
        }
    }

    /// Returns the caller's open session for the quiz, creating one if none
    /// exists. Hitting start twice resumes the same session.
    pub async fn start(
        &self,
        user: &AuthenticatedUser,
        quiz_id: &str,
    ) -> Result<Session, ApiError> {
        let (session, created) = self.store.open_or_create(&user.user_id, quiz_id).await?;

        if created {
            SESSIONS_TOTAL.with_label_values(&["started"]).inc();
            SESSIONS_OPEN.inc();
            tracing::info!(
                "Session started: {} for user: {} quiz: {}",
                session.id,
                user.user_id,
                quiz_id
            );
        } else {
            SESSIONS_TOTAL.with_label_values(&["resumed"]).inc();
            tracing::info!(
                "Session resumed: {} for user: {} quiz: {}",
                session.id,
                user.user_id,
                quiz_id
            );
        }

        Ok(session)
    }

    /// Replaces the answer list of an open session.
    pub async fn update(
        &self,
        user: &AuthenticatedUser,
        session_id: &str,
        answers: &[SessionAnswer],
    ) -> Result<Session, ApiError> {
        let session = self
            .store
            .replace_answers(session_id, &user.user_id, answers)
            .await?;
        tracing::debug!(
            "Session {} answers updated ({} entries)",
            session_id,
            answers.len()
        );
        Ok(session)
    }

    /// Grades the submission, closes the session and propagates the result
    /// to the account service.
    ///
    /// The grade is persisted before any account call. Propagation failures
    /// therefore surface as errors while the session stays finished and
    /// scored; the account is reconciled out of band in that case.
    pub async fn finish(
        &self,
        user: &AuthenticatedUser,
        session_id: &str,
        answers: &[SessionAnswer],
    ) -> Result<FinishOutcome, ApiError> {
        let session = self.store.get(session_id, &user.user_id).await?;
        if session.is_finished() {
            return Err(ApiError::SessionAlreadyFinished);
        }

        let questions = self.catalog.questions_for_quiz(&session.quiz_id).await?;
        let outcome = grading::grade(&questions, answers);
        for result in &outcome.results {
            let label = if result.correct { "correct" } else { "incorrect" };
            QUESTIONS_GRADED_TOTAL.with_label_values(&[label]).inc();
        }

        let finished = self
            .store
            .finalize(session_id, &user.user_id, answers, outcome.score)
            .await?;
        SESSIONS_TOTAL.with_label_values(&["finished"]).inc();
        SESSIONS_OPEN.dec();
        tracing::info!(
            "Session finished: {} user: {} score: {}/{}",
            finished.id,
            user.user_id,
            outcome.score,
            outcome.max_score
        );

        // Account calls run after the grade is committed and are sequential:
        // badge thresholds depend on the post-update stats.
        let update = self.accounts.add_score(&user.user_id, outcome.score).await?;
        tracing::debug!(
            "Score propagated for user {}: total {} over {} quizzes",
            user.user_id,
            update.total_score,
            update.quizzes_completed
        );

        let stats = self.accounts.stats(&user.user_id).await?;
        let new_badges = badge_policy::new_badges(&stats);

        if !new_badges.is_empty() {
            self.accounts.add_badges(&user.user_id, &new_badges).await?;
            for badge in &new_badges {
                BADGES_AWARDED_TOTAL.with_label_values(&[badge]).inc();
            }
            tracing::info!("User {} earned badges: {:?}", user.user_id, new_badges);
        }

        Ok(FinishOutcome {
            session_id: finished.id,
            score: outcome.score,
            max_score: outcome.max_score,
            new_badges,
        })
    }

    /// The caller's session history, most recent first.
    pub async fn sessions_for(&self, user: &AuthenticatedUser) -> Result<Vec<Session>, ApiError> {
        Ok(self.store.list_for_user(&user.user_id).await?)
    }

    pub async fn get(
        &self,
        user: &AuthenticatedUser,
        session_id: &str,
    ) -> Result<Session, ApiError> {
        Ok(self.store.get(session_id, &user.user_id).await?)
    }
}
