use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// One user's attempt at one quiz. Stored in the `quiz_sessions` collection
/// and returned verbatim on the session endpoints (wire format is camelCase,
/// matching the rest of the QuizArena services).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub quiz_id: String,
    #[serde(default)]
    pub answers: Vec<SessionAnswer>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub score: Option<i32>,
    /// Mirror of `finished_at.is_none()`. Kept as a stored field so the
    /// one-open-session-per-(user, quiz) constraint can live in a partial
    /// unique index instead of application code.
    pub open: bool,
}

impl Session {
    pub fn new(user_id: &str, quiz_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            quiz_id: quiz_id.to_string(),
            answers: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
            score: None,
            open: true,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

/// A single entry of a session's answer list. `answer` is absent for
/// questions the user has seen but not answered yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAnswer {
    pub question: String,
    #[serde(default)]
    pub answer: Option<AnswerValue>,
}

/// Answer payloads arrive either as one string (single-choice / boolean) or
/// as a list of strings (multiple-choice). The untagged representation keeps
/// the wire format identical to the other services while giving the grading
/// code a typed value to match on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Single(String),
    Multiple(Vec<String>),
}

/// Question definition as the quiz catalog stores it. Read-only here: the
/// content service owns these documents, the session engine only grades
/// against them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "quiz")]
    pub quiz_id: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answers: Vec<String>,
    #[serde(default)]
    pub points: Option<i32>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl Question {
    /// Point value used by grading. Unset or zero means one point; any other
    /// stored value passes through untouched.
    pub fn effective_points(&self) -> i32 {
        match self.points {
            None | Some(0) => 1,
            Some(p) => p,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Single,
    Multiple,
    Boolean,
    Open,
}

/// Identity resolved by the auth gateway, inserted into request extensions
/// by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub user_id: String,
    #[serde(default)]
    pub role: Option<String>,
}

// --- request / response DTOs -------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    #[validate(length(min = 1, message = "quizId is required"))]
    pub quiz_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSessionRequest {
    pub answers: Vec<SessionAnswer>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FinishSessionRequest {
    #[validate(length(min = 1, message = "sessionId is required"))]
    pub session_id: String,
    pub answers: Vec<SessionAnswer>,
}

/// Body returned by a successful finish: the graded score plus any badges
/// the account service had not awarded before this call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishOutcome {
    pub session_id: String,
    pub score: i32,
    pub max_score: i32,
    pub new_badges: Vec<String>,
}

// --- account service wire types ----------------------------------------------

/// Response of `POST /api/user/{id}/score`. The account service increments
/// the completed-quiz counter as part of the same call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreUpdate {
    #[serde(default)]
    pub total_score: i64,
    #[serde(default)]
    pub quizzes_completed: i64,
}

/// Cumulative per-user stats as returned by `GET /api/user/{id}`. Counters
/// may be absent for accounts that never finished a quiz, hence the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    #[serde(default)]
    pub total_score: i64,
    #[serde(default)]
    pub quizzes_completed: i64,
    #[serde(default)]
    pub badges: Vec<String>,
}
