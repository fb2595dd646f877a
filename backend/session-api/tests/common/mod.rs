#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::Request,
    response::Response,
    Router,
};
use tokio::sync::RwLock;
use tower::ServiceExt;

use quizarena_session_api::{
    config::Config,
    create_router,
    models::{AccountSnapshot, AuthenticatedUser, Question, ScoreUpdate, Session, SessionAnswer},
    services::{
        account_client::{AccountClient, AccountError},
        auth_client::{AuthClient, AuthError},
        question_catalog::{CatalogError, QuestionCatalog},
        session_service::SessionService,
        session_store::{SessionStore, StoreError},
        AppState,
    },
};

// --- session store double ----------------------------------------------------

/// In-memory stand-in for the Mongo store. The whole get-or-create runs
/// under one write lock, which gives it the same atomicity the partial
/// unique index gives the real one.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, session: Session) {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session);
    }

    pub async fn by_id(&self, id: &str) -> Option<Session> {
        self.sessions.read().await.get(id).cloned()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn open_or_create(
        &self,
        user_id: &str,
        quiz_id: &str,
    ) -> Result<(Session, bool), StoreError> {
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions
            .values()
            .find(|s| s.user_id == user_id && s.quiz_id == quiz_id && s.open)
        {
            return Ok((existing.clone(), false));
        }

        let fresh = Session::new(user_id, quiz_id);
        sessions.insert(fresh.id.clone(), fresh.clone());
        Ok((fresh, true))
    }

    async fn get(&self, id: &str, user_id: &str) -> Result<Session, StoreError> {
        self.sessions
            .read()
            .await
            .get(id)
            .filter(|s| s.user_id == user_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn replace_answers(
        &self,
        id: &str,
        user_id: &str,
        answers: &[SessionAnswer],
    ) -> Result<Session, StoreError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .filter(|s| s.user_id == user_id)
            .ok_or(StoreError::NotFound)?;
        if session.is_finished() {
            return Err(StoreError::Finished);
        }
        session.answers = answers.to_vec();
        Ok(session.clone())
    }

    async fn finalize(
        &self,
        id: &str,
        user_id: &str,
        answers: &[SessionAnswer],
        score: i32,
    ) -> Result<Session, StoreError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .filter(|s| s.user_id == user_id)
            .ok_or(StoreError::NotFound)?;
        if session.is_finished() {
            return Err(StoreError::Finished);
        }
        session.answers = answers.to_vec();
        session.score = Some(score);
        session.finished_at = Some(chrono::Utc::now());
        session.open = false;
        Ok(session.clone())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Session>, StoreError> {
        let sessions = self.sessions.read().await;
        let mut owned: Vec<Session> = sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(owned)
    }
}

// --- question catalog double ---------------------------------------------------

pub struct StaticQuestionCatalog {
    questions: Vec<Question>,
}

impl StaticQuestionCatalog {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }
}

#[async_trait]
impl QuestionCatalog for StaticQuestionCatalog {
    async fn questions_for_quiz(&self, quiz_id: &str) -> Result<Vec<Question>, CatalogError> {
        Ok(self
            .questions
            .iter()
            .filter(|q| q.quiz_id == quiz_id)
            .cloned()
            .collect())
    }
}

// --- account service double ----------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum AccountCall {
    AddScore { user_id: String, score: i32 },
    Stats { user_id: String },
    AddBadges { user_id: String, badges: Vec<String> },
}

/// Behaves like the real user service (score adds bump the quiz counter,
/// badges are a set union) while recording every call, so tests can assert
/// both on responses and on what was propagated.
pub struct RecordingAccountClient {
    accounts: Mutex<HashMap<String, AccountSnapshot>>,
    calls: Mutex<Vec<AccountCall>>,
    pub fail_add_score: AtomicBool,
    pub fail_stats: AtomicBool,
    pub fail_add_badges: AtomicBool,
}

impl RecordingAccountClient {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            fail_add_score: AtomicBool::new(false),
            fail_stats: AtomicBool::new(false),
            fail_add_badges: AtomicBool::new(false),
        }
    }

    /// Seeds a user's pre-existing stats.
    pub fn seed(&self, user_id: &str, snapshot: AccountSnapshot) {
        self.accounts
            .lock()
            .unwrap()
            .insert(user_id.to_string(), snapshot);
    }

    pub fn calls(&self) -> Vec<AccountCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn snapshot(&self, user_id: &str) -> AccountSnapshot {
        self.accounts
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl AccountClient for RecordingAccountClient {
    async fn add_score(&self, user_id: &str, score: i32) -> Result<ScoreUpdate, AccountError> {
        self.calls.lock().unwrap().push(AccountCall::AddScore {
            user_id: user_id.to_string(),
            score,
        });
        if self.fail_add_score.load(Ordering::SeqCst) {
            return Err(AccountError::Status(500));
        }

        let mut accounts = self.accounts.lock().unwrap();
        let entry = accounts.entry(user_id.to_string()).or_default();
        entry.total_score += i64::from(score);
        entry.quizzes_completed += 1;
        Ok(ScoreUpdate {
            total_score: entry.total_score,
            quizzes_completed: entry.quizzes_completed,
        })
    }

    async fn stats(&self, user_id: &str) -> Result<AccountSnapshot, AccountError> {
        self.calls.lock().unwrap().push(AccountCall::Stats {
            user_id: user_id.to_string(),
        });
        if self.fail_stats.load(Ordering::SeqCst) {
            return Err(AccountError::Transport("connection refused".to_string()));
        }

        Ok(self.snapshot(user_id))
    }

    async fn add_badges(&self, user_id: &str, badges: &[String]) -> Result<(), AccountError> {
        self.calls.lock().unwrap().push(AccountCall::AddBadges {
            user_id: user_id.to_string(),
            badges: badges.to_vec(),
        });
        if self.fail_add_badges.load(Ordering::SeqCst) {
            return Err(AccountError::Status(502));
        }

        let mut accounts = self.accounts.lock().unwrap();
        let entry = accounts.entry(user_id.to_string()).or_default();
        for badge in badges {
            if !entry.badges.contains(badge) {
                entry.badges.push(badge.clone());
            }
        }
        Ok(())
    }
}

// --- auth gateway double -------------------------------------------------------

/// Resolves a fixed token -> user table; everything else is rejected.
pub struct StaticAuthClient {
    users: HashMap<String, AuthenticatedUser>,
}

impl StaticAuthClient {
    pub fn with_default_users() -> Self {
        let mut users = HashMap::new();
        for (token, user_id) in [
            ("alice-token", "alice"),
            ("bob-token", "bob"),
            ("burst-token", "burst-user"),
        ] {
            users.insert(
                token.to_string(),
                AuthenticatedUser {
                    user_id: user_id.to_string(),
                    role: Some("student".to_string()),
                },
            );
        }
        Self { users }
    }
}

#[async_trait]
impl AuthClient for StaticAuthClient {
    async fn resolve(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        self.users
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::InvalidToken("Invalid token".to_string()))
    }
}

// --- test app ------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemorySessionStore>,
    pub accounts: Arc<RecordingAccountClient>,
}

pub async fn create_test_app(questions: Vec<Question>) -> TestApp {
    // Initialize tracing for tests
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let store = Arc::new(InMemorySessionStore::new());
    let catalog = Arc::new(StaticQuestionCatalog::new(questions));
    let accounts = Arc::new(RecordingAccountClient::new());
    let sessions = SessionService::new(store.clone(), catalog, accounts.clone());

    let config = Config {
        mongo_uri: "mongodb://127.0.0.1:27017".to_string(),
        mongo_database: "quizarena_test".to_string(),
        account_service_url: "http://user-service:5002".to_string(),
        auth_service_url: "http://auth-service:5003".to_string(),
        http_port: 0,
    };

    // The driver connects lazily; the handle exists only for the health
    // check, which reports Mongo as unavailable in tests
    let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .expect("Failed to create test MongoDB client");
    let mongo = mongo_client.database(&config.mongo_database);

    let state = Arc::new(AppState {
        config,
        mongo,
        sessions,
        auth: Arc::new(StaticAuthClient::with_default_users()),
    });

    TestApp {
        router: create_router(state),
        store,
        accounts,
    }
}

// --- request helpers -------------------------------------------------------------

pub async fn send_request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    app.clone().oneshot(request).await.unwrap()
}

pub async fn response_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap_or_else(|_| {
        panic!(
            "expected JSON body, got: {}",
            String::from_utf8_lossy(&bytes)
        )
    })
}

/// A single-choice question worth `points`, with "a" as the correct answer.
pub fn single_question(id: &str, quiz_id: &str, points: i32) -> Question {
    serde_json::from_value(serde_json::json!({
        "_id": id,
        "quiz": quiz_id,
        "type": "single",
        "text": format!("Question {}", id),
        "options": ["a", "b", "c"],
        "correctAnswers": ["a"],
        "points": points,
    }))
    .unwrap()
}
