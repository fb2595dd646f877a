use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    errors::ApiError,
    extractors::AppJson,
    models::{AuthenticatedUser, FinishSessionRequest, StartSessionRequest, UpdateSessionRequest},
    services::AppState,
};

pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    AppJson(req): AppJson<StartSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    tracing::info!(
        "Starting session for user={} quiz={}",
        user.user_id,
        req.quiz_id
    );

    let session = state.sessions.start(&user, &req.quiz_id).await?;
    Ok(Json(session))
}

pub async fn update_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(session_id): Path<String>,
    AppJson(req): AppJson<UpdateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .sessions
        .update(&user, &session_id, &req.answers)
        .await?;
    Ok(Json(session))
}

pub async fn finish_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    AppJson(req): AppJson<FinishSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    tracing::info!(
        "Finishing session {} for user={}",
        req.session_id,
        user.user_id
    );

    let outcome = state
        .sessions
        .finish(&user, &req.session_id, &req.answers)
        .await?;
    Ok(Json(outcome))
}

pub async fn my_sessions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state.sessions.sessions_for(&user).await?;
    Ok(Json(sessions))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.sessions.get(&user, &session_id).await?;
    Ok(Json(session))
}
