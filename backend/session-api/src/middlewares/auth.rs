use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::errors::ApiError;
use crate::services::AppState;

/// Resolves the bearer token against the auth gateway and stores the
/// resulting identity in request extensions for handlers to use.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::Unauthorized("No token provided".to_string()))?;

    let user = state.auth.resolve(token).await?;
    tracing::debug!(user_id = %user.user_id, role = ?user.role, "token accepted");

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
