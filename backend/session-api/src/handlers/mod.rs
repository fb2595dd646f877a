use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use std::sync::Arc;

use crate::metrics;
use crate::services::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mongo = mongo_probe(&state).await;
    let healthy = mongo["status"] == "healthy";

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(json!({
            "status": if healthy { "healthy" } else { "degraded" },
            "service": "quizarena-session-api",
            "version": env!("CARGO_PKG_VERSION"),
            "dependencies": { "mongodb": mongo }
        })),
    )
}

async fn mongo_probe(state: &AppState) -> serde_json::Value {
    let ping = tokio::time::timeout(
        std::time::Duration::from_secs(1),
        state.mongo.run_command(mongodb::bson::doc! { "ping": 1 }),
    )
    .await;

    match ping {
        Ok(Ok(_)) => json!({ "status": "healthy", "message": "ping ok" }),
        Ok(Err(e)) => json!({ "status": "unhealthy", "error": format!("ping failed: {}", e) }),
        Err(_) => json!({ "status": "unhealthy", "error": "ping timed out after 1s" }),
    }
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encoding failed: {}", e),
        ),
    }
}

/// Basic-auth gate in front of the Prometheus scrape endpoint.
pub async fn metrics_auth_middleware(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let presented = basic_credentials(&headers).ok_or(StatusCode::UNAUTHORIZED)?;

    // username:password, overridable per deployment
    let expected = std::env::var("METRICS_AUTH").unwrap_or_else(|_| "admin:changeme".to_string());
    if presented != expected {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}

fn basic_credentials(headers: &HeaderMap) -> Option<String> {
    let encoded = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Basic ")?;
    let decoded = general_purpose::STANDARD.decode(encoded).ok()?;
    String::from_utf8(decoded).ok()
}

pub mod sessions;
