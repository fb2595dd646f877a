#![allow(dead_code)]

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;

pub use config::Config;
pub use services::AppState;

const CSP_POLICY: &str = "default-src 'self'; script-src 'self' 'unsafe-inline'; \
     style-src 'self' 'unsafe-inline'; img-src 'self' data: https:; connect-src 'self'";

/// Attaches a Content-Security-Policy header to every response.
async fn csp_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(CSP_POLICY),
    );
    response
}

pub fn create_router(app_state: std::sync::Arc<services::AppState>) -> Router {
    // Browsers call these endpoints both directly and through the gateway
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any); // TODO: pin allowed origins to the gateway host

    // Auth runs before the limiter so requests are counted per user, not
    // only per IP
    let session_api = session_routes()
        .layer(middleware::from_fn(
            middlewares::rate_limit::rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            middlewares::auth::auth_middleware,
        ));

    let metrics_api = get(handlers::metrics_handler)
        .layer(middleware::from_fn(handlers::metrics_auth_middleware));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", metrics_api)
        .nest("/api/session", session_api)
        .with_state(app_state)
        .layer(cors)
        .layer(middleware::from_fn(csp_middleware))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn session_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/start", post(handlers::sessions::start_session))
        .route("/finish", post(handlers::sessions::finish_session))
        .route("/my", get(handlers::sessions::my_sessions))
        .route(
            "/{session_id}",
            get(handlers::sessions::get_session).patch(handlers::sessions::update_session),
        )
}
