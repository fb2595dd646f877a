use quizarena_session_api::{config::Config, create_router, services::AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quizarena_session_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let env_name = std::env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());
    tracing::info!(environment = %env_name, "starting quizarena session api");

    let config = Config::load().expect("configuration must load");

    let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .expect("invalid MongoDB connection string");
    tracing::info!("MongoDB client initialized");

    let http_port = config.http_port;

    // AppState wires the store, catalog and upstream clients together
    let state = Arc::new(
        AppState::new(config, mongo_client)
            .await
            .expect("application state must initialize"),
    );

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", http_port))
        .await
        .expect("listen port must be free");
    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
