use std::sync::Arc;
use std::time::Duration;

use mongodb::{Client as MongoClient, Database};

use crate::config::Config;
use crate::services::{
    account_client::HttpAccountClient,
    auth_client::{AuthClient, HttpAuthClient},
    question_catalog::MongoQuestionCatalog,
    session_service::SessionService,
    session_store::MongoSessionStore,
};

pub struct AppState {
    pub config: Config,
    pub mongo: Database,
    pub sessions: SessionService,
    pub auth: Arc<dyn AuthClient>,
}

impl AppState {
    pub async fn new(config: Config, mongo_client: MongoClient) -> anyhow::Result<Self> {
        let mongo = mongo_client.database(&config.mongo_database);

        let store = MongoSessionStore::new(&mongo);
        store.ensure_indexes().await?;
        let catalog = MongoQuestionCatalog::new(&mongo);

        // One outbound client shared by both collaborators; a bounded
        // timeout keeps a stuck upstream from pinning request handlers
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        let accounts = HttpAccountClient::new(http.clone(), config.account_service_url.clone());
        let auth = HttpAuthClient::new(http, config.auth_service_url.clone());

        let sessions = SessionService::new(Arc::new(store), Arc::new(catalog), Arc::new(accounts));

        Ok(Self {
            config,
            mongo,
            sessions,
            auth: Arc::new(auth),
        })
    }
}

pub mod account_client;
pub mod auth_client;
pub mod badge_policy;
pub mod grading;
pub mod question_catalog;
pub mod session_service;
pub mod session_store;
