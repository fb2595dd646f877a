use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub mongo_database: String,
    pub account_service_url: String,
    pub auth_service_url: String,
    pub http_port: u16,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first (two levels up in the compose layout), local .env
        // as the fallback. SKIP_ROOT_ENV short-circuits the root lookup.
        if env::var("SKIP_ROOT_ENV").is_ok() || dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let env_name = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/<env>.toml is optional; APP__-prefixed variables win over it.
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env_name)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let lookup = |toml_key: &str, env_key: &str| {
            settings
                .get_string(toml_key)
                .ok()
                .or_else(|| env::var(env_key).ok())
        };

        Ok(Config {
            mongo_uri: lookup("database.mongo_uri", "MONGO_URI")
                .unwrap_or_else(|| "mongodb://localhost:27017/quizdb".to_string()),
            mongo_database: lookup("database.mongo_database", "MONGO_DATABASE")
                .unwrap_or_else(|| "quizdb".to_string()),
            account_service_url: lookup("services.account_url", "USER_SERVICE_URL")
                .unwrap_or_else(|| "http://user-service:5002".to_string()),
            auth_service_url: lookup("services.auth_url", "AUTH_SERVICE_URL")
                .unwrap_or_else(|| "http://auth-service:5003".to_string()),
            http_port: lookup("server.port", "PORT")
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(5000),
        })
    }
}
