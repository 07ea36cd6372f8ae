use dotenvy::dotenv;
use std::env;

/// Upper bound on message text size before `Validation` is raised.
const DEFAULT_MAX_MESSAGE_BYTES: usize = 8192;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub port: u16,
    pub max_message_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| crate::error::AppError::Config("DATABASE_URL missing".into()))?;
        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);
        let max_message_bytes = env::var("MAX_MESSAGE_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_MESSAGE_BYTES);

        Ok(Self {
            database_url,
            redis_url,
            port,
            max_message_bytes,
        })
    }
}
