use std::env;

use actix_web::cookie::Key;

use crate::errors::AppError;

/// Minimum length accepted by `Key::from`.
const MIN_SESSION_KEY_LEN: usize = 64;

/// Runtime configuration, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub port: u16,
    session_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://tradieflow.db".to_owned());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_owned());
        let port = match env::var("PORT") {
            Ok(p) => p
                .parse::<u16>()
                .map_err(|e| AppError::ConfigError(format!("PORT is not a valid port: {}", e)))?,
            Err(_) => 8080,
        };
        let session_key = env::var("SESSION_KEY").map_err(|e| {
            log::error!("FATAL: SESSION_KEY environment variable not set");
            AppError::EnvVarError(e)
        })?;

        let config = Config {
            database_url,
            bind_addr,
            port,
            session_key,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.session_key.len() < MIN_SESSION_KEY_LEN {
            return Err(AppError::ConfigError(format!(
                "SESSION_KEY must be at least {} bytes long",
                MIN_SESSION_KEY_LEN
            )));
        }
        Ok(())
    }

    pub fn session_key(&self) -> Key {
        Key::from(self.session_key.as_bytes())
    }
}
