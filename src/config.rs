use std::{env, time::Duration};

use crate::errors::AppError;

/// Process configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub session_key: String,
    pub bind_addr: String,
    pub clients_config: String,
    pub api_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let api_base_url = env::var("API_BASE_URL").map_err(|e| {
            log::error!("FATAL: API_BASE_URL environment variable not set");
            AppError::EnvVarError(e)
        })?;

        let session_key = env::var("SESSION_KEY").map_err(|e| {
            log::error!("FATAL: SESSION_KEY environment variable not set");
            AppError::EnvVarError(e)
        })?;
        // actix's cookie Key needs 64 bytes of material
        if session_key.len() < 64 {
            return Err(AppError::ConfigError(
                "SESSION_KEY must be at least 64 bytes long".to_string(),
            ));
        }

        let api_timeout_secs = match env::var("API_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|e| {
                AppError::ConfigError(format!("API_TIMEOUT_SECS is not a number: {}", e))
            })?,
            Err(_) => 15,
        };

        Ok(Self {
            api_base_url,
            session_key,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            clients_config: env::var("CLIENTS_CONFIG")
                .unwrap_or_else(|_| "clients.toml".to_string()),
            api_timeout: Duration::from_secs(api_timeout_secs),
        })
    }
}
