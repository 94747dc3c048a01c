use anyhow::{anyhow, Context, Result};
use chrono::Duration;
use std::env;
use std::str::FromStr;

use crate::services::EngineSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Postgres => "postgres",
            StorageBackend::Memory => "memory",
        }
    }
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" | "in-memory" => Ok(StorageBackend::Memory),
            other => Err(anyhow!("Unknown storage backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub log_level: String,
    pub jwt_secret: String,
    pub storage_backend: StorageBackend,
    pub session_expiration_minutes: i64,
    pub exercise_image_placeholder: String,
    pub image_generation_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup; missing keys fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = var("PORT", "3000")
            .parse()
            .context("PORT must be a valid port number")?;
        let session_expiration_minutes: i64 = var("SESSION_EXPIRATION_MINUTES", "30")
            .parse()
            .context("SESSION_EXPIRATION_MINUTES must be a whole number of minutes")?;
        if session_expiration_minutes <= 0 {
            return Err(anyhow!("SESSION_EXPIRATION_MINUTES must be positive"));
        }

        Ok(AppConfig {
            host: var("HOST", "0.0.0.0"),
            port,
            environment: var("ENVIRONMENT", "development"),
            log_level: var("LOG_LEVEL", "info"),
            jwt_secret: var("JWT_SECRET", "your-secret-key-change-in-production"),
            storage_backend: var("STORAGE_BACKEND", "postgres").parse()?,
            session_expiration_minutes,
            exercise_image_placeholder: var(
                "EXERCISE_IMAGE_PLACEHOLDER",
                "/images/exercise-placeholder.png",
            ),
            image_generation_url: lookup("IMAGE_GENERATION_URL").filter(|url| !url.is_empty()),
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            session_expiration: Duration::minutes(self.session_expiration_minutes),
            image_placeholder: self.exercise_image_placeholder.clone(),
        }
    }
}
