//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the
//! `config` and `dotenvy` crates. Variables use the `VISA_SYNC` prefix and
//! `__` between nested keys. Every section has defaults, so an empty
//! environment loads; `validate` then reports what is missing.
//!
//! # Example
//!
//! ```no_run
//! use visa_sync::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Realtime endpoint: {}", config.realtime.url);
//! ```

mod api;
mod auth;
mod cache;
mod error;
mod logging;
mod realtime;
mod redis;
mod sync;

pub use api::ApiConfig;
pub use auth::{AuthConfig, TokenSource};
pub use cache::{CacheBackend, CacheConfig};
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;
pub use realtime::{RealtimeConfig, TransportKind};
pub use redis::RedisConfig;
pub use sync::SyncConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    /// Realtime transport (endpoint, keep-alive, reconnect policy)
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// Cache store (backend, TTLs, sweeper)
    #[serde(default)]
    pub cache: CacheConfig,

    /// Redis, required when `cache.backend = redis`
    #[serde(default)]
    pub redis: Option<RedisConfig>,

    /// REST API collaborator
    #[serde(default)]
    pub api: ApiConfig,

    /// Synchronized entity kinds and status polling
    #[serde(default)]
    pub sync: SyncConfig,

    /// Realtime auth token
    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `VISA_SYNC` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `VISA_SYNC__REALTIME__URL=wss://...` -> `realtime.url = ...`
    /// - `VISA_SYNC__CACHE__BACKEND=redis` -> `cache.backend = redis`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("VISA_SYNC")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.realtime.validate()?;
        self.cache.validate()?;
        match (&self.cache.backend, &self.redis) {
            (CacheBackend::Redis, None) => return Err(ValidationError::MissingRequired("REDIS__URL")),
            (CacheBackend::Redis, Some(redis)) => redis.validate()?,
            (CacheBackend::Memory, _) => {}
        }
        self.api.validate()?;
        self.sync.validate()?;
        self.auth.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
