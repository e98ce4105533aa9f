//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid realtime URL: {0}")]
    InvalidRealtimeUrl(String),

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Invalid API base URL: {0}")]
    InvalidApiUrl(String),

    #[error("Invalid timeout: {0} must be between 1 and {1} seconds")]
    InvalidTimeout(&'static str, u64),

    #[error("Invalid TTL: {0} must be greater than zero")]
    InvalidTtl(&'static str),

    #[error("Reconnect base delay exceeds max delay")]
    InvalidReconnectDelays,

    #[error("Reconnect attempts exceed maximum allowed (50)")]
    TooManyReconnectAttempts,

    #[error("Unknown entity kind: {0}")]
    UnknownEntityKind(String),

    #[error("No entity kinds configured for sync")]
    NoEntityKinds,

    #[error("Invalid owner scope")]
    InvalidOwnerScope,

    #[error("Invalid log filter: {0}")]
    InvalidLogFilter(String),
}
