//! Authentication configuration
//!
//! The daemon authenticates the realtime connection with a bearer token,
//! either given inline (`VISA_SYNC__AUTH__TOKEN`) or read on every connect
//! from another environment variable (`VISA_SYNC__AUTH__TOKEN_ENV`), which
//! lets an external process rotate it.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    /// Static bearer token
    #[serde(default)]
    pub token: Option<SecretString>,

    /// Name of an environment variable holding the token
    #[serde(default)]
    pub token_env: Option<String>,
}

/// Where the auth token comes from.
#[derive(Debug, Clone)]
pub enum TokenSource {
    Static(SecretString),
    Env(String),
    /// No token: the daemon waits and never connects.
    None,
}

impl AuthConfig {
    pub fn source(&self) -> TokenSource {
        if let Some(variable) = self.token_env.as_ref().filter(|v| !v.is_empty()) {
            return TokenSource::Env(variable.clone());
        }
        match &self.token {
            Some(token) if !token.expose_secret().is_empty() => TokenSource::Static(token.clone()),
            _ => TokenSource::None,
        }
    }

    /// Validate authentication configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.token.is_some() && self.token_env.is_some() {
            tracing::warn!("Both auth.token and auth.token_env are set; token_env wins");
        }
        if let Some(variable) = &self.token_env {
            if variable.trim().is_empty() {
                return Err(ValidationError::MissingRequired("AUTH__TOKEN_ENV"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_token_by_default() {
        assert!(matches!(AuthConfig::default().source(), TokenSource::None));
    }

    #[test]
    fn static_token_source() {
        let config = AuthConfig {
            token: Some(SecretString::new("tok-1".to_string())),
            token_env: None,
        };
        match config.source() {
            TokenSource::Static(token) => assert_eq!(token.expose_secret(), "tok-1"),
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn env_source_takes_precedence() {
        let config = AuthConfig {
            token: Some(SecretString::new("tok-1".to_string())),
            token_env: Some("AGENCY_TOKEN".to_string()),
        };
        assert!(matches!(config.source(), TokenSource::Env(v) if v == "AGENCY_TOKEN"));
    }

    #[test]
    fn blank_token_env_is_invalid() {
        let config = AuthConfig {
            token: None,
            token_env: Some("  ".to_string()),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn token_is_redacted_in_debug() {
        let config = AuthConfig {
            token: Some(SecretString::new("super-secret".to_string())),
            token_env: None,
        };
        assert!(!format!("{:?}", config).contains("super-secret"));
    }
}
