//! Token providers.
//!
//! `StaticTokenProvider` holds a session token that can be swapped at
//! runtime (sign-in / sign-out). `EnvTokenProvider` re-reads an environment
//! variable on every call, so an external process can rotate the token.

use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::RwLock;

use crate::domain::foundation::DomainError;
use crate::ports::AuthTokenProvider;

#[derive(Debug, Default)]
pub struct StaticTokenProvider {
    token: RwLock<Option<SecretString>>,
}

impl StaticTokenProvider {
    /// A provider with no token (signed out).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(SecretString::new(token.into()))),
        }
    }

    pub fn from_secret(token: Option<SecretString>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(SecretString::new(token.into()));
    }

    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

#[async_trait]
impl AuthTokenProvider for StaticTokenProvider {
    async fn auth_token(&self) -> Result<Option<SecretString>, DomainError> {
        Ok(self.token.read().unwrap_or_else(|e| e.into_inner()).clone())
    }
}

#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    variable: String,
}

impl EnvTokenProvider {
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
        }
    }
}

#[async_trait]
impl AuthTokenProvider for EnvTokenProvider {
    async fn auth_token(&self) -> Result<Option<SecretString>, DomainError> {
        Ok(std::env::var(&self.variable)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .map(SecretString::new))
    }
}
