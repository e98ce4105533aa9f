//! AuthTokenProvider port - supplies the session token used to authenticate
//! realtime connections and REST calls.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::domain::foundation::DomainError;

#[async_trait]
pub trait AuthTokenProvider: Send + Sync {
    /// Returns the current token, or `None` when the user is not signed in
    /// yet. Callers must not connect without a token.
    async fn auth_token(&self) -> Result<Option<SecretString>, DomainError>;
}
