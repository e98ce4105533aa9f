//! EntityFetcher port - the REST collaborator that owns the source of truth.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entity::{EntityRecord, QueryFilters, StatsSnapshot};
use crate::domain::foundation::{DomainError, EntityId, ErrorCode, OwnerScope};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Not found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl From<FetchError> for DomainError {
    fn from(err: FetchError) -> Self {
        let code = match &err {
            FetchError::NotFound => ErrorCode::EntityNotFound,
            FetchError::Unauthorized => ErrorCode::Unauthorized,
            _ => ErrorCode::ApiError,
        };
        DomainError::new(code, err.to_string())
    }
}

/// Port for reading and mutating records of type `T` on the backend.
#[async_trait]
pub trait EntityFetcher<T: EntityRecord>: Send + Sync {
    /// Fetches one record; `Ok(None)` when the backend has no such record.
    async fn fetch_one(&self, id: &EntityId) -> Result<Option<T>, FetchError>;

    async fn fetch_list(&self, owner: &OwnerScope, filters: &QueryFilters) -> Result<Vec<T>, FetchError>;

    async fn fetch_stats(&self, owner: &OwnerScope) -> Result<StatsSnapshot, FetchError>;

    async fn create(&self, entity: &T) -> Result<T, FetchError>;

    async fn update(&self, entity: &T) -> Result<T, FetchError>;

    async fn delete(&self, id: &EntityId) -> Result<(), FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_errors_map_to_domain_codes() {
        assert_eq!(DomainError::from(FetchError::NotFound).code, ErrorCode::EntityNotFound);
        assert_eq!(DomainError::from(FetchError::Unauthorized).code, ErrorCode::Unauthorized);
        assert_eq!(
            DomainError::from(FetchError::Network("reset".into())).code,
            ErrorCode::ApiError
        );
    }
}
