//! CacheStorage port - raw key/value persistence behind the cache store.
//!
//! Values are serialized cache entries. Expiry is decided by the cache
//! store, not by the storage, so a backend may hold expired entries until
//! the next access or sweep.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheStorageError {
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("Cache backend error: {0}")]
    Backend(String),
}

/// Port for cache persistence.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheStorageError>;

    /// Stores `value`, overwriting any previous value.
    async fn set(&self, key: &str, value: String) -> Result<(), CacheStorageError>;

    async fn remove(&self, key: &str) -> Result<(), CacheStorageError>;

    /// Removes every key starting with `prefix`. Returns how many were removed.
    async fn remove_prefix(&self, prefix: &str) -> Result<usize, CacheStorageError>;

    /// Lists every key currently stored.
    async fn keys(&self) -> Result<Vec<String>, CacheStorageError>;

    async fn clear(&self) -> Result<(), CacheStorageError>;
}
