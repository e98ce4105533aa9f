//! Redis-backed cache storage for deployments that share a cache across
//! processes.
//!
//! Every key is stored under a namespace (`visa-sync:` by default) so the
//! store can share a Redis database with other applications. Entries are
//! written with a server-side expiry as a backstop; freshness is still
//! decided by the cache store.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;

use crate::ports::{CacheStorage, CacheStorageError};

const DEFAULT_NAMESPACE: &str = "visa-sync:";

#[derive(Clone)]
pub struct RedisCacheStorage {
    conn: MultiplexedConnection,
    namespace: String,
    expiry: Option<Duration>,
}

impl RedisCacheStorage {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self {
            conn,
            namespace: DEFAULT_NAMESPACE.to_string(),
            expiry: None,
        }
    }

    /// Connects to `url` and builds a storage over a multiplexed connection.
    pub async fn connect(url: &str) -> Result<Self, CacheStorageError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let conn = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(unavailable)?;
        Ok(Self::new(conn))
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Server-side expiry applied to every write.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = Some(expiry);
        self
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, CacheStorageError> {
        let mut conn = self.conn.clone();
        let mut keys = Vec::new();
        let mut iter = conn
            .scan_match::<_, String>(pattern)
            .await
            .map_err(backend)?;
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        Ok(keys)
    }
}

fn unavailable(e: redis::RedisError) -> CacheStorageError {
    CacheStorageError::Unavailable(e.to_string())
}

fn backend(e: redis::RedisError) -> CacheStorageError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_timeout() {
        CacheStorageError::Unavailable(e.to_string())
    } else {
        CacheStorageError::Backend(e.to_string())
    }
}

/// Escapes glob metacharacters so a prefix matches literally in SCAN.
fn escape_glob(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl CacheStorage for RedisCacheStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheStorageError> {
        let mut conn = self.conn.clone();
        conn.get(self.namespaced(key)).await.map_err(backend)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheStorageError> {
        let mut conn = self.conn.clone();
        let key = self.namespaced(key);
        match self.expiry {
            Some(expiry) => conn
                .set_ex::<_, _, ()>(key, value, expiry.as_secs().max(1))
                .await
                .map_err(backend),
            None => conn.set::<_, _, ()>(key, value).await.map_err(backend),
        }
    }

    async fn remove(&self, key: &str) -> Result<(), CacheStorageError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(self.namespaced(key)).await.map_err(backend)
    }

    async fn remove_prefix(&self, prefix: &str) -> Result<usize, CacheStorageError> {
        let pattern = format!("{}*", escape_glob(&self.namespaced(prefix)));
        let keys = self.scan(&pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let removed: usize = conn.del(keys).await.map_err(backend)?;
        Ok(removed)
    }

    async fn keys(&self) -> Result<Vec<String>, CacheStorageError> {
        let pattern = format!("{}*", escape_glob(&self.namespace));
        let keys = self.scan(&pattern).await?;
        Ok(keys
            .into_iter()
            .filter_map(|key| key.strip_prefix(&self.namespace).map(str::to_string))
            .collect())
    }

    async fn clear(&self) -> Result<(), CacheStorageError> {
        self.remove_prefix("").await.map(|_| ())
    }
}
