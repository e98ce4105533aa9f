//! CacheStore - time-boxed key/value cache over a [`CacheStorage`] backend.
//!
//! Entries are stored as JSON `{ "data": .., "timestamp": <ms>, "ttl": <ms> }`.
//! An entry is valid while `now - timestamp < ttl`; expired entries are
//! never returned and are evicted on access. Anything that fails to parse
//! is treated as a miss and evicted. Backend failures are logged and
//! degrade to misses; the cache never fails its callers.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

use crate::domain::foundation::Timestamp;
use crate::ports::{CacheStorage, Clock};

/// Serialized form of a cached value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: Value,
    /// Unix milliseconds at which the entry was written.
    pub timestamp: i64,
    /// Time to live in milliseconds.
    pub ttl: u64,
}

impl CacheEntry {
    pub fn new(data: Value, written_at: Timestamp, ttl: Duration) -> Self {
        Self {
            data,
            timestamp: written_at.as_unix_millis(),
            ttl: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn is_valid_at(&self, now: Timestamp) -> bool {
        let age = now.as_unix_millis().saturating_sub(self.timestamp);
        age < 0 || (age as u64) < self.ttl
    }
}

#[derive(Clone)]
pub struct CacheStore {
    storage: Arc<dyn CacheStorage>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
}

impl CacheStore {
    /// Default TTL for `set`: 5 minutes.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

    pub fn new(storage: Arc<dyn CacheStorage>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            default_ttl: Self::DEFAULT_TTL,
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Stores `data` under `key` with the default TTL, overwriting.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, data: &T) {
        self.set_with_ttl(key, data, self.default_ttl).await
    }

    /// Stores `data` under `key` with an explicit TTL, overwriting.
    pub async fn set_with_ttl<T: Serialize + ?Sized>(&self, key: &str, data: &T, ttl: Duration) {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cannot serialize cache value, skipping");
                return;
            }
        };
        let entry = CacheEntry::new(data, self.clock.now(), ttl);
        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cannot encode cache entry, skipping");
                return;
            }
        };
        if let Err(e) = self.storage.set(key, raw).await {
            tracing::warn!(key, error = %e, "Cache write failed");
        }
    }

    /// Returns the value if present and not expired.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.storage.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key, error = %e, "Corrupted cache entry, evicting");
                self.remove(key).await;
                return None;
            }
        };

        if !entry.is_valid_at(self.clock.now()) {
            tracing::trace!(key, "Cache entry expired");
            self.remove(key).await;
            return None;
        }

        match serde_json::from_value(entry.data) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Cached value has unexpected shape, evicting");
                self.remove(key).await;
                None
            }
        }
    }

    pub async fn remove(&self, key: &str) {
        if let Err(e) = self.storage.remove(key).await {
            tracing::warn!(key, error = %e, "Cache eviction failed");
        }
    }

    /// Removes every entry whose key starts with `prefix`.
    pub async fn remove_prefix(&self, prefix: &str) -> usize {
        match self.storage.remove_prefix(prefix).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(prefix, error = %e, "Cache prefix eviction failed");
                0
            }
        }
    }

    pub async fn clear(&self) {
        if let Err(e) = self.storage.clear().await {
            tracing::warn!(error = %e, "Cache clear failed");
        }
    }

    /// Keys currently held by the backend, expired entries included.
    pub async fn keys(&self) -> Vec<String> {
        self.storage.keys().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Cache key listing failed");
            Vec::new()
        })
    }

    /// Removes every expired or unreadable entry. Returns how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        for key in self.keys().await {
            let stale = match self.storage.get(&key).await {
                Ok(Some(raw)) => serde_json::from_str::<CacheEntry>(&raw)
                    .map(|entry| !entry.is_valid_at(now))
                    .unwrap_or(true),
                Ok(None) => false,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Cache read failed during sweep");
                    false
                }
            };
            if stale {
                self.remove(&key).await;
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!(removed, "Swept expired cache entries");
        }
        removed
    }

    /// Runs [`sweep_expired`](Self::sweep_expired) every `period` until
    /// `shutdown` flips to true.
    pub async fn run_sweeper(&self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval_at(time::Instant::now() + period, period);
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return;
                    }
                }
                _ = interval.tick() => {
                    self.sweep_expired().await;
                }
            }
        }
    }

    /// Spawns [`run_sweeper`](Self::run_sweeper) on the runtime.
    pub fn spawn_sweeper(&self, period: Duration, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move { store.run_sweeper(period, shutdown).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::cache::InMemoryCacheStorage;
    use crate::adapters::clock::ManualClock;
    use crate::ports::CacheStorageError;
    use async_trait::async_trait;
    use serde_json::json;

    fn store() -> (CacheStore, InMemoryCacheStorage, ManualClock) {
        let storage = InMemoryCacheStorage::new();
        let clock = ManualClock::at_epoch();
        let store = CacheStore::new(Arc::new(storage.clone()), Arc::new(clock.clone()));
        (store, storage, clock)
    }

    #[tokio::test]
    async fn entry_is_returned_until_ttl_elapses() {
        let (store, storage, clock) = store();
        let client = json!({"id": 1, "status": "pending"});

        store.set_with_ttl("client:1", &client, Duration::from_millis(1000)).await;

        clock.advance(Duration::from_millis(500));
        assert_eq!(store.get::<Value>("client:1").await, Some(client));

        clock.advance(Duration::from_millis(1000));
        assert_eq!(store.get::<Value>("client:1").await, None);
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn entry_expires_exactly_at_ttl() {
        let (store, _storage, clock) = store();
        store.set_with_ttl("k", &1, Duration::from_millis(100)).await;

        clock.advance(Duration::from_millis(99));
        assert_eq!(store.get::<i32>("k").await, Some(1));
        clock.advance(Duration::from_millis(1));
        assert_eq!(store.get::<i32>("k").await, None);
    }

    #[tokio::test]
    async fn set_uses_default_ttl_and_overwrites() {
        let (store, _storage, clock) = store();
        let store = store.with_default_ttl(Duration::from_secs(10));

        store.set("k", "first").await;
        store.set("k", "second").await;
        clock.advance(Duration::from_secs(9));

        assert_eq!(store.get::<String>("k").await.as_deref(), Some("second"));
        clock.advance(Duration::from_secs(1));
        assert_eq!(store.get::<String>("k").await, None);
    }

    #[tokio::test]
    async fn corrupted_entries_are_misses_and_evicted() {
        let (store, storage, _clock) = store();
        storage.insert_raw("bad", "{not json").await;
        storage.insert_raw("shape", r#"{"data":"x","timestamp":0,"ttl":60000}"#).await;

        assert_eq!(store.get::<Value>("bad").await, None);
        assert_eq!(store.get::<Vec<i32>>("shape").await, None);
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn remove_prefix_and_clear() {
        let (store, _storage, _clock) = store();
        store.set("list:client:a:all", &1).await;
        store.set("list:client:b:all", &2).await;
        store.set("stats:client:a", &3).await;

        assert_eq!(store.remove_prefix("list:client:").await, 2);
        assert_eq!(store.keys().await, vec!["stats:client:a".to_string()]);

        store.clear().await;
        assert!(store.keys().await.is_empty());
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_and_corrupted() {
        let (store, storage, clock) = store();
        store.set_with_ttl("short", &1, Duration::from_secs(1)).await;
        store.set_with_ttl("long", &2, Duration::from_secs(60)).await;
        storage.insert_raw("junk", "???").await;

        clock.advance(Duration::from_secs(2));

        assert_eq!(store.sweep_expired().await, 2);
        assert_eq!(store.keys().await, vec!["long".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_runs_until_shutdown() {
        let (store, storage, clock) = store();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        store.set_with_ttl("k", &1, Duration::from_secs(1)).await;
        clock.advance(Duration::from_secs(5));

        let handle = store.spawn_sweeper(Duration::from_secs(300), shutdown_rx);
        time::sleep(Duration::from_secs(301)).await;
        assert!(storage.is_empty().await);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    struct BrokenStorage;

    #[async_trait]
    impl CacheStorage for BrokenStorage {
        async fn get(&self, _: &str) -> Result<Option<String>, CacheStorageError> {
            Err(CacheStorageError::Unavailable("down".into()))
        }
        async fn set(&self, _: &str, _: String) -> Result<(), CacheStorageError> {
            Err(CacheStorageError::Unavailable("down".into()))
        }
        async fn remove(&self, _: &str) -> Result<(), CacheStorageError> {
            Err(CacheStorageError::Unavailable("down".into()))
        }
        async fn remove_prefix(&self, _: &str) -> Result<usize, CacheStorageError> {
            Err(CacheStorageError::Unavailable("down".into()))
        }
        async fn keys(&self) -> Result<Vec<String>, CacheStorageError> {
            Err(CacheStorageError::Unavailable("down".into()))
        }
        async fn clear(&self) -> Result<(), CacheStorageError> {
            Err(CacheStorageError::Unavailable("down".into()))
        }
    }

    #[tokio::test]
    async fn backend_failures_degrade_to_misses() {
        let store = CacheStore::new(Arc::new(BrokenStorage), Arc::new(ManualClock::at_epoch()));

        store.set("k", &1).await;
        assert_eq!(store.get::<i32>("k").await, None);
        assert_eq!(store.remove_prefix("k").await, 0);
        assert_eq!(store.sweep_expired().await, 0);
    }
}
