//! Application layer - realtime client, cache and synchronization.
//!
//! - `realtime_client` - connection lifecycle, keep-alive, reconnect, dispatch
//! - `cache_store` / `entity_cache` / `cache_keys` - TTL cache and its
//!   invalidation rules
//! - `entity_service` - read-through access to the REST collaborator
//! - `sync_controller` - applies realtime events to local state and cache
//! - `runtime` / `supervisor` - explicit wiring and background task ownership

pub mod cache_keys;
mod cache_store;
mod entity_cache;
mod entity_service;
pub mod realtime_client;
pub mod runtime;
mod supervisor;
pub mod sync_controller;

pub use cache_store::{CacheEntry, CacheStore};
pub use entity_cache::{CacheTtls, EntityCache};
pub use entity_service::CachedEntityService;
pub use realtime_client::{
    MessageListener, RealtimeClient, RealtimeClientConfig, RealtimeError, ReconnectPolicy,
};
pub use runtime::{token_provider, RuntimeError, SyncRuntime};
pub use supervisor::Supervisor;
pub use sync_controller::{SyncController, SyncControllerConfig, DEFAULT_STATUS_POLL_INTERVAL};
