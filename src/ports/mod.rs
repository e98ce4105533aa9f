//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the application and the outside world. Adapters implement these ports.
//!
//! ## Realtime
//!
//! - `Transport` - Opens text-frame connections to the realtime server
//!
//! ## Cache
//!
//! - `CacheStorage` - Key/value persistence for serialized cache entries
//! - `Clock` - Time source for TTL checks
//!
//! ## Collaborators
//!
//! - `AuthTokenProvider` - Session token for connections and REST calls
//! - `NetworkStatus` - Online/offline signal
//! - `EntityFetcher` - REST source of truth for records

mod auth_token_provider;
mod cache_storage;
mod clock;
mod entity_fetcher;
mod network_status;
mod transport;

pub use auth_token_provider::AuthTokenProvider;
pub use cache_storage::{CacheStorage, CacheStorageError};
pub use clock::Clock;
pub use entity_fetcher::{EntityFetcher, FetchError};
pub use network_status::NetworkStatus;
pub use transport::{InboundFrame, OutboundFrame, Transport, TransportError, TransportLink};
