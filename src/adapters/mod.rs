//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the sync layer to external systems:
//! - `transport` - Realtime transports (WebSocket, in-memory)
//! - `cache` - Cache storage backends (in-memory, Redis)
//! - `rest` - REST API entity fetcher
//! - `auth` - Auth token providers
//! - `network` - Online/offline signal
//! - `clock` - System and manual clocks

pub mod auth;
pub mod cache;
pub mod clock;
pub mod network;
pub mod rest;
pub mod transport;

pub use auth::{EnvTokenProvider, StaticTokenProvider};
pub use cache::{InMemoryCacheStorage, RedisCacheStorage};
pub use clock::{ManualClock, SystemClock};
pub use network::WatchNetworkStatus;
pub use rest::RestEntityFetcher;
pub use transport::{InMemoryServer, InMemoryTransport, ServerConnection, WebSocketTransport};
