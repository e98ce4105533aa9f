//! Cache storage backends.
//!
//! - `InMemoryCacheStorage` - process-local map (default)
//! - `RedisCacheStorage` - shared Redis database

mod in_memory;
mod redis;

pub use self::redis::RedisCacheStorage;
pub use in_memory::InMemoryCacheStorage;
