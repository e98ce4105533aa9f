//! Cache configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Storage backend behind the cache store.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    #[default]
    Memory,
    /// Requires the `redis` section.
    Redis,
}

/// Cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,

    /// TTL applied when a write names none
    #[serde(default = "default_ttl")]
    pub default_ttl_secs: u64,

    #[serde(default = "default_ttl")]
    pub entity_ttl_secs: u64,

    #[serde(default = "default_list_ttl")]
    pub list_ttl_secs: u64,

    #[serde(default = "default_stats_ttl")]
    pub stats_ttl_secs: u64,

    /// Period of the expired-entry sweep; 0 disables it
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn entity_ttl(&self) -> Duration {
        Duration::from_secs(self.entity_ttl_secs)
    }

    pub fn list_ttl(&self) -> Duration {
        Duration::from_secs(self.list_ttl_secs)
    }

    pub fn stats_ttl(&self) -> Duration {
        Duration::from_secs(self.stats_ttl_secs)
    }

    /// `None` when sweeping is disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    /// Validate cache configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in [
            ("default_ttl_secs", self.default_ttl_secs),
            ("entity_ttl_secs", self.entity_ttl_secs),
            ("list_ttl_secs", self.list_ttl_secs),
            ("stats_ttl_secs", self.stats_ttl_secs),
        ] {
            if value == 0 {
                return Err(ValidationError::InvalidTtl(name));
            }
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            default_ttl_secs: default_ttl(),
            entity_ttl_secs: default_ttl(),
            list_ttl_secs: default_list_ttl(),
            stats_ttl_secs: default_stats_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_ttl() -> u64 {
    300
}

fn default_list_ttl() -> u64 {
    120
}

fn default_stats_ttl() -> u64 {
    60
}

fn default_sweep_interval() -> u64 {
    300
}
