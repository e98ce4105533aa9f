//! Realtime transport configuration

use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::error::ValidationError;

/// Which transport implementation carries realtime frames.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    #[default]
    Websocket,
    /// Loopback transport with no network; for local runs and tests.
    InMemory,
}

/// Realtime transport configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// WebSocket endpoint, e.g. `wss://api.example.com/ws`
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub transport: TransportKind,

    /// Interval between `{"type":"ping"}` frames
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,

    /// How long an open attempt may take before it fails
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_reconnect_attempts: u32,

    #[serde(default = "default_base_delay")]
    pub reconnect_base_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub reconnect_max_delay_ms: u64,
}

impl RealtimeConfig {
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn reconnect_base_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_base_delay_ms)
    }

    pub fn reconnect_max_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_delay_ms)
    }

    /// Parsed endpoint. The in-memory transport accepts any URL and falls
    /// back to a placeholder when none is configured.
    pub fn endpoint(&self) -> Result<Url, ValidationError> {
        if self.url.is_empty() {
            return match self.transport {
                TransportKind::InMemory => Url::parse("ws://in-memory.local/ws")
                    .map_err(|e| ValidationError::InvalidRealtimeUrl(e.to_string())),
                TransportKind::Websocket => Err(ValidationError::MissingRequired("REALTIME__URL")),
            };
        }
        let url = Url::parse(&self.url)
            .map_err(|e| ValidationError::InvalidRealtimeUrl(e.to_string()))?;
        if self.transport == TransportKind::Websocket && !matches!(url.scheme(), "ws" | "wss") {
            return Err(ValidationError::InvalidRealtimeUrl(format!(
                "scheme '{}' is not ws or wss",
                url.scheme()
            )));
        }
        Ok(url)
    }

    /// Validate realtime configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.endpoint()?;
        if self.keepalive_secs == 0 || self.keepalive_secs > 600 {
            return Err(ValidationError::InvalidTimeout("keepalive_secs", 600));
        }
        if self.connect_timeout_secs == 0 || self.connect_timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout("connect_timeout_secs", 120));
        }
        if self.max_reconnect_attempts > 50 {
            return Err(ValidationError::TooManyReconnectAttempts);
        }
        if self.reconnect_base_delay_ms > self.reconnect_max_delay_ms {
            return Err(ValidationError::InvalidReconnectDelays);
        }
        Ok(())
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            transport: TransportKind::default(),
            keepalive_secs: default_keepalive(),
            connect_timeout_secs: default_connect_timeout(),
            max_reconnect_attempts: default_max_attempts(),
            reconnect_base_delay_ms: default_base_delay(),
            reconnect_max_delay_ms: default_max_delay(),
        }
    }
}

fn default_keepalive() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay() -> u64 {
    1_000
}

fn default_max_delay() -> u64 {
    30_000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn websocket(url: &str) -> RealtimeConfig {
        RealtimeConfig {
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_match_client_policy() {
        let config = RealtimeConfig::default();
        assert_eq!(config.keepalive_interval(), Duration::from_secs(30));
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.reconnect_base_delay(), Duration::from_secs(1));
        assert_eq!(config.reconnect_max_delay(), Duration::from_secs(30));
    }

    #[test]
    fn websocket_requires_url() {
        let err = RealtimeConfig::default().validate().unwrap_err();
        assert_eq!(err, ValidationError::MissingRequired("REALTIME__URL"));
    }

    #[test]
    fn websocket_rejects_http_scheme() {
        assert!(matches!(
            websocket("https://api.example.com/ws").validate(),
            Err(ValidationError::InvalidRealtimeUrl(_))
        ));
        assert!(websocket("wss://api.example.com/ws").validate().is_ok());
    }

    #[test]
    fn in_memory_needs_no_url() {
        let config = RealtimeConfig {
            transport: TransportKind::InMemory,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.endpoint().unwrap().scheme(), "ws");
    }

    #[test]
    fn rejects_inverted_delays() {
        let config = RealtimeConfig {
            reconnect_base_delay_ms: 60_000,
            ..websocket("ws://localhost:3001/ws")
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidReconnectDelays));
    }

    #[test]
    fn rejects_zero_keepalive() {
        let config = RealtimeConfig {
            keepalive_secs: 0,
            ..websocket("ws://localhost:3001/ws")
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidTimeout("keepalive_secs", _))
        ));
    }

    #[test]
    fn transport_kind_deserializes_snake_case() {
        let kind: TransportKind = serde_json::from_str("\"in_memory\"").unwrap();
        assert_eq!(kind, TransportKind::InMemory);
    }
}
