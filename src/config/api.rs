//! REST API collaborator configuration

use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::error::ValidationError;

/// REST API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST API, e.g. `https://api.example.com/api`.
    /// Without it the daemon runs realtime-only.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parsed base URL, if configured.
    pub fn base(&self) -> Result<Option<Url>, ValidationError> {
        let Some(raw) = self.base_url.as_deref().filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let url = Url::parse(raw).map_err(|e| ValidationError::InvalidApiUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ValidationError::InvalidApiUrl(format!(
                "scheme '{}' is not http or https",
                url.scheme()
            )));
        }
        Ok(Some(url))
    }

    /// Validate API configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.base()?;
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout("api.request_timeout_secs", 300));
        }
        Ok(())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    30
}
