//! Synchronization controller configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::entity::EntityKind;
use crate::domain::foundation::OwnerScope;

/// Sync configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Comma-separated entity kinds to synchronize
    #[serde(default = "default_entities")]
    pub entities: String,

    /// Connection-status poll period in milliseconds
    #[serde(default = "default_status_poll")]
    pub status_poll_ms: u64,

    /// Restrict local views to one agency
    #[serde(default)]
    pub agency_id: Option<String>,
}

impl SyncConfig {
    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_millis(self.status_poll_ms)
    }

    /// Parsed entity kinds, deduplicated, in configured order.
    pub fn kinds(&self) -> Result<Vec<EntityKind>, ValidationError> {
        let mut kinds = Vec::new();
        for name in self.entities.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let kind = name
                .parse::<EntityKind>()
                .map_err(|_| ValidationError::UnknownEntityKind(name.to_string()))?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        if kinds.is_empty() {
            return Err(ValidationError::NoEntityKinds);
        }
        Ok(kinds)
    }

    pub fn owner(&self) -> Result<Option<OwnerScope>, ValidationError> {
        self.agency_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|id| OwnerScope::new(id).map_err(|_| ValidationError::InvalidOwnerScope))
            .transpose()
    }

    /// Validate sync configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.kinds()?;
        self.owner()?;
        if self.status_poll_ms < 100 || self.status_poll_ms > 60_000 {
            return Err(ValidationError::InvalidTimeout("sync.status_poll_ms", 60));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            entities: default_entities(),
            status_poll_ms: default_status_poll(),
            agency_id: None,
        }
    }
}

fn default_entities() -> String {
    "client,task,commission,notification".to_string()
}

fn default_status_poll() -> u64 {
    1_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_syncs_every_kind() {
        let config = SyncConfig::default();
        assert_eq!(config.kinds().unwrap(), EntityKind::ALL.to_vec());
        assert_eq!(config.status_poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn parses_trimmed_deduplicated_kinds() {
        let config = SyncConfig {
            entities: " task, client ,task".to_string(),
            ..Default::default()
        };
        assert_eq!(config.kinds().unwrap(), vec![EntityKind::Task, EntityKind::Client]);
    }

    #[test]
    fn rejects_unknown_kind() {
        let config = SyncConfig {
            entities: "client,visa".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::UnknownEntityKind("visa".to_string()))
        );
    }

    #[test]
    fn rejects_empty_kind_list() {
        let config = SyncConfig {
            entities: " , ".to_string(),
            ..Default::default()
        };
        assert_eq!(config.kinds(), Err(ValidationError::NoEntityKinds));
    }

    #[test]
    fn agency_scope_is_optional() {
        let scoped = SyncConfig {
            agency_id: Some("agency-1".to_string()),
            ..Default::default()
        };
        assert_eq!(scoped.owner().unwrap().unwrap().as_str(), "agency-1");
        assert_eq!(SyncConfig::default().owner().unwrap(), None);
    }
}
