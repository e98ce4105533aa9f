//! Client record - an applicant whose visa case the agency manages.

use serde::{Deserialize, Serialize};

use super::{EntityKind, EntityRecord};
use crate::domain::foundation::{EntityId, OwnerScope, Timestamp};

/// Lifecycle of a client's visa case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    Pending,
    InProgress,
    UnderReview,
    Approved,
    Rejected,
    Completed,
}

impl ClientStatus {
    /// Returns true once the case has a final outcome.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            ClientStatus::Approved | ClientStatus::Rejected | ClientStatus::Completed
        )
    }
}

/// A visa applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: EntityId,
    pub agency_id: OwnerScope,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    pub visa_type: String,
    pub status: ClientStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Client {
    /// Display name, "First Last".
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl EntityRecord for Client {
    const KIND: EntityKind = EntityKind::Client;

    fn entity_id(&self) -> EntityId {
        self.id.clone()
    }

    fn owner_scope(&self) -> &OwnerScope {
        &self.agency_id
    }

    fn updated_at(&self) -> Timestamp {
        self.updated_at
    }
}
