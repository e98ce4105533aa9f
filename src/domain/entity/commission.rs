//! Commission record - agent earnings attached to a client case.

use serde::{Deserialize, Serialize};

use super::{EntityKind, EntityRecord};
use crate::domain::foundation::{EntityId, OwnerScope, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionStatus {
    Pending,
    Approved,
    Paid,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commission {
    pub id: EntityId,
    pub agency_id: OwnerScope,
    pub client_id: EntityId,
    /// Amount in minor units (cents).
    pub amount_cents: i64,
    pub currency: String,
    pub status: CommissionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl EntityRecord for Commission {
    const KIND: EntityKind = EntityKind::Commission;

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
