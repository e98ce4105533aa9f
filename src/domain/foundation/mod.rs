//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, connection states and error types
//! that form the vocabulary of the sync layer.

mod connection_state;
mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use connection_state::{ConnectionState, SyncStatus};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{EntityId, ListenerId, OwnerScope};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
