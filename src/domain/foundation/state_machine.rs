//! Table-driven state machines for lifecycle enums.
//!
//! An implementor lists, per state, the states it may move to; checking and
//! performing a transition both read that table, so the two can never
//! disagree.

use super::ValidationError;

/// Lifecycle enum whose legal moves are given by [`StateMachine::successors`].
///
/// ```ignore
/// let next = ConnectionState::Disconnected.transition_to(ConnectionState::Connecting)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug + 'static {
    /// States reachable from `self` in one step.
    fn successors(&self) -> &'static [Self];

    fn can_transition_to(&self, target: &Self) -> bool {
        self.successors().contains(target)
    }

    /// Returns `target` if the move is legal.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            return Ok(target);
        }
        Err(ValidationError::invalid_format(
            "state",
            format!("{:?} cannot move to {:?}", self, target),
        ))
    }

    /// A state with no successors.
    fn is_terminal(&self) -> bool {
        self.successors().is_empty()
    }
}
