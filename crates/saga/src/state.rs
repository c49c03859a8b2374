//! Booking saga state machine.

use serde::{Deserialize, Serialize};

use crate::error::SagaError;

/// The state of one booking saga run.
///
/// State transitions:
/// ```text
/// Start ──► Reserving ──┬──► Committing ──► DoneConfirmed
///                       └──► Compensating ──► DoneCancelled
/// ```
///
/// A run cancelled by its caller stops in `Reserving`; the booking row it
/// left behind is resolved later by the janitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SagaState {
    /// Nothing has been written yet.
    #[default]
    Start,

    /// The PENDING row exists and the inventory service is being asked for the room.
    Reserving,

    /// Inventory confirmed; the booking is being marked CONFIRMED.
    Committing,

    /// Inventory refused or was unreachable; the booking is being cancelled.
    Compensating,

    /// Booking confirmed (terminal state).
    DoneConfirmed,

    /// Booking cancelled and the hold released (terminal state).
    DoneCancelled,
}

impl SagaState {
    /// Returns true if `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: SagaState) -> bool {
        matches!(
            (self, next),
            (SagaState::Start, SagaState::Reserving)
                | (SagaState::Reserving, SagaState::Committing)
                | (SagaState::Reserving, SagaState::Compensating)
                | (SagaState::Committing, SagaState::DoneConfirmed)
                | (SagaState::Compensating, SagaState::DoneCancelled)
        )
    }

    /// Moves to `next`, rejecting illegal transitions.
    pub fn advance(self, next: SagaState) -> Result<SagaState, SagaError> {
        if !self.can_transition_to(next) {
            return Err(SagaError::IllegalTransition {
                from: self,
                to: next,
            });
        }
        tracing::debug!(from = %self, to = %next, "saga state transition");
        Ok(next)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::Start => "START",
            SagaState::Reserving => "RESERVING",
            SagaState::Committing => "COMMITTING",
            SagaState::Compensating => "COMPENSATING",
            SagaState::DoneConfirmed => "DONE_CONFIRMED",
            SagaState::DoneCancelled => "DONE_CANCELLED",
        }
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
