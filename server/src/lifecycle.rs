//! Forward-only room lifecycle.

use shared::RoomState;

use crate::error::LifecycleError;

/// `Waiting -> Countdown -> Running -> Ended`, with `Ended` reachable from
/// any earlier state. Nothing ever moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifecycle {
    state: RoomState,
}

impl Lifecycle {
    /// Rooms are created the moment a match is formed, so they begin in
    /// countdown; `Waiting` belongs to the lobby.
    pub fn new() -> Self {
        Self {
            state: RoomState::Countdown,
        }
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RoomState::Running
    }

    pub fn is_ended(&self) -> bool {
        self.state == RoomState::Ended
    }

    pub fn transition(&mut self, to: RoomState) -> Result<(), LifecycleError> {
        let allowed = matches!(
            (self.state, to),
            (RoomState::Waiting, RoomState::Countdown)
                | (RoomState::Countdown, RoomState::Running)
                | (RoomState::Waiting | RoomState::Countdown | RoomState::Running, RoomState::Ended)
        );
        if !allowed {
            return Err(LifecycleError::IllegalTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
