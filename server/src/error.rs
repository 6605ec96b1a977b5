//! Error types at the seams of the simulation core.

use shared::{ParticipantId, RoomState};
use thiserror::Error;

/// Why an intent was rejected. Rooms log these and drop the intent; they
/// never propagate past the room boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IntentError {
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("ability is on cooldown ({remaining:.2}s left)")]
    OnCooldown { remaining: f32 },
    #[error("hero is dead")]
    HeroDead,
    #[error("participant {0} has no entity in this room")]
    UnknownParticipant(ParticipantId),
    #[error("intent does not apply to this game mode")]
    WrongMode,
    #[error("position is outside the allowed build area")]
    OutOfBounds,
    #[error("upgrade is already at its cap of {cap}")]
    AtCap { cap: u32 },
    #[error("{0} cannot be sold")]
    NotSellable(&'static str),
    #[error("room is paused")]
    Paused,
}

/// Illegal lifecycle requests.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LifecycleError {
    #[error("cannot move from {from:?} to {to:?}")]
    IllegalTransition { from: RoomState, to: RoomState },
    #[error("only the host may do that")]
    NotHost,
    #[error("not allowed while the room is {0:?}")]
    WrongState(RoomState),
    #[error("{0}")]
    Rejected(&'static str),
}

/// Failures of the process-level server, surfaced from `main`.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
}
