//! The seam between the shared room lifecycle and a game mode.
//!
//! A [`crate::room::Room`] owns the lifecycle, clocks, snapshot throttling
//! and host actions; everything mode-specific sits behind [`RoomRules`].

use shared::{
    GameEvent, GameMode, Intent, MatchResult, ParticipantId, ParticipantReport, RoomMessage,
    RoomState, Snapshot,
};

use crate::error::IntentError;

/// A message leaving the room, addressed to everyone or to one participant.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Broadcast(RoomMessage),
    Direct(ParticipantId, RoomMessage),
}

/// Collects what a room produced while handling one command.
#[derive(Debug, Default)]
pub struct Outbox {
    messages: Vec<Outbound>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broadcast(&mut self, message: RoomMessage) {
        self.messages.push(Outbound::Broadcast(message));
    }

    pub fn event(&mut self, event: GameEvent) {
        self.broadcast(RoomMessage::Event(event));
    }

    pub fn direct(&mut self, participant: ParticipantId, message: RoomMessage) {
        self.messages.push(Outbound::Direct(participant, message));
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn drain(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.messages)
    }

    /// Events broadcast so far, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &GameEvent> {
        self.messages.iter().filter_map(|m| match m {
            Outbound::Broadcast(RoomMessage::Event(event)) => Some(event),
            _ => None,
        })
    }
}

/// Mode-specific simulation plugged into a room.
///
/// `now` is always the room's simulation clock in seconds, derived from the
/// tick count rather than wall time.
pub trait RoomRules: Send + 'static {
    fn mode(&self) -> GameMode;

    /// Called once when the countdown completes.
    fn on_start(&mut self, out: &mut Outbox);

    /// Applies a gameplay intent. Rejections are returned, never raised.
    fn apply_intent(
        &mut self,
        participant: ParticipantId,
        intent: &Intent,
        now: f32,
        out: &mut Outbox,
    ) -> Result<(), IntentError>;

    /// Advances the simulation by one fixed slice.
    fn tick(&mut self, dt: f32, now: f32, out: &mut Outbox);

    /// Win/loss check, evaluated after every tick.
    fn outcome(&self, now: f32) -> Option<MatchResult>;

    fn snapshot(&self, now: f32) -> Snapshot;

    /// Reacts to a participant's connection closing. A returned result ends
    /// the room immediately.
    fn on_disconnect(
        &mut self,
        participant: ParticipantId,
        state: RoomState,
        out: &mut Outbox,
    ) -> Option<MatchResult>;

    /// Final per-participant totals for the profile service.
    fn reports(&self, result: &MatchResult) -> Vec<ParticipantReport>;
}
