//! Pre-room bookkeeping: an assault pairing queue and one open defense party.

use std::collections::VecDeque;

use log::info;
use shared::{GameMode, ParticipantId};

use crate::defense::HeroSeat;
use crate::error::LifecycleError;
use crate::registry::RoomPlan;

pub const MAX_PARTY_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum LobbyOutcome {
    /// Waiting for more players; `waiting` counts the queue or party.
    Queued { waiting: usize },
    /// Enough players: create the room now.
    Ready(RoomPlan),
    Rejected(&'static str),
}

#[derive(Debug, Default)]
pub struct Lobby {
    assault: VecDeque<ParticipantId>,
    party: Vec<HeroSeat>,
}

impl Lobby {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a participant for `mode`. Assault pairs the two oldest
    /// entries; defense joins the open party, whose first member hosts.
    pub fn queue(&mut self, seat: HeroSeat, mode: GameMode) -> LobbyOutcome {
        if self.is_queued(seat.participant) {
            return LobbyOutcome::Rejected("already queued");
        }

        match mode {
            GameMode::Assault => {
                self.assault.push_back(seat.participant);
                if self.assault.len() < 2 {
                    return LobbyOutcome::Queued {
                        waiting: self.assault.len(),
                    };
                }
                match (self.assault.pop_front(), self.assault.pop_front()) {
                    (Some(left), Some(right)) => {
                        info!("Paired {} and {} for assault", left, right);
                        LobbyOutcome::Ready(RoomPlan::Assault { left, right })
                    }
                    _ => LobbyOutcome::Rejected("pairing failed"),
                }
            }
            GameMode::Defense => {
                if self.party.len() >= MAX_PARTY_SIZE {
                    return LobbyOutcome::Rejected("party is full");
                }
                self.party.push(seat);
                LobbyOutcome::Queued {
                    waiting: self.party.len(),
                }
            }
        }
    }

    /// Closes the open party into a defense room. Only its host may.
    pub fn start_party(&mut self, participant: ParticipantId) -> Result<RoomPlan, LifecycleError> {
        match self.party.first() {
            Some(host) if host.participant == participant => Ok(RoomPlan::Defense {
                seats: std::mem::take(&mut self.party),
            }),
            Some(_) => Err(LifecycleError::NotHost),
            None => Err(LifecycleError::Rejected("no party to start")),
        }
    }

    /// Removes the participant from every queue. Returns true if it was queued.
    pub fn leave(&mut self, participant: ParticipantId) -> bool {
        let before = self.assault.len() + self.party.len();
        self.assault.retain(|p| *p != participant);
        self.party.retain(|s| s.participant != participant);
        before != self.assault.len() + self.party.len()
    }

    pub fn is_queued(&self, participant: ParticipantId) -> bool {
        self.assault.contains(&participant) || self.party.iter().any(|s| s.participant == participant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::HeroClass;

    fn seat(participant: ParticipantId) -> HeroSeat {
        HeroSeat {
            participant,
            class: HeroClass::Warrior,
            character_level: 2,
        }
    }

    #[test]
    fn test_assault_pairs_in_fifo_order() {
        let mut lobby = Lobby::new();
        assert_eq!(lobby.queue(seat(1), GameMode::Assault), LobbyOutcome::Queued { waiting: 1 });
        assert_eq!(
            lobby.queue(seat(2), GameMode::Assault),
            LobbyOutcome::Ready(RoomPlan::Assault { left: 1, right: 2 })
        );
        assert!(!lobby.is_queued(1));
        assert_eq!(lobby.queue(seat(3), GameMode::Assault), LobbyOutcome::Queued { waiting: 1 });
    }

    #[test]
    fn test_double_queue_rejected() {
        let mut lobby = Lobby::new();
        lobby.queue(seat(1), GameMode::Defense);
        assert!(matches!(lobby.queue(seat(1), GameMode::Assault), LobbyOutcome::Rejected(_)));
    }

    #[test]
    fn test_party_caps_at_four() {
        let mut lobby = Lobby::new();
        for p in 1..=4 {
            lobby.queue(seat(p), GameMode::Defense);
        }
        assert_eq!(lobby.queue(seat(5), GameMode::Defense), LobbyOutcome::Rejected("party is full"));
        assert_eq!(lobby.party.first().map(|s| s.participant), Some(1));
    }

    #[test]
    fn test_only_host_starts_party() {
        let mut lobby = Lobby::new();
        lobby.queue(seat(1), GameMode::Defense);
        lobby.queue(seat(2), GameMode::Defense);

        assert_eq!(lobby.start_party(2), Err(LifecycleError::NotHost));
        match lobby.start_party(1) {
            Ok(RoomPlan::Defense { seats }) => assert_eq!(seats.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        assert!(lobby.party.is_empty());
        assert!(lobby.start_party(1).is_err());
    }

    #[test]
    fn test_leave_clears_queues_and_moves_host() {
        let mut lobby = Lobby::new();
        lobby.queue(seat(1), GameMode::Defense);
        lobby.queue(seat(2), GameMode::Defense);
        assert!(lobby.leave(1));
        assert!(!lobby.leave(1));
        assert_eq!(lobby.party.first().map(|s| s.participant), Some(2));
    }
}
