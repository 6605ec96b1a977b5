//! A single simulation room: lifecycle, clocks and host actions around a
//! pluggable [`RoomRules`] mode.
//!
//! [`Room`] is fully synchronous so it can be driven tick by tick in tests.
//! In the server each room is owned by one tokio task ([`run_room`]) that
//! receives every intent, disconnect and timer firing through a single
//! channel, which makes the room's own task its only mutator.

use std::collections::BTreeSet;

use log::{debug, info, warn};
use shared::{
    AbortReason, GameMode, Intent, MatchResult, ParticipantId, ParticipantReport, RoomId,
    RoomMessage, RoomState, ServerPacket,
};
use tokio::sync::mpsc;

use crate::config::RoomTiming;
use crate::error::{IntentError, LifecycleError};
use crate::gateway::Gateway;
use crate::lifecycle::Lifecycle;
use crate::registry::{RoomPlan, RoomSpawner};
use crate::rules::{Outbound, Outbox, RoomRules};
use crate::scheduler::{Scheduler, TimerKind};

/// Everything that can reach a running room.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomCommand {
    Intent {
        participant: ParticipantId,
        intent: Intent,
    },
    Disconnect {
        participant: ParticipantId,
    },
    Timer(TimerKind),
}

/// Side effects a room asks its driver to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StartClock,
    StopClock,
    StopCountdown,
    /// The room ended; the driver reports the result and tears it down.
    Terminate {
        result: MatchResult,
        reports: Vec<ParticipantReport>,
    },
    /// Create a fresh room with the same participants once this one is gone.
    Restart,
}

pub struct Room<R: RoomRules> {
    id: RoomId,
    rules: R,
    lifecycle: Lifecycle,
    participants: Vec<ParticipantId>,
    connected: BTreeSet<ParticipantId>,
    host: ParticipantId,
    timing: RoomTiming,
    ticks: u64,
    snapshot_every: u64,
    countdown_remaining: u32,
    paused: bool,
    result: Option<MatchResult>,
}

impl<R: RoomRules> Room<R> {
    /// Creates a room in countdown. The first participant is the host.
    pub fn new(id: RoomId, participants: Vec<ParticipantId>, rules: R, timing: RoomTiming) -> Self {
        let host = participants.first().copied().unwrap_or_default();
        let snapshot_every = (timing.snapshot_interval.as_secs_f64() / timing.tick.as_secs_f64())
            .round()
            .max(1.0) as u64;
        Self {
            id,
            rules,
            lifecycle: Lifecycle::new(),
            connected: participants.iter().copied().collect(),
            participants,
            host,
            timing,
            ticks: 0,
            snapshot_every,
            countdown_remaining: timing.countdown_ticks,
            paused: false,
            result: None,
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn mode(&self) -> GameMode {
        self.rules.mode()
    }

    pub fn state(&self) -> RoomState {
        self.lifecycle.state()
    }

    pub fn host(&self) -> ParticipantId {
        self.host
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn participants(&self) -> &[ParticipantId] {
        &self.participants
    }

    /// Participants whose connection is still open, in seat order.
    pub fn recipients(&self) -> Vec<ParticipantId> {
        self.participants
            .iter()
            .copied()
            .filter(|p| self.connected.contains(p))
            .collect()
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut R {
        &mut self.rules
    }

    pub fn result(&self) -> Option<MatchResult> {
        self.result
    }

    /// Simulation clock in seconds, derived from the tick count.
    pub fn elapsed(&self) -> f32 {
        self.ticks as f32 * self.timing.tick_secs()
    }

    /// Announces the room and the first countdown value.
    pub fn open(&mut self, out: &mut Outbox) {
        out.broadcast(RoomMessage::Created {
            mode: self.mode(),
            participants: self.participants.clone(),
            host: self.host,
        });
        out.broadcast(RoomMessage::Countdown {
            remaining: self.countdown_remaining,
        });
    }

    pub fn countdown_tick(&mut self, out: &mut Outbox) -> Vec<Effect> {
        if self.state() != RoomState::Countdown {
            return Vec::new();
        }
        self.countdown_remaining = self.countdown_remaining.saturating_sub(1);
        if self.countdown_remaining > 0 {
            out.broadcast(RoomMessage::Countdown {
                remaining: self.countdown_remaining,
            });
            return Vec::new();
        }

        if let Err(e) = self.lifecycle.transition(RoomState::Running) {
            warn!("Room {} could not start: {}", self.id, e);
            return Vec::new();
        }
        info!("Room {} ({:?}) started", self.id, self.mode());
        out.broadcast(RoomMessage::Started);
        self.rules.on_start(out);
        vec![Effect::StopCountdown, Effect::StartClock]
    }

    /// Advances the simulation by one fixed slice.
    pub fn tick(&mut self, out: &mut Outbox) -> Vec<Effect> {
        if !self.lifecycle.is_running() || self.paused {
            return Vec::new();
        }
        self.ticks += 1;
        let dt = self.timing.tick_secs();
        let now = self.elapsed();
        self.rules.tick(dt, now, out);

        if self.ticks % self.snapshot_every == 0 {
            out.broadcast(RoomMessage::Snapshot(self.rules.snapshot(now)));
        }

        match self.rules.outcome(now) {
            Some(result) => self.end(result, out),
            None => Vec::new(),
        }
    }

    /// Applies one participant intent. Rejections never leave the room:
    /// gameplay rejections are dropped, lifecycle rejections become a notice
    /// to the sender.
    pub fn handle_intent(&mut self, participant: ParticipantId, intent: &Intent, out: &mut Outbox) -> Vec<Effect> {
        if !self.participants.contains(&participant) {
            debug!("Room {} ignoring intent from outsider {}", self.id, participant);
            return Vec::new();
        }

        if intent.is_host_action() {
            return match self.host_action(participant, intent, out) {
                Ok(effects) => effects,
                Err(e) => {
                    debug!("Room {} rejected {:?} from {}: {}", self.id, intent, participant, e);
                    out.direct(participant, RoomMessage::Notice { text: e.to_string() });
                    Vec::new()
                }
            };
        }

        if !self.lifecycle.is_running() {
            debug!("Room {} ignoring {:?} while {:?}", self.id, intent, self.state());
            return Vec::new();
        }
        if let Err(e) = self.apply_gameplay(participant, intent, out) {
            debug!("Room {} rejected {:?} from {}: {}", self.id, intent, participant, e);
        }
        Vec::new()
    }

    fn apply_gameplay(&mut self, participant: ParticipantId, intent: &Intent, out: &mut Outbox) -> Result<(), IntentError> {
        if self.paused {
            return Err(IntentError::Paused);
        }
        let now = self.elapsed();
        self.rules.apply_intent(participant, intent, now, out)
    }

    fn host_action(
        &mut self,
        participant: ParticipantId,
        intent: &Intent,
        out: &mut Outbox,
    ) -> Result<Vec<Effect>, LifecycleError> {
        if participant != self.host {
            return Err(LifecycleError::NotHost);
        }
        let state = self.state();
        if state == RoomState::Ended {
            return Err(LifecycleError::WrongState(state));
        }

        match intent {
            Intent::Start => Err(LifecycleError::Rejected("the room is already starting")),
            Intent::Pause => {
                if state != RoomState::Running || self.paused {
                    return Err(LifecycleError::WrongState(state));
                }
                self.paused = true;
                out.broadcast(RoomMessage::Paused);
                Ok(vec![Effect::StopClock])
            }
            Intent::Resume => {
                if state != RoomState::Running || !self.paused {
                    return Err(LifecycleError::WrongState(state));
                }
                self.paused = false;
                out.broadcast(RoomMessage::Resumed);
                Ok(vec![Effect::StartClock])
            }
            Intent::Stop => Ok(self.abort(AbortReason::Stopped, out)),
            Intent::ReturnToLobby => Ok(self.abort(AbortReason::ReturnedToLobby, out)),
            Intent::DestroyRoom => Ok(self.abort(AbortReason::Destroyed, out)),
            Intent::Restart => {
                let mut effects = self.abort(AbortReason::Restarted, out);
                effects.push(Effect::Restart);
                Ok(effects)
            }
            _ => Err(LifecycleError::Rejected("not a host action")),
        }
    }

    fn abort(&mut self, reason: AbortReason, out: &mut Outbox) -> Vec<Effect> {
        self.end(MatchResult::Aborted { reason }, out)
    }

    /// Handles a closed connection. Returns the effects of ending the room
    /// when the mode decides the loss is fatal.
    pub fn disconnect(&mut self, participant: ParticipantId, out: &mut Outbox) -> Vec<Effect> {
        if self.lifecycle.is_ended() || !self.connected.remove(&participant) {
            return Vec::new();
        }
        info!("Participant {} left room {}", participant, self.id);

        if participant == self.host {
            if let Some(next) = self.recipients().first().copied() {
                self.host = next;
                out.broadcast(RoomMessage::Notice {
                    text: format!("participant {} is now the host", next),
                });
            }
        }

        match self.rules.on_disconnect(participant, self.state(), out) {
            Some(result) => self.end(result, out),
            None => Vec::new(),
        }
    }

    /// Moves to `Ended` exactly once and broadcasts the result.
    fn end(&mut self, result: MatchResult, out: &mut Outbox) -> Vec<Effect> {
        if self.lifecycle.transition(RoomState::Ended).is_err() {
            return Vec::new();
        }
        let reports = self.rules.reports(&result);
        info!("Room {} ended: {:?}", self.id, result);
        out.broadcast(RoomMessage::Ended {
            result,
            reports: reports.clone(),
        });
        self.result = Some(result);
        vec![
            Effect::StopClock,
            Effect::StopCountdown,
            Effect::Terminate { result, reports },
        ]
    }
}

/// Pushes everything in `out` through the gateway.
fn flush<R: RoomRules>(room: &Room<R>, out: &mut Outbox, gateway: &dyn Gateway) {
    let recipients = room.recipients();
    for outbound in out.drain() {
        match outbound {
            Outbound::Broadcast(message) => {
                for participant in &recipients {
                    gateway.deliver(
                        *participant,
                        ServerPacket::Room {
                            room_id: room.id(),
                            message: message.clone(),
                        },
                    );
                }
            }
            Outbound::Direct(participant, message) => gateway.deliver(
                participant,
                ServerPacket::Room {
                    room_id: room.id(),
                    message,
                },
            ),
        }
    }
}

/// Drives one room until it ends. Timers live in a [`Scheduler`] owned by
/// this task and are all cancelled before the room is reported and dropped.
pub async fn run_room<R: RoomRules>(
    mut room: Room<R>,
    tx: mpsc::UnboundedSender<RoomCommand>,
    mut rx: mpsc::UnboundedReceiver<RoomCommand>,
    spawner: RoomSpawner,
    plan: RoomPlan,
) {
    let timing = spawner.timing();
    let gateway = spawner.gateway();
    let mut scheduler = Scheduler::new(tx);
    let mut out = Outbox::new();

    room.open(&mut out);
    flush(&room, &mut out, gateway.as_ref());
    scheduler.start_repeating(TimerKind::Countdown, timing.countdown_period, || {
        RoomCommand::Timer(TimerKind::Countdown)
    });

    while let Some(command) = rx.recv().await {
        let effects = match command {
            RoomCommand::Intent { participant, intent } => room.handle_intent(participant, &intent, &mut out),
            RoomCommand::Disconnect { participant } => room.disconnect(participant, &mut out),
            RoomCommand::Timer(TimerKind::Countdown) => room.countdown_tick(&mut out),
            RoomCommand::Timer(TimerKind::Tick) => room.tick(&mut out),
        };
        flush(&room, &mut out, gateway.as_ref());

        let mut outcome = None;
        let mut restart = false;
        for effect in effects {
            match effect {
                Effect::StartClock => scheduler.start_repeating(TimerKind::Tick, timing.tick, || {
                    RoomCommand::Timer(TimerKind::Tick)
                }),
                Effect::StopClock => {
                    scheduler.cancel(TimerKind::Tick);
                }
                Effect::StopCountdown => {
                    scheduler.cancel(TimerKind::Countdown);
                }
                Effect::Terminate { result, reports } => outcome = Some((result, reports)),
                Effect::Restart => restart = true,
            }
        }

        if let Some((result, reports)) = outcome {
            scheduler.cancel_all();
            spawner.retire(room.id(), room.mode(), result, reports).await;
            if restart {
                match plan.retain_connected(&room.recipients()) {
                    Some(plan) => {
                        spawner.spawn(plan).await;
                    }
                    None => info!("Room {} not restarted: too few participants left", room.id()),
                }
            }
            break;
        }
    }
    debug!("Room {} task finished", room.id());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assault::AssaultRules;
    use crate::defense::{DefenseRules, HeroSeat};
    use shared::{DefeatReason, GameEvent, HeroClass, Side, UnitKind, WinReason};

    fn assault_room() -> Room<AssaultRules> {
        Room::new(1, vec![10, 20], AssaultRules::new(10, 20, 300.0), RoomTiming::default())
    }

    fn defense_room(participants: &[ParticipantId]) -> Room<DefenseRules> {
        let seats: Vec<HeroSeat> = participants
            .iter()
            .map(|p| HeroSeat {
                participant: *p,
                class: HeroClass::Knight,
                character_level: 5,
            })
            .collect();
        Room::new(2, participants.to_vec(), DefenseRules::new(&seats, 7), RoomTiming::default())
    }

    fn start<R: RoomRules>(room: &mut Room<R>, out: &mut Outbox) {
        room.open(out);
        for _ in 0..3 {
            room.countdown_tick(out);
        }
        assert_eq!(room.state(), RoomState::Running);
    }

    fn broadcasts(out: &mut Outbox) -> Vec<RoomMessage> {
        out.drain()
            .into_iter()
            .filter_map(|o| match o {
                Outbound::Broadcast(message) => Some(message),
                Outbound::Direct(..) => None,
            })
            .collect()
    }

    fn count_ended(messages: &[RoomMessage]) -> usize {
        messages
            .iter()
            .filter(|m| matches!(m, RoomMessage::Ended { .. }))
            .count()
    }

    #[test]
    fn test_countdown_runs_three_ticks_then_starts() {
        let mut room = assault_room();
        let mut out = Outbox::new();
        room.open(&mut out);
        assert!(room.countdown_tick(&mut out).is_empty());
        assert!(room.countdown_tick(&mut out).is_empty());
        let effects = room.countdown_tick(&mut out);
        assert_eq!(effects, vec![Effect::StopCountdown, Effect::StartClock]);

        let messages = broadcasts(&mut out);
        let countdown: Vec<u32> = messages
            .iter()
            .filter_map(|m| match m {
                RoomMessage::Countdown { remaining } => Some(*remaining),
                _ => None,
            })
            .collect();
        assert_eq!(countdown, vec![3, 2, 1]);
        assert!(matches!(messages[0], RoomMessage::Created { host: 10, .. }));
        assert!(messages.contains(&RoomMessage::Started));

        // Late countdown firings are ignored
        assert!(room.countdown_tick(&mut out).is_empty());
        assert!(out.is_empty());
    }

    #[test]
    fn test_intents_ignored_before_running() {
        let mut room = assault_room();
        let mut out = Outbox::new();
        room.open(&mut out);
        out.drain();
        room.handle_intent(10, &Intent::SpawnUnit { kind: UnitKind::Soldier }, &mut out);
        assert!(out.is_empty());
        assert!(room.tick(&mut out).is_empty());
        assert_eq!(room.elapsed(), 0.0);
    }

    #[test]
    fn test_snapshots_are_throttled() {
        let mut room = assault_room();
        let mut out = Outbox::new();
        start(&mut room, &mut out);
        out.drain();

        for _ in 0..10 {
            room.tick(&mut out);
        }
        let snapshots = broadcasts(&mut out)
            .iter()
            .filter(|m| matches!(m, RoomMessage::Snapshot(_)))
            .count();
        // 50 ms ticks, 100 ms snapshots
        assert_eq!(snapshots, 5);
        assert!((room.elapsed() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_intent_reaches_rules_when_running() {
        let mut room = assault_room();
        let mut out = Outbox::new();
        start(&mut room, &mut out);
        out.drain();
        room.handle_intent(10, &Intent::SpawnUnit { kind: UnitKind::Soldier }, &mut out);
        assert!(out
            .events()
            .any(|e| matches!(e, GameEvent::UnitSpawned { side: Side::Left, .. })));
        assert_eq!(room.rules().units().len(), 1);
    }

    #[test]
    fn test_non_host_gets_notice() {
        let mut room = assault_room();
        let mut out = Outbox::new();
        start(&mut room, &mut out);
        out.drain();

        assert!(room.handle_intent(20, &Intent::Pause, &mut out).is_empty());
        let messages = out.drain();
        assert_eq!(messages.len(), 1);
        assert!(matches!(&messages[0], Outbound::Direct(20, RoomMessage::Notice { .. })));
        assert!(!room.is_paused());
    }

    #[test]
    fn test_pause_and_resume() {
        let mut room = assault_room();
        let mut out = Outbox::new();
        start(&mut room, &mut out);

        assert_eq!(room.handle_intent(10, &Intent::Pause, &mut out), vec![Effect::StopClock]);
        assert!(room.is_paused());
        assert!(room.tick(&mut out).is_empty());
        assert_eq!(room.elapsed(), 0.0);
        out.drain();

        room.handle_intent(10, &Intent::SpawnUnit { kind: UnitKind::Soldier }, &mut out);
        assert!(room.rules().units().is_empty());

        // Pausing twice is a lifecycle violation
        room.handle_intent(10, &Intent::Pause, &mut out);
        assert!(matches!(out.drain()[0], Outbound::Direct(10, RoomMessage::Notice { .. })));

        assert_eq!(room.handle_intent(10, &Intent::Resume, &mut out), vec![Effect::StartClock]);
        room.tick(&mut out);
        assert!(room.elapsed() > 0.0);
    }

    #[test]
    fn test_gameplay_rejected_while_paused() {
        let mut room = assault_room();
        let mut out = Outbox::new();
        start(&mut room, &mut out);
        room.handle_intent(10, &Intent::Pause, &mut out);
        out.drain();

        let spawn = Intent::SpawnUnit { kind: UnitKind::Soldier };
        assert_eq!(room.apply_gameplay(10, &spawn, &mut out), Err(IntentError::Paused));
        assert!(out.is_empty());

        room.handle_intent(10, &Intent::Resume, &mut out);
        assert_eq!(room.apply_gameplay(10, &spawn, &mut out), Ok(()));
        assert_eq!(room.rules().units().len(), 1);
    }

    #[test]
    fn test_stop_ends_exactly_once() {
        let mut room = assault_room();
        let mut out = Outbox::new();
        start(&mut room, &mut out);

        let effects = room.handle_intent(10, &Intent::Stop, &mut out);
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Terminate {
                result: MatchResult::Aborted {
                    reason: AbortReason::Stopped
                },
                ..
            }
        )));
        assert!(room.handle_intent(10, &Intent::Stop, &mut out).is_empty());
        assert!(room.tick(&mut out).is_empty());
        assert_eq!(count_ended(&broadcasts(&mut out)), 1);
        assert_eq!(room.state(), RoomState::Ended);
    }

    #[test]
    fn test_restart_requests_new_room() {
        let mut room = assault_room();
        let mut out = Outbox::new();
        room.open(&mut out);
        let effects = room.handle_intent(10, &Intent::Restart, &mut out);
        assert!(effects.contains(&Effect::Restart));
        assert_eq!(
            room.result(),
            Some(MatchResult::Aborted {
                reason: AbortReason::Restarted
            })
        );
    }

    #[test]
    fn test_start_is_answered_with_notice() {
        let mut room = assault_room();
        let mut out = Outbox::new();
        room.open(&mut out);
        out.drain();
        assert!(room.handle_intent(10, &Intent::Start, &mut out).is_empty());
        assert!(matches!(out.drain()[0], Outbound::Direct(10, RoomMessage::Notice { .. })));
        assert_eq!(room.state(), RoomState::Countdown);
    }

    #[test]
    fn test_assault_disconnect_forfeits_when_running() {
        let mut room = assault_room();
        let mut out = Outbox::new();
        start(&mut room, &mut out);
        room.disconnect(10, &mut out);
        assert_eq!(
            room.result(),
            Some(MatchResult::Winner {
                side: Side::Right,
                reason: WinReason::Forfeit
            })
        );
        // Only the remaining participant is addressed now
        assert_eq!(room.recipients(), vec![20]);
        assert!(room.disconnect(20, &mut out).is_empty());
    }

    #[test]
    fn test_assault_disconnect_dissolves_during_countdown() {
        let mut room = assault_room();
        let mut out = Outbox::new();
        room.open(&mut out);
        room.disconnect(20, &mut out);
        assert_eq!(
            room.result(),
            Some(MatchResult::Aborted {
                reason: AbortReason::Dissolved
            })
        );
    }

    #[test]
    fn test_defense_host_moves_on_disconnect() {
        let mut room = defense_room(&[1, 2, 3]);
        let mut out = Outbox::new();
        start(&mut room, &mut out);
        assert!(room.disconnect(1, &mut out).is_empty());
        assert_eq!(room.host(), 2);
        room.handle_intent(2, &Intent::Pause, &mut out);
        assert!(room.is_paused());
    }

    #[test]
    fn test_defense_nexus_loss_ends_once() {
        let mut room = defense_room(&[1]);
        let mut out = Outbox::new();
        start(&mut room, &mut out);
        out.drain();

        for _ in 0..100 {
            room.rules_mut().damage_nexus(50.0, &mut out);
        }
        let effects = room.tick(&mut out);
        assert!(effects.iter().any(|e| matches!(e, Effect::Terminate { .. })));
        assert!(room.tick(&mut out).is_empty());
        assert_eq!(count_ended(&broadcasts(&mut out)), 1);
        assert_eq!(
            room.result(),
            Some(MatchResult::Defeat {
                reason: DefeatReason::NexusDestroyed
            })
        );
    }
}
