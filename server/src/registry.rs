//! Live rooms by id, and the spawner that creates and retires them.
//!
//! The registry is the only state shared across rooms. It is mutated when a
//! room is created or ends; everything else only reads it to route intents
//! and disconnect notices to the owning room's task.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use shared::{GameMode, Intent, MatchResult, ParticipantId, ParticipantReport, RoomId};
use tokio::sync::{mpsc, RwLock};

use crate::assault::AssaultRules;
use crate::config::RoomTiming;
use crate::defense::{DefenseRules, HeroSeat};
use crate::gateway::Gateway;
use crate::results::{MatchReport, ResultSink};
use crate::room::{run_room, Room, RoomCommand};
use crate::rules::RoomRules;

/// Who a room is created for. Kept by the room so a restart can rebuild it.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomPlan {
    Assault {
        left: ParticipantId,
        right: ParticipantId,
    },
    Defense {
        seats: Vec<HeroSeat>,
    },
}

impl RoomPlan {
    pub fn mode(&self) -> GameMode {
        match self {
            RoomPlan::Assault { .. } => GameMode::Assault,
            RoomPlan::Defense { .. } => GameMode::Defense,
        }
    }

    /// Participants in seat order; the first one hosts.
    pub fn participants(&self) -> Vec<ParticipantId> {
        match self {
            RoomPlan::Assault { left, right } => vec![*left, *right],
            RoomPlan::Defense { seats } => seats.iter().map(|s| s.participant).collect(),
        }
    }

    /// Narrows the plan to the participants still connected. Assault needs
    /// both sides; defense keeps whichever seats remain. None if nothing
    /// playable is left.
    pub fn retain_connected(&self, connected: &[ParticipantId]) -> Option<RoomPlan> {
        match self {
            RoomPlan::Assault { left, right } => {
                if connected.contains(left) && connected.contains(right) {
                    Some(self.clone())
                } else {
                    None
                }
            }
            RoomPlan::Defense { seats } => {
                let seats: Vec<HeroSeat> = seats
                    .iter()
                    .filter(|s| connected.contains(&s.participant))
                    .copied()
                    .collect();
                if seats.is_empty() {
                    None
                } else {
                    Some(RoomPlan::Defense { seats })
                }
            }
        }
    }
}

/// Address of a live room's task.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    pub id: RoomId,
    pub mode: GameMode,
    pub participants: Vec<ParticipantId>,
    tx: mpsc::UnboundedSender<RoomCommand>,
}

impl RoomHandle {
    pub fn new(
        id: RoomId,
        mode: GameMode,
        participants: Vec<ParticipantId>,
        tx: mpsc::UnboundedSender<RoomCommand>,
    ) -> Self {
        Self {
            id,
            mode,
            participants,
            tx,
        }
    }

    /// Returns false when the room's task is already gone.
    pub fn send(&self, command: RoomCommand) -> bool {
        self.tx.send(command).is_ok()
    }
}

#[derive(Debug, Default)]
struct Rooms {
    rooms: HashMap<RoomId, RoomHandle>,
    by_participant: HashMap<ParticipantId, RoomId>,
    last_id: RoomId,
}

#[derive(Debug, Clone, Default)]
pub struct RoomRegistry {
    inner: Arc<RwLock<Rooms>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn allocate_id(&self) -> RoomId {
        let mut rooms = self.inner.write().await;
        rooms.last_id += 1;
        rooms.last_id
    }

    /// Registers a room and points each of its participants at it.
    pub async fn insert(&self, handle: RoomHandle) {
        let mut rooms = self.inner.write().await;
        for participant in &handle.participants {
            rooms.by_participant.insert(*participant, handle.id);
        }
        rooms.rooms.insert(handle.id, handle);
    }

    /// Drops a room. Participant mappings that already point at another
    /// room are left alone.
    pub async fn remove(&self, id: RoomId) -> Option<RoomHandle> {
        let mut rooms = self.inner.write().await;
        let handle = rooms.rooms.remove(&id)?;
        rooms.by_participant.retain(|_, room| *room != id);
        Some(handle)
    }

    pub async fn get(&self, id: RoomId) -> Option<RoomHandle> {
        self.inner.read().await.rooms.get(&id).cloned()
    }

    pub async fn room_of(&self, participant: ParticipantId) -> Option<RoomId> {
        self.inner.read().await.by_participant.get(&participant).copied()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.rooms.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.rooms.is_empty()
    }

    async fn route(&self, participant: ParticipantId, command: RoomCommand) -> bool {
        let rooms = self.inner.read().await;
        match rooms
            .by_participant
            .get(&participant)
            .and_then(|id| rooms.rooms.get(id))
        {
            Some(handle) => handle.send(command),
            None => false,
        }
    }

    /// Forwards an intent to the participant's room. Returns false when the
    /// participant is not in a room.
    pub async fn send_intent(&self, participant: ParticipantId, intent: Intent) -> bool {
        self.route(participant, RoomCommand::Intent { participant, intent })
            .await
    }

    pub async fn notify_disconnect(&self, participant: ParticipantId) -> bool {
        self.route(participant, RoomCommand::Disconnect { participant }).await
    }
}

/// Creates room tasks and cleans up after them.
#[derive(Clone)]
pub struct RoomSpawner {
    registry: RoomRegistry,
    gateway: Arc<dyn Gateway>,
    sink: Arc<dyn ResultSink>,
    timing: RoomTiming,
    seed: Option<u64>,
}

impl RoomSpawner {
    pub fn new(
        registry: RoomRegistry,
        gateway: Arc<dyn Gateway>,
        sink: Arc<dyn ResultSink>,
        timing: RoomTiming,
    ) -> Self {
        Self {
            registry,
            gateway,
            sink,
            timing,
            seed: None,
        }
    }

    /// Fixes the spawn-director seed of every defense room.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn gateway(&self) -> Arc<dyn Gateway> {
        Arc::clone(&self.gateway)
    }

    pub fn timing(&self) -> RoomTiming {
        self.timing
    }

    /// Registers a new room and starts its task. The room begins in
    /// countdown immediately.
    pub async fn spawn(&self, plan: RoomPlan) -> RoomId {
        let id = self.registry.allocate_id().await;
        let participants = plan.participants();
        let (tx, rx) = mpsc::unbounded_channel();
        self.registry
            .insert(RoomHandle::new(id, plan.mode(), participants.clone(), tx.clone()))
            .await;
        info!("Creating {:?} room {} for {:?}", plan.mode(), id, participants);

        match &plan {
            RoomPlan::Assault { left, right } => {
                let match_duration = self.timing.assault_match_duration.as_secs_f32();
                let rules = AssaultRules::new(*left, *right, match_duration);
                self.launch(Room::new(id, participants, rules, self.timing), tx, rx, plan);
            }
            RoomPlan::Defense { seats } => {
                let seed = self.seed.unwrap_or_else(rand::random);
                let rules = DefenseRules::new(seats, seed);
                self.launch(Room::new(id, participants, rules, self.timing), tx, rx, plan);
            }
        }
        id
    }

    fn launch<R: RoomRules>(
        &self,
        room: Room<R>,
        tx: mpsc::UnboundedSender<RoomCommand>,
        rx: mpsc::UnboundedReceiver<RoomCommand>,
        plan: RoomPlan,
    ) {
        tokio::spawn(run_room(room, tx, rx, self.clone(), plan));
    }

    /// Reports a finished room and removes it from the registry.
    pub async fn retire(
        &self,
        id: RoomId,
        mode: GameMode,
        result: MatchResult,
        participants: Vec<ParticipantReport>,
    ) {
        self.sink.record(MatchReport {
            room_id: id,
            mode,
            result,
            participants,
        });
        if self.registry.remove(id).await.is_none() {
            warn!("Room {} was already gone from the registry", id);
        }
        debug!("Room {} retired", id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{ChannelGateway, Delivery};
    use crate::results::ChannelResultSink;
    use shared::{AbortReason, DefeatReason, HeroClass, RoomMessage, ServerPacket};
    use std::time::Duration;
    use tokio::time::timeout;

    fn fast_timing() -> RoomTiming {
        RoomTiming {
            tick: Duration::from_millis(5),
            snapshot_interval: Duration::from_millis(10),
            countdown_ticks: 3,
            countdown_period: Duration::from_millis(5),
            assault_match_duration: Duration::from_secs(300),
        }
    }

    fn spawner() -> (
        RoomSpawner,
        mpsc::UnboundedReceiver<Delivery>,
        mpsc::UnboundedReceiver<MatchReport>,
    ) {
        let (gateway, deliveries) = ChannelGateway::new();
        let (sink, reports) = ChannelResultSink::new();
        let spawner = RoomSpawner::new(RoomRegistry::new(), Arc::new(gateway), Arc::new(sink), fast_timing())
            .with_seed(3);
        (spawner, deliveries, reports)
    }

    async fn wait_for_started(deliveries: &mut mpsc::UnboundedReceiver<Delivery>, participant: ParticipantId) {
        loop {
            let delivery = timeout(Duration::from_secs(2), deliveries.recv())
                .await
                .unwrap()
                .unwrap();
            if delivery.participant == participant
                && matches!(
                    delivery.packet,
                    ServerPacket::Room {
                        message: RoomMessage::Started,
                        ..
                    }
                )
            {
                return;
            }
        }
    }

    fn handle(id: RoomId, participants: Vec<ParticipantId>) -> (RoomHandle, mpsc::UnboundedReceiver<RoomCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (RoomHandle::new(id, GameMode::Assault, participants, tx), rx)
    }

    #[tokio::test]
    async fn test_registry_routes_to_owning_room() {
        let registry = RoomRegistry::new();
        let (first, mut first_rx) = handle(1, vec![1, 2]);
        registry.insert(first).await;

        assert!(registry.send_intent(2, Intent::UpgradeBase).await);
        assert_eq!(
            first_rx.recv().await,
            Some(RoomCommand::Intent {
                participant: 2,
                intent: Intent::UpgradeBase
            })
        );
        assert!(!registry.send_intent(99, Intent::UpgradeBase).await);
        assert!(registry.notify_disconnect(1).await);
    }

    #[tokio::test]
    async fn test_remove_keeps_mappings_to_newer_rooms() {
        let registry = RoomRegistry::new();
        let (old, _old_rx) = handle(1, vec![1, 2]);
        let (new, _new_rx) = handle(2, vec![1, 3]);
        registry.insert(old).await;
        registry.insert(new).await;

        assert!(registry.remove(1).await.is_some());
        assert_eq!(registry.room_of(1).await, Some(2));
        assert_eq!(registry.room_of(2).await, None);
        assert_eq!(registry.room_of(3).await, Some(2));
        assert!(registry.remove(1).await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_allocated_ids_are_unique() {
        let registry = RoomRegistry::new();
        let a = registry.allocate_id().await;
        let b = registry.allocate_id().await;
        assert_ne!(a, b);
    }

    #[test]
    fn test_plan_participants_in_seat_order() {
        let plan = RoomPlan::Defense {
            seats: vec![
                HeroSeat {
                    participant: 7,
                    class: HeroClass::Mage,
                    character_level: 1,
                },
                HeroSeat {
                    participant: 3,
                    class: HeroClass::Archer,
                    character_level: 1,
                },
            ],
        };
        assert_eq!(plan.participants(), vec![7, 3]);
        assert_eq!(plan.mode(), GameMode::Defense);
    }

    #[tokio::test]
    async fn test_spawned_room_runs_and_retires_on_stop() {
        let (spawner, mut deliveries, mut reports) = spawner();
        let id = spawner.spawn(RoomPlan::Assault { left: 1, right: 2 }).await;
        assert_eq!(spawner.registry().room_of(2).await, Some(id));

        wait_for_started(&mut deliveries, 1).await;
        assert!(spawner.registry().send_intent(1, Intent::Stop).await);

        let report = timeout(Duration::from_secs(2), reports.recv()).await.unwrap().unwrap();
        assert_eq!(report.room_id, id);
        assert_eq!(
            report.result,
            MatchResult::Aborted {
                reason: AbortReason::Stopped
            }
        );
        assert_eq!(report.participants.len(), 2);
        assert!(spawner.registry().is_empty().await);
    }

    #[tokio::test]
    async fn test_restart_creates_fresh_room() {
        let (spawner, mut deliveries, mut reports) = spawner();
        let first = spawner.spawn(RoomPlan::Assault { left: 1, right: 2 }).await;
        wait_for_started(&mut deliveries, 2).await;

        spawner.registry().send_intent(1, Intent::Restart).await;
        timeout(Duration::from_secs(2), reports.recv()).await.unwrap().unwrap();

        let mut second = None;
        for _ in 0..100 {
            second = spawner.registry().room_of(1).await;
            if second.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let second = second.unwrap();
        assert_ne!(second, first);
        assert_eq!(spawner.registry().room_of(2).await, Some(second));
    }

    #[tokio::test]
    async fn test_disconnect_during_running_forfeits() {
        let (spawner, mut deliveries, mut reports) = spawner();
        spawner.spawn(RoomPlan::Assault { left: 1, right: 2 }).await;
        wait_for_started(&mut deliveries, 1).await;

        spawner.registry().notify_disconnect(2).await;
        let report = timeout(Duration::from_secs(2), reports.recv()).await.unwrap().unwrap();
        assert!(matches!(report.result, MatchResult::Winner { .. }));
        let left = report.participants.iter().find(|r| r.participant == 1).unwrap();
        assert!(left.won);
    }

    fn seat(participant: ParticipantId) -> HeroSeat {
        HeroSeat {
            participant,
            class: HeroClass::Knight,
            character_level: 1,
        }
    }

    #[test]
    fn test_retain_connected_narrows_plan() {
        let defense = RoomPlan::Defense {
            seats: vec![seat(1), seat(2), seat(3)],
        };
        assert_eq!(
            defense.retain_connected(&[3, 1]),
            Some(RoomPlan::Defense {
                seats: vec![seat(1), seat(3)]
            })
        );
        assert_eq!(defense.retain_connected(&[]), None);

        let assault = RoomPlan::Assault { left: 1, right: 2 };
        assert_eq!(assault.retain_connected(&[1, 2]), Some(assault.clone()));
        assert_eq!(assault.retain_connected(&[1]), None);
    }

    #[tokio::test]
    async fn test_restart_leaves_disconnected_seats_behind() {
        let (spawner, mut deliveries, mut reports) = spawner();
        let first = spawner
            .spawn(RoomPlan::Defense {
                seats: vec![seat(1), seat(2)],
            })
            .await;
        wait_for_started(&mut deliveries, 1).await;

        assert!(spawner.registry().notify_disconnect(2).await);
        assert!(spawner.registry().send_intent(1, Intent::Restart).await);
        let report = timeout(Duration::from_secs(2), reports.recv()).await.unwrap().unwrap();
        assert_eq!(
            report.result,
            MatchResult::Aborted {
                reason: AbortReason::Restarted
            }
        );

        let mut second = None;
        for _ in 0..100 {
            second = spawner.registry().room_of(1).await.filter(|id| *id != first);
            if second.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let second = second.unwrap();
        assert_eq!(spawner.registry().room_of(2).await, None);
        assert_eq!(spawner.registry().get(second).await.unwrap().participants, vec![1]);

        // The only live seat leaving must end the new room
        wait_for_started(&mut deliveries, 1).await;
        assert!(spawner.registry().notify_disconnect(1).await);
        let report = timeout(Duration::from_secs(2), reports.recv()).await.unwrap().unwrap();
        assert_eq!(report.room_id, second);
        assert_eq!(
            report.result,
            MatchResult::Defeat {
                reason: DefeatReason::AllDisconnected
            }
        );
    }

    #[tokio::test]
    async fn test_restart_skipped_when_opponent_left() {
        let (spawner, _deliveries, mut reports) = spawner();
        spawner.spawn(RoomPlan::Assault { left: 1, right: 2 }).await;

        // Disconnect during countdown dissolves the room before any restart
        spawner.registry().notify_disconnect(2).await;
        spawner.registry().send_intent(1, Intent::Restart).await;
        let report = timeout(Duration::from_secs(2), reports.recv()).await.unwrap().unwrap();
        assert!(matches!(report.result, MatchResult::Aborted { .. }));

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(spawner.registry().is_empty().await);
    }
}
