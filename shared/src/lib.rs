//! Wire vocabulary shared between the simulation server and its clients.
//!
//! Everything here is a plain serde record; datagrams are encoded with
//! bincode. Clients only ever send intents, the server answers with
//! lifecycle messages, throttled snapshots and discrete events.

pub mod geometry;
pub mod kinds;

pub use geometry::Vector2;
pub use kinds::*;

use serde::{Deserialize, Serialize};

pub type ParticipantId = u32;
pub type RoomId = u32;
pub type EntityId = u32;

pub const PROTOCOL_VERSION: u32 = 1;

/// Packets sent from a client to the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum ClientPacket {
    Connect {
        client_version: u32,
        name: String,
        /// Out-of-room character level; caps hero upgrades in defense rooms.
        character_level: u32,
        class: HeroClass,
    },
    Queue {
        mode: GameMode,
    },
    Intent(Intent),
    Heartbeat,
    Disconnect,
}

/// Packets sent from the server to a client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum ServerPacket {
    Connected {
        participant_id: ParticipantId,
    },
    Disconnected {
        reason: String,
    },
    Queued {
        mode: GameMode,
        waiting: usize,
    },
    Room {
        room_id: RoomId,
        message: RoomMessage,
    },
    Notice {
        text: String,
    },
}

/// A participant's request. The server recomputes every effect itself.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Intent {
    SpawnUnit { kind: UnitKind },
    BuildWall { x: f32, y: f32 },
    UpgradeBase,
    SellResource { resource: ResourceKind, amount: u32 },
    MoveHero { direction: Option<Vector2> },
    UseSkill { slot: SkillSlot, target_x: f32, target_y: f32 },
    UpgradeHero { stat: UpgradeStat },
    Start,
    Pause,
    Resume,
    Stop,
    Restart,
    ReturnToLobby,
    DestroyRoom,
}

impl Intent {
    /// Host-only lifecycle requests, validated by the room itself.
    pub fn is_host_action(&self) -> bool {
        matches!(
            self,
            Intent::Start
                | Intent::Pause
                | Intent::Resume
                | Intent::Stop
                | Intent::Restart
                | Intent::ReturnToLobby
                | Intent::DestroyRoom
        )
    }
}

/// Everything a room broadcasts (or sends to a single participant).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum RoomMessage {
    Created {
        mode: GameMode,
        participants: Vec<ParticipantId>,
        host: ParticipantId,
    },
    Countdown {
        remaining: u32,
    },
    Started,
    Paused,
    Resumed,
    Snapshot(Snapshot),
    Event(GameEvent),
    Ended {
        result: MatchResult,
        reports: Vec<ParticipantReport>,
    },
    Notice {
        text: String,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum WalletOwner {
    Side(Side),
    Hero(ParticipantId),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum GameEvent {
    UnitSpawned {
        id: EntityId,
        kind: UnitKind,
        side: Side,
        position: Vector2,
    },
    UnitDamaged {
        id: EntityId,
        attacker: EntityId,
        amount: f32,
        hp: f32,
    },
    UnitDied {
        id: EntityId,
        side: Side,
    },
    WallBuilt {
        id: EntityId,
        side: Side,
        position: Vector2,
    },
    WallDamaged {
        id: EntityId,
        amount: f32,
        hp: f32,
    },
    WallDestroyed {
        id: EntityId,
        side: Side,
    },
    BaseDamaged {
        side: Side,
        amount: f32,
        hp: f32,
    },
    BaseUpgraded {
        side: Side,
        level: u32,
        max_hp: f32,
    },
    ResourceUpdated {
        owner: WalletOwner,
        resource: ResourceKind,
        amount: f64,
    },
    NodeDepleted {
        id: EntityId,
        kind: ResourceKind,
    },
    NodeRespawned {
        id: EntityId,
        kind: ResourceKind,
        amount: f64,
    },
    HeroSpawned {
        participant: ParticipantId,
        class: HeroClass,
        position: Vector2,
    },
    HeroDamaged {
        participant: ParticipantId,
        amount: f32,
        hp: f32,
    },
    HeroHealed {
        participant: ParticipantId,
        amount: f32,
        hp: f32,
    },
    HeroDied {
        participant: ParticipantId,
        revive_in: f32,
    },
    HeroRevived {
        participant: ParticipantId,
        position: Vector2,
        hp: f32,
    },
    HeroUpgraded {
        participant: ParticipantId,
        stat: UpgradeStat,
        level: u32,
    },
    EnemySpawned {
        id: EntityId,
        kind: EnemyKind,
        position: Vector2,
    },
    EnemyDamaged {
        id: EntityId,
        amount: f32,
        hp: f32,
    },
    EnemyDied {
        id: EntityId,
        kind: EnemyKind,
        killer: Option<ParticipantId>,
    },
    EnemyBaseDamaged {
        id: EntityId,
        amount: f32,
        hp: f32,
    },
    EnemyBaseDestroyed {
        id: EntityId,
    },
    NexusDamaged {
        amount: f32,
        hp: f32,
    },
    BuffApplied {
        participant: ParticipantId,
        buff: BuffKind,
        duration: f32,
    },
    BuffRemoved {
        participant: ParticipantId,
        buff: BuffKind,
    },
    SkillUsed {
        participant: ParticipantId,
        slot: SkillSlot,
        target: Vector2,
    },
    DelayedEffectDetonated {
        participant: ParticipantId,
        position: Vector2,
        radius: f32,
    },
    BossPhaseStarted,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Snapshot {
    Assault(AssaultSnapshot),
    Defense(DefenseSnapshot),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AssaultSnapshot {
    pub elapsed: f32,
    pub sides: Vec<SideView>,
    pub units: Vec<UnitView>,
    pub walls: Vec<WallView>,
    pub nodes: Vec<NodeView>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SideView {
    pub side: Side,
    pub participant: ParticipantId,
    pub base_hp: f32,
    pub base_max_hp: f32,
    pub base_level: u32,
    pub wallet: Vec<(ResourceKind, f64)>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UnitView {
    pub id: EntityId,
    pub kind: UnitKind,
    pub side: Side,
    pub position: Vector2,
    pub hp: f32,
    pub max_hp: f32,
    pub state: UnitState,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WallView {
    pub id: EntityId,
    pub side: Side,
    pub position: Vector2,
    pub hp: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NodeView {
    pub id: EntityId,
    pub kind: ResourceKind,
    pub position: Vector2,
    pub amount: f64,
    pub max_amount: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DefenseSnapshot {
    pub elapsed: f32,
    pub nexus_hp: f32,
    pub nexus_max_hp: f32,
    pub boss_phase: bool,
    pub bases: Vec<EnemyBaseView>,
    pub heroes: Vec<HeroView>,
    pub enemies: Vec<EnemyView>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EnemyBaseView {
    pub id: EntityId,
    pub position: Vector2,
    pub hp: f32,
    pub max_hp: f32,
    pub destroyed: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HeroView {
    pub participant: ParticipantId,
    pub class: HeroClass,
    pub position: Vector2,
    pub hp: f32,
    pub max_hp: f32,
    pub gold: f64,
    pub dead: bool,
    pub revive_in: f32,
    pub buffs: Vec<BuffKind>,
    pub cooldowns: [f32; 3],
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EnemyView {
    pub id: EntityId,
    pub kind: EnemyKind,
    pub position: Vector2,
    pub hp: f32,
    pub max_hp: f32,
    pub stunned: bool,
    pub aggro: Option<ParticipantId>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum WinReason {
    BaseDestroyed,
    TimeUp,
    Forfeit,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum DefeatReason {
    NexusDestroyed,
    AllDisconnected,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum AbortReason {
    Dissolved,
    Stopped,
    Restarted,
    ReturnedToLobby,
    Destroyed,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum MatchResult {
    Winner { side: Side, reason: WinReason },
    Draw,
    Victory,
    Defeat { reason: DefeatReason },
    Aborted { reason: AbortReason },
}

/// Per-participant totals handed to the profile service at room end.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ParticipantReport {
    pub participant: ParticipantId,
    pub won: bool,
    pub kills: u32,
    pub deaths: u32,
    pub damage_dealt: f32,
    pub damage_taken: f32,
    pub currency_earned: f64,
    pub bases_destroyed: u32,
    pub bosses_killed: u32,
}
