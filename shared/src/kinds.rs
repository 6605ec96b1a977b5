//! Closed vocabularies shared by the server simulation and its clients.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    /// Two-player economy and base assault.
    Assault,
    /// One to four players defending a shared nexus.
    Defense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Counters held in a wallet. `Gold` is the primary currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Gold,
    Wood,
    Rock,
    Iron,
    Crystal,
}

impl ResourceKind {
    pub const COUNT: usize = 5;

    pub const ALL: [ResourceKind; ResourceKind::COUNT] = [
        ResourceKind::Gold,
        ResourceKind::Wood,
        ResourceKind::Rock,
        ResourceKind::Iron,
        ResourceKind::Crystal,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    Soldier,
    Archer,
    Knight,
    Siege,
    Woodcutter,
    Quarrier,
    Miner,
    Prospector,
}

impl UnitKind {
    /// The node type a support unit harvests, `None` for combat units.
    pub fn gathers(self) -> Option<ResourceKind> {
        match self {
            UnitKind::Woodcutter => Some(ResourceKind::Wood),
            UnitKind::Quarrier => Some(ResourceKind::Rock),
            UnitKind::Miner => Some(ResourceKind::Iron),
            UnitKind::Prospector => Some(ResourceKind::Crystal),
            UnitKind::Soldier | UnitKind::Archer | UnitKind::Knight | UnitKind::Siege => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitState {
    Idle,
    Moving,
    Attacking,
    Gathering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeroClass {
    Warrior,
    Knight,
    Archer,
    Mage,
}

impl HeroClass {
    pub fn is_melee(self) -> bool {
        matches!(self, HeroClass::Warrior | HeroClass::Knight)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    Grunt,
    Runner,
    Spitter,
    Brute,
    Boss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuffKind {
    /// Negates all incoming damage.
    Invincible,
    /// Reduces incoming damage by a fraction.
    Bulwark,
    /// Raises outgoing damage and grants lifesteal.
    Bloodlust,
    /// Heals a fraction of max hp per second.
    Rally,
}

/// Which ability a `UseSkill` intent triggers. `Basic` is the plain attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillSlot {
    Basic,
    First,
    Second,
    Third,
}

impl SkillSlot {
    /// Cooldown slot index for the three skills.
    pub fn cooldown_index(self) -> Option<usize> {
        match self {
            SkillSlot::Basic => None,
            SkillSlot::First => Some(0),
            SkillSlot::Second => Some(1),
            SkillSlot::Third => Some(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeStat {
    Attack,
    Speed,
    Hp,
    GoldRate,
}

/// Lifecycle of a room. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoomState {
    Waiting,
    Countdown,
    Running,
    Ended,
}
