//! Tuning tables for both room modes.

use shared::{EnemyKind, HeroClass, ResourceKind, UnitKind, Vector2};

// --- Assault map ---

pub const ASSAULT_WIDTH: f32 = 1200.0;
pub const ASSAULT_HEIGHT: f32 = 600.0;

pub const LEFT_BASE: Vector2 = Vector2::new(60.0, 300.0);
pub const RIGHT_BASE: Vector2 = Vector2::new(1140.0, 300.0);
pub const LEFT_SPAWN: Vector2 = Vector2::new(120.0, 300.0);
pub const RIGHT_SPAWN: Vector2 = Vector2::new(1080.0, 300.0);

pub const BASE_HP: f32 = 1000.0;
pub const BASE_UPGRADE_HP: f32 = 500.0;
pub const BASE_MAX_LEVEL: u32 = 3;

pub const WALL_HP: f32 = 300.0;

pub const STARTING_GOLD: f64 = 100.0;
/// Gold credited to each side once per in-game second.
pub const PASSIVE_INCOME: f64 = 10.0;

/// Cooldown reset after every unit attack, in seconds.
pub const UNIT_ATTACK_COOLDOWN: f32 = 1.0;
/// Distance at which a support unit can harvest a node.
pub const GATHER_RADIUS: f32 = 40.0;

/// Static stats of a unit archetype.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitProfile {
    pub hp: f32,
    pub attack: f32,
    pub speed: f32,
    pub range: f32,
    pub gather_rate: f64,
}

pub fn unit_profile(kind: UnitKind) -> UnitProfile {
    match kind {
        UnitKind::Soldier => UnitProfile {
            hp: 100.0,
            attack: 10.0,
            speed: 60.0,
            range: 30.0,
            gather_rate: 0.0,
        },
        UnitKind::Archer => UnitProfile {
            hp: 60.0,
            attack: 8.0,
            speed: 55.0,
            range: 120.0,
            gather_rate: 0.0,
        },
        UnitKind::Knight => UnitProfile {
            hp: 250.0,
            attack: 18.0,
            speed: 40.0,
            range: 35.0,
            gather_rate: 0.0,
        },
        UnitKind::Siege => UnitProfile {
            hp: 150.0,
            attack: 40.0,
            speed: 30.0,
            range: 150.0,
            gather_rate: 0.0,
        },
        UnitKind::Woodcutter | UnitKind::Quarrier | UnitKind::Miner | UnitKind::Prospector => {
            UnitProfile {
                hp: 50.0,
                attack: 0.0,
                speed: 50.0,
                range: 0.0,
                gather_rate: 2.0,
            }
        }
    }
}

/// Capacity and respawn delay (seconds) of a node type.
pub fn node_profile(kind: ResourceKind) -> (f64, f32) {
    match kind {
        ResourceKind::Wood => (100.0, 60.0),
        ResourceKind::Rock => (80.0, 90.0),
        ResourceKind::Iron => (60.0, 120.0),
        ResourceKind::Crystal => (40.0, 150.0),
        ResourceKind::Gold => (0.0, 0.0),
    }
}

/// Mirrored node layout; each entry is placed once per half of the map.
pub const NODE_LAYOUT: [(ResourceKind, Vector2); 5] = [
    (ResourceKind::Wood, Vector2::new(220.0, 120.0)),
    (ResourceKind::Wood, Vector2::new(220.0, 480.0)),
    (ResourceKind::Rock, Vector2::new(330.0, 200.0)),
    (ResourceKind::Iron, Vector2::new(330.0, 420.0)),
    (ResourceKind::Crystal, Vector2::new(520.0, 300.0)),
];

// --- Defense map ---

pub const DEFENSE_WIDTH: f32 = 1600.0;
pub const DEFENSE_HEIGHT: f32 = 1200.0;

pub const NEXUS_POSITION: Vector2 = Vector2::new(800.0, 1080.0);
pub const NEXUS_HP: f32 = 5000.0;
pub const ENEMY_BASE_POSITIONS: [Vector2; 2] = [Vector2::new(300.0, 150.0), Vector2::new(1300.0, 150.0)];
pub const ENEMY_BASE_HP: f32 = 4000.0;

/// How long an enemy chases the hero that last hit it.
pub const AGGRO_DURATION: f32 = 5.0;
/// Fraction of max hp a hero revives with.
pub const REVIVE_HP_FRACTION: f32 = 0.5;
pub const DASH_SPEED: f32 = 900.0;
/// Radius around a knight or warrior inside which shared buffs spread.
pub const RALLY_SHARE_RADIUS: f32 = 300.0;
pub const BLOODLUST_SHARE_RADIUS: f32 = 260.0;

pub const WARRIOR_LIFESTEAL: f32 = 0.10;
pub const KNIGHT_REGEN_PER_SEC: f32 = 6.0;

/// Static stats of a hero class before upgrades.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeroProfile {
    pub hp: f32,
    pub attack: f32,
    pub speed: f32,
    /// Basic attacks per second.
    pub attack_speed: f32,
    pub range: f32,
    /// Minimum dot product between facing and target direction, if any.
    pub min_facing_dot: Option<f32>,
}

pub fn hero_profile(class: HeroClass) -> HeroProfile {
    match class {
        HeroClass::Warrior => HeroProfile {
            hp: 600.0,
            attack: 40.0,
            speed: 180.0,
            attack_speed: 1.2,
            range: 70.0,
            min_facing_dot: Some(0.5),
        },
        HeroClass::Knight => HeroProfile {
            hp: 900.0,
            attack: 28.0,
            speed: 160.0,
            attack_speed: 1.0,
            range: 60.0,
            min_facing_dot: Some(0.5),
        },
        HeroClass::Archer => HeroProfile {
            hp: 450.0,
            attack: 32.0,
            speed: 190.0,
            attack_speed: 1.5,
            range: 320.0,
            min_facing_dot: Some(0.0),
        },
        HeroClass::Mage => HeroProfile {
            hp: 400.0,
            attack: 45.0,
            speed: 170.0,
            attack_speed: 0.8,
            range: 280.0,
            min_facing_dot: None,
        },
    }
}

/// Static stats of an enemy archetype before scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyProfile {
    pub hp: f32,
    pub attack: f32,
    pub speed: f32,
    pub range: f32,
    /// Seconds between two attacks.
    pub attack_interval: f32,
    pub bounty: f64,
}

pub fn enemy_profile(kind: EnemyKind) -> EnemyProfile {
    match kind {
        EnemyKind::Grunt => EnemyProfile {
            hp: 120.0,
            attack: 15.0,
            speed: 70.0,
            range: 40.0,
            attack_interval: 1.0,
            bounty: 10.0,
        },
        EnemyKind::Runner => EnemyProfile {
            hp: 80.0,
            attack: 10.0,
            speed: 120.0,
            range: 35.0,
            attack_interval: 0.8,
            bounty: 8.0,
        },
        EnemyKind::Spitter => EnemyProfile {
            hp: 100.0,
            attack: 20.0,
            speed: 65.0,
            range: 200.0,
            attack_interval: 1.6,
            bounty: 15.0,
        },
        EnemyKind::Brute => EnemyProfile {
            hp: 400.0,
            attack: 35.0,
            speed: 50.0,
            range: 45.0,
            attack_interval: 1.5,
            bounty: 25.0,
        },
        EnemyKind::Boss => EnemyProfile {
            hp: 6000.0,
            attack: 80.0,
            speed: 45.0,
            range: 80.0,
            attack_interval: 2.0,
            bounty: 0.0,
        },
    }
}

/// Flat gold paid to every hero when a boss dies.
pub const BOSS_BOUNTY: f64 = 500.0;
