//! Wallet rules: prices, passive income, gathering, bounties and upgrades.

use std::collections::BTreeMap;

use shared::{EntityId, ParticipantId, ResourceKind, UnitKind, UpgradeStat, Vector2};

use crate::entity::{Cost, GatherStats, Hero, ResourceNode};
use crate::error::IntentError;
use crate::tables::{GATHER_RADIUS, PASSIVE_INCOME};

// --- Assault prices ---

pub fn unit_cost(kind: UnitKind) -> &'static Cost {
    match kind {
        UnitKind::Soldier => &[(ResourceKind::Gold, 50.0)],
        UnitKind::Archer => &[(ResourceKind::Gold, 60.0), (ResourceKind::Wood, 10.0)],
        UnitKind::Knight => &[
            (ResourceKind::Gold, 120.0),
            (ResourceKind::Rock, 20.0),
            (ResourceKind::Iron, 10.0),
        ],
        UnitKind::Siege => &[
            (ResourceKind::Gold, 150.0),
            (ResourceKind::Wood, 30.0),
            (ResourceKind::Crystal, 10.0),
        ],
        UnitKind::Woodcutter | UnitKind::Quarrier | UnitKind::Miner | UnitKind::Prospector => {
            &[(ResourceKind::Gold, 40.0)]
        }
    }
}

pub const WALL_COST: &Cost = &[
    (ResourceKind::Gold, 30.0),
    (ResourceKind::Wood, 20.0),
    (ResourceKind::Rock, 10.0),
];

/// Price of raising a base from `level` to `level + 1`.
pub fn base_upgrade_cost(level: u32) -> [(ResourceKind, f64); 3] {
    let step = (level + 1) as f64;
    [
        (ResourceKind::Gold, 200.0 * step),
        (ResourceKind::Rock, 40.0 * step),
        (ResourceKind::Iron, 20.0 * step),
    ]
}

/// Gold paid per unit of a sold material. Gold itself cannot be sold.
pub fn sell_price(kind: ResourceKind) -> Option<f64> {
    match kind {
        ResourceKind::Gold => None,
        ResourceKind::Wood => Some(1.0),
        ResourceKind::Rock => Some(2.0),
        ResourceKind::Iron => Some(3.0),
        ResourceKind::Crystal => Some(5.0),
    }
}

/// Converts simulation time into whole in-game seconds of passive income.
#[derive(Debug, Clone, Default)]
pub struct PassiveIncome {
    carry: f32,
}

impl PassiveIncome {
    /// Advances by `dt` and returns the number of full seconds crossed.
    pub fn advance(&mut self, dt: f32) -> u32 {
        self.carry += dt;
        let mut seconds = 0;
        // small epsilon so 20 x 0.05 counts as one second
        while self.carry >= 1.0 - 1e-4 {
            self.carry -= 1.0;
            seconds += 1;
        }
        seconds
    }

    pub fn payout(seconds: u32) -> f64 {
        seconds as f64 * PASSIVE_INCOME
    }
}

/// Nearest node of `kind` that still has something to harvest.
pub fn nearest_node(
    position: &Vector2,
    kind: ResourceKind,
    nodes: &BTreeMap<EntityId, ResourceNode>,
) -> Option<EntityId> {
    nodes
        .values()
        .filter(|node| node.kind == kind && node.is_harvestable())
        .map(|node| (node.id, position.distance(&node.position)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

pub fn within_gather_radius(position: &Vector2, node: &ResourceNode) -> bool {
    position.distance(&node.position) <= GATHER_RADIUS
}

/// Harvests `rate * dt` from `node`. Returns what was taken; the caller
/// credits it to the side wallet.
pub fn gather(stats: &GatherStats, node: &mut ResourceNode, dt: f32, now: f32) -> f64 {
    if node.kind != stats.resource {
        return 0.0;
    }
    node.harvest(stats.rate * dt as f64, now)
}

// --- Defense economy ---

/// Gold owed to each hero for a kill worth `bounty`.
///
/// The bounty is split evenly; dead heroes receive half a share and every
/// share is scaled by the hero's gold-rate upgrade.
pub fn bounty_shares(heroes: &BTreeMap<ParticipantId, Hero>, bounty: f64) -> Vec<(ParticipantId, f64)> {
    if heroes.is_empty() || bounty <= 0.0 {
        return Vec::new();
    }
    let share = bounty / heroes.len() as f64;
    heroes
        .values()
        .map(|hero| {
            let presence = if hero.dead { 0.5 } else { 1.0 };
            (hero.participant, share * presence * gold_rate_multiplier(hero))
        })
        .collect()
}

pub fn gold_rate_multiplier(hero: &Hero) -> f64 {
    1.0 + 0.1 * hero.upgrades.gold_rate as f64
}

/// `base * multiplier^level` gold for the next step of `stat`.
pub fn upgrade_cost(stat: UpgradeStat, level: u32) -> f64 {
    let (base, multiplier) = match stat {
        UpgradeStat::Attack => (100.0, 1.5),
        UpgradeStat::Speed => (80.0, 1.5),
        UpgradeStat::Hp => (100.0, 1.5),
        UpgradeStat::GoldRate => (150.0, 1.6),
    };
    (base * f64::powi(multiplier, level as i32)).round()
}

/// Flat stat gained per upgrade level. Gold rate is a fraction.
pub fn per_level_bonus(stat: UpgradeStat) -> f32 {
    match stat {
        UpgradeStat::Attack => 5.0,
        UpgradeStat::Speed => 10.0,
        UpgradeStat::Hp => 50.0,
        UpgradeStat::GoldRate => 0.1,
    }
}

/// Effective stats are always `base + level * bonus`.
pub fn recompute_stats(hero: &mut Hero) {
    hero.attack = hero.profile.attack + hero.upgrades.attack as f32 * per_level_bonus(UpgradeStat::Attack);
    hero.speed = hero.profile.speed + hero.upgrades.speed as f32 * per_level_bonus(UpgradeStat::Speed);
    hero.max_hp = hero.profile.hp + hero.upgrades.hp as f32 * per_level_bonus(UpgradeStat::Hp);
    hero.hp = hero.hp.min(hero.max_hp);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpgradeOutcome {
    pub level: u32,
    pub cost: f64,
}

/// Buys one level of `stat`, capped at the hero's character level.
pub fn upgrade_hero(hero: &mut Hero, stat: UpgradeStat) -> Result<UpgradeOutcome, IntentError> {
    if hero.dead {
        return Err(IntentError::HeroDead);
    }
    let level = hero.upgrades.get(stat);
    if level >= hero.level_cap {
        return Err(IntentError::AtCap { cap: hero.level_cap });
    }
    let cost = upgrade_cost(stat, level);
    hero.wallet.try_spend(&[(ResourceKind::Gold, cost)])?;

    let level = hero.upgrades.bump(stat);
    recompute_stats(hero);
    if stat == UpgradeStat::Hp {
        hero.heal(per_level_bonus(UpgradeStat::Hp));
    }
    Ok(UpgradeOutcome { level, cost })
}

/// Seconds a hero stays dead: `min(30, 10 + 2 * whole minutes elapsed)`.
pub fn revive_delay(elapsed_secs: f32) -> f32 {
    let minutes = (elapsed_secs / 60.0).floor().max(0.0);
    (10.0 + minutes * 2.0).min(30.0)
}
