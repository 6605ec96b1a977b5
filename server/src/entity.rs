//! Plain entity records shared by both room modes.
//!
//! Records carry their own bookkeeping (clamping, depletion timestamps,
//! buff refresh) but no game rules; targeting, economy and spawning live in
//! their own modules and mutate these records.

use shared::{
    BuffKind, EnemyKind, EnemyView, EntityId, HeroClass, HeroView, NodeView, ParticipantId,
    ResourceKind, Side, UnitKind, UnitState, UnitView, UpgradeStat, Vector2, WallView,
};

use crate::error::IntentError;
use crate::tables::{
    enemy_profile, hero_profile, node_profile, unit_profile, HeroProfile, UNIT_ATTACK_COOLDOWN,
    WALL_HP,
};

/// A price or payout listing one amount per resource kind.
pub type Cost = [(ResourceKind, f64)];

/// Fixed set of currency and material counters.
///
/// Counters never go negative: spends are checked against every listed
/// resource before anything is deducted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Wallet {
    amounts: [f64; ResourceKind::COUNT],
}

impl Wallet {
    pub fn with_gold(gold: f64) -> Self {
        let mut wallet = Self::default();
        wallet.credit(ResourceKind::Gold, gold);
        wallet
    }

    pub fn get(&self, kind: ResourceKind) -> f64 {
        self.amounts[kind.index()]
    }

    /// Adds `amount`; non-positive or non-finite amounts are ignored.
    pub fn credit(&mut self, kind: ResourceKind, amount: f64) {
        if amount.is_finite() && amount > 0.0 {
            self.amounts[kind.index()] += amount;
        }
    }

    pub fn can_afford(&self, cost: &Cost) -> bool {
        let mut needed = [0.0_f64; ResourceKind::COUNT];
        for &(kind, amount) in cost {
            needed[kind.index()] += amount.max(0.0);
        }
        needed
            .iter()
            .zip(self.amounts.iter())
            .all(|(need, have)| have >= need)
    }

    /// Deducts every listed amount in one step, or nothing at all.
    pub fn try_spend(&mut self, cost: &Cost) -> Result<(), IntentError> {
        if !self.can_afford(cost) {
            return Err(IntentError::InsufficientFunds);
        }
        for &(kind, amount) in cost {
            let slot = &mut self.amounts[kind.index()];
            *slot = (*slot - amount.max(0.0)).max(0.0);
        }
        Ok(())
    }

    pub fn entries(&self) -> Vec<(ResourceKind, f64)> {
        ResourceKind::ALL
            .iter()
            .map(|kind| (*kind, self.get(*kind)))
            .collect()
    }
}

/// Running totals reported to the profile service when a room ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally {
    pub kills: u32,
    pub deaths: u32,
    pub damage_dealt: f32,
    pub damage_taken: f32,
    pub currency_earned: f64,
    pub bases_destroyed: u32,
    pub bosses_killed: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CombatStats {
    pub attack: f32,
    pub range: f32,
    /// Seconds until the next attack is allowed.
    pub cooldown: f32,
    /// Id of the unit that most recently damaged this one. Looked up in the
    /// room's unit table, so a removed attacker simply stops matching.
    pub last_attacker: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatherStats {
    pub rate: f64,
    pub resource: ResourceKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnitRole {
    Combat(CombatStats),
    Support(GatherStats),
}

/// Mobile unit of an assault room.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub id: EntityId,
    pub kind: UnitKind,
    pub side: Side,
    pub position: Vector2,
    pub hp: f32,
    pub max_hp: f32,
    pub speed: f32,
    pub state: UnitState,
    pub role: UnitRole,
}

impl Unit {
    /// Builds a unit at full hp from its archetype profile.
    pub fn spawn(id: EntityId, kind: UnitKind, side: Side, position: Vector2) -> Self {
        let profile = unit_profile(kind);
        let role = match kind.gathers() {
            Some(resource) => UnitRole::Support(GatherStats {
                rate: profile.gather_rate,
                resource,
            }),
            None => UnitRole::Combat(CombatStats {
                attack: profile.attack,
                range: profile.range,
                cooldown: 0.0,
                last_attacker: None,
            }),
        };

        Self {
            id,
            kind,
            side,
            position,
            hp: profile.hp,
            max_hp: profile.hp,
            speed: profile.speed,
            state: UnitState::Idle,
            role,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    pub fn combat(&self) -> Option<&CombatStats> {
        match &self.role {
            UnitRole::Combat(stats) => Some(stats),
            UnitRole::Support(_) => None,
        }
    }

    pub fn combat_mut(&mut self) -> Option<&mut CombatStats> {
        match &mut self.role {
            UnitRole::Combat(stats) => Some(stats),
            UnitRole::Support(_) => None,
        }
    }

    /// Advances the attack cooldown of combat units.
    pub fn cool_down(&mut self, dt: f32) {
        if let Some(stats) = self.combat_mut() {
            stats.cooldown = (stats.cooldown - dt).max(0.0);
        }
    }

    /// Records `attacker` for retaliation and applies the hit.
    pub fn take_hit(&mut self, attacker: EntityId, amount: f32) -> f32 {
        if let Some(stats) = self.combat_mut() {
            stats.last_attacker = Some(attacker);
        }
        let dealt = amount.min(self.hp).max(0.0);
        self.hp = (self.hp - amount).max(0.0);
        dealt
    }

    pub fn view(&self) -> UnitView {
        UnitView {
            id: self.id,
            kind: self.kind,
            side: self.side,
            position: self.position,
            hp: self.hp,
            max_hp: self.max_hp,
            state: self.state,
        }
    }
}

/// Resets the attacker's cooldown after a landed attack.
pub fn reset_attack_cooldown(stats: &mut CombatStats) {
    stats.cooldown = UNIT_ATTACK_COOLDOWN;
}

/// Destructible wall built by an assault side.
#[derive(Debug, Clone, PartialEq)]
pub struct Wall {
    pub id: EntityId,
    pub side: Side,
    pub position: Vector2,
    pub hp: f32,
}

impl Wall {
    pub fn new(id: EntityId, side: Side, position: Vector2) -> Self {
        Self {
            id,
            side,
            position,
            hp: WALL_HP,
        }
    }

    pub fn take_hit(&mut self, amount: f32) -> f32 {
        let dealt = amount.min(self.hp).max(0.0);
        self.hp = (self.hp - amount).max(0.0);
        dealt
    }

    pub fn is_standing(&self) -> bool {
        self.hp > 0.0
    }

    pub fn view(&self) -> WallView {
        WallView {
            id: self.id,
            side: self.side,
            position: self.position,
            hp: self.hp,
        }
    }
}

/// A base, nexus or enemy spawner: the structures that decide a match.
#[derive(Debug, Clone, PartialEq)]
pub struct Base {
    pub id: EntityId,
    pub position: Vector2,
    pub hp: f32,
    pub max_hp: f32,
    pub level: u32,
    pub destroyed: bool,
}

impl Base {
    pub fn new(id: EntityId, position: Vector2, hp: f32) -> Self {
        Self {
            id,
            position,
            hp,
            max_hp: hp,
            level: 0,
            destroyed: false,
        }
    }

    /// Applies damage; flips `destroyed` the first time hp reaches zero.
    pub fn take_hit(&mut self, amount: f32) -> f32 {
        if self.destroyed {
            return 0.0;
        }
        let dealt = amount.min(self.hp).max(0.0);
        self.hp = (self.hp - amount).max(0.0);
        if self.hp <= 0.0 {
            self.destroyed = true;
        }
        dealt
    }
}

/// Harvestable node of an assault map.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceNode {
    pub id: EntityId,
    pub kind: ResourceKind,
    pub position: Vector2,
    pub amount: f64,
    pub max_amount: f64,
    pub respawn_delay: f32,
    /// Simulation time at which the node ran dry.
    pub depleted_at: Option<f32>,
}

impl ResourceNode {
    pub fn new(id: EntityId, kind: ResourceKind, position: Vector2) -> Self {
        let (max_amount, respawn_delay) = node_profile(kind);
        Self {
            id,
            kind,
            position,
            amount: max_amount,
            max_amount,
            respawn_delay,
            depleted_at: None,
        }
    }

    pub fn is_harvestable(&self) -> bool {
        self.amount > 0.0
    }

    /// Takes up to `requested` from the node and returns what was taken.
    /// Records the depletion time when the amount crosses to zero.
    pub fn harvest(&mut self, requested: f64, now: f32) -> f64 {
        if !self.is_harvestable() || requested <= 0.0 {
            return 0.0;
        }
        let taken = requested.min(self.amount);
        self.amount = (self.amount - taken).clamp(0.0, self.max_amount);
        if self.amount <= 0.0 {
            self.amount = 0.0;
            self.depleted_at = Some(now);
        }
        taken
    }

    /// Refills a depleted node once its respawn delay has elapsed.
    pub fn respawn_if_due(&mut self, now: f32) -> bool {
        match self.depleted_at {
            Some(at) if now - at >= self.respawn_delay => {
                self.amount = self.max_amount;
                self.depleted_at = None;
                true
            }
            _ => false,
        }
    }

    pub fn view(&self) -> NodeView {
        NodeView {
            id: self.id,
            kind: self.kind,
            position: self.position,
            amount: self.amount,
            max_amount: self.max_amount,
        }
    }
}

/// A timed effect on a hero.
#[derive(Debug, Clone, PartialEq)]
pub struct Buff {
    pub kind: BuffKind,
    pub remaining: f32,
    /// Damage bonus, damage reduction or regen fraction depending on kind.
    pub power: f32,
    pub lifesteal: f32,
    /// Set on copies spread from an ally; only originals spread further.
    pub shared_from: Option<ParticipantId>,
}

impl Buff {
    pub fn new(kind: BuffKind, duration: f32, power: f32) -> Self {
        Self {
            kind,
            remaining: duration,
            power,
            lifesteal: 0.0,
            shared_from: None,
        }
    }

    pub fn with_lifesteal(mut self, lifesteal: f32) -> Self {
        self.lifesteal = lifesteal;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UpgradeLevels {
    pub attack: u32,
    pub speed: u32,
    pub hp: u32,
    pub gold_rate: u32,
}

impl UpgradeLevels {
    pub fn get(&self, stat: UpgradeStat) -> u32 {
        match stat {
            UpgradeStat::Attack => self.attack,
            UpgradeStat::Speed => self.speed,
            UpgradeStat::Hp => self.hp,
            UpgradeStat::GoldRate => self.gold_rate,
        }
    }

    pub fn bump(&mut self, stat: UpgradeStat) -> u32 {
        let slot = match stat {
            UpgradeStat::Attack => &mut self.attack,
            UpgradeStat::Speed => &mut self.speed,
            UpgradeStat::Hp => &mut self.hp,
            UpgradeStat::GoldRate => &mut self.gold_rate,
        };
        *slot += 1;
        *slot
    }
}

/// Dash in progress: moves the hero at dash speed until `remaining` is spent.
#[derive(Debug, Clone, PartialEq)]
pub struct Dash {
    pub direction: Vector2,
    pub remaining: f32,
    /// Damage dealt to enemies crossed on the way, zero for pure movement.
    pub damage: f32,
    pub already_hit: Vec<EntityId>,
}

/// Participant-controlled hero of a defense room.
#[derive(Debug, Clone, PartialEq)]
pub struct Hero {
    pub participant: ParticipantId,
    pub class: HeroClass,
    pub profile: HeroProfile,
    pub position: Vector2,
    pub facing: Vector2,
    pub move_dir: Option<Vector2>,
    pub hp: f32,
    pub max_hp: f32,
    pub attack: f32,
    pub speed: f32,
    pub attack_speed: f32,
    pub range: f32,
    pub wallet: Wallet,
    pub upgrades: UpgradeLevels,
    /// Out-of-room character level; no upgrade may exceed it.
    pub level_cap: u32,
    pub dead: bool,
    pub revive_in: f32,
    pub buffs: Vec<Buff>,
    pub cooldowns: [f32; 3],
    pub attack_cooldown: f32,
    pub dash: Option<Dash>,
    pub connected: bool,
    pub tally: Tally,
}

impl Hero {
    pub fn new(participant: ParticipantId, class: HeroClass, level_cap: u32, position: Vector2) -> Self {
        let profile = hero_profile(class);
        Self {
            participant,
            class,
            profile,
            position,
            facing: Vector2::new(0.0, -1.0),
            move_dir: None,
            hp: profile.hp,
            max_hp: profile.hp,
            attack: profile.attack,
            speed: profile.speed,
            attack_speed: profile.attack_speed,
            range: profile.range,
            wallet: Wallet::default(),
            upgrades: UpgradeLevels::default(),
            level_cap,
            dead: false,
            revive_in: 0.0,
            buffs: Vec::new(),
            cooldowns: [0.0; 3],
            attack_cooldown: 0.0,
            dash: None,
            connected: true,
            tally: Tally::default(),
        }
    }

    pub fn buff(&self, kind: BuffKind) -> Option<&Buff> {
        self.buffs.iter().find(|b| b.kind == kind)
    }

    pub fn has_buff(&self, kind: BuffKind) -> bool {
        self.buff(kind).is_some()
    }

    /// Adds the buff, or refreshes an existing one of the same kind.
    /// Returns true when the buff is new.
    pub fn apply_buff(&mut self, buff: Buff) -> bool {
        match self.buffs.iter_mut().find(|b| b.kind == buff.kind) {
            Some(existing) => {
                existing.remaining = existing.remaining.max(buff.remaining);
                existing.power = buff.power;
                existing.lifesteal = buff.lifesteal;
                if existing.shared_from.is_some() {
                    existing.shared_from = buff.shared_from;
                }
                false
            }
            None => {
                self.buffs.push(buff);
                true
            }
        }
    }

    /// Heals up to max hp and returns the amount actually restored.
    pub fn heal(&mut self, amount: f32) -> f32 {
        if self.dead || amount <= 0.0 {
            return 0.0;
        }
        let before = self.hp;
        self.hp = (self.hp + amount).min(self.max_hp);
        self.hp - before
    }

    pub fn view(&self) -> HeroView {
        HeroView {
            participant: self.participant,
            class: self.class,
            position: self.position,
            hp: self.hp,
            max_hp: self.max_hp,
            gold: self.wallet.get(ResourceKind::Gold),
            dead: self.dead,
            revive_in: self.revive_in,
            buffs: self.buffs.iter().map(|b| b.kind).collect(),
            cooldowns: self.cooldowns,
        }
    }
}

/// Forced pursuit of the hero that last damaged an enemy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggro {
    pub hero: ParticipantId,
    /// Simulation time at which the enemy reverts to the nexus.
    pub until: f32,
}

/// Hostile creature of a defense room.
#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    pub id: EntityId,
    pub kind: EnemyKind,
    pub position: Vector2,
    pub hp: f32,
    pub max_hp: f32,
    pub attack: f32,
    pub speed: f32,
    pub range: f32,
    pub attack_interval: f32,
    pub cooldown: f32,
    pub stun: f32,
    pub aggro: Option<Aggro>,
    /// Enemy base the creature came from.
    pub origin: EntityId,
    pub bounty: f64,
}

impl Enemy {
    /// Builds an enemy from its profile with hp and attack scaled.
    pub fn spawn(
        id: EntityId,
        kind: EnemyKind,
        position: Vector2,
        origin: EntityId,
        hp_scale: f32,
        attack_scale: f32,
    ) -> Self {
        let profile = enemy_profile(kind);
        let hp = profile.hp * hp_scale;
        Self {
            id,
            kind,
            position,
            hp,
            max_hp: hp,
            attack: profile.attack * attack_scale,
            speed: profile.speed,
            range: profile.range,
            attack_interval: profile.attack_interval,
            cooldown: 0.0,
            stun: 0.0,
            aggro: None,
            origin,
            bounty: profile.bounty,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    pub fn is_stunned(&self) -> bool {
        self.stun > 0.0
    }

    pub fn take_hit(&mut self, amount: f32) -> f32 {
        let dealt = amount.min(self.hp).max(0.0);
        self.hp = (self.hp - amount).max(0.0);
        dealt
    }

    pub fn view(&self) -> EnemyView {
        EnemyView {
            id: self.id,
            kind: self.kind,
            position: self.position,
            hp: self.hp,
            max_hp: self.max_hp,
            stunned: self.is_stunned(),
            aggro: self.aggro.map(|a| a.hero),
        }
    }
}
