//! Cooperative nexus defense for one to four heroes.
//!
//! Heroes hold the line around the nexus while the spawn director sends
//! enemies from the two enemy bases. Destroying both bases starts the boss
//! phase; killing every boss wins, losing the nexus loses.

pub mod skills;

use std::collections::BTreeMap;

use log::debug;
use shared::{
    AbortReason, BuffKind, DefeatReason, DefenseSnapshot, EnemyBaseView, EnemyKind, EntityId,
    GameEvent, GameMode, HeroClass, Intent, MatchResult, ParticipantId, ParticipantReport,
    ResourceKind, RoomState, SkillSlot, Snapshot, UpgradeStat, Vector2, WalletOwner,
};

use crate::combat::{
    damage_hero, enemy_goal, in_cone, in_radius, lifesteal_ratio, on_segment, outgoing_multiplier,
    refresh_aggro, set_aggro, EnemyGoal,
};
use crate::economy::{bounty_shares, revive_delay, upgrade_hero};
use crate::entity::{Base, Buff, Dash, Enemy, Hero};
use crate::error::IntentError;
use crate::rules::{Outbox, RoomRules};
use crate::spawn::{SpawnDirector, SpawnOrder};
use crate::tables::{
    BOSS_BOUNTY, DASH_SPEED, DEFENSE_HEIGHT, DEFENSE_WIDTH, ENEMY_BASE_HP, ENEMY_BASE_POSITIONS,
    KNIGHT_REGEN_PER_SEC, NEXUS_HP, NEXUS_POSITION, REVIVE_HP_FRACTION, WARRIOR_LIFESTEAL,
};
use skills::{share_radius, skill_spec, SkillShape};

/// Enemies this close to a dashing hero are hit by the dash.
const DASH_HIT_RADIUS: f32 = 40.0;
const SPAWN_OFFSETS: [f32; 4] = [-90.0, -30.0, 30.0, 90.0];
const TIME_EPSILON: f32 = 1e-3;

/// Who plays which class, and the character level capping their upgrades.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeroSeat {
    pub participant: ParticipantId,
    pub class: HeroClass,
    pub character_level: u32,
}

/// A cast that lands later, such as the mage's meteor.
#[derive(Debug, Clone, PartialEq)]
struct DelayedEffect {
    owner: ParticipantId,
    position: Vector2,
    radius: f32,
    damage: f32,
    detonate_at: f32,
}

/// Anything a hero's attack can hit.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Target {
    Enemy(EntityId),
    /// Index into the enemy base list.
    Base(usize),
}

pub struct DefenseRules {
    heroes: BTreeMap<ParticipantId, Hero>,
    enemies: BTreeMap<EntityId, Enemy>,
    nexus: Base,
    bases: Vec<Base>,
    director: SpawnDirector,
    delayed: Vec<DelayedEffect>,
    boss_phase: bool,
    bosses: Vec<EntityId>,
    next_id: EntityId,
}

fn spawn_point(index: usize) -> Vector2 {
    Vector2::new(
        NEXUS_POSITION.x + SPAWN_OFFSETS[index % SPAWN_OFFSETS.len()],
        NEXUS_POSITION.y - 80.0,
    )
}

impl DefenseRules {
    pub fn new(seats: &[HeroSeat], seed: u64) -> Self {
        let heroes = seats
            .iter()
            .enumerate()
            .map(|(index, seat)| {
                let hero = Hero::new(seat.participant, seat.class, seat.character_level, spawn_point(index));
                (seat.participant, hero)
            })
            .collect();

        let bases = ENEMY_BASE_POSITIONS
            .iter()
            .enumerate()
            .map(|(index, position)| Base::new(2 + index as EntityId, *position, ENEMY_BASE_HP))
            .collect();

        Self {
            heroes,
            enemies: BTreeMap::new(),
            nexus: Base::new(1, NEXUS_POSITION, NEXUS_HP),
            bases,
            director: SpawnDirector::new(seed),
            delayed: Vec::new(),
            boss_phase: false,
            bosses: Vec::new(),
            next_id: 10,
        }
    }

    pub fn hero(&self, participant: ParticipantId) -> Option<&Hero> {
        self.heroes.get(&participant)
    }

    pub fn heroes(&self) -> &BTreeMap<ParticipantId, Hero> {
        &self.heroes
    }

    pub fn enemies(&self) -> &BTreeMap<EntityId, Enemy> {
        &self.enemies
    }

    pub fn nexus(&self) -> &Base {
        &self.nexus
    }

    pub fn enemy_bases(&self) -> &[Base] {
        &self.bases
    }

    pub fn boss_phase(&self) -> bool {
        self.boss_phase
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Creates an enemy from a director order.
    pub fn spawn_enemy(&mut self, order: &SpawnOrder, out: &mut Outbox) -> EntityId {
        let id = self.allocate_id();
        let enemy = Enemy::spawn(
            id,
            order.kind,
            order.position,
            order.origin,
            order.hp_scale,
            order.attack_scale,
        );
        out.event(GameEvent::EnemySpawned {
            id,
            kind: order.kind,
            position: order.position,
        });
        self.enemies.insert(id, enemy);
        id
    }

    /// Applies a hit to the nexus; nothing lands once it is destroyed.
    pub fn damage_nexus(&mut self, amount: f32, out: &mut Outbox) -> f32 {
        let dealt = self.nexus.take_hit(amount);
        if dealt > 0.0 {
            out.event(GameEvent::NexusDamaged {
                amount: dealt,
                hp: self.nexus.hp,
            });
        }
        dealt
    }

    // --- Intents ---

    fn move_hero(&mut self, participant: ParticipantId, direction: Option<Vector2>) -> Result<(), IntentError> {
        let hero = self
            .heroes
            .get_mut(&participant)
            .ok_or(IntentError::UnknownParticipant(participant))?;
        if hero.dead {
            return Err(IntentError::HeroDead);
        }
        hero.move_dir = direction
            .filter(|d| d.x.is_finite() && d.y.is_finite() && d.magnitude() > 0.0)
            .map(|d| d.normalize());
        Ok(())
    }

    fn upgrade(&mut self, participant: ParticipantId, stat: UpgradeStat, out: &mut Outbox) -> Result<(), IntentError> {
        let hero = self
            .heroes
            .get_mut(&participant)
            .ok_or(IntentError::UnknownParticipant(participant))?;
        let outcome = upgrade_hero(hero, stat)?;
        out.event(GameEvent::HeroUpgraded {
            participant,
            stat,
            level: outcome.level,
        });
        out.event(GameEvent::ResourceUpdated {
            owner: WalletOwner::Hero(participant),
            resource: ResourceKind::Gold,
            amount: hero.wallet.get(ResourceKind::Gold),
        });
        Ok(())
    }

    fn use_skill(
        &mut self,
        participant: ParticipantId,
        slot: SkillSlot,
        aim: Vector2,
        now: f32,
        out: &mut Outbox,
    ) -> Result<(), IntentError> {
        if !aim.x.is_finite() || !aim.y.is_finite() {
            return Err(IntentError::OutOfBounds);
        }
        let hero = self
            .heroes
            .get_mut(&participant)
            .ok_or(IntentError::UnknownParticipant(participant))?;
        if hero.dead {
            return Err(IntentError::HeroDead);
        }
        let towards = aim.sub(&hero.position);
        if towards.magnitude() > 0.01 {
            hero.facing = towards.normalize();
        }

        let Some(index) = slot.cooldown_index() else {
            return self.basic_attack(participant, aim, now, out);
        };
        let spec = skill_spec(hero.class, slot).ok_or(IntentError::WrongMode)?;
        if hero.cooldowns[index] > 0.0 {
            return Err(IntentError::OnCooldown {
                remaining: hero.cooldowns[index],
            });
        }
        hero.cooldowns[index] = spec.cooldown;

        let origin = hero.position;
        let facing = hero.facing;
        let min_dot = hero.profile.min_facing_dot;
        let damage = hero.attack * spec.multiplier * outgoing_multiplier(&hero.buffs);
        out.event(GameEvent::SkillUsed {
            participant,
            slot,
            target: aim,
        });

        match spec.shape {
            SkillShape::Cone { radius } => {
                let targets = self.targets_where(|p| in_cone(&origin, &facing, p, radius, min_dot));
                self.hit_all(participant, &targets, damage, 0.0, now, out);
            }
            SkillShape::Single { radius, stun } => {
                let nearest = self.nearest_target(&origin, |p| in_cone(&origin, &facing, p, radius, min_dot));
                if let Some(target) = nearest {
                    self.hit(participant, target, damage, stun, now, out);
                }
            }
            SkillShape::Line { length, width } => {
                let end = origin.add(&facing.scale(length));
                let targets = self.targets_where(|p| on_segment(&origin, &end, width / 2.0, p));
                self.hit_all(participant, &targets, damage, 0.0, now, out);
            }
            SkillShape::Circle { radius, cast_range } => {
                let center = origin.move_towards(&aim, cast_range);
                let targets = self.targets_where(|p| in_radius(&center, radius, p));
                self.hit_all(participant, &targets, damage, 0.0, now, out);
            }
            SkillShape::Nova { radius, stun } => {
                let targets = self.targets_where(|p| in_radius(&origin, radius, p));
                self.hit_all(participant, &targets, damage, stun, now, out);
            }
            SkillShape::Delayed {
                radius,
                cast_range,
                delay,
            } => {
                self.delayed.push(DelayedEffect {
                    owner: participant,
                    position: origin.move_towards(&aim, cast_range),
                    radius,
                    damage,
                    detonate_at: now + delay,
                });
            }
            SkillShape::Dash { distance, damaging } => {
                if let Some(hero) = self.heroes.get_mut(&participant) {
                    hero.dash = Some(Dash {
                        direction: facing,
                        remaining: distance,
                        damage: if damaging { damage } else { 0.0 },
                        already_hit: Vec::new(),
                    });
                    let duration = distance / DASH_SPEED;
                    hero.apply_buff(Buff::new(BuffKind::Invincible, duration, 0.0));
                    out.event(GameEvent::BuffApplied {
                        participant,
                        buff: BuffKind::Invincible,
                        duration,
                    });
                }
            }
            SkillShape::Buff {
                kind,
                duration,
                power,
                lifesteal,
            } => {
                if let Some(hero) = self.heroes.get_mut(&participant) {
                    hero.apply_buff(Buff::new(kind, duration, power).with_lifesteal(lifesteal));
                    out.event(GameEvent::BuffApplied {
                        participant,
                        buff: kind,
                        duration,
                    });
                }
            }
        }
        Ok(())
    }

    /// Plain attack on the nearest valid target in front of the hero.
    fn basic_attack(
        &mut self,
        participant: ParticipantId,
        aim: Vector2,
        now: f32,
        out: &mut Outbox,
    ) -> Result<(), IntentError> {
        let hero = self
            .heroes
            .get_mut(&participant)
            .ok_or(IntentError::UnknownParticipant(participant))?;
        if hero.attack_cooldown > 0.0 {
            return Err(IntentError::OnCooldown {
                remaining: hero.attack_cooldown,
            });
        }
        hero.attack_cooldown = 1.0 / hero.attack_speed.max(0.01);

        let origin = hero.position;
        let facing = hero.facing;
        let range = hero.range;
        let min_dot = hero.profile.min_facing_dot;
        let damage = hero.attack * outgoing_multiplier(&hero.buffs);
        out.event(GameEvent::SkillUsed {
            participant,
            slot: SkillSlot::Basic,
            target: aim,
        });

        if let Some(target) = self.nearest_target(&origin, |p| in_cone(&origin, &facing, p, range, min_dot)) {
            self.hit(participant, target, damage, 0.0, now, out);
        }
        Ok(())
    }

    // --- Targeting and damage ---

    fn target_position(&self, target: Target) -> Option<Vector2> {
        match target {
            Target::Enemy(id) => self.enemies.get(&id).map(|e| e.position),
            Target::Base(index) => self.bases.get(index).map(|b| b.position),
        }
    }

    fn targets_where<F>(&self, accept: F) -> Vec<Target>
    where
        F: Fn(&Vector2) -> bool,
    {
        let enemies = self
            .enemies
            .values()
            .filter(|e| e.is_alive() && accept(&e.position))
            .map(|e| Target::Enemy(e.id));
        let bases = self
            .bases
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.destroyed && accept(&b.position))
            .map(|(index, _)| Target::Base(index));
        enemies.chain(bases).collect()
    }

    fn nearest_target<F>(&self, origin: &Vector2, accept: F) -> Option<Target>
    where
        F: Fn(&Vector2) -> bool,
    {
        self.targets_where(accept)
            .into_iter()
            .filter_map(|t| self.target_position(t).map(|p| (t, origin.distance(&p))))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(t, _)| t)
    }

    fn hit_all(
        &mut self,
        participant: ParticipantId,
        targets: &[Target],
        damage: f32,
        stun: f32,
        now: f32,
        out: &mut Outbox,
    ) {
        for target in targets {
            self.hit(participant, *target, damage, stun, now, out);
        }
    }

    /// Applies one hero hit. Targets that vanished in the meantime are
    /// skipped silently.
    fn hit(
        &mut self,
        participant: ParticipantId,
        target: Target,
        damage: f32,
        stun: f32,
        now: f32,
        out: &mut Outbox,
    ) {
        let dealt = match target {
            Target::Enemy(id) => {
                let Some(enemy) = self.enemies.get_mut(&id).filter(|e| e.is_alive()) else {
                    return;
                };
                let dealt = enemy.take_hit(damage);
                if stun > 0.0 {
                    enemy.stun = enemy.stun.max(stun);
                }
                if self.heroes.contains_key(&participant) {
                    set_aggro(enemy, participant, now);
                }
                out.event(GameEvent::EnemyDamaged {
                    id,
                    amount: dealt,
                    hp: enemy.hp,
                });
                let killed = !enemy.is_alive();
                self.credit_damage(participant, dealt, out);
                if killed {
                    self.kill_enemy(id, Some(participant), out);
                }
                return;
            }
            Target::Base(index) => {
                let Some(base) = self.bases.get_mut(index).filter(|b| !b.destroyed) else {
                    return;
                };
                let dealt = base.take_hit(damage);
                out.event(GameEvent::EnemyBaseDamaged {
                    id: base.id,
                    amount: dealt,
                    hp: base.hp,
                });
                if base.destroyed {
                    out.event(GameEvent::EnemyBaseDestroyed { id: base.id });
                    if let Some(hero) = self.heroes.get_mut(&participant) {
                        hero.tally.bases_destroyed += 1;
                    }
                }
                dealt
            }
        };
        self.credit_damage(participant, dealt, out);
    }

    /// Books damage dealt and heals the attacker by its lifesteal.
    fn credit_damage(&mut self, participant: ParticipantId, dealt: f32, out: &mut Outbox) {
        let Some(hero) = self.heroes.get_mut(&participant) else {
            return;
        };
        hero.tally.damage_dealt += dealt;
        let passive = if hero.class == HeroClass::Warrior {
            WARRIOR_LIFESTEAL
        } else {
            0.0
        };
        let healed = hero.heal(dealt * lifesteal_ratio(passive, &hero.buffs));
        if healed > 0.0 {
            out.event(GameEvent::HeroHealed {
                participant,
                amount: healed,
                hp: hero.hp,
            });
        }
    }

    fn kill_enemy(&mut self, id: EntityId, killer: Option<ParticipantId>, out: &mut Outbox) {
        let Some(enemy) = self.enemies.remove(&id) else {
            return;
        };
        out.event(GameEvent::EnemyDied {
            id,
            kind: enemy.kind,
            killer,
        });
        let is_boss = enemy.kind == EnemyKind::Boss;
        if let Some(hero) = killer.and_then(|k| self.heroes.get_mut(&k)) {
            hero.tally.kills += 1;
            if is_boss {
                hero.tally.bosses_killed += 1;
            }
        }

        for (participant, share) in bounty_shares(&self.heroes, enemy.bounty) {
            self.credit_gold(participant, share, out);
        }
        if is_boss {
            let everyone: Vec<ParticipantId> = self.heroes.keys().copied().collect();
            for participant in everyone {
                self.credit_gold(participant, BOSS_BOUNTY, out);
            }
        }
    }

    fn credit_gold(&mut self, participant: ParticipantId, amount: f64, out: &mut Outbox) {
        if let Some(hero) = self.heroes.get_mut(&participant) {
            hero.wallet.credit(ResourceKind::Gold, amount);
            hero.tally.currency_earned += amount;
            out.event(GameEvent::ResourceUpdated {
                owner: WalletOwner::Hero(participant),
                resource: ResourceKind::Gold,
                amount: hero.wallet.get(ResourceKind::Gold),
            });
        }
    }

    /// Applies an enemy hit to a hero and handles death.
    fn strike_hero(&mut self, participant: ParticipantId, raw: f32, now: f32, out: &mut Outbox) {
        let Some(hero) = self.heroes.get_mut(&participant) else {
            return;
        };
        let dealt = damage_hero(hero, raw);
        if dealt > 0.0 {
            out.event(GameEvent::HeroDamaged {
                participant,
                amount: dealt,
                hp: hero.hp,
            });
        }
        if hero.hp <= 0.0 && !hero.dead {
            hero.dead = true;
            hero.revive_in = revive_delay(now);
            hero.tally.deaths += 1;
            hero.dash = None;
            hero.move_dir = None;
            hero.buffs.clear();
            out.event(GameEvent::HeroDied {
                participant,
                revive_in: hero.revive_in,
            });
        }
    }

    // --- Tick phases ---

    fn advance_timers(&mut self, dt: f32, out: &mut Outbox) {
        for (index, hero) in self.heroes.values_mut().enumerate() {
            for cooldown in hero.cooldowns.iter_mut() {
                *cooldown = (*cooldown - dt).max(0.0);
            }
            hero.attack_cooldown = (hero.attack_cooldown - dt).max(0.0);

            let mut expired = Vec::new();
            hero.buffs.retain_mut(|buff| {
                buff.remaining -= dt;
                if buff.remaining <= TIME_EPSILON {
                    expired.push(buff.kind);
                    false
                } else {
                    true
                }
            });
            for buff in expired {
                out.event(GameEvent::BuffRemoved {
                    participant: hero.participant,
                    buff,
                });
            }

            if hero.dead {
                hero.revive_in = (hero.revive_in - dt).max(0.0);
                if hero.revive_in <= TIME_EPSILON {
                    hero.dead = false;
                    hero.revive_in = 0.0;
                    hero.hp = hero.max_hp * REVIVE_HP_FRACTION;
                    hero.position = spawn_point(index);
                    out.event(GameEvent::HeroRevived {
                        participant: hero.participant,
                        position: hero.position,
                        hp: hero.hp,
                    });
                }
            }
        }

        for enemy in self.enemies.values_mut() {
            enemy.cooldown = (enemy.cooldown - dt).max(0.0);
            enemy.stun = (enemy.stun - dt).max(0.0);
        }
    }

    fn move_heroes(&mut self, dt: f32, now: f32, out: &mut Outbox) {
        let mut dash_hits: Vec<(ParticipantId, EntityId, f32)> = Vec::new();

        for hero in self.heroes.values_mut().filter(|h| !h.dead) {
            let Some(dash) = hero.dash.as_mut() else {
                if let Some(direction) = hero.move_dir {
                    hero.position = hero
                        .position
                        .add(&direction.scale(hero.speed * dt))
                        .clamp_to(DEFENSE_WIDTH, DEFENSE_HEIGHT);
                    hero.facing = direction;
                }
                continue;
            };

            let step = (DASH_SPEED * dt).min(dash.remaining);
            dash.remaining -= step;
            hero.position = hero
                .position
                .add(&dash.direction.scale(step))
                .clamp_to(DEFENSE_WIDTH, DEFENSE_HEIGHT);

            if dash.damage > 0.0 {
                for enemy in self.enemies.values() {
                    if enemy.is_alive()
                        && !dash.already_hit.contains(&enemy.id)
                        && in_radius(&hero.position, DASH_HIT_RADIUS, &enemy.position)
                    {
                        dash.already_hit.push(enemy.id);
                        dash_hits.push((hero.participant, enemy.id, dash.damage));
                    }
                }
            }

            if dash.remaining <= TIME_EPSILON {
                hero.dash = None;
                let before = hero.buffs.len();
                hero.buffs.retain(|b| b.kind != BuffKind::Invincible);
                if hero.buffs.len() != before {
                    out.event(GameEvent::BuffRemoved {
                        participant: hero.participant,
                        buff: BuffKind::Invincible,
                    });
                }
            }
        }

        for (participant, enemy, damage) in dash_hits {
            self.hit(participant, Target::Enemy(enemy), damage, 0.0, now, out);
        }
    }

    fn regenerate(&mut self, dt: f32) {
        for hero in self.heroes.values_mut().filter(|h| !h.dead) {
            if hero.class == HeroClass::Knight {
                hero.heal(KNIGHT_REGEN_PER_SEC * dt);
            }
            if let Some(rally) = hero.buff(BuffKind::Rally).map(|b| b.power) {
                let amount = rally * hero.max_hp * dt;
                hero.heal(amount);
            }
        }
    }

    fn run_enemies(&mut self, dt: f32, now: f32, out: &mut Outbox) {
        let ids: Vec<EntityId> = self.enemies.keys().copied().collect();
        for id in ids {
            let (goal, attack) = {
                let Some(enemy) = self.enemies.get_mut(&id) else {
                    continue;
                };
                refresh_aggro(enemy, &self.heroes, now);
                if enemy.is_stunned() {
                    continue;
                }
                let goal = enemy_goal(enemy, &self.heroes, &NEXUS_POSITION);
                let target = goal.position();
                if enemy.position.distance(&target) > enemy.range {
                    enemy.position = enemy.position.move_towards(&target, enemy.speed * dt);
                    continue;
                }
                if enemy.cooldown > 0.0 {
                    continue;
                }
                enemy.cooldown = enemy.attack_interval;
                (goal, enemy.attack)
            };

            match goal {
                EnemyGoal::Hero(participant, _) => self.strike_hero(participant, attack, now, out),
                EnemyGoal::Nexus(_) => {
                    self.damage_nexus(attack, out);
                }
            }
            if self.nexus.destroyed {
                break;
            }
        }
    }

    fn run_director(&mut self, dt: f32, now: f32, out: &mut Outbox) {
        let orders = self.director.tick(dt, now, &self.bases, self.heroes.len());
        if orders.is_empty() {
            return;
        }
        if !self.boss_phase && orders.iter().any(|o| o.kind == EnemyKind::Boss) {
            self.boss_phase = true;
            out.event(GameEvent::BossPhaseStarted);
        }
        for order in orders {
            let id = self.spawn_enemy(&order, out);
            if order.kind == EnemyKind::Boss {
                self.bosses.push(id);
            }
        }
    }

    fn detonate(&mut self, now: f32, out: &mut Outbox) {
        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.delayed)
            .into_iter()
            .partition(|effect| effect.detonate_at <= now + TIME_EPSILON);
        self.delayed = pending;

        for effect in due {
            out.event(GameEvent::DelayedEffectDetonated {
                participant: effect.owner,
                position: effect.position,
                radius: effect.radius,
            });
            let targets = self.targets_where(|p| in_radius(&effect.position, effect.radius, p));
            self.hit_all(effect.owner, &targets, effect.damage, 0.0, now, out);
        }
    }

    /// Spreads original rally and bloodlust buffs to nearby allies. Copies
    /// refresh the ally's remaining time and never stack.
    fn share_buffs(&mut self, out: &mut Outbox) {
        let sources: Vec<(ParticipantId, Vector2, Buff, f32)> = self
            .heroes
            .values()
            .filter(|h| !h.dead)
            .flat_map(|h| {
                h.buffs
                    .iter()
                    .filter(|b| b.shared_from.is_none())
                    .filter_map(move |b| share_radius(b.kind).map(|r| (h.participant, h.position, b.clone(), r)))
            })
            .collect();

        for (owner, position, buff, radius) in sources {
            for ally in self.heroes.values_mut() {
                if ally.participant == owner || ally.dead || ally.position.distance(&position) > radius {
                    continue;
                }
                let mut copy = buff.clone();
                copy.shared_from = Some(owner);
                let duration = copy.remaining;
                if ally.apply_buff(copy) {
                    out.event(GameEvent::BuffApplied {
                        participant: ally.participant,
                        buff: buff.kind,
                        duration,
                    });
                }
            }
        }
    }
}

impl RoomRules for DefenseRules {
    fn mode(&self) -> GameMode {
        GameMode::Defense
    }

    fn on_start(&mut self, out: &mut Outbox) {
        for hero in self.heroes.values() {
            out.event(GameEvent::HeroSpawned {
                participant: hero.participant,
                class: hero.class,
                position: hero.position,
            });
        }
    }

    fn apply_intent(
        &mut self,
        participant: ParticipantId,
        intent: &Intent,
        now: f32,
        out: &mut Outbox,
    ) -> Result<(), IntentError> {
        match intent {
            Intent::MoveHero { direction } => self.move_hero(participant, *direction),
            Intent::UseSkill {
                slot,
                target_x,
                target_y,
            } => self.use_skill(participant, *slot, Vector2::new(*target_x, *target_y), now, out),
            Intent::UpgradeHero { stat } => self.upgrade(participant, *stat, out),
            _ => Err(IntentError::WrongMode),
        }
    }

    fn tick(&mut self, dt: f32, now: f32, out: &mut Outbox) {
        self.advance_timers(dt, out);
        self.move_heroes(dt, now, out);
        self.regenerate(dt);
        self.run_enemies(dt, now, out);
        if self.nexus.destroyed {
            return;
        }
        self.run_director(dt, now, out);
        self.detonate(now, out);
        self.share_buffs(out);
    }

    fn outcome(&self, _now: f32) -> Option<MatchResult> {
        if self.nexus.destroyed {
            return Some(MatchResult::Defeat {
                reason: DefeatReason::NexusDestroyed,
            });
        }
        let bosses_down = !self.bosses.is_empty() && self.bosses.iter().all(|id| !self.enemies.contains_key(id));
        if self.boss_phase && bosses_down {
            return Some(MatchResult::Victory);
        }
        None
    }

    fn snapshot(&self, now: f32) -> Snapshot {
        Snapshot::Defense(DefenseSnapshot {
            elapsed: now,
            nexus_hp: self.nexus.hp,
            nexus_max_hp: self.nexus.max_hp,
            boss_phase: self.boss_phase,
            bases: self
                .bases
                .iter()
                .map(|b| EnemyBaseView {
                    id: b.id,
                    position: b.position,
                    hp: b.hp,
                    max_hp: b.max_hp,
                    destroyed: b.destroyed,
                })
                .collect(),
            heroes: self.heroes.values().map(Hero::view).collect(),
            enemies: self.enemies.values().map(Enemy::view).collect(),
        })
    }

    fn on_disconnect(
        &mut self,
        participant: ParticipantId,
        state: RoomState,
        _out: &mut Outbox,
    ) -> Option<MatchResult> {
        let hero = self.heroes.get_mut(&participant)?;
        hero.connected = false;
        hero.move_dir = None;

        let remaining = self.heroes.values().filter(|h| h.connected).count();
        debug!(
            "Defense participant {} disconnected in {:?}, {} still connected",
            participant, state, remaining
        );
        if remaining > 0 {
            return None;
        }
        match state {
            RoomState::Running => Some(MatchResult::Defeat {
                reason: DefeatReason::AllDisconnected,
            }),
            RoomState::Waiting | RoomState::Countdown => Some(MatchResult::Aborted {
                reason: AbortReason::Dissolved,
            }),
            RoomState::Ended => None,
        }
    }

    fn reports(&self, result: &MatchResult) -> Vec<ParticipantReport> {
        let won = *result == MatchResult::Victory;
        self.heroes
            .values()
            .map(|hero| ParticipantReport {
                participant: hero.participant,
                won,
                kills: hero.tally.kills,
                deaths: hero.tally.deaths,
                damage_dealt: hero.tally.damage_dealt,
                damage_taken: hero.tally.damage_taken,
                currency_earned: hero.tally.currency_earned,
                bases_destroyed: hero.tally.bases_destroyed,
                bosses_killed: hero.tally.bosses_killed,
            })
            .collect()
    }
}
