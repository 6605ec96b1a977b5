//! Target selection and damage rules.
//!
//! Functions here are stateless per call: they read the room's entity
//! tables and return a decision, or mutate exactly the records they are
//! handed. "No target" is a normal outcome, never an error.

use std::collections::BTreeMap;

use shared::{BuffKind, EntityId, ParticipantId, Side, Vector2};

use crate::entity::{Aggro, Base, Buff, Enemy, Hero, Unit, Wall};
use crate::tables::AGGRO_DURATION;

/// What an assault combat unit wants to hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AssaultTarget {
    Unit(EntityId),
    Wall(EntityId),
    Base(Side),
}

/// One tick's decision for an assault combat unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Attack(AssaultTarget),
    MoveTo(Vector2),
    Idle,
}

/// Picks the action of a combat unit by priority:
/// retaliation, then a wall closer than the enemy base, then any enemy
/// unit already in range, then the enemy base itself.
pub fn choose_assault_action(
    unit: &Unit,
    units: &BTreeMap<EntityId, Unit>,
    walls: &BTreeMap<EntityId, Wall>,
    enemy_base: &Base,
) -> Action {
    let Some(stats) = unit.combat() else {
        return Action::Idle;
    };
    let range = stats.range;
    let reach = |target: &Vector2| unit.position.distance(target) <= range;

    if let Some(attacker) = stats
        .last_attacker
        .and_then(|id| units.get(&id))
        .filter(|other| other.is_alive() && other.side != unit.side)
    {
        return if reach(&attacker.position) {
            Action::Attack(AssaultTarget::Unit(attacker.id))
        } else {
            Action::MoveTo(attacker.position)
        };
    }

    let base_distance = unit.position.distance(&enemy_base.position);
    let nearest_wall = walls
        .values()
        .filter(|wall| wall.side != unit.side && wall.is_standing())
        .map(|wall| (wall, unit.position.distance(&wall.position)))
        .filter(|(_, dist)| *dist < base_distance)
        .min_by(|a, b| a.1.total_cmp(&b.1));
    if let Some((wall, dist)) = nearest_wall {
        return if dist <= range {
            Action::Attack(AssaultTarget::Wall(wall.id))
        } else {
            Action::MoveTo(wall.position)
        };
    }

    let nearest_enemy = units
        .values()
        .filter(|other| other.side != unit.side && other.is_alive())
        .map(|other| (other, unit.position.distance(&other.position)))
        .filter(|(_, dist)| *dist <= range)
        .min_by(|a, b| a.1.total_cmp(&b.1));
    if let Some((enemy, _)) = nearest_enemy {
        return Action::Attack(AssaultTarget::Unit(enemy.id));
    }

    if enemy_base.destroyed {
        Action::Idle
    } else if base_distance <= range {
        Action::Attack(AssaultTarget::Base(unit.side.opponent()))
    } else {
        Action::MoveTo(enemy_base.position)
    }
}

// --- Defense geometry ---

pub fn in_radius(center: &Vector2, radius: f32, point: &Vector2) -> bool {
    center.distance(point) <= radius
}

/// True when `point` is within `range` of `origin` and, if a threshold is
/// given, in front of `facing` by at least `min_dot`.
pub fn in_cone(
    origin: &Vector2,
    facing: &Vector2,
    point: &Vector2,
    range: f32,
    min_dot: Option<f32>,
) -> bool {
    let delta = point.sub(origin);
    let dist = delta.magnitude();
    if dist > range {
        return false;
    }
    match min_dot {
        Some(threshold) if dist > 0.01 => facing.normalize().dot(&delta.scale(1.0 / dist)) >= threshold,
        _ => true,
    }
}

/// True when `point` lies within `half_width` of the segment `start..end`.
pub fn on_segment(start: &Vector2, end: &Vector2, half_width: f32, point: &Vector2) -> bool {
    let seg = end.sub(start);
    let len_sq = seg.dot(&seg);
    if len_sq == 0.0 {
        return start.distance(point) <= half_width;
    }
    let t = (point.sub(start).dot(&seg) / len_sq).clamp(0.0, 1.0);
    let closest = start.add(&seg.scale(t));
    closest.distance(point) <= half_width
}

// --- Damage ---

/// Defender-side mitigation: invincibility negates, bulwark reduces.
pub fn mitigate(amount: f32, buffs: &[Buff]) -> f32 {
    if buffs.iter().any(|b| b.kind == BuffKind::Invincible) {
        return 0.0;
    }
    let reduction = buffs
        .iter()
        .filter(|b| b.kind == BuffKind::Bulwark)
        .map(|b| b.power)
        .fold(0.0_f32, f32::max)
        .clamp(0.0, 1.0);
    (amount * (1.0 - reduction)).max(0.0)
}

/// Attacker-side damage multiplier from buffs.
pub fn outgoing_multiplier(buffs: &[Buff]) -> f32 {
    1.0 + buffs
        .iter()
        .filter(|b| b.kind == BuffKind::Bloodlust)
        .map(|b| b.power)
        .fold(0.0_f32, f32::max)
}

/// Combined lifesteal of a passive ratio and any buff ratios.
/// Sources multiply their complements: `1 - (1 - p)(1 - b)`.
pub fn lifesteal_ratio(passive: f32, buffs: &[Buff]) -> f32 {
    let kept = buffs
        .iter()
        .map(|b| b.lifesteal)
        .filter(|ratio| *ratio > 0.0)
        .fold(1.0 - passive.clamp(0.0, 1.0), |kept, ratio| kept * (1.0 - ratio.clamp(0.0, 1.0)));
    1.0 - kept
}

/// Applies mitigated damage to a hero. Returns the hp actually removed.
pub fn damage_hero(hero: &mut Hero, raw: f32) -> f32 {
    if hero.dead {
        return 0.0;
    }
    let amount = mitigate(raw, &hero.buffs);
    let dealt = amount.min(hero.hp).max(0.0);
    hero.hp = (hero.hp - amount).max(0.0);
    hero.tally.damage_taken += dealt;
    dealt
}

// --- Aggro ---

/// Points the enemy at `hero` for the next five seconds.
pub fn set_aggro(enemy: &mut Enemy, hero: ParticipantId, now: f32) {
    enemy.aggro = Some(Aggro {
        hero,
        until: now + AGGRO_DURATION,
    });
}

/// Drops aggro that expired or whose hero died or left.
pub fn refresh_aggro(enemy: &mut Enemy, heroes: &BTreeMap<ParticipantId, Hero>, now: f32) {
    if let Some(aggro) = enemy.aggro {
        let hero_alive = heroes.get(&aggro.hero).is_some_and(|h| !h.dead);
        if now >= aggro.until || !hero_alive {
            enemy.aggro = None;
        }
    }
}

/// Where a defense enemy is heading this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnemyGoal {
    Hero(ParticipantId, Vector2),
    Nexus(Vector2),
}

impl EnemyGoal {
    pub fn position(&self) -> Vector2 {
        match self {
            EnemyGoal::Hero(_, position) | EnemyGoal::Nexus(position) => *position,
        }
    }
}

pub fn enemy_goal(enemy: &Enemy, heroes: &BTreeMap<ParticipantId, Hero>, nexus: &Vector2) -> EnemyGoal {
    enemy
        .aggro
        .and_then(|aggro| heroes.get(&aggro.hero))
        .filter(|hero| !hero.dead)
        .map(|hero| EnemyGoal::Hero(hero.participant, hero.position))
        .unwrap_or(EnemyGoal::Nexus(*nexus))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::{EnemyKind, HeroClass, UnitKind};

    fn base(side: Side) -> Base {
        match side {
            Side::Left => Base::new(0, Vector2::new(60.0, 300.0), 1000.0),
            Side::Right => Base::new(1, Vector2::new(1140.0, 300.0), 1000.0),
        }
    }

    fn table(units: Vec<Unit>) -> BTreeMap<EntityId, Unit> {
        units.into_iter().map(|u| (u.id, u)).collect()
    }

    #[test]
    fn test_retaliation_takes_priority() {
        let mut me = Unit::spawn(1, UnitKind::Soldier, Side::Left, Vector2::new(500.0, 300.0));
        let attacker = Unit::spawn(2, UnitKind::Archer, Side::Right, Vector2::new(600.0, 300.0));
        let close = Unit::spawn(3, UnitKind::Soldier, Side::Right, Vector2::new(520.0, 300.0));
        me.take_hit(2, 5.0);
        let units = table(vec![me.clone(), attacker, close]);

        let action = choose_assault_action(&me, &units, &BTreeMap::new(), &base(Side::Right));
        assert_eq!(action, Action::MoveTo(Vector2::new(600.0, 300.0)));
    }

    #[test]
    fn test_dead_attacker_is_forgotten() {
        let mut me = Unit::spawn(1, UnitKind::Soldier, Side::Left, Vector2::new(500.0, 300.0));
        let mut attacker = Unit::spawn(2, UnitKind::Archer, Side::Right, Vector2::new(600.0, 300.0));
        attacker.hp = 0.0;
        me.take_hit(2, 5.0);
        let units = table(vec![me.clone(), attacker]);

        let action = choose_assault_action(&me, &units, &BTreeMap::new(), &base(Side::Right));
        assert_eq!(action, Action::MoveTo(Vector2::new(1140.0, 300.0)));
    }

    #[test]
    fn test_wall_closer_than_base_is_attacked() {
        let me = Unit::spawn(1, UnitKind::Soldier, Side::Left, Vector2::new(700.0, 300.0));
        let enemy = Unit::spawn(2, UnitKind::Soldier, Side::Right, Vector2::new(715.0, 300.0));
        let mut walls = BTreeMap::new();
        walls.insert(9, Wall::new(9, Side::Right, Vector2::new(720.0, 300.0)));
        let units = table(vec![me.clone(), enemy]);

        let action = choose_assault_action(&me, &units, &walls, &base(Side::Right));
        assert_eq!(action, Action::Attack(AssaultTarget::Wall(9)));
    }

    #[test]
    fn test_own_walls_and_walls_behind_base_are_ignored() {
        let me = Unit::spawn(1, UnitKind::Soldier, Side::Left, Vector2::new(1115.0, 300.0));
        let mut walls = BTreeMap::new();
        walls.insert(8, Wall::new(8, Side::Left, Vector2::new(1120.0, 300.0)));
        walls.insert(9, Wall::new(9, Side::Right, Vector2::new(600.0, 300.0)));
        let units = table(vec![me.clone()]);

        let action = choose_assault_action(&me, &units, &walls, &base(Side::Right));
        assert_eq!(action, Action::Attack(AssaultTarget::Base(Side::Right)));
    }

    #[test]
    fn test_enemy_in_range_before_base() {
        let me = Unit::spawn(1, UnitKind::Archer, Side::Right, Vector2::new(600.0, 300.0));
        let far = Unit::spawn(2, UnitKind::Soldier, Side::Left, Vector2::new(700.0, 300.0));
        let near = Unit::spawn(3, UnitKind::Soldier, Side::Left, Vector2::new(560.0, 300.0));
        let units = table(vec![me.clone(), far, near]);

        let action = choose_assault_action(&me, &units, &BTreeMap::new(), &base(Side::Left));
        assert_eq!(action, Action::Attack(AssaultTarget::Unit(3)));
    }

    #[test]
    fn test_support_unit_never_fights() {
        let me = Unit::spawn(1, UnitKind::Woodcutter, Side::Left, Vector2::new(1100.0, 300.0));
        let units = table(vec![me.clone()]);
        let action = choose_assault_action(&me, &units, &BTreeMap::new(), &base(Side::Right));
        assert_eq!(action, Action::Idle);
    }

    #[test]
    fn test_cone_respects_facing() {
        let origin = Vector2::new(0.0, 0.0);
        let facing = Vector2::new(1.0, 0.0);
        assert!(in_cone(&origin, &facing, &Vector2::new(50.0, 10.0), 70.0, Some(0.5)));
        assert!(!in_cone(&origin, &facing, &Vector2::new(-50.0, 0.0), 70.0, Some(0.5)));
        assert!(in_cone(&origin, &facing, &Vector2::new(-50.0, 0.0), 70.0, None));
        assert!(!in_cone(&origin, &facing, &Vector2::new(80.0, 0.0), 70.0, None));
    }

    #[test]
    fn test_segment_hit_test() {
        let start = Vector2::new(0.0, 0.0);
        let end = Vector2::new(100.0, 0.0);
        assert!(on_segment(&start, &end, 15.0, &Vector2::new(50.0, 10.0)));
        assert!(!on_segment(&start, &end, 15.0, &Vector2::new(50.0, 20.0)));
        assert!(!on_segment(&start, &end, 15.0, &Vector2::new(130.0, 0.0)));
    }

    #[test]
    fn test_mitigation() {
        let bulwark = vec![Buff::new(BuffKind::Bulwark, 6.0, 0.5)];
        assert_approx_eq!(mitigate(100.0, &bulwark), 50.0, 0.001);

        let invincible = vec![Buff::new(BuffKind::Invincible, 0.3, 0.0)];
        assert_eq!(mitigate(100.0, &invincible), 0.0);
        assert_eq!(mitigate(100.0, &[]), 100.0);
    }

    #[test]
    fn test_lifesteal_stacks_multiplicatively() {
        let buffs = vec![Buff::new(BuffKind::Bloodlust, 8.0, 0.3).with_lifesteal(0.2)];
        // 1 - 0.9 * 0.8
        assert_approx_eq!(lifesteal_ratio(0.1, &buffs), 0.28, 0.0001);
        assert_approx_eq!(lifesteal_ratio(0.1, &[]), 0.1, 0.0001);
        assert_approx_eq!(outgoing_multiplier(&buffs), 1.3, 0.0001);
    }

    #[test]
    fn test_dead_hero_takes_no_damage() {
        let mut hero = Hero::new(1, HeroClass::Mage, 1, Vector2::ZERO);
        hero.dead = true;
        assert_eq!(damage_hero(&mut hero, 50.0), 0.0);
        assert_eq!(hero.tally.damage_taken, 0.0);
    }

    #[test]
    fn test_aggro_expires_after_five_seconds() {
        let mut heroes = BTreeMap::new();
        heroes.insert(1, Hero::new(1, HeroClass::Archer, 1, Vector2::new(10.0, 10.0)));
        let nexus = Vector2::new(800.0, 1080.0);
        let mut enemy = Enemy::spawn(5, EnemyKind::Grunt, Vector2::ZERO, 0, 1.0, 1.0);

        set_aggro(&mut enemy, 1, 12.0);
        refresh_aggro(&mut enemy, &heroes, 16.9);
        assert_eq!(enemy_goal(&enemy, &heroes, &nexus), EnemyGoal::Hero(1, Vector2::new(10.0, 10.0)));

        refresh_aggro(&mut enemy, &heroes, 17.0);
        assert_eq!(enemy.aggro, None);
        assert_eq!(enemy_goal(&enemy, &heroes, &nexus), EnemyGoal::Nexus(nexus));
    }

    #[test]
    fn test_aggro_drops_when_hero_dies() {
        let mut heroes = BTreeMap::new();
        heroes.insert(1, Hero::new(1, HeroClass::Archer, 1, Vector2::ZERO));
        let mut enemy = Enemy::spawn(5, EnemyKind::Grunt, Vector2::ZERO, 0, 1.0, 1.0);
        set_aggro(&mut enemy, 1, 0.0);

        if let Some(hero) = heroes.get_mut(&1) {
            hero.dead = true;
        }
        refresh_aggro(&mut enemy, &heroes, 0.1);
        assert_eq!(enemy.aggro, None);
    }
}
