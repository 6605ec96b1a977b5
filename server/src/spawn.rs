//! Enemy spawn pacing for defense rooms.
//!
//! While any enemy base stands, one enemy is spawned per interval from a
//! weighted archetype table that widens with elapsed time, rotating between
//! the bases still standing. Once every base is destroyed the director
//! stops and hands out one boss order per base, exactly once.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use shared::{EnemyKind, EntityId, Vector2};

use crate::entity::Base;

pub const BASE_SPAWN_INTERVAL: f32 = 3.0;
pub const SPAWN_INTERVAL_STEP: f32 = 0.2;
pub const MIN_SPAWN_INTERVAL: f32 = 0.8;
pub const BOSS_MULTIPLIER: f32 = 1.5;

/// Seconds between two spawns after `elapsed` seconds.
pub fn spawn_interval(elapsed: f32) -> f32 {
    let minutes = elapsed / 60.0;
    (BASE_SPAWN_INTERVAL - SPAWN_INTERVAL_STEP * minutes).max(MIN_SPAWN_INTERVAL)
}

/// Weighted archetypes available after `elapsed` seconds.
pub fn archetype_table(elapsed: f32) -> Vec<(EnemyKind, u32)> {
    let minutes = elapsed / 60.0;
    let mut table = vec![(EnemyKind::Grunt, 70), (EnemyKind::Runner, 30)];
    if minutes >= 2.0 {
        table.push((EnemyKind::Spitter, 20));
    }
    if minutes >= 5.0 {
        table.push((EnemyKind::Brute, 15));
    }
    table
}

/// Hp multiplier by participant count; more heroes, tougher enemies.
pub fn difficulty_multiplier(participants: usize) -> f32 {
    match participants {
        0 | 1 => 1.0,
        2 => 1.4,
        3 => 1.8,
        _ => 2.2,
    }
}

/// Attack multiplier by participant count.
pub fn attack_multiplier(participants: usize) -> f32 {
    match participants {
        0 | 1 => 1.0,
        2 => 1.2,
        3 => 1.35,
        _ => 1.5,
    }
}

/// Continuous growth: +10% per elapsed minute.
pub fn time_multiplier(elapsed: f32) -> f32 {
    1.0 + 0.1 * (elapsed / 60.0)
}

/// A request for the room to create one enemy.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnOrder {
    pub kind: EnemyKind,
    pub origin: EntityId,
    pub position: Vector2,
    pub hp_scale: f32,
    pub attack_scale: f32,
}

#[derive(Debug)]
pub struct SpawnDirector {
    rng: StdRng,
    until_next: f32,
    next_base: usize,
    bosses_ordered: bool,
}

impl SpawnDirector {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            until_next: BASE_SPAWN_INTERVAL,
            next_base: 0,
            bosses_ordered: false,
        }
    }

    /// Draws an archetype from the weighted table for `elapsed`.
    pub fn pick_archetype(&mut self, elapsed: f32) -> EnemyKind {
        let table = archetype_table(elapsed);
        let total: u32 = table.iter().map(|(_, weight)| weight).sum();
        let mut roll = self.rng.gen_range(0..total);
        for (kind, weight) in &table {
            if roll < *weight {
                return *kind;
            }
            roll -= weight;
        }
        EnemyKind::Grunt
    }

    /// Advances the pacing clock. Returns at most one regular spawn order
    /// while a base stands, or the boss orders once every base has fallen.
    pub fn tick(&mut self, dt: f32, elapsed: f32, bases: &[Base], participants: usize) -> Vec<SpawnOrder> {
        let standing: Vec<&Base> = bases.iter().filter(|b| !b.destroyed).collect();
        if standing.is_empty() {
            return self.boss_orders(elapsed, bases);
        }

        self.until_next -= dt;
        if self.until_next > 0.0 {
            return Vec::new();
        }
        self.until_next += spawn_interval(elapsed);

        let base = standing[self.next_base % standing.len()];
        self.next_base = (self.next_base + 1) % standing.len().max(1);
        let kind = self.pick_archetype(elapsed);
        let time = time_multiplier(elapsed);

        vec![SpawnOrder {
            kind,
            origin: base.id,
            position: self.jitter(&base.position),
            hp_scale: difficulty_multiplier(participants) * time,
            attack_scale: attack_multiplier(participants) * time,
        }]
    }

    fn boss_orders(&mut self, elapsed: f32, bases: &[Base]) -> Vec<SpawnOrder> {
        if self.bosses_ordered {
            return Vec::new();
        }
        self.bosses_ordered = true;
        let scale = BOSS_MULTIPLIER * time_multiplier(elapsed);
        bases
            .iter()
            .map(|base| SpawnOrder {
                kind: EnemyKind::Boss,
                origin: base.id,
                position: base.position,
                hp_scale: scale,
                attack_scale: scale,
            })
            .collect()
    }

    fn jitter(&mut self, around: &Vector2) -> Vector2 {
        Vector2::new(
            around.x + self.rng.gen_range(-40.0..40.0),
            around.y + self.rng.gen_range(0.0..60.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn bases() -> Vec<Base> {
        vec![
            Base::new(10, Vector2::new(300.0, 150.0), 4000.0),
            Base::new(11, Vector2::new(1300.0, 150.0), 4000.0),
        ]
    }

    #[test]
    fn test_spawn_interval_decreases_to_floor() {
        assert_approx_eq!(spawn_interval(0.0), 3.0, 1e-6);
        assert_approx_eq!(spawn_interval(300.0), 2.0, 1e-6);
        assert_approx_eq!(spawn_interval(60.0 * 60.0), MIN_SPAWN_INTERVAL, 1e-6);
    }

    #[test]
    fn test_table_widens_with_time() {
        assert_eq!(archetype_table(0.0).len(), 2);
        assert!(archetype_table(130.0).iter().any(|(k, _)| *k == EnemyKind::Spitter));
        assert!(!archetype_table(130.0).iter().any(|(k, _)| *k == EnemyKind::Brute));
        assert_eq!(archetype_table(301.0).len(), 4);
    }

    #[test]
    fn test_early_draws_only_weak_archetypes() {
        let mut director = SpawnDirector::new(7);
        for _ in 0..200 {
            let kind = director.pick_archetype(30.0);
            assert!(matches!(kind, EnemyKind::Grunt | EnemyKind::Runner));
        }
    }

    #[test]
    fn test_participant_multipliers_grow() {
        assert!(difficulty_multiplier(4) > difficulty_multiplier(2));
        assert!(attack_multiplier(3) > attack_multiplier(1));
        assert_eq!(difficulty_multiplier(1), 1.0);
    }

    #[test]
    fn test_spawns_alternate_between_standing_bases() {
        let mut director = SpawnDirector::new(1);
        let bases = bases();
        let mut origins = Vec::new();
        let dt = 0.05;
        let mut elapsed = 0.0;
        while origins.len() < 4 {
            elapsed += dt;
            for order in director.tick(dt, elapsed, &bases, 1) {
                origins.push(order.origin);
            }
        }
        assert_eq!(origins, vec![10, 11, 10, 11]);
    }

    #[test]
    fn test_destroyed_base_stops_spawning_there() {
        let mut director = SpawnDirector::new(1);
        let mut bases = bases();
        bases[0].destroyed = true;
        for step in 0..400 {
            for order in director.tick(0.05, step as f32 * 0.05, &bases, 2) {
                assert_eq!(order.origin, 11);
                assert_ne!(order.kind, EnemyKind::Boss);
            }
        }
    }

    #[test]
    fn test_bosses_ordered_exactly_once() {
        let mut director = SpawnDirector::new(3);
        let mut bases = bases();
        for base in &mut bases {
            base.destroyed = true;
        }

        let orders = director.tick(0.05, 600.0, &bases, 4);
        assert_eq!(orders.len(), 2);
        assert!(orders.iter().all(|o| o.kind == EnemyKind::Boss));
        assert_approx_eq!(orders[0].hp_scale, 1.5 * 2.0, 1e-5);
        assert!(director.bosses_ordered);

        assert!(director.tick(0.05, 600.05, &bases, 4).is_empty());
    }
}
