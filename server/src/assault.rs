//! Two-player economy and base-assault rules.

use std::collections::BTreeMap;

use log::debug;
use shared::{
    AbortReason, AssaultSnapshot, EntityId, GameEvent, GameMode, Intent, MatchResult,
    ParticipantId, ParticipantReport, ResourceKind, RoomState, Side, SideView, Snapshot, UnitKind,
    UnitState, Vector2, WalletOwner, WinReason,
};

use crate::combat::{choose_assault_action, Action, AssaultTarget};
use crate::economy::{
    base_upgrade_cost, gather, nearest_node, sell_price, unit_cost, within_gather_radius,
    PassiveIncome, WALL_COST,
};
use crate::entity::{
    reset_attack_cooldown, Base, Cost, ResourceNode, Tally, Unit, UnitRole, Wall, Wallet,
};
use crate::error::IntentError;
use crate::rules::{Outbox, RoomRules};
use crate::tables::{
    ASSAULT_HEIGHT, ASSAULT_WIDTH, BASE_HP, BASE_MAX_LEVEL, BASE_UPGRADE_HP, LEFT_BASE,
    LEFT_SPAWN, NODE_LAYOUT, RIGHT_BASE, RIGHT_SPAWN, STARTING_GOLD,
};

#[derive(Debug, Clone)]
pub struct SideState {
    pub participant: ParticipantId,
    pub base: Base,
    pub wallet: Wallet,
    pub tally: Tally,
    pub connected: bool,
}

impl SideState {
    fn new(participant: ParticipantId, base_id: EntityId, position: Vector2) -> Self {
        Self {
            participant,
            base: Base::new(base_id, position, BASE_HP),
            wallet: Wallet::with_gold(STARTING_GOLD),
            tally: Tally::default(),
            connected: true,
        }
    }
}

pub struct AssaultRules {
    sides: BTreeMap<Side, SideState>,
    units: BTreeMap<EntityId, Unit>,
    walls: BTreeMap<EntityId, Wall>,
    nodes: BTreeMap<EntityId, ResourceNode>,
    income: PassiveIncome,
    match_duration: f32,
    next_id: EntityId,
}

impl AssaultRules {
    pub fn new(left: ParticipantId, right: ParticipantId, match_duration: f32) -> Self {
        let mut sides = BTreeMap::new();
        sides.insert(Side::Left, SideState::new(left, 1, LEFT_BASE));
        sides.insert(Side::Right, SideState::new(right, 2, RIGHT_BASE));

        let mut rules = Self {
            sides,
            units: BTreeMap::new(),
            walls: BTreeMap::new(),
            nodes: BTreeMap::new(),
            income: PassiveIncome::default(),
            match_duration,
            next_id: 10,
        };

        for (kind, position) in NODE_LAYOUT {
            let mirrored = Vector2::new(ASSAULT_WIDTH - position.x, position.y);
            for at in [position, mirrored] {
                let id = rules.allocate_id();
                rules.nodes.insert(id, ResourceNode::new(id, kind, at));
            }
        }
        rules
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn side_of(&self, participant: ParticipantId) -> Option<Side> {
        self.sides
            .iter()
            .find(|(_, state)| state.participant == participant)
            .map(|(side, _)| *side)
    }

    pub fn side(&self, side: Side) -> Option<&SideState> {
        self.sides.get(&side)
    }

    pub fn units(&self) -> &BTreeMap<EntityId, Unit> {
        &self.units
    }

    pub fn walls(&self) -> &BTreeMap<EntityId, Wall> {
        &self.walls
    }

    pub fn nodes(&self) -> &BTreeMap<EntityId, ResourceNode> {
        &self.nodes
    }

    fn side_mut(&mut self, side: Side) -> Result<&mut SideState, IntentError> {
        self.sides.get_mut(&side).ok_or(IntentError::WrongMode)
    }

    fn spend(&mut self, side: Side, cost: &Cost, out: &mut Outbox) -> Result<(), IntentError> {
        let state = self.side_mut(side)?;
        state.wallet.try_spend(cost)?;
        for &(resource, _) in cost {
            out.event(GameEvent::ResourceUpdated {
                owner: WalletOwner::Side(side),
                resource,
                amount: state.wallet.get(resource),
            });
        }
        Ok(())
    }

    fn spawn_unit(&mut self, side: Side, kind: UnitKind, out: &mut Outbox) -> Result<(), IntentError> {
        self.spend(side, unit_cost(kind), out)?;
        let id = self.allocate_id();
        let position = match side {
            Side::Left => LEFT_SPAWN,
            Side::Right => RIGHT_SPAWN,
        };
        self.units.insert(id, Unit::spawn(id, kind, side, position));
        out.event(GameEvent::UnitSpawned {
            id,
            kind,
            side,
            position,
        });
        Ok(())
    }

    fn build_wall(&mut self, side: Side, x: f32, y: f32, out: &mut Outbox) -> Result<(), IntentError> {
        let half = ASSAULT_WIDTH / 2.0;
        let on_own_half = match side {
            Side::Left => (0.0..half).contains(&x),
            Side::Right => x > half && x <= ASSAULT_WIDTH,
        };
        if !x.is_finite() || !y.is_finite() || !on_own_half || !(0.0..=ASSAULT_HEIGHT).contains(&y) {
            return Err(IntentError::OutOfBounds);
        }
        self.spend(side, WALL_COST, out)?;

        let id = self.allocate_id();
        let position = Vector2::new(x, y);
        self.walls.insert(id, Wall::new(id, side, position));
        out.event(GameEvent::WallBuilt { id, side, position });
        Ok(())
    }

    fn upgrade_base(&mut self, side: Side, out: &mut Outbox) -> Result<(), IntentError> {
        let level = self.side_mut(side)?.base.level;
        if level >= BASE_MAX_LEVEL {
            return Err(IntentError::AtCap { cap: BASE_MAX_LEVEL });
        }
        self.spend(side, &base_upgrade_cost(level), out)?;

        let base = &mut self.side_mut(side)?.base;
        base.level += 1;
        base.max_hp += BASE_UPGRADE_HP;
        base.hp = (base.hp + BASE_UPGRADE_HP).min(base.max_hp);
        out.event(GameEvent::BaseUpgraded {
            side,
            level: base.level,
            max_hp: base.max_hp,
        });
        Ok(())
    }

    fn sell(&mut self, side: Side, resource: ResourceKind, amount: u32, out: &mut Outbox) -> Result<(), IntentError> {
        let price = sell_price(resource).ok_or(IntentError::NotSellable("gold"))?;
        if amount == 0 {
            return Ok(());
        }
        let amount = amount as f64;
        self.spend(side, &[(resource, amount)], out)?;

        let state = self.side_mut(side)?;
        let earned = amount * price;
        state.wallet.credit(ResourceKind::Gold, earned);
        state.tally.currency_earned += earned;
        out.event(GameEvent::ResourceUpdated {
            owner: WalletOwner::Side(side),
            resource: ResourceKind::Gold,
            amount: state.wallet.get(ResourceKind::Gold),
        });
        Ok(())
    }

    fn pay_income(&mut self, dt: f32, out: &mut Outbox) {
        let seconds = self.income.advance(dt);
        if seconds == 0 {
            return;
        }
        let payout = PassiveIncome::payout(seconds);
        for (side, state) in self.sides.iter_mut() {
            state.wallet.credit(ResourceKind::Gold, payout);
            state.tally.currency_earned += payout;
            out.event(GameEvent::ResourceUpdated {
                owner: WalletOwner::Side(*side),
                resource: ResourceKind::Gold,
                amount: state.wallet.get(ResourceKind::Gold),
            });
        }
    }

    fn run_gatherers(&mut self, dt: f32, now: f32, out: &mut Outbox) {
        for unit in self.units.values_mut() {
            let UnitRole::Support(stats) = &unit.role else {
                continue;
            };
            let Some(node_id) = nearest_node(&unit.position, stats.resource, &self.nodes) else {
                unit.state = UnitState::Idle;
                continue;
            };
            let Some(node) = self.nodes.get_mut(&node_id) else {
                continue;
            };

            if !within_gather_radius(&unit.position, node) {
                unit.position = unit.position.move_towards(&node.position, unit.speed * dt);
                unit.state = UnitState::Moving;
                continue;
            }

            unit.state = UnitState::Gathering;
            let taken = gather(stats, node, dt, now);
            if taken > 0.0 {
                if let Some(state) = self.sides.get_mut(&unit.side) {
                    state.wallet.credit(node.kind, taken);
                    out.event(GameEvent::ResourceUpdated {
                        owner: WalletOwner::Side(unit.side),
                        resource: node.kind,
                        amount: state.wallet.get(node.kind),
                    });
                }
            }
            if taken > 0.0 && !node.is_harvestable() {
                out.event(GameEvent::NodeDepleted {
                    id: node.id,
                    kind: node.kind,
                });
            }
        }
    }

    /// Runs one combat decision per live combat unit. Stops early once a
    /// base falls so nothing mutates after the deciding hit.
    fn run_combat(&mut self, dt: f32, out: &mut Outbox) {
        let ids: Vec<EntityId> = self.units.keys().copied().collect();
        for id in ids {
            let action = {
                let Some(unit) = self.units.get(&id).filter(|u| u.is_alive()) else {
                    continue;
                };
                let Some(enemy) = self.sides.get(&unit.side.opponent()) else {
                    continue;
                };
                choose_assault_action(unit, &self.units, &self.walls, &enemy.base)
            };

            match action {
                Action::Attack(target) => self.attack(id, target, out),
                Action::MoveTo(target) => {
                    if let Some(unit) = self.units.get_mut(&id) {
                        unit.position = unit.position.move_towards(&target, unit.speed * dt);
                        unit.state = UnitState::Moving;
                    }
                }
                Action::Idle => {
                    if let Some(unit) = self.units.get_mut(&id) {
                        if unit.combat().is_some() {
                            unit.state = UnitState::Idle;
                        }
                    }
                }
            }

            if self.sides.values().any(|s| s.base.destroyed) {
                break;
            }
        }
    }

    fn attack(&mut self, attacker_id: EntityId, target: AssaultTarget, out: &mut Outbox) {
        let Some(attacker) = self.units.get_mut(&attacker_id) else {
            return;
        };
        attacker.state = UnitState::Attacking;
        let side = attacker.side;
        let Some(stats) = attacker.combat_mut() else {
            return;
        };
        if stats.cooldown > 0.0 {
            return;
        }
        let damage = stats.attack;
        reset_attack_cooldown(stats);

        let dealt = match target {
            AssaultTarget::Unit(target_id) => {
                let Some(victim) = self.units.get_mut(&target_id) else {
                    return;
                };
                let dealt = victim.take_hit(attacker_id, damage);
                out.event(GameEvent::UnitDamaged {
                    id: target_id,
                    attacker: attacker_id,
                    amount: dealt,
                    hp: victim.hp,
                });
                let killed = !victim.is_alive();
                let victim_side = victim.side;
                if let Some(state) = self.sides.get_mut(&victim_side) {
                    state.tally.damage_taken += dealt;
                    if killed {
                        state.tally.deaths += 1;
                    }
                }
                if killed {
                    if let Some(state) = self.sides.get_mut(&side) {
                        state.tally.kills += 1;
                    }
                }
                dealt
            }
            AssaultTarget::Wall(wall_id) => {
                let Some(wall) = self.walls.get_mut(&wall_id) else {
                    return;
                };
                let dealt = wall.take_hit(damage);
                out.event(GameEvent::WallDamaged {
                    id: wall_id,
                    amount: dealt,
                    hp: wall.hp,
                });
                if !wall.is_standing() {
                    let wall_side = wall.side;
                    self.walls.remove(&wall_id);
                    out.event(GameEvent::WallDestroyed {
                        id: wall_id,
                        side: wall_side,
                    });
                }
                dealt
            }
            AssaultTarget::Base(base_side) => {
                let Some(state) = self.sides.get_mut(&base_side) else {
                    return;
                };
                let dealt = state.base.take_hit(damage);
                state.tally.damage_taken += dealt;
                out.event(GameEvent::BaseDamaged {
                    side: base_side,
                    amount: dealt,
                    hp: state.base.hp,
                });
                if state.base.destroyed {
                    if let Some(attacking) = self.sides.get_mut(&side) {
                        attacking.tally.bases_destroyed += 1;
                    }
                }
                dealt
            }
        };

        if let Some(state) = self.sides.get_mut(&side) {
            state.tally.damage_dealt += dealt;
        }
    }

    fn remove_dead(&mut self, out: &mut Outbox) {
        let dead: Vec<(EntityId, Side)> = self
            .units
            .values()
            .filter(|u| !u.is_alive())
            .map(|u| (u.id, u.side))
            .collect();
        for (id, side) in dead {
            self.units.remove(&id);
            out.event(GameEvent::UnitDied { id, side });
        }
    }

    fn respawn_nodes(&mut self, now: f32, out: &mut Outbox) {
        for node in self.nodes.values_mut() {
            if node.respawn_if_due(now) {
                out.event(GameEvent::NodeRespawned {
                    id: node.id,
                    kind: node.kind,
                    amount: node.amount,
                });
            }
        }
    }

    fn base_hp(&self, side: Side) -> f32 {
        self.sides.get(&side).map(|s| s.base.hp).unwrap_or(0.0)
    }

    fn base_destroyed(&self, side: Side) -> bool {
        self.sides.get(&side).is_some_and(|s| s.base.destroyed)
    }
}

impl RoomRules for AssaultRules {
    fn mode(&self) -> GameMode {
        GameMode::Assault
    }

    fn on_start(&mut self, out: &mut Outbox) {
        for (side, state) in &self.sides {
            out.event(GameEvent::ResourceUpdated {
                owner: WalletOwner::Side(*side),
                resource: ResourceKind::Gold,
                amount: state.wallet.get(ResourceKind::Gold),
            });
        }
    }

    fn apply_intent(
        &mut self,
        participant: ParticipantId,
        intent: &Intent,
        _now: f32,
        out: &mut Outbox,
    ) -> Result<(), IntentError> {
        let side = self
            .side_of(participant)
            .ok_or(IntentError::UnknownParticipant(participant))?;

        match intent {
            Intent::SpawnUnit { kind } => self.spawn_unit(side, *kind, out),
            Intent::BuildWall { x, y } => self.build_wall(side, *x, *y, out),
            Intent::UpgradeBase => self.upgrade_base(side, out),
            Intent::SellResource { resource, amount } => self.sell(side, *resource, *amount, out),
            _ => Err(IntentError::WrongMode),
        }
    }

    fn tick(&mut self, dt: f32, now: f32, out: &mut Outbox) {
        for unit in self.units.values_mut() {
            unit.cool_down(dt);
        }
        self.pay_income(dt, out);
        self.run_gatherers(dt, now, out);
        self.run_combat(dt, out);
        self.remove_dead(out);
        self.respawn_nodes(now, out);
    }

    fn outcome(&self, now: f32) -> Option<MatchResult> {
        match (self.base_destroyed(Side::Left), self.base_destroyed(Side::Right)) {
            (true, true) => return Some(MatchResult::Draw),
            (true, false) => {
                return Some(MatchResult::Winner {
                    side: Side::Right,
                    reason: WinReason::BaseDestroyed,
                })
            }
            (false, true) => {
                return Some(MatchResult::Winner {
                    side: Side::Left,
                    reason: WinReason::BaseDestroyed,
                })
            }
            (false, false) => {}
        }

        if now + 1e-4 < self.match_duration {
            return None;
        }
        let left = self.base_hp(Side::Left);
        let right = self.base_hp(Side::Right);
        Some(if left > right {
            MatchResult::Winner {
                side: Side::Left,
                reason: WinReason::TimeUp,
            }
        } else if right > left {
            MatchResult::Winner {
                side: Side::Right,
                reason: WinReason::TimeUp,
            }
        } else {
            MatchResult::Draw
        })
    }

    fn snapshot(&self, now: f32) -> Snapshot {
        Snapshot::Assault(AssaultSnapshot {
            elapsed: now,
            sides: self
                .sides
                .iter()
                .map(|(side, state)| SideView {
                    side: *side,
                    participant: state.participant,
                    base_hp: state.base.hp,
                    base_max_hp: state.base.max_hp,
                    base_level: state.base.level,
                    wallet: state.wallet.entries(),
                })
                .collect(),
            units: self.units.values().map(Unit::view).collect(),
            walls: self.walls.values().map(Wall::view).collect(),
            nodes: self.nodes.values().map(ResourceNode::view).collect(),
        })
    }

    fn on_disconnect(
        &mut self,
        participant: ParticipantId,
        state: RoomState,
        _out: &mut Outbox,
    ) -> Option<MatchResult> {
        let side = self.side_of(participant)?;
        if let Some(side_state) = self.sides.get_mut(&side) {
            side_state.connected = false;
        }
        debug!("Assault participant {} ({:?}) disconnected in {:?}", participant, side, state);

        match state {
            RoomState::Waiting | RoomState::Countdown => Some(MatchResult::Aborted {
                reason: AbortReason::Dissolved,
            }),
            RoomState::Running => Some(MatchResult::Winner {
                side: side.opponent(),
                reason: WinReason::Forfeit,
            }),
            RoomState::Ended => None,
        }
    }

    fn reports(&self, result: &MatchResult) -> Vec<ParticipantReport> {
        self.sides
            .iter()
            .map(|(side, state)| ParticipantReport {
                participant: state.participant,
                won: matches!(result, MatchResult::Winner { side: winner, .. } if winner == side),
                kills: state.tally.kills,
                deaths: state.tally.deaths,
                damage_dealt: state.tally.damage_dealt,
                damage_taken: state.tally.damage_taken,
                currency_earned: state.tally.currency_earned,
                bases_destroyed: state.tally.bases_destroyed,
                bosses_killed: 0,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    const LEFT: ParticipantId = 1;
    const RIGHT: ParticipantId = 2;
    const DT: f32 = 0.05;

    fn rules() -> AssaultRules {
        AssaultRules::new(LEFT, RIGHT, 300.0)
    }

    fn gold(rules: &AssaultRules, side: Side) -> f64 {
        rules.sides[&side].wallet.get(ResourceKind::Gold)
    }

    fn run(rules: &mut AssaultRules, ticks: u32, out: &mut Outbox) -> Option<MatchResult> {
        for step in 1..=ticks {
            rules.tick(DT, step as f32 * DT, out);
            if let Some(result) = rules.outcome(step as f32 * DT) {
                return Some(result);
            }
        }
        None
    }

    #[test]
    fn test_soldier_with_exactly_fifty_gold() {
        let mut rules = rules();
        let mut out = Outbox::new();
        rules.sides.get_mut(&Side::Left).unwrap().wallet = Wallet::with_gold(50.0);

        let intent = Intent::SpawnUnit {
            kind: UnitKind::Soldier,
        };
        assert!(rules.apply_intent(LEFT, &intent, 0.0, &mut out).is_ok());

        assert_eq!(gold(&rules, Side::Left), 0.0);
        assert_eq!(rules.units.len(), 1);
        let unit = rules.units.values().next().unwrap();
        assert_eq!(unit.side, Side::Left);
        assert_eq!(unit.position, LEFT_SPAWN);
        assert_eq!(unit.hp, unit.max_hp);
        assert!(out
            .events()
            .any(|e| matches!(e, GameEvent::UnitSpawned { kind: UnitKind::Soldier, .. })));
    }

    #[test]
    fn test_unaffordable_spawn_changes_nothing() {
        let mut rules = rules();
        let mut out = Outbox::new();
        let intent = Intent::SpawnUnit {
            kind: UnitKind::Knight,
        };

        assert_eq!(
            rules.apply_intent(RIGHT, &intent, 0.0, &mut out),
            Err(IntentError::InsufficientFunds)
        );
        assert_eq!(gold(&rules, Side::Right), STARTING_GOLD);
        assert!(rules.units.is_empty());
        assert!(out.is_empty());
    }

    #[test]
    fn test_hero_intent_is_wrong_mode() {
        let mut rules = rules();
        let mut out = Outbox::new();
        let intent = Intent::MoveHero { direction: None };
        assert_eq!(
            rules.apply_intent(LEFT, &intent, 0.0, &mut out),
            Err(IntentError::WrongMode)
        );
        assert_eq!(
            rules.apply_intent(99, &Intent::UpgradeBase, 0.0, &mut out),
            Err(IntentError::UnknownParticipant(99))
        );
    }

    #[test]
    fn test_walls_only_on_own_half() {
        let mut rules = rules();
        let mut out = Outbox::new();
        {
            let wallet = &mut rules.sides.get_mut(&Side::Left).unwrap().wallet;
            wallet.credit(ResourceKind::Wood, 100.0);
            wallet.credit(ResourceKind::Rock, 100.0);
        }

        let enemy_half = Intent::BuildWall { x: 900.0, y: 300.0 };
        assert_eq!(
            rules.apply_intent(LEFT, &enemy_half, 0.0, &mut out),
            Err(IntentError::OutOfBounds)
        );
        let own_half = Intent::BuildWall { x: 400.0, y: 300.0 };
        assert!(rules.apply_intent(LEFT, &own_half, 0.0, &mut out).is_ok());
        assert_eq!(rules.walls.len(), 1);
        assert_eq!(gold(&rules, Side::Left), STARTING_GOLD - 30.0);
    }

    #[test]
    fn test_base_upgrade_raises_hp_and_caps() {
        let mut rules = rules();
        let mut out = Outbox::new();
        {
            let wallet = &mut rules.sides.get_mut(&Side::Right).unwrap().wallet;
            wallet.credit(ResourceKind::Gold, 5_000.0);
            wallet.credit(ResourceKind::Rock, 1_000.0);
            wallet.credit(ResourceKind::Iron, 1_000.0);
        }

        for level in 1..=BASE_MAX_LEVEL {
            rules.apply_intent(RIGHT, &Intent::UpgradeBase, 0.0, &mut out).unwrap();
            let base = &rules.sides[&Side::Right].base;
            assert_eq!(base.level, level);
            assert_eq!(base.max_hp, BASE_HP + level as f32 * BASE_UPGRADE_HP);
        }
        assert_eq!(
            rules.apply_intent(RIGHT, &Intent::UpgradeBase, 0.0, &mut out),
            Err(IntentError::AtCap { cap: BASE_MAX_LEVEL })
        );
    }

    #[test]
    fn test_selling_materials() {
        let mut rules = rules();
        let mut out = Outbox::new();
        rules
            .sides
            .get_mut(&Side::Left)
            .unwrap()
            .wallet
            .credit(ResourceKind::Iron, 10.0);

        let sell = Intent::SellResource {
            resource: ResourceKind::Iron,
            amount: 10,
        };
        rules.apply_intent(LEFT, &sell, 0.0, &mut out).unwrap();
        assert_eq!(gold(&rules, Side::Left), STARTING_GOLD + 30.0);
        assert_eq!(rules.sides[&Side::Left].wallet.get(ResourceKind::Iron), 0.0);

        assert_eq!(
            rules.apply_intent(LEFT, &sell, 0.0, &mut out),
            Err(IntentError::InsufficientFunds)
        );
        let gold_sale = Intent::SellResource {
            resource: ResourceKind::Gold,
            amount: 1,
        };
        assert!(matches!(
            rules.apply_intent(LEFT, &gold_sale, 0.0, &mut out),
            Err(IntentError::NotSellable(_))
        ));
    }

    #[test]
    fn test_passive_income_once_per_second() {
        let mut rules = rules();
        let mut out = Outbox::new();
        run(&mut rules, 20, &mut out);
        assert_approx_eq!(gold(&rules, Side::Left), STARTING_GOLD + 10.0, 1e-9);
        assert_approx_eq!(gold(&rules, Side::Right), STARTING_GOLD + 10.0, 1e-9);
        run(&mut rules, 19, &mut out);
        assert_approx_eq!(gold(&rules, Side::Left), STARTING_GOLD + 10.0, 1e-9);
    }

    #[test]
    fn test_gatherer_walks_to_node_and_fills_wallet() {
        let mut rules = rules();
        let mut out = Outbox::new();
        rules
            .apply_intent(LEFT, &Intent::SpawnUnit { kind: UnitKind::Woodcutter }, 0.0, &mut out)
            .unwrap();

        run(&mut rules, 200, &mut out);
        let wood = rules.sides[&Side::Left].wallet.get(ResourceKind::Wood);
        assert!(wood > 0.0, "woodcutter gathered nothing");
        let drained: f64 = rules
            .nodes
            .values()
            .filter(|n| n.kind == ResourceKind::Wood)
            .map(|n| n.max_amount - n.amount)
            .sum();
        assert_approx_eq!(drained, wood, 1e-6);

        // The last wood update carries the wallet total
        let reported = out
            .events()
            .filter_map(|e| match e {
                GameEvent::ResourceUpdated {
                    owner: WalletOwner::Side(Side::Left),
                    resource: ResourceKind::Wood,
                    amount,
                } => Some(*amount),
                _ => None,
            })
            .last();
        assert_eq!(reported, Some(wood));
    }

    #[test]
    fn test_units_fight_and_dead_are_removed() {
        let mut rules = rules();
        let mut out = Outbox::new();
        let a = rules.allocate_id();
        let b = rules.allocate_id();
        rules.units.insert(a, Unit::spawn(a, UnitKind::Soldier, Side::Left, Vector2::new(600.0, 300.0)));
        let mut weak = Unit::spawn(b, UnitKind::Soldier, Side::Right, Vector2::new(620.0, 300.0));
        weak.hp = 15.0;
        rules.units.insert(b, weak);

        run(&mut rules, 40, &mut out);
        assert!(!rules.units.contains_key(&b));
        assert!(rules.units.contains_key(&a));
        assert!(out.events().any(|e| *e == GameEvent::UnitDied { id: b, side: Side::Right }));
        assert_eq!(rules.sides[&Side::Left].tally.kills, 1);
        assert_eq!(rules.sides[&Side::Right].tally.deaths, 1);
    }

    #[test]
    fn test_destroyed_base_ends_match_for_other_side() {
        let mut rules = rules();
        let mut out = Outbox::new();
        rules.sides.get_mut(&Side::Right).unwrap().base.hp = 5.0;
        let id = rules.allocate_id();
        rules.units.insert(id, Unit::spawn(id, UnitKind::Soldier, Side::Left, Vector2::new(1120.0, 300.0)));

        let result = run(&mut rules, 5, &mut out);
        assert_eq!(
            result,
            Some(MatchResult::Winner {
                side: Side::Left,
                reason: WinReason::BaseDestroyed
            })
        );
        assert_eq!(rules.sides[&Side::Left].tally.bases_destroyed, 1);
        let reports = rules.reports(&result.unwrap());
        assert!(reports.iter().any(|r| r.participant == LEFT && r.won));
        assert!(reports.iter().any(|r| r.participant == RIGHT && !r.won));
    }

    #[test]
    fn test_time_up_compares_base_hp() {
        let mut rules = AssaultRules::new(LEFT, RIGHT, 1.0);
        let mut out = Outbox::new();
        assert_eq!(run(&mut rules, 20, &mut out), Some(MatchResult::Draw));

        let mut rules = AssaultRules::new(LEFT, RIGHT, 1.0);
        rules.sides.get_mut(&Side::Left).unwrap().base.hp = 999.0;
        assert_eq!(
            run(&mut rules, 20, &mut out),
            Some(MatchResult::Winner {
                side: Side::Right,
                reason: WinReason::TimeUp
            })
        );
    }

    #[test]
    fn test_disconnect_forfeits_or_dissolves() {
        let mut out = Outbox::new();
        let mut rules = rules();
        assert_eq!(
            rules.on_disconnect(LEFT, RoomState::Running, &mut out),
            Some(MatchResult::Winner {
                side: Side::Right,
                reason: WinReason::Forfeit
            })
        );

        let mut rules = self::rules();
        assert_eq!(
            rules.on_disconnect(RIGHT, RoomState::Countdown, &mut out),
            Some(MatchResult::Aborted {
                reason: AbortReason::Dissolved
            })
        );
        assert_eq!(rules.on_disconnect(42, RoomState::Running, &mut out), None);
    }

    #[test]
    fn test_node_layout_is_mirrored() {
        let rules = rules();
        assert_eq!(rules.nodes.len(), NODE_LAYOUT.len() * 2);
        let left = rules.nodes.values().filter(|n| n.position.x < ASSAULT_WIDTH / 2.0).count();
        assert_eq!(left, NODE_LAYOUT.len());
    }
}
