//! Attack flight, hit resolution and the parry/reflect transition.

use std::{collections::BTreeSet, time::Duration};

use glam::Vec2;
use lane_defence_core::{ActionKind, AttackId, Event, LaneId, OverlapTarget, Side, UnitId};

use crate::{
    lanes::{lane_id, Lane, Unit},
    Rejection, World,
};

/// Projectile travelling along a lane.
#[derive(Clone, Debug)]
pub(crate) struct Attack {
    pub(crate) id: AttackId,
    pub(crate) side: Side,
    pub(crate) lane: usize,
    pub(crate) damage: i32,
    pub(crate) owner: Option<UnitId>,
    /// Units already hit; only ever grows.
    pub(crate) hits: BTreeSet<UnitId>,
    pub(crate) parryable: bool,
    pub(crate) reflect: bool,
    pub(crate) position: Vec2,
    pub(crate) velocity: Vec2,
    /// Distance left before the attack fizzles.
    pub(crate) reach: f32,
    pub(crate) consumed: bool,
}

impl Attack {
    /// Marks the attack consumed. Safe to call repeatedly.
    pub(crate) fn destroy(&mut self) {
        self.consumed = true;
    }
}

/// Attacks in flight, grouped by the side they currently fight for.
#[derive(Debug, Default)]
pub(crate) struct AttackGroups {
    player: Vec<Attack>,
    enemy: Vec<Attack>,
}

impl AttackGroups {
    pub(crate) fn push(&mut self, attack: Attack) {
        match attack.side {
            Side::Player => self.player.push(attack),
            Side::Enemy => self.enemy.push(attack),
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Attack> {
        self.player.iter().chain(self.enemy.iter())
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut Attack> {
        self.player.iter_mut().chain(self.enemy.iter_mut())
    }

    fn find_mut(&mut self, id: AttackId) -> Option<&mut Attack> {
        self.iter_mut().find(|attack| attack.id == id && !attack.consumed)
    }

    pub(crate) fn drain(&mut self) -> Vec<Attack> {
        let mut drained = std::mem::take(&mut self.player);
        drained.append(&mut self.enemy);
        drained
    }

    /// Moves reflected attacks into the player group and drops consumed ones.
    fn sweep(&mut self, out_events: &mut Vec<Event>) {
        let (reflected, enemy): (Vec<_>, Vec<_>) = std::mem::take(&mut self.enemy)
            .into_iter()
            .partition(|attack| attack.side == Side::Player);
        self.enemy = enemy;
        self.player.extend(reflected);

        for group in [&mut self.player, &mut self.enemy] {
            group.retain(|attack| {
                if attack.consumed {
                    out_events.push(Event::AttackRemoved { attack: attack.id });
                }
                !attack.consumed
            });
        }
    }
}

/// Lane region at the player's base edge that reflects parryable attacks.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ParryWindow {
    pub(crate) lane: usize,
    pub(crate) remaining: Duration,
    pub(crate) reach: f32,
}

impl ParryWindow {
    fn covers(&self, low: f32, high: f32) -> bool {
        high >= 0.0 && low <= self.reach
    }
}

/// Resolves an attack touching a unit of the opposing side.
///
/// Returns `true` when the hit left the target staggered.
pub(crate) fn resolve_hit(
    attack: &mut Attack,
    target: &mut Unit,
    stagger_duration: Duration,
) -> bool {
    if attack.consumed || target.side == attack.side || !attack.hits.insert(target.id) {
        return false;
    }

    match attack.side {
        Side::Player if attack.reflect => {
            attack.destroy();
            target.add_stagger(attack.damage, stagger_duration)
        }
        Side::Player => {
            target.take_damage(attack.damage);
            false
        }
        Side::Enemy => {
            target.take_damage(attack.damage);
            attack.destroy();
            false
        }
    }
}

/// Switches a parried attack to the player's side and re-aims it.
///
/// With the owner's position and velocity known the attack heads for where
/// the owner will be after `distance / (2 * speed)` at twice its speed.
/// Otherwise it simply turns around.
pub(crate) fn reflect(attack: &mut Attack, owner: Option<(Vec2, Vec2)>, player_damage: i32) {
    let speed = attack.velocity.length();
    let doubled = speed * 2.0;
    let aimed = owner.filter(|_| doubled > 0.0).and_then(|(position, velocity)| {
        let time = position.distance(attack.position) / doubled;
        let intercept = position + velocity * time;
        (intercept - attack.position)
            .try_normalize()
            .map(|direction| direction * doubled)
    });

    attack.velocity = aimed.unwrap_or(-attack.velocity);
    attack.side = Side::Player;
    attack.reflect = true;
    attack.parryable = false;
    attack.damage = player_damage;
    attack.reach = f32::INFINITY;
}

fn owner_kinematics(lanes: &[Lane], owner: Option<UnitId>, spacing: f32) -> Option<(Vec2, Vec2)> {
    let owner = owner?;
    lanes.iter().enumerate().find_map(|(index, lane)| {
        lane.find(owner).map(|unit| {
            (
                Vec2::new(unit.position, lane_y(index, spacing)),
                Vec2::new(unit.velocity, 0.0),
            )
        })
    })
}

fn lane_y(index: usize, spacing: f32) -> f32 {
    // Lane counts are tiny; the conversion is exact.
    index as f32 * spacing
}

fn strike_units(
    attack: &mut Attack,
    units: &mut [Unit],
    low: f32,
    high: f32,
    stagger_duration: Duration,
    out_events: &mut Vec<Event>,
) {
    for unit in units {
        if attack.consumed {
            break;
        }
        let (start, end) = unit.extent();
        if end < low || start > high {
            continue;
        }
        if resolve_hit(attack, unit, stagger_duration) {
            tracing::debug!(unit = ?unit.id, "unit staggered");
            out_events.push(Event::UnitStaggered { unit: unit.id });
        }
    }
}

impl World {
    /// Launches attacks from every unit whose target is in range and whose interval elapsed.
    pub(crate) fn trigger_unit_attacks(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let spacing = self.config.lane_spacing();
        for (index, lane) in self.lanes.iter_mut().enumerate() {
            let y = lane_y(index, spacing);
            for side in [Side::Player, Side::Enemy] {
                let target = lane.front_edge(side.opponent());
                for unit in lane.units_mut(side).iter_mut() {
                    unit.time_since_last_attack = unit.time_since_last_attack.saturating_add(dt);
                    let Some(target) = target else {
                        continue;
                    };
                    if unit.is_staggered() {
                        continue;
                    }
                    let stats = self.config.unit(unit.kind);
                    let gap = (target - unit.leading_edge()) * side.direction();
                    if gap > stats.range || unit.time_since_last_attack < stats.attack_interval {
                        continue;
                    }
                    unit.time_since_last_attack = Duration::ZERO;

                    let attack = Attack {
                        id: self.ids.attack(),
                        side,
                        lane: index,
                        damage: unit.damage,
                        owner: Some(unit.id),
                        hits: BTreeSet::new(),
                        parryable: side == Side::Enemy && stats.parryable,
                        reflect: false,
                        position: Vec2::new(unit.leading_edge(), y),
                        velocity: Vec2::new(side.direction() * stats.projectile_speed, 0.0),
                        reach: stats.range + stats.width,
                        consumed: false,
                    };
                    out_events.push(Event::AttackLaunched {
                        attack: attack.id,
                        side,
                    });
                    self.attacks.push(attack);
                }
            }
        }
    }

    /// Moves attacks and resolves the overlaps swept during the frame.
    pub(crate) fn fly_attacks(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let dt_secs = dt.as_secs_f32();
        let lane_length = self.config.lane_length();
        let spacing = self.config.lane_spacing();
        let stagger_duration = self.config.stagger_duration();
        let player_damage = self.player_damage();

        for attack in self.attacks.iter_mut() {
            if attack.consumed {
                continue;
            }
            let start = attack.position.x;
            let travel = attack.velocity * dt_secs;
            attack.position += travel;
            attack.reach -= travel.length();
            let low = start.min(attack.position.x);
            let high = start.max(attack.position.x);

            let parried = attack.side == Side::Enemy
                && attack.parryable
                && self
                    .parry_windows
                    .iter()
                    .any(|window| window.lane == attack.lane && window.covers(low, high));
            if parried {
                let owner = owner_kinematics(&self.lanes, attack.owner, spacing);
                reflect(attack, owner, player_damage);
                tracing::debug!(attack = ?attack.id, "attack parried");
                out_events.push(Event::AttackReflected { attack: attack.id });
                continue;
            }

            if let Some(lane) = self.lanes.get_mut(attack.lane) {
                let targets = lane.units_mut(attack.side.opponent());
                strike_units(attack, targets, low, high, stagger_duration, out_events);
            }

            let x = attack.position.x;
            if x < 0.0 || x > lane_length || attack.reach <= 0.0 {
                attack.destroy();
            }
        }

        self.attacks.sweep(out_events);
    }

    pub(crate) fn decay_parry_windows(&mut self, dt: Duration) {
        for window in &mut self.parry_windows {
            window.remaining = window.remaining.saturating_sub(dt);
        }
        self.parry_windows.retain(|window| !window.remaining.is_zero());
    }

    pub(crate) fn run_action(
        &mut self,
        action: ActionKind,
        lane: LaneId,
        out_events: &mut Vec<Event>,
    ) -> Result<(), Rejection> {
        self.ensure_active()?;
        let index = self.lane_index(lane)?;
        let stats = *self.config.action(action);
        self.charge(&stats.cost)?;
        tracing::debug!(?action, ?lane, "action run");
        out_events.push(Event::ResourcesUpdated {
            resources: self.resources,
        });
        out_events.push(Event::ActionRun { action, lane });

        match action {
            ActionKind::Parry => {
                self.parry_windows.retain(|window| window.lane != index);
                self.parry_windows.push(ParryWindow {
                    lane: index,
                    remaining: stats.duration,
                    reach: stats.reach,
                });
            }
            ActionKind::Volley => {
                let attack = Attack {
                    id: self.ids.attack(),
                    side: Side::Player,
                    lane: index,
                    damage: self.player_damage(),
                    owner: None,
                    hits: BTreeSet::new(),
                    parryable: false,
                    reflect: false,
                    position: Vec2::new(0.0, lane_y(index, self.config.lane_spacing())),
                    velocity: Vec2::new(stats.speed, 0.0),
                    reach: self.config.lane_length(),
                    consumed: false,
                };
                out_events.push(Event::AttackLaunched {
                    attack: attack.id,
                    side: Side::Player,
                });
                self.attacks.push(attack);
            }
        }
        Ok(())
    }

    /// Resolves an overlap detected by the host's collision engine.
    pub(crate) fn report_overlap(
        &mut self,
        attack_id: AttackId,
        target: OverlapTarget,
        out_events: &mut Vec<Event>,
    ) -> Result<(), Rejection> {
        self.ensure_active()?;
        let stagger_duration = self.config.stagger_duration();
        let spacing = self.config.lane_spacing();
        let player_damage = self.player_damage();
        let attack = self
            .attacks
            .find_mut(attack_id)
            .ok_or(Rejection::UnknownAttack(attack_id))?;

        match target {
            OverlapTarget::Unit(unit_id) => {
                let unit = self
                    .lanes
                    .get_mut(attack.lane)
                    .and_then(|lane| lane.find_mut(attack.side.opponent(), unit_id))
                    .ok_or(Rejection::InvalidTarget(unit_id, attack_id))?;
                if resolve_hit(attack, unit, stagger_duration) {
                    out_events.push(Event::UnitStaggered { unit: unit_id });
                }
            }
            OverlapTarget::Parry(lane) => {
                let open = self
                    .parry_windows
                    .iter()
                    .any(|window| lane_id(window.lane) == lane && window.lane == attack.lane);
                if !open {
                    return Err(Rejection::NoParryWindow(lane));
                }
                if attack.side != Side::Enemy || !attack.parryable {
                    return Err(Rejection::NotParryable(attack_id));
                }
                let owner = owner_kinematics(&self.lanes, attack.owner, spacing);
                reflect(attack, owner, player_damage);
                out_events.push(Event::AttackReflected { attack: attack_id });
            }
        }

        self.attacks.sweep(out_events);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_defence_core::{Buffs, ConfigTable, PresentationHandle, UnitKind};

    fn enemy_attack(position: Vec2, velocity: Vec2) -> Attack {
        Attack {
            id: AttackId::new(1),
            side: Side::Enemy,
            lane: 0,
            damage: 6,
            owner: Some(UnitId::new(9)),
            hits: BTreeSet::new(),
            parryable: true,
            reflect: false,
            position,
            velocity,
            reach: 100.0,
            consumed: false,
        }
    }

    fn unit(id: u32, side: Side) -> Unit {
        let config = ConfigTable::standard().expect("standard table");
        Unit::spawn(
            UnitId::new(id),
            PresentationHandle::new(u64::from(id)),
            UnitKind::Swordsman,
            side,
            config.unit(UnitKind::Swordsman),
            Buffs::default(),
            1000.0,
        )
    }

    #[test]
    fn reflected_attack_aims_at_projected_owner() {
        let mut attack = enemy_attack(Vec2::new(100.0, 0.0), Vec2::new(-50.0, 0.0));
        let owner = (Vec2::new(300.0, 0.0), Vec2::new(-20.0, 0.0));
        reflect(&mut attack, Some(owner), 15);

        assert_eq!(attack.side, Side::Player);
        assert!(attack.reflect);
        assert!(!attack.parryable);
        assert_eq!(attack.damage, 15);
        assert!((attack.velocity.length() - 100.0).abs() < 1e-3);
        assert!(attack.velocity.x > 0.0);
        assert!(attack.velocity.y.abs() < 1e-3);
    }

    #[test]
    fn reflected_attack_leads_a_moving_owner_off_axis() {
        let mut attack = enemy_attack(Vec2::new(0.0, 0.0), Vec2::new(-100.0, 0.0));
        let owner = (Vec2::new(200.0, 0.0), Vec2::new(0.0, 100.0));
        reflect(&mut attack, Some(owner), 15);

        // t = 200 / 200 = 1s, so the intercept sits at (200, 100).
        let expected = Vec2::new(200.0, 100.0).normalize() * 200.0;
        assert!((attack.velocity - expected).length() < 1e-3);
    }

    #[test]
    fn reflected_attack_without_owner_turns_around() {
        let mut attack = enemy_attack(Vec2::new(100.0, 0.0), Vec2::new(-50.0, 0.0));
        reflect(&mut attack, None, 15);
        assert_eq!(attack.velocity, Vec2::new(50.0, 0.0));
        assert_eq!(attack.damage, 15);
    }

    #[test]
    fn hit_set_survives_reflection() {
        let mut attack = enemy_attack(Vec2::ZERO, Vec2::new(-50.0, 0.0));
        let _ = attack.hits.insert(UnitId::new(3));
        reflect(&mut attack, None, 15);
        assert!(attack.hits.contains(&UnitId::new(3)));
    }

    #[test]
    fn enemy_attacks_are_consumed_by_their_first_hit() {
        let mut attack = enemy_attack(Vec2::ZERO, Vec2::new(-50.0, 0.0));
        let mut first = unit(1, Side::Player);
        let mut second = unit(2, Side::Player);

        let _ = resolve_hit(&mut attack, &mut first, Duration::from_secs(1));
        let _ = resolve_hit(&mut attack, &mut second, Duration::from_secs(1));

        assert!(attack.consumed);
        assert_eq!(first.health, 24);
        assert_eq!(second.health, 30);
    }

    #[test]
    fn reflected_attacks_stagger_instead_of_damaging() {
        let mut attack = enemy_attack(Vec2::ZERO, Vec2::new(-50.0, 0.0));
        reflect(&mut attack, None, 30);
        let mut target = unit(1, Side::Enemy);

        let staggered = resolve_hit(&mut attack, &mut target, Duration::from_secs(2));

        assert!(staggered);
        assert!(attack.consumed);
        assert_eq!(target.health, 30);
        assert_eq!(target.staggered_for, Duration::from_secs(2));
    }

    #[test]
    fn friendly_units_are_never_hit() {
        let mut attack = enemy_attack(Vec2::ZERO, Vec2::new(-50.0, 0.0));
        let mut ally = unit(1, Side::Enemy);
        assert!(!resolve_hit(&mut attack, &mut ally, Duration::from_secs(1)));
        assert!(!attack.consumed);
        assert!(attack.hits.is_empty());
    }

    #[test]
    fn destroy_is_idempotent() {
        let mut attack = enemy_attack(Vec2::ZERO, Vec2::ZERO);
        attack.destroy();
        attack.destroy();
        assert!(attack.consumed);
    }

    #[test]
    fn sweep_regroups_reflected_attacks() {
        let mut groups = AttackGroups::default();
        let mut reflected = enemy_attack(Vec2::ZERO, Vec2::new(-50.0, 0.0));
        groups.push(reflected.clone());
        reflected.id = AttackId::new(2);
        reflected.consumed = true;
        groups.push(reflected);

        if let Some(attack) = groups.find_mut(AttackId::new(1)) {
            reflect(attack, None, 15);
        }
        let mut events = Vec::new();
        groups.sweep(&mut events);

        assert_eq!(groups.player.len(), 1);
        assert!(groups.enemy.is_empty());
        assert_eq!(
            events,
            vec![Event::AttackRemoved {
                attack: AttackId::new(2)
            }]
        );
    }
}
