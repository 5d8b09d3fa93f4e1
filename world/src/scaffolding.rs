//! Direct state manipulation for tests that need precise battlefield setups.
//!
//! Enabled by the `scaffolding` feature; never used by the simulation itself.

use std::collections::BTreeSet;

use glam::Vec2;
use lane_defence_core::{AttackId, LaneId, ResourceSet, Side, UnitId, UnitKind};

use crate::{combat::Attack, lanes::Unit, World};

/// Parameters of an attack placed directly into flight.
#[derive(Clone, Copy, Debug)]
pub struct AttackSpec {
    /// Lane the attack travels in.
    pub lane: LaneId,
    /// Side the attack fights for.
    pub side: Side,
    /// Damage dealt on hit.
    pub damage: i32,
    /// Unit credited as the attack's owner.
    pub owner: Option<UnitId>,
    /// Whether a parry window may reflect the attack.
    pub parryable: bool,
    /// Starting lane coordinate.
    pub x: f32,
    /// Signed speed along the lane.
    pub velocity_x: f32,
}

/// Places a fresh unit of the kind with its centre at `position`, bypassing queues.
///
/// Player units receive the current grid buffs. Returns `None` when the lane
/// does not exist.
pub fn insert_unit(
    world: &mut World,
    lane: LaneId,
    side: Side,
    kind: UnitKind,
    position: f32,
) -> Option<UnitId> {
    let index = world.lane_index(lane).ok()?;
    let buffs = match side {
        Side::Player => world.growth.buffs,
        Side::Enemy => Default::default(),
    };
    let mut unit = Unit::spawn(
        world.ids.unit(),
        world.ids.handle(),
        kind,
        side,
        world.config.unit(kind),
        buffs,
        world.config.lane_length(),
    );
    unit.position = position;
    let id = unit.id;
    world.lanes[index].units_mut(side).push(unit);
    Some(id)
}

/// Launches an attack without an owning unit trigger.
pub fn launch_attack(world: &mut World, spec: AttackSpec) -> Option<AttackId> {
    let index = world.lane_index(spec.lane).ok()?;
    let y = world.config.lane_spacing() * spec.lane.get() as f32;
    let id = world.ids.attack();
    world.attacks.push(Attack {
        id,
        side: spec.side,
        lane: index,
        damage: spec.damage,
        owner: spec.owner,
        hits: BTreeSet::new(),
        parryable: spec.parryable,
        reflect: false,
        position: Vec2::new(spec.x, y),
        velocity: Vec2::new(spec.velocity_x, 0.0),
        reach: f32::INFINITY,
        consumed: false,
    });
    Some(id)
}

/// Overwrites the player's ledger.
pub fn set_resources(world: &mut World, resources: ResourceSet) {
    world.resources = resources;
}

