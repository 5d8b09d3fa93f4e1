//! Per-lane unit sequences, movement and base arrival.

use std::{collections::VecDeque, time::Duration};

use lane_defence_core::{
    Buffs, Event, LaneId, PresentationHandle, RemovalReason, Side, UnitId, UnitKind, UnitStats,
};

use crate::World;

/// Simulated unit owned by exactly one lane.
#[derive(Clone, Debug)]
pub(crate) struct Unit {
    pub(crate) id: UnitId,
    pub(crate) kind: UnitKind,
    pub(crate) side: Side,
    pub(crate) health: i32,
    pub(crate) max_health: i32,
    pub(crate) damage: i32,
    pub(crate) buffs: Buffs,
    pub(crate) speed: f32,
    pub(crate) width: f32,
    pub(crate) stagger: i32,
    pub(crate) stagger_threshold: i32,
    pub(crate) staggered_for: Duration,
    pub(crate) time_since_last_attack: Duration,
    /// Lane coordinate of the body centre.
    pub(crate) position: f32,
    /// Displacement per second observed over the last frame.
    pub(crate) velocity: f32,
    pub(crate) handle: PresentationHandle,
}

impl Unit {
    /// Creates a unit standing just inside its own base edge.
    ///
    /// Buffs are folded into health and damage once; later grid changes never
    /// touch existing units.
    pub(crate) fn spawn(
        id: UnitId,
        handle: PresentationHandle,
        kind: UnitKind,
        side: Side,
        stats: &UnitStats,
        buffs: Buffs,
        lane_length: f32,
    ) -> Self {
        let half = stats.width / 2.0;
        let position = match side {
            Side::Player => half,
            Side::Enemy => lane_length - half,
        };
        let max_health = stats.max_health.saturating_add(buffs.health);
        Self {
            id,
            kind,
            side,
            health: max_health,
            max_health,
            damage: stats.damage.saturating_add(buffs.damage),
            buffs,
            speed: stats.speed,
            width: stats.width,
            stagger: 0,
            stagger_threshold: stats.stagger_threshold,
            staggered_for: Duration::ZERO,
            time_since_last_attack: stats.attack_interval,
            position,
            velocity: 0.0,
            handle,
        }
    }

    /// Edge facing the opposing base.
    pub(crate) fn leading_edge(&self) -> f32 {
        self.position + self.side.direction() * self.width / 2.0
    }

    /// Edge facing the friendly base.
    pub(crate) fn trailing_edge(&self) -> f32 {
        self.position - self.side.direction() * self.width / 2.0
    }

    pub(crate) fn is_staggered(&self) -> bool {
        !self.staggered_for.is_zero()
    }

    /// Lowest and highest lane coordinate covered by the body.
    pub(crate) fn extent(&self) -> (f32, f32) {
        let half = self.width / 2.0;
        (self.position - half, self.position + half)
    }

    /// Applies damage, never letting health drop below zero.
    pub(crate) fn take_damage(&mut self, damage: i32) {
        self.health = self.health.saturating_sub(damage).max(0);
    }

    /// Adds to the stagger meter; returns `true` when the unit becomes staggered.
    pub(crate) fn add_stagger(&mut self, amount: i32, duration: Duration) -> bool {
        self.stagger = self.stagger.saturating_add(amount);
        if self.stagger < self.stagger_threshold {
            return false;
        }
        self.stagger = 0;
        self.staggered_for = duration;
        true
    }
}

/// Units and spawn queues of both sides in one lane.
///
/// Insertion order of the unit sequences is blocking precedence: a unit may
/// never overtake the one inserted before it.
#[derive(Debug, Default)]
pub(crate) struct Lane {
    player_units: Vec<Unit>,
    enemy_units: Vec<Unit>,
    player_queue: VecDeque<UnitKind>,
    enemy_queue: VecDeque<UnitKind>,
}

impl Lane {
    pub(crate) fn units(&self, side: Side) -> &[Unit] {
        match side {
            Side::Player => &self.player_units,
            Side::Enemy => &self.enemy_units,
        }
    }

    pub(crate) fn units_mut(&mut self, side: Side) -> &mut Vec<Unit> {
        match side {
            Side::Player => &mut self.player_units,
            Side::Enemy => &mut self.enemy_units,
        }
    }

    pub(crate) fn queue(&self, side: Side) -> &VecDeque<UnitKind> {
        match side {
            Side::Player => &self.player_queue,
            Side::Enemy => &self.enemy_queue,
        }
    }

    pub(crate) fn queue_mut(&mut self, side: Side) -> &mut VecDeque<UnitKind> {
        match side {
            Side::Player => &mut self.player_queue,
            Side::Enemy => &mut self.enemy_queue,
        }
    }

    /// Leading edge of the side's front unit, if the side has any units.
    pub(crate) fn front_edge(&self, side: Side) -> Option<f32> {
        self.units(side).first().map(Unit::leading_edge)
    }

    /// Reports whether a body of `width` fits against the side's base edge
    /// without overlapping any unit already in the lane.
    pub(crate) fn spawn_slot_clear(&self, side: Side, width: f32, lane_length: f32) -> bool {
        let (low, high) = match side {
            Side::Player => (0.0, width),
            Side::Enemy => (lane_length - width, lane_length),
        };
        self.player_units
            .iter()
            .chain(self.enemy_units.iter())
            .all(|unit| {
                let (start, end) = unit.extent();
                end <= low || start >= high
            })
    }

    pub(crate) fn find(&self, id: UnitId) -> Option<&Unit> {
        self.player_units
            .iter()
            .chain(self.enemy_units.iter())
            .find(|unit| unit.id == id)
    }

    pub(crate) fn find_mut(&mut self, side: Side, id: UnitId) -> Option<&mut Unit> {
        self.units_mut(side).iter_mut().find(|unit| unit.id == id)
    }

    /// Removes every unit and queued entry, returning the removed units.
    pub(crate) fn drain_units(&mut self) -> Vec<Unit> {
        self.player_queue.clear();
        self.enemy_queue.clear();
        let mut drained = std::mem::take(&mut self.player_units);
        drained.append(&mut self.enemy_units);
        drained
    }
}

/// Moves a side's units toward the opposing base in sequence order.
///
/// The first unit is held at `opposing_front`, every other unit at the
/// trailing edge of the unit processed before it. A held unit never moves
/// backwards. Units whose leading edge crosses the opposing base edge are
/// removed after the scan and returned in descending index order.
pub(crate) fn advance(
    units: &mut Vec<Unit>,
    dt: Duration,
    opposing_front: Option<f32>,
    lane_length: f32,
) -> Vec<Unit> {
    let dt_secs = dt.as_secs_f32();
    let mut limit = opposing_front;
    let mut arrived = Vec::new();

    for (index, unit) in units.iter_mut().enumerate() {
        unit.staggered_for = unit.staggered_for.saturating_sub(dt);
        let direction = unit.side.direction();
        let step = if unit.is_staggered() {
            0.0
        } else {
            unit.speed * dt_secs
        };

        let current = unit.leading_edge();
        let mut lead = current + direction * step;
        if let Some(limit) = limit {
            lead = match unit.side {
                Side::Player => lead.min(limit).max(current),
                Side::Enemy => lead.max(limit).min(current),
            };
        }

        let previous = unit.position;
        unit.position = lead - direction * unit.width / 2.0;
        unit.velocity = if dt_secs > 0.0 {
            (unit.position - previous) / dt_secs
        } else {
            0.0
        };

        let crossed = match unit.side {
            Side::Player => lead >= lane_length,
            Side::Enemy => lead <= 0.0,
        };
        if crossed {
            arrived.push(index);
            limit = None;
        } else {
            limit = Some(unit.trailing_edge());
        }
    }

    arrived
        .into_iter()
        .rev()
        .map(|index| units.remove(index))
        .collect()
}

pub(crate) fn lane_id(index: usize) -> LaneId {
    LaneId::new(u32::try_from(index).unwrap_or(u32::MAX))
}

impl World {
    /// Advances every lane, player side first, and settles base arrivals.
    pub(crate) fn advance_lanes(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let lane_length = self.config.lane_length();
        for index in 0..self.lanes.len() {
            let lane = &mut self.lanes[index];
            let enemy_front = lane.front_edge(Side::Enemy);
            let player_arrivals = advance(&mut lane.player_units, dt, enemy_front, lane_length);
            let player_front = lane.front_edge(Side::Player);
            let enemy_arrivals = advance(&mut lane.enemy_units, dt, player_front, lane_length);

            for unit in player_arrivals.into_iter().chain(enemy_arrivals) {
                self.settle_arrival(&unit, out_events);
            }
        }
    }

    fn settle_arrival(&mut self, unit: &Unit, out_events: &mut Vec<Event>) {
        out_events.push(Event::UnitRemoved {
            unit: unit.id,
            handle: unit.handle,
            reason: RemovalReason::ReachedBase,
        });
        match unit.side {
            Side::Player => {
                self.enemy_base_health =
                    self.enemy_base_health.saturating_sub(unit.damage).max(0);
                tracing::debug!(
                    unit = ?unit.id,
                    remaining = self.enemy_base_health,
                    "enemy base hit"
                );
                out_events.push(Event::EnemyBaseDamaged {
                    remaining: self.enemy_base_health,
                });
            }
            Side::Enemy => {
                self.base_health = self.base_health.saturating_sub(unit.damage).max(0);
                tracing::debug!(unit = ?unit.id, remaining = self.base_health, "base hit");
                out_events.push(Event::BaseDamaged {
                    remaining: self.base_health,
                });
            }
        }
    }

    /// Removes units whose health ran out during the frame.
    pub(crate) fn reap_dead_units(&mut self, out_events: &mut Vec<Event>) {
        for lane in &mut self.lanes {
            for side in [Side::Player, Side::Enemy] {
                lane.units_mut(side).retain(|unit| {
                    if unit.health > 0 {
                        return true;
                    }
                    out_events.push(Event::UnitRemoved {
                        unit: unit.id,
                        handle: unit.handle,
                        reason: RemovalReason::Killed,
                    });
                    false
                });
            }
        }
    }
}
