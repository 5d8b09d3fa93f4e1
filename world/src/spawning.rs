//! Spawn queues, per-kind cooldowns and the wave clock.

use std::time::Duration;

use lane_defence_core::{Buffs, Event, LaneId, Side, UnitKind};

use crate::{
    lanes::{lane_id, Unit},
    Rejection, World,
};

/// Cooldown left per unit kind before another unit of that kind may spawn.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct SpawnDelays {
    remaining: [Duration; UnitKind::COUNT],
}

impl SpawnDelays {
    pub(crate) fn remaining(&self, kind: UnitKind) -> Duration {
        self.remaining[kind.index()]
    }

    /// Counts every cooldown down, floored at zero.
    pub(crate) fn elapse(&mut self, dt: Duration) {
        for remaining in &mut self.remaining {
            *remaining = remaining.saturating_sub(dt);
        }
    }

    fn reset(&mut self, kind: UnitKind, delay: Duration) {
        self.remaining[kind.index()] = delay;
    }
}

/// Countdown until the next enemy wave.
#[derive(Clone, Copy, Debug)]
pub(crate) struct WaveClock {
    remaining: Duration,
    interval: Duration,
    wave: u32,
}

/// Notifications produced by advancing the wave clock.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct WaveProgress {
    pub(crate) started: Option<u32>,
    /// Whole-second values crossed during the step, in order.
    pub(crate) countdown: Vec<u32>,
}

impl WaveClock {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            remaining: interval,
            interval,
            wave: 0,
        }
    }

    pub(crate) fn remaining(&self) -> Duration {
        self.remaining
    }

    pub(crate) fn wave(&self) -> u32 {
        self.wave
    }

    /// Whole seconds left, rounded up.
    pub(crate) fn seconds_remaining(&self) -> u32 {
        let whole = self.remaining.as_secs();
        let rounded = if self.remaining.subsec_nanos() > 0 {
            whole.saturating_add(1)
        } else {
            whole
        };
        u32::try_from(rounded).unwrap_or(u32::MAX)
    }

    /// Counts down by `dt`, reporting every whole second crossed.
    ///
    /// Reaching zero starts the next wave and reports the reset countdown.
    pub(crate) fn advance(&mut self, dt: Duration) -> WaveProgress {
        let before = self.seconds_remaining();
        self.remaining = self.remaining.saturating_sub(dt);

        if self.remaining.is_zero() {
            let mut countdown: Vec<u32> = (1..before).rev().collect();
            self.wave = self.wave.saturating_add(1);
            self.remaining = self.interval;
            countdown.push(self.seconds_remaining());
            return WaveProgress {
                started: Some(self.wave),
                countdown,
            };
        }

        let after = self.seconds_remaining();
        WaveProgress {
            started: None,
            countdown: (after..before).rev().collect(),
        }
    }
}

impl World {
    pub(crate) fn advance_wave_clock(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let progress = self.wave_clock.advance(dt);
        let mut crossed = progress.countdown;
        let reset = progress.started.and_then(|_| crossed.pop());
        for seconds_remaining in crossed {
            out_events.push(Event::WaveCountdownUpdated { seconds_remaining });
        }
        if let Some(wave) = progress.started {
            tracing::info!(wave, "wave started");
            out_events.push(Event::WaveStarted { wave });
        }
        if let Some(seconds_remaining) = reset {
            out_events.push(Event::WaveCountdownUpdated { seconds_remaining });
        }
    }

    /// Moves at most one queued unit per side from every lane onto the field.
    ///
    /// A queue head waits while its base-edge spawn slot is still occupied.
    pub(crate) fn drain_spawn_queues(&mut self, out_events: &mut Vec<Event>) {
        let lane_length = self.config.lane_length();
        for index in 0..self.lanes.len() {
            let head = self.lanes[index].queue(Side::Player).front().copied();
            if let Some(kind) = head {
                let width = self.config.unit(kind).width;
                if self.spawn_delays.remaining(kind).is_zero()
                    && self.lanes[index].spawn_slot_clear(Side::Player, width, lane_length)
                {
                    let _ = self.lanes[index].queue_mut(Side::Player).pop_front();
                    self.spawn_delays.reset(kind, self.config.unit(kind).spawn_delay);
                    self.spawn_unit(index, Side::Player, kind, out_events);
                }
            }

            let head = self.lanes[index].queue(Side::Enemy).front().copied();
            if let Some(kind) = head {
                let width = self.config.unit(kind).width;
                if self.lanes[index].spawn_slot_clear(Side::Enemy, width, lane_length) {
                    let _ = self.lanes[index].queue_mut(Side::Enemy).pop_front();
                    self.spawn_unit(index, Side::Enemy, kind, out_events);
                }
            }
        }
    }

    fn spawn_unit(
        &mut self,
        index: usize,
        side: Side,
        kind: UnitKind,
        out_events: &mut Vec<Event>,
    ) {
        let buffs = match side {
            Side::Player => self.growth.buffs,
            Side::Enemy => Buffs::default(),
        };
        let unit = Unit::spawn(
            self.ids.unit(),
            self.ids.handle(),
            kind,
            side,
            self.config.unit(kind),
            buffs,
            self.config.lane_length(),
        );
        let lane = lane_id(index);
        tracing::debug!(unit = ?unit.id, ?side, ?kind, ?lane, "unit spawned");
        out_events.push(Event::UnitSpawned {
            unit: unit.id,
            side,
            lane,
            kind,
            handle: unit.handle,
        });
        self.lanes[index].units_mut(side).push(unit);
    }

    pub(crate) fn place_unit(
        &mut self,
        lane: LaneId,
        kind: UnitKind,
        out_events: &mut Vec<Event>,
    ) -> Result<(), Rejection> {
        self.ensure_active()?;
        let index = self.lane_index(lane)?;
        if !self.unlocked[kind.index()] {
            return Err(Rejection::Locked(kind));
        }
        let remaining = self.spawn_delays.remaining(kind);
        if !remaining.is_zero() {
            return Err(Rejection::CoolingDown { kind, remaining });
        }
        let cost = self.config.unit(kind).cost;
        self.charge(&cost)?;

        self.lanes[index].queue_mut(Side::Player).push_back(kind);
        out_events.push(Event::ResourcesUpdated {
            resources: self.resources,
        });
        out_events.push(Event::UnitBuilt { kind });
        Ok(())
    }

    pub(crate) fn queue_enemy_unit(
        &mut self,
        lane: LaneId,
        kind: UnitKind,
    ) -> Result<(), Rejection> {
        self.ensure_active()?;
        let index = self.lane_index(lane)?;
        self.lanes[index].queue_mut(Side::Enemy).push_back(kind);
        Ok(())
    }
}
