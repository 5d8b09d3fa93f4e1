#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Lane Defence.
//!
//! The [`World`] owns the base grid, the resource ledger, every lane with its
//! units and spawn queues, attacks in flight, both base health pools and the
//! wave clock. It only changes through [`apply`], which executes a single
//! [`Command`] and appends the resulting [`Event`] values to the caller's
//! buffer. Commands whose preconditions fail leave the world untouched and
//! emit nothing.

mod combat;
mod economy;
mod lanes;
#[cfg(any(test, feature = "scaffolding"))]
pub mod scaffolding;
mod spawning;

use std::time::Duration;

use lane_defence_core::{
    AttackId, BuildingKind, Command, ConfigTable, Event, GameOutcome, GridCoord, LaneId,
    PlayState, PresentationHandle, Production, RemovalReason, ResourceSet, UnitId, UnitKind,
};
use thiserror::Error;

pub use economy::BaseGrid;

use combat::{AttackGroups, ParryWindow};
use economy::EconomyClock;
use lanes::Lane;
use spawning::{SpawnDelays, WaveClock};

/// Represents the authoritative Lane Defence session state.
#[derive(Debug)]
pub struct World {
    config: ConfigTable,
    play_state: PlayState,
    base: BaseGrid,
    resources: ResourceSet,
    growth: Production,
    lanes: Vec<Lane>,
    attacks: AttackGroups,
    parry_windows: Vec<ParryWindow>,
    base_health: i32,
    enemy_base_health: i32,
    wave_clock: WaveClock,
    spawn_delays: SpawnDelays,
    unlocked: [bool; UnitKind::COUNT],
    ids: IdAllocator,
    economy_clock: EconomyClock,
    elapsed: Duration,
}

impl World {
    /// Creates a world parked in the main menu using the provided balance table.
    #[must_use]
    pub fn new(config: ConfigTable) -> Self {
        let mut world = Self {
            config,
            play_state: PlayState::MainMenu,
            base: BaseGrid::new(1),
            resources: ResourceSet::ZERO,
            growth: Production::default(),
            lanes: Vec::new(),
            attacks: AttackGroups::default(),
            parry_windows: Vec::new(),
            base_health: 0,
            enemy_base_health: 0,
            wave_clock: WaveClock::new(Duration::ZERO),
            spawn_delays: SpawnDelays::default(),
            unlocked: [false; UnitKind::COUNT],
            ids: IdAllocator::default(),
            economy_clock: EconomyClock::default(),
            elapsed: Duration::ZERO,
        };
        world.reset_state();
        world
    }

    fn reset_state(&mut self) {
        self.base = BaseGrid::new(self.config.base_width());
        self.resources = ResourceSet::ZERO;
        self.lanes = (0..self.config.num_lanes()).map(|_| Lane::default()).collect();
        self.attacks = AttackGroups::default();
        self.parry_windows.clear();
        self.base_health = self.config.base_max_health();
        self.enemy_base_health = self.config.enemy_base_max_health();
        self.wave_clock = WaveClock::new(self.config.waves().interval);
        self.spawn_delays = SpawnDelays::default();
        for kind in UnitKind::ALL {
            self.unlocked[kind.index()] = self.config.unit(kind).unlocked_by.is_none();
        }
        self.economy_clock = EconomyClock::default();
        self.elapsed = Duration::ZERO;
        self.recompute_growth();
    }

    fn begin_session(&mut self, out_events: &mut Vec<Event>) {
        self.reset_state();
        self.play_state = PlayState::Active;
        out_events.push(Event::PlayStateChanged {
            state: self.play_state,
        });
        out_events.push(Event::ResourcesUpdated {
            resources: self.resources,
        });
        out_events.push(Event::BaseDamaged {
            remaining: self.base_health,
        });
        out_events.push(Event::EnemyBaseDamaged {
            remaining: self.enemy_base_health,
        });
        out_events.push(Event::WaveCountdownUpdated {
            seconds_remaining: self.wave_clock.seconds_remaining(),
        });
        out_events.push(Event::BuildingBuilt {
            kind: BuildingKind::Townhall,
        });
        for kind in UnitKind::ALL {
            if self.unlocked[kind.index()] {
                out_events.push(Event::UnitUnlocked { kind });
            }
        }
    }

    fn start(&mut self, out_events: &mut Vec<Event>) -> Result<(), Rejection> {
        if self.play_state != PlayState::MainMenu {
            return Err(Rejection::AlreadyStarted);
        }
        tracing::info!(lanes = self.lanes.len(), "session started");
        self.begin_session(out_events);
        Ok(())
    }

    fn restart(&mut self, out_events: &mut Vec<Event>) -> Result<(), Rejection> {
        if self.play_state == PlayState::MainMenu {
            return Err(Rejection::NotStarted);
        }

        for lane in &mut self.lanes {
            for unit in lane.drain_units() {
                out_events.push(Event::UnitRemoved {
                    unit: unit.id,
                    handle: unit.handle,
                    reason: RemovalReason::Cleared,
                });
            }
        }
        for attack in self.attacks.drain() {
            out_events.push(Event::AttackRemoved { attack: attack.id });
        }

        tracing::info!(previous = ?self.play_state, "session restarted");
        out_events.push(Event::GameRestarted);
        self.begin_session(out_events);
        Ok(())
    }

    fn toggle_pause(&mut self, out_events: &mut Vec<Event>) -> Result<(), Rejection> {
        self.play_state = match self.play_state {
            PlayState::Active => PlayState::Paused,
            PlayState::Paused => PlayState::Active,
            other => return Err(Rejection::NotActive(other)),
        };
        out_events.push(Event::PlayStateChanged {
            state: self.play_state,
        });
        Ok(())
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if self.play_state != PlayState::Active {
            return;
        }

        self.elapsed = self.elapsed.saturating_add(dt);
        out_events.push(Event::TimeAdvanced { dt });

        if self.economy_clock.poll(self.elapsed) {
            self.run_economy_tick(out_events);
        }

        self.spawn_delays.elapse(dt);
        self.drain_spawn_queues(out_events);
        self.advance_wave_clock(dt, out_events);

        self.advance_lanes(dt, out_events);
        if self.check_for_end(out_events) {
            return;
        }

        self.trigger_unit_attacks(dt, out_events);
        self.fly_attacks(dt, out_events);
        self.decay_parry_windows(dt);
        self.reap_dead_units(out_events);
    }

    /// Transitions to `Ended` once a base has fallen; a tie counts as a defeat.
    fn check_for_end(&mut self, out_events: &mut Vec<Event>) -> bool {
        let outcome = if self.base_health <= 0 {
            GameOutcome::Defeat
        } else if self.enemy_base_health <= 0 {
            GameOutcome::Victory
        } else {
            return false;
        };

        self.play_state = PlayState::Ended(outcome);
        tracing::info!(?outcome, elapsed = ?self.elapsed, "session ended");
        out_events.push(Event::PlayStateChanged {
            state: self.play_state,
        });
        out_events.push(Event::GameEnded {
            outcome,
            elapsed: self.elapsed,
        });
        true
    }

    fn ensure_active(&self) -> Result<(), Rejection> {
        match self.play_state {
            PlayState::Active => Ok(()),
            other => Err(Rejection::NotActive(other)),
        }
    }

    fn lane_index(&self, lane: LaneId) -> Result<usize, Rejection> {
        usize::try_from(lane.get())
            .ok()
            .filter(|index| *index < self.lanes.len())
            .ok_or(Rejection::InvalidLane(lane))
    }

    /// Charges the ledger after confirming the costs are affordable.
    fn charge(&mut self, costs: &ResourceSet) -> Result<(), Rejection> {
        if !self.resources.can_afford(costs) {
            return Err(Rejection::InsufficientFunds {
                needed: *costs,
                held: self.resources,
            });
        }
        self.resources.charge_costs(costs);
        Ok(())
    }

    fn player_damage(&self) -> i32 {
        self.config
            .player_damage()
            .saturating_add(self.growth.buffs.damage)
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    let outcome = match command {
        Command::StartGame => world.start(out_events),
        Command::Tick { dt } => {
            world.tick(dt, out_events);
            Ok(())
        }
        Command::BuildAt { cell, kind } => world.build_at(cell, kind, out_events),
        Command::DestroyBuilding { cell } => world.destroy_building(cell, out_events),
        Command::PlaceUnit { lane, kind } => world.place_unit(lane, kind, out_events),
        Command::QueueEnemyUnit { lane, kind } => world.queue_enemy_unit(lane, kind),
        Command::RunAction { action, lane } => world.run_action(action, lane, out_events),
        Command::ReportOverlap { attack, target } => {
            world.report_overlap(attack, target, out_events)
        }
        Command::Restart => world.restart(out_events),
        Command::TogglePause => world.toggle_pause(out_events),
    };

    if let Err(rejection) = outcome {
        tracing::debug!(%rejection, "command rejected");
    }
}

/// Reasons a command leaves the world untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
enum Rejection {
    #[error("session is not active ({0:?})")]
    NotActive(PlayState),
    #[error("session already left the main menu")]
    AlreadyStarted,
    #[error("session has not started")]
    NotStarted,
    #[error("cell {0:?} lies outside the base grid")]
    OutOfBounds(GridCoord),
    #[error("cell {0:?} is occupied")]
    Occupied(GridCoord),
    #[error("cell {0:?} holds no removable building")]
    NothingToDestroy(GridCoord),
    #[error("{0:?} cannot be constructed")]
    NotConstructible(BuildingKind),
    #[error("need {needed:?} but hold {held:?}")]
    InsufficientFunds {
        needed: ResourceSet,
        held: ResourceSet,
    },
    #[error("lane {0:?} does not exist")]
    InvalidLane(LaneId),
    #[error("{0:?} is locked")]
    Locked(UnitKind),
    #[error("{kind:?} is cooling down for another {remaining:?}")]
    CoolingDown { kind: UnitKind, remaining: Duration },
    #[error("attack {0:?} is not in flight")]
    UnknownAttack(AttackId),
    #[error("unit {0:?} cannot be hit by attack {1:?}")]
    InvalidTarget(UnitId, AttackId),
    #[error("no parry window is open in lane {0:?}")]
    NoParryWindow(LaneId),
    #[error("attack {0:?} cannot be parried")]
    NotParryable(AttackId),
}

/// Session-scoped identifier source; survives restarts so handles never repeat.
#[derive(Debug, Default)]
struct IdAllocator {
    next_unit: u32,
    next_attack: u32,
    next_handle: u64,
}

impl IdAllocator {
    fn unit(&mut self) -> UnitId {
        let id = UnitId::new(self.next_unit);
        self.next_unit = self.next_unit.wrapping_add(1);
        id
    }

    fn attack(&mut self) -> AttackId {
        let id = AttackId::new(self.next_attack);
        self.next_attack = self.next_attack.wrapping_add(1);
        id
    }

    fn handle(&mut self) -> PresentationHandle {
        let handle = PresentationHandle::new(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        handle
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use glam::Vec2;
    use lane_defence_core::{
        AttackId, Buffs, ConfigTable, LaneId, PlayState, PresentationHandle, Production,
        ResourceSet, Side, UnitId, UnitKind,
    };

    use super::{combat::Attack, lanes::Unit, BaseGrid, World};

    /// Current lifecycle state of the session.
    #[must_use]
    pub fn play_state(world: &World) -> PlayState {
        world.play_state
    }

    /// Balance table the world was configured with.
    #[must_use]
    pub fn config(world: &World) -> &ConfigTable {
        &world.config
    }

    /// Resources currently held by the player.
    #[must_use]
    pub fn resources(world: &World) -> ResourceSet {
        world.resources
    }

    /// Aggregate per-tick production and buffs of the base grid.
    #[must_use]
    pub fn total_growth(world: &World) -> Production {
        world.growth
    }

    /// Buffs newly created player units receive.
    #[must_use]
    pub fn buffs(world: &World) -> Buffs {
        world.growth.buffs
    }

    /// Damage currently assigned to player-sourced attacks.
    #[must_use]
    pub fn player_damage(world: &World) -> i32 {
        world.player_damage()
    }

    /// Provides read-only access to the base grid.
    #[must_use]
    pub fn base_grid(world: &World) -> &BaseGrid {
        &world.base
    }

    /// Health remaining on the player's base.
    #[must_use]
    pub fn base_health(world: &World) -> i32 {
        world.base_health
    }

    /// Health remaining on the enemy base.
    #[must_use]
    pub fn enemy_base_health(world: &World) -> i32 {
        world.enemy_base_health
    }

    /// Time left before the next enemy wave.
    #[must_use]
    pub fn wave_countdown(world: &World) -> Duration {
        world.wave_clock.remaining()
    }

    /// Seconds left before the next enemy wave.
    #[must_use]
    pub fn seconds_until_wave(world: &World) -> f32 {
        world.wave_clock.remaining().as_secs_f32()
    }

    /// Number of waves started so far.
    #[must_use]
    pub fn waves_started(world: &World) -> u32 {
        world.wave_clock.wave()
    }

    /// Cooldown left before another unit of the kind may leave a queue.
    #[must_use]
    pub fn spawn_delay_remaining(world: &World, kind: UnitKind) -> Duration {
        world.spawn_delays.remaining(kind)
    }

    /// Reports whether the player may place units of the kind.
    #[must_use]
    pub fn is_unlocked(world: &World, kind: UnitKind) -> bool {
        world.unlocked[kind.index()]
    }

    /// Active (unpaused) time elapsed in the session.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.elapsed
    }

    /// Number of lanes in the playfield.
    #[must_use]
    pub fn lane_count(world: &World) -> usize {
        world.lanes.len()
    }

    /// Remaining duration of the parry window open in the lane, if any.
    #[must_use]
    pub fn parry_window(world: &World, lane: LaneId) -> Option<Duration> {
        let index = usize::try_from(lane.get()).ok()?;
        world
            .parry_windows
            .iter()
            .find(|window| window.lane == index)
            .map(|window| window.remaining)
    }

    /// Captures a read-only view of a lane's units and queues.
    #[must_use]
    pub fn lane_view(world: &World, lane: LaneId) -> Option<LaneView> {
        let index = usize::try_from(lane.get()).ok()?;
        let state = world.lanes.get(index)?;
        Some(LaneView {
            player_units: snapshots(lane, state.units(Side::Player)),
            enemy_units: snapshots(lane, state.units(Side::Enemy)),
            player_queue: state.queue(Side::Player).iter().copied().collect(),
            enemy_queue: state.queue(Side::Enemy).iter().copied().collect(),
        })
    }

    /// Locates a unit by identifier across every lane.
    #[must_use]
    pub fn find_unit(world: &World, unit: UnitId) -> Option<UnitSnapshot> {
        world.lanes.iter().enumerate().find_map(|(index, lane)| {
            let lane_id = LaneId::new(u32::try_from(index).ok()?);
            lane.find(unit).map(|state| UnitSnapshot::capture(lane_id, state))
        })
    }

    /// Captures every attack currently in flight, player group first.
    #[must_use]
    pub fn attack_view(world: &World) -> Vec<AttackSnapshot> {
        world
            .attacks
            .iter()
            .filter(|attack| !attack.consumed)
            .map(AttackSnapshot::capture)
            .collect()
    }

    /// Locates an attack in flight by identifier.
    #[must_use]
    pub fn find_attack(world: &World, attack: AttackId) -> Option<AttackSnapshot> {
        world
            .attacks
            .iter()
            .find(|candidate| candidate.id == attack && !candidate.consumed)
            .map(AttackSnapshot::capture)
    }

    fn snapshots(lane: LaneId, units: &[Unit]) -> Vec<UnitSnapshot> {
        units
            .iter()
            .map(|unit| UnitSnapshot::capture(lane, unit))
            .collect()
    }

    /// Read-only snapshot of a lane.
    #[derive(Clone, Debug, PartialEq)]
    pub struct LaneView {
        /// Player units in blocking order.
        pub player_units: Vec<UnitSnapshot>,
        /// Enemy units in blocking order.
        pub enemy_units: Vec<UnitSnapshot>,
        /// Player units awaiting placement, head first.
        pub player_queue: Vec<UnitKind>,
        /// Enemy units awaiting placement, head first.
        pub enemy_queue: Vec<UnitKind>,
    }

    /// Immutable representation of a single unit's state used for queries.
    #[derive(Clone, Debug, PartialEq)]
    pub struct UnitSnapshot {
        /// Unique identifier assigned to the unit.
        pub id: UnitId,
        /// Type of the unit.
        pub kind: UnitKind,
        /// Side the unit fights for.
        pub side: Side,
        /// Lane the unit occupies.
        pub lane: LaneId,
        /// Current health; may be zero or below until the unit is reaped.
        pub health: i32,
        /// Health at spawn, including buffs.
        pub max_health: i32,
        /// Damage per attack, including buffs.
        pub damage: i32,
        /// Buffs applied at spawn.
        pub buffs: Buffs,
        /// Accumulated stagger.
        pub stagger: i32,
        /// Whether the unit is currently staggered.
        pub staggered: bool,
        /// Time since the unit last attacked.
        pub time_since_last_attack: Duration,
        /// Lane coordinate of the unit's centre.
        pub position: f32,
        /// Edge facing the opposing base.
        pub leading_edge: f32,
        /// Edge facing the friendly base.
        pub trailing_edge: f32,
        /// Opaque handle presentation attached to the unit.
        pub handle: PresentationHandle,
    }

    impl UnitSnapshot {
        fn capture(lane: LaneId, unit: &Unit) -> Self {
            Self {
                id: unit.id,
                kind: unit.kind,
                side: unit.side,
                lane,
                health: unit.health,
                max_health: unit.max_health,
                damage: unit.damage,
                buffs: unit.buffs,
                stagger: unit.stagger,
                staggered: unit.is_staggered(),
                time_since_last_attack: unit.time_since_last_attack,
                position: unit.position,
                leading_edge: unit.leading_edge(),
                trailing_edge: unit.trailing_edge(),
                handle: unit.handle,
            }
        }
    }

    /// Immutable representation of an attack in flight.
    #[derive(Clone, Debug, PartialEq)]
    pub struct AttackSnapshot {
        /// Identifier allocated to the attack.
        pub id: AttackId,
        /// Side the attack currently fights for.
        pub side: Side,
        /// Damage or stagger dealt on hit.
        pub damage: i32,
        /// Unit that launched the attack, if any.
        pub owner: Option<UnitId>,
        /// Units the attack already hit, in ascending id order.
        pub hits: Vec<UnitId>,
        /// Whether the attack can still be parried.
        pub parryable: bool,
        /// Whether the attack was reflected by a parry.
        pub reflect: bool,
        /// Playfield position.
        pub position: Vec2,
        /// Velocity in playfield units per second.
        pub velocity: Vec2,
    }

    impl AttackSnapshot {
        fn capture(attack: &Attack) -> Self {
            Self {
                id: attack.id,
                side: attack.side,
                damage: attack.damage,
                owner: attack.owner,
                hits: attack.hits.iter().copied().collect(),
                parryable: attack.parryable,
                reflect: attack.reflect,
                position: attack.position,
                velocity: attack.velocity,
            }
        }
    }
}
