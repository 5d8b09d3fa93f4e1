#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Game session facade driving the Lane Defence world.
//!
//! A [`Session`] owns the authoritative world together with the systems that
//! react to its events. Every entry point turns into a [`Command`], runs it
//! through the world, publishes the resulting events to subscribers and feeds
//! them to the wave system, whose follow-up commands are processed in turn
//! until the world goes quiet.

mod bus;

use std::{collections::VecDeque, time::Duration};

use lane_defence_core::{
    ActionKind, AttackId, BuildingKind, Command, ConfigTable, GridCoord, LaneId, OverlapTarget,
    UnitKind,
};
use lane_defence_system_waves::WaveSpawner;
use lane_defence_world::{self as world, World};

pub use bus::{EventBus, Subscriber, SubscriberId};

/// Single-player Lane Defence session.
#[derive(Debug)]
pub struct Session {
    world: World,
    waves: WaveSpawner,
    bus: EventBus,
}

impl Session {
    /// Creates a session parked in the main menu.
    #[must_use]
    pub fn new(config: ConfigTable) -> Self {
        let waves = WaveSpawner::new(config.waves().clone(), config.num_lanes());
        Self {
            world: World::new(config),
            waves,
            bus: EventBus::default(),
        }
    }

    /// Read-only access to the authoritative world for queries.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the world for test setups that bypass commands.
    #[cfg(test)]
    pub(crate) fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Registers an event subscriber.
    pub fn subscribe(&mut self, subscriber: Box<dyn Subscriber>) -> SubscriberId {
        self.bus.subscribe(subscriber)
    }

    /// Removes a previously registered subscriber.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> Option<Box<dyn Subscriber>> {
        self.bus.unsubscribe(id)
    }

    /// Leaves the main menu and begins play.
    pub fn start(&mut self) {
        self.submit(Command::StartGame);
    }

    /// Advances the simulation by one frame.
    pub fn update(&mut self, dt: Duration) {
        self.submit(Command::Tick { dt });
    }

    /// Requests construction of a building.
    pub fn build_at(&mut self, cell: GridCoord, kind: BuildingKind) {
        self.submit(Command::BuildAt { cell, kind });
    }

    /// Requests removal of a building.
    pub fn destroy_building(&mut self, cell: GridCoord) {
        self.submit(Command::DestroyBuilding { cell });
    }

    /// Purchases a unit for the lane's spawn queue.
    pub fn place_unit(&mut self, lane: LaneId, kind: UnitKind) {
        self.submit(Command::PlaceUnit { lane, kind });
    }

    /// Purchases and runs an action in the lane.
    pub fn run_action(&mut self, action: ActionKind, lane: LaneId) {
        self.submit(Command::RunAction { action, lane });
    }

    /// Forwards an overlap detected by the host's collision engine.
    pub fn report_overlap(&mut self, attack: AttackId, target: OverlapTarget) {
        self.submit(Command::ReportOverlap { attack, target });
    }

    /// Discards the current session and starts over.
    pub fn restart(&mut self) {
        self.submit(Command::Restart);
    }

    /// Switches between active and paused play.
    pub fn toggle_pause(&mut self) {
        self.submit(Command::TogglePause);
    }

    /// Executes a command and every follow-up command produced by the systems.
    pub fn submit(&mut self, command: Command) {
        let mut pending = VecDeque::from([command]);
        while let Some(command) = pending.pop_front() {
            let mut events = Vec::new();
            world::apply(&mut self.world, command, &mut events);
            if events.is_empty() {
                continue;
            }

            self.bus.publish(&events);

            let mut follow_up = Vec::new();
            self.waves.handle(&events, &mut follow_up);
            if !follow_up.is_empty() {
                tracing::trace!(commands = follow_up.len(), "queued system commands");
            }
            pending.extend(follow_up);
        }
    }
}
