#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Lane Defence simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems and
//! presentation to react to. Balance data reaches the world exclusively through
//! the validated [`ConfigTable`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod config;

pub use config::{
    ActionStats, BuildingStats, ConfigError, ConfigTable, UnitStats, WaveComposition, WaveEntry,
    WaveSchedule, DEFAULT_CONFIG,
};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Leaves the main menu and begins a fresh session.
    StartGame,
    /// Advances the simulation clock by the provided frame time.
    Tick {
        /// Wall time that elapsed since the previous frame.
        dt: Duration,
    },
    /// Requests construction of a building on an empty base cell.
    BuildAt {
        /// Base grid cell receiving the building.
        cell: GridCoord,
        /// Type of building to construct.
        kind: BuildingKind,
    },
    /// Requests that the building occupying the cell be cleared.
    DestroyBuilding {
        /// Base grid cell holding the building.
        cell: GridCoord,
    },
    /// Purchases a player unit and appends it to the lane's spawn queue.
    PlaceUnit {
        /// Lane the unit will be deployed into.
        lane: LaneId,
        /// Type of unit to deploy.
        kind: UnitKind,
    },
    /// Appends an enemy unit to the lane's spawn queue.
    QueueEnemyUnit {
        /// Lane the enemy will be deployed into.
        lane: LaneId,
        /// Type of unit to deploy.
        kind: UnitKind,
    },
    /// Purchases and executes a player action in the given lane.
    RunAction {
        /// Action to perform.
        action: ActionKind,
        /// Lane targeted by the action.
        lane: LaneId,
    },
    /// Reports an overlap detected by the host's collision engine.
    ReportOverlap {
        /// Attack participating in the overlap.
        attack: AttackId,
        /// Hitbox the attack overlapped.
        target: OverlapTarget,
    },
    /// Discards the current session and starts a fresh one.
    Restart,
    /// Switches between the active and paused states.
    TogglePause,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the frame.
        dt: Duration,
    },
    /// Announces that the session entered a new lifecycle state.
    PlayStateChanged {
        /// State that became active.
        state: PlayState,
    },
    /// Reports the ledger after it changed.
    ResourcesUpdated {
        /// Resources currently held by the player.
        resources: ResourceSet,
    },
    /// Reports damage dealt to the player's base.
    BaseDamaged {
        /// Health remaining on the player's base.
        remaining: i32,
    },
    /// Reports damage dealt to the enemy base.
    EnemyBaseDamaged {
        /// Health remaining on the enemy base.
        remaining: i32,
    },
    /// Confirms that the session was reset to its initial state.
    GameRestarted,
    /// Announces the end of a session.
    GameEnded {
        /// Whether the player won or lost.
        outcome: GameOutcome,
        /// Active (unpaused) time the session lasted.
        elapsed: Duration,
    },
    /// Confirms that a building was placed on the base grid.
    BuildingBuilt {
        /// Type of building that was placed.
        kind: BuildingKind,
    },
    /// Confirms that a building was cleared from the base grid.
    BuildingDestroyed {
        /// Type of building that was removed.
        kind: BuildingKind,
    },
    /// Reports the whole seconds left before the next enemy wave.
    WaveCountdownUpdated {
        /// Seconds remaining, rounded up.
        seconds_remaining: u32,
    },
    /// Announces that an enemy wave is due.
    WaveStarted {
        /// One-based index of the wave.
        wave: u32,
    },
    /// Confirms that a player unit was purchased and queued.
    UnitBuilt {
        /// Type of unit that was queued.
        kind: UnitKind,
    },
    /// Announces that a unit type became available for placement.
    UnitUnlocked {
        /// Type of unit that was unlocked.
        kind: UnitKind,
    },
    /// Confirms that a queued unit entered its lane.
    UnitSpawned {
        /// Identifier allocated to the unit.
        unit: UnitId,
        /// Side the unit fights for.
        side: Side,
        /// Lane the unit occupies.
        lane: LaneId,
        /// Type of the unit.
        kind: UnitKind,
        /// Opaque handle presentation attaches its visuals to.
        handle: PresentationHandle,
    },
    /// Confirms that a unit left its lane and its handle was released.
    UnitRemoved {
        /// Identifier of the removed unit.
        unit: UnitId,
        /// Handle that presentation should release.
        handle: PresentationHandle,
        /// Why the unit left the lane.
        reason: RemovalReason,
    },
    /// Reports that a unit's stagger meter filled up.
    UnitStaggered {
        /// Identifier of the staggered unit.
        unit: UnitId,
    },
    /// Confirms that a player action was executed.
    ActionRun {
        /// Action that ran.
        action: ActionKind,
        /// Lane the action targeted.
        lane: LaneId,
    },
    /// Confirms that an attack entered the playfield.
    AttackLaunched {
        /// Identifier allocated to the attack.
        attack: AttackId,
        /// Side the attack was fired for.
        side: Side,
    },
    /// Reports that a parried attack switched sides.
    AttackReflected {
        /// Identifier of the reflected attack.
        attack: AttackId,
    },
    /// Confirms that an attack was consumed.
    AttackRemoved {
        /// Identifier of the removed attack.
        attack: AttackId,
    },
}

/// Opposing factions contesting the lanes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Units and attacks controlled by the player.
    Player,
    /// Units and attacks injected by waves.
    Enemy,
}

impl Side {
    /// Returns the side this one fights against.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }

    /// Sign of the x axis this side advances along.
    #[must_use]
    pub const fn direction(self) -> f32 {
        match self {
            Self::Player => 1.0,
            Self::Enemy => -1.0,
        }
    }
}

/// Lifecycle states of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayState {
    /// No session has started yet.
    MainMenu,
    /// Simulation runs on every frame.
    Active,
    /// Simulation is frozen until resumed.
    Paused,
    /// One of the bases fell.
    Ended(GameOutcome),
}

/// Final result of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    /// The enemy base was destroyed.
    Victory,
    /// The player's base was destroyed.
    Defeat,
}

/// Reasons a unit leaves its lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RemovalReason {
    /// Health dropped to zero.
    Killed,
    /// The unit crossed the opposing base edge.
    ReachedBase,
    /// The session was reset while the unit was alive.
    Cleared,
}

/// Hitboxes an attack can be reported to overlap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OverlapTarget {
    /// A unit body.
    Unit(UnitId),
    /// The parry window open in the given lane.
    Parry(LaneId),
}

/// Unique identifier assigned to a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new unit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to an attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttackId(u32);

impl AttackId {
    /// Creates a new attack identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Opaque token presentation associates with a simulated unit.
///
/// The simulation allocates, moves and releases handles but never inspects
/// what they refer to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PresentationHandle(u64);

impl PresentationHandle {
    /// Wraps a raw handle value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the raw handle value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Zero-based index of a lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LaneId(u32);

impl LaneId {
    /// Creates a new lane index.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the underlying lane index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a base grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    x: u32,
    y: u32,
}

impl GridCoord {
    /// Creates a new grid coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }
}

/// Building types that may occupy a base grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    /// Unbuilt cell.
    Empty,
    /// Central building present from the start; never removable.
    Townhall,
    /// Basic food producer.
    Field,
    /// Basic wood producer.
    Forest,
    /// Basic gold producer.
    Market,
    /// Military building.
    Barracks,
    /// Advanced military building.
    TrainingGround,
    /// Advanced food producer.
    Farm,
    /// Advanced wood producer.
    Lumberyard,
    /// Advanced gold producer.
    Bazaar,
    /// Grants a damage buff.
    Blacksmith,
    /// Grants a health buff.
    Workshop,
}

impl BuildingKind {
    /// Number of building kinds.
    pub const COUNT: usize = 12;

    /// Every building kind in declaration order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Empty,
        Self::Townhall,
        Self::Field,
        Self::Forest,
        Self::Market,
        Self::Barracks,
        Self::TrainingGround,
        Self::Farm,
        Self::Lumberyard,
        Self::Bazaar,
        Self::Blacksmith,
        Self::Workshop,
    ];

    /// Dense index used for table lookups.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Configuration key naming the building.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Townhall => "townhall",
            Self::Field => "field",
            Self::Forest => "forest",
            Self::Market => "market",
            Self::Barracks => "barracks",
            Self::TrainingGround => "training_ground",
            Self::Farm => "farm",
            Self::Lumberyard => "lumberyard",
            Self::Bazaar => "bazaar",
            Self::Blacksmith => "blacksmith",
            Self::Workshop => "workshop",
        }
    }

    /// Resolves a configuration key into a building kind.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Reports whether the player may construct this kind via a build command.
    #[must_use]
    pub const fn is_constructible(self) -> bool {
        !matches!(self, Self::Empty | Self::Townhall)
    }
}

/// Unit types that fight in the lanes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Cheap melee infantry.
    Swordsman,
    /// Ranged infantry firing parryable arrows.
    Archer,
    /// Fast, durable melee cavalry.
    Knight,
    /// Slow siege engine firing parryable boulders.
    Catapult,
}

impl UnitKind {
    /// Number of unit kinds.
    pub const COUNT: usize = 4;

    /// Every unit kind in declaration order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Swordsman,
        Self::Archer,
        Self::Knight,
        Self::Catapult,
    ];

    /// Dense index used for table lookups.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Configuration key naming the unit.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Swordsman => "swordsman",
            Self::Archer => "archer",
            Self::Knight => "knight",
            Self::Catapult => "catapult",
        }
    }

    /// Resolves a configuration key into a unit kind.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

/// Player actions that can be run in a lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Opens a parry window at the player's base edge.
    Parry,
    /// Fires a piercing shot down the lane.
    Volley,
}

impl ActionKind {
    /// Number of action kinds.
    pub const COUNT: usize = 2;

    /// Every action kind in declaration order.
    pub const ALL: [Self; Self::COUNT] = [Self::Parry, Self::Volley];

    /// Dense index used for table lookups.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Configuration key naming the action.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Parry => "parry",
            Self::Volley => "volley",
        }
    }

    /// Resolves a configuration key into an action kind.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

/// Fungible resources held by the player or charged as costs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceSet {
    /// Gold counter.
    pub gold: u32,
    /// Food counter.
    pub food: u32,
    /// Wood counter.
    pub wood: u32,
}

impl ResourceSet {
    /// Resource set with every counter at zero.
    pub const ZERO: Self = Self::new(0, 0, 0);

    /// Creates a resource set from explicit counters.
    #[must_use]
    pub const fn new(gold: u32, food: u32, wood: u32) -> Self {
        Self { gold, food, wood }
    }

    /// Reports whether every counter covers the corresponding cost.
    #[must_use]
    pub const fn can_afford(&self, costs: &ResourceSet) -> bool {
        self.gold >= costs.gold && self.food >= costs.food && self.wood >= costs.wood
    }

    /// Subtracts the costs from every counter.
    ///
    /// Callers must establish affordability with [`ResourceSet::can_afford`]
    /// first; charging more than is held is a programming error.
    pub fn charge_costs(&mut self, costs: &ResourceSet) {
        debug_assert!(
            self.can_afford(costs),
            "charged {:?} while holding {:?}",
            costs,
            self
        );
        self.gold -= costs.gold;
        self.food -= costs.food;
        self.wood -= costs.wood;
    }

    /// Adds the provided amounts to every counter.
    pub fn add(&mut self, amounts: &ResourceSet) {
        self.gold = self.gold.saturating_add(amounts.gold);
        self.food = self.food.saturating_add(amounts.food);
        self.wood = self.wood.saturating_add(amounts.wood);
    }
}

/// Additive modifiers granted to newly created player units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Buffs {
    /// Bonus damage per attack.
    pub damage: i32,
    /// Bonus maximum health.
    pub health: i32,
}

impl Buffs {
    /// Accumulates another buff contribution.
    pub fn add(&mut self, other: &Buffs) {
        self.damage = self.damage.saturating_add(other.damage);
        self.health = self.health.saturating_add(other.health);
    }
}

/// Per-tick output of a building or of the whole base grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Production {
    /// Resources added to the ledger every economic tick.
    pub resources: ResourceSet,
    /// Buffs contributed to newly created player units.
    pub buffs: Buffs,
}

impl Production {
    /// Accumulates another production contribution.
    pub fn add(&mut self, other: &Production) {
        self.resources.add(&other.resources);
        self.buffs.add(&other.buffs);
    }
}
