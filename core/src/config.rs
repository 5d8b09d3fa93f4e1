//! Strongly typed balance table validated once when a session is configured.
//!
//! The on-disk representation is a TOML document keyed by category and type
//! name. [`ConfigTable::from_toml_str`] parses it, rejects unknown or missing
//! entries, and converts every entry into stats indexed by the closed kind
//! enums so lookups during play are infallible.

use std::{collections::BTreeMap, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use crate::{ActionKind, BuildingKind, Buffs, Production, ResourceSet, UnitKind};

/// Standard balance table shipped with the simulation.
pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Errors raised while validating a configuration table.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid TOML or does not match the expected shape.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// A required entry is absent.
    #[error("missing {category} entry `{name}`")]
    MissingEntry {
        /// Category the entry belongs to.
        category: &'static str,
        /// Configuration key of the missing entry.
        name: &'static str,
    },
    /// An entry names a type the simulation does not know.
    #[error("unknown {category} entry `{name}`")]
    UnknownEntry {
        /// Category the entry belongs to.
        category: &'static str,
        /// Configuration key that failed to resolve.
        name: String,
    },
    /// The base grid has no unique centre cell.
    #[error("base width must be odd and at least 1, got {0}")]
    InvalidBaseWidth(u32),
    /// The playfield contains no lanes.
    #[error("lane count must be at least 1")]
    InvalidLaneCount,
    /// A scalar is negative, NaN or infinite, or zero where a period is expected.
    #[error("`{field}` is out of range, got {value}")]
    InvalidScalar {
        /// Path of the offending field.
        field: String,
        /// Value found in the document.
        value: f32,
    },
    /// The wave table is empty.
    #[error("at least one wave composition is required")]
    NoWaves,
}

/// Cost and output of a building type.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BuildingStats {
    /// Resources charged when the building is constructed.
    pub cost: ResourceSet,
    /// Output contributed on every economic tick.
    pub produce: Production,
}

/// Stats of a unit type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitStats {
    /// Resources charged when the player places the unit.
    pub cost: ResourceSet,
    /// Lane units travelled per second.
    pub speed: f32,
    /// Health of a freshly spawned unit before buffs.
    pub max_health: i32,
    /// Cooldown applied to the type whenever one of its units leaves the queue.
    pub spawn_delay: Duration,
    /// Damage dealt per attack and to a base on arrival.
    pub damage: i32,
    /// Distance at which the unit starts attacking opponents.
    pub range: f32,
    /// Minimum time between two attacks.
    pub attack_interval: Duration,
    /// Extent of the unit's body along the lane.
    pub width: f32,
    /// Speed of the attacks the unit launches.
    pub projectile_speed: f32,
    /// Whether attacks launched by enemy units of this type can be parried.
    pub parryable: bool,
    /// Stagger accumulated before the unit is staggered.
    pub stagger_threshold: i32,
    /// Building whose construction unlocks the type, if it starts locked.
    pub unlocked_by: Option<BuildingKind>,
}

/// Cost and parameters of a player action.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ActionStats {
    /// Resources charged when the action runs.
    pub cost: ResourceSet,
    /// How long the action's effect lasts.
    pub duration: Duration,
    /// Distance from the player's base edge the effect covers.
    pub reach: f32,
    /// Speed of any projectile the action launches.
    pub speed: f32,
}

/// Single unit batch within a wave composition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaveEntry {
    /// Type of enemy unit.
    pub kind: UnitKind,
    /// Number of units of that type.
    pub count: u32,
}

/// Enemy units injected by a single wave.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WaveComposition {
    /// Batches in injection order.
    pub entries: Vec<WaveEntry>,
}

/// Timing and composition of enemy waves.
#[derive(Clone, Debug, PartialEq)]
pub struct WaveSchedule {
    /// Countdown between two waves.
    pub interval: Duration,
    /// Seed deriving per-wave lane assignment.
    pub seed: u64,
    /// Units added to every batch for each wave past the end of the table.
    pub growth: u32,
    /// Compositions indexed by wave number, the last one repeating.
    pub compositions: Vec<WaveComposition>,
}

/// Validated configuration table consumed by the world.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigTable {
    base_width: u32,
    num_lanes: u32,
    base_max_health: i32,
    enemy_base_max_health: i32,
    destroy_building_cost: ResourceSet,
    lane_length: f32,
    lane_spacing: f32,
    player_damage: i32,
    stagger_duration: Duration,
    waves: WaveSchedule,
    buildings: Vec<BuildingStats>,
    units: Vec<UnitStats>,
    actions: Vec<ActionStats>,
}

impl ConfigTable {
    /// Parses and validates a TOML configuration document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(contents)?;
        Self::from_raw(raw)
    }

    /// Parses the standard balance table.
    pub fn standard() -> Result<Self, ConfigError> {
        Self::from_toml_str(DEFAULT_CONFIG)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        if raw.base_width == 0 || raw.base_width % 2 == 0 {
            return Err(ConfigError::InvalidBaseWidth(raw.base_width));
        }
        if raw.num_lanes == 0 {
            return Err(ConfigError::InvalidLaneCount);
        }
        let lane_length = non_negative("lane_length", raw.lane_length)?;
        let lane_spacing = non_negative("lane_spacing", raw.lane_spacing)?;
        let stagger_duration = seconds("stagger_duration", raw.stagger_duration)?;

        let buildings = resolve_buildings(raw.buildings)?;
        let units = resolve_units(raw.units)?;
        let actions = resolve_actions(raw.actions)?;
        let waves = resolve_waves(raw.waves)?;

        Ok(Self {
            base_width: raw.base_width,
            num_lanes: raw.num_lanes,
            base_max_health: raw.base_max_health,
            enemy_base_max_health: raw.enemy_base_max_health,
            destroy_building_cost: raw.destroy_building_cost,
            lane_length,
            lane_spacing,
            player_damage: raw.player_damage,
            stagger_duration,
            waves,
            buildings,
            units,
            actions,
        })
    }

    /// Side length of the square base grid.
    #[must_use]
    pub const fn base_width(&self) -> u32 {
        self.base_width
    }

    /// Number of lanes in the playfield.
    #[must_use]
    pub const fn num_lanes(&self) -> u32 {
        self.num_lanes
    }

    /// Starting health of the player's base.
    #[must_use]
    pub const fn base_max_health(&self) -> i32 {
        self.base_max_health
    }

    /// Starting health of the enemy base.
    #[must_use]
    pub const fn enemy_base_max_health(&self) -> i32 {
        self.enemy_base_max_health
    }

    /// Resources charged for clearing a building.
    #[must_use]
    pub const fn destroy_building_cost(&self) -> ResourceSet {
        self.destroy_building_cost
    }

    /// Distance between the two base edges.
    #[must_use]
    pub const fn lane_length(&self) -> f32 {
        self.lane_length
    }

    /// Vertical distance between neighbouring lanes.
    #[must_use]
    pub const fn lane_spacing(&self) -> f32 {
        self.lane_spacing
    }

    /// Base damage of player-sourced attacks before buffs.
    #[must_use]
    pub const fn player_damage(&self) -> i32 {
        self.player_damage
    }

    /// How long a unit stays staggered once its meter fills.
    #[must_use]
    pub const fn stagger_duration(&self) -> Duration {
        self.stagger_duration
    }

    /// Enemy wave timing and composition.
    #[must_use]
    pub const fn waves(&self) -> &WaveSchedule {
        &self.waves
    }

    /// Stats for the provided building kind.
    #[must_use]
    pub fn building(&self, kind: BuildingKind) -> &BuildingStats {
        &self.buildings[kind.index()]
    }

    /// Stats for the provided unit kind.
    #[must_use]
    pub fn unit(&self, kind: UnitKind) -> &UnitStats {
        &self.units[kind.index()]
    }

    /// Stats for the provided action kind.
    #[must_use]
    pub fn action(&self, kind: ActionKind) -> &ActionStats {
        &self.actions[kind.index()]
    }

    /// Replaces the stats of a building kind.
    #[must_use]
    pub fn with_building(mut self, kind: BuildingKind, stats: BuildingStats) -> Self {
        self.buildings[kind.index()] = stats;
        self
    }

    /// Replaces the stats of a unit kind.
    #[must_use]
    pub fn with_unit(mut self, kind: UnitKind, stats: UnitStats) -> Self {
        self.units[kind.index()] = stats;
        self
    }

    /// Replaces the stats of an action kind.
    #[must_use]
    pub fn with_action(mut self, kind: ActionKind, stats: ActionStats) -> Self {
        self.actions[kind.index()] = stats;
        self
    }

    /// Replaces the wave schedule.
    #[must_use]
    pub fn with_waves(mut self, waves: WaveSchedule) -> Self {
        self.waves = waves;
        self
    }

    /// Replaces the number of lanes; values below one are raised to one.
    #[must_use]
    pub fn with_num_lanes(mut self, num_lanes: u32) -> Self {
        self.num_lanes = num_lanes.max(1);
        self
    }

    /// Replaces the starting health of both bases.
    #[must_use]
    pub const fn with_base_health(mut self, player: i32, enemy: i32) -> Self {
        self.base_max_health = player;
        self.enemy_base_max_health = enemy;
        self
    }

    /// Replaces the base damage of player-sourced attacks.
    #[must_use]
    pub const fn with_player_damage(mut self, damage: i32) -> Self {
        self.player_damage = damage;
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    base_width: u32,
    num_lanes: u32,
    base_max_health: i32,
    enemy_base_max_health: i32,
    #[serde(default)]
    destroy_building_cost: ResourceSet,
    lane_length: f32,
    lane_spacing: f32,
    #[serde(default)]
    player_damage: i32,
    #[serde(default)]
    stagger_duration: f32,
    waves: RawWaves,
    #[serde(default)]
    buildings: BTreeMap<String, RawBuilding>,
    #[serde(default)]
    units: BTreeMap<String, RawUnit>,
    #[serde(default)]
    actions: BTreeMap<String, RawAction>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawBuilding {
    cost: ResourceSet,
    produce: RawProduce,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawProduce {
    gold: u32,
    food: u32,
    wood: u32,
    damage_buff: i32,
    health_buff: i32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawUnit {
    #[serde(default)]
    cost: ResourceSet,
    speed: f32,
    max_health: i32,
    #[serde(default)]
    spawn_delay: f32,
    #[serde(default)]
    damage: i32,
    #[serde(default)]
    range: f32,
    #[serde(default)]
    attack_interval: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    projectile_speed: f32,
    #[serde(default)]
    parryable: bool,
    #[serde(default)]
    stagger_threshold: Option<i32>,
    #[serde(default)]
    unlocked_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawAction {
    cost: ResourceSet,
    duration: f32,
    reach: f32,
    speed: f32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWaves {
    interval: f32,
    #[serde(default)]
    seed: u64,
    #[serde(default)]
    growth: u32,
    #[serde(default)]
    compositions: Vec<RawComposition>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawComposition {
    units: Vec<RawWaveEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWaveEntry {
    unit: String,
    count: u32,
}

fn resolve_buildings(
    mut raw: BTreeMap<String, RawBuilding>,
) -> Result<Vec<BuildingStats>, ConfigError> {
    reject_unknown("building", raw.keys(), |name| {
        BuildingKind::from_name(name).is_some()
    })?;

    let mut resolved = Vec::with_capacity(BuildingKind::COUNT);
    for kind in BuildingKind::ALL {
        let entry = match raw.remove(kind.name()) {
            Some(entry) => entry,
            None if kind == BuildingKind::Empty => RawBuilding::default(),
            None => {
                return Err(ConfigError::MissingEntry {
                    category: "building",
                    name: kind.name(),
                })
            }
        };
        resolved.push(BuildingStats {
            cost: entry.cost,
            produce: Production {
                resources: ResourceSet::new(
                    entry.produce.gold,
                    entry.produce.food,
                    entry.produce.wood,
                ),
                buffs: Buffs {
                    damage: entry.produce.damage_buff,
                    health: entry.produce.health_buff,
                },
            },
        });
    }
    Ok(resolved)
}

fn resolve_units(mut raw: BTreeMap<String, RawUnit>) -> Result<Vec<UnitStats>, ConfigError> {
    reject_unknown("unit", raw.keys(), |name| UnitKind::from_name(name).is_some())?;

    let mut resolved = Vec::with_capacity(UnitKind::COUNT);
    for kind in UnitKind::ALL {
        let entry = raw.remove(kind.name()).ok_or(ConfigError::MissingEntry {
            category: "unit",
            name: kind.name(),
        })?;
        let field = |suffix: &str| format!("units.{}.{suffix}", kind.name());
        let unlocked_by = match entry.unlocked_by {
            Some(name) => Some(BuildingKind::from_name(&name).ok_or(
                ConfigError::UnknownEntry {
                    category: "building",
                    name,
                },
            )?),
            None => None,
        };
        resolved.push(UnitStats {
            cost: entry.cost,
            speed: non_negative(&field("speed"), entry.speed)?,
            max_health: entry.max_health,
            spawn_delay: seconds(&field("spawn_delay"), entry.spawn_delay)?,
            damage: entry.damage,
            range: non_negative(&field("range"), entry.range)?,
            attack_interval: seconds(&field("attack_interval"), entry.attack_interval)?,
            width: non_negative(&field("width"), entry.width)?,
            projectile_speed: non_negative(&field("projectile_speed"), entry.projectile_speed)?,
            parryable: entry.parryable,
            stagger_threshold: entry.stagger_threshold.unwrap_or(entry.max_health),
            unlocked_by,
        });
    }
    Ok(resolved)
}

fn resolve_actions(mut raw: BTreeMap<String, RawAction>) -> Result<Vec<ActionStats>, ConfigError> {
    reject_unknown("action", raw.keys(), |name| {
        ActionKind::from_name(name).is_some()
    })?;

    let mut resolved = Vec::with_capacity(ActionKind::COUNT);
    for kind in ActionKind::ALL {
        let entry = raw.remove(kind.name()).ok_or(ConfigError::MissingEntry {
            category: "action",
            name: kind.name(),
        })?;
        let field = |suffix: &str| format!("actions.{}.{suffix}", kind.name());
        resolved.push(ActionStats {
            cost: entry.cost,
            duration: seconds(&field("duration"), entry.duration)?,
            reach: non_negative(&field("reach"), entry.reach)?,
            speed: non_negative(&field("speed"), entry.speed)?,
        });
    }
    Ok(resolved)
}

fn resolve_waves(raw: RawWaves) -> Result<WaveSchedule, ConfigError> {
    if raw.compositions.is_empty() {
        return Err(ConfigError::NoWaves);
    }

    let mut compositions = Vec::with_capacity(raw.compositions.len());
    for composition in raw.compositions {
        let mut entries = Vec::with_capacity(composition.units.len());
        for entry in composition.units {
            let kind = UnitKind::from_name(&entry.unit).ok_or(ConfigError::UnknownEntry {
                category: "unit",
                name: entry.unit,
            })?;
            entries.push(WaveEntry {
                kind,
                count: entry.count,
            });
        }
        compositions.push(WaveComposition { entries });
    }

    let interval = seconds("waves.interval", raw.interval)?;
    if interval.is_zero() {
        return Err(ConfigError::InvalidScalar {
            field: "waves.interval".to_owned(),
            value: raw.interval,
        });
    }

    Ok(WaveSchedule {
        interval,
        seed: raw.seed,
        growth: raw.growth,
        compositions,
    })
}

fn reject_unknown<'a>(
    category: &'static str,
    names: impl Iterator<Item = &'a String>,
    known: impl Fn(&str) -> bool,
) -> Result<(), ConfigError> {
    for name in names {
        if !known(name) {
            return Err(ConfigError::UnknownEntry {
                category,
                name: name.clone(),
            });
        }
    }
    Ok(())
}

fn non_negative(field: &str, value: f32) -> Result<f32, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidScalar {
            field: field.to_owned(),
            value,
        })
    }
}

fn seconds(field: &str, value: f32) -> Result<Duration, ConfigError> {
    let value = non_negative(field, value)?;
    Duration::try_from_secs_f32(value).map_err(|_| ConfigError::InvalidScalar {
        field: field.to_owned(),
        value,
    })
}
