use std::time::Duration;

use lane_defence_core::{
    BuildingKind, BuildingStats, Command, ConfigTable, Event, GridCoord, LaneId, PlayState,
    ResourceSet, UnitKind,
};
use lane_defence_world::{self as world, query, World};
use proptest::prelude::*;

fn standard() -> ConfigTable {
    ConfigTable::standard().expect("standard table")
}

fn started(config: ConfigTable) -> World {
    let mut world = World::new(config);
    let mut events = Vec::new();
    world::apply(&mut world, Command::StartGame, &mut events);
    world
}

fn tick(world: &mut World, dt: Duration) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, Command::Tick { dt }, &mut events);
    events
}

fn run(world: &mut World, command: Command) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, command, &mut events);
    events
}

#[test]
fn three_ticks_on_bare_board_yield_three_gold() {
    let mut world = started(standard());
    for _ in 0..3 {
        let _ = tick(&mut world, Duration::from_secs(1));
    }
    assert_eq!(query::resources(&world), ResourceSet::new(3, 0, 0));
}

#[test]
fn first_frame_ticks_the_economy_immediately() {
    let mut world = started(standard());
    let events = tick(&mut world, Duration::from_millis(16));
    assert!(events.contains(&Event::ResourcesUpdated {
        resources: ResourceSet::new(1, 0, 0)
    }));

    let events = tick(&mut world, Duration::from_millis(16));
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::ResourcesUpdated { .. })));
}

proptest! {
    #[test]
    fn economy_ticks_are_at_least_one_second_apart(
        frames in prop::collection::vec(1u64..700, 1..120),
    ) {
        let mut world = started(standard());
        let mut elapsed = Duration::ZERO;
        let mut tick_times = Vec::new();

        for millis in frames {
            let dt = Duration::from_millis(millis);
            elapsed += dt;
            for event in tick(&mut world, dt) {
                if matches!(event, Event::ResourcesUpdated { .. }) {
                    tick_times.push(elapsed);
                }
            }
        }

        prop_assert!(!tick_times.is_empty());
        for pair in tick_times.windows(2) {
            prop_assert!(pair[1] - pair[0] >= Duration::from_secs(1));
        }
        let ticks = u32::try_from(tick_times.len()).unwrap_or(u32::MAX);
        prop_assert_eq!(query::resources(&world), ResourceSet::new(ticks, 0, 0));
    }
}

#[test]
fn building_charges_costs_and_adds_production() {
    let mut world = started(standard());
    for _ in 0..10 {
        let _ = tick(&mut world, Duration::from_secs(1));
    }
    assert_eq!(query::resources(&world).gold, 10);

    let events = run(
        &mut world,
        Command::BuildAt {
            cell: GridCoord::new(0, 0),
            kind: BuildingKind::Field,
        },
    );
    assert_eq!(
        events,
        vec![
            Event::ResourcesUpdated {
                resources: ResourceSet::ZERO
            },
            Event::BuildingBuilt {
                kind: BuildingKind::Field
            },
        ]
    );
    assert_eq!(query::total_growth(&world).resources, ResourceSet::new(1, 1, 0));

    let _ = tick(&mut world, Duration::from_secs(1));
    assert_eq!(query::resources(&world), ResourceSet::new(1, 1, 0));
}

#[test]
fn invalid_builds_leave_the_world_untouched() {
    let config = standard().with_building(
        BuildingKind::Field,
        BuildingStats {
            cost: ResourceSet::ZERO,
            ..BuildingStats::default()
        },
    );
    let mut world = started(config);
    let centre = query::base_grid(&world).centre();

    for command in [
        Command::BuildAt {
            cell: centre,
            kind: BuildingKind::Field,
        },
        Command::BuildAt {
            cell: GridCoord::new(3, 0),
            kind: BuildingKind::Field,
        },
        Command::BuildAt {
            cell: GridCoord::new(0, 0),
            kind: BuildingKind::Townhall,
        },
        Command::BuildAt {
            cell: GridCoord::new(0, 0),
            kind: BuildingKind::Empty,
        },
        Command::BuildAt {
            cell: GridCoord::new(0, 0),
            kind: BuildingKind::Market,
        },
    ] {
        assert!(run(&mut world, command).is_empty());
    }
    assert_eq!(query::base_grid(&world).count(BuildingKind::Empty), 8);

    assert!(!run(
        &mut world,
        Command::BuildAt {
            cell: GridCoord::new(0, 0),
            kind: BuildingKind::Field,
        },
    )
    .is_empty());
    assert!(run(
        &mut world,
        Command::BuildAt {
            cell: GridCoord::new(0, 0),
            kind: BuildingKind::Field,
        },
    )
    .is_empty());
}

#[test]
fn destroying_clears_the_cell_but_never_the_townhall() {
    let config = standard().with_building(
        BuildingKind::Forest,
        BuildingStats {
            cost: ResourceSet::ZERO,
            ..BuildingStats::default()
        },
    );
    let mut world = started(config);
    for _ in 0..5 {
        let _ = tick(&mut world, Duration::from_secs(1));
    }
    let _ = run(
        &mut world,
        Command::BuildAt {
            cell: GridCoord::new(2, 2),
            kind: BuildingKind::Forest,
        },
    );

    let centre = query::base_grid(&world).centre();
    assert!(run(&mut world, Command::DestroyBuilding { cell: centre }).is_empty());
    assert!(run(
        &mut world,
        Command::DestroyBuilding {
            cell: GridCoord::new(0, 0)
        }
    )
    .is_empty());

    let events = run(
        &mut world,
        Command::DestroyBuilding {
            cell: GridCoord::new(2, 2),
        },
    );
    assert!(events.contains(&Event::BuildingDestroyed {
        kind: BuildingKind::Forest
    }));
    assert_eq!(query::resources(&world).gold, 0);
    assert_eq!(
        query::base_grid(&world).get(GridCoord::new(2, 2)),
        Some(BuildingKind::Empty)
    );
}

#[test]
fn military_buildings_unlock_units_permanently() {
    let config = standard().with_building(
        BuildingKind::Barracks,
        BuildingStats {
            cost: ResourceSet::ZERO,
            ..BuildingStats::default()
        },
    );
    let mut world = started(config);
    assert!(!query::is_unlocked(&world, UnitKind::Archer));

    let events = run(
        &mut world,
        Command::BuildAt {
            cell: GridCoord::new(0, 1),
            kind: BuildingKind::Barracks,
        },
    );
    assert!(events.contains(&Event::UnitUnlocked {
        kind: UnitKind::Archer
    }));

    for _ in 0..5 {
        let _ = tick(&mut world, Duration::from_secs(1));
    }
    let events = run(
        &mut world,
        Command::DestroyBuilding {
            cell: GridCoord::new(0, 1),
        },
    );
    assert!(events.contains(&Event::BuildingDestroyed {
        kind: BuildingKind::Barracks
    }));
    assert!(query::is_unlocked(&world, UnitKind::Archer));
    assert!(!query::is_unlocked(&world, UnitKind::Knight));
}

#[test]
fn placing_an_affordable_unit_queues_it_at_the_tail() {
    let mut world = started(standard());
    for _ in 0..10 {
        let _ = tick(&mut world, Duration::from_secs(1));
    }
    assert_eq!(query::resources(&world), ResourceSet::new(10, 0, 0));

    let events = run(
        &mut world,
        Command::PlaceUnit {
            lane: LaneId::new(1),
            kind: UnitKind::Swordsman,
        },
    );

    assert_eq!(query::resources(&world), ResourceSet::ZERO);
    assert!(events.contains(&Event::UnitBuilt {
        kind: UnitKind::Swordsman
    }));
    let lane = query::lane_view(&world, LaneId::new(1)).expect("lane exists");
    assert_eq!(lane.player_queue.last(), Some(&UnitKind::Swordsman));
}

#[test]
fn placement_rejects_locked_units_and_unknown_lanes() {
    let mut world = started(standard());
    for _ in 0..40 {
        let _ = tick(&mut world, Duration::from_secs(1));
    }
    let before = query::resources(&world);

    assert!(run(
        &mut world,
        Command::PlaceUnit {
            lane: LaneId::new(0),
            kind: UnitKind::Archer,
        }
    )
    .is_empty());
    assert!(run(
        &mut world,
        Command::PlaceUnit {
            lane: LaneId::new(3),
            kind: UnitKind::Swordsman,
        }
    )
    .is_empty());
    assert_eq!(query::resources(&world), before);
}

#[test]
fn spawn_cooldown_blocks_placement_until_it_elapses() {
    let mut world = started(standard());
    for _ in 0..30 {
        let _ = tick(&mut world, Duration::from_secs(1));
    }
    let place = Command::PlaceUnit {
        lane: LaneId::new(0),
        kind: UnitKind::Swordsman,
    };

    assert!(!run(&mut world, place.clone()).is_empty());
    let events = tick(&mut world, Duration::from_millis(100));
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::UnitSpawned { kind: UnitKind::Swordsman, .. })));
    assert_eq!(
        query::spawn_delay_remaining(&world, UnitKind::Swordsman),
        Duration::from_secs(2)
    );

    assert!(run(&mut world, place.clone()).is_empty());
    let _ = tick(&mut world, Duration::from_secs(2));
    assert!(!run(&mut world, place).is_empty());
}

#[test]
fn player_queue_spawns_one_unit_per_frame_respecting_cooldown() {
    let mut world = started(standard());
    for _ in 0..30 {
        let _ = tick(&mut world, Duration::from_secs(1));
    }
    let lane = LaneId::new(2);
    for _ in 0..2 {
        let _ = run(
            &mut world,
            Command::PlaceUnit {
                lane,
                kind: UnitKind::Swordsman,
            },
        );
    }
    let view = query::lane_view(&world, lane).expect("lane exists");
    assert_eq!(view.player_queue.len(), 2, "cooldown only starts on spawn");

    let _ = tick(&mut world, Duration::from_millis(10));
    let _ = tick(&mut world, Duration::from_millis(10));
    let view = query::lane_view(&world, lane).expect("lane exists");
    assert_eq!(view.player_units.len(), 1);
    assert_eq!(view.player_queue, vec![UnitKind::Swordsman]);

    // The cooldown elapses, then the first unit walks clear of the spawn slot.
    let _ = tick(&mut world, Duration::from_secs(2));
    let _ = tick(&mut world, Duration::from_millis(10));
    let view = query::lane_view(&world, lane).expect("lane exists");
    assert_eq!(view.player_units.len(), 2);
    assert!(view.player_queue.is_empty());
}

#[test]
fn enemy_queue_waits_for_the_spawn_slot_but_not_a_cooldown() {
    let mut world = started(standard());
    let lane = LaneId::new(0);
    for _ in 0..2 {
        let _ = run(
            &mut world,
            Command::QueueEnemyUnit {
                lane,
                kind: UnitKind::Knight,
            },
        );
    }

    let _ = tick(&mut world, Duration::from_millis(10));
    let _ = tick(&mut world, Duration::from_millis(10));
    let view = query::lane_view(&world, lane).expect("lane exists");
    assert_eq!(view.enemy_units.len(), 1);
    assert_eq!(view.enemy_queue, vec![UnitKind::Knight]);

    // Knights are 40 wide and walk 55 per second.
    let _ = tick(&mut world, Duration::from_secs(1));
    let _ = tick(&mut world, Duration::from_millis(10));
    let view = query::lane_view(&world, lane).expect("lane exists");
    assert_eq!(view.enemy_units.len(), 2);
    assert!(view.enemy_queue.is_empty());
    assert!(view.enemy_units[1].leading_edge >= view.enemy_units[0].trailing_edge);
}

#[test]
fn wave_clock_counts_down_only_while_active() {
    let mut world = started(standard());
    let mut previous = query::wave_countdown(&world);

    for _ in 0..10 {
        let _ = tick(&mut world, Duration::from_millis(700));
        let now = query::wave_countdown(&world);
        assert!(now < previous);
        previous = now;
    }

    let _ = run(&mut world, Command::TogglePause);
    let _ = tick(&mut world, Duration::from_secs(10));
    assert_eq!(query::wave_countdown(&world), previous);
    let _ = run(&mut world, Command::TogglePause);
    assert_eq!(query::play_state(&world), PlayState::Active);

    let events = tick(&mut world, Duration::from_secs(1));
    assert!(events.contains(&Event::WaveCountdownUpdated {
        seconds_remaining: 22
    }));
}

#[test]
fn wave_starts_and_clock_resets_to_interval() {
    let mut world = started(standard());
    let mut started_waves = Vec::new();
    for _ in 0..30 {
        for event in tick(&mut world, Duration::from_secs(1)) {
            if let Event::WaveStarted { wave } = event {
                started_waves.push(wave);
            }
        }
    }

    assert_eq!(started_waves, vec![1]);
    assert_eq!(query::waves_started(&world), 1);
    assert_eq!(query::wave_countdown(&world), Duration::from_secs(30));
}

#[test]
fn long_frame_reports_each_second_around_a_wave_start() {
    let mut world = started(standard());
    let _ = tick(&mut world, Duration::from_millis(27_500));

    let events = tick(&mut world, Duration::from_secs(5));
    let clock: Vec<Event> = events
        .into_iter()
        .filter(|event| {
            matches!(
                event,
                Event::WaveCountdownUpdated { .. } | Event::WaveStarted { .. }
            )
        })
        .collect();
    assert_eq!(
        clock,
        vec![
            Event::WaveCountdownUpdated {
                seconds_remaining: 2
            },
            Event::WaveCountdownUpdated {
                seconds_remaining: 1
            },
            Event::WaveStarted { wave: 1 },
            Event::WaveCountdownUpdated {
                seconds_remaining: 30
            },
        ]
    );
}
