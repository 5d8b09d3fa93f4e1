use std::time::Duration;

use lane_defence_core::{Command, ConfigTable, LaneId, ResourceSet, Side, UnitKind};
use lane_defence_world::{self as world, query, World};
use proptest::prelude::*;

/// Every unit kind unlocked and free, so placements are only limited by cooldowns.
fn open_roster() -> ConfigTable {
    let mut config = ConfigTable::standard().expect("standard table");
    for kind in UnitKind::ALL {
        let mut stats = *config.unit(kind);
        stats.cost = ResourceSet::ZERO;
        stats.unlocked_by = None;
        config = config.with_unit(kind, stats);
    }
    config
}

fn started(config: ConfigTable) -> World {
    let mut world = World::new(config);
    let mut events = Vec::new();
    world::apply(&mut world, Command::StartGame, &mut events);
    world
}

fn run(world: &mut World, command: Command) {
    let mut events = Vec::new();
    world::apply(world, command, &mut events);
}

/// Checks that no unit overlaps the one ahead of it or the opposing front.
fn lane_violation(world: &World, lane: LaneId) -> Option<String> {
    let view = query::lane_view(world, lane)?;
    for (side, units) in [
        (Side::Player, &view.player_units),
        (Side::Enemy, &view.enemy_units),
    ] {
        for pair in units.windows(2) {
            let gap = (pair[0].trailing_edge - pair[1].leading_edge) * side.direction();
            if gap < -1e-3 {
                return Some(format!(
                    "{side:?} unit {:?} overlaps {:?}: lead {} vs trailing {}",
                    pair[1].id, pair[0].id, pair[1].leading_edge, pair[0].trailing_edge
                ));
            }
        }
    }
    if let (Some(player), Some(enemy)) = (view.player_units.first(), view.enemy_units.first()) {
        if player.leading_edge > enemy.leading_edge + 1e-3 {
            return Some(format!(
                "fronts crossed: player {} vs enemy {}",
                player.leading_edge, enemy.leading_edge
            ));
        }
    }
    None
}

#[test]
fn back_to_back_enemy_spawns_never_overlap() {
    let mut world = started(ConfigTable::standard().expect("standard table"));
    let lane = LaneId::new(0);
    for _ in 0..2 {
        run(
            &mut world,
            Command::QueueEnemyUnit {
                lane,
                kind: UnitKind::Swordsman,
            },
        );
    }

    for frame in 0..200 {
        run(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(16),
            },
        );
        if let Some(violation) = lane_violation(&world, lane) {
            panic!("frame {frame}: {violation}");
        }
    }

    let view = query::lane_view(&world, lane).expect("lane exists");
    assert_eq!(view.enemy_units.len(), 2);
    assert!(view.enemy_queue.is_empty());
}

#[test]
fn mixed_player_kinds_spawn_in_single_file() {
    let mut world = started(open_roster());
    let lane = LaneId::new(1);
    for kind in [UnitKind::Knight, UnitKind::Swordsman, UnitKind::Archer] {
        run(&mut world, Command::PlaceUnit { lane, kind });
    }

    for frame in 0..300 {
        run(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(20),
            },
        );
        if let Some(violation) = lane_violation(&world, lane) {
            panic!("frame {frame}: {violation}");
        }
    }

    let view = query::lane_view(&world, lane).expect("lane exists");
    let kinds: Vec<UnitKind> = view.player_units.iter().map(|unit| unit.kind).collect();
    assert_eq!(
        kinds,
        vec![UnitKind::Knight, UnitKind::Swordsman, UnitKind::Archer],
        "queue order is kept"
    );
}

fn order() -> impl Strategy<Value = (bool, UnitKind, u32, u64)> {
    (
        any::<bool>(),
        prop::sample::select(UnitKind::ALL.to_vec()),
        1u32..12,
        5u64..150,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn spawned_units_never_pass_each_other(orders in prop::collection::vec(order(), 1..16)) {
        let mut world = started(open_roster());
        let lane = LaneId::new(0);

        for (enemy, kind, frames, millis) in orders {
            let command = if enemy {
                Command::QueueEnemyUnit { lane, kind }
            } else {
                Command::PlaceUnit { lane, kind }
            };
            run(&mut world, command);

            for _ in 0..frames {
                run(
                    &mut world,
                    Command::Tick {
                        dt: Duration::from_millis(millis),
                    },
                );
                let violation = lane_violation(&world, lane);
                prop_assert!(violation.is_none(), "{}", violation.unwrap_or_default());
            }
        }
    }
}
