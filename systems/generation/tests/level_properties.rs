use delve_core::CellCoord;
use delve_system_generation::{DungeonGenerator, GenerationConfig, Level};
use delve_system_pathfinding::GridPathfinder;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn generate(config: GenerationConfig, seed: u64) -> Level {
    DungeonGenerator::new(config)
        .expect("valid config")
        .generate(&mut ChaCha8Rng::seed_from_u64(seed))
        .expect("level")
}

fn config_strategy() -> impl Strategy<Value = GenerationConfig> {
    (10..60_i32, 10..60_i32, 0..6_u32, 3..10_i32, 1..4_u32).prop_map(
        |(width, height, max_iterations, min_leaf_size, corridor_width)| GenerationConfig {
            width,
            height,
            max_iterations,
            min_leaf_size,
            corridor_width,
            ..GenerationConfig::default()
        },
    )
}

proptest! {
    #[test]
    fn split_regions_are_exactly_covered_by_children(
        config in config_strategy(),
        seed in any::<u64>(),
    ) {
        let level = generate(config, seed);
        let tree = level.regions();

        for (_, region) in tree.iter() {
            let Some((left, right)) = region.children() else {
                continue;
            };
            let parent = region.rect();
            let left = tree.get(left).expect("child exists").rect();
            let right = tree.get(right).expect("child exists").rect();

            prop_assert!(!left.overlaps(&right));
            prop_assert!(parent.contains_with_margin(&left, 0));
            prop_assert!(parent.contains_with_margin(&right, 0));
            prop_assert_eq!(left.area() + right.area(), parent.area());
            prop_assert!(region.room().is_none());
        }
    }

    #[test]
    fn rooms_sit_inside_their_region_with_margin(
        config in config_strategy(),
        seed in any::<u64>(),
    ) {
        let level = generate(config, seed);
        let tree = level.regions();

        for room in level.rooms() {
            let region = tree.get(room.region()).expect("owning region exists");
            prop_assert!(region.is_terminal());
            prop_assert_eq!(region.room(), Some(room.rect()));
            prop_assert!(region.rect().contains_with_margin(&room.rect(), 1));
        }
    }

    #[test]
    fn walls_and_floor_are_disjoint(config in config_strategy(), seed in any::<u64>()) {
        let level = generate(config, seed);
        prop_assert!(level.walls().keys().all(|cell| !level.is_floor(*cell)));
        prop_assert_eq!(
            delve_system_generation::infer_walls(level.floor()),
            level.walls().clone()
        );
    }
}

#[test]
fn small_level_is_fully_connected() {
    let config = GenerationConfig {
        width: 25,
        height: 25,
        max_iterations: 2,
        min_leaf_size: 6,
        ..GenerationConfig::default()
    };

    for seed in 0..8 {
        let level = generate(config.clone(), seed);
        assert!(!level.rooms().is_empty());
        assert!(!level.floor().is_empty());

        let mut pathfinder = GridPathfinder::new();
        pathfinder.initialize(level.walkable_cells());

        let cells: Vec<CellCoord> = level.walkable_cells().collect();
        let origin = cells[0];
        for cell in &cells {
            let path = pathfinder.find_path(origin, *cell).expect("initialized");
            assert!(path.is_some(), "seed {seed}: {cell} unreachable from {origin}");
        }
    }
}

#[test]
fn enemy_candidates_avoid_the_player_room() {
    let config = GenerationConfig {
        width: 50,
        height: 50,
        max_iterations: 4,
        min_leaf_size: 6,
        enemies_per_room: 2,
        ..GenerationConfig::default()
    };
    let level = generate(config, 12);
    let first_room = level.rooms()[0].rect();

    for point in level.spawn_points() {
        let cell = CellCoord::containing(*point);
        assert!(!first_room.contains(cell));
        assert!(level.is_floor(cell));
    }
}
