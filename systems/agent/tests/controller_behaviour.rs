use delve_core::{
    AgentId, AgentState, CellCoord, Faction, Health, HitSubject, Projectile, RayHit, VisionProbe,
};
use delve_system_agent::{AgentConfig, AgentController, AgentInputs, Senses};
use delve_system_pathfinding::GridPathfinder;
use glam::Vec2;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

struct Hp(i32);

impl Health for Hp {
    fn take_damage(&mut self, amount: i32) {
        self.0 -= amount;
    }

    fn current_health(&self) -> i32 {
        self.0
    }
}

/// Sees the player whenever it lies within the ray's reach.
struct OpenSight {
    player: Vec2,
}

impl VisionProbe for OpenSight {
    fn cast_ray(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        _caster: AgentId,
    ) -> Option<RayHit> {
        let to_player = self.player - origin;
        let along = to_player.dot(direction);
        let off_axis = (to_player - direction * along).length();
        (along >= 0.0 && along <= max_distance && off_axis <= 0.5).then_some(RayHit {
            subject: HitSubject::Player,
            distance: along,
        })
    }
}

fn open_floor(size: i32) -> GridPathfinder {
    let mut pathfinder = GridPathfinder::new();
    pathfinder.initialize((0..size).flat_map(|y| (0..size).map(move |x| CellCoord::new(x, y))));
    pathfinder
}

#[test]
fn flee_without_reachable_cells_keeps_agent_in_place() {
    let mut pathfinder = GridPathfinder::new();
    pathfinder.initialize([CellCoord::new(100, 100)]);

    let config = AgentConfig {
        flee_chance: 1.0,
        ..AgentConfig::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(77);
    let start = Vec2::new(3.5, 3.5);
    let mut agent = AgentController::new(AgentId::new(0), start, config, &mut rng);
    let player = Vec2::new(1.5, 3.5);
    let vision = OpenSight { player };

    for _ in 0..50 {
        let outcome = agent
            .tick(
                &AgentInputs {
                    dt: 0.02,
                    player: Some(player),
                    projectiles: &[],
                },
                Senses {
                    health: &Hp(1),
                    vision: &vision,
                    pathfinder: &pathfinder,
                },
                None,
                &mut rng,
            )
            .expect("tick");
        assert!(!outcome.moved);
        assert_eq!(agent.state(), AgentState::Flee);
        assert_eq!(agent.position(), start);
    }
    assert_eq!(agent.flee_target(), Some(start));
}

#[test]
fn patrol_wanders_over_walkable_cells() {
    let pathfinder = open_floor(12);
    let config = AgentConfig {
        idle_min: 0.0,
        idle_max: 0.0,
        ..AgentConfig::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let start = Vec2::new(6.5, 6.5);
    let mut agent = AgentController::new(AgentId::new(0), start, config, &mut rng);
    let player = Vec2::new(-50.0, -50.0);
    let vision = OpenSight { player };

    let mut moved = false;
    for _ in 0..200 {
        let outcome = agent
            .tick(
                &AgentInputs {
                    dt: 0.02,
                    player: Some(player),
                    projectiles: &[],
                },
                Senses {
                    health: &Hp(3),
                    vision: &vision,
                    pathfinder: &pathfinder,
                },
                None,
                &mut rng,
            )
            .expect("tick");
        moved |= outcome.moved;
        assert!(pathfinder.is_walkable(CellCoord::containing(agent.position())));
    }

    assert_eq!(agent.state(), AgentState::Patrol);
    assert!(moved);
}

#[test]
fn pursuit_turns_corridor_corners_without_entering_walls() {
    // Row y = 0 for x in 0..=5, then column x = 5 for y in 1..=12.
    let mut pathfinder = GridPathfinder::new();
    pathfinder.initialize(
        (0..=5)
            .map(|x| CellCoord::new(x, 0))
            .chain((1..=12).map(|y| CellCoord::new(5, y))),
    );
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut agent = AgentController::new(
        AgentId::new(0),
        Vec2::new(0.5, 0.5),
        AgentConfig::default(),
        &mut rng,
    );
    let player = Vec2::new(5.5, 12.5);
    let vision = OpenSight { player };

    for _ in 0..800 {
        let threat = [Projectile {
            position: agent.position(),
            faction: Faction::Player,
        }];
        let _ = agent
            .tick(
                &AgentInputs {
                    dt: 0.02,
                    player: Some(player),
                    projectiles: &threat,
                },
                Senses {
                    health: &Hp(3),
                    vision: &vision,
                    pathfinder: &pathfinder,
                },
                None,
                &mut rng,
            )
            .expect("tick");
        assert!(
            pathfinder.is_walkable(CellCoord::containing(agent.position())),
            "agent left the corridor at {:?}",
            agent.position()
        );
    }

    assert_eq!(agent.state(), AgentState::Attack);
    assert!(agent.position().distance(player) <= agent.config().ideal_distance);
}

proptest! {
    #[test]
    fn identical_inputs_produce_identical_ticks(
        agent_cell in (0..16_i32, 0..16_i32),
        player_cell in (0..16_i32, 0..16_i32),
        health in 0..4_i32,
        threat in proptest::option::of((0.0..16.0_f32, 0.0..16.0_f32)),
        state_ticks in 0..40_usize,
        seed in any::<u64>(),
    ) {
        let pathfinder = open_floor(16);
        let agent_position = CellCoord::new(agent_cell.0, agent_cell.1).center();
        let player = CellCoord::new(player_cell.0, player_cell.1).center();
        let vision = OpenSight { player };
        let projectiles: Vec<Projectile> = threat
            .map(|(x, y)| Projectile { position: Vec2::new(x, y), faction: Faction::Player })
            .into_iter()
            .collect();

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut agent = AgentController::new(
            AgentId::new(9),
            agent_position,
            AgentConfig::default(),
            &mut rng,
        );
        let hp = Hp(health);
        let inputs = AgentInputs { dt: 0.02, player: Some(player), projectiles: &projectiles };

        for _ in 0..state_ticks {
            let senses = Senses { health: &hp, vision: &vision, pathfinder: &pathfinder };
            let _ = agent.tick(&inputs, senses, None, &mut rng).expect("tick");
        }

        let mut twin = agent.clone();
        let mut twin_rng = rng.clone();

        let senses = Senses { health: &hp, vision: &vision, pathfinder: &pathfinder };
        let first = agent.tick(&inputs, senses, None, &mut rng).expect("tick");
        let second = twin.tick(&inputs, senses, None, &mut twin_rng).expect("tick");

        prop_assert_eq!(first, second);
        prop_assert_eq!(agent.position(), twin.position());
        prop_assert_eq!(agent.state(), twin.state());
    }
}
