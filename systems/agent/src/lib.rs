#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Finite-state controller that drives a single enemy agent.
//!
//! Every tick the controller evaluates, in order, the flee check, the threat
//! override and the behaviour of its current [`AgentState`]. Movement asks
//! the [`GridPathfinder`] for a route and advances towards its second cell.
//! The controller never mutates level topology; it only reads positions,
//! queries collaborators and moves itself.

mod config;
mod targets;
mod vision;

use delve_core::{AgentId, AgentState, CellCoord, Faction, Health, Projectile, VisionProbe, Weapon};
use delve_system_pathfinding::{GridPathfinder, PathfindingError};
use glam::Vec2;
use rand::Rng;
use thiserror::Error;
use tracing::trace;

pub use config::{AgentConfig, VisionConfig};
pub use vision::cone_directions;

/// Errors that abort an agent tick.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    /// The pathfinder reported a setup problem.
    #[error(transparent)]
    Pathfinding(#[from] PathfindingError),
}

/// World state observed by an agent during one tick.
#[derive(Clone, Copy, Debug)]
pub struct AgentInputs<'a> {
    /// Seconds of simulated time covered by the tick.
    pub dt: f32,
    /// Player position, if a player is present.
    pub player: Option<Vec2>,
    /// Projectiles currently in flight.
    pub projectiles: &'a [Projectile],
}

/// Collaborators an agent reads from during a tick.
#[derive(Clone, Copy)]
pub struct Senses<'a> {
    /// Health of the agent.
    pub health: &'a dyn Health,
    /// Line-of-sight queries.
    pub vision: &'a dyn VisionProbe,
    /// Pathfinder holding the walkable set. Its cells double as the allowed
    /// patrol and flee cells.
    pub pathfinder: &'a GridPathfinder,
}

/// Summary of what happened during one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickOutcome {
    /// State before the tick.
    pub from: AgentState,
    /// State after the tick.
    pub to: AgentState,
    /// Whether the agent moved.
    pub moved: bool,
    /// Whether the agent asked its weapon to fire.
    pub fired: bool,
}

impl TickOutcome {
    fn unchanged(state: AgentState) -> Self {
        Self {
            from: state,
            to: state,
            moved: false,
            fired: false,
        }
    }

    /// Reports whether the state changed during the tick.
    #[must_use]
    pub fn transitioned(&self) -> bool {
        self.from != self.to
    }
}

/// Behaviour state machine for one agent.
#[derive(Clone, Debug)]
pub struct AgentController {
    id: AgentId,
    config: AgentConfig,
    position: Vec2,
    facing: Vec2,
    state: AgentState,
    idle_timer: f32,
    flee_timer: f32,
    flee_cooldown: f32,
    patrol_target: Option<Vec2>,
    flee_target: Option<Vec2>,
}

impl AgentController {
    /// Creates an idle agent with a freshly drawn idle timer.
    pub fn new<R>(id: AgentId, position: Vec2, config: AgentConfig, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let idle_timer = config.random_idle_time(rng);
        Self {
            id,
            config,
            position,
            facing: Vec2::NEG_Y,
            state: AgentState::Idle,
            idle_timer,
            flee_timer: 0.0,
            flee_cooldown: 0.0,
            patrol_target: None,
            flee_target: None,
        }
    }

    /// Identifier of the agent.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Current behaviour state.
    #[must_use]
    pub const fn state(&self) -> AgentState {
        self.state
    }

    /// World-space position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Unit vector the agent faces.
    #[must_use]
    pub const fn facing(&self) -> Vec2 {
        self.facing
    }

    /// Configuration driving the agent.
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Remaining idle time in seconds.
    #[must_use]
    pub const fn idle_timer(&self) -> f32 {
        self.idle_timer
    }

    /// Remaining flee time in seconds.
    #[must_use]
    pub const fn flee_timer(&self) -> f32 {
        self.flee_timer
    }

    /// Seconds until another flee episode may start. Negative once elapsed.
    #[must_use]
    pub const fn flee_cooldown(&self) -> f32 {
        self.flee_cooldown
    }

    /// Point the agent patrols towards.
    #[must_use]
    pub const fn patrol_target(&self) -> Option<Vec2> {
        self.patrol_target
    }

    /// Point the agent flees towards.
    #[must_use]
    pub const fn flee_target(&self) -> Option<Vec2> {
        self.flee_target
    }

    /// Advances the state machine by one tick.
    ///
    /// Without a player nothing happens. Otherwise the flee check runs first
    /// and ends the tick when it triggers; then a nearby player projectile
    /// forces pursuit; then the current state's behaviour runs.
    pub fn tick<R>(
        &mut self,
        inputs: &AgentInputs<'_>,
        senses: Senses<'_>,
        weapon: Option<&mut dyn Weapon>,
        rng: &mut R,
    ) -> Result<TickOutcome, AgentError>
    where
        R: Rng + ?Sized,
    {
        let mut outcome = TickOutcome::unchanged(self.state);
        let Some(player) = inputs.player else {
            return Ok(outcome);
        };

        let dt = inputs.dt;
        let distance = self.position.distance(player);
        self.flee_cooldown -= dt;

        if self.state != AgentState::Flee
            && self.flee_cooldown <= 0.0
            && senses.health.current_health() <= self.config.flee_health_threshold
            && rng.gen::<f32>() <= self.config.flee_chance
        {
            self.start_flee(player, senses.pathfinder, rng);
            outcome.to = self.state;
            self.trace_transition(&outcome);
            return Ok(outcome);
        }

        if self.threat_nearby(inputs.projectiles) {
            self.state = AgentState::Pursue;
        }

        match self.state {
            AgentState::Idle => {
                self.idle_timer -= dt;
                if self.idle_timer <= 0.0 {
                    self.state = AgentState::Patrol;
                }
                if distance <= self.config.ideal_distance && self.can_see_player(senses.vision) {
                    self.state = AgentState::Pursue;
                }
            }
            AgentState::Patrol => {
                if distance <= self.config.detection_range && self.can_see_player(senses.vision) {
                    self.state = AgentState::Pursue;
                } else {
                    let target = self.next_patrol_target(senses.pathfinder, rng);
                    outcome.moved = self.move_towards(
                        target,
                        self.config.patrol_speed,
                        dt,
                        senses.pathfinder,
                    )?;
                }
            }
            AgentState::Pursue => {
                if distance <= self.config.ideal_distance {
                    self.state = AgentState::Attack;
                } else {
                    outcome.moved =
                        self.move_towards(player, self.config.speed, dt, senses.pathfinder)?;
                }
            }
            AgentState::Attack => {
                if distance > self.config.ideal_distance + self.config.dead_zone {
                    self.state = AgentState::Pursue;
                } else {
                    let direction = (player - self.position).normalize_or_zero();
                    if direction != Vec2::ZERO {
                        self.facing = direction;
                    }
                    if let Some(weapon) = weapon {
                        weapon.fire(direction);
                        outcome.fired = true;
                    }
                }
            }
            AgentState::Flee => {
                self.flee_timer -= dt;
                if self.flee_timer <= 0.0 {
                    self.flee_target = None;
                    self.state = AgentState::Idle;
                    self.idle_timer = self.config.random_idle_time(rng);
                } else if let Some(target) = self.flee_target {
                    outcome.moved =
                        self.move_towards(target, self.config.flee_speed, dt, senses.pathfinder)?;
                } else {
                    self.flee_target = Some(self.pick_flee_target(player, senses.pathfinder, rng));
                }
            }
        }

        outcome.to = self.state;
        self.trace_transition(&outcome);
        Ok(outcome)
    }

    fn start_flee<R>(&mut self, player: Vec2, pathfinder: &GridPathfinder, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        self.state = AgentState::Flee;
        self.flee_timer = self.config.flee_duration;
        self.flee_target = Some(self.pick_flee_target(player, pathfinder, rng));
        self.flee_cooldown = self.config.flee_cooldown;
    }

    fn pick_flee_target<R>(&self, player: Vec2, pathfinder: &GridPathfinder, rng: &mut R) -> Vec2
    where
        R: Rng + ?Sized,
    {
        targets::flee_target(
            self.position,
            player,
            self.config.flee_radius,
            |cell| pathfinder.is_walkable(cell),
            rng,
        )
    }

    fn next_patrol_target<R>(&mut self, pathfinder: &GridPathfinder, rng: &mut R) -> Vec2
    where
        R: Rng + ?Sized,
    {
        let reached = self
            .patrol_target
            .map_or(true, |target| {
                self.position.distance(target) < self.config.patrol_tolerance
            });
        if reached {
            if let Some(target) = targets::sample_patrol_target(
                self.position,
                self.config.patrol_radius,
                |cell| pathfinder.is_walkable(cell),
                rng,
            ) {
                self.patrol_target = Some(target);
            }
        }
        self.patrol_target.unwrap_or(self.position)
    }

    fn threat_nearby(&self, projectiles: &[Projectile]) -> bool {
        projectiles.iter().any(|projectile| {
            projectile.faction == Faction::Player
                && projectile.position.distance(self.position) <= self.config.threat_radius
        })
    }

    fn can_see_player(&self, probe: &dyn VisionProbe) -> bool {
        vision::player_visible(
            probe,
            self.id,
            self.position,
            self.facing,
            &self.config.vision,
            self.config.detection_range,
        )
    }

    /// Steps towards the centre of the second cell of the route to `target`,
    /// stopping on that centre rather than passing it. Returns whether the
    /// agent moved.
    fn move_towards(
        &mut self,
        target: Vec2,
        speed: f32,
        dt: f32,
        pathfinder: &GridPathfinder,
    ) -> Result<bool, AgentError> {
        let start = CellCoord::containing(self.position);
        let goal = CellCoord::containing(target);
        let Some(next) = pathfinder
            .find_path(start, goal)?
            .and_then(|path| path.next_step())
        else {
            return Ok(false);
        };

        let offset = next.center() - self.position;
        let direction = offset.normalize_or_zero();
        if direction == Vec2::ZERO {
            return Ok(false);
        }
        let stride = speed * dt;
        if stride >= offset.length() {
            self.position = next.center();
        } else {
            self.position += direction * stride;
        }
        self.facing = direction;
        Ok(true)
    }

    fn trace_transition(&self, outcome: &TickOutcome) {
        if outcome.transitioned() {
            trace!(
                agent = self.id.get(),
                from = %outcome.from,
                to = %outcome.to,
                "agent state changed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delve_core::{HitSubject, RayHit};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct FixedHealth(i32);

    impl Health for FixedHealth {
        fn take_damage(&mut self, amount: i32) {
            self.0 -= amount;
        }

        fn current_health(&self) -> i32 {
            self.0
        }
    }

    struct Sight(bool);

    impl VisionProbe for Sight {
        fn cast_ray(&self, _: Vec2, _: Vec2, _: f32, _: AgentId) -> Option<RayHit> {
            Some(RayHit {
                subject: if self.0 {
                    HitSubject::Player
                } else {
                    HitSubject::Obstacle
                },
                distance: 1.0,
            })
        }
    }

    #[derive(Default)]
    struct CountingWeapon {
        shots: Vec<Vec2>,
    }

    impl Weapon for CountingWeapon {
        fn fire(&mut self, direction: Vec2) {
            self.shots.push(direction);
        }
    }

    fn open_floor(size: i32) -> GridPathfinder {
        let mut pathfinder = GridPathfinder::new();
        pathfinder.initialize(
            (0..size).flat_map(|y| (0..size).map(move |x| CellCoord::new(x, y))),
        );
        pathfinder
    }

    fn agent_at(position: Vec2, state: AgentState) -> AgentController {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut agent =
            AgentController::new(AgentId::new(1), position, AgentConfig::default(), &mut rng);
        agent.state = state;
        agent.idle_timer = 2.0;
        agent
    }

    fn inputs(player: Option<Vec2>, projectiles: &[Projectile]) -> AgentInputs<'_> {
        AgentInputs {
            dt: 0.02,
            player,
            projectiles,
        }
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn nothing_happens_without_a_player() {
        let pathfinder = open_floor(10);
        let mut agent = agent_at(Vec2::new(2.5, 2.5), AgentState::Pursue);
        let senses = Senses {
            health: &FixedHealth(0),
            vision: &Sight(true),
            pathfinder: &pathfinder,
        };

        let outcome = agent
            .tick(&inputs(None, &[]), senses, None, &mut rng())
            .expect("tick");

        assert!(!outcome.transitioned());
        assert_eq!(agent.position(), Vec2::new(2.5, 2.5));
        assert_eq!(agent.flee_cooldown(), 0.0);
    }

    #[test]
    fn flee_check_runs_before_threat_override() {
        let pathfinder = open_floor(20);
        let mut agent = agent_at(Vec2::new(10.5, 10.5), AgentState::Attack);
        agent.config.flee_chance = 1.0;
        let threat = [Projectile {
            position: Vec2::new(10.0, 10.0),
            faction: Faction::Player,
        }];
        let senses = Senses {
            health: &FixedHealth(1),
            vision: &Sight(true),
            pathfinder: &pathfinder,
        };

        let outcome = agent
            .tick(
                &inputs(Some(Vec2::new(8.5, 10.5)), &threat),
                senses,
                None,
                &mut rng(),
            )
            .expect("tick");

        assert_eq!(outcome.to, AgentState::Flee);
        assert!(agent.flee_target().is_some());
        assert_eq!(agent.flee_timer(), agent.config().flee_duration);
        assert_eq!(agent.flee_cooldown(), agent.config().flee_cooldown);
        assert!(!outcome.moved);
    }

    #[test]
    fn threat_override_redirects_attack_into_pursuit() {
        let pathfinder = open_floor(20);
        let mut agent = agent_at(Vec2::new(10.5, 10.5), AgentState::Attack);
        let threat = [Projectile {
            position: Vec2::new(11.0, 10.5),
            faction: Faction::Player,
        }];
        let senses = Senses {
            health: &FixedHealth(3),
            vision: &Sight(false),
            pathfinder: &pathfinder,
        };
        let mut weapon = CountingWeapon::default();

        let outcome = agent
            .tick(
                &inputs(Some(Vec2::new(12.5, 10.5)), &threat),
                senses,
                Some(&mut weapon),
                &mut rng(),
            )
            .expect("tick");

        // Pursue runs in the same tick and switches to Attack because the
        // player is within the ideal distance.
        assert_eq!(outcome.to, AgentState::Attack);
        assert!(weapon.shots.is_empty());
    }

    #[test]
    fn enemy_projectiles_are_ignored() {
        let pathfinder = open_floor(20);
        let mut agent = agent_at(Vec2::new(10.5, 10.5), AgentState::Idle);
        let friendly = [Projectile {
            position: Vec2::new(10.5, 10.5),
            faction: Faction::Enemy,
        }];
        let senses = Senses {
            health: &FixedHealth(3),
            vision: &Sight(false),
            pathfinder: &pathfinder,
        };

        let outcome = agent
            .tick(
                &inputs(Some(Vec2::new(1.5, 1.5)), &friendly),
                senses,
                None,
                &mut rng(),
            )
            .expect("tick");
        assert_eq!(outcome.to, AgentState::Idle);
    }

    #[test]
    fn idle_sees_nearby_player_and_pursues() {
        let pathfinder = open_floor(20);
        let mut agent = agent_at(Vec2::new(10.5, 10.5), AgentState::Idle);
        let senses = Senses {
            health: &FixedHealth(3),
            vision: &Sight(true),
            pathfinder: &pathfinder,
        };

        let outcome = agent
            .tick(&inputs(Some(Vec2::new(12.5, 10.5)), &[]), senses, None, &mut rng())
            .expect("tick");
        assert_eq!(outcome.to, AgentState::Pursue);
    }

    #[test]
    fn idle_timer_expiry_starts_patrol() {
        let pathfinder = open_floor(20);
        let mut agent = agent_at(Vec2::new(10.5, 10.5), AgentState::Idle);
        agent.idle_timer = 0.01;
        let senses = Senses {
            health: &FixedHealth(3),
            vision: &Sight(false),
            pathfinder: &pathfinder,
        };

        let outcome = agent
            .tick(&inputs(Some(Vec2::new(1.5, 1.5)), &[]), senses, None, &mut rng())
            .expect("tick");
        assert_eq!(outcome.to, AgentState::Patrol);
    }

    #[test]
    fn attack_fires_and_faces_player() {
        let pathfinder = open_floor(20);
        let mut agent = agent_at(Vec2::new(10.5, 10.5), AgentState::Attack);
        let senses = Senses {
            health: &FixedHealth(3),
            vision: &Sight(true),
            pathfinder: &pathfinder,
        };
        let mut weapon = CountingWeapon::default();

        let outcome = agent
            .tick(
                &inputs(Some(Vec2::new(10.5, 13.5)), &[]),
                senses,
                Some(&mut weapon),
                &mut rng(),
            )
            .expect("tick");

        assert!(outcome.fired);
        assert_eq!(weapon.shots, vec![Vec2::Y]);
        assert_eq!(agent.facing(), Vec2::Y);
    }

    #[test]
    fn attack_breaks_off_beyond_dead_zone() {
        let pathfinder = open_floor(20);
        let mut agent = agent_at(Vec2::new(0.5, 0.5), AgentState::Attack);
        let senses = Senses {
            health: &FixedHealth(3),
            vision: &Sight(true),
            pathfinder: &pathfinder,
        };

        let outcome = agent
            .tick(&inputs(Some(Vec2::new(6.5, 0.5)), &[]), senses, None, &mut rng())
            .expect("tick");
        assert_eq!(outcome.to, AgentState::Pursue);
        assert!(!outcome.fired);
    }

    #[test]
    fn pursuit_steps_along_the_route() {
        let pathfinder = open_floor(20);
        let mut agent = agent_at(Vec2::new(0.5, 0.5), AgentState::Pursue);
        let senses = Senses {
            health: &FixedHealth(3),
            vision: &Sight(true),
            pathfinder: &pathfinder,
        };

        let outcome = agent
            .tick(&inputs(Some(Vec2::new(15.5, 0.5)), &[]), senses, None, &mut rng())
            .expect("tick");

        assert!(outcome.moved);
        let expected = Vec2::new(0.5 + agent.config().speed * 0.02, 0.5);
        assert!(agent.position().abs_diff_eq(expected, 1e-5));
        assert_eq!(agent.facing(), Vec2::X);
    }

    #[test]
    fn patrol_keeps_previous_target_when_sampling_misses() {
        let mut pathfinder = GridPathfinder::new();
        pathfinder.initialize([CellCoord::new(50, 50), CellCoord::new(51, 50)]);
        let mut agent = agent_at(Vec2::new(10.5, 10.5), AgentState::Patrol);
        let previous = Vec2::new(10.6, 10.5);
        agent.patrol_target = Some(previous);
        let senses = Senses {
            health: &FixedHealth(3),
            vision: &Sight(false),
            pathfinder: &pathfinder,
        };

        let outcome = agent
            .tick(&inputs(Some(Vec2::new(40.5, 40.5)), &[]), senses, None, &mut rng())
            .expect("tick");

        assert_eq!(outcome.to, AgentState::Patrol);
        assert_eq!(agent.patrol_target(), Some(previous));
        assert!(!outcome.moved);
        assert_eq!(agent.position(), Vec2::new(10.5, 10.5));
    }

    #[test]
    fn movement_stops_on_the_next_cell_centre() {
        let pathfinder = open_floor(20);
        let mut agent = agent_at(Vec2::new(1.45, 0.5), AgentState::Pursue);
        let senses = Senses {
            health: &FixedHealth(3),
            vision: &Sight(true),
            pathfinder: &pathfinder,
        };

        let long_tick = AgentInputs {
            dt: 1.0,
            ..inputs(Some(Vec2::new(15.5, 0.5)), &[])
        };

        let outcome = agent
            .tick(&long_tick, senses, None, &mut rng())
            .expect("tick");

        assert!(outcome.moved);
        assert_eq!(agent.position(), CellCoord::new(2, 0).center());
    }

    #[test]
    fn flee_expiry_returns_to_idle() {
        let pathfinder = open_floor(20);
        let mut agent = agent_at(Vec2::new(5.5, 5.5), AgentState::Flee);
        agent.flee_timer = 0.01;
        agent.flee_target = Some(Vec2::new(9.5, 9.5));
        agent.flee_cooldown = 3.0;
        let senses = Senses {
            health: &FixedHealth(1),
            vision: &Sight(true),
            pathfinder: &pathfinder,
        };

        let outcome = agent
            .tick(&inputs(Some(Vec2::new(1.5, 1.5)), &[]), senses, None, &mut rng())
            .expect("tick");

        assert_eq!(outcome.to, AgentState::Idle);
        assert_eq!(agent.flee_target(), None);
        assert!(agent.idle_timer() >= agent.config().idle_min);
    }

    #[test]
    fn uninitialized_pathfinder_surfaces_as_error() {
        let pathfinder = GridPathfinder::new();
        let mut agent = agent_at(Vec2::new(0.5, 0.5), AgentState::Pursue);
        let senses = Senses {
            health: &FixedHealth(3),
            vision: &Sight(true),
            pathfinder: &pathfinder,
        };

        let result = agent.tick(&inputs(Some(Vec2::new(15.5, 0.5)), &[]), senses, None, &mut rng());
        assert_eq!(
            result,
            Err(AgentError::Pathfinding(PathfindingError::NotInitialized))
        );
    }
}
