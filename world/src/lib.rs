#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative level session for Delve.
//!
//! A [`World`] owns everything tied to one play session: the installed
//! [`Level`], the pathfinder registration built from its floor, the agent
//! roster and the observers listening for events. Adapters mutate it only
//! through [`apply`] and read it through [`query`].

mod config;
pub mod headless;
mod health;
mod progression;
mod sight;
mod teardown;

use std::{fmt, time::Duration};

use delve_core::{
    AgentId, Command, EntityFactory, EntityHandle, EntityKind, Event, Health, LevelObserver,
    Projectile, SpawnError, SpawnRequest, TileSurface, VisionProbe,
};
use delve_system_agent::{AgentController, AgentError, AgentInputs, Senses};
use delve_system_generation::{DungeonGenerator, GenerationError, GenerationProcess, Level};
use delve_system_pathfinding::GridPathfinder;
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use config::{LootConfig, SessionConfig, TeardownConfig};
pub use health::HitPoints;
pub use progression::{DifficultyTier, ProgressionConfig};

use sight::LevelSight;
use teardown::Teardown;

/// Errors reported by [`apply`].
#[derive(Clone, Debug, Error, PartialEq)]
pub enum WorldError {
    /// The level configuration was rejected.
    #[error("level generation failed: {0}")]
    Generation(#[from] GenerationError),
    /// The entity factory refused a spawn request.
    #[error("entity spawn failed: {0}")]
    Spawn(#[from] SpawnError),
    /// An agent tick failed.
    #[error("agent tick failed: {0}")]
    Agent(#[from] AgentError),
    /// The command needs an installed level.
    #[error("no level is installed")]
    NoLevel,
    /// A stepwise generation pass is still running.
    #[error("level generation is still in progress")]
    GenerationPending,
    /// The previous level is still being torn down.
    #[error("level teardown is still in progress")]
    TeardownPending,
    /// The installed level already received its agents.
    #[error("agents were already spawned on this level")]
    AgentsAlreadySpawned,
    /// No live agent carries the identifier.
    #[error("unknown agent {0:?}")]
    UnknownAgent(AgentId),
}

/// Handle returned by [`World::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

/// Health pack lying on the level floor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pickup {
    /// Handle issued by the factory.
    pub handle: EntityHandle,
    /// World-space position.
    pub position: Vec2,
}

#[derive(Debug)]
struct AgentRecord {
    controller: AgentController,
    handle: EntityHandle,
    health: HitPoints,
}

/// Per-session context that owns the level and everything living in it.
pub struct World {
    config: SessionConfig,
    tier: DifficultyTier,
    factory: Box<dyn EntityFactory>,
    tiles: Box<dyn TileSurface>,
    vision: Option<Box<dyn VisionProbe>>,
    rng: ChaCha8Rng,
    level: Option<Level>,
    generation: Option<GenerationProcess<ChaCha8Rng>>,
    pathfinder: GridPathfinder,
    agents: Vec<AgentRecord>,
    roster_spawned: bool,
    pickups: Vec<Pickup>,
    next_agent_id: u32,
    observers: Vec<(ObserverId, Box<dyn LevelObserver>)>,
    next_observer_id: u64,
    teardown: Option<Teardown>,
    tick_index: u64,
}

impl World {
    /// Creates an empty session that spawns through `factory` and draws
    /// tiles on `tiles`.
    #[must_use]
    pub fn new(
        config: SessionConfig,
        factory: Box<dyn EntityFactory>,
        tiles: Box<dyn TileSurface>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let tier = DifficultyTier::initial(&config.progression);
        Self {
            config,
            tier,
            factory,
            tiles,
            vision: None,
            rng,
            level: None,
            generation: None,
            pathfinder: GridPathfinder::new(),
            agents: Vec::new(),
            roster_spawned: false,
            pickups: Vec::new(),
            next_agent_id: 0,
            observers: Vec::new(),
            next_observer_id: 0,
            teardown: None,
            tick_index: 0,
        }
    }

    /// Replaces the built-in line-of-sight check with a host probe.
    #[must_use]
    pub fn with_vision(mut self, probe: Box<dyn VisionProbe>) -> Self {
        self.vision = Some(probe);
        self
    }

    /// Registers an observer that receives every subsequent event.
    pub fn subscribe(&mut self, observer: Box<dyn LevelObserver>) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id = self.next_observer_id.saturating_add(1);
        self.observers.push((id, observer));
        id
    }

    /// Removes an observer. Returns `false` when it was not registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(registered, _)| *registered != id);
        self.observers.len() != before
    }

    fn notify(&mut self, events: &[Event]) {
        for event in events {
            for (_, observer) in &mut self.observers {
                observer.on_event(event);
            }
        }
    }

    fn ensure_idle(&self) -> Result<(), WorldError> {
        if self.generation.is_some() {
            return Err(WorldError::GenerationPending);
        }
        if self.teardown.is_some() {
            return Err(WorldError::TeardownPending);
        }
        Ok(())
    }

    fn destroy_entities(&mut self) {
        for record in self.agents.drain(..) {
            self.factory.destroy(record.handle);
        }
        for pickup in self.pickups.drain(..) {
            self.factory.destroy(pickup.handle);
        }
    }

    fn discard_level(&mut self) {
        self.destroy_entities();
        self.tiles.clear();
        self.pathfinder.reset();
        self.roster_spawned = false;
        self.level = None;
    }

    fn generate_level(&mut self, out_events: &mut Vec<Event>) -> Result<(), WorldError> {
        self.ensure_idle()?;
        self.discard_level();

        let shadowed = self.tier.shadowed_fields(&self.config.generation);
        if !shadowed.is_empty() {
            warn!(
                fields = ?shadowed,
                level = self.tier.level(),
                "generation settings replaced by the difficulty tier"
            );
        }
        let config = self.tier.generation_config(&self.config.generation);
        let step_by_step = config.step_by_step;
        let generator = DungeonGenerator::new(config)?;
        let process = generator.start(ChaCha8Rng::seed_from_u64(self.rng.gen()))?;
        info!(
            level = self.tier.level(),
            width = self.tier.width(),
            height = self.tier.height(),
            step_by_step,
            "generating level"
        );

        if step_by_step {
            self.generation = Some(process);
        } else {
            self.install(process.run_to_completion(), out_events);
        }
        Ok(())
    }

    fn install(&mut self, level: Level, out_events: &mut Vec<Event>) {
        for (cell, tile) in level.tiles() {
            self.tiles.set_tile(cell, tile);
        }
        self.pathfinder.initialize(level.walkable_cells());
        out_events.push(Event::LevelGenerated {
            rooms: level.rooms().len(),
            floor_cells: level.floor().len(),
        });
        self.level = Some(level);
    }

    fn advance_generation(&mut self, out_events: &mut Vec<Event>) {
        let Some(mut process) = self.generation.take() else {
            return;
        };
        if let Some(report) = process.step() {
            out_events.push(Event::GenerationAdvanced {
                stage: report.stage,
            });
        }
        match process.finish() {
            Ok(level) => self.install(level, out_events),
            Err(pending) => self.generation = Some(pending),
        }
    }

    fn spawn_agents(&mut self, out_events: &mut Vec<Event>) -> Result<(), WorldError> {
        self.ensure_idle()?;
        let Some(level) = self.level.as_ref() else {
            return Err(WorldError::NoLevel);
        };
        if self.roster_spawned {
            return Err(WorldError::AgentsAlreadySpawned);
        }

        // Every handle is obtained before any controller draws from the
        // session rng, so a refused batch leaves the rng untouched.
        let mut handles: Vec<(EntityHandle, Vec2)> = Vec::new();
        for &position in level.spawn_points() {
            let request = SpawnRequest {
                kind: EntityKind::Enemy,
                position,
                orientation: 0.0,
            };
            match self.factory.spawn(request) {
                Ok(handle) => handles.push((handle, position)),
                Err(error) => {
                    warn!(%error, spawned = handles.len(), "agent spawn refused; rolling back");
                    for (handle, _) in handles {
                        self.factory.destroy(handle);
                    }
                    return Err(error.into());
                }
            }
        }

        info!(agents = handles.len(), "agents spawned");
        for (handle, position) in handles {
            let id = AgentId::new(self.next_agent_id);
            self.next_agent_id = self.next_agent_id.saturating_add(1);
            let controller =
                AgentController::new(id, position, self.config.agent.clone(), &mut self.rng);
            out_events.push(Event::AgentSpawned {
                agent: id,
                handle,
                position,
            });
            self.agents.push(AgentRecord {
                controller,
                handle,
                health: HitPoints::full(self.config.agent.max_health),
            });
        }
        self.roster_spawned = true;
        Ok(())
    }

    fn tick(
        &mut self,
        dt: Duration,
        player: Option<Vec2>,
        projectiles: &[Projectile],
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        self.tick_index = self.tick_index.saturating_add(1);
        out_events.push(Event::TimeAdvanced { dt });

        if self.generation.is_some() {
            self.advance_generation(out_events);
            return Ok(());
        }

        if let Some(teardown) = self.teardown.as_mut() {
            if teardown.poll(dt, self.factory.live_entities(), self.tiles.used_tile_count()) {
                self.teardown = None;
                out_events.push(Event::LevelCleared);
            }
            return Ok(());
        }

        self.tick_agents(dt, player, projectiles, out_events)
    }

    fn tick_agents(
        &mut self,
        dt: Duration,
        player: Option<Vec2>,
        projectiles: &[Projectile],
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        let positions: Vec<(AgentId, Vec2)> = self
            .agents
            .iter()
            .map(|record| (record.controller.id(), record.controller.position()))
            .collect();
        let sight = LevelSight {
            level: self.level.as_ref(),
            player,
            agents: &positions,
        };
        let vision: &dyn VisionProbe = match self.vision.as_deref() {
            Some(probe) => probe,
            None => &sight,
        };
        let inputs = AgentInputs {
            dt: dt.as_secs_f32(),
            player,
            projectiles,
        };

        for record in &mut self.agents {
            let senses = Senses {
                health: &record.health,
                vision,
                pathfinder: &self.pathfinder,
            };
            let weapon = self.factory.weapon(record.handle);
            let outcome = record
                .controller
                .tick(&inputs, senses, weapon, &mut self.rng)?;
            if outcome.transitioned() {
                out_events.push(Event::AgentStateChanged {
                    agent: record.controller.id(),
                    from: outcome.from,
                    to: outcome.to,
                });
            }
        }
        Ok(())
    }

    fn damage_agent(
        &mut self,
        agent: AgentId,
        amount: i32,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        let Some(index) = self
            .agents
            .iter()
            .position(|record| record.controller.id() == agent)
        else {
            return Err(WorldError::UnknownAgent(agent));
        };

        let record = &mut self.agents[index];
        record.health.take_damage(amount);
        debug!(
            agent = agent.get(),
            amount,
            health = record.health.current_health(),
            "agent damaged"
        );
        if !record.health.is_depleted() {
            return Ok(());
        }

        let record = self.agents.remove(index);
        let position = record.controller.position();
        self.factory.destroy(record.handle);
        out_events.push(Event::AgentKilled { agent });

        if self.agents.is_empty() {
            info!("all enemies killed");
            out_events.push(Event::AllEnemiesKilled);
            return Ok(());
        }

        if self.rng.gen::<f64>() < self.config.loot.health_pack_chance {
            let request = SpawnRequest {
                kind: EntityKind::HealthPack,
                position,
                orientation: 0.0,
            };
            match self.factory.spawn(request) {
                Ok(handle) => {
                    self.pickups.push(Pickup { handle, position });
                    out_events.push(Event::PickupDropped { handle, position });
                }
                Err(error) => warn!(%error, "health pack spawn refused"),
            }
        }
        Ok(())
    }

    fn clear_level(&mut self) -> Result<(), WorldError> {
        self.ensure_idle()?;
        self.discard_level();
        self.teardown = Some(Teardown::start(&self.config.teardown));
        info!("level teardown started");
        Ok(())
    }

    fn advance_difficulty(&mut self, out_events: &mut Vec<Event>) {
        if self.tier.advance(&self.config.progression) {
            info!(level = self.tier.level(), "difficulty advanced");
            out_events.push(Event::DifficultyChanged {
                level: self.tier.level(),
            });
        } else {
            warn!(
                level = self.tier.level(),
                "already at the maximum level; difficulty unchanged"
            );
        }
    }

    fn reset_difficulty(&mut self, out_events: &mut Vec<Event>) {
        self.tier = DifficultyTier::initial(&self.config.progression);
        info!("difficulty reset");
        out_events.push(Event::DifficultyChanged {
            level: self.tier.level(),
        });
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("tier", &self.tier)
            .field("level", &self.level.is_some())
            .field("generating", &self.generation.is_some())
            .field("tearing_down", &self.teardown.is_some())
            .field("agents", &self.agents.len())
            .field("pickups", &self.pickups.len())
            .field("observers", &self.observers.len())
            .field("tick_index", &self.tick_index)
            .finish_non_exhaustive()
    }
}

/// Applies the provided command to the world.
///
/// Events raised by the command are appended to `out_events` and delivered to
/// every registered observer, including the events raised before a failure.
pub fn apply(
    world: &mut World,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), WorldError> {
    let first_new = out_events.len();
    let result = match command {
        Command::GenerateLevel => world.generate_level(out_events),
        Command::SpawnAgents => world.spawn_agents(out_events),
        Command::Tick {
            dt,
            player,
            projectiles,
        } => world.tick(dt, player, &projectiles, out_events),
        Command::DamageAgent { agent, amount } => world.damage_agent(agent, amount, out_events),
        Command::ClearLevel => world.clear_level(),
        Command::AdvanceDifficulty => {
            world.advance_difficulty(out_events);
            Ok(())
        }
        Command::ResetDifficulty => {
            world.reset_difficulty(out_events);
            Ok(())
        }
    };
    world.notify(&out_events[first_new..]);
    result
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use delve_core::{AgentId, AgentState, CellCoord, EntityHandle, GenerationStage, Health, Tile};
    use delve_system_generation::Level;
    use delve_system_pathfinding::GridPathfinder;
    use glam::Vec2;

    use super::{DifficultyTier, Pickup, World};

    /// Point-in-time view of a single agent.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct AgentSnapshot {
        /// Identifier of the agent.
        pub id: AgentId,
        /// Handle issued by the factory.
        pub handle: EntityHandle,
        /// World-space position.
        pub position: Vec2,
        /// Unit vector the agent faces.
        pub facing: Vec2,
        /// Behaviour state.
        pub state: AgentState,
        /// Remaining health.
        pub health: i32,
    }

    /// The installed level, if any.
    #[must_use]
    pub fn level(world: &World) -> Option<&Level> {
        world.level.as_ref()
    }

    /// Pathfinder registered with the installed level's floor.
    #[must_use]
    pub fn pathfinder(world: &World) -> &GridPathfinder {
        &world.pathfinder
    }

    /// Captures every live agent in spawn order.
    #[must_use]
    pub fn agents(world: &World) -> Vec<AgentSnapshot> {
        world
            .agents
            .iter()
            .map(|record| AgentSnapshot {
                id: record.controller.id(),
                handle: record.handle,
                position: record.controller.position(),
                facing: record.controller.facing(),
                state: record.controller.state(),
                health: record.health.current_health(),
            })
            .collect()
    }

    /// Number of live enemies.
    #[must_use]
    pub fn enemy_count(world: &World) -> usize {
        world.agents.len()
    }

    /// Health packs dropped on the current level.
    #[must_use]
    pub fn pickups(world: &World) -> &[Pickup] {
        &world.pickups
    }

    /// Active difficulty tier.
    #[must_use]
    pub fn difficulty(world: &World) -> DifficultyTier {
        world.tier
    }

    /// Stage the running stepwise generation will execute next.
    #[must_use]
    pub fn pending_generation_stage(world: &World) -> Option<GenerationStage> {
        world
            .generation
            .as_ref()
            .and_then(|process| process.next_stage())
    }

    /// Reports whether a stepwise generation pass is running.
    #[must_use]
    pub fn is_generating(world: &World) -> bool {
        world.generation.is_some()
    }

    /// Reports whether a teardown is waiting on the host.
    #[must_use]
    pub fn is_tearing_down(world: &World) -> bool {
        world.teardown.is_some()
    }

    /// Tile placed on the surface at `cell`.
    #[must_use]
    pub fn tile(world: &World, cell: CellCoord) -> Option<Tile> {
        world.tiles.tile(cell)
    }

    /// Number of tiles currently placed on the surface.
    #[must_use]
    pub fn used_tiles(world: &World) -> usize {
        world.tiles.used_tile_count()
    }

    /// Number of entities the factory reports alive.
    #[must_use]
    pub fn live_entities(world: &World) -> usize {
        world.factory.live_entities()
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }
}
