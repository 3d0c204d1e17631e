//! Interfaces implemented by the host environment.
//!
//! Rendering, physics and entity lifetimes live outside the core. The level
//! session reaches them only through these traits so the simulation stays
//! deterministic and testable without a game engine.

use glam::Vec2;
use thiserror::Error;

use crate::{AgentId, CellCoord, EntityHandle, EntityKind, Event, Tile};

/// Request handed to an [`EntityFactory`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnRequest {
    /// Type of entity to instantiate.
    pub kind: EntityKind,
    /// World-space position of the new entity.
    pub position: Vec2,
    /// Facing angle in radians, measured counter-clockwise from +x.
    pub orientation: f32,
}

/// Reasons an [`EntityFactory`] may refuse a spawn request.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SpawnError {
    /// The factory has no template registered for the requested kind.
    #[error("no template registered for {0:?}")]
    UnknownKind(EntityKind),
    /// The container that should own the entity is missing.
    #[error("spawn container `{0}` is missing")]
    MissingContainer(&'static str),
}

/// Instantiates and destroys entities on behalf of the core.
pub trait EntityFactory {
    /// Creates a new entity and returns its handle.
    fn spawn(&mut self, request: SpawnRequest) -> Result<EntityHandle, SpawnError>;

    /// Destroys the entity behind `handle`. Destruction may complete on a
    /// later frame; [`EntityFactory::live_entities`] reports when it has.
    fn destroy(&mut self, handle: EntityHandle);

    /// Number of entities created by this factory that still exist.
    fn live_entities(&self) -> usize;

    /// Weapon mounted on the entity, if it carries one.
    fn weapon(&mut self, handle: EntityHandle) -> Option<&mut dyn Weapon>;
}

/// External tile surface the generator writes the level to.
pub trait TileSurface {
    /// Places `tile` at `cell`, replacing whatever was there.
    fn set_tile(&mut self, cell: CellCoord, tile: Tile);

    /// Returns the tile currently placed at `cell`.
    fn tile(&self, cell: CellCoord) -> Option<Tile>;

    /// Removes every placed tile. Removal may complete on a later frame.
    fn clear(&mut self);

    /// Number of tiles currently placed on the surface.
    fn used_tile_count(&self) -> usize;
}

/// Fire collaborator. Implementations rate-limit themselves and own the
/// projectiles they create.
pub trait Weapon {
    /// Attempts to fire towards `direction`.
    fn fire(&mut self, direction: Vec2);
}

/// Health collaborator.
pub trait Health {
    /// Removes `amount` health.
    fn take_damage(&mut self, amount: i32);

    /// Remaining health.
    fn current_health(&self) -> i32;
}

/// Subject struck by a vision ray.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitSubject {
    /// The player.
    Player,
    /// Another agent.
    Agent(AgentId),
    /// Level geometry or any other opaque object.
    Obstacle,
}

/// First object struck by a ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// What the ray hit.
    pub subject: HitSubject,
    /// Distance from the ray origin to the hit.
    pub distance: f32,
}

/// Line-of-sight queries used by the vision cone.
pub trait VisionProbe {
    /// Casts a ray and reports the first hit that is not `caster`.
    fn cast_ray(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        caster: AgentId,
    ) -> Option<RayHit>;
}

/// Listener registered with a level session.
pub trait LevelObserver {
    /// Receives every event raised by the session, in order.
    fn on_event(&mut self, event: &Event);
}
