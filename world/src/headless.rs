//! In-memory collaborators for running a session without a game engine.

use std::collections::BTreeMap;

use delve_core::{
    CellCoord, EntityFactory, EntityHandle, EntityKind, SpawnError, SpawnRequest, Tile,
    TileSurface, Weapon,
};
use glam::Vec2;

/// Weapon that records the shots requested of it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeadlessWeapon {
    shots: u64,
    last_direction: Option<Vec2>,
}

impl HeadlessWeapon {
    /// Number of times the weapon was fired.
    #[must_use]
    pub const fn shots(&self) -> u64 {
        self.shots
    }

    /// Direction of the most recent shot.
    #[must_use]
    pub const fn last_direction(&self) -> Option<Vec2> {
        self.last_direction
    }
}

impl Weapon for HeadlessWeapon {
    fn fire(&mut self, direction: Vec2) {
        self.shots = self.shots.saturating_add(1);
        self.last_direction = Some(direction);
    }
}

#[derive(Clone, Debug)]
struct HeadlessEntity {
    kind: EntityKind,
    position: Vec2,
    weapon: Option<HeadlessWeapon>,
}

/// Entity factory that keeps entities in a map and destroys them at once.
///
/// Enemies carry a [`HeadlessWeapon`]; health packs carry nothing. An
/// optional capacity makes the factory refuse requests once that many
/// entities are alive, which stands in for a missing spawn container.
#[derive(Clone, Debug, Default)]
pub struct HeadlessFactory {
    entities: BTreeMap<EntityHandle, HeadlessEntity>,
    next_handle: u64,
    capacity: Option<usize>,
}

impl HeadlessFactory {
    /// Creates an unbounded factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory that refuses requests once `capacity` entities are
    /// alive.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Kind and position of a live entity.
    #[must_use]
    pub fn entity(&self, handle: EntityHandle) -> Option<(EntityKind, Vec2)> {
        self.entities
            .get(&handle)
            .map(|entity| (entity.kind, entity.position))
    }

    /// Shots fired by every live entity.
    #[must_use]
    pub fn total_shots(&self) -> u64 {
        self.entities
            .values()
            .filter_map(|entity| entity.weapon.as_ref())
            .map(HeadlessWeapon::shots)
            .sum()
    }
}

impl EntityFactory for HeadlessFactory {
    fn spawn(&mut self, request: SpawnRequest) -> Result<EntityHandle, SpawnError> {
        if self
            .capacity
            .is_some_and(|capacity| self.entities.len() >= capacity)
        {
            return Err(SpawnError::MissingContainer("headless entities"));
        }

        let handle = EntityHandle::new(self.next_handle);
        self.next_handle = self.next_handle.saturating_add(1);
        let weapon = match request.kind {
            EntityKind::Enemy => Some(HeadlessWeapon::default()),
            EntityKind::HealthPack => None,
        };
        let _ = self.entities.insert(
            handle,
            HeadlessEntity {
                kind: request.kind,
                position: request.position,
                weapon,
            },
        );
        Ok(handle)
    }

    fn destroy(&mut self, handle: EntityHandle) {
        let _ = self.entities.remove(&handle);
    }

    fn live_entities(&self) -> usize {
        self.entities.len()
    }

    fn weapon(&mut self, handle: EntityHandle) -> Option<&mut dyn Weapon> {
        self.entities
            .get_mut(&handle)
            .and_then(|entity| entity.weapon.as_mut())
            .map(|weapon| weapon as &mut dyn Weapon)
    }
}

/// Tile surface backed by an ordered map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeadlessTiles {
    tiles: BTreeMap<CellCoord, Tile>,
}

impl HeadlessTiles {
    /// Creates an empty surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterates over the placed tiles in cell order.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, Tile)> + '_ {
        self.tiles.iter().map(|(cell, tile)| (*cell, *tile))
    }
}

impl TileSurface for HeadlessTiles {
    fn set_tile(&mut self, cell: CellCoord, tile: Tile) {
        let _ = self.tiles.insert(cell, tile);
    }

    fn tile(&self, cell: CellCoord) -> Option<Tile> {
        self.tiles.get(&cell).copied()
    }

    fn clear(&mut self) {
        self.tiles.clear();
    }

    fn used_tile_count(&self) -> usize {
        self.tiles.len()
    }
}
