#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Procedural dungeon generation.
//!
//! The level bounds are recursively partitioned into regions, one room is
//! carved per terminal region, sibling subtrees are joined with L-shaped
//! corridors and walls are inferred from floor adjacency. The result is a
//! [`Level`] whose floor set becomes the pathfinder's walkable set.
//!
//! Every random decision draws from a caller-supplied [`rand::Rng`], so a
//! seeded source reproduces the same level.

mod carve;
mod config;
mod partition;
mod process;
mod spawn_points;
mod walls;

use std::collections::BTreeMap;

use delve_core::{CellCoord, CellRect, Tile, TileId, WallKind};
use glam::Vec2;
use rand::Rng;

pub use config::{GenerationConfig, GenerationError, MIN_ROOM_REGION_EXTENT};
pub use partition::{Region, RegionId, RegionTree};
pub use process::{GenerationProcess, StepReport};
pub use walls::infer_walls;

/// Rectangle of floor carved inside a terminal region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Room {
    region: RegionId,
    rect: CellRect,
}

impl Room {
    /// Creates a room record for the region that produced it.
    #[must_use]
    pub const fn new(region: RegionId, rect: CellRect) -> Self {
        Self { region, rect }
    }

    /// Region that owns the room.
    #[must_use]
    pub const fn region(&self) -> RegionId {
        self.region
    }

    /// Cells covered by the room.
    #[must_use]
    pub const fn rect(&self) -> CellRect {
        self.rect
    }

    /// Integer center cell used as a corridor endpoint.
    #[must_use]
    pub const fn center(&self) -> CellCoord {
        self.rect.center()
    }
}

/// Finished level topology.
#[derive(Clone, Debug, PartialEq)]
pub struct Level {
    bounds: CellRect,
    regions: RegionTree,
    rooms: Vec<Room>,
    floor: BTreeMap<CellCoord, TileId>,
    walls: BTreeMap<CellCoord, WallKind>,
    spawn_points: Vec<Vec2>,
}

impl Level {
    /// Bounds the partitioner started from.
    #[must_use]
    pub const fn bounds(&self) -> CellRect {
        self.bounds
    }

    /// Partition tree that produced the rooms.
    #[must_use]
    pub const fn regions(&self) -> &RegionTree {
        &self.regions
    }

    /// Rooms in carving order. The first room hosts the player.
    #[must_use]
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    /// Floor cells with their tile variant.
    #[must_use]
    pub const fn floor(&self) -> &BTreeMap<CellCoord, TileId> {
        &self.floor
    }

    /// Wall cells with their inferred orientation. Disjoint from the floor.
    #[must_use]
    pub const fn walls(&self) -> &BTreeMap<CellCoord, WallKind> {
        &self.walls
    }

    /// World-space enemy spawn candidates.
    #[must_use]
    pub fn spawn_points(&self) -> &[Vec2] {
        &self.spawn_points
    }

    /// Reports whether `cell` is floor.
    #[must_use]
    pub fn is_floor(&self, cell: CellCoord) -> bool {
        self.floor.contains_key(&cell)
    }

    /// Floor cells in ascending order, ready for pathfinder registration.
    pub fn walkable_cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.floor.keys().copied()
    }

    /// World-space center of the first room.
    #[must_use]
    pub fn player_spawn(&self) -> Option<Vec2> {
        self.rooms
            .first()
            .map(|room| room.center().center())
    }

    /// Every tile the level places on a tile surface: floor first, then walls.
    pub fn tiles(&self) -> impl Iterator<Item = (CellCoord, Tile)> + '_ {
        let floor = self
            .floor
            .iter()
            .map(|(cell, tile)| (*cell, Tile::Floor(*tile)));
        let walls = self
            .walls
            .iter()
            .map(|(cell, kind)| (*cell, Tile::Wall(*kind)));
        floor.chain(walls)
    }
}

/// Entry point that turns a validated configuration into levels.
#[derive(Clone, Debug)]
pub struct DungeonGenerator {
    config: GenerationConfig,
}

impl DungeonGenerator {
    /// Validates `config` and creates a generator for it.
    pub fn new(config: GenerationConfig) -> Result<Self, GenerationError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration used by the generator.
    #[must_use]
    pub const fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Starts a resumable generation pass that owns `rng`.
    pub fn start<R>(&self, rng: R) -> Result<GenerationProcess<R>, GenerationError>
    where
        R: Rng,
    {
        GenerationProcess::new(self.config.clone(), rng)
    }

    /// Generates a complete level in one call.
    pub fn generate<R>(&self, rng: &mut R) -> Result<Level, GenerationError>
    where
        R: Rng,
    {
        Ok(self.start(rng)?.run_to_completion())
    }
}
