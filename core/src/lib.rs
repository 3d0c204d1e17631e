#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Delve engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative level session, and pure systems. Adapters submit [`Command`]
//! values describing desired mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values to the caller
//! and to every registered [`LevelObserver`]. Systems never mutate the shared
//! floor, wall, or walkable sets directly.

mod collaborators;

use std::{fmt, time::Duration};

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub use collaborators::{
    EntityFactory, Health, HitSubject, LevelObserver, RayHit, SpawnError, SpawnRequest,
    TileSurface, VisionProbe, Weapon,
};

/// Location of a single grid cell expressed as signed column and row coordinates.
///
/// Coordinates are signed because wall cells may sit one step outside the
/// level bounds when floor reaches the edge.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CellCoord {
    x: i32,
    y: i32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Column index of the cell.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row index of the cell. Rows grow upwards.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the cell displaced by the provided offsets.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Reports whether `other` is one of the eight cells surrounding `self`.
    #[must_use]
    pub fn is_adjacent8(self, other: CellCoord) -> bool {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        dx <= 1 && dy <= 1 && (dx, dy) != (0, 0)
    }

    /// Converts a world-space position into the unit cell that contains it.
    #[must_use]
    pub fn containing(position: Vec2) -> Self {
        Self {
            x: position.x.floor() as i32,
            y: position.y.floor() as i32,
        }
    }

    /// World-space center of the cell.
    #[must_use]
    pub fn center(self) -> Vec2 {
        Vec2::new(self.x as f32 + 0.5, self.y as f32 + 0.5)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned integer rectangle expressed in cell coordinates.
///
/// The rectangle covers columns `x..x + width` and rows `y..y + height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRect {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

impl CellRect {
    /// Constructs a rectangle from its lower-left corner and size.
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// First column covered by the rectangle.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// First row covered by the rectangle.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Width of the rectangle in cells.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Height of the rectangle in cells.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// One past the last column covered by the rectangle.
    #[must_use]
    pub const fn x_max(&self) -> i32 {
        self.x + self.width
    }

    /// One past the last row covered by the rectangle.
    #[must_use]
    pub const fn y_max(&self) -> i32 {
        self.y + self.height
    }

    /// Number of cells covered by the rectangle.
    #[must_use]
    pub const fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    /// Integer center cell, rounding towards the lower-left corner.
    #[must_use]
    pub const fn center(&self) -> CellCoord {
        CellCoord::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Reports whether the rectangle covers the provided cell.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.x() >= self.x && cell.x() < self.x_max() && cell.y() >= self.y && cell.y() < self.y_max()
    }

    /// Reports whether two rectangles share at least one cell.
    #[must_use]
    pub const fn overlaps(&self, other: &CellRect) -> bool {
        self.x < other.x_max()
            && other.x < self.x_max()
            && self.y < other.y_max()
            && other.y < self.y_max()
    }

    /// Reports whether `inner` lies inside `self` leaving at least `margin`
    /// cells free on every side.
    #[must_use]
    pub const fn contains_with_margin(&self, inner: &CellRect, margin: i32) -> bool {
        inner.x >= self.x + margin
            && inner.y >= self.y + margin
            && inner.x_max() <= self.x_max() - margin
            && inner.y_max() <= self.y_max() - margin
    }

    /// Iterates every cell covered by the rectangle in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> {
        let rect = *self;
        (rect.y..rect.y_max())
            .flat_map(move |y| (rect.x..rect.x_max()).map(move |x| CellCoord::new(x, y)))
    }
}

/// Identifier of a floor tile variant on the external tile surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(u16);

impl TileId {
    /// Creates a tile identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u16 {
        self.0
    }
}

/// Orientation tag assigned to an inferred wall cell.
///
/// Room-edge, room-corner and corridor walls are distinct so adapters can pick
/// different artwork for each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WallKind {
    /// Wall to the left of a floor run.
    Left,
    /// Wall to the right of a floor run.
    Right,
    /// Wall above a floor run.
    Top,
    /// Wall below a floor run.
    Bottom,
    /// Upper-left outer corner.
    TopLeft,
    /// Upper-right outer corner.
    TopRight,
    /// Lower-left outer corner.
    BottomLeft,
    /// Lower-right outer corner.
    BottomRight,
    /// Left side of a one-wide vertical corridor.
    CorridorLeft,
    /// Right side of a one-wide vertical corridor.
    CorridorRight,
    /// Upper side of a one-wide horizontal corridor.
    CorridorTop,
    /// Lower side of a one-wide horizontal corridor.
    CorridorBottom,
}

impl WallKind {
    /// Reports whether the wall was placed by the corridor pass.
    #[must_use]
    pub const fn is_corridor(self) -> bool {
        matches!(
            self,
            Self::CorridorLeft | Self::CorridorRight | Self::CorridorTop | Self::CorridorBottom
        )
    }

    /// Reports whether the wall marks an outer room corner.
    #[must_use]
    pub const fn is_corner(self) -> bool {
        matches!(
            self,
            Self::TopLeft | Self::TopRight | Self::BottomLeft | Self::BottomRight
        )
    }
}

/// Tile written to the external tile surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tile {
    /// Walkable floor using the provided artwork variant.
    Floor(TileId),
    /// Impassable wall with the inferred orientation.
    Wall(WallKind),
}

/// Unique identifier assigned to an agent by the level session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Opaque handle issued by the external entity factory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle(u64);

impl EntityHandle {
    /// Wraps a raw handle value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the raw handle value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Type identifier handed to the entity factory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Hostile agent driven by an agent controller.
    Enemy,
    /// Health pack dropped by a defeated enemy.
    HealthPack,
}

/// Side a projectile belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Faction {
    /// Fired by the player.
    Player,
    /// Fired by an agent.
    Enemy,
}

/// In-flight projectile reported by the host for threat detection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projectile {
    /// World-space position of the projectile.
    pub position: Vec2,
    /// Side that fired the projectile.
    pub faction: Faction,
}

/// Behaviour state of an agent controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AgentState {
    /// Waiting for the idle timer to expire.
    #[default]
    Idle,
    /// Wandering between nearby reachable points.
    Patrol,
    /// Chasing the player.
    Pursue,
    /// Holding position and firing at the player.
    Attack,
    /// Running away from the player after taking heavy damage.
    Flee,
}

impl AgentState {
    /// Short lowercase name used in logs and summaries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Patrol => "patrol",
            Self::Pursue => "pursue",
            Self::Attack => "attack",
            Self::Flee => "flee",
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discrete stage of a resumable level generation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GenerationStage {
    /// One binary partition iteration over every terminal region.
    Partition {
        /// Zero-based iteration index.
        iteration: u32,
    },
    /// Carving the room of a single terminal region.
    CarveRoom {
        /// Zero-based index of the room in carving order.
        index: usize,
    },
    /// Connecting sibling rooms with corridors.
    CarveCorridors,
    /// Deriving walls from floor adjacency.
    InferWalls,
    /// Choosing enemy spawn candidates.
    PlaceSpawns,
}

/// Commands that express all permissible level-session mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Discards any previous level data and generates a new level for the
    /// active difficulty tier.
    GenerateLevel,
    /// Requests one enemy per spawn candidate of the installed level.
    SpawnAgents,
    /// Advances the simulation by one fixed step.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
        /// World-space player position, if a player is present.
        player: Option<Vec2>,
        /// Projectiles currently in flight.
        projectiles: Vec<Projectile>,
    },
    /// Applies damage to an agent through its health collaborator.
    DamageAgent {
        /// Agent receiving the damage.
        agent: AgentId,
        /// Amount of health removed.
        amount: i32,
    },
    /// Tears down the installed level and every entity it owns.
    ClearLevel,
    /// Moves to the next difficulty tier.
    AdvanceDifficulty,
    /// Returns to the first difficulty tier.
    ResetDifficulty,
}

/// Events broadcast by the level session after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Reports that a stepwise generation pass completed one stage.
    GenerationAdvanced {
        /// Stage that just ran.
        stage: GenerationStage,
    },
    /// Announces that a level was generated and installed for play.
    LevelGenerated {
        /// Number of rooms carved.
        rooms: usize,
        /// Number of floor cells in the level.
        floor_cells: usize,
    },
    /// Confirms that an agent was created by the entity factory.
    AgentSpawned {
        /// Identifier allocated to the agent by the session.
        agent: AgentId,
        /// Handle issued by the factory.
        handle: EntityHandle,
        /// World-space spawn position.
        position: Vec2,
    },
    /// Reports an agent behaviour transition.
    AgentStateChanged {
        /// Agent whose state changed.
        agent: AgentId,
        /// State before the tick.
        from: AgentState,
        /// State after the tick.
        to: AgentState,
    },
    /// Announces that an agent's health reached zero.
    AgentKilled {
        /// Agent that died.
        agent: AgentId,
    },
    /// Confirms that a defeated agent dropped a pickup.
    PickupDropped {
        /// Handle of the spawned pickup.
        handle: EntityHandle,
        /// World-space drop position.
        position: Vec2,
    },
    /// Announces that the last enemy of the level died.
    AllEnemiesKilled,
    /// Announces that teardown finished and the session is empty.
    LevelCleared,
    /// Announces that the difficulty tier changed.
    DifficultyChanged {
        /// Player-facing level number, starting at one.
        level: u32,
    },
}
