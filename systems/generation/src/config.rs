//! Tunables and configuration errors for level generation.

use delve_core::TileId;
use rand::distributions::WeightedError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest region extent that can still hold a room with a one-cell margin.
pub const MIN_ROOM_REGION_EXTENT: i32 = 3;

/// Parameters that shape a generated level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Level width in cells.
    pub width: i32,
    /// Level height in cells.
    pub height: i32,
    /// Number of partition iterations applied to the level bounds.
    pub max_iterations: u32,
    /// Smallest extent a partition child may have along the split axis.
    pub min_leaf_size: i32,
    /// Corridor width in cells. Cells within `corridor_width / 2` of the
    /// corridor centerline become floor.
    pub corridor_width: u32,
    /// Floor tile variants written to the tile surface.
    pub floor_tiles: Vec<TileId>,
    /// Relative selection weight of each floor tile variant.
    pub floor_tile_weights: Vec<f32>,
    /// Enemy spawn candidates requested for every room after the first.
    pub enemies_per_room: u32,
    /// Minimum distance between two spawn candidates in the same room.
    pub min_enemy_spacing: f32,
    /// Whether the session should generate one stage per tick.
    pub step_by_step: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            width: 25,
            height: 25,
            max_iterations: 5,
            min_leaf_size: 8,
            corridor_width: 1,
            floor_tiles: vec![TileId::new(0), TileId::new(1), TileId::new(2)],
            floor_tile_weights: vec![0.8, 0.15, 0.05],
            enemies_per_room: 1,
            min_enemy_spacing: 1.5,
            step_by_step: false,
        }
    }
}

impl GenerationConfig {
    /// Checks the configuration before any level state is produced.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.width < MIN_ROOM_REGION_EXTENT || self.height < MIN_ROOM_REGION_EXTENT {
            return Err(GenerationError::DegenerateBounds {
                width: self.width,
                height: self.height,
            });
        }

        if self.min_leaf_size < MIN_ROOM_REGION_EXTENT {
            return Err(GenerationError::LeafTooSmall {
                min_leaf_size: self.min_leaf_size,
            });
        }

        if self.floor_tiles.is_empty() {
            return Err(GenerationError::NoFloorTiles);
        }

        if self.floor_tiles.len() != self.floor_tile_weights.len() {
            return Err(GenerationError::TileWeightMismatch {
                tiles: self.floor_tiles.len(),
                weights: self.floor_tile_weights.len(),
            });
        }

        if let Some(index) = self
            .floor_tile_weights
            .iter()
            .position(|weight| !weight.is_finite() || *weight < 0.0)
        {
            return Err(GenerationError::InvalidWeight { index });
        }

        Ok(())
    }

    /// Half the corridor width, rounded down.
    #[must_use]
    pub fn corridor_half_width(&self) -> i32 {
        i32::try_from(self.corridor_width / 2).unwrap_or(i32::MAX)
    }
}

/// Configuration problems that abort generation before any level exists.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GenerationError {
    /// The weight table does not have one entry per floor tile variant.
    #[error("{tiles} floor tiles but {weights} weights")]
    TileWeightMismatch {
        /// Number of floor tile variants.
        tiles: usize,
        /// Number of weights supplied.
        weights: usize,
    },
    /// No floor tile variants were configured.
    #[error("no floor tiles configured")]
    NoFloorTiles,
    /// A weight is negative or not a finite number.
    #[error("floor tile weight at index {index} is negative or not finite")]
    InvalidWeight {
        /// Position of the offending weight.
        index: usize,
    },
    /// The weight table cannot be sampled, for example because every weight
    /// is zero.
    #[error("floor tile weights cannot be sampled: {0}")]
    WeightTable(#[from] WeightedError),
    /// The level bounds are too small to hold a single room.
    #[error("level bounds {width}x{height} are too small to hold a room")]
    DegenerateBounds {
        /// Configured width.
        width: i32,
        /// Configured height.
        height: i32,
    },
    /// The minimum leaf size cannot hold a room.
    #[error("minimum leaf size {min_leaf_size} cannot hold a room")]
    LeafTooSmall {
        /// Configured minimum leaf size.
        min_leaf_size: i32,
    },
}
