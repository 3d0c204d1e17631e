//! Room and corridor carving.

use delve_core::{CellCoord, CellRect, TileId};
use rand::{distributions::WeightedIndex, prelude::Distribution, Rng};

use crate::{config::MIN_ROOM_REGION_EXTENT, GenerationConfig, GenerationError};

/// Weighted table of floor tile variants.
#[derive(Clone, Debug)]
pub(crate) struct FloorPalette {
    tiles: Vec<TileId>,
    weights: WeightedIndex<f32>,
}

impl FloorPalette {
    pub(crate) fn from_config(config: &GenerationConfig) -> Result<Self, GenerationError> {
        config.validate()?;
        let weights = WeightedIndex::new(config.floor_tile_weights.iter().copied())?;
        Ok(Self {
            tiles: config.floor_tiles.clone(),
            weights,
        })
    }

    /// Draws a tile variant using the cumulative weight table.
    pub(crate) fn pick<R>(&self, rng: &mut R) -> TileId
    where
        R: Rng + ?Sized,
    {
        let index = self.weights.sample(rng);
        self.tiles
            .get(index)
            .or_else(|| self.tiles.last())
            .copied()
            .unwrap_or(TileId::new(0))
    }
}

/// Places a room inside `region` leaving at least one free cell on every
/// side. Returns `None` when the region is too small on either axis.
pub(crate) fn carve_room<R>(region: CellRect, rng: &mut R) -> Option<CellRect>
where
    R: Rng + ?Sized,
{
    let width = room_extent(region.width(), rng)?;
    let height = room_extent(region.height(), rng)?;
    let x = region.x() + rng.gen_range(1..=region.width() - width - 1);
    let y = region.y() + rng.gen_range(1..=region.height() - height - 1);
    Some(CellRect::new(x, y, width, height))
}

fn room_extent<R>(extent: i32, rng: &mut R) -> Option<i32>
where
    R: Rng + ?Sized,
{
    if extent < MIN_ROOM_REGION_EXTENT {
        return None;
    }
    Some(rng.gen_range(extent / 2..=extent - 2))
}

/// Cells of an L-shaped corridor between two room centers.
///
/// The corridor runs horizontally along `from`'s row up to `to`'s column and
/// then vertically along `to`'s column. Cells within `half_width` of the
/// centerline are included.
pub(crate) fn corridor_cells(from: CellCoord, to: CellCoord, half_width: i32) -> Vec<CellCoord> {
    let mut cells = Vec::new();

    for x in span(from.x(), to.x()) {
        for offset in -half_width..=half_width {
            cells.push(CellCoord::new(x, from.y() + offset));
        }
    }

    for y in span(from.y(), to.y()) {
        for offset in -half_width..=half_width {
            cells.push(CellCoord::new(to.x() + offset, y));
        }
    }

    cells
}

fn span(a: i32, b: i32) -> std::ops::RangeInclusive<i32> {
    a.min(b)..=a.max(b)
}
