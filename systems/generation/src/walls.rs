//! Wall inference from floor adjacency.

use std::collections::BTreeMap;

use delve_core::{CellCoord, TileId, WallKind};

/// Derives wall cells from a floor map.
///
/// The edge pass tags a missing axis neighbour when the opposite neighbour is
/// floor, and tags the diagonal cell when two perpendicular neighbours are
/// missing while the other two are floor. The corridor pass then tags the
/// sides of floor cells that have no floor on either side of an axis. A cell
/// keeps the first tag it receives. Floor cells are never tagged. Rows grow
/// upwards, so "top" is `y + 1`.
#[must_use]
pub fn infer_walls(floor: &BTreeMap<CellCoord, TileId>) -> BTreeMap<CellCoord, WallKind> {
    let mut walls = BTreeMap::new();
    let is_floor = |cell: CellCoord| floor.contains_key(&cell);

    for &cell in floor.keys() {
        let up = is_floor(cell.offset(0, 1));
        let down = is_floor(cell.offset(0, -1));
        let left = is_floor(cell.offset(-1, 0));
        let right = is_floor(cell.offset(1, 0));
        let mut mark = |dx: i32, dy: i32, kind: WallKind| {
            mark_wall(&mut walls, floor, cell.offset(dx, dy), kind);
        };

        if !left && right {
            mark(-1, 0, WallKind::Left);
        }
        if !right && left {
            mark(1, 0, WallKind::Right);
        }
        if !up && down {
            mark(0, 1, WallKind::Top);
        }
        if !down && up {
            mark(0, -1, WallKind::Bottom);
        }

        if !up && !left && down && right {
            mark(-1, 1, WallKind::TopLeft);
        } else if !up && !right && down && left {
            mark(1, 1, WallKind::TopRight);
        } else if !down && !left && up && right {
            mark(-1, -1, WallKind::BottomLeft);
        } else if !down && !right && up && left {
            mark(1, -1, WallKind::BottomRight);
        }
    }

    for &cell in floor.keys() {
        let up = is_floor(cell.offset(0, 1));
        let down = is_floor(cell.offset(0, -1));
        let left = is_floor(cell.offset(-1, 0));
        let right = is_floor(cell.offset(1, 0));

        if !up && !down {
            mark_wall(&mut walls, floor, cell.offset(0, 1), WallKind::CorridorTop);
            mark_wall(&mut walls, floor, cell.offset(0, -1), WallKind::CorridorBottom);
        }
        if !left && !right {
            mark_wall(&mut walls, floor, cell.offset(-1, 0), WallKind::CorridorLeft);
            mark_wall(&mut walls, floor, cell.offset(1, 0), WallKind::CorridorRight);
        }
    }

    walls
}

fn mark_wall(
    walls: &mut BTreeMap<CellCoord, WallKind>,
    floor: &BTreeMap<CellCoord, TileId>,
    cell: CellCoord,
    kind: WallKind,
) {
    if !floor.contains_key(&cell) {
        let _ = walls.entry(cell).or_insert(kind);
    }
}
