#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Grid pathfinder that computes shortest routes over a level's walkable cells.
//!
//! The pathfinder never looks at regions or rooms. It owns a snapshot of the
//! walkable cell set taken at registration time and answers A* queries over
//! eight-connected steps. Straight steps cost [`STRAIGHT_COST`] and diagonal
//! steps cost [`DIAGONAL_COST`], a fixed-point stand-in for `1 : sqrt(2)`
//! that keeps scores exact. A diagonal step is only taken when both cells it
//! passes between are walkable, so routes never clip a wall corner.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap, HashSet},
};

use delve_core::CellCoord;
use thiserror::Error;
use tracing::debug;

/// Cost of a single axis-aligned step.
pub const STRAIGHT_COST: u32 = 10;

/// Cost of a single diagonal step.
pub const DIAGONAL_COST: u32 = 14;

const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (0, 1),
    (0, -1),
    (-1, 0),
    (1, 0),
    (1, 1),
    (-1, 1),
    (1, -1),
    (-1, -1),
];

/// Errors surfaced by [`GridPathfinder`].
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum PathfindingError {
    /// A query arrived before any walkable set was registered.
    #[error("pathfinder queried before a walkable set was registered")]
    NotInitialized,
}

/// Octile distance between two cells under the 10/14 cost model.
///
/// Never overestimates the true cost of an eight-connected route, so A*
/// guided by it returns optimal paths.
#[must_use]
pub fn octile_distance(from: CellCoord, to: CellCoord) -> u32 {
    let dx = from.x().abs_diff(to.x());
    let dy = from.y().abs_diff(to.y());
    STRAIGHT_COST * (dx + dy) - (2 * STRAIGHT_COST - DIAGONAL_COST) * dx.min(dy)
}

/// Step cost between two neighbouring cells.
#[must_use]
pub fn step_cost(from: CellCoord, to: CellCoord) -> u32 {
    if from.x() != to.x() && from.y() != to.y() {
        DIAGONAL_COST
    } else {
        STRAIGHT_COST
    }
}

/// Ordered route from a start cell to a goal cell, both inclusive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    cells: Vec<CellCoord>,
    cost: u32,
}

impl Path {
    /// Cells visited by the route in travel order.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// Total step cost of the route.
    #[must_use]
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Number of cells on the route, including both endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false; a route contains at least its start cell.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// First cell after the start, if the route leaves the start cell at all.
    #[must_use]
    pub fn next_step(&self) -> Option<CellCoord> {
        self.cells.get(1).copied()
    }

    /// Consumes the route, yielding its cells.
    #[must_use]
    pub fn into_cells(self) -> Vec<CellCoord> {
        self.cells
    }
}

/// A* pathfinder over a registered walkable cell set.
#[derive(Clone, Debug, Default)]
pub struct GridPathfinder {
    walkable: Option<HashSet<CellCoord>>,
}

impl GridPathfinder {
    /// Creates an uninitialized pathfinder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the walkable set. Previous registrations are discarded.
    pub fn initialize<I>(&mut self, cells: I)
    where
        I: IntoIterator<Item = CellCoord>,
    {
        let walkable: HashSet<CellCoord> = cells.into_iter().collect();
        debug!(cells = walkable.len(), "registered walkable set");
        self.walkable = Some(walkable);
    }

    /// Drops the walkable set, returning the pathfinder to its initial state.
    pub fn reset(&mut self) {
        self.walkable = None;
    }

    /// Reports whether a walkable set has been registered.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.walkable.is_some()
    }

    /// Reports whether `cell` belongs to the registered walkable set.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.walkable
            .as_ref()
            .is_some_and(|walkable| walkable.contains(&cell))
    }

    /// Number of registered walkable cells.
    #[must_use]
    pub fn walkable_count(&self) -> usize {
        self.walkable.as_ref().map_or(0, HashSet::len)
    }

    /// Computes the cheapest route from `start` to `goal`.
    ///
    /// Returns `Ok(None)` when either endpoint is not walkable or the two lie
    /// in disconnected components. Partial routes are never returned.
    pub fn find_path(
        &self,
        start: CellCoord,
        goal: CellCoord,
    ) -> Result<Option<Path>, PathfindingError> {
        let walkable = self
            .walkable
            .as_ref()
            .ok_or(PathfindingError::NotInitialized)?;

        if !walkable.contains(&start) || !walkable.contains(&goal) {
            return Ok(None);
        }

        let mut frontier = BinaryHeap::new();
        let mut g_scores: HashMap<CellCoord, u32> = HashMap::new();
        let mut came_from: HashMap<CellCoord, CellCoord> = HashMap::new();
        let mut closed: HashSet<CellCoord> = HashSet::new();
        let mut sequence = 0_u64;

        let _ = g_scores.insert(start, 0);
        frontier.push(Reverse(FrontierEntry {
            score: octile_distance(start, goal),
            sequence,
            cell: start,
        }));

        while let Some(Reverse(entry)) = frontier.pop() {
            let current = entry.cell;
            if !closed.insert(current) {
                continue;
            }

            let Some(&current_cost) = g_scores.get(&current) else {
                continue;
            };

            if current == goal {
                return Ok(Some(reconstruct(&came_from, current, current_cost)));
            }

            for (dx, dy) in NEIGHBOR_OFFSETS {
                let neighbor = current.offset(dx, dy);
                if !walkable.contains(&neighbor) || closed.contains(&neighbor) {
                    continue;
                }
                if dx != 0
                    && dy != 0
                    && (!walkable.contains(&current.offset(dx, 0))
                        || !walkable.contains(&current.offset(0, dy)))
                {
                    continue;
                }

                let tentative = current_cost + step_cost(current, neighbor);
                if g_scores
                    .get(&neighbor)
                    .is_some_and(|&existing| existing <= tentative)
                {
                    continue;
                }

                let _ = g_scores.insert(neighbor, tentative);
                let _ = came_from.insert(neighbor, current);
                sequence += 1;
                frontier.push(Reverse(FrontierEntry {
                    score: tentative + octile_distance(neighbor, goal),
                    sequence,
                    cell: neighbor,
                }));
            }
        }

        Ok(None)
    }
}

/// Heap key ordered by score, then by insertion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct FrontierEntry {
    score: u32,
    sequence: u64,
    cell: CellCoord,
}

fn reconstruct(came_from: &HashMap<CellCoord, CellCoord>, goal: CellCoord, cost: u32) -> Path {
    let mut cells = vec![goal];
    let mut current = goal;
    while let Some(&previous) = came_from.get(&current) {
        cells.push(previous);
        current = previous;
    }
    cells.reverse();
    Path { cells, cost }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_grid(width: i32, height: i32) -> Vec<CellCoord> {
        (0..height)
            .flat_map(|y| (0..width).map(move |x| CellCoord::new(x, y)))
            .collect()
    }

    #[test]
    fn heuristic_matches_octile_formula() {
        let origin = CellCoord::new(0, 0);
        assert_eq!(octile_distance(origin, CellCoord::new(4, 4)), 56);
        assert_eq!(octile_distance(origin, CellCoord::new(3, 0)), 30);
        assert_eq!(octile_distance(origin, CellCoord::new(-2, 5)), 10 * 7 - 6 * 2);
        assert_eq!(octile_distance(origin, origin), 0);
    }

    #[test]
    fn uninitialized_pathfinder_reports_setup_error() {
        let pathfinder = GridPathfinder::new();
        let result = pathfinder.find_path(CellCoord::new(0, 0), CellCoord::new(1, 1));
        assert_eq!(result, Err(PathfindingError::NotInitialized));
    }

    #[test]
    fn open_grid_diagonal_is_optimal() {
        let mut pathfinder = GridPathfinder::new();
        pathfinder.initialize(open_grid(5, 5));

        let path = pathfinder
            .find_path(CellCoord::new(0, 0), CellCoord::new(4, 4))
            .expect("initialized")
            .expect("reachable");

        assert_eq!(path.len(), 5);
        assert_eq!(path.cost(), 4 * DIAGONAL_COST);
        assert_eq!(path.cells().first(), Some(&CellCoord::new(0, 0)));
        assert_eq!(path.cells().last(), Some(&CellCoord::new(4, 4)));
    }

    #[test]
    fn start_equal_to_goal_yields_single_cell() {
        let mut pathfinder = GridPathfinder::new();
        pathfinder.initialize(open_grid(3, 3));

        let path = pathfinder
            .find_path(CellCoord::new(1, 1), CellCoord::new(1, 1))
            .expect("initialized")
            .expect("reachable");

        assert_eq!(path.cells(), &[CellCoord::new(1, 1)]);
        assert_eq!(path.cost(), 0);
        assert_eq!(path.next_step(), None);
    }

    #[test]
    fn endpoints_outside_walkable_set_have_no_path() {
        let mut pathfinder = GridPathfinder::new();
        pathfinder.initialize(open_grid(3, 3));

        let outside = CellCoord::new(7, 7);
        assert_eq!(pathfinder.find_path(CellCoord::new(0, 0), outside), Ok(None));
        assert_eq!(pathfinder.find_path(outside, CellCoord::new(0, 0)), Ok(None));
    }

    #[test]
    fn routes_around_walls() {
        // 5x3 grid with a wall column at x = 2 except the top row.
        let cells: Vec<_> = open_grid(5, 3)
            .into_iter()
            .filter(|cell| cell.x() != 2 || cell.y() == 2)
            .collect();
        let mut pathfinder = GridPathfinder::new();
        pathfinder.initialize(cells);

        let path = pathfinder
            .find_path(CellCoord::new(0, 0), CellCoord::new(4, 0))
            .expect("initialized")
            .expect("reachable");

        assert!(path.cells().contains(&CellCoord::new(2, 2)));
        assert_eq!(path.cost(), 4 * STRAIGHT_COST + 2 * DIAGONAL_COST);
    }

    #[test]
    fn diagonal_steps_never_cut_wall_corners() {
        // L-shaped corridor: the bend at (1, 0) must be visited.
        let cells = [CellCoord::new(0, 0), CellCoord::new(1, 0), CellCoord::new(1, 1)];
        let mut pathfinder = GridPathfinder::new();
        pathfinder.initialize(cells);

        let path = pathfinder
            .find_path(CellCoord::new(0, 0), CellCoord::new(1, 1))
            .expect("initialized")
            .expect("reachable");

        assert_eq!(path.cells(), &cells);
        assert_eq!(path.cost(), 2 * STRAIGHT_COST);
    }

    #[test]
    fn diagonal_through_two_walls_is_refused() {
        let mut pathfinder = GridPathfinder::new();
        pathfinder.initialize([CellCoord::new(0, 0), CellCoord::new(1, 1)]);

        assert_eq!(
            pathfinder.find_path(CellCoord::new(0, 0), CellCoord::new(1, 1)),
            Ok(None)
        );
    }

    #[test]
    fn disconnected_components_report_no_path() {
        let mut cells = open_grid(2, 2);
        cells.extend(
            open_grid(2, 2)
                .into_iter()
                .map(|cell| cell.offset(5, 0)),
        );
        let mut pathfinder = GridPathfinder::new();
        pathfinder.initialize(cells);

        assert_eq!(
            pathfinder.find_path(CellCoord::new(0, 0), CellCoord::new(6, 1)),
            Ok(None)
        );
    }

    #[test]
    fn initialize_replaces_previous_set() {
        let mut pathfinder = GridPathfinder::new();
        pathfinder.initialize(open_grid(3, 3));
        pathfinder.initialize([CellCoord::new(10, 10)]);

        assert!(!pathfinder.is_walkable(CellCoord::new(0, 0)));
        assert!(pathfinder.is_walkable(CellCoord::new(10, 10)));
        assert_eq!(pathfinder.walkable_count(), 1);
    }

    #[test]
    fn identical_queries_are_reproducible() {
        let mut pathfinder = GridPathfinder::new();
        pathfinder.initialize(open_grid(8, 8));

        let first = pathfinder.find_path(CellCoord::new(0, 3), CellCoord::new(7, 5));
        let second = pathfinder.find_path(CellCoord::new(0, 3), CellCoord::new(7, 5));
        assert_eq!(first, second);
    }
}
