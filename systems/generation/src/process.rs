//! Resumable, stage-by-stage level generation.

use std::collections::BTreeMap;

use delve_core::{CellCoord, CellRect, GenerationStage, TileId, WallKind};
use glam::Vec2;
use rand::Rng;
use tracing::{debug, info};

use crate::{
    carve::{carve_room, corridor_cells, FloorPalette},
    infer_walls,
    spawn_points::place_spawn_points,
    GenerationConfig, GenerationError, Level, RegionId, RegionTree, Room,
};

/// Outcome of a single [`GenerationProcess::step`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepReport {
    /// Stage that just ran.
    pub stage: GenerationStage,
    /// Whether further stages remain.
    pub more_stages: bool,
}

/// Level generation expressed as an explicit state machine.
///
/// Each call to [`GenerationProcess::step`] runs exactly one stage: a whole
/// partition iteration, a single room, all corridors, wall inference, or
/// spawn placement. No partial state is observable between stages other than
/// through [`GenerationProcess::next_stage`]. The process owns its random
/// source so it can be suspended across ticks.
#[derive(Debug)]
pub struct GenerationProcess<R> {
    config: GenerationConfig,
    palette: FloorPalette,
    rng: R,
    tree: RegionTree,
    terminals: Vec<RegionId>,
    rooms: Vec<Room>,
    floor: BTreeMap<CellCoord, TileId>,
    walls: BTreeMap<CellCoord, WallKind>,
    spawn_points: Vec<Vec2>,
    next: Option<GenerationStage>,
}

impl<R> GenerationProcess<R>
where
    R: Rng,
{
    /// Validates `config` and prepares a process that has not run any stage.
    pub fn new(config: GenerationConfig, rng: R) -> Result<Self, GenerationError> {
        let palette = FloorPalette::from_config(&config)?;
        let bounds = CellRect::new(0, 0, config.width, config.height);
        let mut process = Self {
            palette,
            rng,
            tree: RegionTree::new(bounds),
            terminals: Vec::new(),
            rooms: Vec::new(),
            floor: BTreeMap::new(),
            walls: BTreeMap::new(),
            spawn_points: Vec::new(),
            next: None,
            config,
        };
        process.next = if process.config.max_iterations > 0 {
            Some(GenerationStage::Partition { iteration: 0 })
        } else {
            process.begin_carving()
        };
        Ok(process)
    }

    /// Stage the next [`GenerationProcess::step`] call will run.
    #[must_use]
    pub fn next_stage(&self) -> Option<GenerationStage> {
        self.next
    }

    /// Reports whether every stage has run.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.next.is_none()
    }

    /// Runs the next stage. Returns `None` once the process is complete.
    pub fn step(&mut self) -> Option<StepReport> {
        let stage = self.next?;
        self.next = match stage {
            GenerationStage::Partition { iteration } => self.partition(iteration),
            GenerationStage::CarveRoom { index } => self.carve_next_room(index),
            GenerationStage::CarveCorridors => {
                self.carve_corridors();
                Some(GenerationStage::InferWalls)
            }
            GenerationStage::InferWalls => {
                self.walls = infer_walls(&self.floor);
                debug!(walls = self.walls.len(), "inferred walls");
                Some(GenerationStage::PlaceSpawns)
            }
            GenerationStage::PlaceSpawns => {
                self.spawn_points = place_spawn_points(
                    &self.rooms,
                    self.config.enemies_per_room,
                    self.config.min_enemy_spacing,
                    &mut self.rng,
                );
                None
            }
        };

        Some(StepReport {
            stage,
            more_stages: self.next.is_some(),
        })
    }

    /// Runs every remaining stage and returns the finished level.
    #[must_use]
    pub fn run_to_completion(mut self) -> Level {
        while self.step().is_some() {}
        self.into_level()
    }

    /// Returns the finished level, or the process itself if stages remain.
    pub fn finish(self) -> Result<Level, Self> {
        if self.is_complete() {
            Ok(self.into_level())
        } else {
            Err(self)
        }
    }

    fn into_level(self) -> Level {
        info!(
            rooms = self.rooms.len(),
            floor = self.floor.len(),
            walls = self.walls.len(),
            spawn_points = self.spawn_points.len(),
            "level generated"
        );
        Level {
            bounds: CellRect::new(0, 0, self.config.width, self.config.height),
            regions: self.tree,
            rooms: self.rooms,
            floor: self.floor,
            walls: self.walls,
            spawn_points: self.spawn_points,
        }
    }

    fn partition(&mut self, iteration: u32) -> Option<GenerationStage> {
        let splits = self
            .tree
            .split_iteration(self.config.min_leaf_size, &mut self.rng);
        debug!(iteration, splits, regions = self.tree.len(), "partition iteration");

        if iteration + 1 < self.config.max_iterations {
            Some(GenerationStage::Partition {
                iteration: iteration + 1,
            })
        } else {
            self.begin_carving()
        }
    }

    fn begin_carving(&mut self) -> Option<GenerationStage> {
        self.terminals = self.tree.terminals();
        if self.terminals.is_empty() {
            Some(GenerationStage::CarveCorridors)
        } else {
            Some(GenerationStage::CarveRoom { index: 0 })
        }
    }

    fn carve_next_room(&mut self, index: usize) -> Option<GenerationStage> {
        if let Some(&region_id) = self.terminals.get(index) {
            let region = self.tree.get(region_id).map(|region| region.rect());
            if let Some(rect) = region.and_then(|region| carve_room(region, &mut self.rng)) {
                self.tree.set_room(region_id, rect);
                for cell in rect.cells() {
                    let tile = self.palette.pick(&mut self.rng);
                    let _ = self.floor.insert(cell, tile);
                }
                self.rooms.push(Room::new(region_id, rect));
                debug!(region = region_id.get(), ?rect, "carved room");
            }
        }

        if index + 1 < self.terminals.len() {
            Some(GenerationStage::CarveRoom { index: index + 1 })
        } else {
            Some(GenerationStage::CarveCorridors)
        }
    }

    fn carve_corridors(&mut self) {
        let half_width = self.config.corridor_half_width();
        for id in self.tree.split_regions() {
            let Some((left, right)) = self.tree.get(id).and_then(|region| region.children())
            else {
                continue;
            };
            let (Some(from), Some(to)) = (
                self.tree.representative_room(left),
                self.tree.representative_room(right),
            ) else {
                continue;
            };

            for cell in corridor_cells(from.center(), to.center(), half_width) {
                if !self.floor.contains_key(&cell) {
                    let tile = self.palette.pick(&mut self.rng);
                    let _ = self.floor.insert(cell, tile);
                }
            }
            debug!(from = %from.center(), to = %to.center(), "carved corridor");
        }
    }
}
