//! Difficulty tiers that grow the level between sessions.

use delve_system_generation::GenerationConfig;
use serde::{Deserialize, Serialize};

/// Rules for growing the level from one tier to the next.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Highest reachable level number.
    pub max_level: u32,
    /// Level width at level one.
    pub default_width: i32,
    /// Level height at level one.
    pub default_height: i32,
    /// Partition iterations at level one.
    pub default_max_iterations: u32,
    /// Minimum leaf size at level one.
    pub default_min_leaf_size: i32,
    /// Floor for the minimum leaf size as levels advance.
    pub min_allowed_leaf_size: i32,
    /// Corridor width used on every level.
    pub default_corridor_width: u32,
    /// Width added per level.
    pub width_step: i32,
    /// Height added per level.
    pub height_step: i32,
    /// Partition iterations added per level.
    pub iterations_step: u32,
    /// Enemies per room at level one.
    pub default_enemies_per_room: u32,
    /// Enemies per room added per level.
    pub enemies_per_room_step: u32,
    /// Cap on enemies per room.
    pub max_enemies_per_room: u32,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            max_level: 10,
            default_width: 25,
            default_height: 25,
            default_max_iterations: 5,
            default_min_leaf_size: 8,
            min_allowed_leaf_size: 6,
            default_corridor_width: 1,
            width_step: 5,
            height_step: 5,
            iterations_step: 2,
            default_enemies_per_room: 1,
            enemies_per_room_step: 1,
            max_enemies_per_room: 10,
        }
    }
}

/// Level shape for the active difficulty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DifficultyTier {
    level: u32,
    width: i32,
    height: i32,
    max_iterations: u32,
    min_leaf_size: i32,
    corridor_width: u32,
    enemies_per_room: u32,
}

impl DifficultyTier {
    /// Tier for level one.
    #[must_use]
    pub fn initial(config: &ProgressionConfig) -> Self {
        Self {
            level: 1,
            width: config.default_width,
            height: config.default_height,
            max_iterations: config.default_max_iterations,
            min_leaf_size: config.default_min_leaf_size,
            corridor_width: config.default_corridor_width,
            enemies_per_room: config.default_enemies_per_room,
        }
    }

    /// Moves to the next level. Returns `false` and leaves the tier untouched
    /// at the maximum level.
    pub fn advance(&mut self, config: &ProgressionConfig) -> bool {
        if self.level >= config.max_level {
            return false;
        }

        self.level += 1;
        self.width += config.width_step;
        self.height += config.height_step;
        self.max_iterations += config.iterations_step;
        self.min_leaf_size = (self.min_leaf_size - 1).max(config.min_allowed_leaf_size);
        self.corridor_width = config.default_corridor_width;
        self.enemies_per_room = (self.enemies_per_room + config.enemies_per_room_step)
            .min(config.max_enemies_per_room);
        true
    }

    /// Player-facing level number, starting at one.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Level width in cells.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Level height in cells.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Partition iterations.
    #[must_use]
    pub const fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Minimum leaf size.
    #[must_use]
    pub const fn min_leaf_size(&self) -> i32 {
        self.min_leaf_size
    }

    /// Enemies requested per room.
    #[must_use]
    pub const fn enemies_per_room(&self) -> u32 {
        self.enemies_per_room
    }

    /// Overlays the tier's level shape on `base`. Tile tables, spacing and
    /// pacing come from `base`.
    #[must_use]
    pub fn generation_config(&self, base: &GenerationConfig) -> GenerationConfig {
        GenerationConfig {
            width: self.width,
            height: self.height,
            max_iterations: self.max_iterations,
            min_leaf_size: self.min_leaf_size,
            corridor_width: self.corridor_width,
            enemies_per_room: self.enemies_per_room,
            ..base.clone()
        }
    }

    /// Names the shape fields of `base` that were changed from their defaults
    /// but are replaced by a different value from the tier.
    #[must_use]
    pub fn shadowed_fields(&self, base: &GenerationConfig) -> Vec<&'static str> {
        let defaults = GenerationConfig::default();
        let merged = self.generation_config(base);
        [
            ("width", base.width != defaults.width && base.width != merged.width),
            ("height", base.height != defaults.height && base.height != merged.height),
            (
                "max_iterations",
                base.max_iterations != defaults.max_iterations
                    && base.max_iterations != merged.max_iterations,
            ),
            (
                "min_leaf_size",
                base.min_leaf_size != defaults.min_leaf_size
                    && base.min_leaf_size != merged.min_leaf_size,
            ),
            (
                "corridor_width",
                base.corridor_width != defaults.corridor_width
                    && base.corridor_width != merged.corridor_width,
            ),
            (
                "enemies_per_room",
                base.enemies_per_room != defaults.enemies_per_room
                    && base.enemies_per_room != merged.enemies_per_room,
            ),
        ]
        .into_iter()
        .filter_map(|(name, shadowed)| shadowed.then_some(name))
        .collect()
    }
}
