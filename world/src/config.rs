//! Session-wide configuration.

use std::time::Duration;

use delve_system_agent::AgentConfig;
use delve_system_generation::GenerationConfig;
use serde::{Deserialize, Serialize};

use crate::ProgressionConfig;

/// Loot dropped by defeated agents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LootConfig {
    /// Probability that a defeated agent drops a health pack.
    pub health_pack_chance: f64,
}

impl Default for LootConfig {
    fn default() -> Self {
        Self {
            health_pack_chance: 0.5,
        }
    }
}

/// Level teardown pacing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeardownConfig {
    /// Seconds of simulated time between the level becoming empty and the
    /// cleared notification.
    pub settle_seconds: f32,
    /// Polls after which a slow teardown is reported.
    pub expected_ticks: u64,
}

impl TeardownConfig {
    /// Settle delay as a duration.
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::try_from_secs_f32(self.settle_seconds).unwrap_or(Duration::ZERO)
    }
}

impl Default for TeardownConfig {
    fn default() -> Self {
        Self {
            settle_seconds: 0.5,
            expected_ticks: 250,
        }
    }
}

/// Everything a level session needs to run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Tile tables and pacing. Width, height, partition iterations, leaf
    /// size, corridor width and enemies per room are replaced by the active
    /// difficulty tier; set them under `[progression]` instead.
    pub generation: GenerationConfig,
    /// Behaviour shared by every agent.
    pub agent: AgentConfig,
    /// Difficulty tiers.
    pub progression: ProgressionConfig,
    /// Loot drops.
    pub loot: LootConfig,
    /// Teardown pacing.
    pub teardown: TeardownConfig,
    /// Seed for the session's random source. Entropy is used when absent.
    pub seed: Option<u64>,
}
