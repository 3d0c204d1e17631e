//! Agent tunables.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Vision cone parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// When false the player counts as always visible.
    pub enabled: bool,
    /// Total field of view in degrees.
    pub angle_degrees: f32,
    /// Number of rays spread evenly across the field of view.
    pub ray_count: u32,
    /// Maximum ray length. Rays never reach beyond the detection range.
    pub distance: f32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            angle_degrees: 60.0,
            ray_count: 5,
            distance: 10.0,
        }
    }
}

/// Behaviour parameters shared by every agent of a difficulty tier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Pursuit speed in cells per second.
    pub speed: f32,
    /// Patrol speed in cells per second.
    pub patrol_speed: f32,
    /// Flee speed in cells per second.
    pub flee_speed: f32,
    /// Distance at which the agent stops closing in and attacks.
    pub ideal_distance: f32,
    /// Extra distance tolerated before an attack turns back into pursuit.
    pub dead_zone: f32,
    /// Lower bound of the idle timer in seconds.
    pub idle_min: f32,
    /// Upper bound of the idle timer in seconds.
    pub idle_max: f32,
    /// Distance within which a patrolling agent notices the player.
    pub detection_range: f32,
    /// Distance within which a player projectile forces pursuit.
    pub threat_radius: f32,
    /// Vision cone.
    pub vision: VisionConfig,
    /// Radius sampled for patrol targets.
    pub patrol_radius: f32,
    /// Distance at which a patrol target counts as reached.
    pub patrol_tolerance: f32,
    /// Radius used to sample flee targets.
    pub flee_radius: f32,
    /// Seconds a flee episode lasts.
    pub flee_duration: f32,
    /// Seconds that must pass between two flee episodes.
    pub flee_cooldown: f32,
    /// Health at or below which the agent may flee.
    pub flee_health_threshold: i32,
    /// Probability of fleeing once the health threshold is reached.
    pub flee_chance: f32,
    /// Health every agent spawns with.
    pub max_health: i32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            speed: 2.0,
            patrol_speed: 1.0,
            flee_speed: 3.5,
            ideal_distance: 5.0,
            dead_zone: 0.5,
            idle_min: 1.0,
            idle_max: 3.0,
            detection_range: 5.0,
            threat_radius: 3.0,
            vision: VisionConfig::default(),
            patrol_radius: 2.0,
            patrol_tolerance: 0.5,
            flee_radius: 5.0,
            flee_duration: 3.0,
            flee_cooldown: 5.0,
            flee_health_threshold: 1,
            flee_chance: 0.5,
            max_health: 3,
        }
    }
}

impl AgentConfig {
    /// Draws a fresh idle duration from `[idle_min, idle_max)`.
    pub fn random_idle_time<R>(&self, rng: &mut R) -> f32
    where
        R: Rng + ?Sized,
    {
        if self.idle_max > self.idle_min {
            rng.gen_range(self.idle_min..self.idle_max)
        } else {
            self.idle_min
        }
    }
}
