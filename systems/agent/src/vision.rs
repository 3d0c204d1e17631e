//! Vision cone raycasting.

use delve_core::{AgentId, HitSubject, VisionProbe};
use glam::Vec2;

use crate::VisionConfig;

/// Directions of the rays making up a vision cone centered on `facing`.
///
/// Rays are evenly spaced from `-angle / 2` to `+angle / 2`. A single ray
/// points straight ahead.
#[must_use]
pub fn cone_directions(facing: Vec2, config: &VisionConfig) -> Vec<Vec2> {
    let forward = facing.normalize_or_zero();
    if forward == Vec2::ZERO {
        return Vec::new();
    }

    match config.ray_count {
        0 => Vec::new(),
        1 => vec![forward],
        count => {
            let angle = config.angle_degrees.to_radians();
            let step = angle / (count - 1) as f32;
            (0..count)
                .map(|index| Vec2::from_angle(-angle / 2.0 + step * index as f32).rotate(forward))
                .collect()
        }
    }
}

/// Reports whether any ray of the cone first hits the player.
pub(crate) fn player_visible(
    probe: &dyn VisionProbe,
    caster: AgentId,
    origin: Vec2,
    facing: Vec2,
    config: &VisionConfig,
    detection_range: f32,
) -> bool {
    if !config.enabled {
        return true;
    }

    let range = config.distance.min(detection_range);
    cone_directions(facing, config).into_iter().any(|direction| {
        probe
            .cast_ray(origin, direction, range, caster)
            .is_some_and(|hit| hit.subject == HitSubject::Player)
    })
}
