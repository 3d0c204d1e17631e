//! Patrol and flee target sampling.

use delve_core::CellCoord;
use glam::Vec2;
use rand::Rng;
use rand_distr::{Distribution, UnitCircle, UnitDisc};
use tracing::warn;

const PATROL_ATTEMPTS: u32 = 10;
const FLEE_ATTEMPTS: u32 = 30;
const MIN_AWAY_LENGTH_SQUARED: f32 = 0.01;

fn unit_disc<R>(rng: &mut R) -> Vec2
where
    R: Rng + ?Sized,
{
    let [x, y]: [f32; 2] = UnitDisc.sample(rng);
    Vec2::new(x, y)
}

/// Samples a reachable point within `radius` of `position`.
///
/// Returns the center of the first allowed cell hit, or `None` when every
/// attempt missed.
pub(crate) fn sample_patrol_target<R, F>(
    position: Vec2,
    radius: f32,
    is_allowed: F,
    rng: &mut R,
) -> Option<Vec2>
where
    R: Rng + ?Sized,
    F: Fn(CellCoord) -> bool,
{
    (0..PATROL_ATTEMPTS).find_map(|_| {
        let cell = CellCoord::containing(position + unit_disc(rng) * radius);
        is_allowed(cell).then(|| cell.center())
    })
}

/// Picks a point away from `threat`.
///
/// Random samples around `position + away * radius` are tried first, then
/// unit steps straight away from the threat. When both fail the agent stays
/// where it is.
pub(crate) fn flee_target<R, F>(
    position: Vec2,
    threat: Vec2,
    radius: f32,
    is_allowed: F,
    rng: &mut R,
) -> Vec2
where
    R: Rng + ?Sized,
    F: Fn(CellCoord) -> bool,
{
    let offset = position - threat;
    let away = if offset.length_squared() < MIN_AWAY_LENGTH_SQUARED {
        let [x, y]: [f32; 2] = UnitCircle.sample(rng);
        Vec2::new(x, y)
    } else {
        offset.normalize()
    };

    let sampled = (0..FLEE_ATTEMPTS).find_map(|_| {
        let candidate = position + away * radius + unit_disc(rng) * radius;
        let cell = CellCoord::containing(candidate);
        is_allowed(cell).then(|| cell.center())
    });
    if let Some(target) = sampled {
        return target;
    }

    let steps = radius.ceil().max(0.0) as u32;
    let scanned = (1..=steps).find_map(|step| {
        let cell = CellCoord::containing(position + away * step as f32);
        is_allowed(cell).then(|| cell.center())
    });
    if let Some(target) = scanned {
        return target;
    }

    warn!(?position, "no flee target found; staying in place");
    position
}
