//! Enemy spawn candidate placement.

use delve_core::CellCoord;
use glam::Vec2;
use rand::Rng;
use tracing::warn;

use crate::Room;

/// Random placements tried per room before giving up.
const ATTEMPTS_PER_ROOM: u32 = 10;

/// Chooses enemy spawn positions for every room except the first.
///
/// Candidates are cell centers strictly inside the room, at least `spacing`
/// apart from the other candidates of the same room.
pub(crate) fn place_spawn_points<R>(
    rooms: &[Room],
    per_room: u32,
    spacing: f32,
    rng: &mut R,
) -> Vec<Vec2>
where
    R: Rng + ?Sized,
{
    let mut points = Vec::new();
    if per_room == 0 {
        return points;
    }

    for (index, room) in rooms.iter().enumerate().skip(1) {
        let rect = room.rect();
        if rect.width() < 3 || rect.height() < 3 {
            warn!(room = index, ?rect, "room too small to hold enemies");
            continue;
        }

        let mut accepted: Vec<Vec2> = Vec::new();
        for _ in 0..ATTEMPTS_PER_ROOM {
            if accepted.len() >= per_room as usize {
                break;
            }
            let x = rng.gen_range(rect.x() + 1..rect.x_max() - 1);
            let y = rng.gen_range(rect.y() + 1..rect.y_max() - 1);
            let candidate = CellCoord::new(x, y).center();
            if accepted
                .iter()
                .all(|other| other.distance(candidate) >= spacing)
            {
                accepted.push(candidate);
            }
        }

        if accepted.len() < per_room as usize {
            warn!(
                room = index,
                placed = accepted.len(),
                requested = per_room,
                "could not place every requested enemy"
            );
        }
        points.extend(accepted);
    }

    points
}
