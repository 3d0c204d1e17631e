//! ASCII rendering of an installed level.

use std::collections::BTreeSet;

use delve_core::CellCoord;
use delve_system_generation::Level;
use glam::Vec2;

/// Draws walls as `#`, floor as `.`, agents as `E` and the player as `@`.
///
/// Rows run from the smallest y to the largest and cover every wall cell,
/// including walls that sit outside the level bounds.
pub(crate) fn render(level: &Level, agents: &[Vec2], player: Option<Vec2>) -> String {
    let cells = level.floor().keys().chain(level.walls().keys());
    let Some((min, max)) = cells.fold(None, |acc: Option<(CellCoord, CellCoord)>, cell| {
        Some(match acc {
            None => (*cell, *cell),
            Some((min, max)) => (
                CellCoord::new(min.x().min(cell.x()), min.y().min(cell.y())),
                CellCoord::new(max.x().max(cell.x()), max.y().max(cell.y())),
            ),
        })
    }) else {
        return String::new();
    };

    let agent_cells: BTreeSet<CellCoord> = agents
        .iter()
        .map(|position| CellCoord::containing(*position))
        .collect();
    let player_cell = player.map(CellCoord::containing);

    let mut out = String::new();
    for y in min.y()..=max.y() {
        for x in min.x()..=max.x() {
            let cell = CellCoord::new(x, y);
            let glyph = if player_cell == Some(cell) {
                '@'
            } else if agent_cells.contains(&cell) {
                'E'
            } else if level.walls().contains_key(&cell) {
                '#'
            } else if level.is_floor(cell) {
                '.'
            } else {
                ' '
            };
            out.push(glyph);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use delve_core::Command;
    use delve_world::{
        apply,
        headless::{HeadlessFactory, HeadlessTiles},
        query, SessionConfig, World,
    };

    fn level() -> Level {
        let config = SessionConfig {
            seed: Some(7),
            ..SessionConfig::default()
        };
        let mut world = World::new(
            config,
            Box::new(HeadlessFactory::new()),
            Box::new(HeadlessTiles::new()),
        );
        let mut events = Vec::new();
        apply(&mut world, Command::GenerateLevel, &mut events).expect("generate");
        query::level(&world).cloned().expect("level")
    }

    #[test]
    fn map_marks_every_floor_and_wall_cell() {
        let level = level();
        let map = render(&level, &[], None);

        let floor = map.chars().filter(|glyph| *glyph == '.').count();
        let walls = map.chars().filter(|glyph| *glyph == '#').count();
        assert_eq!(floor, level.floor().len());
        assert_eq!(walls, level.walls().len());
    }

    #[test]
    fn player_is_drawn_over_agents() {
        let level = level();
        let spawn = level.player_spawn().expect("first room");
        let map = render(&level, &[spawn], Some(spawn));
        assert_eq!(map.matches('@').count(), 1);
        assert_eq!(map.matches('E').count(), 0);
    }
}
