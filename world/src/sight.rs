use delve_core::{AgentId, CellCoord, HitSubject, RayHit, VisionProbe};
use delve_system_generation::Level;
use glam::Vec2;

const MARCH_STEP: f32 = 0.1;
const PLAYER_RADIUS: f32 = 0.5;
const AGENT_RADIUS: f32 = 0.4;

/// Ray marcher over the installed level used when the host supplies no
/// vision probe of its own. Non-floor cells block sight.
pub(crate) struct LevelSight<'a> {
    pub(crate) level: Option<&'a Level>,
    pub(crate) player: Option<Vec2>,
    pub(crate) agents: &'a [(AgentId, Vec2)],
}

impl VisionProbe for LevelSight<'_> {
    fn cast_ray(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        caster: AgentId,
    ) -> Option<RayHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec2::ZERO || max_distance <= 0.0 {
            return None;
        }

        let mut distance = 0.0;
        while distance <= max_distance {
            let point = origin + direction * distance;
            if let Some(subject) = self.subject_at(point, caster) {
                return Some(RayHit { subject, distance });
            }
            distance += MARCH_STEP;
        }
        None
    }
}

impl LevelSight<'_> {
    fn subject_at(&self, point: Vec2, caster: AgentId) -> Option<HitSubject> {
        if let Some(level) = self.level {
            if !level.is_floor(CellCoord::containing(point)) {
                return Some(HitSubject::Obstacle);
            }
        }
        if self
            .player
            .is_some_and(|player| player.distance(point) <= PLAYER_RADIUS)
        {
            return Some(HitSubject::Player);
        }
        self.agents
            .iter()
            .find(|(id, position)| *id != caster && position.distance(point) <= AGENT_RADIUS)
            .map(|(id, _)| HitSubject::Agent(*id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_space_sees_the_player() {
        let sight = LevelSight {
            level: None,
            player: Some(Vec2::new(4.0, 0.0)),
            agents: &[],
        };
        let hit = sight
            .cast_ray(Vec2::ZERO, Vec2::X, 10.0, AgentId::new(0))
            .expect("hit");
        assert_eq!(hit.subject, HitSubject::Player);
        assert!((hit.distance - 3.5).abs() < 0.11);
    }

    #[test]
    fn caster_does_not_block_its_own_ray() {
        let caster = AgentId::new(1);
        let agents = [(caster, Vec2::ZERO), (AgentId::new(2), Vec2::new(2.0, 0.0))];
        let sight = LevelSight {
            level: None,
            player: Some(Vec2::new(5.0, 0.0)),
            agents: &agents,
        };
        let hit = sight
            .cast_ray(Vec2::ZERO, Vec2::X, 10.0, caster)
            .expect("hit");
        assert_eq!(hit.subject, HitSubject::Agent(AgentId::new(2)));
    }

    #[test]
    fn rays_stop_at_their_reach() {
        let sight = LevelSight {
            level: None,
            player: Some(Vec2::new(8.0, 0.0)),
            agents: &[],
        };
        assert_eq!(sight.cast_ray(Vec2::ZERO, Vec2::X, 3.0, AgentId::new(0)), None);
    }
}
