//! Target selection for the attack loop.
//!
//! Pure geometry over one world snapshot: filter candidates by kind,
//! distance, line of sight and field of view, then score the survivors so a
//! centered nearby target beats a barely-in-view distant one.

use nalgebra::{Point3, Vector3};

use crate::adapter::{AgentState, EntitySnapshot};
use crate::config::CombatConfig;

/// Unit look vector from yaw/pitch. Yaw 0 faces -Z, positive pitch looks up.
pub fn look_direction(yaw: f64, pitch: f64) -> Vector3<f64> {
    Vector3::new(
        -yaw.sin() * pitch.cos(),
        pitch.sin(),
        -yaw.cos() * pitch.cos(),
    )
}

/// Pick the best attackable entity, or None when nothing qualifies.
///
/// Rejections: ineligible kind, the agent itself, distance strictly beyond
/// `range`, no line of sight, direction cosine strictly below `fov_cos`
/// (a candidate exactly on the threshold passes). Survivors are scored
/// `2*cos + (range - dist)`; the first best in snapshot order wins ties.
pub fn select_target(
    agent: &AgentState,
    entities: &[EntitySnapshot],
    combat: &CombatConfig,
    line_of_sight: impl Fn(Point3<f64>, Point3<f64>) -> bool,
) -> Option<EntitySnapshot> {
    let eye = agent.eye_position();
    let look = look_direction(agent.yaw, agent.pitch);

    let mut best: Option<(f64, &EntitySnapshot)> = None;

    for entity in entities {
        if entity.id == agent.entity_id {
            continue;
        }
        if !combat.is_eligible_kind(&entity.kind) {
            continue;
        }

        let offset = entity.position - eye;
        let dist = offset.norm();
        if dist > combat.range {
            continue;
        }
        if !line_of_sight(eye, entity.position) {
            continue;
        }
        if dist <= f64::EPSILON {
            continue;
        }

        let cos = offset.normalize().dot(&look);
        if cos < combat.fov_cos {
            continue;
        }

        let score = 2.0 * cos + (combat.range - dist);
        match best {
            Some((best_score, _)) if best_score >= score => {}
            _ => best = Some((score, entity)),
        }
    }

    best.map(|(_, entity)| entity.clone())
}
