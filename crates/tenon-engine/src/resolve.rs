use nalgebra::Point3;
use tenon_naming::ShapeRegistry;
use tenon_types::{Locator, Pick, ShapeHistory};
use tracing::debug;
use uuid::Uuid;

/// Resolves a stored pick against a feature's current registry.
///
/// Order of attempts: the pick's id verbatim; current descendants of the id
/// via the global history (nearest generation first); the nearest ancestor
/// from the pick's own frozen lineage; the feature-tag fallback. An empty
/// result is a valid outcome, not an error; the caller decides whether an
/// empty required role fails its build.
pub fn resolve_picks(registry: &ShapeRegistry, pick: &Pick, global: &ShapeHistory) -> Vec<Uuid> {
    if registry.has_id(pick.id) {
        return vec![pick.id];
    }

    let descendants: Vec<Uuid> = global
        .descendants(pick.id)
        .into_iter()
        .filter(|&id| registry.has_id(id))
        .collect();
    if !descendants.is_empty() {
        debug!(pick_id = %pick.id, count = descendants.len(), "pick resolved forward");
        return descendants;
    }

    for ancestor in pick.history.ancestors(pick.id) {
        if registry.has_id(ancestor) {
            debug!(pick_id = %pick.id, %ancestor, "pick resolved backward");
            return vec![ancestor];
        }
    }

    if let Some(tag) = pick.tag.as_deref() {
        if let Some(id) = registry.tags().id_for_tag(tag) {
            if registry.has_id(id) {
                debug!(pick_id = %pick.id, tag, "pick resolved by feature tag");
                return vec![id];
            }
        }
    }

    debug!(pick_id = %pick.id, "pick resolved to nothing");
    Vec::new()
}

/// Resolves a pick and re-derives its located point(s) from the resolved
/// base shapes. Picks without a locator yield no points.
pub fn resolve_pick_points(
    registry: &ShapeRegistry,
    pick: &Pick,
    global: &ShapeHistory,
) -> Vec<Point3<f64>> {
    let Some(locator) = pick.locator else {
        return Vec::new();
    };
    let mut points = Vec::new();
    for id in resolve_picks(registry, pick, global) {
        match locator {
            Locator::EndPoints => points.extend(registry.end_points(id)),
            Locator::MidPoint => points.extend(registry.mid_point(id)),
            Locator::CenterPoint => points.extend(registry.center_point(id)),
            Locator::QuadrantPoints => points.extend(registry.quadrant_points(id)),
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenon_brep::BoxMaker;

    fn identified_box() -> (ShapeRegistry, BoxMaker) {
        let maker = BoxMaker::new(10.0, 10.0, 10.0).expect("valid");
        let mut registry = ShapeRegistry::new();
        registry.set_shape(maker.solid());
        for shape in registry.nil_shapes() {
            registry.update_id_by_shape(&shape, Uuid::new_v4());
        }
        for (tag, shape) in maker.tagged() {
            let shape_id = registry.id_of(shape);
            registry.tags_mut().add(shape_id, tag.clone());
        }
        (registry, maker)
    }

    #[test]
    fn direct_hit_short_circuits() {
        let (registry, _) = identified_box();
        let id = registry.all_ids()[3];
        let pick = Pick::from_id(id);
        assert_eq!(resolve_picks(&registry, &pick, &ShapeHistory::new()), vec![id]);
    }

    #[test]
    fn forward_resolution_follows_global_history() {
        let (registry, _) = identified_box();
        let current = registry.all_ids()[3];
        let stale = Uuid::new_v4();
        let mut global = ShapeHistory::new();
        global.add_evolution(stale, current);

        let pick = Pick::from_id(stale);
        assert_eq!(resolve_picks(&registry, &pick, &global), vec![current]);
    }

    #[test]
    fn backward_resolution_uses_the_frozen_lineage() {
        let (registry, _) = identified_box();
        let ancestor = registry.all_ids()[3];
        let stale = Uuid::new_v4();
        let mut lineage = ShapeHistory::new();
        lineage.add_evolution(ancestor, stale);

        let pick = Pick::with_history(stale, lineage);
        assert_eq!(
            resolve_picks(&registry, &pick, &ShapeHistory::new()),
            vec![ancestor]
        );
    }

    #[test]
    fn tag_fallback_and_empty_are_checked_outcomes() {
        let (registry, maker) = identified_box();
        let face_id = registry
            .tags()
            .id_for_tag("FaceXP")
            .expect("primitive tags registered");
        let face = maker
            .tagged()
            .iter()
            .find(|(name, _)| name == "FaceXP")
            .map(|(_, shape)| registry.id_of(shape));
        assert_eq!(face, Some(face_id));

        let mut tagged_pick = Pick::from_id(Uuid::new_v4());
        tagged_pick.tag = Some("FaceXP".to_string());
        assert_eq!(
            resolve_picks(&registry, &tagged_pick, &ShapeHistory::new()),
            vec![face_id]
        );

        let hopeless = Pick::from_id(Uuid::new_v4());
        assert!(resolve_picks(&registry, &hopeless, &ShapeHistory::new()).is_empty());
    }

    #[test]
    fn locator_points_are_rederived_after_resolution() {
        let (registry, maker) = identified_box();
        let edge = maker
            .tagged()
            .iter()
            .find(|(name, _)| name == "EdgeYMZM")
            .map(|(_, shape)| registry.id_of(shape))
            .expect("tag exists");

        let pick = Pick::from_id(edge).with_locator(Locator::MidPoint);
        let points = resolve_pick_points(&registry, &pick, &ShapeHistory::new());
        assert_eq!(points, vec![Point3::new(5.0, 0.0, 0.0)]);

        let bare = Pick::from_id(edge);
        assert!(resolve_pick_points(&registry, &bare, &ShapeHistory::new()).is_empty());
    }
}
