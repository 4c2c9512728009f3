use std::collections::HashMap;

use tenon_brep::{BlendMaker, ChamferMaker, Shape};
use tenon_naming::ShapeRegistry;
use tenon_types::{Pick, ResolvePolicy, ShapeHistory, ShapeKind};
use tracing::debug;
use uuid::Uuid;

use crate::feature::{Feature, FeatureCore, FeatureParams, GeneratedRow};
use crate::features::first_solid;
use crate::payload::{FeatureInput, UpdatePayload};
use crate::resolve::resolve_picks;
use crate::BuildError;

/// Edge chamfer driven by stored picks against the `target` role.
///
/// The source-id to chamfer-face-id map persists on the feature across
/// rebuilds, so the face born from an edge keeps one id for the life of the
/// feature even though the face itself is remade every update.
#[derive(Debug)]
pub struct Chamfer {
    core: FeatureCore,
    picks: Vec<Pick>,
    distance: f64,
    generated: HashMap<Uuid, Uuid>,
}

impl Chamfer {
    pub fn new(picks: Vec<Pick>, distance: f64) -> Self {
        Chamfer {
            core: FeatureCore::new("chamfer"),
            picks,
            distance,
            generated: HashMap::new(),
        }
    }

    pub fn restore(
        id: Uuid,
        name: &str,
        picks: Vec<Pick>,
        distance: f64,
        generated: &[GeneratedRow],
    ) -> Self {
        Chamfer {
            core: FeatureCore::with_id(id, name),
            picks,
            distance,
            generated: generated
                .iter()
                .map(|row| (row.source, row.generated))
                .collect(),
        }
    }

    pub fn picks(&self) -> &[Pick] {
        &self.picks
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn set_distance(&mut self, distance: f64) {
        self.distance = distance;
        self.core.set_model_dirty();
    }

    pub fn set_picks(&mut self, picks: Vec<Pick>) {
        self.picks = picks;
        self.core.set_model_dirty();
    }
}

impl Feature for Chamfer {
    fn core(&self) -> &FeatureCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FeatureCore {
        &mut self.core
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn kind(&self) -> &'static str {
        "chamfer"
    }

    fn build(&mut self, payload: &UpdatePayload) -> Result<(), BuildError> {
        let target = require_target(payload)?;
        let solid = first_solid(&target.registry).ok_or_else(|| BuildError::NoSolidInput {
            role: "target".to_string(),
        })?;
        let edges = resolve_edges(&target.registry, &self.picks, &payload.history)?;
        let maker = ChamferMaker::new(&solid, &edges, self.distance)?;
        run_dressup_matching(
            self.core.registry_mut(),
            &mut self.generated,
            maker.result(),
            maker.history(),
            &target.registry,
        );
        Ok(())
    }

    fn params(&self) -> FeatureParams {
        FeatureParams::Chamfer {
            picks: self.picks.clone(),
            distance: self.distance,
            generated: generated_rows(&self.generated),
        }
    }
}

/// Edge blend (fillet). Same composition as [`Chamfer`], and the feature
/// that exercises the multiple-generated-shapes path: blending a closed edge
/// splits it into two faces, of which the first reported keeps the persisted
/// id and the rest fall through to derived matching.
#[derive(Debug)]
pub struct Blend {
    core: FeatureCore,
    picks: Vec<Pick>,
    radius: f64,
    generated: HashMap<Uuid, Uuid>,
}

impl Blend {
    pub fn new(picks: Vec<Pick>, radius: f64) -> Self {
        Blend {
            core: FeatureCore::new("blend"),
            picks,
            radius,
            generated: HashMap::new(),
        }
    }

    pub fn restore(
        id: Uuid,
        name: &str,
        picks: Vec<Pick>,
        radius: f64,
        generated: &[GeneratedRow],
    ) -> Self {
        Blend {
            core: FeatureCore::with_id(id, name),
            picks,
            radius,
            generated: generated
                .iter()
                .map(|row| (row.source, row.generated))
                .collect(),
        }
    }

    pub fn picks(&self) -> &[Pick] {
        &self.picks
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius;
        self.core.set_model_dirty();
    }

    pub fn set_picks(&mut self, picks: Vec<Pick>) {
        self.picks = picks;
        self.core.set_model_dirty();
    }
}

impl Feature for Blend {
    fn core(&self) -> &FeatureCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FeatureCore {
        &mut self.core
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn kind(&self) -> &'static str {
        "blend"
    }

    fn build(&mut self, payload: &UpdatePayload) -> Result<(), BuildError> {
        let target = require_target(payload)?;
        let solid = first_solid(&target.registry).ok_or_else(|| BuildError::NoSolidInput {
            role: "target".to_string(),
        })?;
        let edges = resolve_edges(&target.registry, &self.picks, &payload.history)?;
        let maker = BlendMaker::new(&solid, &edges, self.radius)?;
        run_dressup_matching(
            self.core.registry_mut(),
            &mut self.generated,
            maker.result(),
            maker.history(),
            &target.registry,
        );
        Ok(())
    }

    fn params(&self) -> FeatureParams {
        FeatureParams::Blend {
            picks: self.picks.clone(),
            radius: self.radius,
            generated: generated_rows(&self.generated),
        }
    }
}

fn require_target(payload: &UpdatePayload) -> Result<&FeatureInput, BuildError> {
    payload
        .single(&tenon_types::InputTag::target())
        .ok_or_else(|| BuildError::MissingInput {
            role: "target".to_string(),
        })
}

/// Resolves every pick and keeps the edges, deduplicated by handle. Under
/// the default best-effort policy all picks resolving empty fails the build
/// and a subset resolving is fine; a strict pick must resolve to exactly one
/// edge on its own.
fn resolve_edges(
    registry: &ShapeRegistry,
    picks: &[Pick],
    history: &ShapeHistory,
) -> Result<Vec<Shape>, BuildError> {
    let mut edges: Vec<Shape> = Vec::new();
    for pick in picks {
        let mut resolved = 0usize;
        for id in resolve_picks(registry, pick, history) {
            let shape = registry.shape_of(id);
            if shape.kind() == ShapeKind::Edge {
                resolved += 1;
                if !edges.contains(shape) {
                    edges.push(shape.clone());
                }
            }
        }
        if pick.policy == ResolvePolicy::Strict && resolved != 1 {
            return Err(BuildError::StrictPick {
                id: pick.id,
                count: resolved,
            });
        }
    }
    if edges.is_empty() {
        return Err(BuildError::EmptyPicks);
    }
    debug!(count = edges.len(), "picks resolved to edges");
    Ok(edges)
}

/// The dress-up matching composition shared by chamfer and blend.
fn run_dressup_matching(
    registry: &mut ShapeRegistry,
    generated: &mut HashMap<Uuid, Uuid>,
    result: &Shape,
    history: &tenon_brep::OpHistory,
    source: &ShapeRegistry,
) {
    registry.set_shape(result);
    registry.shape_match(source);
    registry.modified_match(history, source);
    registry.unique_type_match(source);
    registry.generated_match(history, source, generated);
    registry.outer_wire_match(source);
    registry.derived_match();
    registry.ensure_no_nils();
    registry.ensure_no_duplicates();
}

fn generated_rows(map: &HashMap<Uuid, Uuid>) -> Vec<GeneratedRow> {
    let mut rows: Vec<GeneratedRow> = map
        .iter()
        .map(|(&source, &generated)| GeneratedRow { source, generated })
        .collect();
    rows.sort_by_key(|row| row.source);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{Cuboid, Cylinder};
    use tenon_types::InputTag;

    fn target_payload(feature: &dyn Feature) -> UpdatePayload {
        let mut payload = UpdatePayload::new(ShapeHistory::new());
        payload.push(
            InputTag::target(),
            FeatureInput {
                feature_id: feature.id(),
                registry: feature.registry().clone(),
            },
        );
        payload
    }

    fn edge_pick(feature: &dyn Feature, tag: &str) -> Pick {
        let id = feature
            .registry()
            .tags()
            .id_for_tag(tag)
            .expect("tag registered");
        let mut pick = Pick::from_id(id);
        pick.tag = Some(tag.to_string());
        pick
    }

    #[test]
    fn chamfer_face_id_persists_across_rebuilds() {
        let mut cuboid = Cuboid::new(10.0, 10.0, 10.0);
        cuboid.build(&UpdatePayload::default()).expect("valid dims");
        let mut chamfer = Chamfer::new(vec![edge_pick(&cuboid, "EdgeXPZP")], 1.0);

        chamfer.build(&target_payload(&cuboid)).expect("chamfer builds");
        let faces_before = chamfer.registry().ids_of_kind(ShapeKind::Face);
        assert_eq!(faces_before.len(), 7, "six box faces plus the chamfer face");

        // Upstream resize; the pick re-resolves by id, the generated map
        // hands the remade chamfer face its old id.
        cuboid.set_length(20.0);
        cuboid.build(&UpdatePayload::default()).expect("valid dims");
        chamfer.build(&target_payload(&cuboid)).expect("chamfer rebuilds");
        let faces_after = chamfer.registry().ids_of_kind(ShapeKind::Face);

        for id in &faces_before {
            assert!(faces_after.contains(id), "face id {id} lost in rebuild");
        }
    }

    #[test]
    fn blend_of_a_closed_edge_takes_the_first_generated_face() {
        let mut cylinder = Cylinder::new(3.0, 8.0);
        cylinder.build(&UpdatePayload::default()).expect("valid dims");
        let rim = edge_pick(&cylinder, "EdgeTop");
        let rim_id = rim.id;
        let mut blend = Blend::new(vec![rim], 0.5);

        blend.build(&target_payload(&cylinder)).expect("blend builds");
        let registry = blend.registry();
        assert!(registry.is_normalized());
        // Closed edge split into two faces; one carries the persisted
        // generated id, the other fell through to the later stages.
        let evolved = registry.evolve().evolved(rim_id);
        assert_eq!(evolved.len(), 1, "one generated face claims the lineage");
        assert!(registry.has_id(evolved[0]));
    }

    #[test]
    fn all_picks_dead_fails_the_build() {
        let mut cuboid = Cuboid::new(10.0, 10.0, 10.0);
        cuboid.build(&UpdatePayload::default()).expect("valid dims");
        let mut chamfer = Chamfer::new(vec![Pick::from_id(Uuid::new_v4())], 1.0);

        let err = chamfer
            .build(&target_payload(&cuboid))
            .expect_err("nothing resolves");
        assert!(matches!(err, BuildError::EmptyPicks));
    }

    #[test]
    fn dead_strict_pick_fails_even_when_others_resolve() {
        let mut cuboid = Cuboid::new(10.0, 10.0, 10.0);
        cuboid.build(&UpdatePayload::default()).expect("valid dims");
        let live = edge_pick(&cuboid, "EdgeXPZP");
        let dead = Pick::from_id(Uuid::new_v4()).with_policy(ResolvePolicy::Strict);
        let mut chamfer = Chamfer::new(vec![live, dead], 1.0);

        let err = chamfer
            .build(&target_payload(&cuboid))
            .expect_err("strict pick is dead");
        assert!(matches!(err, BuildError::StrictPick { count: 0, .. }));
    }
}
