use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::Direction;
use tenon_brep::OpHistory;
use tenon_types::ShapeKind;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::registry::ShapeRegistry;

/// The evolution matching pipeline.
///
/// Each stage assigns ids only to currently-nil records, so stage order is
/// load-bearing: run them in the order a feature's operation calls for and
/// always finish with [`ensure_no_nils`](ShapeRegistry::ensure_no_nils) and
/// [`ensure_no_duplicates`](ShapeRegistry::ensure_no_duplicates). `source` is
/// the previous generation (or an input feature's registry); it is never
/// mutated.
impl ShapeRegistry {
    /// Stage: handle equality. A sub-shape the operation carried through
    /// untouched is literally the same handle and keeps its id.
    #[instrument(skip_all, fields(stage = "shape_match"))]
    pub fn shape_match(&mut self, source: &ShapeRegistry) {
        let mut assigned = 0usize;
        for record in source.records() {
            if record.id.is_nil() {
                continue;
            }
            if let Some(slot) = self.slot_by_shape(&record.shape) {
                if self.record_at(slot).id.is_nil() {
                    self.set_slot_id(slot, record.id);
                    assigned += 1;
                }
            }
        }
        debug!(assigned, "stage complete");
    }

    /// Stage: singleton kinds. Exactly one solid before and after means they
    /// correspond, no content inspection needed.
    #[instrument(skip_all, fields(stage = "unique_type_match"))]
    pub fn unique_type_match(&mut self, source: &ShapeRegistry) {
        let mut assigned = 0usize;
        for kind in ShapeKind::ALL {
            let ours: Vec<usize> = (0..self.slot_count())
                .filter(|&slot| self.record_at(slot).shape.kind() == kind)
                .collect();
            if ours.len() != 1 || !self.record_at(ours[0]).id.is_nil() {
                continue;
            }
            let theirs = source.ids_of_kind(kind);
            let sources_of_kind = source
                .records()
                .filter(|r| r.shape.kind() == kind)
                .count();
            if theirs.len() == 1 && sources_of_kind == 1 {
                self.set_slot_id(ours[0], theirs[0]);
                assigned += 1;
            }
        }
        debug!(assigned, "stage complete");
    }

    /// Stage: outer wires. A face matched to its source counterpart pulls
    /// the counterpart's outer-wire id onto its own (still nil) outer wire.
    #[instrument(skip_all, fields(stage = "outer_wire_match"))]
    pub fn outer_wire_match(&mut self, source: &ShapeRegistry) {
        let mut pending = Vec::new();
        for slot in 0..self.slot_count() {
            let record = self.record_at(slot);
            if record.shape.kind() != ShapeKind::Face || record.id.is_nil() {
                continue;
            }
            let Some(wire) = record.shape.outer_wire().cloned() else {
                continue;
            };
            let Some(wire_slot) = self.slot_by_shape(&wire) else {
                continue;
            };
            if !self.record_at(wire_slot).id.is_nil() {
                continue;
            }
            if !source.has_id(record.id) {
                continue;
            }
            let source_face = source.record_by_id(record.id);
            let Some(source_wire) = source_face.shape.outer_wire() else {
                continue;
            };
            if !source.has_shape(source_wire) {
                continue;
            }
            let wire_id = source.id_of(source_wire);
            if !wire_id.is_nil() {
                pending.push((wire_slot, wire_id));
            }
        }
        let assigned = pending.len();
        for (slot, id) in pending {
            self.set_slot_id(slot, id);
        }
        debug!(assigned, "stage complete");
    }

    /// Stage: maker-reported modification. The primary mechanism; queries
    /// the operation history per source shape while the maker is still
    /// alive. The first reported result keeps the source id; further results
    /// are a split and get fresh ids with evolve rows; a result already
    /// claimed is a merge and gets an evolve row only.
    #[instrument(skip_all, fields(stage = "modified_match"))]
    pub fn modified_match(&mut self, history: &OpHistory, source: &ShapeRegistry) {
        let mut assigned = 0usize;
        for record in source.records() {
            if record.id.is_nil() {
                continue;
            }
            let mut claimed_primary = false;
            for new_shape in history.modified(&record.shape) {
                let Some(slot) = self.slot_by_shape(new_shape) else {
                    continue;
                };
                let current = self.record_at(slot).id;
                if !current.is_nil() {
                    // Merge: the target already carries another lineage.
                    self.evolve_mut().add(record.id, current);
                    continue;
                }
                if !claimed_primary && !self.id_in_use(record.id) {
                    self.set_slot_id(slot, record.id);
                    claimed_primary = true;
                } else {
                    // Split: siblings get fresh ids tied back by lineage.
                    let fresh = Uuid::new_v4();
                    self.set_slot_id(slot, fresh);
                    self.evolve_mut().add(record.id, fresh);
                }
                assigned += 1;
            }
        }
        debug!(assigned, "stage complete");
    }

    /// Stage: maker-reported generation, for dress-up style operations where
    /// a consumed edge grows a transition face. `generated_ids` is the
    /// feature's persisted source-id to generated-id map; entries are minted
    /// on first build and reused on every rebuild.
    #[instrument(skip_all, fields(stage = "generated_match"))]
    pub fn generated_match(
        &mut self,
        history: &OpHistory,
        source: &ShapeRegistry,
        generated_ids: &mut HashMap<Uuid, Uuid>,
    ) {
        let mut assigned = 0usize;
        for record in source.records() {
            if record.id.is_nil() {
                continue;
            }
            let generated = history.generated(&record.shape);
            if generated.is_empty() {
                continue;
            }
            if generated.len() > 1 {
                // Known maker anomaly; the first in creation order wins.
                warn!(
                    source_id = %record.id,
                    count = generated.len(),
                    "multiple generated shapes for one source, taking the first"
                );
            }
            let Some(slot) = self.slot_by_shape(&generated[0]) else {
                continue;
            };
            if !self.record_at(slot).id.is_nil() {
                continue;
            }
            let id = *generated_ids.entry(record.id).or_insert_with(Uuid::new_v4);
            if self.id_in_use(id) {
                continue;
            }
            self.set_slot_id(slot, id);
            self.evolve_mut().add(record.id, id);
            assigned += 1;
        }
        debug!(assigned, "stage complete");
    }

    /// Stage: derived identity for shapes no history accounts for. Each nil
    /// record, in enumeration order, takes the id keyed by its nearest
    /// already-identified ancestors; the derived container guarantees the
    /// same ancestor set yields the same id across rebuilds.
    #[instrument(skip_all, fields(stage = "derived_match"))]
    pub fn derived_match(&mut self) {
        let mut assigned = 0usize;
        for slot in 0..self.slot_count() {
            if !self.record_at(slot).id.is_nil() {
                continue;
            }
            let parents = self.nearest_identified_ancestors(slot);
            if parents.is_empty() {
                continue;
            }
            let id = self.derived_mut().derive(&parents);
            if self.id_in_use(id) {
                // Parent-set collision; the duplicate pass regenerates it.
                debug!(%id, "derived id collision, duplicate pass will regenerate");
            }
            self.set_slot_id(slot, id);
            assigned += 1;
        }
        debug!(assigned, "stage complete");
    }

    /// Nearest non-nil ancestors of the record at `slot`: breadth-first up
    /// the containment graph, each branch stopping at its first identified
    /// record.
    fn nearest_identified_ancestors(&self, slot: usize) -> Vec<Uuid> {
        let start = self.record_at(slot).vertex;
        let graph = self.graph();
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut out = Vec::new();
        while let Some(vertex) = queue.pop_front() {
            for parent in graph.neighbors_directed(vertex, Direction::Incoming) {
                if !seen.insert(parent) {
                    continue;
                }
                let record = self.record_by_vertex(parent);
                if record.id.is_nil() {
                    queue.push_back(parent);
                } else {
                    out.push(record.id);
                }
            }
        }
        out.sort();
        out.dedup();
        out
    }

    /// Terminal safety net: any record still nil gets a fresh id.
    #[instrument(skip_all, fields(stage = "ensure_no_nils"))]
    pub fn ensure_no_nils(&mut self) {
        let mut assigned = 0usize;
        for slot in 0..self.slot_count() {
            if self.record_at(slot).id.is_nil() {
                self.set_slot_id(slot, Uuid::new_v4());
                assigned += 1;
            }
        }
        if assigned > 0 {
            debug!(assigned, "records left unmatched, assigned fresh ids");
        }
    }

    /// Terminal safety net: an id on more than one record keeps its first
    /// (enumeration-order) holder; extras are regenerated with evolve rows
    /// tying them back.
    #[instrument(skip_all, fields(stage = "ensure_no_duplicates"))]
    pub fn ensure_no_duplicates(&mut self) {
        let mut first_holder: HashMap<Uuid, usize> = HashMap::new();
        let mut extras = Vec::new();
        for slot in 0..self.slot_count() {
            let id = self.record_at(slot).id;
            if id.is_nil() {
                continue;
            }
            if first_holder.insert(id, slot).is_some() {
                extras.push((slot, id));
            }
        }
        for (slot, old_id) in &extras {
            let fresh = Uuid::new_v4();
            self.set_slot_id(*slot, fresh);
            self.evolve_mut().add(*old_id, fresh);
        }
        if !extras.is_empty() {
            debug!(regenerated = extras.len(), "duplicate ids regenerated");
        }
    }

    /// True once the store satisfies the end-of-update invariant: no nil
    /// ids, no id on more than one record.
    pub fn is_normalized(&self) -> bool {
        let mut seen = HashSet::new();
        self.records()
            .all(|record| !record.id.is_nil() && seen.insert(record.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenon_brep::{BooleanKind, BooleanMaker, BoxMaker, ChamferMaker, Shape};

    /// Registry over `shape` with every record identified, tags assigned
    /// from the maker when given.
    fn identified(shape: &Shape) -> ShapeRegistry {
        let mut registry = ShapeRegistry::new();
        registry.set_shape(shape);
        for nil in registry.nil_shapes() {
            registry.update_id_by_shape(&nil, Uuid::new_v4());
        }
        registry
    }

    #[test]
    fn shape_match_carries_ids_for_identical_handles() {
        let maker = BoxMaker::new(10.0, 10.0, 10.0).expect("valid");
        let source = identified(maker.solid());

        let mut next = ShapeRegistry::new();
        next.set_shape(maker.solid());
        next.shape_match(&source);

        // Everything but the compound root (fresh per generation) matches.
        assert_eq!(next.nil_shapes().len(), 0);
        for record in source.records() {
            if record.shape.kind() != ShapeKind::Compound {
                assert_eq!(next.id_of(&record.shape), record.id);
            }
        }
    }

    #[test]
    fn unique_type_match_pairs_singletons() {
        let before = BoxMaker::new(10.0, 10.0, 10.0).expect("valid");
        let after = BoxMaker::new(20.0, 10.0, 10.0).expect("valid");
        let source = identified(before.solid());

        let mut next = ShapeRegistry::new();
        next.set_shape(after.solid());
        next.unique_type_match(&source);

        let solid_ids = next.ids_of_kind(ShapeKind::Solid);
        assert_eq!(solid_ids, source.ids_of_kind(ShapeKind::Solid));
        assert_eq!(next.ids_of_kind(ShapeKind::Shell).len(), 1);
        assert!(next.ids_of_kind(ShapeKind::Face).is_empty(), "six faces, no match");
    }

    #[test]
    fn modified_match_follows_maker_history() {
        let target_maker = BoxMaker::new(10.0, 10.0, 10.0).expect("valid");
        let tool_maker = BoxMaker::new(4.0, 4.0, 4.0).expect("valid");
        let target = identified(target_maker.solid());
        let tool = identified(tool_maker.solid());

        let boolean = BooleanMaker::new(
            BooleanKind::Subtract,
            target_maker.solid(),
            &[tool_maker.solid().clone()],
        )
        .expect("overlap");

        let mut next = ShapeRegistry::new();
        next.set_shape(boolean.result());
        next.shape_match(&target);
        next.shape_match(&tool);
        next.modified_match(boolean.history(), &target);
        next.modified_match(boolean.history(), &tool);

        // Trimmed target faces keep their old ids.
        for face in target_maker.solid().sub_shapes(ShapeKind::Face) {
            let trimmed = boolean.history().modified(&face);
            if let Some(new_face) = trimmed.first() {
                assert_eq!(next.id_of(new_face), target.id_of(&face));
            }
        }
        // Cavity walls keep the tool's face ids.
        for face in tool_maker.solid().sub_shapes(ShapeKind::Face) {
            if let Some(new_face) = boolean.history().modified(&face).first() {
                assert_eq!(next.id_of(new_face), tool.id_of(&face));
            }
        }
    }

    #[test]
    fn derived_ids_are_stable_across_rebuilds() {
        let target_maker = BoxMaker::new(10.0, 10.0, 10.0).expect("valid");
        let tool_maker = BoxMaker::new(4.0, 4.0, 4.0).expect("valid");
        let target = identified(target_maker.solid());
        let tool = identified(tool_maker.solid());

        let run = |registry: &mut ShapeRegistry| {
            let boolean = BooleanMaker::new(
                BooleanKind::Subtract,
                target_maker.solid(),
                &[tool_maker.solid().clone()],
            )
            .expect("overlap");
            registry.set_shape(boolean.result());
            registry.shape_match(&target);
            registry.shape_match(&tool);
            registry.modified_match(boolean.history(), &target);
            registry.modified_match(boolean.history(), &tool);
            registry.outer_wire_match(&target);
            registry.outer_wire_match(&tool);
            registry.derived_match();
            registry.ensure_no_nils();
            registry.ensure_no_duplicates();
            boolean
                .result()
                .sub_shapes(ShapeKind::Edge)
                .into_iter()
                .filter(|edge| edge.curve().is_some_and(|c| c.is_closed()))
                .map(|edge| registry.id_of(&edge))
                .collect::<Vec<Uuid>>()
        };

        let mut registry = ShapeRegistry::new();
        let first = run(&mut registry);
        let second = run(&mut registry);
        assert!(!first.is_empty(), "subtract produces section edges");
        assert_eq!(first, second, "same parent sets, same derived ids");
    }

    #[test]
    fn generated_match_reuses_persisted_ids_and_warns_on_extras() {
        let maker = BoxMaker::new(10.0, 10.0, 10.0).expect("valid");
        let source = identified(maker.solid());
        let edge = maker
            .tagged()
            .iter()
            .find(|(name, _)| name == "EdgeXPZP")
            .map(|(_, shape)| shape.clone())
            .expect("tag exists");
        let edge_id = source.id_of(&edge);

        let mut generated_ids = HashMap::new();
        let mut face_ids = Vec::new();
        for _ in 0..2 {
            let chamfer =
                ChamferMaker::new(maker.solid(), &[edge.clone()], 1.0).expect("valid input");
            let mut next = ShapeRegistry::new();
            next.set_shape(chamfer.result());
            next.shape_match(&source);
            next.modified_match(chamfer.history(), &source);
            next.generated_match(chamfer.history(), &source, &mut generated_ids);
            let face = &chamfer.history().generated(&edge)[0];
            face_ids.push(next.id_of(face));
        }
        assert_eq!(face_ids[0], face_ids[1], "generated id persists across rebuilds");
        assert_eq!(generated_ids.get(&edge_id), Some(&face_ids[0]));
    }

    #[test]
    fn ensure_stages_close_the_invariant() {
        let maker = BoxMaker::new(10.0, 10.0, 10.0).expect("valid");
        let mut registry = ShapeRegistry::new();
        registry.set_shape(maker.solid());

        // Force a duplicate before normalizing.
        let duplicate = Uuid::new_v4();
        let shapes = registry.shapes_of_kind(ShapeKind::Face);
        registry.update_id_by_shape(&shapes[0], duplicate);
        registry.update_id_by_shape(&shapes[1], duplicate);

        assert!(!registry.is_normalized());
        registry.ensure_no_nils();
        registry.ensure_no_duplicates();
        assert!(registry.is_normalized());
        assert!(
            registry
                .evolve()
                .records()
                .iter()
                .any(|r| r.in_id == duplicate),
            "regenerated extras leave a lineage trail"
        );
    }
}
