use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use tenon_brep::Shape;
use tenon_types::ShapeKind;
use tracing::debug;
use uuid::Uuid;

use crate::containers::{DerivedContainer, EvolveContainer, TagContainer};

/// One row of the identity table: stable id, shape handle, containment-graph
/// vertex. Rows live in an arena in enumeration order; the indices below
/// cross-reference by slot, never by pointer.
#[derive(Debug, Clone)]
pub struct ShapeRecord {
    pub id: Uuid,
    pub shape: Shape,
    pub vertex: NodeIndex,
}

/// Identity store for one feature's current shape generation.
///
/// Triple-indexed over one arena: by id (a multiset while a matching pass is
/// in flight), by shape handle, and by graph vertex. The containment graph
/// runs parent to child (compound down to vertex) and is rebuilt wholesale on
/// every [`set_shape`](ShapeRegistry::set_shape), never patched.
#[derive(Debug, Clone, Default)]
pub struct ShapeRegistry {
    records: Vec<ShapeRecord>,
    by_id: HashMap<Uuid, Vec<usize>>,
    by_shape: HashMap<Shape, usize>,
    by_vertex: HashMap<NodeIndex, usize>,
    graph: DiGraph<usize, ()>,
    root: Option<Shape>,
    evolve: EvolveContainer,
    tags: TagContainer,
    derived: DerivedContainer,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the root shape wholesale.
    ///
    /// Non-compound input is wrapped in a compound root. Every unique,
    /// non-degenerate sub-shape gets a record with a nil id and a fresh graph
    /// vertex; the root itself gets a fresh non-nil id. The evolve container
    /// belongs to the replaced generation and is cleared; tags and derived
    /// ids survive.
    pub fn set_shape(&mut self, shape: &Shape) {
        let root = if shape.kind() == ShapeKind::Compound {
            shape.clone()
        } else {
            Shape::compound(vec![shape.clone()])
        };

        self.records.clear();
        self.by_id.clear();
        self.by_shape.clear();
        self.by_vertex.clear();
        self.graph.clear();
        self.evolve.clear();

        for sub in root.all_sub_shapes() {
            if sub.is_degenerate() {
                continue;
            }
            let slot = self.records.len();
            let vertex = self.graph.add_node(slot);
            self.records.push(ShapeRecord {
                id: Uuid::nil(),
                shape: sub.clone(),
                vertex,
            });
            self.by_shape.insert(sub, slot);
            self.by_vertex.insert(vertex, slot);
        }

        self.link_children(&root);
        self.root = Some(root);
        self.set_slot_id(0, Uuid::new_v4());
        debug!(records = self.records.len(), "registry repopulated");
    }

    fn link_children(&mut self, parent: &Shape) {
        let Some(&parent_slot) = self.by_shape.get(parent) else {
            return;
        };
        let parent_vertex = self.records[parent_slot].vertex;
        for child in parent.children() {
            if let Some(&child_slot) = self.by_shape.get(child) {
                let child_vertex = self.records[child_slot].vertex;
                self.graph.update_edge(parent_vertex, child_vertex, ());
            }
            self.link_children(child);
        }
    }

    // ── Index bookkeeping ────────────────────────────────────────────────

    pub(crate) fn set_slot_id(&mut self, slot: usize, id: Uuid) {
        let old = self.records[slot].id;
        if !old.is_nil() {
            if let Some(slots) = self.by_id.get_mut(&old) {
                slots.retain(|&s| s != slot);
                if slots.is_empty() {
                    self.by_id.remove(&old);
                }
            }
        }
        self.records[slot].id = id;
        if !id.is_nil() {
            self.by_id.entry(id).or_default().push(slot);
        }
    }

    pub(crate) fn slot_by_shape(&self, shape: &Shape) -> Option<usize> {
        self.by_shape.get(shape).copied()
    }

    pub(crate) fn graph(&self) -> &DiGraph<usize, ()> {
        &self.graph
    }

    pub(crate) fn record_at(&self, slot: usize) -> &ShapeRecord {
        &self.records[slot]
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn id_in_use(&self, id: Uuid) -> bool {
        self.by_id.contains_key(&id)
    }

    // ── Existence checks ─────────────────────────────────────────────────

    pub fn has_id(&self, id: Uuid) -> bool {
        !id.is_nil() && self.by_id.contains_key(&id)
    }

    pub fn has_shape(&self, shape: &Shape) -> bool {
        self.by_shape.contains_key(shape)
    }

    pub fn has_vertex(&self, vertex: NodeIndex) -> bool {
        self.by_vertex.contains_key(&vertex)
    }

    // ── Lookups; callers check existence first ───────────────────────────

    pub fn record_by_id(&self, id: Uuid) -> &ShapeRecord {
        let slots = self
            .by_id
            .get(&id)
            .unwrap_or_else(|| panic!("registry has no record for id {id}"));
        &self.records[slots[0]]
    }

    pub fn record_by_shape(&self, shape: &Shape) -> &ShapeRecord {
        let slot = self
            .by_shape
            .get(shape)
            .unwrap_or_else(|| panic!("registry has no record for shape {}", shape.token()));
        &self.records[*slot]
    }

    pub fn record_by_vertex(&self, vertex: NodeIndex) -> &ShapeRecord {
        let slot = self
            .by_vertex
            .get(&vertex)
            .unwrap_or_else(|| panic!("registry has no record for vertex {vertex:?}"));
        &self.records[*slot]
    }

    pub fn shape_of(&self, id: Uuid) -> &Shape {
        &self.record_by_id(id).shape
    }

    pub fn id_of(&self, shape: &Shape) -> Uuid {
        self.record_by_shape(shape).id
    }

    // ── Record updates; missing keys are core bugs ───────────────────────

    pub fn update_id(&mut self, old_id: Uuid, new_id: Uuid) {
        let slots = self
            .by_id
            .get(&old_id)
            .unwrap_or_else(|| panic!("update_id: no record for id {old_id}"))
            .clone();
        for slot in slots {
            self.set_slot_id(slot, new_id);
        }
    }

    pub fn update_id_by_shape(&mut self, shape: &Shape, id: Uuid) {
        let slot = self
            .by_shape
            .get(shape)
            .copied()
            .unwrap_or_else(|| panic!("update_id_by_shape: no record for {}", shape.token()));
        self.set_slot_id(slot, id);
    }

    pub fn update_id_by_vertex(&mut self, vertex: NodeIndex, id: Uuid) {
        let slot = self
            .by_vertex
            .get(&vertex)
            .copied()
            .unwrap_or_else(|| panic!("update_id_by_vertex: no record for {vertex:?}"));
        self.set_slot_id(slot, id);
    }

    pub fn update_shape_by_vertex(&mut self, vertex: NodeIndex, shape: Shape) {
        let slot = self
            .by_vertex
            .get(&vertex)
            .copied()
            .unwrap_or_else(|| panic!("update_shape_by_vertex: no record for {vertex:?}"));
        self.by_shape.remove(&self.records[slot].shape);
        self.by_shape.insert(shape.clone(), slot);
        self.records[slot].shape = shape;
    }

    pub fn update_shape(&mut self, id: Uuid, shape: Shape) {
        let slots = self
            .by_id
            .get(&id)
            .unwrap_or_else(|| panic!("update_shape: no record for id {id}"));
        assert_eq!(slots.len(), 1, "update_shape: id {id} is ambiguous");
        let slot = slots[0];
        self.by_shape.remove(&self.records[slot].shape);
        self.by_shape.insert(shape.clone(), slot);
        self.records[slot].shape = shape;
    }

    // ── Enumeration ──────────────────────────────────────────────────────

    pub fn records(&self) -> impl Iterator<Item = &ShapeRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All non-nil ids, in enumeration order.
    pub fn all_ids(&self) -> Vec<Uuid> {
        self.records
            .iter()
            .map(|r| r.id)
            .filter(|id| !id.is_nil())
            .collect()
    }

    pub fn all_shapes(&self) -> Vec<Shape> {
        self.records.iter().map(|r| r.shape.clone()).collect()
    }

    /// Shapes still waiting for an id; what every matching stage works down.
    pub fn nil_shapes(&self) -> Vec<Shape> {
        self.records
            .iter()
            .filter(|r| r.id.is_nil())
            .map(|r| r.shape.clone())
            .collect()
    }

    pub fn ids_of_kind(&self, kind: ShapeKind) -> Vec<Uuid> {
        self.records
            .iter()
            .filter(|r| r.shape.kind() == kind && !r.id.is_nil())
            .map(|r| r.id)
            .collect()
    }

    pub fn shapes_of_kind(&self, kind: ShapeKind) -> Vec<Shape> {
        self.records
            .iter()
            .filter(|r| r.shape.kind() == kind)
            .map(|r| r.shape.clone())
            .collect()
    }

    /// The normalized compound root, once set.
    pub fn root_shape(&self) -> Option<&Shape> {
        self.root.as_ref()
    }

    /// Id of the root record; nil before the first `set_shape`.
    pub fn root_id(&self) -> Uuid {
        self.records.first().map_or(Uuid::nil(), |r| r.id)
    }

    // ── Containers ───────────────────────────────────────────────────────

    pub fn evolve(&self) -> &EvolveContainer {
        &self.evolve
    }

    pub fn evolve_mut(&mut self) -> &mut EvolveContainer {
        &mut self.evolve
    }

    pub fn tags(&self) -> &TagContainer {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut TagContainer {
        &mut self.tags
    }

    pub fn derived(&self) -> &DerivedContainer {
        &self.derived
    }

    pub fn derived_mut(&mut self) -> &mut DerivedContainer {
        &mut self.derived
    }

    pub(crate) fn replace_containers(
        &mut self,
        evolve: EvolveContainer,
        tags: TagContainer,
        derived: DerivedContainer,
    ) {
        self.evolve = evolve;
        self.tags = tags;
        self.derived = derived;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenon_brep::BoxMaker;

    fn box_registry() -> ShapeRegistry {
        let maker = BoxMaker::new(10.0, 10.0, 10.0).expect("valid");
        let mut registry = ShapeRegistry::new();
        registry.set_shape(maker.solid());
        registry
    }

    #[test]
    fn set_shape_records_every_sub_shape_with_nil_ids() {
        let registry = box_registry();
        // compound root + solid + shell + 6 faces + 6 wires + 12 edges + 8 vertices
        assert_eq!(registry.len(), 35);
        assert_eq!(registry.nil_shapes().len(), 34, "only the root has an id");
        assert!(!registry.root_id().is_nil());
        assert_eq!(registry.all_ids(), vec![registry.root_id()]);
    }

    #[test]
    fn non_compound_input_is_wrapped() {
        let registry = box_registry();
        let root = registry.root_shape().expect("shape set");
        assert_eq!(root.kind(), ShapeKind::Compound);
    }

    #[test]
    fn triple_index_round_trips() {
        let mut registry = box_registry();
        let face = registry.shapes_of_kind(ShapeKind::Face)[0].clone();
        let id = Uuid::new_v4();
        registry.update_id_by_shape(&face, id);

        assert!(registry.has_id(id));
        let record = registry.record_by_id(id);
        assert_eq!(record.shape, face);
        let vertex = record.vertex;
        assert_eq!(registry.record_by_vertex(vertex).id, id);
        assert_eq!(registry.id_of(&face), id);
    }

    #[test]
    fn set_shape_replaces_the_generation_wholesale() {
        let mut registry = box_registry();
        let first_root = registry.root_id();
        registry.evolve_mut().add(Uuid::new_v4(), Uuid::new_v4());
        registry.tags_mut().add(Uuid::new_v4(), "FaceXP");

        let maker = BoxMaker::new(20.0, 10.0, 10.0).expect("valid");
        registry.set_shape(maker.solid());

        assert_ne!(registry.root_id(), first_root, "fresh root id per generation");
        assert!(registry.evolve().is_empty(), "evolve rows die with the generation");
        assert_eq!(registry.tags().len(), 1, "tags survive the replacement");
        assert_eq!(registry.nil_shapes().len(), 34);
    }

    #[test]
    #[should_panic(expected = "no record for id")]
    fn lookup_of_unknown_id_is_a_contract_violation() {
        let registry = box_registry();
        registry.record_by_id(Uuid::new_v4());
    }
}
