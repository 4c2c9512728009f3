use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::Path;

use petgraph::algo::{has_path_connecting, toposort};
use petgraph::dot::Dot;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tenon_types::{InputTag, Pick, ShapeHistory};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::feature::Feature;
use crate::payload::{FeatureInput, UpdatePayload};

/// Report of one `update_model` pass, in processing order.
#[derive(Debug, Default)]
pub struct UpdatePass {
    pub updated: Vec<Uuid>,
    pub failed: Vec<Uuid>,
    pub skipped: Vec<Uuid>,
}

/// The feature dependency graph and its update orchestrator.
///
/// Nodes are features, edges carry the set of input tags the child consumes
/// the parent under. The graph is acyclic by construction: every structural
/// mutation goes through this type, so an attempt to close a cycle is a core
/// bug and panics. Node indices come from a stable graph and survive
/// removals, but the public API speaks feature ids throughout.
#[derive(Debug)]
pub struct Project {
    graph: StableDiGraph<Box<dyn Feature>, BTreeSet<InputTag>>,
    index: HashMap<Uuid, NodeIndex>,
    history: ShapeHistory,
}

impl Project {
    pub fn new() -> Self {
        Project {
            graph: StableDiGraph::new(),
            index: HashMap::new(),
            history: ShapeHistory::new(),
        }
    }

    // ── Structural mutation ──────────────────────────────────────────────

    /// Inserts a feature with no edges; the caller connects it afterward.
    /// Triggers no recompute by itself.
    pub fn add_feature(&mut self, feature: Box<dyn Feature>) -> Uuid {
        let id = feature.id();
        assert!(
            !self.index.contains_key(&id),
            "feature {id} is already in the project"
        );
        let node = self.graph.add_node(feature);
        self.index.insert(id, node);
        id
    }

    /// Adds `tag` to the parent→child edge, creating the edge if absent.
    /// The child's inputs changed, so it goes model-dirty.
    pub fn connect(&mut self, parent: Uuid, child: Uuid, tag: InputTag) {
        let parent_node = self.node(parent);
        let child_node = self.node(child);
        assert!(
            parent != child && !has_path_connecting(&self.graph, child_node, parent_node, None),
            "connecting {parent} -> {child} would close a cycle"
        );
        match self.graph.find_edge(parent_node, child_node) {
            Some(edge) => {
                self.graph[edge].insert(tag);
            }
            None => {
                self.graph
                    .add_edge(parent_node, child_node, BTreeSet::from([tag]));
            }
        }
        self.graph[child_node].core_mut().set_model_dirty();
    }

    /// Connects `child` under `parent` and splices it between `parent` and
    /// parent's existing children, which become children of `child` under
    /// their original tags.
    pub fn connect_insert(&mut self, parent: Uuid, child: Uuid, tag: InputTag) {
        let parent_node = self.node(parent);
        let child_node = self.node(child);
        let moved: Vec<(NodeIndex, BTreeSet<InputTag>)> = self
            .graph
            .edges_directed(parent_node, Direction::Outgoing)
            .filter(|edge| edge.target() != child_node)
            .map(|edge| (edge.target(), edge.weight().clone()))
            .collect();
        for (grandchild, _) in &moved {
            if let Some(edge) = self.graph.find_edge(parent_node, *grandchild) {
                self.graph.remove_edge(edge);
            }
        }
        self.connect(parent, child, tag);
        for (grandchild, tags) in moved {
            let grandchild_id = self.graph[grandchild].id();
            for tag in tags {
                self.connect(child, grandchild_id, tag);
            }
        }
    }

    /// Removes one tag from the child's incoming edges; an edge whose tag
    /// set empties is removed entirely.
    pub fn remove_parent_tag(&mut self, child: Uuid, tag: &InputTag) {
        let child_node = self.node(child);
        let edges: Vec<_> = self
            .graph
            .edges_directed(child_node, Direction::Incoming)
            .map(|edge| edge.id())
            .collect();
        for edge in edges {
            if let Some(tags) = self.graph.edge_weight_mut(edge) {
                tags.remove(tag);
                if tags.is_empty() {
                    self.graph.remove_edge(edge);
                }
            }
        }
        self.graph[child_node].core_mut().set_model_dirty();
    }

    /// Removes every incoming edge of `id`.
    pub fn clear_all_inputs(&mut self, id: Uuid) {
        let node = self.node(id);
        let edges: Vec<_> = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .map(|edge| edge.id())
            .collect();
        for edge in edges {
            self.graph.remove_edge(edge);
        }
        self.graph[node].core_mut().set_model_dirty();
    }

    /// Removes a feature, splicing its parents to its children so the
    /// downstream chain keeps updating. Children keep the tags they consumed
    /// the removed feature under, now pointing at each former parent.
    pub fn remove_feature(&mut self, id: Uuid) -> Box<dyn Feature> {
        let node = self.node(id);
        let parents: Vec<Uuid> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .map(|n| self.graph[n].id())
            .collect();
        let children: Vec<(Uuid, BTreeSet<InputTag>)> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|edge| (self.graph[edge.target()].id(), edge.weight().clone()))
            .collect();

        let removed = self
            .graph
            .remove_node(node)
            .unwrap_or_else(|| panic!("feature {id} vanished during removal"));
        self.index.remove(&id);

        for (child, tags) in &children {
            for parent in &parents {
                for tag in tags {
                    self.connect(*parent, *child, tag.clone());
                }
            }
            let child_node = self.node(*child);
            self.graph[child_node].core_mut().set_model_dirty();
        }
        removed
    }

    // ── Access ───────────────────────────────────────────────────────────

    fn node(&self, id: Uuid) -> NodeIndex {
        *self
            .index
            .get(&id)
            .unwrap_or_else(|| panic!("project has no feature {id}"))
    }

    pub fn has_feature(&self, id: Uuid) -> bool {
        self.index.contains_key(&id)
    }

    pub fn feature(&self, id: Uuid) -> &dyn Feature {
        self.graph[self.node(id)].as_ref()
    }

    pub fn feature_mut(&mut self, id: Uuid) -> &mut dyn Feature {
        let node = self.node(id);
        self.graph[node].as_mut()
    }

    /// The concrete feature behind `id`, for parameter edits.
    pub fn feature_as_mut<T: Feature + 'static>(&mut self, id: Uuid) -> Option<&mut T> {
        self.feature_mut(id).as_any_mut().downcast_mut::<T>()
    }

    pub fn feature_ids(&self) -> Vec<Uuid> {
        self.graph.node_weights().map(|f| f.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn shape_history(&self) -> &ShapeHistory {
        &self.history
    }

    pub fn set_model_dirty(&mut self, id: Uuid) {
        let node = self.node(id);
        self.graph[node].core_mut().set_model_dirty();
    }

    /// A pick against `feature_id`'s current registry, carrying the frozen
    /// devolve lineage of `shape_id` and the feature-tag fallback when the
    /// shape has one.
    pub fn create_pick(&self, feature_id: Uuid, shape_id: Uuid) -> Pick {
        let registry = self.feature(feature_id).registry();
        let mut pick = Pick::with_history(shape_id, self.history.devolve_history(shape_id));
        pick.tag = registry.tags().tag_for_id(shape_id).map(str::to_string);
        pick
    }

    // ── Graph queries ────────────────────────────────────────────────────

    /// Incoming dependencies of `id`, grouped by input tag.
    pub fn parent_map(&self, id: Uuid) -> BTreeMap<InputTag, Vec<Uuid>> {
        let node = self.node(id);
        let mut map: BTreeMap<InputTag, Vec<Uuid>> = BTreeMap::new();
        for edge in self.graph.edges_directed(node, Direction::Incoming) {
            let parent = self.graph[edge.source()].id();
            for tag in edge.weight() {
                map.entry(tag.clone()).or_default().push(parent);
            }
        }
        map
    }

    /// Descendants of `id` currently flagged leaf.
    pub fn leaf_children(&self, id: Uuid) -> Vec<Uuid> {
        self.reachable(self.node(id), Direction::Outgoing)
            .into_iter()
            .filter(|&n| self.graph[n].core().is_leaf())
            .map(|n| self.graph[n].id())
            .collect()
    }

    /// All leaves of `id`'s lineage: leaves among the descendants of `id`
    /// and of every ancestor of `id`, `id` itself included when it is one.
    pub fn related_leafs(&self, id: Uuid) -> Vec<Uuid> {
        let start = self.node(id);
        let mut roots = self.reachable(start, Direction::Incoming);
        roots.push(start);
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for root in roots {
            for node in std::iter::once(root).chain(self.reachable(root, Direction::Outgoing)) {
                if self.graph[node].core().is_leaf() && seen.insert(node) {
                    out.push(self.graph[node].id());
                }
            }
        }
        out
    }

    /// Direct parents of `id`: the features the visible leaf set rewinds to
    /// when `id` is opened for editing.
    pub fn rewind_inputs(&self, id: Uuid) -> Vec<Uuid> {
        let node = self.node(id);
        let mut parents: Vec<Uuid> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .map(|n| self.graph[n].id())
            .collect();
        parents.dedup();
        parents
    }

    /// Makes `id` the visible terminal of its lineage: ancestors become
    /// active non-leaves, `id` the active leaf, descendants inactive.
    /// Unrelated features are untouched. A projection, not a structural
    /// mutation; no feature goes model-dirty.
    pub fn set_current_leaf(&mut self, id: Uuid) {
        let target = self.node(id);
        for node in self.reachable(target, Direction::Incoming) {
            let core = self.graph[node].core_mut();
            core.set_active(true);
            core.set_leaf(false);
        }
        for node in self.reachable(target, Direction::Outgoing) {
            let core = self.graph[node].core_mut();
            core.set_active(false);
            core.set_leaf(false);
        }
        let core = self.graph[target].core_mut();
        core.set_active(true);
        core.set_leaf(true);
    }

    fn reachable(&self, start: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut out = Vec::new();
        while let Some(node) = queue.pop_front() {
            for next in self.graph.neighbors_directed(node, direction) {
                if seen.insert(next) {
                    out.push(next);
                    queue.push_back(next);
                }
            }
        }
        out
    }

    // ── Update orchestration ─────────────────────────────────────────────

    /// The payload `id`'s builder would receive right now: clones of every
    /// parent registry grouped by input tag, plus the project history.
    pub fn payload_for(&self, id: Uuid) -> UpdatePayload {
        let node = self.node(id);
        let mut payload = UpdatePayload::new(self.history.clone());
        for edge in self.graph.edges_directed(node, Direction::Incoming) {
            let parent = &self.graph[edge.source()];
            for tag in edge.weight() {
                payload.push(
                    tag.clone(),
                    FeatureInput {
                        feature_id: parent.id(),
                        registry: parent.registry().clone(),
                    },
                );
            }
        }
        payload
    }

    /// Recomputes every dirty feature and its transitive dependents in
    /// topological order. A failed feature records its message and the pass
    /// continues; inactive features are skipped and stay dirty. Ends by
    /// rebuilding the project-wide shape history from the surviving
    /// registries.
    #[instrument(skip(self))]
    pub fn update_model(&mut self) -> UpdatePass {
        // Input changes dirty their consumers transitively before ordering.
        let dirty: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&n| self.graph[n].core().is_model_dirty())
            .collect();
        for node in dirty {
            for dependent in self.reachable(node, Direction::Outgoing) {
                self.graph[dependent].core_mut().set_model_dirty();
            }
        }

        let order = match toposort(&self.graph, None) {
            Ok(order) => order,
            Err(cycle) => panic!(
                "feature graph contains a cycle through {}",
                self.graph[cycle.node_id()].id()
            ),
        };

        let mut pass = UpdatePass::default();
        for node in order {
            let feature = &self.graph[node];
            if !feature.core().is_model_dirty() {
                continue;
            }
            let id = feature.id();
            if !feature.core().is_active() {
                pass.skipped.push(id);
                continue;
            }
            let payload = self.payload_for(id);
            let feature = &mut self.graph[node];
            match feature.build(&payload) {
                Ok(()) => {
                    feature.core_mut().clear_failure();
                    info!(feature_id = %id, name = feature.name(), "update complete");
                    pass.updated.push(id);
                }
                Err(err) => {
                    let message = err.to_string();
                    warn!(feature_id = %id, name = feature.name(), error = %message, "feature failed");
                    feature.core_mut().record_failure(message);
                    pass.failed.push(id);
                }
            }
            let core = feature.core_mut();
            core.set_model_clean();
            core.set_visual_dirty();
        }

        self.rebuild_history();
        pass
    }

    /// Rebuilds a single feature right now and marks it clean, with the same
    /// failure handling as an update pass. For loaders that interleave
    /// geometry rebuilds with identity restoration; the caller is
    /// responsible for dependency order.
    pub fn rebuild_feature(&mut self, id: Uuid) {
        let payload = self.payload_for(id);
        let node = self.node(id);
        let feature = &mut self.graph[node];
        match feature.build(&payload) {
            Ok(()) => feature.core_mut().clear_failure(),
            Err(err) => {
                let message = err.to_string();
                warn!(feature_id = %id, error = %message, "feature failed");
                feature.core_mut().record_failure(message);
            }
        }
        let core = feature.core_mut();
        core.set_model_clean();
        core.set_visual_dirty();
    }

    /// Replaces the project-wide history with one rebuilt from every
    /// feature's current registry and evolve rows, in dependency order.
    pub fn rebuild_history(&mut self) {
        self.history.clear();
        let order = match toposort(&self.graph, None) {
            Ok(order) => order,
            Err(cycle) => panic!(
                "feature graph contains a cycle through {}",
                self.graph[cycle.node_id()].id()
            ),
        };
        for node in order {
            let feature = &self.graph[node];
            let feature_id = feature.id();
            for record in feature.registry().records() {
                self.history.add_shape(feature_id, record.id);
            }
            for row in feature.registry().evolve().records() {
                self.history.add_evolution(row.in_id, row.out_id);
            }
        }
    }

    /// Writes the feature DAG in graphviz dot format.
    pub fn dump_graph(&self, path: &Path) -> std::io::Result<()> {
        let mapped = self.graph.map(
            |_, feature| format!("{} [{}]", feature.name(), feature.kind()),
            |_, tags| {
                tags.iter()
                    .map(InputTag::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            },
        );
        std::fs::write(path, format!("{}", Dot::new(&mapped)))
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}
