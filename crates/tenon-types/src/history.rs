use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lineage graph over shape ids: one vertex per id, one edge per evolution
/// step (in-id became out-id). Ids are project-global, so a shape that passes
/// through several features untouched occupies a single vertex; the recorded
/// feature is whichever introduced the id first.
///
/// The project rebuilds its history wholesale after every update pass; picks
/// carry a frozen ancestor subgraph captured at selection time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(into = "HistoryState", from = "HistoryState")]
pub struct ShapeHistory {
    graph: DiGraph<HistoryNode, ()>,
    index: HashMap<Uuid, NodeIndex>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryNode {
    pub feature_id: Uuid,
    pub shape_id: Uuid,
}

impl ShapeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.graph.clear();
        self.index.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn shape_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Registers `shape_id` as introduced by `feature_id`. A second
    /// registration of the same id is a no-op; the introducing feature wins.
    pub fn add_shape(&mut self, feature_id: Uuid, shape_id: Uuid) {
        if shape_id.is_nil() || self.index.contains_key(&shape_id) {
            return;
        }
        let vertex = self.graph.add_node(HistoryNode {
            feature_id,
            shape_id,
        });
        self.index.insert(shape_id, vertex);
    }

    /// Records that `in_id` evolved into `out_id`. Nil in-ids mark creation
    /// and add no edge; missing endpoints are inserted without an owning
    /// feature so stale lineage still connects.
    pub fn add_evolution(&mut self, in_id: Uuid, out_id: Uuid) {
        if in_id.is_nil() || out_id.is_nil() || in_id == out_id {
            return;
        }
        self.connect(in_id, out_id);
    }

    fn connect(&mut self, in_id: Uuid, out_id: Uuid) {
        let source = self.vertex_or_insert(in_id);
        let target = self.vertex_or_insert(out_id);
        if self.graph.find_edge(source, target).is_none() {
            self.graph.add_edge(source, target, ());
        }
    }

    fn vertex_or_insert(&mut self, shape_id: Uuid) -> NodeIndex {
        match self.index.get(&shape_id) {
            Some(vertex) => *vertex,
            None => {
                let vertex = self.graph.add_node(HistoryNode {
                    feature_id: Uuid::nil(),
                    shape_id,
                });
                self.index.insert(shape_id, vertex);
                vertex
            }
        }
    }

    pub fn has_shape(&self, shape_id: Uuid) -> bool {
        self.index.contains_key(&shape_id)
    }

    /// Feature that introduced `shape_id`, if the id is known and owned.
    pub fn feature_of(&self, shape_id: Uuid) -> Option<Uuid> {
        let vertex = self.index.get(&shape_id)?;
        let node = self.graph[*vertex];
        (!node.feature_id.is_nil()).then_some(node.feature_id)
    }

    /// Direct evolution successors of `shape_id`.
    pub fn evolved(&self, shape_id: Uuid) -> Vec<Uuid> {
        self.neighbor_ids(shape_id, Direction::Outgoing)
    }

    /// Direct evolution predecessors of `shape_id`.
    pub fn devolved(&self, shape_id: Uuid) -> Vec<Uuid> {
        self.neighbor_ids(shape_id, Direction::Incoming)
    }

    /// All forward-reachable ids from `shape_id` in breadth-first order,
    /// nearest generation first, excluding `shape_id` itself.
    pub fn descendants(&self, shape_id: Uuid) -> Vec<Uuid> {
        self.reachable(shape_id, Direction::Outgoing)
    }

    /// All backward-reachable ids from `shape_id` in breadth-first order,
    /// nearest generation first, excluding `shape_id` itself.
    pub fn ancestors(&self, shape_id: Uuid) -> Vec<Uuid> {
        self.reachable(shape_id, Direction::Incoming)
    }

    /// Frozen ancestor subgraph of `shape_id` (the id itself included), used
    /// as a pick's private lineage snapshot.
    pub fn devolve_history(&self, shape_id: Uuid) -> ShapeHistory {
        let mut out = ShapeHistory::new();
        let Some(&start) = self.index.get(&shape_id) else {
            return out;
        };
        let mut keep = HashSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(vertex) = queue.pop_front() {
            if !keep.insert(vertex) {
                continue;
            }
            for prev in self.graph.neighbors_directed(vertex, Direction::Incoming) {
                queue.push_back(prev);
            }
        }
        for &vertex in &keep {
            let node = self.graph[vertex];
            out.add_shape(node.feature_id, node.shape_id);
        }
        for edge in self.graph.edge_indices() {
            if let Some((source, target)) = self.graph.edge_endpoints(edge) {
                if keep.contains(&source) && keep.contains(&target) {
                    out.connect(self.graph[source].shape_id, self.graph[target].shape_id);
                }
            }
        }
        out
    }

    pub fn shape_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.graph.node_weights().map(|node| node.shape_id)
    }

    fn neighbor_ids(&self, shape_id: Uuid, direction: Direction) -> Vec<Uuid> {
        let Some(&vertex) = self.index.get(&shape_id) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(vertex, direction)
            .map(|v| self.graph[v].shape_id)
            .collect()
    }

    fn reachable(&self, shape_id: Uuid, direction: Direction) -> Vec<Uuid> {
        let Some(&start) = self.index.get(&shape_id) else {
            return Vec::new();
        };
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut out = Vec::new();
        while let Some(vertex) = queue.pop_front() {
            for next in self.graph.neighbors_directed(vertex, direction) {
                if seen.insert(next) {
                    out.push(self.graph[next].shape_id);
                    queue.push_back(next);
                }
            }
        }
        out
    }
}

// ── Serialized form ──────────────────────────────────────────────────────────

/// Flat wire form of a history graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryState {
    pub shapes: Vec<HistoryShapeRow>,
    pub evolutions: Vec<HistoryEdgeRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryShapeRow {
    pub feature_id: Uuid,
    pub shape_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEdgeRow {
    pub in_id: Uuid,
    pub out_id: Uuid,
}

impl From<ShapeHistory> for HistoryState {
    fn from(history: ShapeHistory) -> Self {
        let shapes = history
            .graph
            .node_weights()
            .map(|node| HistoryShapeRow {
                feature_id: node.feature_id,
                shape_id: node.shape_id,
            })
            .collect();
        let evolutions = history
            .graph
            .edge_indices()
            .filter_map(|edge| history.graph.edge_endpoints(edge))
            .map(|(source, target)| HistoryEdgeRow {
                in_id: history.graph[source].shape_id,
                out_id: history.graph[target].shape_id,
            })
            .collect();
        HistoryState { shapes, evolutions }
    }
}

impl From<HistoryState> for ShapeHistory {
    fn from(state: HistoryState) -> Self {
        let mut history = ShapeHistory::new();
        for row in state.shapes {
            history.add_shape(row.feature_id, row.shape_id);
        }
        for row in state.evolutions {
            history.connect(row.in_id, row.out_id);
        }
        history
    }
}
