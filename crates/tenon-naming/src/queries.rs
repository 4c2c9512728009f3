use std::collections::{HashSet, VecDeque};

use nalgebra::Point3;
use petgraph::Direction;
use tenon_types::ShapeKind;
use uuid::Uuid;

use crate::registry::ShapeRegistry;

/// Adjacency and geometry queries against the containment graph. All of
/// these treat absence as a checked outcome (nil id, empty vector), never an
/// error; only passing an id the registry does not hold at all is a contract
/// violation.
impl ShapeRegistry {
    /// All ancestors of `id` with the requested kind, breadth-first, nearest
    /// first.
    pub fn parents_of_kind(&self, id: Uuid, kind: ShapeKind) -> Vec<Uuid> {
        self.related_of_kind(id, kind, Direction::Incoming)
    }

    /// All descendants of `id` with the requested kind, breadth-first,
    /// nearest first.
    pub fn children_of_kind(&self, id: Uuid, kind: ShapeKind) -> Vec<Uuid> {
        self.related_of_kind(id, kind, Direction::Outgoing)
    }

    fn related_of_kind(&self, id: Uuid, kind: ShapeKind, direction: Direction) -> Vec<Uuid> {
        let start = self.record_by_id(id).vertex;
        let graph = self.graph();
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut out = Vec::new();
        while let Some(vertex) = queue.pop_front() {
            for next in graph.neighbors_directed(vertex, direction) {
                if !seen.insert(next) {
                    continue;
                }
                let record = self.record_by_vertex(next);
                if record.shape.kind() == kind && !record.id.is_nil() {
                    out.push(record.id);
                }
                queue.push_back(next);
            }
        }
        out
    }

    /// The wire of `face_id` that contains `edge_id`; nil when the edge does
    /// not bound that face.
    pub fn wire_of(&self, edge_id: Uuid, face_id: Uuid) -> Uuid {
        for wire_id in self.children_of_kind(face_id, ShapeKind::Wire) {
            if self
                .children_of_kind(wire_id, ShapeKind::Edge)
                .contains(&edge_id)
            {
                return wire_id;
            }
        }
        Uuid::nil()
    }

    /// Among the wires of `face_id`, the one nearest to `point` by minimum
    /// edge-curve distance; nil when the face has no measurable wire.
    pub fn closest_wire(&self, face_id: Uuid, point: &Point3<f64>) -> Uuid {
        let mut best: Option<(Uuid, f64)> = None;
        for wire_id in self.children_of_kind(face_id, ShapeKind::Wire) {
            let mut wire_distance = f64::INFINITY;
            for edge_id in self.children_of_kind(wire_id, ShapeKind::Edge) {
                let edge = self.shape_of(edge_id);
                if let Some(distance) = edge.curve().and_then(|c| c.distance_to(point)) {
                    wire_distance = wire_distance.min(distance);
                }
            }
            if wire_distance.is_finite()
                && best.is_none_or(|(_, best_distance)| wire_distance < best_distance)
            {
                best = Some((wire_id, wire_distance));
            }
        }
        best.map_or(Uuid::nil(), |(id, _)| id)
    }

    /// Curve endpoints of an edge; empty for closed, degenerate, or non-edge
    /// records.
    pub fn end_points(&self, edge_id: Uuid) -> Vec<Point3<f64>> {
        self.edge_curve(edge_id)
            .map_or(Vec::new(), |curve| curve.end_points())
    }

    /// Parametric midpoint; None for curves without one.
    pub fn mid_point(&self, edge_id: Uuid) -> Option<Point3<f64>> {
        self.edge_curve(edge_id).and_then(|curve| curve.mid_point())
    }

    /// Conic center; None for open curves.
    pub fn center_point(&self, edge_id: Uuid) -> Option<Point3<f64>> {
        self.edge_curve(edge_id)
            .and_then(|curve| curve.center_point())
    }

    /// The four axis crossings of a conic; empty otherwise.
    pub fn quadrant_points(&self, edge_id: Uuid) -> Vec<Point3<f64>> {
        self.edge_curve(edge_id)
            .map_or(Vec::new(), |curve| curve.quadrant_points())
    }

    fn edge_curve(&self, edge_id: Uuid) -> Option<&tenon_brep::Curve> {
        let record = self.record_by_id(edge_id);
        if record.shape.kind() != ShapeKind::Edge {
            return None;
        }
        record.shape.curve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ShapeRegistry;
    use tenon_brep::{BoxMaker, CylinderMaker};

    /// Registry over a box with every record given an id.
    fn identified_box() -> (ShapeRegistry, BoxMaker) {
        let maker = BoxMaker::new(10.0, 10.0, 10.0).expect("valid");
        let mut registry = ShapeRegistry::new();
        registry.set_shape(maker.solid());
        for shape in registry.nil_shapes() {
            registry.update_id_by_shape(&shape, Uuid::new_v4());
        }
        (registry, maker)
    }

    fn tagged_id(registry: &ShapeRegistry, maker: &BoxMaker, tag: &str) -> Uuid {
        let shape = maker
            .tagged()
            .iter()
            .find(|(name, _)| name == tag)
            .map(|(_, shape)| shape.clone())
            .expect("tag exists");
        registry.id_of(&shape)
    }

    #[test]
    fn parents_of_kind_walks_up_to_faces() {
        let (registry, maker) = identified_box();
        let edge = tagged_id(&registry, &maker, "EdgeXPZP");
        let faces = registry.parents_of_kind(edge, ShapeKind::Face);
        assert_eq!(faces.len(), 2, "a box edge bounds exactly two faces");
        assert!(faces.contains(&tagged_id(&registry, &maker, "FaceXP")));
        assert!(faces.contains(&tagged_id(&registry, &maker, "FaceZP")));
    }

    #[test]
    fn children_of_kind_collects_vertices() {
        let (registry, maker) = identified_box();
        let face = tagged_id(&registry, &maker, "FaceXP");
        assert_eq!(registry.children_of_kind(face, ShapeKind::Vertex).len(), 4);
        assert_eq!(registry.children_of_kind(face, ShapeKind::Edge).len(), 4);
    }

    #[test]
    fn wire_of_finds_the_owning_wire_or_nil() {
        let (registry, maker) = identified_box();
        let edge = tagged_id(&registry, &maker, "EdgeXPZP");
        let face_xp = tagged_id(&registry, &maker, "FaceXP");
        let face_ym = tagged_id(&registry, &maker, "FaceYM");

        assert_eq!(
            registry.wire_of(edge, face_xp),
            tagged_id(&registry, &maker, "WireXP")
        );
        assert!(
            registry.wire_of(edge, face_ym).is_nil(),
            "edge does not bound FaceYM; absence is a nil id, not a panic"
        );
    }

    #[test]
    fn closest_wire_disambiguates_by_distance() {
        let maker = CylinderMaker::new(3.0, 8.0).expect("valid");
        let mut registry = ShapeRegistry::new();
        registry.set_shape(maker.solid());
        for shape in registry.nil_shapes() {
            registry.update_id_by_shape(&shape, Uuid::new_v4());
        }
        let side = maker
            .tagged()
            .iter()
            .find(|(name, _)| name == "FaceSide")
            .map(|(_, shape)| registry.id_of(shape))
            .expect("cylinder has a side face");

        let near_top = registry.closest_wire(side, &Point3::new(3.0, 0.0, 8.0));
        let near_bottom = registry.closest_wire(side, &Point3::new(3.0, 0.0, 0.0));
        assert_ne!(near_top, near_bottom);
        assert!(!near_top.is_nil());
    }

    #[test]
    fn point_derivation_dispatches_on_curve_kind() {
        let (registry, maker) = identified_box();
        let edge = tagged_id(&registry, &maker, "EdgeYMZM");

        let ends = registry.end_points(edge);
        assert_eq!(ends.len(), 2);
        assert_eq!(
            registry.mid_point(edge),
            Some(Point3::new(5.0, 0.0, 0.0))
        );
        assert_eq!(registry.center_point(edge), None, "segments have no center");
        assert!(registry.quadrant_points(edge).is_empty());

        let face = tagged_id(&registry, &maker, "FaceXP");
        assert!(
            registry.end_points(face).is_empty(),
            "non-edges yield empty results, not errors"
        );
    }
}
