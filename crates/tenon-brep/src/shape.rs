use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use nalgebra::Point3;
use tenon_types::ShapeKind;

use crate::geometry::{Curve, Surface};

/// Handle to an immutable topology node.
///
/// Equality and hashing are handle identity, not geometric equality: two
/// handles compare equal exactly when they point at the same node. Makers
/// carry untouched sub-shapes into result trees as the same handle, which is
/// what lets the identity layer recognize them without inspecting geometry.
#[derive(Clone)]
pub struct Shape {
    node: Arc<ShapeNode>,
}

struct ShapeNode {
    kind: ShapeKind,
    children: Vec<Shape>,
    point: Option<Point3<f64>>,
    curve: Option<Curve>,
    surface: Option<Surface>,
}

impl Shape {
    fn new(node: ShapeNode) -> Self {
        Shape {
            node: Arc::new(node),
        }
    }

    pub fn vertex(point: Point3<f64>) -> Self {
        Shape::new(ShapeNode {
            kind: ShapeKind::Vertex,
            children: Vec::new(),
            point: Some(point),
            curve: None,
            surface: None,
        })
    }

    /// Edge over `curve`, bounded by `vertices` (empty for closed curves).
    pub fn edge(curve: Curve, vertices: Vec<Shape>) -> Self {
        debug_assert!(vertices.iter().all(|v| v.kind() == ShapeKind::Vertex));
        Shape::new(ShapeNode {
            kind: ShapeKind::Edge,
            children: vertices,
            point: None,
            curve: Some(curve),
            surface: None,
        })
    }

    pub fn wire(edges: Vec<Shape>) -> Self {
        debug_assert!(edges.iter().all(|e| e.kind() == ShapeKind::Edge));
        Shape::new(ShapeNode {
            kind: ShapeKind::Wire,
            children: edges,
            point: None,
            curve: None,
            surface: None,
        })
    }

    /// Face over `surface`, trimmed by `wires`; the first wire is the outer
    /// boundary.
    pub fn face(surface: Surface, wires: Vec<Shape>) -> Self {
        debug_assert!(wires.iter().all(|w| w.kind() == ShapeKind::Wire));
        Shape::new(ShapeNode {
            kind: ShapeKind::Face,
            children: wires,
            point: None,
            curve: None,
            surface: Some(surface),
        })
    }

    pub fn shell(faces: Vec<Shape>) -> Self {
        debug_assert!(faces.iter().all(|f| f.kind() == ShapeKind::Face));
        Shape::new(ShapeNode {
            kind: ShapeKind::Shell,
            children: faces,
            point: None,
            curve: None,
            surface: None,
        })
    }

    pub fn solid(shells: Vec<Shape>) -> Self {
        debug_assert!(shells.iter().all(|s| s.kind() == ShapeKind::Shell));
        Shape::new(ShapeNode {
            kind: ShapeKind::Solid,
            children: shells,
            point: None,
            curve: None,
            surface: None,
        })
    }

    pub fn compound(shapes: Vec<Shape>) -> Self {
        Shape::new(ShapeNode {
            kind: ShapeKind::Compound,
            children: shapes,
            point: None,
            curve: None,
            surface: None,
        })
    }

    pub fn kind(&self) -> ShapeKind {
        self.node.kind
    }

    pub fn children(&self) -> &[Shape] {
        &self.node.children
    }

    pub fn point(&self) -> Option<&Point3<f64>> {
        self.node.point.as_ref()
    }

    pub fn curve(&self) -> Option<&Curve> {
        self.node.curve.as_ref()
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.node.surface.as_ref()
    }

    /// Outer boundary of a face; None for other kinds or a wireless face.
    pub fn outer_wire(&self) -> Option<&Shape> {
        if self.kind() == ShapeKind::Face {
            self.children().first()
        } else {
            None
        }
    }

    /// Edge with no usable curve. Degenerate edges get no identity record.
    pub fn is_degenerate(&self) -> bool {
        self.curve().is_some_and(Curve::is_degenerate)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.node) as usize
    }

    /// Short display token for diagnostics: kind plus truncated handle.
    pub fn token(&self) -> String {
        format!("{}:{:09x}", self.kind().as_str(), self.addr() & 0xf_ffff_ffff)
    }

    /// Every unique sub-shape of `kind` in first-encounter depth-first order,
    /// this shape itself included when it matches.
    pub fn sub_shapes(&self, kind: ShapeKind) -> Vec<Shape> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.walk(kind, &mut seen, &mut out);
        out
    }

    fn walk(&self, kind: ShapeKind, seen: &mut HashSet<Shape>, out: &mut Vec<Shape>) {
        if !seen.insert(self.clone()) {
            return;
        }
        if self.kind() == kind {
            out.push(self.clone());
        }
        for child in self.children() {
            child.walk(kind, seen, out);
        }
    }

    /// Every unique sub-shape of every kind, kind-major in `ShapeKind::ALL`
    /// order. This enumeration order is the contract serialization offsets
    /// are resolved against.
    pub fn all_sub_shapes(&self) -> Vec<Shape> {
        let mut out = Vec::new();
        for kind in ShapeKind::ALL {
            out.extend(self.sub_shapes(kind));
        }
        out
    }

    /// Identity-based containment, the shape itself included.
    pub fn contains(&self, other: &Shape) -> bool {
        let mut seen = HashSet::new();
        self.contains_walk(other, &mut seen)
    }

    fn contains_walk(&self, other: &Shape, seen: &mut HashSet<Shape>) -> bool {
        if self == other {
            return true;
        }
        if !seen.insert(self.clone()) {
            return false;
        }
        self.children()
            .iter()
            .any(|child| child.contains_walk(other, seen))
    }

    /// Axis-aligned bounds over vertex positions and conic extents; None when
    /// the tree carries no measurable geometry.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let mut points = Vec::new();
        self.collect_measure_points(&mut points, &mut HashSet::new());
        let first = *points.first()?;
        let mut min = first;
        let mut max = first;
        for p in &points[1..] {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        Some((min, max))
    }

    /// Mean of vertex positions; conic centers when there are no vertices;
    /// surface anchors as a last resort.
    pub fn centroid(&self) -> Option<Point3<f64>> {
        let mut points = Vec::new();
        self.collect_measure_points(&mut points, &mut HashSet::new());
        if points.is_empty() {
            if let Some(surface) = self.surface() {
                return Some(surface.anchor_point());
            }
            return None;
        }
        let sum = points
            .iter()
            .fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords);
        Some(Point3::from(sum / points.len() as f64))
    }

    fn collect_measure_points(&self, out: &mut Vec<Point3<f64>>, seen: &mut HashSet<Shape>) {
        if !seen.insert(self.clone()) {
            return;
        }
        if let Some(point) = self.point() {
            out.push(*point);
        }
        if let Some(curve) = self.curve() {
            if self.children().is_empty() {
                // Closed edges carry no vertices; measure the conic itself.
                out.extend(curve.quadrant_points());
                if let Some(center) = curve.center_point() {
                    out.push(center);
                }
            }
        }
        for child in self.children() {
            child.collect_measure_points(out, seen);
        }
    }
}

impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

impl Eq for Shape {}

impl Hash for Shape {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.addr());
    }
}

impl std::fmt::Debug for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shape")
            .field("kind", &self.kind())
            .field("handle", &format_args!("{:x}", self.addr()))
            .field("children", &self.children().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Unit, Vector3};

    fn unit_square_face() -> Shape {
        let corners = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let vertices: Vec<Shape> = corners.iter().map(|p| Shape::vertex(*p)).collect();
        let edges: Vec<Shape> = (0..4)
            .map(|i| {
                Shape::edge(
                    Curve::Segment {
                        start: corners[i],
                        end: corners[(i + 1) % 4],
                    },
                    vec![vertices[i].clone(), vertices[(i + 1) % 4].clone()],
                )
            })
            .collect();
        Shape::face(
            Surface::Plane {
                origin: Point3::new(0.5, 0.5, 0.0),
                normal: Unit::new_normalize(Vector3::z()),
            },
            vec![Shape::wire(edges)],
        )
    }

    #[test]
    fn handle_identity_not_structural_equality() {
        let a = unit_square_face();
        let b = unit_square_face();
        assert_eq!(a, a.clone(), "clones share the node");
        assert_ne!(a, b, "identical geometry, distinct nodes");
    }

    #[test]
    fn enumeration_is_kind_major_and_deduplicated() {
        let face = unit_square_face();
        let all = face.all_sub_shapes();
        // 1 face + 1 wire + 4 edges + 4 vertices, shared vertices once each.
        assert_eq!(all.len(), 10);
        assert_eq!(all[0].kind(), ShapeKind::Face);
        assert_eq!(all[1].kind(), ShapeKind::Wire);
        assert!(all[2..6].iter().all(|s| s.kind() == ShapeKind::Edge));
        assert!(all[6..].iter().all(|s| s.kind() == ShapeKind::Vertex));
    }

    #[test]
    fn shared_children_enumerate_once() {
        let shared = Shape::vertex(Point3::origin());
        let e1 = Shape::edge(
            Curve::Segment {
                start: Point3::origin(),
                end: Point3::new(1.0, 0.0, 0.0),
            },
            vec![shared.clone()],
        );
        let e2 = Shape::edge(
            Curve::Segment {
                start: Point3::origin(),
                end: Point3::new(0.0, 1.0, 0.0),
            },
            vec![shared.clone()],
        );
        let compound = Shape::compound(vec![e1, e2]);
        assert_eq!(compound.sub_shapes(ShapeKind::Vertex).len(), 1);
    }

    #[test]
    fn containment_follows_handles() {
        let face = unit_square_face();
        let vertex = face.sub_shapes(ShapeKind::Vertex)[0].clone();
        assert!(face.contains(&vertex));
        assert!(!face.contains(&Shape::vertex(Point3::origin())));
    }

    #[test]
    fn bounding_box_spans_vertices() {
        let face = unit_square_face();
        let (min, max) = face.bounding_box().expect("face has vertices");
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(1.0, 1.0, 0.0));
        let centroid = face.centroid().expect("face has vertices");
        assert!((centroid - Point3::new(0.5, 0.5, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn outer_wire_is_first_wire() {
        let face = unit_square_face();
        let outer = face.outer_wire().expect("face has a wire");
        assert_eq!(outer, &face.children()[0]);
        assert!(face.children()[0].outer_wire().is_none());
    }
}
