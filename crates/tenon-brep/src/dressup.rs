use std::collections::HashMap;

use nalgebra::{Point3, Unit, Vector3};
use tenon_types::ShapeKind;

use crate::geometry::{any_perpendicular, Surface};
use crate::history::OpHistory;
use crate::shape::Shape;
use crate::BrepError;

/// Chamfer: replaces each selected edge of a solid with a flat transition
/// face between its two adjacent faces.
///
/// History contract: the selected edge is deleted, the transition face is
/// `generated` from it, and both adjacent faces are `modified` into rebuilt
/// faces whose wires swap the edge for a fresh boundary edge shared with the
/// transition face. The edge's vertices ride into the boundary edges as the
/// same handles.
pub struct ChamferMaker {
    result: Shape,
    history: OpHistory,
}

impl ChamferMaker {
    pub fn new(solid: &Shape, edges: &[Shape], distance: f64) -> Result<Self, BrepError> {
        if distance <= 0.0 {
            return Err(BrepError::NonPositiveDimension {
                name: "distance",
                value: distance,
            });
        }
        let (result, history) = dress_up(solid, edges, distance, false)?;
        Ok(ChamferMaker { result, history })
    }

    pub fn result(&self) -> &Shape {
        &self.result
    }

    pub fn history(&self) -> &OpHistory {
        &self.history
    }
}

/// Blend (fillet): same topology contract as [`ChamferMaker`], rounded
/// instead of flat.
///
/// One quirk is deliberate: a closed selected edge (a rim circle) produces a
/// blend surface split into two faces, so `generated(edge)` reports two
/// results for one source. Consumers that expect a single generated face must
/// decide their own tie-break.
pub struct BlendMaker {
    result: Shape,
    history: OpHistory,
}

impl BlendMaker {
    pub fn new(solid: &Shape, edges: &[Shape], radius: f64) -> Result<Self, BrepError> {
        if radius <= 0.0 {
            return Err(BrepError::NonPositiveDimension {
                name: "radius",
                value: radius,
            });
        }
        let (result, history) = dress_up(solid, edges, radius, true)?;
        Ok(BlendMaker { result, history })
    }

    pub fn result(&self) -> &Shape {
        &self.result
    }

    pub fn history(&self) -> &OpHistory {
        &self.history
    }
}

fn dress_up(
    solid: &Shape,
    edges: &[Shape],
    offset: f64,
    split_closed: bool,
) -> Result<(Shape, OpHistory), BrepError> {
    if solid.kind() != ShapeKind::Solid {
        return Err(BrepError::WrongKind {
            expected: ShapeKind::Solid,
            actual: solid.kind(),
        });
    }
    if edges.is_empty() {
        return Err(BrepError::NoEdges);
    }

    let faces = solid.sub_shapes(ShapeKind::Face);
    let mut history = OpHistory::new();

    // Per adjacent face: which selected edge is replaced by which boundary
    // edge. A face can lose several edges in one run.
    let mut replacements: HashMap<Shape, Vec<(Shape, Shape)>> = HashMap::new();
    let mut transition_faces = Vec::new();

    for edge in edges {
        if edge.kind() != ShapeKind::Edge {
            return Err(BrepError::WrongKind {
                expected: ShapeKind::Edge,
                actual: edge.kind(),
            });
        }
        if !solid.contains(edge) {
            return Err(BrepError::ForeignEdge);
        }
        let adjacent: Vec<&Shape> = faces.iter().filter(|face| face.contains(edge)).collect();
        if adjacent.len() != 2 {
            return Err(BrepError::OpenEdge {
                count: adjacent.len(),
            });
        }

        let curve = edge.curve().ok_or(BrepError::Unmeasurable)?;
        let anchor = curve.reference_point().ok_or(BrepError::Unmeasurable)?;

        // One fresh boundary edge per adjacent face, pulled into the face by
        // the offset; the original vertices are carried.
        let mut boundary_edges = Vec::new();
        for face in &adjacent {
            let pull = face
                .centroid()
                .and_then(|centroid| Unit::try_new(centroid - anchor, 1e-9))
                .unwrap_or_else(|| {
                    curve
                        .direction()
                        .map(|d| any_perpendicular(&d))
                        .unwrap_or_else(|| Unit::new_normalize(Vector3::z()))
                });
            let boundary = Shape::edge(
                curve.translated(&(pull.into_inner() * offset)),
                edge.children().to_vec(),
            );
            replacements
                .entry((*face).clone())
                .or_default()
                .push((edge.clone(), boundary.clone()));
            boundary_edges.push(boundary);
        }

        history.record_deleted(edge);

        let normal = transition_normal(&adjacent);
        if split_closed && curve.is_closed() {
            // Split blend surface: one face per boundary circle.
            for boundary in &boundary_edges {
                let face = Shape::face(
                    Surface::Plane {
                        origin: anchor,
                        normal,
                    },
                    vec![Shape::wire(vec![boundary.clone()])],
                );
                history.record_generated(edge, &face);
                transition_faces.push(face);
            }
        } else {
            let face = Shape::face(
                Surface::Plane {
                    origin: anchor,
                    normal,
                },
                vec![Shape::wire(boundary_edges.clone())],
            );
            history.record_generated(edge, &face);
            transition_faces.push(face);
        }
    }

    // Rebuild the touched faces; everything else is carried.
    let mut result_faces = Vec::new();
    for face in &faces {
        match replacements.get(face) {
            None => result_faces.push(face.clone()),
            Some(swaps) => {
                let rebuilt = rebuild_face(face, swaps);
                history.record_modified(face, &rebuilt);
                result_faces.push(rebuilt);
            }
        }
    }
    result_faces.extend(transition_faces);

    let shell = Shape::shell(result_faces);
    let result = Shape::solid(vec![shell.clone()]);
    history.record_modified(solid, &result);
    for old_shell in solid.sub_shapes(ShapeKind::Shell) {
        history.record_modified(&old_shell, &shell);
    }

    Ok((result, history))
}

/// Average of the adjacent face orientations; the transition face leans
/// between them.
fn transition_normal(adjacent: &[&Shape]) -> Unit<Vector3<f64>> {
    let sum: Vector3<f64> = adjacent
        .iter()
        .filter_map(|face| face.surface().map(|s| s.direction().into_inner()))
        .sum();
    Unit::try_new(sum, 1e-9).unwrap_or_else(|| Unit::new_normalize(Vector3::z()))
}

/// Fresh face with the same surface; wires containing a swapped edge are
/// rebuilt with the substitution, all other children carried.
fn rebuild_face(face: &Shape, swaps: &[(Shape, Shape)]) -> Shape {
    let surface = face.surface().cloned().unwrap_or(Surface::Plane {
        origin: Point3::origin(),
        normal: Unit::new_normalize(Vector3::z()),
    });
    let wires = face
        .children()
        .iter()
        .map(|wire| {
            let touched = wire
                .children()
                .iter()
                .any(|edge| swaps.iter().any(|(old, _)| old == edge));
            if !touched {
                return wire.clone();
            }
            let edges = wire
                .children()
                .iter()
                .map(|edge| {
                    swaps
                        .iter()
                        .find(|(old, _)| old == edge)
                        .map(|(_, new)| new.clone())
                        .unwrap_or_else(|| edge.clone())
                })
                .collect();
            Shape::wire(edges)
        })
        .collect();
    Shape::face(surface, wires)
}
