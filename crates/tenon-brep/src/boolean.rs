use std::collections::HashMap;

use nalgebra::{Point3, Unit, Vector3};
use tenon_types::ShapeKind;

use crate::geometry::Curve;
use crate::history::OpHistory;
use crate::shape::Shape;
use crate::BrepError;

const TOL: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanKind {
    Unite,
    Subtract,
    Intersect,
}

/// Boolean operation over one target solid and one or more tool solids.
///
/// The result is computed eagerly in `new`; `history` reports which input
/// faces were trimmed into result faces and which were consumed, while
/// untouched faces ride into the result as the same handle. Trimmed faces
/// gain a section contour (a fresh closed edge in a fresh wire) shared with
/// an opposing trimmed face where one exists; section contours have no
/// lineage on purpose, they are the derived-identity case.
///
/// Classification is interval arithmetic over axis-aligned bounds: each face
/// is placed against the opposing body's bounds as outside, touched, or
/// buried. Geometrically coarse, topologically honest.
pub struct BooleanMaker {
    kind: BooleanKind,
    result: Shape,
    history: OpHistory,
}

type Bounds = (Point3<f64>, Point3<f64>);

fn overlap(a: &Bounds, b: &Bounds) -> Option<Bounds> {
    let mut min = Point3::origin();
    let mut max = Point3::origin();
    for axis in 0..3 {
        min[axis] = a.0[axis].max(b.0[axis]);
        max[axis] = a.1[axis].min(b.1[axis]);
        if min[axis] > max[axis] + TOL {
            return None;
        }
    }
    Some((min, max))
}

fn contains(outer: &Bounds, inner: &Bounds) -> bool {
    (0..3).all(|axis| {
        inner.0[axis] >= outer.0[axis] - TOL && inner.1[axis] <= outer.1[axis] + TOL
    })
}

/// Planar face lying on the boundary plane of `bounds`: degenerate along some
/// axis at exactly the outer min or max. Such a face merges with the
/// coincident face of the other body instead of surviving on its own.
fn coincident_with_boundary(face_bounds: &Bounds, bounds: &Bounds) -> bool {
    (0..3).any(|axis| {
        face_bounds.1[axis] - face_bounds.0[axis] < TOL
            && ((face_bounds.0[axis] - bounds.0[axis]).abs() < TOL
                || (face_bounds.0[axis] - bounds.1[axis]).abs() < TOL)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Outside,
    Touched,
    Buried,
}

fn classify(face_bounds: &Bounds, opposing: &Bounds) -> Placement {
    if overlap(face_bounds, opposing).is_none() {
        Placement::Outside
    } else if contains(opposing, face_bounds) {
        Placement::Buried
    } else {
        Placement::Touched
    }
}

struct FaceRow {
    face: Shape,
    bounds: Bounds,
    placement: Placement,
    kept: bool,
}

impl BooleanMaker {
    pub fn new(kind: BooleanKind, target: &Shape, tools: &[Shape]) -> Result<Self, BrepError> {
        if target.kind() != ShapeKind::Solid {
            return Err(BrepError::WrongKind {
                expected: ShapeKind::Solid,
                actual: target.kind(),
            });
        }
        if tools.is_empty() {
            return Err(BrepError::NoTools);
        }
        for tool in tools {
            if tool.kind() != ShapeKind::Solid {
                return Err(BrepError::WrongKind {
                    expected: ShapeKind::Solid,
                    actual: tool.kind(),
                });
            }
        }

        let target_bounds = target.bounding_box().ok_or(BrepError::Unmeasurable)?;
        let mut tools_bounds: Option<Bounds> = None;
        for tool in tools {
            let bounds = tool.bounding_box().ok_or(BrepError::Unmeasurable)?;
            tools_bounds = Some(match tools_bounds {
                None => bounds,
                Some((mut min, mut max)) => {
                    for axis in 0..3 {
                        min[axis] = min[axis].min(bounds.0[axis]);
                        max[axis] = max[axis].max(bounds.1[axis]);
                    }
                    (min, max)
                }
            });
        }
        let tools_bounds = tools_bounds.ok_or(BrepError::Unmeasurable)?;

        let Some(region) = overlap(&target_bounds, &tools_bounds) else {
            return Self::disjoint(kind, target, tools);
        };

        let mut history = OpHistory::new();

        // Target faces are placed against the tools' bounds: buried faces are
        // consumed (except by intersect, which keeps exactly those).
        let target_rows: Vec<FaceRow> = face_rows(target, &tools_bounds, |placement| match kind {
            BooleanKind::Unite | BooleanKind::Subtract => placement != Placement::Buried,
            BooleanKind::Intersect => placement != Placement::Outside,
        })?;

        // Tool faces are placed against the target's bounds. For subtract a
        // buried tool face becomes a cavity wall, unless it lies on the
        // target's boundary and merges away.
        let mut tool_rows: Vec<FaceRow> = Vec::new();
        for tool in tools {
            tool_rows.extend(face_rows(tool, &target_bounds, |placement| match kind {
                BooleanKind::Unite => placement != Placement::Buried,
                BooleanKind::Subtract => placement != Placement::Outside,
                BooleanKind::Intersect => placement != Placement::Outside,
            })?);
        }
        if kind == BooleanKind::Subtract {
            for row in &mut tool_rows {
                if row.kept && coincident_with_boundary(&row.bounds, &target_bounds) {
                    row.kept = false;
                }
            }
        }

        // Pair each trimmed target face with the first kept, non-carried tool
        // face it overlaps; the pair shares one section wire. Unpaired
        // trimmed faces still get their own contour.
        let mut extra_wires: HashMap<Shape, Vec<Shape>> = HashMap::new();
        for row in &target_rows {
            if row.placement != Placement::Touched || !row.kept {
                continue;
            }
            let partner = tool_rows.iter().find(|tool_row| {
                tool_row.kept
                    && tool_row.placement != Placement::Outside
                    && overlap(&row.bounds, &tool_row.bounds).is_some()
            });
            let contour_region = match partner {
                Some(tool_row) => overlap(&row.bounds, &tool_row.bounds).unwrap_or(region),
                None => overlap(&row.bounds, &region).unwrap_or(region),
            };
            let wire = section_wire(&contour_region, &row.face);
            extra_wires.entry(row.face.clone()).or_default().push(wire.clone());
            if let Some(tool_row) = partner {
                extra_wires.entry(tool_row.face.clone()).or_default().push(wire);
            }
        }
        for row in &tool_rows {
            if row.placement == Placement::Touched && row.kept && !extra_wires.contains_key(&row.face)
            {
                let contour_region = overlap(&row.bounds, &region).unwrap_or(region);
                extra_wires.insert(row.face.clone(), vec![section_wire(&contour_region, &row.face)]);
            }
        }

        let mut result_faces = Vec::new();
        // Cavity walls face the other way, so a subtracted tool never carries
        // a face verbatim even when no contour landed on it.
        for (rows, force_rebuild) in [
            (&target_rows, false),
            (&tool_rows, kind == BooleanKind::Subtract),
        ] {
            for row in rows.iter() {
                if !row.kept {
                    history.record_deleted(&row.face);
                    continue;
                }
                let wires = extra_wires.get(&row.face);
                let untouched = !force_rebuild
                    && wires.is_none()
                    && matches!(row.placement, Placement::Outside | Placement::Buried);
                if untouched {
                    result_faces.push(row.face.clone());
                } else {
                    let trimmed = trim_face(&row.face, wires.map_or(&[], Vec::as_slice));
                    history.record_modified(&row.face, &trimmed);
                    result_faces.push(trimmed);
                }
            }
        }
        if result_faces.is_empty() {
            return Err(BrepError::EmptyResult);
        }

        let shell = Shape::shell(result_faces);
        let solid = Shape::solid(vec![shell.clone()]);
        record_body_lineage(&mut history, kind, target, tools, &solid, &shell);

        Ok(BooleanMaker {
            kind,
            result: solid,
            history,
        })
    }

    /// Inputs whose bounds never meet: subtract leaves the target verbatim,
    /// unite stitches both face sets into one solid, intersect is empty.
    fn disjoint(kind: BooleanKind, target: &Shape, tools: &[Shape]) -> Result<Self, BrepError> {
        match kind {
            BooleanKind::Subtract => Ok(BooleanMaker {
                kind,
                result: target.clone(),
                history: OpHistory::new(),
            }),
            BooleanKind::Unite => {
                let mut faces = target.sub_shapes(ShapeKind::Face);
                for tool in tools {
                    faces.extend(tool.sub_shapes(ShapeKind::Face));
                }
                let shell = Shape::shell(faces);
                let solid = Shape::solid(vec![shell.clone()]);
                let mut history = OpHistory::new();
                record_body_lineage(&mut history, kind, target, tools, &solid, &shell);
                Ok(BooleanMaker {
                    kind,
                    result: solid,
                    history,
                })
            }
            BooleanKind::Intersect => Err(BrepError::EmptyResult),
        }
    }

    pub fn kind(&self) -> BooleanKind {
        self.kind
    }

    pub fn result(&self) -> &Shape {
        &self.result
    }

    pub fn history(&self) -> &OpHistory {
        &self.history
    }
}

fn face_rows(
    solid: &Shape,
    opposing: &Bounds,
    kept: impl Fn(Placement) -> bool,
) -> Result<Vec<FaceRow>, BrepError> {
    solid
        .sub_shapes(ShapeKind::Face)
        .into_iter()
        .map(|face| {
            let bounds = face.bounding_box().ok_or(BrepError::Unmeasurable)?;
            let placement = classify(&bounds, opposing);
            Ok(FaceRow {
                kept: kept(placement),
                face,
                bounds,
                placement,
            })
        })
        .collect()
}

fn record_body_lineage(
    history: &mut OpHistory,
    kind: BooleanKind,
    target: &Shape,
    tools: &[Shape],
    solid: &Shape,
    shell: &Shape,
) {
    history.record_modified(target, solid);
    for target_shell in target.sub_shapes(ShapeKind::Shell) {
        history.record_modified(&target_shell, shell);
    }
    for tool in tools {
        match kind {
            // Subtracted tools are consumed whole.
            BooleanKind::Subtract => history.record_deleted(tool),
            BooleanKind::Unite | BooleanKind::Intersect => {
                history.record_modified(tool, solid);
                for tool_shell in tool.sub_shapes(ShapeKind::Shell) {
                    history.record_modified(&tool_shell, shell);
                }
            }
        }
    }
}

/// Rebuild `face` with its original wires (carried by handle) plus the
/// section wires the operation cut into it.
fn trim_face(face: &Shape, extra_wires: &[Shape]) -> Shape {
    let surface = face
        .surface()
        .cloned()
        .unwrap_or(crate::geometry::Surface::Plane {
            origin: Point3::origin(),
            normal: Unit::new_normalize(Vector3::z()),
        });
    let mut wires: Vec<Shape> = face.children().to_vec();
    wires.extend_from_slice(extra_wires);
    Shape::face(surface, wires)
}

/// One closed contour approximating the intersection curve inside `region`,
/// oriented by the trimmed face's surface.
fn section_wire(region: &Bounds, face: &Shape) -> Shape {
    let center = Point3::from((region.0.coords + region.1.coords) * 0.5);
    let extent = region.1 - region.0;
    let mut radius = f64::INFINITY;
    for axis in 0..3 {
        if extent[axis] > TOL {
            radius = radius.min(extent[axis]);
        }
    }
    let radius = if radius.is_finite() {
        (radius * 0.25).max(1e-3)
    } else {
        1e-3
    };
    let normal = face
        .surface()
        .map(|s| s.direction())
        .unwrap_or_else(|| Unit::new_normalize(Vector3::z()));
    let edge = Shape::edge(
        Curve::Circle {
            center,
            normal,
            x_dir: crate::geometry::any_perpendicular(&normal),
            radius,
        },
        Vec::new(),
    );
    Shape::wire(vec![edge])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::BoxMaker;

    /// 10-box with a 4-box sharing its low corner: three target faces clear
    /// the tool, three are cut, three tool faces become cavity walls.
    fn corner_cut() -> (Shape, Shape) {
        let target = BoxMaker::new(10.0, 10.0, 10.0).expect("valid").solid().clone();
        let tool = BoxMaker::new(4.0, 4.0, 4.0).expect("valid").solid().clone();
        (target, tool)
    }

    #[test]
    fn untouched_faces_carry_their_handles() {
        let (target, tool) = corner_cut();
        let maker =
            BooleanMaker::new(BooleanKind::Subtract, &target, &[tool.clone()]).expect("overlap");
        let result = maker.result();

        let target_faces = target.sub_shapes(ShapeKind::Face);
        let carried = target_faces
            .iter()
            .filter(|face| result.contains(face))
            .count();
        assert_eq!(carried, 3, "faces away from the tool are untouched");

        let trimmed = target_faces
            .iter()
            .filter(|face| !maker.history().modified(face).is_empty())
            .count();
        assert_eq!(trimmed, 3);
    }

    #[test]
    fn cavity_walls_descend_from_tool_faces() {
        let (target, tool) = corner_cut();
        let maker =
            BooleanMaker::new(BooleanKind::Subtract, &target, &[tool.clone()]).expect("overlap");

        let tool_faces = tool.sub_shapes(ShapeKind::Face);
        let cavity = tool_faces
            .iter()
            .filter(|face| !maker.history().modified(face).is_empty())
            .count();
        let merged_away = tool_faces
            .iter()
            .filter(|face| maker.history().is_deleted(face))
            .count();
        assert_eq!(cavity, 3, "interior tool faces become cavity walls");
        assert_eq!(merged_away, 3, "boundary-coincident tool faces merge away");
        assert!(maker.history().is_deleted(&tool), "subtract consumes the tool");
    }

    #[test]
    fn section_contours_have_no_lineage() {
        let (target, tool) = corner_cut();
        let maker =
            BooleanMaker::new(BooleanKind::Subtract, &target, &[tool.clone()]).expect("overlap");
        let result = maker.result();

        let mut input_edges: std::collections::HashSet<Shape> =
            target.sub_shapes(ShapeKind::Edge).into_iter().collect();
        input_edges.extend(tool.sub_shapes(ShapeKind::Edge));
        let fresh: Vec<Shape> = result
            .sub_shapes(ShapeKind::Edge)
            .into_iter()
            .filter(|edge| !input_edges.contains(edge))
            .collect();
        assert!(!fresh.is_empty(), "trimming must introduce section edges");
        for edge in &fresh {
            assert!(matches!(edge.curve(), Some(Curve::Circle { .. })));
        }
    }

    fn far_away_solid() -> Shape {
        let corner = Point3::new(100.0, 100.0, 100.0);
        let face = Shape::face(
            crate::geometry::Surface::Plane {
                origin: corner,
                normal: Unit::new_normalize(Vector3::z()),
            },
            vec![Shape::wire(vec![Shape::edge(
                Curve::Segment {
                    start: corner,
                    end: Point3::new(101.0, 100.0, 100.0),
                },
                vec![
                    Shape::vertex(corner),
                    Shape::vertex(Point3::new(101.0, 100.0, 100.0)),
                ],
            )])],
        );
        Shape::solid(vec![Shape::shell(vec![face])])
    }

    #[test]
    fn disjoint_subtract_returns_target_verbatim() {
        let target = BoxMaker::new(2.0, 2.0, 2.0).expect("valid").solid().clone();
        let maker =
            BooleanMaker::new(BooleanKind::Subtract, &target, &[far_away_solid()]).expect("valid");
        assert_eq!(maker.result(), &target, "nothing to cut, same handle back");
        assert_eq!(maker.history().modified_count(), 0);
    }

    #[test]
    fn intersect_of_disjoint_solids_is_empty() {
        let target = BoxMaker::new(2.0, 2.0, 2.0).expect("valid").solid().clone();
        assert!(matches!(
            BooleanMaker::new(BooleanKind::Intersect, &target, &[far_away_solid()]),
            Err(BrepError::EmptyResult)
        ));
    }

    #[test]
    fn tool_is_required() {
        let target = BoxMaker::new(1.0, 1.0, 1.0).expect("valid").solid().clone();
        assert!(matches!(
            BooleanMaker::new(BooleanKind::Subtract, &target, &[]),
            Err(BrepError::NoTools)
        ));
    }
}
