use std::collections::HashMap;

use nalgebra::{Point3, Unit, Vector3};

use crate::geometry::{Curve, Surface};
use crate::shape::Shape;
use crate::BrepError;

/// Maker for an axis-aligned box with one corner at the origin.
///
/// Every sub-shape carries a stable tag name ("FaceXP" is the face on the
/// positive-X side, "EdgeYPZM" the edge shared by faces YP and ZM, and so on),
/// so primitive identity is addressable by name instead of derived by
/// matching. Tag names are independent of the dimensions; a resized box
/// produces the same tag set over fresh handles.
pub struct BoxMaker {
    solid: Shape,
    tagged: Vec<(String, Shape)>,
}

fn side(positive: bool) -> &'static str {
    if positive {
        "P"
    } else {
        "M"
    }
}

impl BoxMaker {
    pub fn new(length: f64, width: f64, height: f64) -> Result<Self, BrepError> {
        for (name, value) in [("length", length), ("width", width), ("height", height)] {
            if value <= 0.0 {
                return Err(BrepError::NonPositiveDimension { name, value });
            }
        }

        let coord = |xs: bool, ys: bool, zs: bool| {
            Point3::new(
                if xs { length } else { 0.0 },
                if ys { width } else { 0.0 },
                if zs { height } else { 0.0 },
            )
        };

        let mut vertices = HashMap::new();
        for xs in [false, true] {
            for ys in [false, true] {
                for zs in [false, true] {
                    vertices.insert((xs, ys, zs), Shape::vertex(coord(xs, ys, zs)));
                }
            }
        }
        let vertex = |xs: bool, ys: bool, zs: bool| vertices[&(xs, ys, zs)].clone();

        let segment = |a: &Shape, b: &Shape, start: Point3<f64>, end: Point3<f64>| {
            Shape::edge(Curve::Segment { start, end }, vec![a.clone(), b.clone()])
        };

        // Twelve edges, four per axis, named by the two faces they bound.
        let mut edges = HashMap::new();
        for ys in [false, true] {
            for zs in [false, true] {
                let (a, b) = (vertex(false, ys, zs), vertex(true, ys, zs));
                let name = format!("EdgeY{}Z{}", side(ys), side(zs));
                edges.insert(name, segment(&a, &b, coord(false, ys, zs), coord(true, ys, zs)));
            }
        }
        for xs in [false, true] {
            for zs in [false, true] {
                let (a, b) = (vertex(xs, false, zs), vertex(xs, true, zs));
                let name = format!("EdgeX{}Z{}", side(xs), side(zs));
                edges.insert(name, segment(&a, &b, coord(xs, false, zs), coord(xs, true, zs)));
            }
        }
        for xs in [false, true] {
            for ys in [false, true] {
                let (a, b) = (vertex(xs, ys, false), vertex(xs, ys, true));
                let name = format!("EdgeX{}Y{}", side(xs), side(ys));
                edges.insert(name, segment(&a, &b, coord(xs, ys, false), coord(xs, ys, true)));
            }
        }
        let edge = |name: &str| edges[name].clone();

        let center = Point3::new(length * 0.5, width * 0.5, height * 0.5);
        let face_on = |axis: usize, positive: bool, boundary: [&str; 4]| {
            let mut origin = center;
            origin[axis] = if positive {
                [length, width, height][axis]
            } else {
                0.0
            };
            let mut normal = Vector3::zeros();
            normal[axis] = if positive { 1.0 } else { -1.0 };
            let wire = Shape::wire(boundary.iter().map(|name| edge(name)).collect());
            let face = Shape::face(
                Surface::Plane {
                    origin,
                    normal: Unit::new_normalize(normal),
                },
                vec![wire.clone()],
            );
            (wire, face)
        };

        let (wire_xp, face_xp) = face_on(0, true, ["EdgeXPZM", "EdgeXPYP", "EdgeXPZP", "EdgeXPYM"]);
        let (wire_xm, face_xm) = face_on(0, false, ["EdgeXMZM", "EdgeXMYP", "EdgeXMZP", "EdgeXMYM"]);
        let (wire_yp, face_yp) = face_on(1, true, ["EdgeYPZM", "EdgeXPYP", "EdgeYPZP", "EdgeXMYP"]);
        let (wire_ym, face_ym) = face_on(1, false, ["EdgeYMZM", "EdgeXPYM", "EdgeYMZP", "EdgeXMYM"]);
        let (wire_zp, face_zp) = face_on(2, true, ["EdgeYMZP", "EdgeXPZP", "EdgeYPZP", "EdgeXMZP"]);
        let (wire_zm, face_zm) = face_on(2, false, ["EdgeYMZM", "EdgeXPZM", "EdgeYPZM", "EdgeXMZM"]);

        let shell = Shape::shell(vec![
            face_xp.clone(),
            face_xm.clone(),
            face_yp.clone(),
            face_ym.clone(),
            face_zp.clone(),
            face_zm.clone(),
        ]);
        let solid = Shape::solid(vec![shell.clone()]);

        let mut tagged = vec![
            ("Solid".to_string(), solid.clone()),
            ("Shell".to_string(), shell),
            ("FaceXP".to_string(), face_xp),
            ("FaceXM".to_string(), face_xm),
            ("FaceYP".to_string(), face_yp),
            ("FaceYM".to_string(), face_ym),
            ("FaceZP".to_string(), face_zp),
            ("FaceZM".to_string(), face_zm),
            ("WireXP".to_string(), wire_xp),
            ("WireXM".to_string(), wire_xm),
            ("WireYP".to_string(), wire_yp),
            ("WireYM".to_string(), wire_ym),
            ("WireZP".to_string(), wire_zp),
            ("WireZM".to_string(), wire_zm),
        ];
        let mut edge_names: Vec<&String> = edges.keys().collect();
        edge_names.sort();
        for name in edge_names {
            tagged.push((name.clone(), edges[name].clone()));
        }
        for xs in [false, true] {
            for ys in [false, true] {
                for zs in [false, true] {
                    let name = format!("VertexX{}Y{}Z{}", side(xs), side(ys), side(zs));
                    tagged.push((name, vertex(xs, ys, zs)));
                }
            }
        }

        Ok(BoxMaker { solid, tagged })
    }

    pub fn solid(&self) -> &Shape {
        &self.solid
    }

    /// Tag/shape pairs in deterministic order: solid, shell, faces, wires,
    /// edges (alphabetical), vertices.
    pub fn tagged(&self) -> &[(String, Shape)] {
        &self.tagged
    }
}

/// Maker for a right circular cylinder, base on the XY plane, axis +Z.
///
/// Same tag discipline as [`BoxMaker`]; the rim edges are closed circles and
/// carry no vertices.
pub struct CylinderMaker {
    solid: Shape,
    tagged: Vec<(String, Shape)>,
}

impl CylinderMaker {
    pub fn new(radius: f64, height: f64) -> Result<Self, BrepError> {
        for (name, value) in [("radius", radius), ("height", height)] {
            if value <= 0.0 {
                return Err(BrepError::NonPositiveDimension { name, value });
            }
        }

        let z = Unit::new_normalize(Vector3::z());
        let x = Unit::new_normalize(Vector3::x());
        let rim = |zval: f64| {
            Shape::edge(
                Curve::Circle {
                    center: Point3::new(0.0, 0.0, zval),
                    normal: z,
                    x_dir: x,
                    radius,
                },
                Vec::new(),
            )
        };
        let edge_bottom = rim(0.0);
        let edge_top = rim(height);

        // Each face trims the surface with its own wire; the rim edges are
        // the shared handles between cap and side.
        let wire_bottom = Shape::wire(vec![edge_bottom.clone()]);
        let wire_top = Shape::wire(vec![edge_top.clone()]);
        let wire_side_bottom = Shape::wire(vec![edge_bottom.clone()]);
        let wire_side_top = Shape::wire(vec![edge_top.clone()]);

        let face_bottom = Shape::face(
            Surface::Plane {
                origin: Point3::origin(),
                normal: Unit::new_normalize(-Vector3::z()),
            },
            vec![wire_bottom.clone()],
        );
        let face_top = Shape::face(
            Surface::Plane {
                origin: Point3::new(0.0, 0.0, height),
                normal: z,
            },
            vec![wire_top.clone()],
        );
        let face_side = Shape::face(
            Surface::Cylinder {
                origin: Point3::origin(),
                axis: z,
                radius,
            },
            vec![wire_side_bottom.clone(), wire_side_top.clone()],
        );

        let shell = Shape::shell(vec![face_side.clone(), face_bottom.clone(), face_top.clone()]);
        let solid = Shape::solid(vec![shell.clone()]);

        let tagged = vec![
            ("Solid".to_string(), solid.clone()),
            ("Shell".to_string(), shell),
            ("FaceSide".to_string(), face_side),
            ("FaceBottom".to_string(), face_bottom),
            ("FaceTop".to_string(), face_top),
            ("WireSideBottom".to_string(), wire_side_bottom),
            ("WireSideTop".to_string(), wire_side_top),
            ("WireBottom".to_string(), wire_bottom),
            ("WireTop".to_string(), wire_top),
            ("EdgeBottom".to_string(), edge_bottom),
            ("EdgeTop".to_string(), edge_top),
        ];

        Ok(CylinderMaker { solid, tagged })
    }

    pub fn solid(&self) -> &Shape {
        &self.solid
    }

    pub fn tagged(&self) -> &[(String, Shape)] {
        &self.tagged
    }
}
