use nalgebra::{Point3, Unit, Vector3};

const EPS: f64 = 1e-9;

/// Analytic curve carried by an edge.
#[derive(Debug, Clone)]
pub enum Curve {
    Segment {
        start: Point3<f64>,
        end: Point3<f64>,
    },
    Circle {
        center: Point3<f64>,
        normal: Unit<Vector3<f64>>,
        x_dir: Unit<Vector3<f64>>,
        radius: f64,
    },
    Ellipse {
        center: Point3<f64>,
        normal: Unit<Vector3<f64>>,
        x_dir: Unit<Vector3<f64>>,
        major_radius: f64,
        minor_radius: f64,
    },
    /// Edge with no usable curve. Skipped during registry enumeration.
    Degenerate,
}

impl Curve {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Curve::Segment { .. } => "segment",
            Curve::Circle { .. } => "circle",
            Curve::Ellipse { .. } => "ellipse",
            Curve::Degenerate => "degenerate",
        }
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, Curve::Degenerate)
    }

    /// Curve endpoints. Closed and degenerate curves have none.
    pub fn end_points(&self) -> Vec<Point3<f64>> {
        match self {
            Curve::Segment { start, end } => vec![*start, *end],
            _ => Vec::new(),
        }
    }

    /// Parametric midpoint, defined for bounded open curves only.
    pub fn mid_point(&self) -> Option<Point3<f64>> {
        match self {
            Curve::Segment { start, end } => Some(Point3::from((start.coords + end.coords) * 0.5)),
            _ => None,
        }
    }

    /// Center of a closed conic.
    pub fn center_point(&self) -> Option<Point3<f64>> {
        match self {
            Curve::Circle { center, .. } | Curve::Ellipse { center, .. } => Some(*center),
            _ => None,
        }
    }

    /// The four axis crossings of a closed conic, counterclockwise from the
    /// reference direction.
    pub fn quadrant_points(&self) -> Vec<Point3<f64>> {
        match self {
            Curve::Circle {
                center,
                normal,
                x_dir,
                radius,
            } => {
                let y_dir = Unit::new_normalize(normal.cross(x_dir));
                vec![
                    center + x_dir.as_ref() * *radius,
                    center + y_dir.as_ref() * *radius,
                    center - x_dir.as_ref() * *radius,
                    center - y_dir.as_ref() * *radius,
                ]
            }
            Curve::Ellipse {
                center,
                normal,
                x_dir,
                major_radius,
                minor_radius,
            } => {
                let y_dir = Unit::new_normalize(normal.cross(x_dir));
                vec![
                    center + x_dir.as_ref() * *major_radius,
                    center + y_dir.as_ref() * *minor_radius,
                    center - x_dir.as_ref() * *major_radius,
                    center - y_dir.as_ref() * *minor_radius,
                ]
            }
            _ => Vec::new(),
        }
    }

    /// Representative point used for placing derived geometry: segment
    /// midpoint or conic center.
    pub fn reference_point(&self) -> Option<Point3<f64>> {
        self.mid_point().or_else(|| self.center_point())
    }

    /// Tangent-line direction for segments, rotation axis for conics.
    pub fn direction(&self) -> Option<Unit<Vector3<f64>>> {
        match self {
            Curve::Segment { start, end } => Unit::try_new(end - start, EPS),
            Curve::Circle { normal, .. } | Curve::Ellipse { normal, .. } => Some(*normal),
            Curve::Degenerate => None,
        }
    }

    /// The same curve displaced by `offset`.
    pub fn translated(&self, offset: &Vector3<f64>) -> Curve {
        match self {
            Curve::Segment { start, end } => Curve::Segment {
                start: start + offset,
                end: end + offset,
            },
            Curve::Circle {
                center,
                normal,
                x_dir,
                radius,
            } => Curve::Circle {
                center: center + offset,
                normal: *normal,
                x_dir: *x_dir,
                radius: *radius,
            },
            Curve::Ellipse {
                center,
                normal,
                x_dir,
                major_radius,
                minor_radius,
            } => Curve::Ellipse {
                center: center + offset,
                normal: *normal,
                x_dir: *x_dir,
                major_radius: *major_radius,
                minor_radius: *minor_radius,
            },
            Curve::Degenerate => Curve::Degenerate,
        }
    }

    /// Closed conics bound an edge without vertices.
    pub fn is_closed(&self) -> bool {
        matches!(self, Curve::Circle { .. } | Curve::Ellipse { .. })
    }

    /// Minimum distance from `point` to the curve. Exact for segments and
    /// circles, sampled for ellipses; degenerate curves are unmeasurable.
    pub fn distance_to(&self, point: &Point3<f64>) -> Option<f64> {
        match self {
            Curve::Segment { start, end } => {
                let axis = end - start;
                let len_sq = axis.norm_squared();
                if len_sq < EPS {
                    return Some((point - start).norm());
                }
                let t = ((point - start).dot(&axis) / len_sq).clamp(0.0, 1.0);
                Some((point - (start + axis * t)).norm())
            }
            Curve::Circle {
                center,
                normal,
                radius,
                ..
            } => {
                let v = point - center;
                let off_plane = v.dot(normal);
                let in_plane = v - normal.as_ref() * off_plane;
                let d = in_plane.norm();
                if d < EPS {
                    // Axis case: every rim point is equidistant.
                    Some((radius * radius + off_plane * off_plane).sqrt())
                } else {
                    let closest = center + in_plane * (radius / d);
                    Some((point - closest).norm())
                }
            }
            Curve::Ellipse {
                center,
                normal,
                x_dir,
                major_radius,
                minor_radius,
            } => {
                let y_dir = Unit::new_normalize(normal.cross(x_dir));
                let samples = 32;
                let mut best = f64::INFINITY;
                for i in 0..samples {
                    let t = std::f64::consts::TAU * (i as f64) / (samples as f64);
                    let p = center
                        + x_dir.as_ref() * (major_radius * t.cos())
                        + y_dir.as_ref() * (minor_radius * t.sin());
                    best = best.min((point - p).norm());
                }
                Some(best)
            }
            Curve::Degenerate => None,
        }
    }
}

/// Analytic surface carried by a face. Unbounded; the face's wires trim it.
#[derive(Debug, Clone)]
pub enum Surface {
    Plane {
        origin: Point3<f64>,
        normal: Unit<Vector3<f64>>,
    },
    Cylinder {
        origin: Point3<f64>,
        axis: Unit<Vector3<f64>>,
        radius: f64,
    },
}

impl Surface {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Surface::Plane { .. } => "plane",
            Surface::Cylinder { .. } => "cylinder",
        }
    }

    pub fn anchor_point(&self) -> Point3<f64> {
        match self {
            Surface::Plane { origin, .. } | Surface::Cylinder { origin, .. } => *origin,
        }
    }

    /// Plane normal or cylinder axis.
    pub fn direction(&self) -> Unit<Vector3<f64>> {
        match self {
            Surface::Plane { normal, .. } => *normal,
            Surface::Cylinder { axis, .. } => *axis,
        }
    }
}

/// Any unit vector perpendicular to `direction`, chosen deterministically.
pub fn any_perpendicular(direction: &Unit<Vector3<f64>>) -> Unit<Vector3<f64>> {
    let reference = if direction.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    Unit::new_normalize(direction.cross(&reference))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64, z: f64) -> Point3<f64> {
        Point3::new(x, y, z)
    }

    #[test]
    fn segment_derives_endpoints_and_midpoint() {
        let curve = Curve::Segment {
            start: pt(0.0, 0.0, 0.0),
            end: pt(4.0, 0.0, 0.0),
        };
        assert_eq!(curve.end_points().len(), 2);
        assert_eq!(curve.mid_point(), Some(pt(2.0, 0.0, 0.0)));
        assert_eq!(curve.center_point(), None);
        assert!(curve.quadrant_points().is_empty());
    }

    #[test]
    fn circle_derives_center_and_quadrants() {
        let curve = Curve::Circle {
            center: pt(1.0, 1.0, 0.0),
            normal: Unit::new_normalize(Vector3::z()),
            x_dir: Unit::new_normalize(Vector3::x()),
            radius: 2.0,
        };
        assert!(curve.end_points().is_empty(), "closed curves have no ends");
        assert_eq!(curve.center_point(), Some(pt(1.0, 1.0, 0.0)));
        let quadrants = curve.quadrant_points();
        assert_eq!(quadrants.len(), 4);
        assert_eq!(quadrants[0], pt(3.0, 1.0, 0.0));
        assert_eq!(quadrants[1], pt(1.0, 3.0, 0.0));
        assert_eq!(quadrants[2], pt(-1.0, 1.0, 0.0));
        assert_eq!(quadrants[3], pt(1.0, -1.0, 0.0));
    }

    #[test]
    fn distance_to_segment_clamps_to_ends() {
        let curve = Curve::Segment {
            start: pt(0.0, 0.0, 0.0),
            end: pt(2.0, 0.0, 0.0),
        };
        let inside = curve.distance_to(&pt(1.0, 3.0, 0.0));
        assert!((inside.expect("measurable") - 3.0).abs() < 1e-12);
        let beyond = curve.distance_to(&pt(5.0, 0.0, 0.0));
        assert!((beyond.expect("measurable") - 3.0).abs() < 1e-12);
    }

    #[test]
    fn distance_to_circle_handles_axis_point() {
        let curve = Curve::Circle {
            center: pt(0.0, 0.0, 0.0),
            normal: Unit::new_normalize(Vector3::z()),
            x_dir: Unit::new_normalize(Vector3::x()),
            radius: 3.0,
        };
        let on_axis = curve.distance_to(&pt(0.0, 0.0, 4.0)).expect("measurable");
        assert!((on_axis - 5.0).abs() < 1e-12, "3-4-5 triangle to the rim");
        let radial = curve.distance_to(&pt(5.0, 0.0, 0.0)).expect("measurable");
        assert!((radial - 2.0).abs() < 1e-12);
    }

    #[test]
    fn perpendicular_is_perpendicular() {
        for direction in [Vector3::x(), Vector3::y(), Vector3::z(), Vector3::new(1.0, 2.0, 3.0)] {
            let dir = Unit::new_normalize(direction);
            let perp = any_perpendicular(&dir);
            assert!(dir.dot(&perp).abs() < 1e-12);
            assert!((perp.norm() - 1.0).abs() < 1e-12);
        }
    }
}
