//! Concrete feature implementations.

mod cuboid;
mod cylinder;
mod dressup;
mod subtract;

pub use cuboid::Cuboid;
pub use cylinder::Cylinder;
pub use dressup::{Blend, Chamfer};
pub use subtract::Subtract;

use tenon_brep::Shape;
use tenon_naming::ShapeRegistry;
use tenon_types::ShapeKind;

/// The solid an input registry carries, if any. Features operate on solids;
/// an input without one is reported by the caller as a build failure.
fn first_solid(registry: &ShapeRegistry) -> Option<Shape> {
    registry.shapes_of_kind(ShapeKind::Solid).into_iter().next()
}
