//! Deterministic B-rep provider: immutable shape trees behind shared handles,
//! analytic curve/surface payloads, and maker objects that report their own
//! modification/generation history.
//!
//! Handle identity is the contract the identity layer above builds on: a
//! maker carries every untouched sub-shape into its result as the same handle,
//! and replaces touched ones with fresh nodes recorded in its history.

pub mod boolean;
pub mod dressup;
pub mod geometry;
pub mod history;
pub mod primitives;
pub mod shape;

pub use boolean::{BooleanKind, BooleanMaker};
pub use dressup::{BlendMaker, ChamferMaker};
pub use geometry::{any_perpendicular, Curve, Surface};
pub use history::OpHistory;
pub use primitives::{BoxMaker, CylinderMaker};
pub use shape::Shape;

/// Errors from shape construction and maker runs.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BrepError {
    #[error("dimension must be positive: {name} = {value}")]
    NonPositiveDimension { name: &'static str, value: f64 },

    #[error("expected a {expected} input, got {actual}")]
    WrongKind {
        expected: tenon_types::ShapeKind,
        actual: tenon_types::ShapeKind,
    },

    #[error("edge is not a sub-shape of the target solid")]
    ForeignEdge,

    #[error("edge must bound exactly two faces, found {count}")]
    OpenEdge { count: usize },

    #[error("boolean requires at least one tool")]
    NoTools,

    #[error("no edges selected for the operation")]
    NoEdges,

    #[error("shape carries no measurable geometry")]
    Unmeasurable,

    #[error("operation produced an empty result")]
    EmptyResult,
}
