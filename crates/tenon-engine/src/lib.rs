//! Feature catalog and update orchestration.
//!
//! A [`Project`] owns a DAG of [`Feature`] nodes with tagged dependency
//! edges. [`Project::update_model`] walks the dirty closure in topological
//! order, hands each feature an [`UpdatePayload`] of cloned upstream
//! registries, and lets the feature rebuild its shape and re-run the identity
//! matching pipeline. Failures stay feature-local: a failed feature records a
//! message and its dependents cascade, but the pass always completes.
//!
//! Graph structure is orchestrator-controlled, so a cyclic edge insertion is
//! a bug and panics; everything a feature build can hit is a [`BuildError`].

pub mod feature;
pub mod features;
pub mod payload;
pub mod project;
pub mod resolve;

pub use feature::{Feature, FeatureCore, FeatureParams, FeatureSnapshot, GeneratedRow};
pub use features::{Blend, Chamfer, Cuboid, Cylinder, Subtract};
pub use payload::{FeatureInput, UpdatePayload};
pub use project::{Project, UpdatePass};
pub use resolve::{resolve_pick_points, resolve_picks};

/// Failures a feature build can report. These never escape the update pass;
/// the orchestrator converts them to a failed status and a log string on the
/// owning feature.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing required input '{role}'")]
    MissingInput { role: String },

    #[error("input '{role}' carries no solid to operate on")]
    NoSolidInput { role: String },

    #[error("no pick resolved to a usable shape")]
    EmptyPicks,

    #[error("strict pick {id} resolved to {count} shapes")]
    StrictPick { id: uuid::Uuid, count: usize },

    #[error(transparent)]
    Brep(#[from] tenon_brep::BrepError),
}
