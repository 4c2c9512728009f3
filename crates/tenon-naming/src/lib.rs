//! Persistent shape identity for one feature's shape generation.
//!
//! A [`ShapeRegistry`] owns the id/shape/graph-vertex table for the current
//! root shape of a feature, the evolve lineage of the current generation, the
//! feature-tag anchors of primitives, and the derived-id container. The
//! matching pipeline reconciles a freshly enumerated (all-nil) registry
//! against the previous generation so sub-shapes that are "the same" across
//! an edit keep their ids.
//!
//! The registry is mutated only by trusted internal callers; violated key
//! preconditions are bugs in core logic and panic rather than surface as
//! recoverable errors.

pub mod containers;
pub mod dumps;
pub mod matching;
pub mod queries;
pub mod registry;
pub mod snapshot;

pub use containers::{DerivedContainer, EvolveContainer, EvolveRecord, TagContainer, TagRecord};
pub use registry::{ShapeRecord, ShapeRegistry};
pub use snapshot::RegistrySnapshot;

/// Recoverable registry failures: snapshot restoration against the wrong
/// topology and dump-file I/O. Key-contract violations are not here; those
/// panic.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry has no shape; call set_shape before restoring a snapshot")]
    ShapeNotSet,

    #[error("snapshot offset {offset} out of range (registry has {count} records)")]
    OffsetOutOfRange { offset: usize, count: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
