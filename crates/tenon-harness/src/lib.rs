//! Test harness for scripting end-to-end modeling workflows.
//!
//! # Key Components
//!
//! - [`ModelBuilder`] — fluent API for composing feature graphs by name
//! - [`assertions`] — assertion helpers with contextual diagnostics

pub mod assertions;
pub mod workflow;

pub use workflow::ModelBuilder;

/// Errors from harness operations and failed assertions.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("feature name already in use: {name}")]
    NameTaken { name: String },

    #[error("no feature named: {name}")]
    UnknownFeature { name: String },

    #[error("feature '{feature}' has no tag '{tag}'")]
    MissingTag { feature: String, tag: String },

    #[error("assertion failed: {detail}")]
    AssertionFailed { detail: String },
}
