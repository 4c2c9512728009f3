//! Versioned on-disk project persistence.
//!
//! A project file is a JSON document `{ format, version, metadata, features,
//! connections }`. Feature geometry is not stored; loading re-runs every
//! builder in dependency order and then re-applies each feature's persisted
//! identity table over the fresh enumeration. The offset-based table is only
//! valid against the exact topology it was written from, which is why the
//! rebuild happens first.

pub mod errors;
pub mod load;
pub mod metadata;
pub mod migrate;
pub mod save;

pub use errors::LoadError;
pub use load::load_project;
pub use metadata::ProjectMetadata;
pub use save::{save_project, ConnectionRow, TenonFile, FORMAT_VERSION};
