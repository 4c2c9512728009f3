use serde::{Deserialize, Serialize};
use tenon_naming::{RegistrySnapshot, ShapeRegistry};
use tenon_types::Pick;
use uuid::Uuid;

use crate::payload::UpdatePayload;
use crate::BuildError;

/// State every feature carries: identity, its shape registry, and the four
/// orthogonal status flags the orchestrator drives.
#[derive(Debug)]
pub struct FeatureCore {
    id: Uuid,
    name: String,
    registry: ShapeRegistry,
    model_dirty: bool,
    visual_dirty: bool,
    active: bool,
    leaf: bool,
    failed: bool,
    last_error: Option<String>,
}

impl FeatureCore {
    /// A fresh feature starts dirty, active, and leaf: it has never been
    /// built and its output is part of the displayed result until the graph
    /// says otherwise.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    /// Core with a caller-supplied id, for restoring persisted features.
    pub fn with_id(id: Uuid, name: impl Into<String>) -> Self {
        FeatureCore {
            id,
            name: name.into(),
            registry: ShapeRegistry::new(),
            model_dirty: true,
            visual_dirty: true,
            active: true,
            leaf: true,
            failed: false,
            last_error: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &ShapeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ShapeRegistry {
        &mut self.registry
    }

    // ── Status flags ─────────────────────────────────────────────────────

    pub fn is_model_dirty(&self) -> bool {
        self.model_dirty
    }

    pub fn set_model_dirty(&mut self) {
        self.model_dirty = true;
    }

    pub(crate) fn set_model_clean(&mut self) {
        self.model_dirty = false;
    }

    pub fn is_visual_dirty(&self) -> bool {
        self.visual_dirty
    }

    pub(crate) fn set_visual_dirty(&mut self) {
        self.visual_dirty = true;
    }

    /// Called by the visualization layer once it has regenerated from the
    /// current registry contents.
    pub fn set_visual_clean(&mut self) {
        self.visual_dirty = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    pub fn set_leaf(&mut self, leaf: bool) {
        self.leaf = leaf;
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Last build failure message, kept until the next successful build.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn record_failure(&mut self, message: String) {
        self.failed = true;
        self.last_error = Some(message);
    }

    pub(crate) fn clear_failure(&mut self) {
        self.failed = false;
        self.last_error = None;
    }
}

/// One node of the dependency graph. Implementations own typed parameters
/// (setters mark the core model-dirty) and a `build` that replaces the
/// registry's shape generation and runs its matching composition.
pub trait Feature: std::fmt::Debug {
    fn core(&self) -> &FeatureCore;

    fn core_mut(&mut self) -> &mut FeatureCore;

    /// Downcast support; features live behind `Box<dyn Feature>` in the
    /// project graph and parameter edits need the concrete type back.
    fn as_any(&self) -> &dyn std::any::Any;

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;

    /// Stable kind string, matching the snapshot tag.
    fn kind(&self) -> &'static str;

    /// Rebuilds geometry and identity from the payload. An `Err` marks the
    /// feature failed without aborting the update pass.
    fn build(&mut self, payload: &UpdatePayload) -> Result<(), BuildError>;

    /// Serializable image of parameters; registry state is captured
    /// separately by the orchestrator.
    fn params(&self) -> FeatureParams;

    fn id(&self) -> Uuid {
        self.core().id()
    }

    fn name(&self) -> &str {
        self.core().name()
    }

    fn registry(&self) -> &ShapeRegistry {
        self.core().registry()
    }
}

/// Persisted image of one feature: identity, parameters, and the registry's
/// offset-based identity table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    pub id: Uuid,
    pub name: String,
    pub params: FeatureParams,
    pub registry: RegistrySnapshot,
}

/// Typed parameters per feature kind, tagged for the project file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FeatureParams {
    Cuboid {
        length: f64,
        width: f64,
        height: f64,
    },
    Cylinder {
        radius: f64,
        height: f64,
    },
    Subtract,
    Chamfer {
        picks: Vec<Pick>,
        distance: f64,
        generated: Vec<GeneratedRow>,
    },
    Blend {
        picks: Vec<Pick>,
        radius: f64,
        generated: Vec<GeneratedRow>,
    },
}

/// One persisted entry of a dress-up feature's source-id to generated-id map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedRow {
    pub source: Uuid,
    pub generated: Uuid,
}

/// Reconstructs a feature from its snapshot. The registry snapshot is not
/// applied here; the loader rebuilds geometry first and then restores
/// identity over the fresh enumeration.
pub fn from_snapshot(snapshot: &FeatureSnapshot) -> Box<dyn Feature> {
    use crate::features::{Blend, Chamfer, Cuboid, Cylinder, Subtract};
    match &snapshot.params {
        FeatureParams::Cuboid {
            length,
            width,
            height,
        } => Box::new(Cuboid::restore(
            snapshot.id,
            &snapshot.name,
            *length,
            *width,
            *height,
        )),
        FeatureParams::Cylinder { radius, height } => Box::new(Cylinder::restore(
            snapshot.id,
            &snapshot.name,
            *radius,
            *height,
        )),
        FeatureParams::Subtract => Box::new(Subtract::restore(snapshot.id, &snapshot.name)),
        FeatureParams::Chamfer {
            picks,
            distance,
            generated,
        } => Box::new(Chamfer::restore(
            snapshot.id,
            &snapshot.name,
            picks.clone(),
            *distance,
            generated,
        )),
        FeatureParams::Blend {
            picks,
            radius,
            generated,
        } => Box::new(Blend::restore(
            snapshot.id,
            &snapshot.name,
            picks.clone(),
            *radius,
            generated,
        )),
    }
}
