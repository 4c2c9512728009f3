use tenon_brep::BoxMaker;
use tracing::debug;
use uuid::Uuid;

use crate::feature::{Feature, FeatureCore, FeatureParams};
use crate::payload::UpdatePayload;
use crate::BuildError;

/// Axis-aligned box primitive. Identity is anchored by feature tags: every
/// sub-shape the maker names keeps the id first registered for its tag, so a
/// resize preserves the whole id table without any source matching.
#[derive(Debug)]
pub struct Cuboid {
    core: FeatureCore,
    length: f64,
    width: f64,
    height: f64,
}

impl Cuboid {
    pub fn new(length: f64, width: f64, height: f64) -> Self {
        Cuboid {
            core: FeatureCore::new("cuboid"),
            length,
            width,
            height,
        }
    }

    pub fn restore(id: Uuid, name: &str, length: f64, width: f64, height: f64) -> Self {
        Cuboid {
            core: FeatureCore::with_id(id, name),
            length,
            width,
            height,
        }
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn set_length(&mut self, length: f64) {
        self.length = length;
        self.core.set_model_dirty();
    }

    pub fn set_width(&mut self, width: f64) {
        self.width = width;
        self.core.set_model_dirty();
    }

    pub fn set_height(&mut self, height: f64) {
        self.height = height;
        self.core.set_model_dirty();
    }
}

impl Feature for Cuboid {
    fn core(&self) -> &FeatureCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FeatureCore {
        &mut self.core
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn kind(&self) -> &'static str {
        "cuboid"
    }

    fn build(&mut self, _payload: &UpdatePayload) -> Result<(), BuildError> {
        let maker = BoxMaker::new(self.length, self.width, self.height)?;
        let registry = self.core.registry_mut();
        registry.set_shape(maker.solid());
        for (tag, shape) in maker.tagged() {
            let id = registry
                .tags()
                .id_for_tag(tag)
                .unwrap_or_else(Uuid::new_v4);
            registry.update_id_by_shape(shape, id);
            registry.tags_mut().add(id, tag.clone());
        }
        registry.ensure_no_nils();
        registry.ensure_no_duplicates();
        debug!(records = registry.len(), "cuboid rebuilt");
        Ok(())
    }

    fn params(&self) -> FeatureParams {
        FeatureParams::Cuboid {
            length: self.length,
            width: self.width,
            height: self.height,
        }
    }
}
