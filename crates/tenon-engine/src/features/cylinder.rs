use tenon_brep::CylinderMaker;
use tracing::debug;
use uuid::Uuid;

use crate::feature::{Feature, FeatureCore, FeatureParams};
use crate::payload::UpdatePayload;
use crate::BuildError;

/// Cylinder primitive, tag-anchored like [`Cuboid`](super::Cuboid).
#[derive(Debug)]
pub struct Cylinder {
    core: FeatureCore,
    radius: f64,
    height: f64,
}

impl Cylinder {
    pub fn new(radius: f64, height: f64) -> Self {
        Cylinder {
            core: FeatureCore::new("cylinder"),
            radius,
            height,
        }
    }

    pub fn restore(id: Uuid, name: &str, radius: f64, height: f64) -> Self {
        Cylinder {
            core: FeatureCore::with_id(id, name),
            radius,
            height,
        }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius;
        self.core.set_model_dirty();
    }

    pub fn set_height(&mut self, height: f64) {
        self.height = height;
        self.core.set_model_dirty();
    }
}

impl Feature for Cylinder {
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
        "cylinder"
    }

    fn build(&mut self, _payload: &UpdatePayload) -> Result<(), BuildError> {
        let maker = CylinderMaker::new(self.radius, self.height)?;
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
        debug!(records = registry.len(), "cylinder rebuilt");
        Ok(())
    }

    fn params(&self) -> FeatureParams {
        FeatureParams::Cylinder {
            radius: self.radius,
            height: self.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rim_edge_ids_are_stable_across_rebuilds() {
        let mut cylinder = Cylinder::new(3.0, 8.0);
        let payload = UpdatePayload::default();
        cylinder.build(&payload).expect("valid dims");
        let rim = cylinder
            .registry()
            .tags()
            .id_for_tag("EdgeTop")
            .expect("tag registered");

        cylinder.set_height(12.0);
        cylinder.build(&payload).expect("valid dims");
        assert_eq!(cylinder.registry().tags().id_for_tag("EdgeTop"), Some(rim));
        assert!(cylinder.registry().has_id(rim));
    }
}
