use tenon_brep::{BooleanKind, BooleanMaker, Shape};
use tracing::debug;
use uuid::Uuid;

use crate::feature::{Feature, FeatureCore, FeatureParams};
use crate::features::first_solid;
use crate::payload::UpdatePayload;
use crate::BuildError;

/// Boolean subtraction: `target` role minus every connected `toolN` role.
///
/// With no tools connected the target passes through untouched; a missing
/// target is the only hard failure. Identity composition: handle match
/// against every input, maker-modified match per input, outer wires, then
/// derived ids for the fresh section contours.
#[derive(Debug)]
pub struct Subtract {
    core: FeatureCore,
}

impl Subtract {
    pub fn new() -> Self {
        Subtract {
            core: FeatureCore::new("subtract"),
        }
    }

    pub fn restore(id: Uuid, name: &str) -> Self {
        Subtract {
            core: FeatureCore::with_id(id, name),
        }
    }
}

impl Default for Subtract {
    fn default() -> Self {
        Self::new()
    }
}

impl Feature for Subtract {
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
        "subtract"
    }

    fn build(&mut self, payload: &UpdatePayload) -> Result<(), BuildError> {
        let target = payload
            .single(&tenon_types::InputTag::target())
            .ok_or_else(|| BuildError::MissingInput {
                role: "target".to_string(),
            })?;
        let target_solid = first_solid(&target.registry).ok_or_else(|| {
            BuildError::NoSolidInput {
                role: "target".to_string(),
            }
        })?;

        let tools = payload.tools();
        let tool_solids: Vec<Shape> = tools
            .iter()
            .filter_map(|tool| first_solid(&tool.registry))
            .collect();

        let registry = self.core.registry_mut();
        if tool_solids.is_empty() {
            debug!("no tools connected, target passes through");
            registry.set_shape(&target_solid);
            registry.shape_match(&target.registry);
        } else {
            let maker = BooleanMaker::new(BooleanKind::Subtract, &target_solid, &tool_solids)?;
            registry.set_shape(maker.result());
            registry.shape_match(&target.registry);
            for tool in &tools {
                registry.shape_match(&tool.registry);
            }
            registry.modified_match(maker.history(), &target.registry);
            for tool in &tools {
                registry.modified_match(maker.history(), &tool.registry);
            }
            registry.outer_wire_match(&target.registry);
            for tool in &tools {
                registry.outer_wire_match(&tool.registry);
            }
        }
        registry.derived_match();
        registry.ensure_no_nils();
        registry.ensure_no_duplicates();
        Ok(())
    }

    fn params(&self) -> FeatureParams {
        FeatureParams::Subtract
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Cuboid;
    use crate::payload::FeatureInput;
    use tenon_types::{InputTag, ShapeHistory, ShapeKind};

    fn built_cuboid(l: f64, w: f64, h: f64) -> Cuboid {
        let mut cuboid = Cuboid::new(l, w, h);
        cuboid.build(&UpdatePayload::default()).expect("valid dims");
        cuboid
    }

    fn payload_with(target: &Cuboid, tools: &[&Cuboid]) -> UpdatePayload {
        let mut payload = UpdatePayload::new(ShapeHistory::new());
        payload.push(
            InputTag::target(),
            FeatureInput {
                feature_id: target.id(),
                registry: target.registry().clone(),
            },
        );
        for (index, tool) in tools.iter().enumerate() {
            payload.push(
                InputTag::tool(index),
                FeatureInput {
                    feature_id: tool.id(),
                    registry: tool.registry().clone(),
                },
            );
        }
        payload
    }

    #[test]
    fn subtract_carries_target_and_tool_identity() {
        let target = built_cuboid(10.0, 10.0, 10.0);
        let tool = built_cuboid(4.0, 4.0, 4.0);
        let mut subtract = Subtract::new();
        subtract
            .build(&payload_with(&target, &[&tool]))
            .expect("overlapping solids");

        let registry = subtract.registry();
        assert!(registry.is_normalized());
        // The far faces of the target were untouched and keep their ids.
        let far_face = target
            .registry()
            .tags()
            .id_for_tag("FaceXP")
            .expect("tagged");
        assert!(registry.has_id(far_face));
        assert!(!registry.ids_of_kind(ShapeKind::Edge).is_empty());
    }

    #[test]
    fn missing_tools_mean_passthrough_not_failure() {
        let target = built_cuboid(10.0, 10.0, 10.0);
        let mut subtract = Subtract::new();
        subtract
            .build(&payload_with(&target, &[]))
            .expect("passthrough");

        let solid_id = target
            .registry()
            .tags()
            .id_for_tag("Solid")
            .expect("tagged");
        assert!(subtract.registry().has_id(solid_id));
    }

    #[test]
    fn missing_target_is_a_build_failure() {
        let mut subtract = Subtract::new();
        let err = subtract
            .build(&UpdatePayload::default())
            .expect_err("no target role");
        assert!(matches!(err, BuildError::MissingInput { .. }));
    }
}
