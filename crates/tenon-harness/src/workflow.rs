//! ModelBuilder — fluent API for scripting modeling workflows in tests.
//!
//! All methods accept string names instead of UUIDs for readability; names
//! map to feature ids internally and tagged sub-shapes are reached through
//! `feature.tag` pairs like `("box", "EdgeXPZP")`.

use std::collections::HashMap;

use tenon_engine::{Blend, Chamfer, Cuboid, Cylinder, Feature, Project, Subtract, UpdatePass};
use tenon_naming::ShapeRegistry;
use tenon_types::{InputTag, Pick};
use uuid::Uuid;

use crate::HarnessError;

/// A fluent builder for constructing and verifying feature graphs in tests.
pub struct ModelBuilder {
    pub project: Project,
    named: HashMap<String, Uuid>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        ModelBuilder {
            project: Project::new(),
            named: HashMap::new(),
        }
    }

    // ── Feature shortcuts ───────────────────────────────────────────────

    pub fn cuboid(
        &mut self,
        name: &str,
        length: f64,
        width: f64,
        height: f64,
    ) -> Result<Uuid, HarnessError> {
        self.check_name_available(name)?;
        let id = self
            .project
            .add_feature(Box::new(Cuboid::new(length, width, height)));
        self.named.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn cylinder(&mut self, name: &str, radius: f64, height: f64) -> Result<Uuid, HarnessError> {
        self.check_name_available(name)?;
        let id = self
            .project
            .add_feature(Box::new(Cylinder::new(radius, height)));
        self.named.insert(name.to_string(), id);
        Ok(id)
    }

    /// Subtract feature consuming `target` and `tools[i]` under `tool{i}`.
    pub fn subtract(
        &mut self,
        name: &str,
        target: &str,
        tools: &[&str],
    ) -> Result<Uuid, HarnessError> {
        self.check_name_available(name)?;
        let target_id = self.id(target)?;
        let tool_ids: Vec<Uuid> = tools
            .iter()
            .map(|tool| self.id(tool))
            .collect::<Result<_, _>>()?;
        let id = self.project.add_feature(Box::new(Subtract::new()));
        self.project.connect(target_id, id, InputTag::target());
        for (index, tool_id) in tool_ids.into_iter().enumerate() {
            self.project.connect(tool_id, id, InputTag::tool(index));
        }
        self.named.insert(name.to_string(), id);
        Ok(id)
    }

    /// Chamfer on tagged edges of an already-updated upstream feature.
    pub fn chamfer(
        &mut self,
        name: &str,
        target: &str,
        edge_tags: &[&str],
        distance: f64,
    ) -> Result<Uuid, HarnessError> {
        self.check_name_available(name)?;
        let target_id = self.id(target)?;
        let picks = self.picks_for_tags(target, edge_tags)?;
        let id = self.project.add_feature(Box::new(Chamfer::new(picks, distance)));
        self.project.connect(target_id, id, InputTag::target());
        self.named.insert(name.to_string(), id);
        Ok(id)
    }

    /// Blend on tagged edges of an already-updated upstream feature.
    pub fn blend(
        &mut self,
        name: &str,
        target: &str,
        edge_tags: &[&str],
        radius: f64,
    ) -> Result<Uuid, HarnessError> {
        self.check_name_available(name)?;
        let target_id = self.id(target)?;
        let picks = self.picks_for_tags(target, edge_tags)?;
        let id = self.project.add_feature(Box::new(Blend::new(picks, radius)));
        self.project.connect(target_id, id, InputTag::target());
        self.named.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn update(&mut self) -> UpdatePass {
        self.project.update_model()
    }

    // ── Named access ────────────────────────────────────────────────────

    pub fn id(&self, name: &str) -> Result<Uuid, HarnessError> {
        self.named
            .get(name)
            .copied()
            .ok_or_else(|| HarnessError::UnknownFeature {
                name: name.to_string(),
            })
    }

    pub fn feature(&self, name: &str) -> Result<&dyn Feature, HarnessError> {
        Ok(self.project.feature(self.id(name)?))
    }

    pub fn registry(&self, name: &str) -> Result<&ShapeRegistry, HarnessError> {
        Ok(self.feature(name)?.registry())
    }

    /// The id registered for `tag` on the named feature.
    pub fn tagged_id(&self, name: &str, tag: &str) -> Result<Uuid, HarnessError> {
        self.registry(name)?
            .tags()
            .id_for_tag(tag)
            .ok_or_else(|| HarnessError::MissingTag {
                feature: name.to_string(),
                tag: tag.to_string(),
            })
    }

    /// A pick (with devolve lineage and tag fallback) for a tagged shape.
    pub fn pick_tagged(&self, name: &str, tag: &str) -> Result<Pick, HarnessError> {
        let feature_id = self.id(name)?;
        let shape_id = self.tagged_id(name, tag)?;
        Ok(self.project.create_pick(feature_id, shape_id))
    }

    fn picks_for_tags(&self, name: &str, tags: &[&str]) -> Result<Vec<Pick>, HarnessError> {
        tags.iter().map(|tag| self.pick_tagged(name, tag)).collect()
    }

    fn check_name_available(&self, name: &str) -> Result<(), HarnessError> {
        if self.named.contains_key(name) {
            return Err(HarnessError::NameTaken {
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}
