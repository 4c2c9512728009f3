use std::collections::BTreeMap;

use tenon_naming::ShapeRegistry;
use tenon_types::{InputTag, ShapeHistory};
use uuid::Uuid;

/// One upstream dependency as a feature's builder sees it: the parent's id
/// and a clone of its registry, frozen at payload construction.
#[derive(Debug, Clone)]
pub struct FeatureInput {
    pub feature_id: Uuid,
    pub registry: ShapeRegistry,
}

/// Everything a feature build is allowed to read: upstream registries grouped
/// by input tag, plus the project-wide shape history for pick resolution.
/// Payloads own their data, so a build never borrows the live graph.
#[derive(Debug, Default)]
pub struct UpdatePayload {
    inputs: BTreeMap<InputTag, Vec<FeatureInput>>,
    pub history: ShapeHistory,
}

impl UpdatePayload {
    pub fn new(history: ShapeHistory) -> Self {
        UpdatePayload {
            inputs: BTreeMap::new(),
            history,
        }
    }

    pub(crate) fn push(&mut self, tag: InputTag, input: FeatureInput) {
        self.inputs.entry(tag).or_default().push(input);
    }

    /// All inputs under `tag`; an absent role is an empty slice, not an
    /// error, so callers decide what absence means for them.
    pub fn inputs(&self, tag: &InputTag) -> &[FeatureInput] {
        self.inputs.get(tag).map_or(&[], Vec::as_slice)
    }

    /// The single input under `tag`, if exactly one exists.
    pub fn single(&self, tag: &InputTag) -> Option<&FeatureInput> {
        match self.inputs(tag) {
            [input] => Some(input),
            _ => None,
        }
    }

    /// All tool-role inputs, in tag order (tool0, tool1, ...).
    pub fn tools(&self) -> Vec<&FeatureInput> {
        self.inputs
            .iter()
            .filter(|(tag, _)| tag.is_tool())
            .flat_map(|(_, inputs)| inputs.iter())
            .collect()
    }

    pub fn tags(&self) -> impl Iterator<Item = &InputTag> {
        self.inputs.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> FeatureInput {
        FeatureInput {
            feature_id: Uuid::new_v4(),
            registry: ShapeRegistry::new(),
        }
    }

    #[test]
    fn absent_roles_are_empty_not_errors() {
        let payload = UpdatePayload::new(ShapeHistory::new());
        assert!(payload.inputs(&InputTag::target()).is_empty());
        assert!(payload.single(&InputTag::target()).is_none());
        assert!(payload.tools().is_empty());
    }

    #[test]
    fn tools_come_back_in_tag_order() {
        let mut payload = UpdatePayload::new(ShapeHistory::new());
        let (a, b) = (input(), input());
        payload.push(InputTag::tool(1), b.clone());
        payload.push(InputTag::tool(0), a.clone());
        payload.push(InputTag::target(), input());

        let tools: Vec<Uuid> = payload.tools().iter().map(|t| t.feature_id).collect();
        assert_eq!(tools, vec![a.feature_id, b.feature_id]);
    }

    #[test]
    fn single_rejects_ambiguity() {
        let mut payload = UpdatePayload::new(ShapeHistory::new());
        payload.push(InputTag::target(), input());
        payload.push(InputTag::target(), input());
        assert!(payload.single(&InputTag::target()).is_none());
        assert_eq!(payload.inputs(&InputTag::target()).len(), 2);
    }
}
