use serde::{Deserialize, Serialize};
use tenon_engine::{Feature, FeatureSnapshot, Project};
use tenon_types::InputTag;
use uuid::Uuid;

use crate::metadata::ProjectMetadata;

/// Current file format version.
pub const FORMAT_VERSION: u32 = 1;

/// Format identifier at the top of every project file.
pub const FORMAT_NAME: &str = "tenon";

/// The top-level file structure.
#[derive(Debug, Clone, Serialize)]
pub struct TenonFile {
    /// Format identifier.
    pub format: String,
    /// Format version number.
    pub version: u32,
    /// Project metadata.
    pub metadata: ProjectMetadata,
    /// Per-feature parameters and identity tables.
    pub features: Vec<FeatureSnapshot>,
    /// Tagged dependency edges of the feature graph.
    pub connections: Vec<ConnectionRow>,
}

/// One tagged edge of the dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionRow {
    pub parent: Uuid,
    pub child: Uuid,
    pub tag: InputTag,
}

/// Serialize a project to a pretty-printed JSON string.
pub fn save_project(project: &Project, metadata: &ProjectMetadata) -> String {
    let mut features = Vec::new();
    let mut connections = Vec::new();
    for id in project.feature_ids() {
        let feature = project.feature(id);
        features.push(FeatureSnapshot {
            id,
            name: feature.name().to_string(),
            params: feature.params(),
            registry: feature.registry().snapshot(),
        });
        for (tag, parents) in project.parent_map(id) {
            for parent in parents {
                connections.push(ConnectionRow {
                    parent,
                    child: id,
                    tag: tag.clone(),
                });
            }
        }
    }
    let file = TenonFile {
        format: FORMAT_NAME.to_string(),
        version: FORMAT_VERSION,
        metadata: metadata.clone(),
        features,
        connections,
    };
    serde_json::to_string_pretty(&file).expect("project serialization should never fail")
}
