use std::collections::{HashMap, HashSet, VecDeque};

use serde::Deserialize;
use tenon_engine::{feature::from_snapshot, Feature, FeatureSnapshot, Project};
use tracing::debug;
use uuid::Uuid;

use crate::errors::LoadError;
use crate::metadata::ProjectMetadata;
use crate::save::{ConnectionRow, FORMAT_NAME, FORMAT_VERSION};

/// The top-level file structure for deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct TenonFileRaw {
    pub format: String,
    pub version: u32,
    pub metadata: ProjectMetadata,
    pub features: Vec<FeatureSnapshot>,
    pub connections: Vec<ConnectionRow>,
}

/// Deserialize a project from a JSON string.
///
/// Validates the format identifier and version, reconstructs the feature
/// graph, then walks it in dependency order rebuilding each feature's
/// geometry and immediately re-applying its persisted identity table — so a
/// downstream feature always resolves its picks against upstream ids exactly
/// as they were saved.
pub fn load_project(json: &str) -> Result<(Project, ProjectMetadata), LoadError> {
    let raw: TenonFileRaw =
        serde_json::from_str(json).map_err(|e| LoadError::ParseError(e.to_string()))?;

    if raw.format != FORMAT_NAME {
        return Err(LoadError::UnknownFormat(raw.format));
    }
    if raw.version > FORMAT_VERSION {
        return Err(LoadError::FutureVersion {
            file_version: raw.version,
            supported_version: FORMAT_VERSION,
        });
    }
    let (features, connections) = if raw.version < FORMAT_VERSION {
        crate::migrate::migrate(raw.features, raw.connections, raw.version, FORMAT_VERSION)?
    } else {
        (raw.features, raw.connections)
    };

    let ids: HashSet<Uuid> = features.iter().map(|f| f.id).collect();
    for row in &connections {
        for endpoint in [row.parent, row.child] {
            if !ids.contains(&endpoint) {
                return Err(LoadError::UnknownFeature { id: endpoint });
            }
        }
    }
    let order = dependency_order(&ids, &connections)?;

    let mut project = Project::new();
    let mut snapshots: HashMap<Uuid, FeatureSnapshot> = HashMap::new();
    for snapshot in features {
        project.add_feature(from_snapshot(&snapshot));
        snapshots.insert(snapshot.id, snapshot);
    }
    for row in &connections {
        project.connect(row.parent, row.child, row.tag.clone());
    }

    for id in order {
        project.rebuild_feature(id);
        if let Some(snapshot) = snapshots.remove(&id) {
            project
                .feature_mut(id)
                .core_mut()
                .registry_mut()
                .restore(snapshot.registry)
                .map_err(|e| LoadError::RestoreFailed {
                    id,
                    reason: e.to_string(),
                })?;
        }
    }
    project.rebuild_history();
    debug!(features = project.len(), "project loaded");
    Ok((project, raw.metadata))
}

/// Kahn's algorithm over the connection rows: a topological order, or the
/// cycle error a hand-edited file can smuggle in.
fn dependency_order(
    ids: &HashSet<Uuid>,
    connections: &[ConnectionRow],
) -> Result<Vec<Uuid>, LoadError> {
    let mut in_degree: HashMap<Uuid, usize> = ids.iter().map(|&id| (id, 0)).collect();
    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    let mut seen_edges = HashSet::new();
    for row in connections {
        // Several tags on one edge are one dependency.
        if seen_edges.insert((row.parent, row.child)) {
            *in_degree.entry(row.child).or_default() += 1;
            children.entry(row.parent).or_default().push(row.child);
        }
    }

    let mut ready: VecDeque<Uuid> = in_degree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(&id, _)| id)
        .collect();
    let mut order = Vec::with_capacity(ids.len());
    while let Some(id) = ready.pop_front() {
        order.push(id);
        for &child in children.get(&id).map_or(&[][..], Vec::as_slice) {
            let degree = in_degree
                .get_mut(&child)
                .unwrap_or_else(|| panic!("in-degree table lost feature {child}"));
            *degree -= 1;
            if *degree == 0 {
                ready.push_back(child);
            }
        }
    }

    if order.len() < ids.len() {
        let stuck = in_degree
            .iter()
            .find(|(_, &degree)| degree > 0)
            .map(|(&id, _)| id)
            .unwrap_or_default();
        return Err(LoadError::CyclicConnections { id: stuck });
    }
    Ok(order)
}
