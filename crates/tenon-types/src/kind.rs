use serde::{Deserialize, Serialize};

/// The kind of topological entity, container-first.
///
/// Declaration order is the enumeration order used everywhere a shape tree is
/// flattened (registry population, serialization offsets): compounds first,
/// vertices last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShapeKind {
    Compound,
    Solid,
    Shell,
    Face,
    Wire,
    Edge,
    Vertex,
}

impl ShapeKind {
    /// All kinds in enumeration order.
    pub const ALL: [ShapeKind; 7] = [
        ShapeKind::Compound,
        ShapeKind::Solid,
        ShapeKind::Shell,
        ShapeKind::Face,
        ShapeKind::Wire,
        ShapeKind::Edge,
        ShapeKind::Vertex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Compound => "compound",
            ShapeKind::Solid => "solid",
            ShapeKind::Shell => "shell",
            ShapeKind::Face => "face",
            ShapeKind::Wire => "wire",
            ShapeKind::Edge => "edge",
            ShapeKind::Vertex => "vertex",
        }
    }
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
