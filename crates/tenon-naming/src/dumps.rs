use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use petgraph::visit::EdgeRef;

use crate::registry::ShapeRegistry;
use crate::RegistryError;

/// Plain-text and graphviz dumps for debugging a registry by eye. Output
/// formats are for humans, not round-tripping; persistence goes through
/// [`snapshot`](ShapeRegistry::snapshot).
impl ShapeRegistry {
    /// One line per record: offset, kind, id, graph vertex.
    pub fn dump_records(&self, path: &Path) -> Result<(), RegistryError> {
        let mut out = String::new();
        let _ = writeln!(out, "offset  kind      id                                    vertex");
        for (offset, record) in self.records().enumerate() {
            let _ = writeln!(
                out,
                "{:<7} {:<9} {:<37} {}",
                offset,
                format!("{:?}", record.shape.kind()),
                record.id,
                record.vertex.index()
            );
        }
        fs::write(path, out)?;
        Ok(())
    }

    /// One line per evolve row: `in -> out`.
    pub fn dump_evolution(&self, path: &Path) -> Result<(), RegistryError> {
        let mut out = String::new();
        for record in self.evolve().records() {
            let _ = writeln!(out, "{} -> {}", record.in_id, record.out_id);
        }
        fs::write(path, out)?;
        Ok(())
    }

    /// One line per feature tag: `tag: id`.
    pub fn dump_tags(&self, path: &Path) -> Result<(), RegistryError> {
        let mut out = String::new();
        for record in self.tags().records() {
            let _ = writeln!(out, "{}: {}", record.tag, record.id);
        }
        fs::write(path, out)?;
        Ok(())
    }

    /// The containment graph in graphviz dot format, nodes labelled with
    /// kind and a shortened id.
    pub fn dump_graph(&self, path: &Path) -> Result<(), RegistryError> {
        let mut out = String::from("digraph containment {\n");
        for (offset, record) in self.records().enumerate() {
            let id = record.id.to_string();
            let short = id.get(..8).unwrap_or(&id);
            let _ = writeln!(
                out,
                "    n{} [label=\"{:?}\\n{}\"];",
                offset,
                record.shape.kind(),
                short
            );
        }
        for edge in self.graph().edge_references() {
            let _ = writeln!(
                out,
                "    n{} -> n{};",
                *self.graph().node_weight(edge.source()).unwrap_or(&0),
                *self.graph().node_weight(edge.target()).unwrap_or(&0)
            );
        }
        out.push_str("}\n");
        fs::write(path, out)?;
        Ok(())
    }
}
