use std::collections::{HashMap, HashSet};

use crate::shape::Shape;

/// Modification/generation report of a single maker run.
///
/// Keys are shape handles, so the report is only meaningful against the exact
/// input shapes the maker consumed. Callers must query it immediately after
/// the build, while the maker (and the handles it recorded) are still alive;
/// a retained history against rebuilt inputs answers nothing.
#[derive(Debug, Default)]
pub struct OpHistory {
    modified: HashMap<Shape, Vec<Shape>>,
    generated: HashMap<Shape, Vec<Shape>>,
    deleted: HashSet<Shape>,
}

impl OpHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_modified(&mut self, source: &Shape, result: &Shape) {
        let entries = self.modified.entry(source.clone()).or_default();
        if !entries.contains(result) {
            entries.push(result.clone());
        }
    }

    pub(crate) fn record_generated(&mut self, source: &Shape, result: &Shape) {
        let entries = self.generated.entry(source.clone()).or_default();
        if !entries.contains(result) {
            entries.push(result.clone());
        }
    }

    pub(crate) fn record_deleted(&mut self, source: &Shape) {
        self.deleted.insert(source.clone());
    }

    /// Result shapes the operation rebuilt `source` into. Empty when the
    /// source was untouched (carried by handle) or deleted.
    pub fn modified(&self, source: &Shape) -> &[Shape] {
        self.modified.get(source).map_or(&[], Vec::as_slice)
    }

    /// Result shapes the operation created from `source` (e.g. the dress-up
    /// face grown out of a selected edge). Order is the maker's creation
    /// order.
    pub fn generated(&self, source: &Shape) -> &[Shape] {
        self.generated.get(source).map_or(&[], Vec::as_slice)
    }

    /// True when the operation consumed `source` with no result counterpart.
    pub fn is_deleted(&self, source: &Shape) -> bool {
        self.deleted.contains(source)
    }

    pub fn modified_count(&self) -> usize {
        self.modified.len()
    }

    pub fn generated_count(&self) -> usize {
        self.generated.len()
    }
}
