use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One evolution step inside a single feature: the sub-shape that used to be
/// `in_id` became `out_id` during the latest recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolveRecord {
    pub in_id: Uuid,
    pub out_id: Uuid,
}

/// Append-only lineage of the current shape generation. Cleared whenever the
/// owning registry's root shape is replaced; splits are one-in-many-out rows,
/// merges many-in-one-out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvolveContainer {
    records: Vec<EvolveRecord>,
}

impl EvolveContainer {
    pub fn add(&mut self, in_id: Uuid, out_id: Uuid) {
        if in_id == out_id {
            return;
        }
        let record = EvolveRecord { in_id, out_id };
        if !self.records.contains(&record) {
            self.records.push(record);
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn records(&self) -> &[EvolveRecord] {
        &self.records
    }

    /// Ids that `in_id` became.
    pub fn evolved(&self, in_id: Uuid) -> Vec<Uuid> {
        self.records
            .iter()
            .filter(|r| r.in_id == in_id)
            .map(|r| r.out_id)
            .collect()
    }

    /// Ids that became `out_id`.
    pub fn devolved(&self, out_id: Uuid) -> Vec<Uuid> {
        self.records
            .iter()
            .filter(|r| r.out_id == out_id)
            .map(|r| r.in_id)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Named anchor into a primitive's shape set ("FaceXP" and friends). Keyed by
/// tag name, so identity survives any rebuild that produces the same tag set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: Uuid,
    pub tag: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagContainer {
    records: Vec<TagRecord>,
}

impl TagContainer {
    /// Registers `tag` with `id`; a tag seen before keeps its original id and
    /// the call is a no-op.
    pub fn add(&mut self, id: Uuid, tag: impl Into<String>) {
        let tag = tag.into();
        if self.id_for_tag(&tag).is_none() {
            self.records.push(TagRecord { id, tag });
        }
    }

    pub fn id_for_tag(&self, tag: &str) -> Option<Uuid> {
        self.records.iter().find(|r| r.tag == tag).map(|r| r.id)
    }

    pub fn tag_for_id(&self, id: Uuid) -> Option<&str> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.tag.as_str())
    }

    pub fn records(&self) -> &[TagRecord] {
        &self.records
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Stable ids for shapes that exist only as incidental byproducts of an
/// operation (section edges and the like): keyed by the canonical set of
/// already-identified ancestor ids, so the same parent combination yields the
/// same derived id across rebuilds.
///
/// Two distinct shapes sharing an identical parent set collide by
/// construction; the duplicate pass regenerates the extras. Accepted
/// precision gap, not silently papered over with a geometric tie-break.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(into = "Vec<DerivedRow>", from = "Vec<DerivedRow>")]
pub struct DerivedContainer {
    map: HashMap<Vec<Uuid>, Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedRow {
    pub parents: Vec<Uuid>,
    pub id: Uuid,
}

impl DerivedContainer {
    /// Canonical key: sorted, deduplicated.
    fn canonical(parents: &[Uuid]) -> Vec<Uuid> {
        let mut key: Vec<Uuid> = parents.to_vec();
        key.sort();
        key.dedup();
        key
    }

    /// The derived id for this parent set, minted on first sight.
    pub fn derive(&mut self, parents: &[Uuid]) -> Uuid {
        *self
            .map
            .entry(Self::canonical(parents))
            .or_insert_with(Uuid::new_v4)
    }

    pub fn lookup(&self, parents: &[Uuid]) -> Option<Uuid> {
        self.map.get(&Self::canonical(parents)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn rows(&self) -> Vec<DerivedRow> {
        let mut rows: Vec<DerivedRow> = self
            .map
            .iter()
            .map(|(parents, id)| DerivedRow {
                parents: parents.clone(),
                id: *id,
            })
            .collect();
        rows.sort_by(|a, b| a.parents.cmp(&b.parents));
        rows
    }
}

impl From<DerivedContainer> for Vec<DerivedRow> {
    fn from(container: DerivedContainer) -> Self {
        container.rows()
    }
}

impl From<Vec<DerivedRow>> for DerivedContainer {
    fn from(rows: Vec<DerivedRow>) -> Self {
        let mut container = DerivedContainer::default();
        for row in rows {
            container
                .map
                .insert(DerivedContainer::canonical(&row.parents), row.id);
        }
        container
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evolve_rows_are_deduplicated_and_directional() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut evolve = EvolveContainer::default();
        evolve.add(a, b);
        evolve.add(a, b);
        evolve.add(a, c);
        evolve.add(b, b); // self-evolution is meaningless

        assert_eq!(evolve.len(), 2);
        assert_eq!(evolve.evolved(a), vec![b, c]);
        assert_eq!(evolve.devolved(b), vec![a]);
        assert!(evolve.evolved(b).is_empty());
    }

    #[test]
    fn first_tag_registration_wins() {
        let (first, second) = (Uuid::new_v4(), Uuid::new_v4());
        let mut tags = TagContainer::default();
        tags.add(first, "FaceXP");
        tags.add(second, "FaceXP");
        assert_eq!(tags.id_for_tag("FaceXP"), Some(first));
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn derived_ids_ignore_parent_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut derived = DerivedContainer::default();
        let forward = derived.derive(&[a, b]);
        let backward = derived.derive(&[b, a]);
        assert_eq!(forward, backward, "same set, same id, any insertion order");
        assert_eq!(derived.len(), 1);
    }

    #[test]
    fn derived_ids_are_stable_across_serialization() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut derived = DerivedContainer::default();
        let id = derived.derive(&[b, a]);

        let json = serde_json::to_string(&derived).expect("serializable");
        let mut back: DerivedContainer = serde_json::from_str(&json).expect("deserializable");
        assert_eq!(back.derive(&[a, b]), id);
    }
}
