use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::containers::{DerivedContainer, EvolveContainer, TagContainer};
use crate::registry::ShapeRegistry;
use crate::RegistryError;

/// Serializable image of a registry's identity state.
///
/// Shapes themselves are not stored; identity rides on enumeration offsets
/// into the record arena. A snapshot is therefore only meaningful against the
/// root shape it was taken from: rebuild that shape, call
/// [`set_shape`](ShapeRegistry::set_shape), then restore. A shape that
/// enumerates differently than it did at save time fails the offset check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// (record offset, id) rows for every identified record.
    pub ids: Vec<(usize, Uuid)>,
    pub evolve: EvolveContainer,
    pub tags: TagContainer,
    pub derived: DerivedContainer,
}

impl ShapeRegistry {
    /// Captures the current identity state for persistence.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            ids: self
                .records()
                .enumerate()
                .filter(|(_, record)| !record.id.is_nil())
                .map(|(offset, record)| (offset, record.id))
                .collect(),
            evolve: self.evolve().clone(),
            tags: self.tags().clone(),
            derived: self.derived().clone(),
        }
    }

    /// Re-applies a snapshot over a freshly set shape of the same topology.
    pub fn restore(&mut self, snapshot: RegistrySnapshot) -> Result<(), RegistryError> {
        if self.is_empty() {
            return Err(RegistryError::ShapeNotSet);
        }
        let count = self.len();
        for &(offset, _) in &snapshot.ids {
            if offset >= count {
                return Err(RegistryError::OffsetOutOfRange { offset, count });
            }
        }
        for (offset, id) in snapshot.ids {
            self.set_slot_id(offset, id);
        }
        self.replace_containers(snapshot.evolve, snapshot.tags, snapshot.derived);
        Ok(())
    }
}
