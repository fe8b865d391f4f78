//! Pure collection merge rules shared by the domain stores.

use crate::models::{Entity, EntityId};

/// Result of an id-addressed merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The collection changed.
    Applied,
    /// No entity with that id was held; the collection is untouched.
    Missing,
}

impl MergeOutcome {
    /// Combine outcomes across collections: applied anywhere wins.
    pub fn or(self, other: MergeOutcome) -> MergeOutcome {
        if self == MergeOutcome::Applied || other == MergeOutcome::Applied {
            MergeOutcome::Applied
        } else {
            MergeOutcome::Missing
        }
    }
}

/// Replace the whole collection with a fresh response.
pub fn replace_all<T>(collection: &mut Vec<T>, items: Vec<T>) {
    *collection = items;
}

/// Append a newly created entity.
pub fn append<T>(collection: &mut Vec<T>, item: T) {
    collection.push(item);
}

/// Replace the entity with the same id, keeping its position.
pub fn update_in_place<T: Entity>(collection: &mut [T], item: T) -> MergeOutcome {
    match collection.iter_mut().find(|existing| existing.id() == item.id()) {
        Some(slot) => {
            *slot = item;
            MergeOutcome::Applied
        }
        None => MergeOutcome::Missing,
    }
}

/// Remove every entity carrying `id`.
pub fn remove_by_id<T: Entity>(collection: &mut Vec<T>, id: EntityId) -> MergeOutcome {
    let before = collection.len();
    collection.retain(|existing| existing.id() != id);
    if collection.len() == before {
        MergeOutcome::Missing
    } else {
        MergeOutcome::Applied
    }
}
